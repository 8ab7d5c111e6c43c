//! Minimal, unfragmented, single-protocol IPv4 demultiplexer.
//!
//! Connective tissue between a [`netstack_core::Device`] and a protocol
//! module (this workspace ships `netstack-icmp`). Not a general-purpose
//! IP stack: no fragmentation/reassembly, no routing beyond the directly
//! attached interface, no options, no ARP (address resolution is out of
//! scope — see `netstack-devices`' loopback, which needs none).

mod error;
mod header;
mod iface;
mod module;

pub use error::IpError;
pub use header::{build, checksum, parse, Ipv4Header, HEADER_LEN};
pub use iface::Ipv4Interface;
pub use module::{IpModule, Ipv4Handler};
