//! Concrete [`netstack_core::NetDevice`] drivers for this workspace.
//!
//! Ships two: [`LoopbackDevice`], for a device that talks to itself, and
//! [`PairDevice`], for two distinct devices joined directly together —
//! between them, enough to exercise the core and the IPv4/ICMP modules
//! end to end without a real NIC or ARP.

mod loopback;
mod pair;

pub use loopback::LoopbackDevice;
pub use pair::PairDevice;
