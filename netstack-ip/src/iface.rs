//! IPv4 addressing bound to a device, as an opaque
//! [`netstack_core::Interface`] payload.

use std::net::Ipv4Addr;

/// Unicast address, netmask, and derived broadcast address bound to one
/// device. Stored as a device's `Family::Ipv4` interface payload and
/// recovered with [`netstack_core::Device::interface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Interface {
    pub unicast: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub broadcast: Ipv4Addr,
}

impl Ipv4Interface {
    /// Derive the broadcast address from `unicast`/`netmask`.
    pub fn new(unicast: Ipv4Addr, netmask: Ipv4Addr) -> Self {
        let host_bits = !u32::from_be_bytes(netmask.octets());
        let broadcast = u32::from_be_bytes(unicast.octets()) | host_bits;
        Self {
            unicast,
            netmask,
            broadcast: Ipv4Addr::from(broadcast.to_be_bytes()),
        }
    }
}
