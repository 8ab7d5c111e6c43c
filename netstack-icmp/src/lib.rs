//! ICMP echo responder built on `netstack-core` and `netstack-ip`: the
//! worked protocol-module example for this workspace's device/protocol
//! dispatch core.
//!
//! Only echo request/reply is implemented (see
//! [`responder::IcmpResponder`]) — destination-unreachable, redirect,
//! timestamp, and the rest of RFC 792 are out of scope.

mod error;
mod responder;
mod wire;

pub use error::IcmpError;
pub use responder::{IcmpResponder, IP_PROTOCOL_ICMP};
pub use wire::{IcmpMessage, TYPE_ECHO_REPLY, TYPE_ECHO_REQUEST};
