//! Error kinds returned by the dispatch core.
//!
//! Mirrors [`std::error::Error`] by hand rather than pulling in a
//! derive-macro crate — every protocol module built on top of this core
//! (see `netstack-ip`, `netstack-icmp`) follows the same pattern so error
//! handling stays uniform across layers.

use std::fmt;

/// Errors produced by the device registry, protocol registry, and lifecycle
/// operations of [`crate::Stack`].
#[derive(Debug)]
pub enum NetError {
    /// A fixed-capacity allocation (the protocol input queue) is full.
    OutOfMemory,
    /// `register_protocol` was called twice with the same type code.
    AlreadyRegistered,
    /// `add_interface` was called twice for the same `(device, family)` pair.
    DuplicateFamily,
    /// `open` was called on a device that is already up.
    AlreadyOpen,
    /// An operation that requires an open device was attempted on a device
    /// that is not up (includes `close` on an already-closed device).
    NotOpen,
    /// A frame or datagram exceeded the device MTU.
    TooLong,
    /// A protocol's input queue is at capacity; the packet was not enqueued.
    QueueFull,
    /// A driver's `open`/`close`/`transmit` hook returned an error.
    DriverError(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::OutOfMemory => write!(f, "out of memory"),
            NetError::AlreadyRegistered => write!(f, "already registered"),
            NetError::DuplicateFamily => write!(f, "interface family already bound"),
            NetError::AlreadyOpen => write!(f, "device already open"),
            NetError::NotOpen => write!(f, "device not open"),
            NetError::TooLong => write!(f, "payload longer than device MTU"),
            NetError::QueueFull => write!(f, "protocol queue full"),
            NetError::DriverError(inner) => write!(f, "driver error: {inner}"),
        }
    }
}

impl std::error::Error for NetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NetError::DriverError(inner) => Some(inner.as_ref()),
            _ => None,
        }
    }
}
