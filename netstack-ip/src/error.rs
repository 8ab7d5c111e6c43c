use std::fmt;

use netstack_core::NetError;

/// Errors local to the IP demultiplexer, distinct from
/// [`netstack_core::NetError`] since they describe malformed datagrams
/// rather than device/registration failures — except [`IpError::Core`],
/// which carries one of the latter through so callers above this layer
/// can still match on it via `source()`.
#[derive(Debug)]
pub enum IpError {
    /// Fewer than 20 bytes — shorter than a minimal IPv4 header.
    TooShort,
    /// `version` field is not 4.
    BadVersion,
    /// Header checksum did not sum to zero.
    BadChecksum,
    /// No interface of family `Ipv4` is bound to the receiving device.
    NoInterface,
    /// No protocol module registered for the datagram's protocol number.
    NoProtocol,
    /// `output` found no device whose bound interface unicast address
    /// matches the requested source address.
    NoRoute,
    /// A core operation (device output) failed; propagated as-is.
    Core(NetError),
}

impl fmt::Display for IpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpError::TooShort => write!(f, "datagram shorter than an IPv4 header"),
            IpError::BadVersion => write!(f, "not an IPv4 datagram"),
            IpError::BadChecksum => write!(f, "header checksum mismatch"),
            IpError::NoInterface => write!(f, "no IPv4 interface bound to receiving device"),
            IpError::NoProtocol => write!(f, "no protocol registered for this protocol number"),
            IpError::NoRoute => write!(f, "no device has an interface matching the requested source address"),
            IpError::Core(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for IpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IpError::Core(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NetError> for IpError {
    fn from(err: NetError) -> Self {
        IpError::Core(err)
    }
}
