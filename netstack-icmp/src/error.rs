use std::fmt;

use netstack_ip::IpError;

/// Errors describing a malformed or unusable ICMP message, as distinct
/// from [`netstack_core::NetError`]'s device/registration failures —
/// except [`IcmpError::Reply`], which carries an IP-layer failure (itself
/// possibly wrapping a core one) through from sending the echo reply.
#[derive(Debug)]
pub enum IcmpError {
    /// Fewer than 8 bytes — shorter than the ICMP header.
    TooShort,
    /// Checksum did not sum to zero.
    BadChecksum,
    /// Sending the echo reply through the IP layer failed.
    Reply(IpError),
}

impl fmt::Display for IcmpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IcmpError::TooShort => write!(f, "too short, shorter than an ICMP header"),
            IcmpError::BadChecksum => write!(f, "checksum error"),
            IcmpError::Reply(err) => write!(f, "echo reply failed: {err}"),
        }
    }
}

impl std::error::Error for IcmpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IcmpError::Reply(err) => Some(err),
            _ => None,
        }
    }
}

impl From<IpError> for IcmpError {
    fn from(err: IpError) -> Self {
        IcmpError::Reply(err)
    }
}
