//! Device-and-protocol multiplexer: device registry, protocol registry
//! with deferred (soft-IRQ style) dispatch, timer service, event service,
//! and the two-phase setup/run lifecycle that ties them together.
//!
//! Protocol modules (`netstack-ip`, `netstack-icmp`) are built on top of
//! this crate; it has no notion of IP addresses, routing, or any
//! particular wire format. See [`Stack`] for the public entry point.

mod device;
mod error;
mod event;
mod interface;
mod protocol;
mod stack;
mod timer;

pub use device::{DevIndex, Device, DeviceHandle, NetDevice};
pub(crate) use device::DeviceRegistry;
pub use error::NetError;
pub use event::EventHandler;
pub use interface::{Family, Interface};
pub use protocol::{ProtocolHandler, DEFAULT_QUEUE_CAPACITY};
pub use stack::{Running, Setup, Stack, StackConfig, StackState};
pub use timer::TimerHandler;
