//! Protocol registry and the soft-IRQ input pipeline.
//!
//! `input()` runs in driver/interrupt context: it copies the frame into a
//! queue entry and returns immediately. `softirq_drain()` runs in the
//! worker thread's cooperative context: it drains every protocol's queue
//! FIFO and dispatches each entry to the protocol's handler.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;

use log::{debug, error, warn};

use crate::device::DeviceHandle;
use crate::error::NetError;

/// Default bound on a protocol's pending-input queue.
///
/// Chosen generously for a software stack with no hardware ring buffer
/// backing it; callers needing a tighter bound can set one via
/// [`crate::StackConfig::queue_capacity`].
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Handler signature a protocol module registers with the core.
///
/// Receives the payload (lifetime = duration of the call — the handler
/// does not own the bytes) and a borrowed [`DeviceHandle`] identifying
/// the device the frame arrived on.
pub type ProtocolHandler = Box<dyn Fn(&[u8], &DeviceHandle) + Send + Sync>;

struct QueueEntry {
    device: DeviceHandle,
    payload: Vec<u8>,
}

struct Protocol {
    type_code: u16,
    capacity: usize,
    queue: Mutex<VecDeque<QueueEntry>>,
    handler: ProtocolHandler,
}

/// Append-only table of registered protocols, each with its own bounded
/// FIFO input queue.
#[derive(Default)]
pub(crate) struct ProtocolRegistry {
    protocols: Mutex<Vec<Protocol>>,
}

impl ProtocolRegistry {
    /// Register `handler` for `type_code`. Fails with
    /// [`NetError::AlreadyRegistered`] if the type code is already taken.
    pub(crate) fn register(
        &self,
        type_code: u16,
        capacity: usize,
        handler: ProtocolHandler,
    ) -> Result<(), NetError> {
        let mut protocols = self.protocols.lock().expect("protocol registry poisoned");
        if protocols.iter().any(|p| p.type_code == type_code) {
            warn!("protocol 0x{type_code:04x}: already registered");
            return Err(NetError::AlreadyRegistered);
        }
        protocols.push(Protocol {
            type_code,
            capacity,
            queue: Mutex::new(VecDeque::new()),
            handler,
        });
        debug!("protocol 0x{type_code:04x}: registered");
        Ok(())
    }

    /// Copy `bytes` into a fresh queue entry for the protocol matching
    /// `type_code` and enqueue it. Silently succeeds (drops the frame) if
    /// no protocol is registered for `type_code` — an unsupported protocol
    /// is not an error at this layer.
    pub(crate) fn input(
        &self,
        type_code: u16,
        bytes: &[u8],
        device: &DeviceHandle,
    ) -> Result<(), NetError> {
        let protocols = self.protocols.lock().expect("protocol registry poisoned");
        let Some(proto) = protocols.iter().find(|p| p.type_code == type_code) else {
            return Ok(());
        };
        let mut queue = proto.queue.lock().expect("protocol queue poisoned");
        if queue.len() >= proto.capacity {
            warn!(
                "protocol 0x{type_code:04x}: queue full (capacity {})",
                proto.capacity
            );
            return Err(NetError::QueueFull);
        }
        queue.push_back(QueueEntry {
            device: DeviceHandle::clone(device),
            payload: bytes.to_vec(),
        });
        debug!(
            "protocol 0x{type_code:04x}: queued (depth {}) dev={} len={}",
            queue.len(),
            device.name(),
            bytes.len()
        );
        Ok(())
    }

    /// Drain every protocol's queue to empty, dispatching each entry to its
    /// handler in arrival order. A handler panic is caught, logged, and
    /// does not abort the drain of the remaining queues.
    pub(crate) fn softirq_drain(&self) {
        // Collect a stable view of the protocol list. Registration never
        // happens after `run`, so this does not race with `register`.
        let protocols = self.protocols.lock().expect("protocol registry poisoned");
        for proto in protocols.iter() {
            loop {
                let entry = {
                    let mut queue = proto.queue.lock().expect("protocol queue poisoned");
                    queue.pop_front()
                };
                let Some(entry) = entry else { break };
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    (proto.handler)(&entry.payload, &entry.device)
                }));
                if result.is_err() {
                    error!(
                        "protocol 0x{:04x}: handler panicked on dev={}",
                        proto.type_code,
                        entry.device.name()
                    );
                }
            }
        }
    }
}
