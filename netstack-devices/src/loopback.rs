//! Loopback network device.
//!
//! `transmit` pushes the frame onto an internal queue instead of putting
//! it on a wire; [`LoopbackDevice::poll`] pops frames back off so a
//! driver loop can feed them straight back into
//! [`netstack_core::Stack::net_input_handler`]. No checksums, no
//! addressing, no queue-full back-pressure beyond a generous bound — a
//! loopback device is memory-to-memory.

use std::collections::VecDeque;
use std::sync::Mutex;

use log::warn;

use netstack_core::{NetDevice, NetError};

const QUEUE_CAPACITY: usize = 256;

struct QueuedFrame {
    ethertype: u16,
    bytes: Vec<u8>,
}

/// A loopback device: whatever is transmitted on it becomes available to
/// receive via [`LoopbackDevice::poll`].
#[derive(Default)]
pub struct LoopbackDevice {
    queue: Mutex<VecDeque<QueuedFrame>>,
}

impl LoopbackDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the oldest queued frame, if any, as `(ethertype, bytes)`.
    pub fn poll(&self) -> Option<(u16, Vec<u8>)> {
        let mut queue = self.queue.lock().expect("loopback queue poisoned");
        queue.pop_front().map(|frame| (frame.ethertype, frame.bytes))
    }
}

impl NetDevice for LoopbackDevice {
    fn transmit(&self, ethertype: u16, bytes: &[u8], _dst: &[u8]) -> Result<(), NetError> {
        let mut queue = self.queue.lock().expect("loopback queue poisoned");
        if queue.len() >= QUEUE_CAPACITY {
            warn!("loopback: queue full, dropping frame");
            return Err(NetError::QueueFull);
        }
        queue.push_back(QueuedFrame {
            ethertype,
            bytes: bytes.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod loopback_tests {
    use super::*;

    fn init_logging() {
        let _ = env_logger::try_init();
    }

    #[test]
    fn transmitted_frame_is_available_to_poll() {
        init_logging();
        let dev = LoopbackDevice::new();
        dev.transmit(0x0800, &[1, 2, 3], &[]).unwrap();
        let (ethertype, bytes) = dev.poll().unwrap();
        assert_eq!(ethertype, 0x0800);
        assert_eq!(bytes, vec![1, 2, 3]);
        assert!(dev.poll().is_none());
    }

    #[test]
    fn polls_in_fifo_order() {
        init_logging();
        let dev = LoopbackDevice::new();
        dev.transmit(0x0800, &[1], &[]).unwrap();
        dev.transmit(0x0800, &[2], &[]).unwrap();
        assert_eq!(dev.poll().unwrap().1, vec![1]);
        assert_eq!(dev.poll().unwrap().1, vec![2]);
    }

    #[test]
    fn transmit_past_capacity_is_rejected() {
        init_logging();
        let dev = LoopbackDevice::new();
        for i in 0..QUEUE_CAPACITY {
            dev.transmit(0x0800, &[i as u8], &[]).unwrap();
        }
        let result = dev.transmit(0x0800, &[0xFF], &[]);
        assert!(matches!(result, Err(NetError::QueueFull)));
    }
}
