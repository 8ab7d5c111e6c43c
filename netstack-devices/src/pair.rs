//! In-memory device pair, as if two interfaces were joined by a patch
//! cable.
//!
//! [`PairDevice::new_pair`] hands back two endpoints; `transmit` on one
//! delivers straight into the other's receive queue, and
//! [`PairDevice::poll`] drains frames the peer sent. Unlike
//! [`crate::LoopbackDevice`], where a device talks to itself, a pair lets
//! two distinct registered devices (each with its own interface) exchange
//! traffic without a real NIC or ARP — useful for exercising routing or
//! forwarding between two interfaces on one stack.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use log::warn;

use netstack_core::{NetDevice, NetError};

const QUEUE_CAPACITY: usize = 256;

struct QueuedFrame {
    ethertype: u16,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct Endpoint {
    queue: Mutex<VecDeque<QueuedFrame>>,
}

/// One end of an in-memory device pair.
pub struct PairDevice {
    /// Frames this end transmits land here.
    peer: Arc<Endpoint>,
    /// Frames the peer transmits land here; drained by `poll`.
    own: Arc<Endpoint>,
}

impl PairDevice {
    /// Build a connected pair: frames `a` transmits arrive at `b.poll()`
    /// and vice versa.
    pub fn new_pair() -> (Arc<Self>, Arc<Self>) {
        let left = Arc::new(Endpoint::default());
        let right = Arc::new(Endpoint::default());
        let a = Arc::new(Self {
            peer: Arc::clone(&right),
            own: Arc::clone(&left),
        });
        let b = Arc::new(Self {
            peer: left,
            own: right,
        });
        (a, b)
    }

    /// Pop the oldest frame the peer sent, if any, as `(ethertype, bytes)`.
    pub fn poll(&self) -> Option<(u16, Vec<u8>)> {
        let mut queue = self.own.queue.lock().expect("pair device queue poisoned");
        queue.pop_front().map(|frame| (frame.ethertype, frame.bytes))
    }
}

impl NetDevice for PairDevice {
    fn transmit(&self, ethertype: u16, bytes: &[u8], _dst: &[u8]) -> Result<(), NetError> {
        let mut queue = self.peer.queue.lock().expect("pair device queue poisoned");
        if queue.len() >= QUEUE_CAPACITY {
            warn!("pair: queue full, dropping frame");
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
mod pair_tests {
    use super::*;

    fn init_logging() {
        let _ = env_logger::try_init();
    }

    #[test]
    fn frame_sent_on_one_end_is_received_on_the_other() {
        init_logging();
        let (a, b) = PairDevice::new_pair();
        a.transmit(0x0800, &[1, 2, 3], &[]).unwrap();
        assert!(a.poll().is_none(), "a must not receive its own transmission");
        let (ethertype, bytes) = b.poll().unwrap();
        assert_eq!(ethertype, 0x0800);
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[test]
    fn pair_is_bidirectional() {
        init_logging();
        let (a, b) = PairDevice::new_pair();
        a.transmit(0x0800, &[1], &[]).unwrap();
        b.transmit(0x0800, &[2], &[]).unwrap();
        assert_eq!(b.poll().unwrap().1, vec![1]);
        assert_eq!(a.poll().unwrap().1, vec![2]);
    }

    #[test]
    fn transmit_past_capacity_is_rejected() {
        init_logging();
        let (a, _b) = PairDevice::new_pair();
        for i in 0..QUEUE_CAPACITY {
            a.transmit(0x0800, &[i as u8], &[]).unwrap();
        }
        let result = a.transmit(0x0800, &[0xFF], &[]);
        assert!(matches!(result, Err(NetError::QueueFull)));
    }
}
