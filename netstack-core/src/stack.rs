//! Lifecycle and the `Stack` aggregate.
//!
//! The registries described in the reference implementation are
//! module-level globals. Here they are fields of a single [`Stack`] value,
//! and the "no registration after `run`" rule is upgraded from a
//! documented precondition to a compile-time one: registration methods
//! only exist on `Stack<Setup>`, data-plane methods only on
//! `Stack<Running>`. `run` consumes the former and returns the latter.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::device::{DeviceHandle, NetDevice};
use crate::error::NetError;
use crate::event::{EventHandler, EventService};
use crate::interface::Interface;
use crate::protocol::{ProtocolHandler, ProtocolRegistry, DEFAULT_QUEUE_CAPACITY};
use crate::timer::{TimerHandler, TimerService};
use crate::DeviceRegistry;

/// Tunables with sane defaults, set programmatically before `run` — this
/// crate has no configuration file format, it is a library.
#[derive(Clone, Copy, Debug)]
pub struct StackConfig {
    /// Bound on each protocol's pending-input queue.
    pub queue_capacity: usize,
    /// How often the interrupt worker wakes on its own (in the absence of
    /// a raised softirq/event) to check timers. Must be at least as
    /// short as the shortest registered timer interval for that timer to
    /// fire promptly.
    pub tick_interval: Duration,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            tick_interval: Duration::from_millis(10),
        }
    }
}

/// Sealed marker for [`Stack`]'s lifecycle typestate.
pub trait StackState: private::Sealed {}

/// The stack has been constructed; registration methods are available and
/// no device has been opened yet.
pub struct Setup;
/// `run` has been called; every registered device is open and the
/// interrupt worker thread is live. Registration methods no longer exist
/// on this type — calling them is a compile error, not a runtime one.
pub struct Running;

impl StackState for Setup {}
impl StackState for Running {}

mod private {
    pub trait Sealed {}
    impl Sealed for super::Setup {}
    impl Sealed for super::Running {}
}

pub(crate) struct StackInner {
    pub(crate) devices: DeviceRegistry,
    pub(crate) protocols: ProtocolRegistry,
    pub(crate) timers: TimerService,
    pub(crate) events: EventService,
    config: StackConfig,
    softirq_pending: AtomicBool,
    event_pending: AtomicBool,
    wake: Condvar,
    wake_gate: Mutex<()>,
    running: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// The network core: device table, protocol table, timer list, event
/// list, and the two deferred-work entry points (softirq, event).
///
/// `S` is either [`Setup`] (registration phase) or [`Running`] (data
/// plane phase); see the module documentation.
pub struct Stack<S: StackState> {
    pub(crate) inner: Arc<StackInner>,
    _state: PhantomData<S>,
}

impl<S: StackState> Clone for Stack<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _state: PhantomData,
        }
    }
}

impl Default for Stack<Setup> {
    fn default() -> Self {
        Self::new(StackConfig::default())
    }
}

impl Stack<Setup> {
    /// Construct an empty stack with the given configuration.
    pub fn new(config: StackConfig) -> Self {
        Self {
            inner: Arc::new(StackInner {
                devices: DeviceRegistry::default(),
                protocols: ProtocolRegistry::default(),
                timers: TimerService::default(),
                events: EventService::default(),
                config,
                softirq_pending: AtomicBool::new(false),
                event_pending: AtomicBool::new(false),
                wake: Condvar::new(),
                wake_gate: Mutex::new(()),
                running: AtomicBool::new(false),
                worker: Mutex::new(None),
            }),
            _state: PhantomData,
        }
    }

    /// Register a device driver. Assigns the next index and the name
    /// `net<index>`. Returns a [`DeviceHandle`] usable immediately for
    /// [`Stack::add_interface`].
    pub fn register_device(&self, link_type: u16, mtu: u16, ops: Box<dyn NetDevice + Send + Sync>) -> DeviceHandle {
        self.inner.devices.register(link_type, mtu, ops)
    }

    /// Attach `iface` to `device`. Fails with
    /// [`NetError::DuplicateFamily`] if the device already has an
    /// interface of that family.
    pub fn add_interface(&self, device: &DeviceHandle, iface: Interface) -> Result<(), NetError> {
        device.add_interface(iface)
    }

    /// Register `handler` for `type_code`. Fails with
    /// [`NetError::AlreadyRegistered`] on a duplicate type code.
    pub fn register_protocol(
        &self,
        type_code: u16,
        handler: ProtocolHandler,
    ) -> Result<(), NetError> {
        self.inner
            .protocols
            .register(type_code, self.inner.config.queue_capacity, handler)
    }

    /// Register a periodic timer. `handler` fires whenever `elapsed since
    /// last fire >= interval`, checked on every tick.
    pub fn register_timer(&self, interval: Duration, handler: TimerHandler) {
        self.inner.timers.register(interval, Instant::now(), handler);
    }

    /// Subscribe `handler` to the event service; invoked with `arg` on
    /// every [`Stack::raise_event`].
    pub fn subscribe_event(&self, handler: EventHandler, arg: Box<dyn Any + Send + Sync>) {
        self.inner.events.subscribe(handler, arg);
    }

    /// Open every registered device and start the interrupt worker
    /// thread. Consumes the setup-phase stack and returns the
    /// running-phase one — registration methods are no longer reachable
    /// after this point.
    pub fn run(self) -> Stack<Running> {
        self.inner.devices.open_all();
        self.inner.running.store(true, Ordering::Release);

        let worker_inner = Arc::clone(&self.inner);
        let handle = thread::spawn(move || worker_loop(worker_inner));
        *self.inner.worker.lock().expect("worker handle poisoned") = Some(handle);

        info!("stack: running");
        Stack {
            inner: self.inner,
            _state: PhantomData,
        }
    }
}

fn worker_loop(inner: Arc<StackInner>) {
    let tick_interval = inner.config.tick_interval;
    let mut gate = inner.wake_gate.lock().expect("wake gate poisoned");
    while inner.running.load(Ordering::Acquire) {
        let (next_gate, _timeout) = inner
            .wake
            .wait_timeout(gate, tick_interval)
            .expect("wake condvar poisoned");
        gate = next_gate;

        if !inner.running.load(Ordering::Acquire) {
            break;
        }
        if inner.event_pending.swap(false, Ordering::AcqRel) {
            inner.events.dispatch();
        }
        if inner.softirq_pending.swap(false, Ordering::AcqRel) {
            inner.protocols.softirq_drain();
        }
        inner.timers.tick(Instant::now());
    }
}

impl Stack<Running> {
    /// Enqueue `bytes` for the protocol registered under `type_code` and
    /// raise the softirq. Must not block — this is the driver/interrupt
    /// context entry point.
    pub fn net_input_handler(
        &self,
        type_code: u16,
        bytes: &[u8],
        device: &DeviceHandle,
    ) -> Result<(), NetError> {
        self.inner.protocols.input(type_code, bytes, device)?;
        self.raise_softirq();
        Ok(())
    }

    /// Snapshot of every registered device, in registration order. Lets a
    /// protocol module above the core (e.g. the IPv4 demultiplexer
    /// choosing an egress device by source address) search the device
    /// table without the core needing to know anything about addressing.
    pub fn devices(&self) -> Vec<DeviceHandle> {
        self.inner.devices.snapshot()
    }

    /// Validate `UP`/MTU and transmit `bytes` on `device`.
    pub fn net_device_output(
        &self,
        device: &DeviceHandle,
        type_code: u16,
        bytes: &[u8],
        dst: &[u8],
    ) -> Result<(), NetError> {
        device.output(type_code, bytes, dst)
    }

    /// Signal the softirq line. The interrupt worker thread will drain
    /// every protocol queue on its next wake; call [`Stack::run_softirq`]
    /// directly for deterministic, synchronous draining (e.g. in tests).
    pub fn raise_softirq(&self) {
        self.inner.softirq_pending.store(true, Ordering::Release);
        self.inner.wake.notify_one();
    }

    /// Drain every protocol queue to empty right now, on the calling
    /// thread. Safe to call regardless of whether the interrupt worker
    /// thread also wakes and drains concurrently — draining an empty
    /// queue is a no-op.
    pub fn run_softirq(&self) {
        self.inner.protocols.softirq_drain();
    }

    /// Trigger the event service immediately on the calling thread.
    pub fn raise_event(&self) {
        self.inner.events.dispatch();
    }

    /// Check every registered timer against `now` and fire the ones whose
    /// interval has elapsed, on the calling thread.
    pub fn run_timer_tick(&self, now: Instant) {
        self.inner.timers.tick(now);
    }

    /// Close every device and stop the interrupt worker thread, joining
    /// it before returning.
    pub fn shutdown(self) {
        self.inner.devices.close_all();
        self.inner.running.store(false, Ordering::Release);
        self.inner.wake.notify_all();
        if let Some(handle) = self.inner.worker.lock().expect("worker handle poisoned").take() {
            let _ = handle.join();
        }
        debug!("stack: shut down");
    }
}
