//! Network device abstraction: the [`NetDevice`] trait, the registered
//! [`Device`] wrapper, and the device registry.
//!
//! This module is the boundary between device drivers (which move bytes)
//! and the protocol stack (which understands protocols). Only `&[u8]`
//! crosses this boundary — drivers never see a parsed header.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, warn};

use crate::error::NetError;
use crate::interface::{Family, Interface};

/// Capability set implemented by every device driver (NIC, loopback, tap,
/// …) and registered with the core via [`crate::Stack::register_device`].
///
/// All methods take `&self`; drivers use interior mutability for their own
/// state. `open`/`close` default to no-ops — the spec marks them optional,
/// only `transmit` is required.
pub trait NetDevice: Send + Sync {
    /// Bring the device up. Called once by `Stack::run`.
    fn open(&self) -> Result<(), NetError> {
        Ok(())
    }

    /// Bring the device down. Called once by `Stack::shutdown`.
    fn close(&self) -> Result<(), NetError> {
        Ok(())
    }

    /// Transmit one frame. `dst` is an opaque, driver-interpreted
    /// destination (e.g. a resolved link-layer address, or simply ignored
    /// by a loopback device).
    fn transmit(&self, ethertype: u16, bytes: &[u8], dst: &[u8]) -> Result<(), NetError>;
}

/// Stable index assigned to a device at registration time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DevIndex(pub(crate) usize);

impl fmt::Display for DevIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered network device: the driver's [`NetDevice`] plus the
/// core-owned bookkeeping (name, index, MTU, `UP` flag, interface list).
///
/// Handed out to callers (protocol handlers, driver threads) as a
/// [`DeviceHandle`] — a cheap `Arc` clone that is valid for the device's
/// entire registered lifetime (devices are never unregistered).
pub struct Device {
    name: String,
    index: DevIndex,
    link_type: u16,
    mtu: u16,
    up: AtomicBool,
    ops: Box<dyn NetDevice + Send + Sync>,
    interfaces: Mutex<Vec<Interface>>,
}

/// Cheap, clonable, stable reference to a registered device.
///
/// Handler closures and driver threads hold this instead of a raw pointer
/// or index — the `Arc` keeps the device alive for as long as anyone
/// references it, which for this implementation is the whole process
/// lifetime (devices are never destroyed).
pub type DeviceHandle = Arc<Device>;

impl Device {
    pub(crate) fn new(name: String, index: DevIndex, link_type: u16, mtu: u16, ops: Box<dyn NetDevice + Send + Sync>) -> Self {
        Self {
            name,
            index,
            link_type,
            mtu,
            up: AtomicBool::new(false),
            ops,
            interfaces: Mutex::new(Vec::new()),
        }
    }

    /// The device's auto-assigned name, e.g. `net0`.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The device's stable registration index.
    #[inline]
    pub fn index(&self) -> DevIndex {
        self.index
    }

    /// The link-type code the driver was registered with (e.g. an
    /// EtherType-style constant for the frames this device produces).
    #[inline]
    pub fn link_type(&self) -> u16 {
        self.link_type
    }

    /// Maximum payload length this device will accept in one `transmit`.
    #[inline]
    pub fn mtu(&self) -> u16 {
        self.mtu
    }

    /// Whether the device is currently up (opened, not yet closed).
    #[inline]
    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::Acquire)
    }

    /// Append `iface` to this device's interface list.
    ///
    /// Fails with [`NetError::DuplicateFamily`] if an interface of the same
    /// family is already bound. Precondition: called before `Stack::run`
    /// (enforced by the caller only exposing this through `Stack<Setup>`).
    pub fn add_interface(&self, iface: Interface) -> Result<(), NetError> {
        let mut ifaces = self.interfaces.lock().expect("interface list poisoned");
        if ifaces.iter().any(|existing| existing.family() == iface.family()) {
            return Err(NetError::DuplicateFamily);
        }
        ifaces.push(iface);
        Ok(())
    }

    /// Linear search for the interface bound to `family`.
    ///
    /// This is a plain linear search that scans the whole list and returns
    /// the match (or `None`) — it deliberately does not reproduce the
    /// reference implementation's early-return bug, which would give up
    /// after the first non-matching entry.
    pub fn interface<T, R>(&self, family: Family, with: impl FnOnce(&T) -> R) -> Option<R>
    where
        T: std::any::Any,
    {
        let ifaces = self.interfaces.lock().expect("interface list poisoned");
        ifaces
            .iter()
            .find(|iface| iface.family() == family)
            .and_then(|iface| iface.payload::<T>())
            .map(with)
    }

    fn open(&self) -> Result<(), NetError> {
        if self.is_up() {
            warn!("dev={}: already opened", self.name);
            return Err(NetError::AlreadyOpen);
        }
        self.ops.open()?;
        self.up.store(true, Ordering::Release);
        debug!("dev={}: opened", self.name);
        Ok(())
    }

    fn close(&self) -> Result<(), NetError> {
        if !self.is_up() {
            warn!("dev={}: not opened", self.name);
            return Err(NetError::NotOpen);
        }
        self.ops.close()?;
        self.up.store(false, Ordering::Release);
        debug!("dev={}: closed", self.name);
        Ok(())
    }

    /// Validate `UP` and MTU, then delegate to the driver's `transmit`.
    pub(crate) fn output(&self, ethertype: u16, bytes: &[u8], dst: &[u8]) -> Result<(), NetError> {
        if !self.is_up() {
            warn!("dev={}: output while not opened", self.name);
            return Err(NetError::NotOpen);
        }
        if bytes.len() > self.mtu as usize {
            warn!(
                "dev={}: too long, mtu={} len={}",
                self.name,
                self.mtu,
                bytes.len()
            );
            return Err(NetError::TooLong);
        }
        debug!(
            "dev={} type=0x{:04x} len={}",
            self.name,
            ethertype,
            bytes.len()
        );
        self.ops.transmit(ethertype, bytes, dst).map_err(|err| {
            warn!("dev={}: transmit failed: {err}", self.name);
            err
        })
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Device {{ name: {:?}, index: {}, mtu: {}, up: {} }}",
            self.name,
            self.index,
            self.mtu,
            self.is_up()
        )
    }
}

/// Append-only table of registered devices.
///
/// Registration is only ever exposed through `Stack<Setup>`, so the table
/// is only ever mutated before `Stack::run` — no lock is required for
/// iteration after that point, but registration itself still goes through
/// a `Mutex` since it happens at an arbitrary point during setup.
#[derive(Default)]
pub(crate) struct DeviceRegistry {
    devices: Mutex<Vec<DeviceHandle>>,
}

impl DeviceRegistry {
    pub(crate) fn register(&self, link_type: u16, mtu: u16, ops: Box<dyn NetDevice + Send + Sync>) -> DeviceHandle {
        let mut devices = self.devices.lock().expect("device registry poisoned");
        let index = DevIndex(devices.len());
        let name = format!("net{index}");
        let dev = Arc::new(Device::new(name, index, link_type, mtu, ops));
        debug!("dev={}: registered, type=0x{:04x}", dev.name, link_type);
        devices.push(Arc::clone(&dev));
        dev
    }

    pub(crate) fn snapshot(&self) -> Vec<DeviceHandle> {
        self.devices.lock().expect("device registry poisoned").clone()
    }

    pub(crate) fn open_all(&self) {
        for dev in self.snapshot() {
            if let Err(err) = dev.open() {
                warn!("dev={}: open failed during run: {err}", dev.name());
            }
        }
    }

    pub(crate) fn close_all(&self) {
        for dev in self.snapshot() {
            if let Err(err) = dev.close() {
                warn!("dev={}: close failed during shutdown: {err}", dev.name());
            }
        }
    }
}
