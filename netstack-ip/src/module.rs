//! The IPv4 demultiplexer itself: registers as a protocol with the core
//! (EtherType `0x0800`) and re-dispatches by IP protocol number to
//! whatever sits above it (`netstack-icmp`, in this workspace).
//!
//! This is deliberately minimal — no fragmentation, no routing, no
//! options — scoped to carry a single unfragmented datagram between a
//! device and the one protocol module registered above it.

use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};

use log::{debug, warn};

use netstack_core::{DeviceHandle, Family, NetError, Running, Setup, Stack};

use crate::error::IpError;
use crate::header;
use crate::iface::Ipv4Interface;

const ETHERTYPE_IPV4: u16 = 0x0800;

/// Handler a protocol module registers with [`IpModule`]. Receives the
/// datagram's payload (header stripped), source and destination
/// addresses, and the device it arrived on.
pub type Ipv4Handler = Box<dyn Fn(&[u8], Ipv4Addr, Ipv4Addr, &DeviceHandle) + Send + Sync>;

struct ProtocolEntry {
    protocol: u8,
    handler: Ipv4Handler,
}

/// The IPv4 module. Construct with [`IpModule::new`], attach it to a
/// stack during setup with [`IpModule::attach`], register protocol
/// modules with [`IpModule::register_protocol`], and send datagrams with
/// [`IpModule::output`].
pub struct IpModule {
    protocols: Mutex<Vec<ProtocolEntry>>,
}

impl IpModule {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            protocols: Mutex::new(Vec::new()),
        })
    }

    /// Register `handler` for IP protocol number `protocol` (e.g. `1` for
    /// ICMP). Fails with [`NetError::AlreadyRegistered`] on a duplicate
    /// protocol number.
    pub fn register_protocol(&self, protocol: u8, handler: Ipv4Handler) -> Result<(), NetError> {
        let mut protocols = self.protocols.lock().expect("ip protocol list poisoned");
        if protocols.iter().any(|entry| entry.protocol == protocol) {
            return Err(NetError::AlreadyRegistered);
        }
        protocols.push(ProtocolEntry { protocol, handler });
        Ok(())
    }

    /// Register this module with `stack` as the handler for EtherType
    /// `0x0800`. Call once, during setup, before any
    /// [`IpModule::register_protocol`] calls need to take effect (the
    /// registration just installs the dispatcher; protocol modules may
    /// still be registered after this call and before `run`).
    pub fn attach(self: &Arc<Self>, stack: &Stack<Setup>) -> Result<(), NetError> {
        let module = Arc::clone(self);
        stack.register_protocol(
            ETHERTYPE_IPV4,
            Box::new(move |datagram, device| module.input(datagram, device)),
        )
    }

    /// Boundary between this module and the core's softirq dispatch: logs
    /// and drops whatever [`IpModule::try_input`] reports. An unregistered
    /// protocol is expected traffic, not a fault, so it logs at `debug`;
    /// everything else logs at `warn`.
    fn input(&self, datagram: &[u8], device: &DeviceHandle) {
        if let Err(err) = self.try_input(datagram, device) {
            match err {
                IpError::NoProtocol => debug!("ip: dev={} {err}", device.name()),
                _ => warn!("ip: dev={} {err}", device.name()),
            }
        }
    }

    /// Parse, validate, and dispatch one inbound datagram, propagating
    /// each stage's error with `?` instead of matching and logging
    /// inline — only [`IpModule::input`] logs, once, at the boundary.
    fn try_input(&self, datagram: &[u8], device: &DeviceHandle) -> Result<(), IpError> {
        let (header, offset) = header::parse(datagram)?;

        let addressed_to_us = device
            .interface::<Ipv4Interface, bool>(Family::Ipv4, |iface| {
                header.dst == iface.unicast || header.dst == iface.broadcast
            })
            .ok_or(IpError::NoInterface)?;
        if !addressed_to_us {
            debug!(
                "ip: dev={} datagram to {} not addressed to us, dropping",
                device.name(),
                header.dst
            );
            return Ok(());
        }

        let protocols = self.protocols.lock().expect("ip protocol list poisoned");
        let entry = protocols
            .iter()
            .find(|entry| entry.protocol == header.protocol)
            .ok_or(IpError::NoProtocol)?;
        (entry.handler)(&datagram[offset..], header.src, header.dst, device);
        Ok(())
    }

    /// Build an IPv4 datagram carrying `payload` as protocol `protocol`
    /// and hand it to the core for transmission on the device whose bound
    /// interface's unicast address is `src`. Fails with
    /// [`IpError::NoRoute`] if no registered device has such an
    /// interface; a core output failure (not open, MTU, driver error)
    /// propagates through [`IpError::Core`].
    pub fn output(
        &self,
        stack: &Stack<Running>,
        protocol: u8,
        src: Ipv4Addr,
        dst: Ipv4Addr,
        payload: &[u8],
    ) -> Result<(), IpError> {
        let device = stack
            .devices()
            .into_iter()
            .find(|dev| {
                dev.interface::<Ipv4Interface, bool>(Family::Ipv4, |iface| iface.unicast == src)
                    == Some(true)
            })
            .ok_or(IpError::NoRoute)?;

        let datagram = header::build(protocol, src, dst, payload);
        stack.net_device_output(&device, ETHERTYPE_IPV4, &datagram, &[])?;
        Ok(())
    }
}

#[cfg(test)]
mod module_tests {
    use super::*;
    use netstack_core::{Interface, NetDevice, StackConfig};
    use std::sync::Mutex as StdMutex;

    fn init_logging() {
        let _ = env_logger::try_init();
    }

    #[derive(Default)]
    struct RecordingDevice {
        transmitted: StdMutex<Vec<Vec<u8>>>,
    }

    impl NetDevice for RecordingDevice {
        fn transmit(&self, _ethertype: u16, bytes: &[u8], _dst: &[u8]) -> Result<(), NetError> {
            self.transmitted.lock().unwrap().push(bytes.to_vec());
            Ok(())
        }
    }

    /// Forwards to a shared `RecordingDevice` so the test can inspect
    /// transmitted frames after handing ownership of the driver to the
    /// stack's device registry.
    struct Forwarding(Arc<RecordingDevice>);

    impl NetDevice for Forwarding {
        fn transmit(&self, ethertype: u16, bytes: &[u8], dst: &[u8]) -> Result<(), NetError> {
            self.0.transmit(ethertype, bytes, dst)
        }
    }

    fn attach_device(stack: &Stack<Setup>, unicast: Ipv4Addr) -> Arc<RecordingDevice> {
        let driver = Arc::new(RecordingDevice::default());
        let device = stack.register_device(ETHERTYPE_IPV4, 1500, Box::new(Forwarding(Arc::clone(&driver))));
        stack
            .add_interface(
                &device,
                Interface::new(Family::Ipv4, Ipv4Interface::new(unicast, Ipv4Addr::new(255, 255, 255, 0))),
            )
            .unwrap();
        driver
    }

    #[test]
    fn output_with_no_matching_interface_fails_with_no_route() {
        init_logging();
        let stack = Stack::new(StackConfig::default());
        attach_device(&stack, Ipv4Addr::new(10, 0, 0, 1));
        let ip = IpModule::new();
        ip.attach(&stack).unwrap();
        let running = stack.run();

        let result = ip.output(
            &running,
            17,
            Ipv4Addr::new(192, 168, 0, 1),
            Ipv4Addr::new(192, 168, 0, 2),
            b"payload",
        );
        assert!(matches!(result, Err(IpError::NoRoute)));
        running.shutdown();
    }

    #[test]
    fn output_selects_the_device_owning_the_source_address() {
        init_logging();
        let stack = Stack::new(StackConfig::default());
        let first = attach_device(&stack, Ipv4Addr::new(10, 0, 0, 1));
        let second = attach_device(&stack, Ipv4Addr::new(10, 0, 1, 1));
        let ip = IpModule::new();
        ip.attach(&stack).unwrap();
        let running = stack.run();

        ip.output(
            &running,
            17,
            Ipv4Addr::new(10, 0, 1, 1),
            Ipv4Addr::new(10, 0, 1, 2),
            b"payload",
        )
        .unwrap();

        assert!(first.transmitted.lock().unwrap().is_empty());
        let sent = second.transmitted.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (header, offset) = header::parse(&sent[0]).unwrap();
        assert_eq!(header.src, Ipv4Addr::new(10, 0, 1, 1));
        assert_eq!(&sent[0][offset..], b"payload");

        running.shutdown();
    }

    #[test]
    fn input_to_unregistered_protocol_is_not_an_error_to_the_caller() {
        init_logging();
        let stack = Stack::new(StackConfig::default());
        attach_device(&stack, Ipv4Addr::new(10, 0, 0, 1));
        let ip = IpModule::new();
        ip.attach(&stack).unwrap();
        let running = stack.run();
        let device = running.devices().into_iter().next().unwrap();

        let datagram = header::build(253, Ipv4Addr::new(10, 0, 0, 2), Ipv4Addr::new(10, 0, 0, 1), b"x");
        running.net_input_handler(ETHERTYPE_IPV4, &datagram, &device).unwrap();
        running.run_softirq();

        running.shutdown();
    }
}
