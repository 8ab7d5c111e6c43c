//! Echo request/reply across two distinct devices joined by a
//! [`PairDevice`], exercising `ip_output`'s device-by-source-address
//! selection against more than one candidate device on the same stack.

use std::net::Ipv4Addr;
use std::sync::Arc;

use netstack_core::{Family, Interface, NetDevice, NetError, Stack, StackConfig};
use netstack_devices::PairDevice;
use netstack_icmp::IcmpResponder;
use netstack_ip::{IpModule, Ipv4Interface};

struct Forwarding(Arc<PairDevice>);

impl NetDevice for Forwarding {
    fn transmit(&self, ethertype: u16, bytes: &[u8], dst: &[u8]) -> Result<(), NetError> {
        self.0.transmit(ethertype, bytes, dst)
    }
}

#[test]
fn echo_request_arriving_on_one_of_two_devices_replies_out_the_same_one() {
    let _ = env_logger::try_init();

    let stack = Stack::new(StackConfig::default());
    let (near, far) = PairDevice::new_pair();

    let near_device = stack.register_device(0x0800, 1500, Box::new(Forwarding(near)));
    stack
        .add_interface(
            &near_device,
            Interface::new(
                Family::Ipv4,
                Ipv4Interface::new(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(255, 255, 255, 0)),
            ),
        )
        .unwrap();

    // A second device, with its own interface, registered on the same
    // stack so `ip_output`'s device lookup has more than one candidate
    // to choose correctly between.
    let other_device = stack.register_device(0x0800, 1500, Box::new(DiscardDevice));
    stack
        .add_interface(
            &other_device,
            Interface::new(
                Family::Ipv4,
                Ipv4Interface::new(Ipv4Addr::new(10, 0, 1, 1), Ipv4Addr::new(255, 255, 255, 0)),
            ),
        )
        .unwrap();

    let ip = IpModule::new();
    ip.attach(&stack).unwrap();
    let icmp = IcmpResponder::new(Arc::clone(&ip));
    icmp.attach(&stack).unwrap();

    let running = stack.run();
    icmp.bind(running.clone());

    let request = build_echo_request();
    let datagram = netstack_ip::build(
        netstack_icmp::IP_PROTOCOL_ICMP,
        Ipv4Addr::new(10, 0, 0, 2),
        Ipv4Addr::new(10, 0, 0, 1),
        &request,
    );

    running
        .net_input_handler(0x0800, &datagram, &near_device)
        .unwrap();
    running.run_softirq();

    let (ethertype, reply_datagram) = far
        .poll()
        .expect("the reply must arrive on the peer of the device the request came in on");
    assert_eq!(ethertype, 0x0800);
    assert!(far.poll().is_none());

    let (header, _offset) = netstack_ip::parse(&reply_datagram).unwrap();
    assert_eq!(header.src, Ipv4Addr::new(10, 0, 0, 1));
    assert_eq!(header.dst, Ipv4Addr::new(10, 0, 0, 2));

    running.shutdown();
}

struct DiscardDevice;

impl NetDevice for DiscardDevice {
    fn transmit(&self, _ethertype: u16, _bytes: &[u8], _dst: &[u8]) -> Result<(), NetError> {
        Ok(())
    }
}

fn build_echo_request() -> Vec<u8> {
    let mut message = vec![8u8, 0, 0, 0, 0x12, 0x34, 0x00, 0x01];
    message.extend_from_slice(b"ABCDEF");
    let sum = netstack_ip::checksum(&message);
    message[2..4].copy_from_slice(&sum.to_be_bytes());
    message
}
