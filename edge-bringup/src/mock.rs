//! In-memory collaborators for the tests.

extern crate std;

use core::convert::Infallible;
use core::net::{Ipv4Addr, SocketAddrV4};

use std::string::{String, ToString};
use std::vec::Vec;

use edge_lease::{LeaseOption, MessageType, Options, Packet, CLIENT_PORT, SERVER_PORT};
use edge_wire::link::{Datagram, Error, Link};
use edge_wire::MacAddr;

use crate::{NameResolver, Resolver, TimeSync};

pub const MAC: MacAddr = [0x02, 0x00, 0x00, 0x00, 0x00, 0x07];
pub const GW_MAC: MacAddr = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];

pub const GW: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 1);
pub const IP: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 50);
pub const MASK: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 0);
pub const DNS: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 53);
pub const TIME: Ipv4Addr = Ipv4Addr::new(198, 51, 100, 10);

pub const NAME_PORT: u16 = 53;
pub const TIME_PORT: u16 = 123;

// src ip, src port, dst ip, dst port, dst mac
const HEADER_LEN: usize = 18;

// marker, tag, address, hardware address
const ARP_LEN: usize = 12;
const ARP_MARKER: u8 = 0xaa;

pub struct MockLink {
    pub up: bool,
    pub broadcast: bool,
    pub configured: Option<(Ipv4Addr, Ipv4Addr)>,
    pub sent: Vec<(SocketAddrV4, SocketAddrV4, Vec<u8>)>,
    pending: Option<(SocketAddrV4, SocketAddrV4)>,
}

impl MockLink {
    pub fn new() -> Self {
        Self {
            up: true,
            broadcast: false,
            configured: None,
            sent: Vec::new(),
            pending: None,
        }
    }

    /// The message type of the last lease message sent.
    pub fn last_lease_message(&self) -> Option<MessageType> {
        let (_, _, payload) = self.sent.last()?;

        Packet::decode(payload).ok()?.options.message_type()
    }
}

impl Link for MockLink {
    type Error = Infallible;

    fn mac(&self) -> MacAddr {
        MAC
    }

    fn is_up(&mut self) -> bool {
        self.up
    }

    fn set_broadcast(&mut self, enable: bool) {
        self.broadcast = enable;
    }

    fn configure(&mut self, ip: Ipv4Addr, mask: Ipv4Addr) {
        self.configured = Some((ip, mask));
    }

    fn prepare(
        &mut self,
        buf: &mut [u8],
        src: SocketAddrV4,
        dst: SocketAddrV4,
        _dst_mac: MacAddr,
    ) -> Result<usize, Self::Error> {
        header(buf, src, dst);
        self.pending = Some((src, dst));

        Ok(HEADER_LEN)
    }

    fn transmit(&mut self, buf: &mut [u8], payload_len: usize) -> Result<(), Self::Error> {
        let (src, dst) = self.pending.take().unwrap();

        self.sent
            .push((src, dst, buf[HEADER_LEN..HEADER_LEN + payload_len].to_vec()));

        Ok(())
    }

    fn datagram<'b>(&self, frame: &'b [u8]) -> Option<Datagram<'b>> {
        if frame.len() < HEADER_LEN {
            return None;
        }

        let addr = |at: usize| {
            SocketAddrV4::new(
                Ipv4Addr::new(frame[at], frame[at + 1], frame[at + 2], frame[at + 3]),
                u16::from_be_bytes([frame[at + 4], frame[at + 5]]),
            )
        };

        Some(Datagram {
            src: addr(0),
            dst: addr(6),
            payload: &frame[HEADER_LEN..],
        })
    }
}

#[derive(Default)]
pub struct MockResolver {
    pub requests: Vec<(Ipv4Addr, u8)>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Resolver for MockResolver {
    fn resolve<L>(
        &mut self,
        _link: &mut L,
        _buf: &mut [u8],
        target: Ipv4Addr,
        tag: u8,
    ) -> Result<(), Error<L::Error>>
    where
        L: Link,
    {
        self.requests.push((target, tag));

        Ok(())
    }

    fn poll(&mut self, frame: &[u8]) -> Option<(u8, Ipv4Addr, MacAddr)> {
        if frame.len() != ARP_LEN || frame[0] != ARP_MARKER {
            return None;
        }

        let addr = Ipv4Addr::new(frame[2], frame[3], frame[4], frame[5]);

        let mut mac = [0; 6];
        mac.copy_from_slice(&frame[6..]);

        Some((frame[1], addr, mac))
    }
}

#[derive(Default)]
pub struct MockNames {
    pub requests: Vec<(String, Ipv4Addr, MacAddr)>,
    pub answer: Option<Ipv4Addr>,
}

impl MockNames {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NameResolver for MockNames {
    fn request<L>(
        &mut self,
        _link: &mut L,
        _buf: &mut [u8],
        hostname: &str,
        server: Ipv4Addr,
        peer_mac: MacAddr,
    ) -> Result<(), Error<L::Error>>
    where
        L: Link,
    {
        self.requests.push((hostname.to_string(), server, peer_mac));
        self.answer = None;

        Ok(())
    }

    fn poll(&mut self, datagram: &Datagram<'_>) -> bool {
        let Ok(octets) = <[u8; 4]>::try_from(datagram.payload) else {
            return false;
        };

        if datagram.src.port() != NAME_PORT {
            return false;
        }

        self.answer = Some(Ipv4Addr::from(octets));

        true
    }

    fn has_answer(&self) -> bool {
        self.answer.is_some()
    }

    fn resolved_address(&self) -> Ipv4Addr {
        self.answer.unwrap_or(Ipv4Addr::UNSPECIFIED)
    }

    fn last_error(&self) -> u8 {
        0
    }
}

#[derive(Default)]
pub struct MockTime {
    pub requests: Vec<(Ipv4Addr, u16, MacAddr)>,
}

impl MockTime {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimeSync for MockTime {
    fn request<L>(
        &mut self,
        _link: &mut L,
        _buf: &mut [u8],
        server: Ipv4Addr,
        local_port: u16,
        peer_mac: MacAddr,
    ) -> Result<(), Error<L::Error>>
    where
        L: Link,
    {
        self.requests.push((server, local_port, peer_mac));

        Ok(())
    }

    fn poll(&mut self, datagram: &Datagram<'_>, local_port: u16) -> Option<u32> {
        let octets = <[u8; 4]>::try_from(datagram.payload).ok()?;

        (datagram.src.port() == TIME_PORT && datagram.dst.port() == local_port)
            .then(|| u32::from_be_bytes(octets))
    }
}

fn header(buf: &mut [u8], src: SocketAddrV4, dst: SocketAddrV4) {
    buf[..4].copy_from_slice(&src.ip().octets());
    buf[4..6].copy_from_slice(&src.port().to_be_bytes());
    buf[6..10].copy_from_slice(&dst.ip().octets());
    buf[10..12].copy_from_slice(&dst.port().to_be_bytes());
    buf[12..HEADER_LEN].copy_from_slice(&MAC);
}

/// Writes a UDP frame carrying `payload` into `buf`.
pub fn frame(buf: &mut [u8], src: SocketAddrV4, dst: SocketAddrV4, payload: &[u8]) -> usize {
    header(buf, src, dst);
    buf[HEADER_LEN..HEADER_LEN + payload.len()].copy_from_slice(payload);

    HEADER_LEN + payload.len()
}

/// Writes an address-resolution answer for `addr` into `buf`.
pub fn arp_reply(buf: &mut [u8], tag: u8, addr: Ipv4Addr, mac: MacAddr) -> usize {
    buf[0] = ARP_MARKER;
    buf[1] = tag;
    buf[2..6].copy_from_slice(&addr.octets());
    buf[6..ARP_LEN].copy_from_slice(&mac);

    ARP_LEN
}

/// Writes a lease server reply for transaction `tid` into `buf`.
pub fn lease_reply(buf: &mut [u8], tid: u8, mt: MessageType, secs: u32) -> usize {
    reply(buf, tid, mt, secs, IP, GW, DNS)
}

/// Writes a lease server reply handing out `ip`, `gateway` and `dns` into `buf`.
pub fn lease_reply_from(
    buf: &mut [u8],
    tid: u8,
    mt: MessageType,
    ip: Ipv4Addr,
    gateway: Ipv4Addr,
    dns: Ipv4Addr,
) -> usize {
    reply(buf, tid, mt, 3600, ip, gateway, dns)
}

fn reply(
    buf: &mut [u8],
    tid: u8,
    mt: MessageType,
    secs: u32,
    ip: Ipv4Addr,
    gateway: Ipv4Addr,
    dns: Ipv4Addr,
) -> usize {
    let options = [
        LeaseOption::MessageType(mt),
        LeaseOption::ServerIdentifier(GW),
        LeaseOption::SubnetMask(MASK),
        LeaseOption::Router(gateway),
        LeaseOption::DomainNameServer(dns),
        LeaseOption::IpAddressLeaseTime(secs),
    ];

    let mut packet = Packet::new_request(
        MAC,
        Packet::xid(tid),
        Ipv4Addr::UNSPECIFIED,
        Options::new(&options),
    );
    packet.reply = true;
    packet.yiaddr = ip;

    header(
        buf,
        SocketAddrV4::new(GW, SERVER_PORT),
        SocketAddrV4::new(Ipv4Addr::BROADCAST, CLIENT_PORT),
    );

    HEADER_LEN + packet.encode(&mut buf[HEADER_LEN..]).unwrap()
}

/// Writes a name-resolution answer into `buf`.
pub fn name_reply(buf: &mut [u8], addr: Ipv4Addr) -> usize {
    frame(
        buf,
        SocketAddrV4::new(DNS, NAME_PORT),
        SocketAddrV4::new(IP, 1024),
        &addr.octets(),
    )
}

/// Writes a time-sync reply addressed to `port` into `buf`.
pub fn time_reply(buf: &mut [u8], port: u16, instant: u32) -> usize {
    frame(
        buf,
        SocketAddrV4::new(TIME, TIME_PORT),
        SocketAddrV4::new(IP, port),
        &instant.to_be_bytes(),
    )
}
