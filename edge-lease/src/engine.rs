use core::net::{Ipv4Addr, SocketAddrV4};

use edge_wire::link::{Error, Link};
use edge_wire::{Subnet, BROADCAST_MAC};

use super::{Countdown, LeaseOption, MessageType, Options, Packet};
use super::{CLIENT_PORT, INFINITE, SERVER_PORT};

/// The lease negotiation state
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// No lease held; the next zero-length poll starts discovery.
    Init,
    /// Discovery sent, waiting for an offer.
    Selecting,
    /// Request sent, waiting for an acknowledgment.
    Requesting,
    /// A valid lease is held.
    Bound,
    /// The renewal window has passed; renewals are broadcast until acknowledged.
    Rebinding,
}

/// What a single [`Engine::poll`] call resulted in
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Nothing for the lease engine; the packet (if any) is left to others.
    Ignored,
    /// A correlated lease message was consumed.
    Consumed,
    /// A lease was acquired. Reported once per acquisition.
    Acquired,
    /// The held lease was extended.
    Renewed,
    /// The tentative or held lease was dropped and the engine is back in `Init`.
    Lost,
}

impl Event {
    pub fn consumed(&self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

/// The negotiated network identity
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Lease {
    pub ip: Ipv4Addr,
    pub mask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub dns: Ipv4Addr,
    pub server_id: Ipv4Addr,
    pub duration_secs: u32,
}

impl Lease {
    /// Used until a server advertises a name server of its own
    pub const DEFAULT_DNS: Ipv4Addr = Ipv4Addr::new(8, 8, 8, 8);

    pub const fn new() -> Self {
        Self {
            ip: Ipv4Addr::UNSPECIFIED,
            mask: Ipv4Addr::UNSPECIFIED,
            gateway: Ipv4Addr::UNSPECIFIED,
            dns: Self::DEFAULT_DNS,
            server_id: Ipv4Addr::UNSPECIFIED,
            duration_secs: INFINITE,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.ip.is_unspecified()
    }

    pub fn is_infinite(&self) -> bool {
        self.duration_secs == INFINITE
    }

    pub fn subnet(&self) -> Subnet {
        Subnet::new(self.ip, self.mask)
    }

    /// Seconds until the first renewal attempt: half of the lease.
    pub fn renewal_secs(&self) -> u32 {
        self.fraction(2)
    }

    /// Seconds between rebinding attempts: one eighth of the lease.
    pub fn rebinding_secs(&self) -> u32 {
        self.fraction(8)
    }

    fn fraction(&self, divisor: u32) -> u32 {
        if self.is_infinite() {
            Countdown::NEVER
        } else {
            (self.duration_secs / divisor).max(1)
        }
    }

    /// This lease with the address and the options advertised by `packet` applied.
    fn updated(&self, packet: &Packet<'_>) -> Self {
        let mut lease = *self;

        if !packet.yiaddr.is_unspecified() {
            lease.ip = packet.yiaddr;
        }

        for option in packet.options.iter() {
            match option {
                LeaseOption::SubnetMask(mask) => lease.mask = mask,
                LeaseOption::Router(gateway) => lease.gateway = gateway,
                LeaseOption::DomainNameServer(dns) => lease.dns = dns,
                LeaseOption::ServerIdentifier(server_id) => lease.server_id = server_id,
                LeaseOption::IpAddressLeaseTime(secs) => lease.duration_secs = secs,
                _ => (),
            }
        }

        lease
    }
}

impl Default for Lease {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Outbound {
    Discover,
    Request,
    Renew,
}

impl Outbound {
    const fn message_type(&self) -> MessageType {
        match self {
            Self::Discover => MessageType::Discover,
            Self::Request | Self::Renew => MessageType::Request,
        }
    }
}

/// A poll-driven DHCP client state machine.
///
/// The engine never decides when it runs. It is handed one received frame per
/// [`Engine::poll`] call, or a zero-length frame when nothing arrived, and keeps
/// time through a [`Countdown`] which the caller decrements once per second.
pub struct Engine<'t> {
    countdown: &'t Countdown,
    state: State,
    tid: u8,
    retry_secs: u32,
    rebinds: u8,
    offered: Lease,
    lease: Lease,
}

impl<'t> Engine<'t> {
    /// The first discovery/request retry interval
    pub const INITIAL_RETRY_SECS: u32 = 4;
    /// Acquisition is abandoned once the doubled retry interval reaches this
    pub const GIVE_UP_RETRY_SECS: u32 = 32;
    /// Unanswered rebinding intervals after which the lease is deemed lost
    pub const REBINDING_ATTEMPTS: u8 = 4;

    pub const fn new(countdown: &'t Countdown, seed: u8) -> Self {
        Self {
            countdown,
            state: State::Init,
            tid: seed,
            retry_secs: Self::INITIAL_RETRY_SECS,
            rebinds: 0,
            offered: Lease::new(),
            lease: Lease::new(),
        }
    }

    /// Forgets any lease and seeds the transaction counter.
    ///
    /// The seed should be unique among the hosts sharing the broadcast domain,
    /// e.g. the low byte of the hardware address.
    pub fn init(&mut self, seed: u8) {
        self.tid = seed;
        self.reset();
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// A copy of the held lease; the address is unspecified while none is held.
    pub fn lease(&self) -> Lease {
        self.lease
    }

    pub fn tid(&self) -> u8 {
        self.tid
    }

    /// The interval the next discovery/request retry will be armed with.
    pub fn retry_secs(&self) -> u32 {
        self.retry_secs
    }

    pub fn countdown(&self) -> &'t Countdown {
        self.countdown
    }

    /// Processes the frame in `buf[..len]`, or advances the timers when `len` is zero.
    ///
    /// Outbound messages are built in place in `buf`, so the frame must have been fully
    /// handled by the caller's other consumers if this returns a consumed [`Event`].
    pub fn poll<L>(
        &mut self,
        link: &mut L,
        buf: &mut [u8],
        len: usize,
    ) -> Result<Event, Error<L::Error>>
    where
        L: Link,
    {
        if len == 0 {
            self.poll_timers(link, buf)
        } else {
            self.poll_packet(link, buf, len)
        }
    }

    fn poll_timers<L>(&mut self, link: &mut L, buf: &mut [u8]) -> Result<Event, Error<L::Error>>
    where
        L: Link,
    {
        if !link.is_up() {
            return Ok(Event::Ignored);
        }

        match self.state {
            State::Init => {
                self.set_state(State::Selecting);
                self.retry_secs = Self::INITIAL_RETRY_SECS;
                self.countdown.set(self.retry_secs);

                // Offers arrive as broadcasts
                link.set_broadcast(true);

                self.send(link, buf, Outbound::Discover)?;
            }
            State::Selecting | State::Requesting if self.countdown.expired() => {
                self.tid = self.tid.wrapping_add(1);
                self.retry_secs = (self.retry_secs * 2).min(Self::GIVE_UP_RETRY_SECS);

                if self.retry_secs >= Self::GIVE_UP_RETRY_SECS {
                    warn!("Gave up in state {}, starting over", self.state);

                    self.reset();

                    return Ok(Event::Lost);
                }

                self.countdown.set(self.retry_secs);

                let outbound = if self.state == State::Selecting {
                    Outbound::Discover
                } else {
                    Outbound::Request
                };

                self.send(link, buf, outbound)?;
            }
            State::Bound if self.countdown.expired() => {
                self.set_state(State::Rebinding);
                self.rebinds = 0;
                self.tid = self.tid.wrapping_add(1);
                self.countdown.set(self.lease.rebinding_secs());

                link.set_broadcast(true);

                self.send(link, buf, Outbound::Renew)?;
            }
            State::Rebinding if self.countdown.expired() => {
                self.rebinds += 1;
                self.tid = self.tid.wrapping_add(1);

                if self.rebinds >= Self::REBINDING_ATTEMPTS {
                    warn!("Lease on {} expired without renewal", self.lease.ip);

                    self.reset();

                    return Ok(Event::Lost);
                }

                self.countdown.set(self.lease.rebinding_secs());

                self.send(link, buf, Outbound::Renew)?;
            }
            _ => (),
        }

        Ok(Event::Ignored)
    }

    fn poll_packet<L>(
        &mut self,
        link: &mut L,
        buf: &mut [u8],
        len: usize,
    ) -> Result<Event, Error<L::Error>>
    where
        L: Link,
    {
        if !matches!(
            self.state,
            State::Selecting | State::Requesting | State::Rebinding
        ) {
            return Ok(Event::Ignored);
        }

        let Some(frame) = buf.get(..len) else {
            return Ok(Event::Ignored);
        };

        let Some((mt, lease)) = self.accept(link, frame) else {
            return Ok(Event::Ignored);
        };

        debug!("{} received in state {}", mt, self.state);

        let event = match (self.state, mt) {
            (State::Selecting, MessageType::Offer) => {
                info!("{} offered by server {}", lease.ip, lease.server_id);

                self.offered = lease;
                self.set_state(State::Requesting);
                self.retry_secs = Self::INITIAL_RETRY_SECS;
                self.countdown.set(self.retry_secs);

                self.send(link, buf, Outbound::Request)?;

                Event::Consumed
            }
            (State::Requesting, MessageType::Ack) => {
                self.bind(link, lease);

                Event::Acquired
            }
            (State::Rebinding, MessageType::Ack) => {
                self.bind(link, lease);

                Event::Renewed
            }
            (State::Requesting | State::Rebinding, MessageType::Nak) => {
                warn!("Lease on {} refused by server", lease.ip);

                self.tid = self.tid.wrapping_add(1);
                self.reset();

                Event::Lost
            }
            _ => Event::Consumed,
        };

        Ok(event)
    }

    /// Checks that `frame` is a reply correlated with the outstanding transaction and
    /// returns its message type along with the lease it describes.
    fn accept<L>(&self, link: &L, frame: &[u8]) -> Option<(MessageType, Lease)>
    where
        L: Link,
    {
        let datagram = link.datagram(frame)?;

        if datagram.src.port() != SERVER_PORT || datagram.dst.port() != CLIENT_PORT {
            return None;
        }

        let packet = match Packet::decode(datagram.payload) {
            Ok(packet) => packet,
            Err(err) => {
                debug!("Discarding malformed lease message: {}", err);
                return None;
            }
        };

        if !packet.is_for_us(&link.mac(), Packet::xid(self.tid)) {
            trace!("Discarding uncorrelated lease message");
            return None;
        }

        let mt = packet.options.message_type()?;

        let base = match self.state {
            State::Selecting => Lease::new(),
            State::Requesting => self.offered,
            _ => self.lease,
        };

        Some((mt, base.updated(&packet)))
    }

    fn bind<L>(&mut self, link: &mut L, lease: Lease)
    where
        L: Link,
    {
        self.lease = lease;
        self.offered = lease;
        self.set_state(State::Bound);
        self.countdown.set(lease.renewal_secs());

        link.set_broadcast(false);

        info!(
            "Bound to {} gw {} dns {} by server {} for {} secs",
            lease.subnet(),
            lease.gateway,
            lease.dns,
            lease.server_id,
            lease.duration_secs
        );
    }

    fn reset(&mut self) {
        self.set_state(State::Init);
        self.rebinds = 0;
        self.offered = Lease::new();
        self.lease = Lease::new();
    }

    fn set_state(&mut self, state: State) {
        if self.state != state {
            debug!("Lease state {} -> {}", self.state, state);

            self.state = state;
        }
    }

    fn send<L>(&self, link: &mut L, buf: &mut [u8], outbound: Outbound) -> Result<(), Error<L::Error>>
    where
        L: Link,
    {
        let mut opt_buf = Options::buf();

        let (ciaddr, options) = match outbound {
            Outbound::Discover => (Ipv4Addr::UNSPECIFIED, Options::discover(&mut opt_buf)),
            Outbound::Request => (
                Ipv4Addr::UNSPECIFIED,
                Options::request(self.offered.server_id, self.offered.ip, &mut opt_buf),
            ),
            Outbound::Renew => (self.lease.ip, Options::renew(&mut opt_buf)),
        };

        info!("Sending {} (tid {})", outbound.message_type(), self.tid);

        let packet = Packet::new_request(link.mac(), Packet::xid(self.tid), ciaddr, options);

        link.send_udp(
            buf,
            SocketAddrV4::new(ciaddr, CLIENT_PORT),
            SocketAddrV4::new(Ipv4Addr::BROADCAST, SERVER_PORT),
            BROADCAST_MAC,
            |buf| Ok(packet.encode(buf)?),
        )
    }
}

impl core::fmt::Display for State {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let str = match self {
            Self::Init => "INIT",
            Self::Selecting => "SELECTING",
            Self::Requesting => "REQUESTING",
            Self::Bound => "BOUND",
            Self::Rebinding => "REBINDING",
        };

        write!(f, "{}", str)
    }
}
