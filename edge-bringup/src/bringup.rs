use core::net::Ipv4Addr;

use edge_lease::{Engine, Event, Lease};
use edge_wire::link::{Error, Link};
use edge_wire::{MacAddr, Subnet};

use crate::{Clock, Config, NameResolver, Peer, Peers, Resolver, TimeSync};

/// The bring-up state
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    LinkDown,
    AcquiringLease,
    ResolvingPeers,
    ResolvingName,
    SyncingTime,
    Ready,
}

impl core::fmt::Display for State {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let str = match self {
            Self::LinkDown => "LINK_DOWN",
            Self::AcquiringLease => "ACQUIRING_LEASE",
            Self::ResolvingPeers => "RESOLVING_PEERS",
            Self::ResolvingName => "RESOLVING_NAME",
            Self::SyncingTime => "SYNCING_TIME",
            Self::Ready => "READY",
        };

        write!(f, "{}", str)
    }
}

/// The active network configuration
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NetConfig {
    pub ip: Ipv4Addr,
    pub mask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub dns: Ipv4Addr,
    pub time_server: Ipv4Addr,
}

impl NetConfig {
    pub const fn new() -> Self {
        Self {
            ip: Ipv4Addr::UNSPECIFIED,
            mask: Ipv4Addr::UNSPECIFIED,
            gateway: Ipv4Addr::UNSPECIFIED,
            dns: Lease::DEFAULT_DNS,
            time_server: Ipv4Addr::UNSPECIFIED,
        }
    }

    pub fn subnet(&self) -> Subnet {
        Subnet::new(self.ip, self.mask)
    }

    /// Where frames for `addr` have to be sent: `addr` itself when on-link, the gateway otherwise.
    pub fn next_hop(&self, addr: Ipv4Addr) -> Ipv4Addr {
        self.subnet().next_hop(addr, self.gateway)
    }
}

impl Default for NetConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// The bring-up orchestrator.
///
/// Poll-driven like the lease [`Engine`] it owns: [`Bringup::poll`] is called with
/// every received frame and with a zero-length frame once per [`Clock::tick`].
pub struct Bringup<'t, R, N, T> {
    clock: &'t Clock,
    engine: Engine<'t>,
    resolver: R,
    names: N,
    time: T,
    config: Config,
    state: State,
    net: NetConfig,
    peers: Peers,
    link_up: bool,
    seeded: bool,
    retries: u8,
    name_resolved: bool,
    lookup_pending: bool,
    sync_pending: bool,
    time_port_low: u8,
    synced_at: Option<u32>,
}

impl<'t, R, N, T> Bringup<'t, R, N, T>
where
    R: Resolver,
    N: NameResolver,
    T: TimeSync,
{
    pub fn new(clock: &'t Clock, config: Config, resolver: R, names: N, time: T) -> Self {
        Self {
            clock,
            engine: Engine::new(&clock.lease, config.seed.unwrap_or(0)),
            resolver,
            names,
            time,
            net: NetConfig {
                time_server: config.time_server,
                ..NetConfig::new()
            },
            config,
            state: State::LinkDown,
            peers: Peers::new(),
            link_up: false,
            seeded: false,
            retries: 0,
            name_resolved: false,
            lookup_pending: false,
            sync_pending: false,
            time_port_low: 0,
            synced_at: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn clock(&self) -> &'t Clock {
        self.clock
    }

    pub fn lease_state(&self) -> edge_lease::State {
        self.engine.state()
    }

    pub fn lease(&self) -> Lease {
        self.engine.lease()
    }

    pub fn net(&self) -> NetConfig {
        self.net
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replaces the configuration and starts over.
    pub fn set_config(&mut self, config: Config) {
        self.net.time_server = config.time_server;
        self.config = config;

        self.restart();
    }

    pub fn peers(&self) -> &Peers {
        &self.peers
    }

    pub fn peer_mac(&self, peer: Peer) -> Option<MacAddr> {
        self.peers.mac(peer)
    }

    /// The instant of the last accepted time-sync reply.
    pub fn synced_at(&self) -> Option<u32> {
        self.synced_at
    }

    /// Whether a freshly acquired address should still be shown.
    pub fn show_address(&self) -> bool {
        !matches!(self.state, State::LinkDown | State::AcquiringLease)
            && !self.clock.indicator.expired()
    }

    /// The origin port of the outstanding time-sync request.
    pub fn time_port(&self) -> u16 {
        self.config
            .time_port_base
            .wrapping_add(self.time_port_low as u16)
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut R {
        &mut self.resolver
    }

    pub fn name_resolver(&self) -> &N {
        &self.names
    }

    pub fn name_resolver_mut(&mut self) -> &mut N {
        &mut self.names
    }

    pub fn time_sync(&self) -> &T {
        &self.time
    }

    pub fn time_sync_mut(&mut self) -> &mut T {
        &mut self.time
    }

    /// Abandons everything; the next zero-length poll starts over with lease acquisition.
    pub fn restart(&mut self) {
        info!("Restarting bring-up from state {}", self.state);

        self.link_up = false;
        self.reset();
    }

    /// Processes the frame in `buf[..len]`, or advances the timers when `len` is zero.
    ///
    /// Returns `true` if the frame was consumed. Outbound messages are built in `buf`,
    /// so an unconsumed frame is left intact for other consumers.
    pub fn poll<L>(
        &mut self,
        link: &mut L,
        buf: &mut [u8],
        len: usize,
    ) -> Result<bool, Error<L::Error>>
    where
        L: Link,
    {
        let consumed = if len > 0 {
            self.receive(link, buf, len)?
        } else {
            self.check_link(link);
            false
        };

        if len == 0 || consumed {
            self.step(link, buf)?;
        }

        Ok(consumed)
    }

    fn check_link<L>(&mut self, link: &mut L)
    where
        L: Link,
    {
        let up = link.is_up();

        if up == self.link_up {
            return;
        }

        self.link_up = up;

        if up {
            let seed = if self.seeded {
                self.engine.tid().wrapping_add(1)
            } else {
                self.config.seed.unwrap_or(link.mac()[5])
            };

            self.seeded = true;

            info!("Link up, acquiring a lease (tid {})", seed);

            self.engine.init(seed);
            self.enter(State::AcquiringLease);
        } else {
            warn!("Link down");

            self.reset();
        }
    }

    fn reset(&mut self) {
        self.set_state(State::LinkDown);
        self.peers.clear();
        self.retries = 0;
        self.name_resolved = false;
        self.lookup_pending = false;
        self.sync_pending = false;

        self.clock.delay.set(0);
        self.clock.indicator.set(0);
        self.clock.resync.disarm();
    }

    fn receive<L>(&mut self, link: &mut L, buf: &mut [u8], len: usize) -> Result<bool, Error<L::Error>>
    where
        L: Link,
    {
        if self.state == State::LinkDown || len > buf.len() {
            return Ok(false);
        }

        let event = self.engine.poll(link, buf, len)?;

        if event.consumed() {
            self.lease_event(link, event);

            return Ok(true);
        }

        let Some(frame) = buf.get(..len) else {
            return Ok(false);
        };

        if let Some((tag, addr, mac)) = self.resolver.poll(frame) {
            if let Some(peer) = self.peers.resolved(tag, addr, mac) {
                info!("{} {} is at {:?}", peer, self.peers.next_hop(peer), mac);
            }

            return Ok(true);
        }

        let Some(datagram) = link.datagram(frame) else {
            return Ok(false);
        };

        let port = self.time_port();

        let consumed = match self.state {
            State::ResolvingName if self.lookup_pending => self.names.poll(&datagram),
            State::SyncingTime | State::Ready if self.sync_pending => {
                match self.time.poll(&datagram, port) {
                    Some(instant) => {
                        self.synced(instant);
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        };

        Ok(consumed)
    }

    fn lease_event<L>(&mut self, link: &mut L, event: Event)
    where
        L: Link,
    {
        match event {
            Event::Acquired if self.state == State::AcquiringLease => self.acquired(link),
            Event::Renewed => self.renewed(link),
            Event::Lost if self.state != State::AcquiringLease => {
                warn!("Lease lost in state {}", self.state);

                self.restart();
            }
            _ => (),
        }
    }

    fn acquired<L>(&mut self, link: &mut L)
    where
        L: Link,
    {
        let literal = self.config.literal_time_server();

        if let Some(time_server) = literal {
            self.net.time_server = time_server;
        }

        self.apply_lease(link, true);

        self.clock.indicator.set(self.config.policy.indicator_secs);

        self.name_resolved = literal.is_some();

        self.enter(State::ResolvingPeers);
    }

    fn renewed<L>(&mut self, link: &mut L)
    where
        L: Link,
    {
        let lease = self.engine.lease();

        info!("Lease on {} renewed", lease.ip);

        let readdressed = lease.ip != self.net.ip || lease.mask != self.net.mask;

        self.apply_lease(link, readdressed);
    }

    /// Takes over the addresses of the current lease. Peers whose next hop
    /// changed lose their hardware address and get resolved again.
    fn apply_lease<L>(&mut self, link: &mut L, configure: bool)
    where
        L: Link,
    {
        let lease = self.engine.lease();

        self.net.ip = lease.ip;
        self.net.mask = lease.mask;
        self.net.gateway = lease.gateway;
        self.net.dns = lease.dns;

        if configure {
            link.configure(lease.ip, lease.mask);

            info!(
                "Configured {} gw {} dns {}",
                self.net.subnet(),
                self.net.gateway,
                self.net.dns
            );
        }

        self.peers
            .set_next_hop(Peer::Name, self.net.next_hop(self.net.dns));
        self.peers
            .set_next_hop(Peer::Time, self.net.next_hop(self.net.time_server));
    }

    fn step<L>(&mut self, link: &mut L, buf: &mut [u8]) -> Result<(), Error<L::Error>>
    where
        L: Link,
    {
        if self.state == State::LinkDown {
            return Ok(());
        }

        let event = self.engine.poll(link, buf, 0)?;
        self.lease_event(link, event);

        match self.state {
            State::ResolvingPeers => self.resolve_peers(link, buf),
            State::ResolvingName => self.resolve_name(link, buf),
            State::SyncingTime | State::Ready => self.sync_time(link, buf),
            _ => Ok(()),
        }
    }

    fn resolve_peers<L>(&mut self, link: &mut L, buf: &mut [u8]) -> Result<(), Error<L::Error>>
    where
        L: Link,
    {
        if self.peers.all_resolved() {
            return if self.name_resolved {
                self.enter_sync(link);
                self.sync_time(link, buf)
            } else {
                self.enter(State::ResolvingName);
                self.resolve_name(link, buf)
            };
        }

        if !self.clock.delay.expired() {
            return Ok(());
        }

        if self.retries >= self.config.policy.peer_retries {
            warn!("Peers unresolved after {} attempts", self.retries);

            self.restart();

            return Ok(());
        }

        self.retries += 1;
        self.clock.delay.set(self.config.policy.peer_retry_secs);

        let unresolved: heapless::Vec<_, 2> = self.peers.unresolved().collect();

        for (peer, next_hop) in unresolved {
            debug!("Resolving {} via {}", peer, next_hop);

            self.peers.set_pending(peer);
            self.resolver.resolve(link, buf, next_hop, peer.tag())?;
        }

        Ok(())
    }

    fn resolve_name<L>(&mut self, link: &mut L, buf: &mut [u8]) -> Result<(), Error<L::Error>>
    where
        L: Link,
    {
        if self.lookup_pending && self.names.has_answer() {
            self.lookup_pending = false;

            let time_server = self.names.resolved_address();

            info!("{} is {}", self.config.hostname.as_str(), time_server);

            return self.name_resolved(link, buf, time_server);
        }

        if !self.clock.delay.expired() {
            return Ok(());
        }

        if self.lookup_pending {
            warn!(
                "No answer for {} (error {})",
                self.config.hostname.as_str(),
                self.names.last_error()
            );

            if self.retries >= self.config.policy.name_retries {
                self.restart();

                return Ok(());
            }
        }

        let Some(peer_mac) = self.peers.mac(Peer::Name) else {
            self.enter(State::ResolvingPeers);

            return Ok(());
        };

        self.retries += 1;
        self.lookup_pending = true;
        self.clock.delay.set(self.config.policy.name_retry_secs);

        debug!("Looking up {}", self.config.hostname.as_str());

        self.names
            .request(link, buf, &self.config.hostname, self.net.dns, peer_mac)
    }

    fn name_resolved<L>(
        &mut self,
        link: &mut L,
        buf: &mut [u8],
        time_server: Ipv4Addr,
    ) -> Result<(), Error<L::Error>>
    where
        L: Link,
    {
        self.net.time_server = time_server;
        self.name_resolved = true;

        let next_hop = self.net.next_hop(time_server);

        if next_hop != self.peers.next_hop(Peer::Time) {
            debug!("Time server now reached via {}", next_hop);

            self.peers.set_next_hop(Peer::Time, next_hop);
            self.enter(State::ResolvingPeers);

            return self.resolve_peers(link, buf);
        }

        self.enter_sync(link);
        self.sync_time(link, buf)
    }

    fn enter_sync<L>(&mut self, link: &mut L)
    where
        L: Link,
    {
        self.enter(State::SyncingTime);

        self.time_port_low = link.mac()[5];
        self.sync_pending = true;
    }

    fn sync_time<L>(&mut self, link: &mut L, buf: &mut [u8]) -> Result<(), Error<L::Error>>
    where
        L: Link,
    {
        if self.state == State::Ready && !self.sync_pending {
            if !self.clock.resync.expired() {
                return Ok(());
            }

            info!("Resynchronizing time");

            self.sync_pending = true;
            self.retries = 0;
            self.clock.delay.set(0);
        }

        if !self.sync_pending || !self.clock.delay.expired() {
            return Ok(());
        }

        if self.retries >= self.config.policy.sync_retries {
            warn!("No time from {} after {} attempts", self.net.time_server, self.retries);

            self.restart();

            return Ok(());
        }

        let Some(peer_mac) = self.peers.mac(Peer::Time) else {
            self.enter(State::ResolvingPeers);

            return Ok(());
        };

        self.retries += 1;
        self.time_port_low = self.time_port_low.wrapping_add(1);
        self.clock.delay.set(self.config.policy.sync_retry_secs);

        let port = self.time_port();

        debug!("Requesting time from {} (port {})", self.net.time_server, port);

        self.time
            .request(link, buf, self.net.time_server, port, peer_mac)
    }

    fn synced(&mut self, instant: u32) {
        info!("Time synchronized: {}", instant);

        self.synced_at = Some(instant);
        self.sync_pending = false;
        self.retries = 0;

        self.clock.resync.set(self.config.resync_period_secs);

        if self.state == State::SyncingTime {
            self.set_state(State::Ready);
        }
    }

    fn enter(&mut self, state: State) {
        self.set_state(state);

        self.retries = 0;
        self.clock.delay.set(0);
    }

    fn set_state(&mut self, state: State) {
        if self.state != state {
            info!("Bring-up state {} -> {}", self.state, state);

            self.state = state;
        }
    }
}
