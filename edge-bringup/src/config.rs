use core::net::Ipv4Addr;
use core::str::FromStr;

use edge_lease::Engine;

/// The longest accepted time-sync host name
pub const HOSTNAME_LEN: usize = 24;

pub type Hostname = heapless::String<HOSTNAME_LEN>;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    HostnameTooLong,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::HostnameTooLong => write!(f, "Hostname too long"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter<'_>) {
        match self {
            Self::HostnameTooLong => defmt::write!(f, "Hostname too long"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Retry timing and budgets of the bring-up steps, in seconds and attempts
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Policy {
    pub peer_retry_secs: u32,
    pub peer_retries: u8,
    pub name_retry_secs: u32,
    pub name_retries: u8,
    pub sync_retry_secs: u32,
    pub sync_retries: u8,
    /// How long the freshly acquired address is flagged for display
    pub indicator_secs: u32,
}

impl Policy {
    pub const LEASE_INITIAL_RETRY_SECS: u32 = Engine::INITIAL_RETRY_SECS;
    pub const LEASE_GIVE_UP_RETRY_SECS: u32 = Engine::GIVE_UP_RETRY_SECS;
    pub const LEASE_REBINDING_ATTEMPTS: u8 = Engine::REBINDING_ATTEMPTS;

    pub const fn new() -> Self {
        Self {
            peer_retry_secs: 2,
            peer_retries: 15,
            name_retry_secs: 5,
            name_retries: 6,
            sync_retry_secs: 5,
            sync_retries: 6,
            indicator_secs: 30,
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::new()
    }
}

/// Bring-up configuration
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Host name of the time-sync peer; a dotted IPv4 literal skips name resolution
    pub hostname: Hostname,
    /// Last known address of the time-sync peer
    pub time_server: Ipv4Addr,
    pub resync_period_secs: u32,
    /// Time-sync requests originate from this port plus a cycling low byte
    pub time_port_base: u16,
    /// Transaction identifier seed; the low byte of the hardware address when `None`
    pub seed: Option<u8>,
    pub policy: Policy,
}

impl Config {
    pub const DEFAULT_HOSTNAME: &'static str = "time.apple.com";
    pub const DEFAULT_RESYNC_PERIOD_SECS: u32 = 3600;
    pub const DEFAULT_TIME_PORT_BASE: u16 = 0x0a00;

    pub fn new() -> Self {
        let mut hostname = Hostname::new();
        // Always fits
        let _ = hostname.push_str(Self::DEFAULT_HOSTNAME);

        Self {
            hostname,
            time_server: Ipv4Addr::UNSPECIFIED,
            resync_period_secs: Self::DEFAULT_RESYNC_PERIOD_SECS,
            time_port_base: Self::DEFAULT_TIME_PORT_BASE,
            seed: None,
            policy: Policy::new(),
        }
    }

    pub fn with_hostname(mut self, hostname: &str) -> Result<Self, Error> {
        self.hostname = Hostname::from_str(hostname).map_err(|_| Error::HostnameTooLong)?;

        Ok(self)
    }

    /// The time-sync peer address when the host name is an IPv4 literal.
    pub fn literal_time_server(&self) -> Option<Ipv4Addr> {
        self.hostname.parse().ok()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
