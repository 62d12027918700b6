#![cfg_attr(not(feature = "std"), no_std)]
#![allow(clippy::uninlined_format_args)]

//! A `no_std` and no-alloc DHCP lease engine for a single interface.
//!
//! The engine is poll-driven: it is handed one received frame (or none) per call,
//! builds its outbound messages in place in the very same buffer, and keeps time
//! exclusively through a [`Countdown`] decremented by a 1 Hz tick.

pub use core::net::Ipv4Addr;

use num_enum::TryFromPrimitive;

use edge_wire as wire;

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod countdown;
pub mod engine;
pub mod options;
pub mod packet;

pub use countdown::Countdown;
pub use engine::{Engine, Event, Lease, State};
pub use options::{LeaseOption, Options};
pub use packet::Packet;

pub const SERVER_PORT: u16 = 67;
pub const CLIENT_PORT: u16 = 68;

/// The lease duration reserved to mean "infinite".
pub const INFINITE: u32 = u32::MAX;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    DataUnderflow,
    BufferOverflow,
    InvalidPacket,
    InvalidMessageType,
    InvalidOption,
    MissingCookie,
    InvalidHlen,
}

impl From<wire::Error> for Error {
    fn from(value: wire::Error) -> Self {
        match value {
            wire::Error::BufferOverflow => Self::BufferOverflow,
            wire::Error::DataUnderflow => Self::DataUnderflow,
            wire::Error::InvalidFormat => Self::InvalidOption,
        }
    }
}

impl From<Error> for wire::Error {
    fn from(value: Error) -> Self {
        match value {
            Error::BufferOverflow => Self::BufferOverflow,
            Error::DataUnderflow => Self::DataUnderflow,
            _ => Self::InvalidFormat,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let str = match self {
            Self::DataUnderflow => "Data underflow",
            Self::BufferOverflow => "Buffer overflow",
            Self::InvalidPacket => "Invalid packet",
            Self::InvalidMessageType => "Invalid message type",
            Self::InvalidOption => "Invalid option",
            Self::MissingCookie => "Missing cookie",
            Self::InvalidHlen => "Invalid hlen",
        };

        write!(f, "{}", str)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter<'_>) {
        let str = match self {
            Self::DataUnderflow => "Data underflow",
            Self::BufferOverflow => "Buffer overflow",
            Self::InvalidPacket => "Invalid packet",
            Self::InvalidMessageType => "Invalid message type",
            Self::InvalidOption => "Invalid option",
            Self::MissingCookie => "Missing cookie",
            Self::InvalidHlen => "Invalid hlen",
        };

        defmt::write!(f, "{}", str)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

///
/// DHCP Message Type, as carried by option 53.
///
/// The client only ever sends `Discover` and `Request`; it never declines or
/// releases a lease.
///
#[derive(Copy, Clone, PartialEq, Eq, Debug, TryFromPrimitive)]
#[repr(u8)]
pub enum MessageType {
    /// Client broadcast to locate available servers.
    Discover = 1,

    /// Server to client in response to DHCPDISCOVER with offer of configuration parameters.
    Offer = 2,

    /// Client message requesting offered parameters from one server, or extending the lease
    /// on the address it already holds.
    Request = 3,

    /// Client to server indicating network address is already in use.
    Decline = 4,

    /// Server to client with configuration parameters, including committed network address.
    Ack = 5,

    /// Server to client indicating client's notion of network address is incorrect, or that
    /// the lease has expired.
    Nak = 6,

    /// Client to server relinquishing network address and cancelling remaining lease.
    Release = 7,

    /// Client to server, asking only for local configuration parameters.
    Inform = 8,
}

impl MessageType {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Discover => "DHCPDISCOVER",
            Self::Offer => "DHCPOFFER",
            Self::Request => "DHCPREQUEST",
            Self::Decline => "DHCPDECLINE",
            Self::Ack => "DHCPACK",
            Self::Nak => "DHCPNAK",
            Self::Release => "DHCPRELEASE",
            Self::Inform => "DHCPINFORM",
        }
    }
}

impl core::fmt::Display for MessageType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for MessageType {
    fn format(&self, f: defmt::Formatter<'_>) {
        defmt::write!(f, "{}", self.name())
    }
}
