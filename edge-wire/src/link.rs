//! The framing/transport collaborator.
//!
//! Ethernet, IP and UDP framing live outside of the lease engine and the
//! bring-up orchestrator. Both only ever see the UDP payload of a frame and
//! build their outbound payloads in place, after the link has stamped its
//! headers into the same buffer.

use core::fmt::{self, Debug};
use core::net::{Ipv4Addr, SocketAddrV4};

use crate as wire;
use crate::MacAddr;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Error<E> {
    Io(E),
    Format(wire::Error),
}

impl<E> From<wire::Error> for Error<E> {
    fn from(value: wire::Error) -> Self {
        Self::Format(value)
    }
}

impl<E> fmt::Display for Error<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "IO error: {err}"),
            Self::Format(err) => write!(f, "Format error: {err}"),
        }
    }
}

#[cfg(feature = "defmt")]
impl<E> defmt::Format for Error<E>
where
    E: defmt::Format,
{
    fn format(&self, f: defmt::Formatter<'_>) {
        match self {
            Self::Io(err) => defmt::write!(f, "IO error: {}", err),
            Self::Format(err) => defmt::write!(f, "Format error: {}", err),
        }
    }
}

#[cfg(feature = "std")]
impl<E> std::error::Error for Error<E> where E: std::error::Error {}

/// The UDP view of a received frame.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Datagram<'a> {
    pub src: SocketAddrV4,
    pub dst: SocketAddrV4,
    pub payload: &'a [u8],
}

/// A single network interface with its link-level framing.
pub trait Link {
    type Error: Debug;

    /// The hardware address of the interface.
    fn mac(&self) -> MacAddr;

    /// Whether the physical link is currently up.
    fn is_up(&mut self) -> bool;

    /// Enables or disables the reception of broadcast frames.
    fn set_broadcast(&mut self, enable: bool);

    /// Assigns the interface address once a lease is held.
    fn configure(&mut self, ip: Ipv4Addr, mask: Ipv4Addr);

    /// Stamps the link, IP and UDP headers into `buf` and returns the offset
    /// at which the UDP payload has to be written.
    fn prepare(
        &mut self,
        buf: &mut [u8],
        src: SocketAddrV4,
        dst: SocketAddrV4,
        dst_mac: MacAddr,
    ) -> Result<usize, Self::Error>;

    /// Finalizes lengths and checksums and sends the frame prepared in `buf`.
    fn transmit(&mut self, buf: &mut [u8], payload_len: usize) -> Result<(), Self::Error>;

    /// Extracts the UDP datagram carried by `frame`, if any.
    fn datagram<'b>(&self, frame: &'b [u8]) -> Option<Datagram<'b>>;

    /// Prepares `buf`, lets `encoder` write the payload and transmits the frame.
    fn send_udp<F>(
        &mut self,
        buf: &mut [u8],
        src: SocketAddrV4,
        dst: SocketAddrV4,
        dst_mac: MacAddr,
        encoder: F,
    ) -> Result<(), Error<Self::Error>>
    where
        F: FnOnce(&mut [u8]) -> Result<usize, wire::Error>,
    {
        let offset = self.prepare(buf, src, dst, dst_mac).map_err(Error::Io)?;

        let payload = buf.get_mut(offset..).ok_or(wire::Error::BufferOverflow)?;
        let len = encoder(payload)?;

        self.transmit(buf, len).map_err(Error::Io)
    }
}

impl<T> Link for &mut T
where
    T: Link,
{
    type Error = T::Error;

    fn mac(&self) -> MacAddr {
        (**self).mac()
    }

    fn is_up(&mut self) -> bool {
        (**self).is_up()
    }

    fn set_broadcast(&mut self, enable: bool) {
        (**self).set_broadcast(enable)
    }

    fn configure(&mut self, ip: Ipv4Addr, mask: Ipv4Addr) {
        (**self).configure(ip, mask)
    }

    fn prepare(
        &mut self,
        buf: &mut [u8],
        src: SocketAddrV4,
        dst: SocketAddrV4,
        dst_mac: MacAddr,
    ) -> Result<usize, Self::Error> {
        (**self).prepare(buf, src, dst, dst_mac)
    }

    fn transmit(&mut self, buf: &mut [u8], payload_len: usize) -> Result<(), Self::Error> {
        (**self).transmit(buf, payload_len)
    }

    fn datagram<'b>(&self, frame: &'b [u8]) -> Option<Datagram<'b>> {
        (**self).datagram(frame)
    }
}
