use core::net::Ipv4Addr;

use edge_wire::link::{Datagram, Error, Link};
use edge_wire::MacAddr;

/// The time-sync collaborator
pub trait TimeSync {
    /// Sends a time request to `server` from `local_port`, reached through `peer_mac`.
    fn request<L>(
        &mut self,
        link: &mut L,
        buf: &mut [u8],
        server: Ipv4Addr,
        local_port: u16,
        peer_mac: MacAddr,
    ) -> Result<(), Error<L::Error>>
    where
        L: Link;

    /// Inspects an inbound datagram and returns the synchronized instant (seconds)
    /// if it is a reply addressed to `local_port`.
    fn poll(&mut self, datagram: &Datagram<'_>, local_port: u16) -> Option<u32>;
}

impl<T> TimeSync for &mut T
where
    T: TimeSync,
{
    fn request<L>(
        &mut self,
        link: &mut L,
        buf: &mut [u8],
        server: Ipv4Addr,
        local_port: u16,
        peer_mac: MacAddr,
    ) -> Result<(), Error<L::Error>>
    where
        L: Link,
    {
        (**self).request(link, buf, server, local_port, peer_mac)
    }

    fn poll(&mut self, datagram: &Datagram<'_>, local_port: u16) -> Option<u32> {
        (**self).poll(datagram, local_port)
    }
}
