use core::net::Ipv4Addr;

use edge_wire::link::{Datagram, Error, Link};
use edge_wire::MacAddr;

/// The name-resolution collaborator.
///
/// At most one lookup is outstanding; a new request replaces the previous one
/// and clears its answer.
pub trait NameResolver {
    /// Sends a lookup of `hostname` to `server`, reached through `peer_mac`.
    fn request<L>(
        &mut self,
        link: &mut L,
        buf: &mut [u8],
        hostname: &str,
        server: Ipv4Addr,
        peer_mac: MacAddr,
    ) -> Result<(), Error<L::Error>>
    where
        L: Link;

    /// Inspects an inbound datagram; returns `true` if it was the answer to the outstanding lookup.
    fn poll(&mut self, datagram: &Datagram<'_>) -> bool;

    fn has_answer(&self) -> bool;

    /// The address of the last answered lookup.
    fn resolved_address(&self) -> Ipv4Addr;

    /// A collaborator specific error code of the last lookup, zero if none.
    fn last_error(&self) -> u8;
}

impl<T> NameResolver for &mut T
where
    T: NameResolver,
{
    fn request<L>(
        &mut self,
        link: &mut L,
        buf: &mut [u8],
        hostname: &str,
        server: Ipv4Addr,
        peer_mac: MacAddr,
    ) -> Result<(), Error<L::Error>>
    where
        L: Link,
    {
        (**self).request(link, buf, hostname, server, peer_mac)
    }

    fn poll(&mut self, datagram: &Datagram<'_>) -> bool {
        (**self).poll(datagram)
    }

    fn has_answer(&self) -> bool {
        (**self).has_answer()
    }

    fn resolved_address(&self) -> Ipv4Addr {
        (**self).resolved_address()
    }

    fn last_error(&self) -> u8 {
        (**self).last_error()
    }
}
