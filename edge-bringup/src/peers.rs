//! Link-level address resolution of the peers the bring-up has to reach.
//!
//! Resolution is asynchronous: a request goes out tagged with a small
//! correlation tag, and the answer is picked out of some later inbound frame.
//! [`Peers`] is the pending-request table keyed by that tag.

use core::net::Ipv4Addr;

use edge_wire::link::{Error, Link};
use edge_wire::MacAddr;

/// The address-resolution collaborator
pub trait Resolver {
    /// Sends a resolution request for `target`, tagged with `tag`.
    fn resolve<L>(
        &mut self,
        link: &mut L,
        buf: &mut [u8],
        target: Ipv4Addr,
        tag: u8,
    ) -> Result<(), Error<L::Error>>
    where
        L: Link;

    /// Inspects an inbound frame and returns the tag, the resolved address and its
    /// hardware address of the resolution it answers, if any.
    fn poll(&mut self, frame: &[u8]) -> Option<(u8, Ipv4Addr, MacAddr)>;
}

impl<T> Resolver for &mut T
where
    T: Resolver,
{
    fn resolve<L>(
        &mut self,
        link: &mut L,
        buf: &mut [u8],
        target: Ipv4Addr,
        tag: u8,
    ) -> Result<(), Error<L::Error>>
    where
        L: Link,
    {
        (**self).resolve(link, buf, target, tag)
    }

    fn poll(&mut self, frame: &[u8]) -> Option<(u8, Ipv4Addr, MacAddr)> {
        (**self).poll(frame)
    }
}

/// A peer reached directly or through the gateway
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Peer {
    Time = 1,
    Name = 2,
}

impl Peer {
    pub const ALL: [Self; 2] = [Self::Time, Self::Name];

    pub const fn tag(&self) -> u8 {
        *self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|peer| peer.tag() == tag)
    }

    const fn index(&self) -> usize {
        self.tag() as usize - 1
    }
}

impl core::fmt::Display for Peer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Time => write!(f, "time server"),
            Self::Name => write!(f, "name server"),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolution {
    Unresolved,
    Pending,
    Resolved(MacAddr),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct Entry {
    next_hop: Ipv4Addr,
    resolution: Resolution,
}

impl Entry {
    const fn new() -> Self {
        Self {
            next_hop: Ipv4Addr::UNSPECIFIED,
            resolution: Resolution::Unresolved,
        }
    }
}

/// The pending-request table
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Peers([Entry; 2]);

impl Peers {
    pub const fn new() -> Self {
        Self([Entry::new(); 2])
    }

    /// Forgets all next hops and resolutions.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Sets the address at which `peer` is reached. A changed next hop has to be resolved anew.
    pub fn set_next_hop(&mut self, peer: Peer, next_hop: Ipv4Addr) {
        let entry = &mut self.0[peer.index()];

        if entry.next_hop != next_hop {
            entry.next_hop = next_hop;
            entry.resolution = Resolution::Unresolved;
        }
    }

    pub fn next_hop(&self, peer: Peer) -> Ipv4Addr {
        self.0[peer.index()].next_hop
    }

    pub fn resolution(&self, peer: Peer) -> Resolution {
        self.0[peer.index()].resolution
    }

    pub fn mac(&self, peer: Peer) -> Option<MacAddr> {
        match self.resolution(peer) {
            Resolution::Resolved(mac) => Some(mac),
            _ => None,
        }
    }

    pub fn all_resolved(&self) -> bool {
        Peer::ALL.iter().all(|peer| self.mac(*peer).is_some())
    }

    /// The peers still lacking a hardware address, along with their next hops.
    pub fn unresolved(&self) -> impl Iterator<Item = (Peer, Ipv4Addr)> + '_ {
        Peer::ALL
            .into_iter()
            .filter(|peer| self.mac(*peer).is_none())
            .map(|peer| (peer, self.next_hop(peer)))
    }

    pub fn set_pending(&mut self, peer: Peer) {
        self.0[peer.index()].resolution = Resolution::Pending;
    }

    /// Records an answer. Only answers to outstanding requests for the current
    /// next hop are accepted.
    pub fn resolved(&mut self, tag: u8, addr: Ipv4Addr, mac: MacAddr) -> Option<Peer> {
        let peer = Peer::from_tag(tag)?;
        let entry = &mut self.0[peer.index()];

        if entry.resolution != Resolution::Pending || entry.next_hop != addr {
            return None;
        }

        entry.resolution = Resolution::Resolved(mac);

        Some(peer)
    }
}

impl Default for Peers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const GW: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 1);
    const MAC: MacAddr = [2, 0, 0, 0, 0, 1];

    #[test]
    fn test_resolution_order_does_not_matter() {
        let mut peers = Peers::new();
        peers.set_next_hop(Peer::Time, GW);
        peers.set_next_hop(Peer::Name, GW);

        assert_eq!(peers.unresolved().count(), 2);

        // Unsolicited
        assert_eq!(peers.resolved(Peer::Name.tag(), GW, MAC), None);

        peers.set_pending(Peer::Time);
        peers.set_pending(Peer::Name);

        assert_eq!(peers.resolved(Peer::Name.tag(), GW, MAC), Some(Peer::Name));
        assert!(!peers.all_resolved());
        assert_eq!(
            peers.unresolved().collect::<heapless::Vec<_, 2>>(),
            [(Peer::Time, GW)]
        );

        assert_eq!(peers.resolved(Peer::Time.tag(), GW, MAC), Some(Peer::Time));
        assert!(peers.all_resolved());
        assert_eq!(peers.mac(Peer::Time), Some(MAC));

        // Duplicate answers are ignored
        assert_eq!(peers.resolved(Peer::Time.tag(), GW, [0; 6]), None);
        assert_eq!(peers.resolved(42, GW, MAC), None);
    }

    #[test]
    fn test_next_hop_change_invalidates() {
        let mut peers = Peers::new();
        peers.set_next_hop(Peer::Time, GW);
        peers.set_pending(Peer::Time);
        peers.resolved(Peer::Time.tag(), GW, MAC);

        peers.set_next_hop(Peer::Time, GW);
        assert_eq!(peers.mac(Peer::Time), Some(MAC));

        peers.set_next_hop(Peer::Time, Ipv4Addr::new(192, 0, 2, 123));
        assert_eq!(peers.resolution(Peer::Time), Resolution::Unresolved);
    }

    #[test]
    fn test_answer_for_previous_next_hop_is_ignored() {
        let on_link = Ipv4Addr::new(192, 0, 2, 123);

        let mut peers = Peers::new();
        peers.set_next_hop(Peer::Time, GW);
        peers.set_pending(Peer::Time);

        peers.set_next_hop(Peer::Time, on_link);
        peers.set_pending(Peer::Time);

        assert_eq!(peers.resolved(Peer::Time.tag(), GW, MAC), None);
        assert_eq!(peers.resolution(Peer::Time), Resolution::Pending);

        let mac = [2, 0, 0, 0, 0, 0x7b];
        assert_eq!(peers.resolved(Peer::Time.tag(), on_link, mac), Some(Peer::Time));
        assert_eq!(peers.mac(Peer::Time), Some(mac));
    }
}
