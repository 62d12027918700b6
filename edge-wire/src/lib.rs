#![cfg_attr(not(feature = "std"), no_std)]
#![allow(clippy::uninlined_format_args)]

use core::net::Ipv4Addr;

pub mod bytes;
pub mod link;
pub mod options;

/// A hardware (MAC) address
pub type MacAddr = [u8; 6];

pub const BROADCAST_MAC: MacAddr = [0xff; 6];

/// An error type for decoding and encoding wire data
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Error {
    DataUnderflow,
    BufferOverflow,
    InvalidFormat,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let str = match self {
            Self::DataUnderflow => "Data underflow",
            Self::BufferOverflow => "Buffer overflow",
            Self::InvalidFormat => "Invalid format",
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
            Self::InvalidFormat => "Invalid format",
        };

        defmt::write!(f, "{}", str)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// An interface address together with its subnet mask.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Subnet {
    pub ip: Ipv4Addr,
    pub mask: Ipv4Addr,
}

impl Subnet {
    pub const fn new(ip: Ipv4Addr, mask: Ipv4Addr) -> Self {
        Self { ip, mask }
    }

    /// The network portion of `addr` under this subnet's mask.
    pub fn network_of(&self, addr: Ipv4Addr) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(addr) & u32::from(self.mask))
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        self.network_of(addr) == self.network_of(self.ip)
    }

    /// Whether traffic to `addr` has to be sent to the default gateway.
    pub fn is_routed_via_gateway(&self, addr: Ipv4Addr) -> bool {
        !self.contains(addr)
    }

    /// The next hop for `addr`: the address itself when on-link, `gateway` otherwise.
    pub fn next_hop(&self, addr: Ipv4Addr, gateway: Ipv4Addr) -> Ipv4Addr {
        if self.is_routed_via_gateway(addr) {
            gateway
        } else {
            addr
        }
    }

    /// The number of leading one bits of the mask.
    pub fn prefix_len(&self) -> u8 {
        u32::from(self.mask).leading_ones() as _
    }
}

impl core::fmt::Display for Subnet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.ip, self.prefix_len())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_subnet() {
        let subnet = Subnet::new(
            Ipv4Addr::new(192, 0, 2, 50),
            Ipv4Addr::new(255, 255, 255, 0),
        );

        assert!(subnet.contains(Ipv4Addr::new(192, 0, 2, 1)));
        assert!(subnet.is_routed_via_gateway(Ipv4Addr::new(8, 8, 8, 8)));
        assert!(subnet.is_routed_via_gateway(Ipv4Addr::new(192, 0, 3, 1)));

        let gw = Ipv4Addr::new(192, 0, 2, 1);
        assert_eq!(subnet.next_hop(Ipv4Addr::new(8, 8, 4, 4), gw), gw);
        assert_eq!(
            subnet.next_hop(Ipv4Addr::new(192, 0, 2, 9), gw),
            Ipv4Addr::new(192, 0, 2, 9)
        );

        assert_eq!(subnet.prefix_len(), 24);
        assert_eq!(
            Subnet::new(Ipv4Addr::UNSPECIFIED, Ipv4Addr::new(255, 255, 240, 0)).prefix_len(),
            20
        );
    }
}
