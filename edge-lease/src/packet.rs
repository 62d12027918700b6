use core::net::Ipv4Addr;

use edge_wire::bytes::{BytesIn, BytesOut};
use edge_wire::options::OptionsOut;
use edge_wire::MacAddr;

use super::{Error, Options};

/// A lease negotiation message (BOOTP fixed header plus options trailer).
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Packet<'a> {
    pub reply: bool,
    pub hops: u8,
    pub xid: u32,
    pub secs: u16,
    pub broadcast: bool,
    pub ciaddr: Ipv4Addr,
    pub yiaddr: Ipv4Addr,
    pub siaddr: Ipv4Addr,
    pub giaddr: Ipv4Addr,
    pub chaddr: [u8; 16],
    pub options: Options<'a>,
}

impl<'a> Packet<'a> {
    const COOKIE: [u8; 4] = [99, 130, 83, 99];

    const BOOT_REQUEST: u8 = 1; // From Client
    const BOOT_REPLY: u8 = 2; // From Server

    const HTYPE_ETHERNET: u8 = 1;
    const HLEN_ETHERNET: u8 = 6;

    const SERVER_NAME_AND_FILE_NAME: usize = 64 + 128;

    /// Offset of the magic cookie
    pub const COOKIE_OFFSET: usize = 236;

    /// Length of the fixed header including the magic cookie; the options start here
    pub const HEADER_LEN: usize = Self::COOKIE_OFFSET + 4;

    /// The 32-bit transaction identifier carrying a one-byte transaction counter.
    ///
    /// The counter is repeated over all four bytes of the field.
    pub const fn xid(tid: u8) -> u32 {
        u32::from_ne_bytes([tid; 4])
    }

    pub fn new_request(mac: MacAddr, xid: u32, ciaddr: Ipv4Addr, options: Options<'a>) -> Self {
        let mut chaddr = [0; 16];
        chaddr[..6].copy_from_slice(&mac);

        Self {
            reply: false,
            hops: 0,
            xid,
            secs: 0,
            broadcast: false,
            ciaddr,
            yiaddr: Ipv4Addr::UNSPECIFIED,
            siaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: Ipv4Addr::UNSPECIFIED,
            chaddr,
            options,
        }
    }

    pub fn is_for_us(&self, mac: &MacAddr, xid: u32) -> bool {
        const MAC_TRAILING_ZEROS: [u8; 10] = [0; 10];

        self.reply
            && self.xid == xid
            && self.chaddr[0..6] == *mac
            && self.chaddr[6..16] == MAC_TRAILING_ZEROS
    }

    /// Parses the packet from a byte slice
    pub fn decode(data: &'a [u8]) -> Result<Self, Error> {
        if data.len() < Self::HEADER_LEN {
            Err(Error::DataUnderflow)?;
        }

        let mut bytes = BytesIn::new(data);

        Ok(Self {
            reply: {
                let reply = match bytes.byte()? {
                    Self::BOOT_REPLY => true,
                    Self::BOOT_REQUEST => false,
                    _ => Err(Error::InvalidPacket)?,
                };

                let _htype = bytes.byte()?;

                if bytes.byte()? != Self::HLEN_ETHERNET {
                    Err(Error::InvalidHlen)?;
                }

                reply
            },
            hops: bytes.byte()?,
            xid: u32::from_ne_bytes(bytes.arr()?),
            secs: bytes.be_u16()?,
            broadcast: bytes.be_u16()? & 0x8000 != 0,
            ciaddr: Ipv4Addr::from(bytes.arr::<4>()?),
            yiaddr: Ipv4Addr::from(bytes.arr::<4>()?),
            siaddr: Ipv4Addr::from(bytes.arr::<4>()?),
            giaddr: Ipv4Addr::from(bytes.arr::<4>()?),
            chaddr: bytes.arr()?,
            options: {
                bytes.skip(Self::SERVER_NAME_AND_FILE_NAME)?;

                if bytes.arr()? != Self::COOKIE {
                    Err(Error::MissingCookie)?;
                }

                Options::decode(bytes.remaining())?
            },
        })
    }

    /// Encodes the packet into the provided buf slice, returning the encoded length
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut bytes = BytesOut::new(buf);

        bytes
            .byte(if self.reply {
                Self::BOOT_REPLY
            } else {
                Self::BOOT_REQUEST
            })?
            .byte(Self::HTYPE_ETHERNET)?
            .byte(Self::HLEN_ETHERNET)?
            .byte(self.hops)?
            .push(&u32::to_ne_bytes(self.xid))?
            .be_u16(self.secs)?
            .be_u16(if self.broadcast { 0x8000 } else { 0 })?
            .push(&self.ciaddr.octets())?
            .push(&self.yiaddr.octets())?
            .push(&self.siaddr.octets())?
            .push(&self.giaddr.octets())?
            .push(&self.chaddr)?
            .zeros(Self::SERVER_NAME_AND_FILE_NAME)?
            .push(&Self::COOKIE)?;

        let mut options = OptionsOut::new(&mut bytes);
        self.options.encode(&mut options)?;

        Ok(options.finish()?)
    }
}
