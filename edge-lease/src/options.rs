use core::net::Ipv4Addr;

use num_enum::TryFromPrimitive;

use edge_wire::bytes::BytesIn;
use edge_wire::options::{OptionsIn, OptionsOut, RawOption};

use super::{Error, MessageType};

/// The options of a lease message: either borrowed straight from a received
/// trailer, or a list of typed options to encode.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Options<'a>(OptionsInner<'a>);

impl<'a> Options<'a> {
    /// Subnet mask, router, domain name server.
    pub const REQUEST_PARAMS: &'static [u8] = &[
        LeaseOption::CODE_SUBNET,
        LeaseOption::CODE_ROUTER,
        LeaseOption::CODE_DNS,
    ];

    pub const fn new(options: &'a [LeaseOption<'a>]) -> Self {
        Self(OptionsInner::DataSlice(options))
    }

    #[inline(always)]
    pub const fn buf() -> [LeaseOption<'a>; 4] {
        [LeaseOption::Unrecognized(0, &[]); 4]
    }

    pub fn discover(buf: &'a mut [LeaseOption<'a>]) -> Self {
        buf[0] = LeaseOption::MessageType(MessageType::Discover);
        buf[1] = LeaseOption::ParameterRequestList(Self::REQUEST_PARAMS);

        Self::new(&buf[..2])
    }

    /// A request for the offered address. Unspecified addresses are left out.
    pub fn request(
        server_id: Ipv4Addr,
        requested_ip: Ipv4Addr,
        buf: &'a mut [LeaseOption<'a>],
    ) -> Self {
        buf[0] = LeaseOption::MessageType(MessageType::Request);

        let mut offset = 1;

        if !server_id.is_unspecified() {
            buf[offset] = LeaseOption::ServerIdentifier(server_id);
            offset += 1;
        }

        if !requested_ip.is_unspecified() {
            buf[offset] = LeaseOption::RequestedIpAddress(requested_ip);
            offset += 1;
        }

        buf[offset] = LeaseOption::ParameterRequestList(Self::REQUEST_PARAMS);
        offset += 1;

        Self::new(&buf[..offset])
    }

    /// A renewal request: the held address travels in `ciaddr`, so neither the
    /// server identifier nor the requested address may be present.
    pub fn renew(buf: &'a mut [LeaseOption<'a>]) -> Self {
        buf[0] = LeaseOption::MessageType(MessageType::Request);

        Self::new(&buf[..1])
    }

    pub(crate) fn decode(data: &'a [u8]) -> Result<Self, Error> {
        for option in OptionsIn::new(data) {
            LeaseOption::decode(option?)?;
        }

        Ok(Self(OptionsInner::ByteSlice(data)))
    }

    pub(crate) fn encode(&self, out: &mut OptionsOut) -> Result<(), Error> {
        for option in self.iter() {
            option.encode(out)?;
        }

        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = LeaseOption<'a>> + 'a {
        self.0.iter()
    }

    pub fn message_type(&self) -> Option<MessageType> {
        self.iter().find_map(|option| {
            if let LeaseOption::MessageType(mt) = option {
                Some(mt)
            } else {
                None
            }
        })
    }

    pub fn server_identifier(&self) -> Option<Ipv4Addr> {
        self.iter().find_map(|option| {
            if let LeaseOption::ServerIdentifier(ip) = option {
                Some(ip)
            } else {
                None
            }
        })
    }

    pub fn parameter_request_list(&self) -> Option<&'a [u8]> {
        self.iter().find_map(|option| {
            if let LeaseOption::ParameterRequestList(params) = option {
                Some(params)
            } else {
                None
            }
        })
    }
}

impl core::fmt::Debug for Options<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum OptionsInner<'a> {
    ByteSlice(&'a [u8]),
    DataSlice(&'a [LeaseOption<'a>]),
}

impl<'a> OptionsInner<'a> {
    fn iter(&self) -> impl Iterator<Item = LeaseOption<'a>> + 'a {
        match self {
            // Validated in `Options::decode`, so nothing is dropped here
            Self::ByteSlice(data) => EitherIterator::First(
                OptionsIn::new(data)
                    .filter_map(|option| option.ok().and_then(|o| LeaseOption::decode(o).ok())),
            ),
            Self::DataSlice(data) => EitherIterator::Second(data.iter().cloned()),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LeaseOption<'a> {
    /// 1: Subnet Mask
    SubnetMask(Ipv4Addr),
    /// 3: Router Option (first router of the list)
    Router(Ipv4Addr),
    /// 6: Domain Name Server Option (first server of the list)
    DomainNameServer(Ipv4Addr),
    /// 50: Requested IP Address
    RequestedIpAddress(Ipv4Addr),
    /// 51: IP Address Lease Time
    IpAddressLeaseTime(u32),
    /// 53: DHCP Message Type
    MessageType(MessageType),
    /// 54: Server Identifier
    ServerIdentifier(Ipv4Addr),
    /// 55: Parameter Request List
    ParameterRequestList(&'a [u8]),
    // Other (unrecognized)
    Unrecognized(u8, &'a [u8]),
}

impl<'a> LeaseOption<'a> {
    pub const CODE_SUBNET: u8 = SUBNET_MASK;
    pub const CODE_ROUTER: u8 = ROUTER;
    pub const CODE_DNS: u8 = DOMAIN_NAME_SERVER;

    fn decode(raw: RawOption<'a>) -> Result<Self, Error> {
        let data = raw.data;
        let addr = || BytesIn::new(data).remaining_arr::<4>().ok().map(Ipv4Addr::from);

        let option = match raw.code {
            SUBNET_MASK => addr().map(Self::SubnetMask),
            ROUTER => first_addr(data).map(Self::Router),
            DOMAIN_NAME_SERVER => first_addr(data).map(Self::DomainNameServer),
            REQUESTED_IP_ADDRESS => addr().map(Self::RequestedIpAddress),
            IP_ADDRESS_LEASE_TIME => BytesIn::new(data)
                .remaining_arr()
                .ok()
                .map(|secs| Self::IpAddressLeaseTime(u32::from_be_bytes(secs))),
            DHCP_MESSAGE_TYPE => match data {
                [mt] => Some(Self::MessageType(
                    MessageType::try_from_primitive(*mt).map_err(|_| Error::InvalidMessageType)?,
                )),
                _ => None,
            },
            SERVER_IDENTIFIER => addr().map(Self::ServerIdentifier),
            PARAMETER_REQUEST_LIST => Some(Self::ParameterRequestList(data)),
            _ => None,
        };

        // Known options of an unexpected length are skipped like unknown ones
        Ok(option.unwrap_or(Self::Unrecognized(raw.code, data)))
    }

    fn encode(&self, out: &mut OptionsOut) -> Result<(), Error> {
        let code = self.code();

        match self {
            Self::SubnetMask(addr)
            | Self::Router(addr)
            | Self::DomainNameServer(addr)
            | Self::RequestedIpAddress(addr)
            | Self::ServerIdentifier(addr) => out.option(code, &addr.octets()),
            Self::IpAddressLeaseTime(secs) => out.option(code, &secs.to_be_bytes()),
            Self::MessageType(mt) => out.option(code, &[*mt as u8]),
            Self::ParameterRequestList(data) | Self::Unrecognized(_, data) => {
                out.option(code, data)
            }
        }?;

        Ok(())
    }

    pub const fn code(&self) -> u8 {
        match self {
            Self::SubnetMask(_) => SUBNET_MASK,
            Self::Router(_) => ROUTER,
            Self::DomainNameServer(_) => DOMAIN_NAME_SERVER,
            Self::RequestedIpAddress(_) => REQUESTED_IP_ADDRESS,
            Self::IpAddressLeaseTime(_) => IP_ADDRESS_LEASE_TIME,
            Self::MessageType(_) => DHCP_MESSAGE_TYPE,
            Self::ServerIdentifier(_) => SERVER_IDENTIFIER,
            Self::ParameterRequestList(_) => PARAMETER_REQUEST_LIST,
            Self::Unrecognized(code, _) => *code,
        }
    }
}

/// The first address of an address-list option.
fn first_addr(data: &[u8]) -> Option<Ipv4Addr> {
    if data.len() % 4 != 0 {
        return None;
    }

    BytesIn::new(data).arr::<4>().ok().map(Ipv4Addr::from)
}

enum EitherIterator<F, S> {
    First(F),
    Second(S),
}

impl<F, S> Iterator for EitherIterator<F, S>
where
    F: Iterator,
    S: Iterator<Item = F::Item>,
{
    type Item = F::Item;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::First(iter) => iter.next(),
            Self::Second(iter) => iter.next(),
        }
    }
}

const SUBNET_MASK: u8 = 1;
const ROUTER: u8 = 3;
const DOMAIN_NAME_SERVER: u8 = 6;

const REQUESTED_IP_ADDRESS: u8 = 50;
const IP_ADDRESS_LEASE_TIME: u8 = 51;
const DHCP_MESSAGE_TYPE: u8 = 53;
const SERVER_IDENTIFIER: u8 = 54;
const PARAMETER_REQUEST_LIST: u8 = 55;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_decode_typed() {
        let data = [
            53, 1, 5, 1, 4, 255, 255, 255, 0, 3, 8, 192, 0, 2, 1, 192, 0, 2, 2, 51, 4, 0, 0, 14,
            16, 99, 2, 0xab, 0xcd, 255,
        ];

        let options = Options::decode(&data).unwrap();
        let mut iter = options.iter();

        assert_eq!(iter.next(), Some(LeaseOption::MessageType(MessageType::Ack)));
        assert_eq!(
            iter.next(),
            Some(LeaseOption::SubnetMask(Ipv4Addr::new(255, 255, 255, 0)))
        );
        assert_eq!(
            iter.next(),
            Some(LeaseOption::Router(Ipv4Addr::new(192, 0, 2, 1)))
        );
        assert_eq!(iter.next(), Some(LeaseOption::IpAddressLeaseTime(3600)));
        assert_eq!(
            iter.next(),
            Some(LeaseOption::Unrecognized(99, &[0xab, 0xcd]))
        );
        assert_eq!(iter.next(), None);

        assert_eq!(options.message_type(), Some(MessageType::Ack));
        assert_eq!(options.server_identifier(), None);
    }

    #[test]
    fn test_decode_rejects_bad_values() {
        assert_eq!(
            Options::decode(&[53, 1, 42]).err(),
            Some(Error::InvalidMessageType)
        );
        assert_eq!(
            Options::decode(&[53, 1, 2, 54, 4, 1, 2]).err(),
            Some(Error::DataUnderflow)
        );
    }

    #[test]
    fn test_unexpected_lengths_are_skipped() {
        let data = [
            53, 1, 5, 1, 3, 255, 255, 0, 3, 6, 1, 2, 3, 4, 5, 6, 6, 8, 203, 0, 113, 53, 8, 8, 8,
            8, 54, 2, 192, 0, 255,
        ];

        let options = Options::decode(&data).unwrap();
        let mut iter = options.iter();

        assert_eq!(iter.next(), Some(LeaseOption::MessageType(MessageType::Ack)));
        assert_eq!(
            iter.next(),
            Some(LeaseOption::Unrecognized(1, &[255, 255, 0]))
        );
        assert_eq!(
            iter.next(),
            Some(LeaseOption::Unrecognized(3, &[1, 2, 3, 4, 5, 6]))
        );
        assert_eq!(
            iter.next(),
            Some(LeaseOption::DomainNameServer(Ipv4Addr::new(203, 0, 113, 53)))
        );
        assert_eq!(iter.next(), Some(LeaseOption::Unrecognized(54, &[192, 0])));
        assert_eq!(iter.next(), None);

        assert_eq!(options.server_identifier(), None);
    }

    #[test]
    fn test_request_skips_unspecified() {
        let mut buf = Options::buf();
        let options = Options::request(
            Ipv4Addr::UNSPECIFIED,
            Ipv4Addr::new(192, 0, 2, 50),
            &mut buf,
        );

        let mut iter = options.iter();
        assert_eq!(
            iter.next(),
            Some(LeaseOption::MessageType(MessageType::Request))
        );
        assert_eq!(
            iter.next(),
            Some(LeaseOption::RequestedIpAddress(Ipv4Addr::new(192, 0, 2, 50)))
        );
        assert_eq!(
            iter.next(),
            Some(LeaseOption::ParameterRequestList(Options::REQUEST_PARAMS))
        );
        assert_eq!(iter.next(), None);
    }
}
