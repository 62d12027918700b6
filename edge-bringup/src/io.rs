use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Ticker};

use edge_nal::RawReceive;
use edge_wire::link::Link;

use crate::{Bringup, NameResolver, Resolver, TimeSync};

/// Runs `bringup` forever, ticking its clock once per second.
///
/// Frames are received into `buf` one at a time. Frames the bring-up does not
/// consume are passed to `unhandled` along with the link and their length, which
/// is where e.g. a configuration server hooks in.
///
/// Failed transmissions are logged and retried by the step which issued them.
/// Only a receive error ends the loop.
pub async fn run<RX, L, R, N, T, F>(
    bringup: &mut Bringup<'_, R, N, T>,
    rx: &mut RX,
    link: &mut L,
    buf: &mut [u8],
    mut unhandled: F,
) -> Result<(), RX::Error>
where
    RX: RawReceive,
    L: Link,
    R: Resolver,
    N: NameResolver,
    T: TimeSync,
    F: FnMut(&mut L, &mut [u8], usize),
{
    let clock = bringup.clock();
    let mut ticker = Ticker::every(Duration::from_secs(1));

    loop {
        let len = match select(rx.receive(buf), ticker.next()).await {
            Either::First(result) => {
                let (len, _remote) = result?;

                // Truncated frames are of no use to anyone
                if len > buf.len() {
                    trace!("Dropping truncated frame of {} bytes", len);
                    continue;
                }

                len
            }
            Either::Second(()) => {
                clock.tick();
                0
            }
        };

        match bringup.poll(link, buf, len) {
            Ok(consumed) => {
                if len > 0 && !consumed {
                    unhandled(link, buf, len);
                }
            }
            Err(_) => warn!("Transmission failed in state {}", bringup.state()),
        }
    }
}

#[cfg(test)]
mod test {
    extern crate std;

    use core::net::{Ipv4Addr, SocketAddrV4};

    use embassy_futures::block_on;
    use embedded_io_async::{ErrorKind, ErrorType};

    use edge_wire::MacAddr;

    use crate::mock::{frame, MockLink, MockNames, MockResolver, MockTime};
    use crate::{Clock, Config, State};

    use super::*;

    struct MockRx(std::vec::Vec<std::vec::Vec<u8>>);

    impl ErrorType for MockRx {
        type Error = ErrorKind;
    }

    impl RawReceive for MockRx {
        async fn receive(&mut self, buffer: &mut [u8]) -> Result<(usize, MacAddr), Self::Error> {
            if self.0.is_empty() {
                return Err(ErrorKind::Other);
            }

            let frame = self.0.remove(0);
            buffer[..frame.len()].copy_from_slice(&frame);

            Ok((frame.len(), [0xff; 6]))
        }
    }

    #[test]
    fn test_unhandled_frames_are_passed_on() {
        let clock = Clock::new();
        let mut bringup = Bringup::new(
            &clock,
            Config::new(),
            MockResolver::new(),
            MockNames::new(),
            MockTime::new(),
        );

        let mut buf = [0; 600];
        let len = frame(
            &mut buf,
            SocketAddrV4::new(Ipv4Addr::new(192, 0, 2, 9), 1234),
            SocketAddrV4::new(Ipv4Addr::new(192, 0, 2, 50), 80),
            b"GET / HTTP/1.0\r\n\r\n",
        );

        let mut rx = MockRx(std::vec![buf[..len].to_vec(), buf[..len].to_vec()]);
        let mut link = MockLink::new();

        let mut seen = 0;

        let result = block_on(run(&mut bringup, &mut rx, &mut link, &mut buf, |_, buf, len| {
            assert_eq!(&buf[len - 4..len], b"\r\n\r\n");
            seen += 1;
        }));

        assert_eq!(result, Err(ErrorKind::Other));
        assert_eq!(seen, 2);
        assert_eq!(bringup.state(), State::LinkDown);
    }
}
