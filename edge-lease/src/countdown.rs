use core::sync::atomic::{AtomicU32, Ordering};

/// A seconds counter decremented by a 1 Hz tick.
///
/// The tick may arrive from an interrupt handler while the poll loop reads or
/// re-arms the same counter, so every access is a single atomic operation and
/// the decrement is one indivisible read-modify-write. The counter saturates at
/// zero and [`Countdown::NEVER`] is never decremented.
#[derive(Debug)]
pub struct Countdown(AtomicU32);

impl Countdown {
    /// The reserved value meaning "never expires".
    pub const NEVER: u32 = u32::MAX;

    pub const fn new(secs: u32) -> Self {
        Self(AtomicU32::new(secs))
    }

    /// Decrements the counter by one second. Safe to call from an interrupt context.
    pub fn tick(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |secs| {
                (secs != 0 && secs != Self::NEVER).then(|| secs - 1)
            });
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, secs: u32) {
        self.0.store(secs, Ordering::Release);
    }

    pub fn expired(&self) -> bool {
        self.get() == 0
    }

    pub fn disarm(&self) {
        self.set(Self::NEVER);
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_saturates() {
        let countdown = Countdown::new(2);

        countdown.tick();
        assert_eq!(countdown.get(), 1);
        assert!(!countdown.expired());

        countdown.tick();
        countdown.tick();
        assert_eq!(countdown.get(), 0);
        assert!(countdown.expired());
    }

    #[test]
    fn test_never_expires() {
        let countdown = Countdown::new(5);
        countdown.disarm();

        for _ in 0..10 {
            countdown.tick();
        }

        assert_eq!(countdown.get(), Countdown::NEVER);
    }
}
