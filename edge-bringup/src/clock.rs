use edge_lease::Countdown;

/// All countdowns of the bring-up, decremented together by the 1 Hz tick.
///
/// Usually placed in a `static` so that a timer interrupt can call
/// [`Clock::tick`] while the poll loop owns the [`crate::Bringup`].
#[derive(Debug, Default)]
pub struct Clock {
    /// Lease retry, renewal and rebinding
    pub lease: Countdown,
    /// Retry delay of the active resolution/sync step
    pub delay: Countdown,
    /// Remaining display time of a freshly acquired address
    pub indicator: Countdown,
    /// Time until the next time resynchronization
    pub resync: Countdown,
}

impl Clock {
    pub const fn new() -> Self {
        Self {
            lease: Countdown::new(0),
            delay: Countdown::new(0),
            indicator: Countdown::new(0),
            resync: Countdown::new(Countdown::NEVER),
        }
    }

    pub fn tick(&self) {
        self.lease.tick();
        self.delay.tick();
        self.indicator.tick();
        self.resync.tick();
    }
}
