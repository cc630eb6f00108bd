use std::time::Duration;
use time::OffsetDateTime;

/// Wall clock and sleep primitive used by signing and the polling loops.
pub trait Clock {
    fn now_utc(&self) -> OffsetDateTime;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_utc(&self) -> OffsetDateTime {
        (**self).now_utc()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}
