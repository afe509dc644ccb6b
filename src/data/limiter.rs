//! Request pacing shared by all fetch workers.

use std::fmt;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};

type DirectRateLimiter = Governor<NotKeyed, InMemoryState, DefaultClock>;

/// Token bucket allowing one upstream request per `interval`, burst of one.
///
/// Blocking callers sleep until the bucket refills; a zero interval disables
/// pacing.
pub struct RateLimiter {
    interval: Duration,
    bucket: Option<DirectRateLimiter>,
    clock: DefaultClock,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            bucket: Quota::with_period(interval).map(DirectRateLimiter::direct),
            clock: DefaultClock::default(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until the caller may issue a request.
    pub fn acquire(&self) {
        let Some(bucket) = &self.bucket else {
            return;
        };
        while let Err(not_until) = bucket.check() {
            std::thread::sleep(not_until.wait_time_from(self.clock.now()));
        }
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("interval", &self.interval)
            .field("enabled", &self.bucket.is_some())
            .finish()
    }
}
