// Outbound call gate: a fixed number of call starts per second.
// It doesn't bound in-flight calls, only how fast they begin.

use governor::{DefaultDirectRateLimiter, Quota};
use governor::RateLimiter as Governor;
use std::num::NonZeroU32;

pub struct RateLimiter {
    inner: DefaultDirectRateLimiter,
    per_second: NonZeroU32,
}

impl RateLimiter {
    /// Burst is fixed at one so calls are evenly spaced.
    pub fn per_second(per_second: NonZeroU32) -> Self {
        let quota = Quota::per_second(per_second).allow_burst(NonZeroU32::MIN);
        Self {
            inner: Governor::direct(quota),
            per_second,
        }
    }

    /// Wait until the next call is permitted.
    pub async fn acquire(&self) {
        self.inner.until_ready().await;
    }

    pub fn rate(&self) -> NonZeroU32 {
        self.per_second
    }
}
