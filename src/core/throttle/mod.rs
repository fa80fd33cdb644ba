// Throttling for outbound platform calls.
// Each logical client owns one `Throttle`, shared by every concurrent flow.

pub mod rate_limiter;
pub mod retry_policy;

pub use rate_limiter::RateLimiter;
pub use retry_policy::RetryPolicy;

use std::fmt;
use std::future::Future;

pub struct Throttle {
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl Throttle {
    pub fn new(limiter: RateLimiter, retry: RetryPolicy) -> Self {
        Self { limiter, retry }
    }

    /// Wait for a rate slot once, then run `op` under the retry policy.
    pub async fn run<F, Fut, T, E>(&self, op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.limiter.acquire().await;
        self.retry.execute(op).await
    }
}
