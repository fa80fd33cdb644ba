// Fixed retry policy for remote calls: 10 attempts, 1 second apart.
// Every error is retried the same way; the last one is returned.

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::Retry;

pub const DEFAULT_ATTEMPTS: usize = 10;
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: usize,
    delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: usize, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `op` until it succeeds or the attempts run out.
    pub async fn execute<F, Fut, T, E>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let attempts = self.attempts;
        let strategy = FixedInterval::new(self.delay).take(attempts - 1);
        let mut attempt = 0usize;

        Retry::spawn(strategy, || {
            attempt += 1;
            let current = attempt;
            let call = op();
            async move {
                call.await.inspect_err(|err| {
                    tracing::warn!(attempt = current, attempts, "Remote call failed: {}", err);
                })
            }
        })
        .await
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPTS, DEFAULT_DELAY)
    }
}
