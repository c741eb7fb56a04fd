//! Bounded retry with exponential backoff for favorite writes.

use autotrader_core::favorites::{
    backoff_millis, FAVORITES_MAX_RETRIES, FAVORITES_RETRY_BASE_DELAY_MS,
};
use log::debug;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            FAVORITES_MAX_RETRIES,
            Duration::from_millis(FAVORITES_RETRY_BASE_DELAY_MS),
        )
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry `retry` (1-indexed): `base * 2^(retry - 1)`.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let base_ms = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(backoff_millis(base_ms, retry))
    }
}

/// Runs `op` until it succeeds, `is_retryable` rejects its error, or the
/// policy's attempts are used up. The last error is returned on failure.
pub async fn run_with_retry<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    mut op: F,
    is_retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !is_retryable(&err) {
            debug!(
                "[Favorites] Attempt {}/{} failed with non-retryable error: {}",
                attempt, max_attempts, err
            );
            return Err(err);
        }
        if attempt >= max_attempts {
            debug!(
                "[Favorites] Giving up after {} attempts: {}",
                attempt, err
            );
            return Err(err);
        }

        let delay = policy.delay_for_retry(attempt);
        debug!(
            "[Favorites] Retry attempt {}/{} in {:?} after error: {}",
            attempt + 1,
            max_attempts,
            delay,
            err
        );
        sleep(delay).await;
    }
}
