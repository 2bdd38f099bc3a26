// Retry strategy for downloads: exponential backoff with jitter

use rand::Rng;
use std::future::Future;
use std::time::Duration;

use crate::errors::DownloadError;

/// Retry strategy trait for calculating retry delays
pub trait RetryStrategy: Send + Sync {
    /// Delay before retry number `attempt` (zero-based), or `None` when exhausted
    fn next_delay(&self, attempt: u32) -> Option<Duration>;
}

/// Exponential backoff retry strategy with jitter
/// Sequence: 1s, 3s, 9s, 27s, 60s, ... (factor 3, capped)
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base_delay_ms: u64,
    max_delay_ms: u64,
    /// Jitter factor (0.0 to 1.0)
    jitter_factor: f64,
    max_retries: u32,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 60_000,
            jitter_factor: 0.1,
            max_retries: 5,
        }
    }
}

impl ExponentialBackoff {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn with_config(base_delay_ms: u64, max_delay_ms: u64, jitter_factor: f64, max_retries: u32) -> Self {
        Self {
            base_delay_ms,
            max_delay_ms,
            jitter_factor: jitter_factor.clamp(0.0, 1.0),
            max_retries,
        }
    }

    fn calculate_base_delay_ms(&self, attempt: u32) -> u64 {
        let factor = 3_u64.saturating_pow(attempt);
        self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms)
    }

    fn add_jitter_ms(&self, base_delay_ms: u64) -> u64 {
        let jitter_range_ms = (base_delay_ms as f64 * self.jitter_factor) as u64;
        if jitter_range_ms == 0 {
            return base_delay_ms;
        }
        base_delay_ms + rand::thread_rng().gen_range(0..=jitter_range_ms)
    }
}

impl RetryStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_retries {
            return None;
        }
        let delay_ms = self.add_jitter_ms(self.calculate_base_delay_ms(attempt));
        Some(Duration::from_millis(delay_ms))
    }
}

/// Fixed delay retry strategy (for testing or simple cases)
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_retries: u32,
}

impl FixedDelay {
    pub fn new(delay: Duration, max_retries: u32) -> Self {
        Self { delay, max_retries }
    }
}

impl RetryStrategy for FixedDelay {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_retries {
            return None;
        }
        Some(self.delay)
    }
}

/// Run `operation` until it succeeds, fails permanently or retries run out
///
/// `operation` runs at most once more than the strategy allows retries.
pub async fn retry_download<T, F, Fut>(
    strategy: &dyn RetryStrategy,
    url: &str,
    mut operation: F,
) -> Result<T, DownloadError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DownloadError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() => match strategy.next_delay(attempt) {
                Some(delay) => {
                    tracing::warn!(
                        url = url,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Download failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    return Err(DownloadError::RetriesExhausted {
                        url: url.to_string(),
                        attempts: attempt + 1,
                        last_error: e.to_string(),
                    })
                }
            },
            Err(e) => return Err(e),
        }
    }
}
