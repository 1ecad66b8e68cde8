//! Exponential-backoff retry for tool execution

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::tools::ToolError;

/// Maximum attempts per invocation
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Delay before the second attempt; doubles after each failure
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// Retry configuration for one pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay after the failure of attempt `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, Duration::from_millis(DEFAULT_BASE_DELAY_MS))
    }
}

/// Run `op` until it succeeds, fails non-retryably, or runs out of attempts
///
/// The returned error is always the one produced by the final attempt made.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, ToolError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ToolError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    debug!(max_attempts, "with_retry: called");

    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => {
                debug!(attempt, "with_retry: success");
                return Ok(value);
            }
            Err(e) if attempt + 1 >= max_attempts => {
                debug!(attempt, error = %e, "with_retry: attempts exhausted");
                return Err(e);
            }
            Err(e) if !e.is_retryable() => {
                debug!(attempt, category = %e.category, error = %e, "with_retry: non-retryable error");
                return Err(e);
            }
            Err(e) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt = attempt + 1,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    category = %e.category,
                    error = %e,
                    "with_retry: retrying after failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
