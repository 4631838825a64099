use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Smallest wait ever applied. A zero read timeout is not a valid socket
/// setting, so shorter bases are raised to this.
pub const MIN_TIMEOUT: Duration = Duration::from_millis(10);

/// How long to wait for an answer, and how many times to try one block.
///
/// Waits grow linearly with the attempt number: attempt `n` waits
/// `n * base_timeout`. Each attempt's wait is derived from the base, never
/// from the previous wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_timeout: Duration,
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(base_timeout: Duration, max_attempts: u32) -> Self {
        Self {
            base_timeout: base_timeout.max(MIN_TIMEOUT),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Wait applied to `attempt` (1-based).
    pub fn timeout_for(&self, attempt: u32) -> Duration {
        self.base_timeout
            .max(MIN_TIMEOUT)
            .saturating_mul(attempt.max(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_MAX_ATTEMPTS)
    }
}
