use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default attempt ceiling.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Default per-attempt timeout in milliseconds.
pub const DEFAULT_ATTEMPT_TIMEOUT_MS: u64 = 30_000;

/// Default base delay for the linear backoff in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;

/// Retry and timeout policy for one supervised operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum attempts, including the first one.
    pub max_attempts: usize,
    /// Timeout applied to each attempt in milliseconds.
    pub attempt_timeout_ms: u64,
    /// Base delay of the linear backoff (`attempt * base_delay_ms`).
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            attempt_timeout_ms: DEFAULT_ATTEMPT_TIMEOUT_MS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the default base delay.
    pub fn new(max_attempts: usize, attempt_timeout_ms: u64) -> Self {
        Self {
            max_attempts,
            attempt_timeout_ms,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
        }
    }

    /// Single attempt, no retry.
    pub fn once(attempt_timeout_ms: u64) -> Self {
        Self::new(1, attempt_timeout_ms)
    }

    /// Override the backoff base delay.
    #[must_use]
    pub fn with_base_delay(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    /// Effective attempt ceiling (never below one).
    pub fn attempts(&self) -> usize {
        self.max_attempts.max(1)
    }

    /// Per-attempt timeout.
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    /// Delay to wait after a failed `attempt` (1-based) before the next one.
    pub fn delay_after(&self, attempt: usize) -> Duration {
        Duration::from_millis(self.base_delay_ms.saturating_mul(attempt as u64))
    }

    /// Worst-case wall clock spent by one supervised call.
    pub fn worst_case(&self) -> Duration {
        let attempts = self.attempts();
        let waits: u64 = (1..attempts).map(|a| self.delay_after(a).as_millis() as u64).sum();
        Duration::from_millis(self.attempt_timeout_ms.saturating_mul(attempts as u64) + waits)
    }
}
