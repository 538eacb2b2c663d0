//! Retry and timeout policy

use std::time::Duration;

/// How long to wait per attempt and how many attempts to make
///
/// `max_retries` is the total number of attempts; at least one attempt is
/// always made. Between attempts the delay doubles from `initial_backoff`
/// up to `max_backoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(timeout: Duration, max_retries: u32) -> Self {
        Self {
            timeout,
            max_retries,
            ..Self::default()
        }
    }

    /// Disables the sleep between attempts
    pub fn without_backoff(mut self) -> Self {
        self.initial_backoff = Duration::ZERO;
        self.max_backoff = Duration::ZERO;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Delay to wait after the given (1-based) failed attempt
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Upper bound on how long one `execute` call can take
    pub fn worst_case(&self) -> Duration {
        let attempts = self.max_attempts();
        let waiting: Duration = (1..attempts).map(|a| self.backoff_after(a)).sum();
        self.timeout.saturating_mul(attempts).saturating_add(waiting)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(5),
        }
    }
}
