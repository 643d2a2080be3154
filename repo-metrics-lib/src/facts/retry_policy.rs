//! Backoff and wait computation for the fetch retry loop.

use chrono::{DateTime, Utc};
use core::time::Duration;
use rand::Rng;

/// Maximum attempts per request, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff between retries.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(5);

/// Longest single wait for a rate limit to reset.
pub const DEFAULT_MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(3600);

/// Longest total time spent waiting across all retries of one request.
pub const DEFAULT_MAX_TOTAL_WAIT: Duration = Duration::from_secs(3600);

/// Wait used when a rate-limited response carries neither `Retry-After` nor a reset time.
const FALLBACK_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// Margin added to the advertised reset time so the retry lands after the reset.
const RESET_MARGIN: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_rate_limit_wait: Duration,
    pub max_total_wait: Duration,

    /// Scale each backoff delay by a random factor in `0.5..1.5`.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_rate_limit_wait: DEFAULT_MAX_RATE_LIMIT_WAIT,
            max_total_wait: DEFAULT_MAX_TOTAL_WAIT,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Set the maximum number of attempts; at least one attempt is always made.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    #[must_use]
    pub const fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    #[must_use]
    pub const fn with_max_rate_limit_wait(mut self, wait: Duration) -> Self {
        self.max_rate_limit_wait = wait;
        self
    }

    #[must_use]
    pub const fn with_max_total_wait(mut self, wait: Duration) -> Self {
        self.max_total_wait = wait;
        self
    }

    #[must_use]
    pub const fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before the retry that follows failed attempt number `attempt` (1-based).
    ///
    /// The delay is `base_delay * 2^(attempt - 1)`, never more than the total wait budget.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let multiplier = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(multiplier).min(self.max_total_wait);

        if self.jitter {
            let factor = rand::rng().random_range(0.5..1.5);
            delay.mul_f64(factor).min(self.max_total_wait)
        } else {
            delay
        }
    }

    /// How long to wait before retrying a rate-limited request.
    ///
    /// `Retry-After` wins when present, otherwise the wait runs until just past the
    /// advertised reset time. The result never exceeds `max_rate_limit_wait`.
    #[must_use]
    pub fn rate_limit_wait(&self, now: DateTime<Utc>, reset_at: Option<DateTime<Utc>>, retry_after: Option<Duration>) -> Duration {
        let wait = match (retry_after, reset_at) {
            (Some(retry_after), _) => retry_after,
            (None, Some(reset_at)) => (reset_at - now).to_std().unwrap_or(Duration::ZERO) + RESET_MARGIN,
            (None, None) => FALLBACK_RATE_LIMIT_WAIT,
        };

        wait.min(self.max_rate_limit_wait)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> RetryPolicy {
        RetryPolicy::default().with_jitter(false).with_base_delay(Duration::from_secs(1))
    }

    #[test]
    fn test_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(5));
        assert!(policy.jitter);
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = no_jitter();
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(4));
        assert_eq!(policy.backoff_delay(4), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_capped_by_total_wait() {
        let policy = no_jitter().with_max_total_wait(Duration::from_secs(10));
        assert_eq!(policy.backoff_delay(5), Duration::from_secs(10));
        assert_eq!(policy.backoff_delay(200), Duration::from_secs(10));
    }

    #[test]
    fn test_backoff_with_jitter_stays_in_range() {
        let policy = RetryPolicy::default().with_base_delay(Duration::from_secs(4));
        for _ in 0..100 {
            let delay = policy.backoff_delay(2);
            assert!(delay >= Duration::from_secs(4), "delay {delay:?} too short");
            assert!(delay < Duration::from_secs(12), "delay {delay:?} too long");
        }
    }

    #[test]
    fn test_max_attempts_at_least_one() {
        assert_eq!(RetryPolicy::default().with_max_attempts(0).max_attempts, 1);
        assert_eq!(RetryPolicy::default().with_max_attempts(5).max_attempts, 5);
    }

    #[test]
    fn test_rate_limit_wait_prefers_retry_after() {
        let policy = RetryPolicy::default();
        let now = DateTime::from_timestamp(1_000, 0).unwrap();
        let reset = DateTime::from_timestamp(2_000, 0).unwrap();
        assert_eq!(
            policy.rate_limit_wait(now, Some(reset), Some(Duration::from_secs(30))),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_rate_limit_wait_until_reset() {
        let policy = RetryPolicy::default();
        let now = DateTime::from_timestamp(1_000, 0).unwrap();
        let reset = DateTime::from_timestamp(1_120, 0).unwrap();
        assert_eq!(policy.rate_limit_wait(now, Some(reset), None), Duration::from_secs(121));
    }

    #[test]
    fn test_rate_limit_wait_reset_in_past() {
        let policy = RetryPolicy::default();
        let now = DateTime::from_timestamp(1_000, 0).unwrap();
        let reset = DateTime::from_timestamp(900, 0).unwrap();
        assert_eq!(policy.rate_limit_wait(now, Some(reset), None), Duration::from_secs(1));
    }

    #[test]
    fn test_rate_limit_wait_is_capped() {
        let policy = RetryPolicy::default().with_max_rate_limit_wait(Duration::from_secs(600));
        let now = DateTime::from_timestamp(1_000, 0).unwrap();
        let reset = DateTime::from_timestamp(100_000, 0).unwrap();
        assert_eq!(policy.rate_limit_wait(now, Some(reset), None), Duration::from_secs(600));
    }

    #[test]
    fn test_rate_limit_wait_fallback() {
        let policy = RetryPolicy::default();
        let now = DateTime::from_timestamp(1_000, 0).unwrap();
        assert_eq!(policy.rate_limit_wait(now, None, None), Duration::from_secs(60));
    }
}
