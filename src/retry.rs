//! Retry policy for transient API failures.

use std::time::Duration;

use reqwest::StatusCode;

/// Default cap on the delay between two attempts.
pub const DEFAULT_MAX_RETRY_INTERVAL: Duration = Duration::from_secs(30);

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Controls whether and how failed requests are retried.
///
/// Disabled by default. When enabled, 429 responses, 5xx responses other
/// than 501, and connect/timeout errors are retried with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of retries after the initial attempt.
    pub max_retries: u32,
    /// Upper bound for any single delay.
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

impl RetryPolicy {
    /// Never retry.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            max_interval: DEFAULT_MAX_RETRY_INTERVAL,
        }
    }

    /// Retry up to `max_retries` times, never waiting longer than `max_interval`.
    #[must_use]
    pub fn new(max_retries: u32, max_interval: Duration) -> Self {
        Self {
            max_retries,
            max_interval,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }

    /// Whether a response status is worth another attempt.
    pub fn is_retryable_status(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS
            || (status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED)
    }

    /// Whether a transport error is worth another attempt.
    pub fn is_retryable_error(err: &reqwest::Error) -> bool {
        err.is_connect() || err.is_timeout()
    }

    /// Delay before retry number `attempt` (1-based).
    ///
    /// `retry_after` is the server's `Retry-After` hint in seconds and takes
    /// precedence over the computed backoff. Both are capped at `max_interval`.
    pub fn backoff(&self, attempt: u32, retry_after: Option<u64>) -> Duration {
        let delay = match retry_after {
            Some(secs) => Duration::from_secs(secs),
            None => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                INITIAL_BACKOFF.saturating_mul(factor)
            }
        };
        delay.min(self.max_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_disabled() {
        assert!(!RetryPolicy::default().is_enabled());
        assert!(RetryPolicy::new(3, DEFAULT_MAX_RETRY_INTERVAL).is_enabled());
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(RetryPolicy::is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(RetryPolicy::is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(RetryPolicy::is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!RetryPolicy::is_retryable_status(StatusCode::NOT_IMPLEMENTED));
        assert!(!RetryPolicy::is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!RetryPolicy::is_retryable_status(StatusCode::PRECONDITION_FAILED));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(10, Duration::from_secs(5));
        assert_eq!(policy.backoff(1, None), Duration::from_secs(1));
        assert_eq!(policy.backoff(2, None), Duration::from_secs(2));
        assert_eq!(policy.backoff(3, None), Duration::from_secs(4));
        assert_eq!(policy.backoff(4, None), Duration::from_secs(5));
        assert_eq!(policy.backoff(40, None), Duration::from_secs(5));
    }

    #[test]
    fn test_retry_after_overrides_backoff() {
        let policy = RetryPolicy::new(3, Duration::from_secs(30));
        assert_eq!(policy.backoff(1, Some(7)), Duration::from_secs(7));
        assert_eq!(policy.backoff(1, Some(120)), Duration::from_secs(30));
    }
}
