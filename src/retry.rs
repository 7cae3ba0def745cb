//! The bounded retry policy applied to every logical request.
//!
//! A logical call makes at most two attempts. The only errors that earn the
//! second attempt are a rate-limit response (after the delay it carries) and
//! a transport failure (after a fixed backoff). Whatever the second attempt
//! returns is final.

use crate::Error;
use std::time::Duration;

/// Total attempts per logical call, retry included.
pub const MAX_ATTEMPTS: usize = 2;

/// Backoff before retrying a failed transport call.
pub const DEFAULT_TRANSPORT_BACKOFF: Duration = Duration::from_millis(1_000);

/// Decides whether, and after how long, a failed attempt is retried.
///
/// # Examples
///
/// ```
/// use posthog_insights::RetryPolicy;
/// use std::time::Duration;
///
/// // Default: retry 429s and transport failures once each.
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.transport_backoff, Duration::from_millis(1_000));
///
/// // Fail fast on everything.
/// let strict = RetryPolicy::none();
/// assert!(!strict.retry_rate_limited);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retry once after a 429, waiting the delay attached to the error.
    pub retry_rate_limited: bool,
    /// Retry once after a failed transport call.
    pub retry_transport: bool,
    /// Wait before the transport retry.
    pub transport_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_rate_limited: true,
            retry_transport: true,
            transport_backoff: DEFAULT_TRANSPORT_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            retry_rate_limited: false,
            retry_transport: false,
            ..Default::default()
        }
    }

    /// Returns the delay before the next attempt, or `None` to give up.
    ///
    /// # Arguments
    ///
    /// * `error` - The error the attempt failed with
    /// * `attempt` - The attempt that failed (1-indexed)
    pub fn delay_for(&self, error: &Error, attempt: usize) -> Option<Duration> {
        if attempt >= MAX_ATTEMPTS {
            return None;
        }

        match error {
            Error::RateLimited { retry_after, .. } if self.retry_rate_limited => {
                Some(*retry_after)
            }
            // Timeouts share the Transport kind but are not retried.
            Error::Transport { .. } if self.retry_transport => Some(self.transport_backoff),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use http::StatusCode;

    fn rate_limited(delay: Duration) -> Error {
        Error::RateLimited {
            path: "/api/projects/1/query".to_string(),
            detail: String::new(),
            retry_after: delay,
        }
    }

    #[test]
    fn test_rate_limit_uses_attached_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay_for(&rate_limited(Duration::from_secs(3)), 1),
            Some(Duration::from_secs(3))
        );
    }

    #[test]
    fn test_never_retries_twice() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(&rate_limited(Duration::from_secs(3)), 2), None);
        assert_eq!(policy.delay_for(&rate_limited(Duration::from_secs(3)), 3), None);
    }

    #[test]
    fn test_timeout_is_not_retried() {
        let policy = RetryPolicy::default();
        let err = Error::Timeout {
            path: "/api/projects/1/query".to_string(),
            after: Duration::from_secs(30),
        };
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(policy.delay_for(&err, 1), None);
    }

    #[test]
    fn test_classified_http_errors_are_not_retried() {
        let policy = RetryPolicy::default();
        for status in [401u16, 403, 404, 500, 503] {
            let err = Error::from_status(
                StatusCode::from_u16(status).unwrap(),
                "/api/projects/1/query",
                "",
                Duration::ZERO,
            );
            assert_eq!(policy.delay_for(&err, 1), None, "status {}", status);
        }
    }

    #[test]
    fn test_none_policy() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.delay_for(&rate_limited(Duration::from_secs(1)), 1), None);
    }
}
