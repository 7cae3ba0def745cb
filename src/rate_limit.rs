//! Retry-After parsing for rate-limited responses.
//!
//! The provider answers throttled requests with HTTP 429 and a `Retry-After`
//! header holding either a number of seconds or an HTTP date. This module
//! turns that header into a bounded backoff for the single rate-limit retry.

use http::HeaderMap;
use std::time::{Duration, SystemTime};

/// Delay used when the header is absent or cannot be understood.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_millis(5_000);

/// Upper bound on any delay derived from the header.
pub const MAX_RETRY_AFTER: Duration = Duration::from_millis(30_000);

/// Converts a raw `Retry-After` value into the delay before the retry.
///
/// - absent or unparseable values give [`DEFAULT_RETRY_AFTER`]
/// - a non-negative number is read as seconds and capped at [`MAX_RETRY_AFTER`]
/// - an HTTP date gives the time remaining until it, floored at zero and capped
///
/// # Examples
///
/// ```
/// use posthog_insights::rate_limit::parse_retry_after;
/// use std::time::Duration;
///
/// assert_eq!(parse_retry_after(None), Duration::from_millis(5_000));
/// assert_eq!(parse_retry_after(Some("10")), Duration::from_millis(10_000));
/// assert_eq!(parse_retry_after(Some("60")), Duration::from_millis(30_000));
/// assert_eq!(parse_retry_after(Some("garbage")), Duration::from_millis(5_000));
/// ```
pub fn parse_retry_after(value: Option<&str>) -> Duration {
    parse_retry_after_at(value, SystemTime::now())
}

/// Same as [`parse_retry_after`], with the current time supplied by the caller.
///
/// The clock is only consulted for the HTTP-date form, so passing a fixed
/// `now` makes the result fully deterministic.
pub fn parse_retry_after_at(value: Option<&str>, now: SystemTime) -> Duration {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return DEFAULT_RETRY_AFTER;
    };

    if let Ok(seconds) = raw.parse::<f64>() {
        if seconds.is_finite() && seconds >= 0.0 {
            // Anything past the cap saturates before conversion.
            let capped = seconds.min(MAX_RETRY_AFTER.as_secs_f64());
            return Duration::from_secs_f64(capped);
        }
        return DEFAULT_RETRY_AFTER;
    }

    match httpdate::parse_http_date(raw) {
        Ok(date) => date
            .duration_since(now)
            .unwrap_or(Duration::ZERO)
            .min(MAX_RETRY_AFTER),
        Err(_) => DEFAULT_RETRY_AFTER,
    }
}

/// Reads the `Retry-After` header from a response and parses it.
pub fn retry_after_from_headers(headers: &HeaderMap) -> Duration {
    let value = headers
        .get(http::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok());
    parse_retry_after(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_absent_header_uses_default() {
        assert_eq!(parse_retry_after(None), Duration::from_millis(5_000));
        assert_eq!(parse_retry_after(Some("")), Duration::from_millis(5_000));
        assert_eq!(parse_retry_after(Some("   ")), Duration::from_millis(5_000));
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after(Some("10")), Duration::from_millis(10_000));
        assert_eq!(parse_retry_after(Some("0")), Duration::ZERO);
        assert_eq!(parse_retry_after(Some("1.5")), Duration::from_millis(1_500));
    }

    #[test]
    fn test_seconds_are_capped_not_raised() {
        assert_eq!(parse_retry_after(Some("60")), Duration::from_millis(30_000));
        assert_eq!(parse_retry_after(Some("30")), Duration::from_millis(30_000));
        assert_eq!(parse_retry_after(Some("29")), Duration::from_millis(29_000));
        assert_eq!(
            parse_retry_after(Some("99999999999999999999")),
            Duration::from_millis(30_000)
        );
    }

    #[test]
    fn test_negative_and_garbage_use_default() {
        assert_eq!(parse_retry_after(Some("-3")), Duration::from_millis(5_000));
        assert_eq!(parse_retry_after(Some("garbage")), Duration::from_millis(5_000));
        assert_eq!(parse_retry_after(Some("NaN")), Duration::from_millis(5_000));
        assert_eq!(parse_retry_after(Some("inf")), Duration::from_millis(5_000));
    }

    #[test]
    fn test_http_date_in_future() {
        let now = httpdate::parse_http_date("Wed, 21 Oct 2026 07:28:00 GMT").unwrap();
        let delay = parse_retry_after_at(Some("Wed, 21 Oct 2026 07:28:12 GMT"), now);
        assert_eq!(delay, Duration::from_secs(12));
    }

    #[test]
    fn test_http_date_far_future_is_capped() {
        let now = httpdate::parse_http_date("Wed, 21 Oct 2026 07:28:00 GMT").unwrap();
        let delay = parse_retry_after_at(Some("Wed, 21 Oct 2026 08:28:00 GMT"), now);
        assert_eq!(delay, MAX_RETRY_AFTER);
    }

    #[test]
    fn test_http_date_in_past_is_zero() {
        let now = httpdate::parse_http_date("Wed, 21 Oct 2026 07:28:00 GMT").unwrap();
        let delay = parse_retry_after_at(Some("Wed, 21 Oct 2026 07:27:00 GMT"), now);
        assert_eq!(delay, Duration::ZERO);
    }

    #[test]
    fn test_retry_after_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after_from_headers(&headers), DEFAULT_RETRY_AFTER);

        headers.insert("retry-after", HeaderValue::from_static("2"));
        assert_eq!(retry_after_from_headers(&headers), Duration::from_secs(2));
    }
}
