//! Error types for analytics API calls.
//!
//! Every failed request is classified exactly once, at the boundary between
//! the transport/HTTP result and the caller. The resulting [`Error`] carries
//! the request path and a short excerpt of the response body, and
//! [`Error::kind`] collapses it into the small [`ErrorKind`] taxonomy that
//! retry decisions and user-facing messaging are driven by.

use http::StatusCode;
use std::time::Duration;

/// Maximum number of characters of a response body kept as diagnostic detail.
pub const MAX_DETAIL_CHARS: usize = 500;

/// The classified error returned by every client operation.
///
/// # Examples
///
/// ```no_run
/// use posthog_insights::{Client, Config, Error, ErrorKind};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::new(Config::builder("phx_key", "42").build()?)?;
///
/// match client.hogql_query("SELECT count() FROM events", 10).await {
///     Ok(result) => println!("{} rows", result.results.len()),
///     Err(Error::RateLimited { retry_after, .. }) => {
///         eprintln!("still rate limited, try again in {:?}", retry_after);
///     }
///     Err(e) if e.kind() == ErrorKind::AuthFailed => eprintln!("check the API key"),
///     Err(e) => eprintln!("query failed: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The API key was rejected (HTTP 401).
    #[error("auth failed: invalid API key")]
    AuthFailed,

    /// The API key lacks permission for the resource (HTTP 403).
    #[error("access denied: insufficient permissions for {path}. {detail}")]
    AccessDenied {
        /// Path component of the request URL
        path: String,
        /// Truncated response body
        detail: String,
    },

    /// The project or resource does not exist (HTTP 404).
    #[error("resource not found: {path}. {detail}")]
    NotFound {
        /// Path component of the request URL
        path: String,
        /// Truncated response body
        detail: String,
    },

    /// The provider is throttling requests (HTTP 429).
    ///
    /// `retry_after` is computed from the `Retry-After` response header by
    /// [`crate::rate_limit::parse_retry_after`].
    #[error("rate limited on {path} (retry after {}ms). {detail}", .retry_after.as_millis())]
    RateLimited {
        /// Path component of the request URL
        path: String,
        /// Truncated response body
        detail: String,
        /// How long to wait before trying again
        retry_after: Duration,
    },

    /// The transport failed to connect or to complete the exchange.
    #[error("transport error on {path}: {source}")]
    Transport {
        /// Path component of the request URL
        path: String,
        /// The underlying transport failure
        #[source]
        source: reqwest::Error,
    },

    /// The attempt did not complete before the configured timeout fired.
    #[error("request to {path} timed out after {}ms", .after.as_millis())]
    Timeout {
        /// Path component of the request URL
        path: String,
        /// The timeout that elapsed
        after: Duration,
    },

    /// Any other non-success HTTP status.
    #[error("API error ({}) on {path}: {detail}", .status.as_u16())]
    Api {
        /// The HTTP status code
        status: StatusCode,
        /// Path component of the request URL
        path: String,
        /// Truncated response body, or the status text when the body is empty
        detail: String,
    },

    /// A success response whose body is not the expected JSON shape.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// Caller-supplied query parameters were rejected before any I/O.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Failed to serialize the request body.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// An invalid URL was provided (bad host or pagination cursor).
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// The taxonomy callers act on.
///
/// The first six kinds classify a request that reached the transport;
/// [`ErrorKind::InvalidRequest`] covers everything rejected locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// HTTP 401.
    AuthFailed,
    /// HTTP 403.
    AccessDenied,
    /// HTTP 404.
    NotFound,
    /// HTTP 429.
    RateLimited,
    /// Connection, I/O or timeout failure.
    Transport,
    /// Any other failed or unusable provider response.
    Api,
    /// Bad input, configuration or URL; no request was sent.
    InvalidRequest,
}

impl Error {
    /// Returns the [`ErrorKind`] this error is classified as.
    ///
    /// Timeouts are reported as [`ErrorKind::Transport`], although only
    /// [`Error::Transport`] is eligible for a retry.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::AuthFailed => ErrorKind::AuthFailed,
            Error::AccessDenied { .. } => ErrorKind::AccessDenied,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::RateLimited { .. } => ErrorKind::RateLimited,
            Error::Transport { .. } | Error::Timeout { .. } => ErrorKind::Transport,
            Error::Api { .. } | Error::DeserializationFailed { .. } => ErrorKind::Api,
            Error::InvalidInput(_)
            | Error::ConfigurationError(_)
            | Error::SerializationFailed(_)
            | Error::InvalidUrl(_) => ErrorKind::InvalidRequest,
        }
    }

    /// Returns `true` if the retry policy may retry this error once.
    ///
    /// # Examples
    ///
    /// ```
    /// use posthog_insights::Error;
    /// use std::time::Duration;
    ///
    /// let err = Error::RateLimited {
    ///     path: "/api/projects/42/query".to_string(),
    ///     detail: String::new(),
    ///     retry_after: Duration::from_secs(5),
    /// };
    /// assert!(err.is_retryable());
    ///
    /// let err = Error::Timeout {
    ///     path: "/api/projects/42/query".to_string(),
    ///     after: Duration::from_secs(30),
    /// };
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::RateLimited { .. } | Error::Transport { .. })
    }

    /// Returns the HTTP status code if the provider answered.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::AuthFailed => Some(StatusCode::UNAUTHORIZED),
            Error::AccessDenied { .. } => Some(StatusCode::FORBIDDEN),
            Error::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            Error::RateLimited { .. } => Some(StatusCode::TOO_MANY_REQUESTS),
            Error::Api { status, .. } => Some(*status),
            Error::DeserializationFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the request path the error was raised for, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::AccessDenied { path, .. }
            | Error::NotFound { path, .. }
            | Error::RateLimited { path, .. }
            | Error::Transport { path, .. }
            | Error::Timeout { path, .. }
            | Error::Api { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Returns the provider-requested backoff for rate-limited requests.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }

    /// Builds the classified error for a non-success HTTP response.
    pub(crate) fn from_status(
        status: StatusCode,
        path: &str,
        body: &str,
        retry_after: Duration,
    ) -> Self {
        let detail = truncate_detail(body);
        let path = path.to_string();

        match status.as_u16() {
            401 => Error::AuthFailed,
            403 => Error::AccessDenied { path, detail },
            404 => Error::NotFound { path, detail },
            429 => Error::RateLimited {
                path,
                detail,
                retry_after,
            },
            _ => {
                let detail = if detail.is_empty() {
                    status.canonical_reason().unwrap_or_default().to_string()
                } else {
                    detail
                };
                Error::Api {
                    status,
                    path,
                    detail,
                }
            }
        }
    }
}

/// Keeps at most [`MAX_DETAIL_CHARS`] characters of a response body.
pub(crate) fn truncate_detail(body: &str) -> String {
    body.chars().take(MAX_DETAIL_CHARS).collect()
}

/// A specialized `Result` type for analytics API calls.
pub type Result<T> = std::result::Result<T, Error>;
