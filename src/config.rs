//! Validated connection parameters.
//!
//! A [`Config`] is built once, either through [`Config::builder`] or from a
//! plugin-config JSON object with [`Config::from_json`], and is immutable
//! afterwards. Every value has been checked by the time a `Config` exists,
//! so the client never re-validates it.

use crate::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Host used when none is configured.
pub const DEFAULT_HOST: &str = "https://eu.posthog.com";

/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Shortest accepted request timeout.
pub const MIN_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Longest accepted request timeout.
pub const MAX_TIMEOUT: Duration = Duration::from_millis(300_000);

const ALLOWED_KEYS: [&str; 4] = ["apiKey", "projectId", "host", "timeoutMs"];

/// Connection parameters for one PostHog project.
///
/// # Examples
///
/// ```
/// use posthog_insights::Config;
/// use std::time::Duration;
///
/// let config = Config::builder("phx_secret", "42")
///     .host("https://us.posthog.com/")
///     .timeout(Duration::from_secs(60))
///     .build()
///     .unwrap();
///
/// assert_eq!(config.host(), "https://us.posthog.com");
/// assert_eq!(config.timeout(), Duration::from_secs(60));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    api_key: String,
    project_id: String,
    host: String,
    timeout: Duration,
}

impl Config {
    /// Creates a builder with the two required values.
    pub fn builder(api_key: impl Into<String>, project_id: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(api_key, project_id)
    }

    /// Builds a config from a plugin-config object.
    ///
    /// The object uses the keys `apiKey`, `projectId`, `host` and `timeoutMs`;
    /// any other key is rejected. Fractional timeouts are floored.
    ///
    /// # Examples
    ///
    /// ```
    /// use posthog_insights::Config;
    /// use serde_json::json;
    ///
    /// let config = Config::from_json(&json!({
    ///     "apiKey": "phx_secret",
    ///     "projectId": " 42 ",
    ///     "timeoutMs": 10000,
    /// }))
    /// .unwrap();
    /// assert_eq!(config.project_id(), "42");
    ///
    /// let err = Config::from_json(&json!({"apiKey": "k", "projectId": "1", "region": "eu"}));
    /// assert!(err.unwrap_err().to_string().contains("region"));
    /// ```
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::ConfigurationError("posthog config required".to_string()))?;

        let unknown: Vec<&str> = obj
            .keys()
            .map(String::as_str)
            .filter(|k| !ALLOWED_KEYS.contains(k))
            .collect();
        if !unknown.is_empty() {
            return Err(Error::ConfigurationError(format!(
                "posthog config has unknown keys: {}",
                unknown.join(", ")
            )));
        }

        let api_key = obj.get("apiKey").and_then(Value::as_str).unwrap_or_default();
        let project_id = obj
            .get("projectId")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let mut builder = ConfigBuilder::new(api_key, project_id);

        if let Some(host) = obj.get("host").and_then(Value::as_str) {
            builder = builder.host(host);
        }

        if let Some(timeout_ms) = obj.get("timeoutMs").and_then(Value::as_f64) {
            let floored = timeout_ms.floor();
            if !(MIN_TIMEOUT.as_millis() as f64..=MAX_TIMEOUT.as_millis() as f64)
                .contains(&floored)
            {
                return Err(timeout_out_of_range());
            }
            builder = builder.timeout(Duration::from_millis(floored as u64));
        }

        builder.build()
    }

    /// The API key sent as a bearer token.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// The project every request is scoped to.
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Base URL of the PostHog instance, without a trailing slash.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Per-attempt request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("project_id", &self.project_id)
            .field("host", &self.host)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Builder for [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    api_key: String,
    project_id: String,
    host: Option<String>,
    timeout: Option<Duration>,
}

impl ConfigBuilder {
    /// Creates a builder with the two required values.
    pub fn new(api_key: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            project_id: project_id.into(),
            host: None,
            timeout: None,
        }
    }

    /// Sets the base URL. Trailing slashes are dropped; blank means default.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validates the values and builds the [`Config`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] if the API key or project id is
    /// blank, the timeout is outside 5s..=300s, or the host is not an
    /// absolute http(s) URL.
    pub fn build(self) -> Result<Config> {
        if self.api_key.trim().is_empty() {
            return Err(Error::ConfigurationError(
                "posthog apiKey is required".to_string(),
            ));
        }

        let project_id = self.project_id.trim();
        if project_id.is_empty() {
            return Err(Error::ConfigurationError(
                "posthog projectId is required".to_string(),
            ));
        }

        let host = match self.host.as_deref().map(str::trim) {
            Some(h) if !h.is_empty() => h.trim_end_matches('/').to_string(),
            _ => DEFAULT_HOST.to_string(),
        };
        let usable = Url::parse(&host)
            .map(|url| matches!(url.scheme(), "http" | "https") && !url.cannot_be_a_base())
            .unwrap_or(false);
        if !usable {
            return Err(Error::ConfigurationError(format!(
                "posthog host must be an http(s) URL, got: {}",
                host
            )));
        }

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if !(MIN_TIMEOUT..=MAX_TIMEOUT).contains(&timeout) {
            return Err(timeout_out_of_range());
        }

        Ok(Config {
            api_key: self.api_key.trim().to_string(),
            project_id: project_id.to_string(),
            host,
            timeout,
        })
    }
}

fn timeout_out_of_range() -> Error {
    Error::ConfigurationError("posthog timeoutMs must be between 5000 and 300000".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = Config::builder("phx_key", "42").build().unwrap();
        assert_eq!(config.host(), DEFAULT_HOST);
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(config.api_key(), "phx_key");
    }

    #[test]
    fn test_host_is_normalized() {
        let config = Config::builder("k", "42")
            .host("  https://posthog.example.com///  ")
            .build()
            .unwrap();
        assert_eq!(config.host(), "https://posthog.example.com");

        let config = Config::builder("k", "42").host("   ").build().unwrap();
        assert_eq!(config.host(), DEFAULT_HOST);
    }

    #[test]
    fn test_rejects_blank_required_values() {
        assert!(matches!(
            Config::builder("  ", "42").build(),
            Err(Error::ConfigurationError(_))
        ));
        assert!(matches!(
            Config::builder("k", "").build(),
            Err(Error::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_timeout_bounds() {
        let ok = |ms| Config::builder("k", "1").timeout(Duration::from_millis(ms)).build();
        assert!(ok(5_000).is_ok());
        assert!(ok(300_000).is_ok());
        assert!(ok(4_999).is_err());
        assert!(ok(300_001).is_err());
    }

    #[test]
    fn test_rejects_non_http_host() {
        for host in ["ftp://files.example.com", "not a url", "mailto:ops@example.com"] {
            let result = Config::builder("k", "1").host(host).build();
            assert!(
                matches!(result, Err(Error::ConfigurationError(_))),
                "host {:?} gave {:?}",
                host,
                result
            );
        }
    }

    #[test]
    fn test_from_json() {
        let config = Config::from_json(&json!({
            "apiKey": "phx_key",
            "projectId": "7",
            "host": "https://us.posthog.com/",
            "timeoutMs": 12345.9,
        }))
        .unwrap();
        assert_eq!(config.project_id(), "7");
        assert_eq!(config.host(), "https://us.posthog.com");
        assert_eq!(config.timeout(), Duration::from_millis(12_345));
    }

    #[test]
    fn test_from_json_rejects_bad_shapes() {
        assert!(Config::from_json(&json!(null)).is_err());
        assert!(Config::from_json(&json!(["apiKey"])).is_err());
        assert!(Config::from_json(&json!({"projectId": "1"})).is_err());
        let short_timeout = json!({"apiKey": "k", "projectId": "1", "timeoutMs": 100});
        assert!(Config::from_json(&short_timeout).is_err());

        let unknown = json!({"apiKey": "k", "projectId": "1", "foo": 1, "bar": 2});
        let err = Config::from_json(&unknown).unwrap_err();
        assert!(err.to_string().contains("unknown keys"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = Config::builder("phx_very_secret", "42").build().unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("phx_very_secret"));
        assert!(debug.contains("<redacted>"));
    }
}
