//! Description of a single outbound request.

use crate::{Config, Result};
use http::Method;
use serde_json::Value;
use url::Url;

/// Metadata for one outbound HTTP request.
///
/// Every request carries exactly one concern: a query-kind analysis posted
/// to the query endpoint, or a single paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestMetadata {
    /// The HTTP method.
    pub method: Method,

    /// The absolute URL to call.
    pub url: Url,

    /// JSON body, sent only when present.
    pub body: Option<Value>,
}

impl RequestMetadata {
    /// Creates request metadata for an absolute URL.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            body: None,
        }
    }

    /// Attaches a JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Appends a query-string parameter.
    pub fn with_query_param(mut self, key: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(key, value);
        self
    }

    /// Appends the parameter only when a value is present.
    pub fn with_optional_param(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.with_query_param(key, v),
            None => self,
        }
    }

    /// The path component of the URL, used in error messages and logs.
    pub fn path(&self) -> &str {
        self.url.path()
    }
}

/// Builds `{host}/api/projects/{project_id}/{endpoint}`.
///
/// The project id is percent-encoded as a single path segment.
pub(crate) fn project_url(config: &Config, endpoint: &str) -> Result<Url> {
    let mut url = Url::parse(config.host())?;
    url.path_segments_mut()
        .map_err(|_| {
            crate::Error::ConfigurationError(format!(
                "posthog host cannot be used as a base URL: {}",
                config.host()
            ))
        })?
        .pop_if_empty()
        .extend(["api", "projects", config.project_id(), endpoint]);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(host: &str, project: &str) -> Config {
        Config::builder("k", project).host(host).build().unwrap()
    }

    #[test]
    fn test_project_url() {
        let url = project_url(&config("https://eu.posthog.com", "42"), "query").unwrap();
        assert_eq!(url.as_str(), "https://eu.posthog.com/api/projects/42/query");
    }

    #[test]
    fn test_project_url_keeps_host_prefix() {
        let url = project_url(&config("https://example.com/posthog", "42"), "events").unwrap();
        assert_eq!(url.as_str(), "https://example.com/posthog/api/projects/42/events");
    }

    #[test]
    fn test_project_id_is_encoded() {
        let url = project_url(&config("https://eu.posthog.com", "a/b c"), "query").unwrap();
        assert_eq!(url.path(), "/api/projects/a%2Fb%20c/query");
    }

    #[test]
    fn test_optional_params_are_skipped() {
        let url = project_url(&config("https://eu.posthog.com", "1"), "events").unwrap();
        let metadata = RequestMetadata::new(Method::GET, url)
            .with_optional_param("event", Some("$pageview"))
            .with_optional_param("person_id", None)
            .with_query_param("limit", "20");
        assert_eq!(metadata.url.query(), Some("event=%24pageview&limit=20"));
        assert_eq!(metadata.path(), "/api/projects/1/events");
    }
}
