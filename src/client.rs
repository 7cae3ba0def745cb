//! The analytics client and its request executor.
//!
//! [`Client`] exposes one method per analysis kind. All of them funnel into
//! [`Client::call`], which owns the request lifecycle: headers, the
//! per-attempt timeout, error classification and the single retry.

use crate::{
    metadata::{project_url, RequestMetadata},
    params::{ListEventsParams, ListPersonsParams, DEFAULT_EVENTS_LIMIT, DEFAULT_PERSONS_LIMIT},
    params::{FunnelsParams, LifecycleParams, PathsParams, RetentionParams, TrendsParams},
    query::Query,
    rate_limit::retry_after_from_headers,
    response::{
        EventRecord, FunnelsResult, LifecycleResult, ListPage, Paginated, PathsResult,
        PersonRecord, QueryResult, RetentionResult, TrendsResult,
    },
    retry::RetryPolicy,
    Config, Error, Response, Result,
};
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// A client for one PostHog project.
///
/// Cloning is cheap and clones share the connection pool. The client holds
/// no mutable state, so one instance can serve any number of concurrent
/// calls; each call builds its own query and owns its own timeout.
///
/// # Examples
///
/// ```no_run
/// use posthog_insights::{Client, Config};
/// use posthog_insights::params::{DateWindow, Interval, TrendsParams};
///
/// # async fn example() -> Result<(), posthog_insights::Error> {
/// let client = Client::new(Config::builder("phx_key", "42").build()?)?;
///
/// let trends = client
///     .trends_query(
///         &TrendsParams::new(["$pageview"], DateWindow::since("-7d")).interval(Interval::Day),
///     )
///     .await?;
///
/// for series in &trends.results {
///     println!("{}: {}", series.label, series.count);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    config: Config,
    default_headers: HeaderMap,
    retry_policy: RetryPolicy,
}

impl Client {
    /// Creates a client with the default retry policy.
    pub fn new(config: Config) -> Result<Self> {
        ClientBuilder::new(config).build()
    }

    /// Creates a builder for a client using `config`.
    pub fn builder(config: Config) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Runs a HogQL statement.
    pub async fn hogql_query(&self, query: impl Into<String>, limit: u32) -> Result<QueryResult> {
        let query = Query::hogql(query, limit)?;
        Ok(self.run_query::<QueryResult>(&query).await?.into_data())
    }

    /// Runs a trends query.
    pub async fn trends_query(&self, params: &TrendsParams) -> Result<TrendsResult> {
        let query = Query::trends(params)?;
        Ok(self.run_query::<TrendsResult>(&query).await?.into_data())
    }

    /// Runs a funnel query.
    pub async fn funnels_query(&self, params: &FunnelsParams) -> Result<FunnelsResult> {
        let query = Query::funnels(params)?;
        Ok(self.run_query::<FunnelsResult>(&query).await?.into_data())
    }

    /// Runs a retention query.
    pub async fn retention_query(&self, params: &RetentionParams) -> Result<RetentionResult> {
        let query = Query::retention(params)?;
        Ok(self.run_query::<RetentionResult>(&query).await?.into_data())
    }

    /// Runs a lifecycle query.
    pub async fn lifecycle_query(&self, params: &LifecycleParams) -> Result<LifecycleResult> {
        let query = Query::lifecycle(params)?;
        Ok(self.run_query::<LifecycleResult>(&query).await?.into_data())
    }

    /// Runs a paths query.
    pub async fn paths_query(&self, params: &PathsParams) -> Result<PathsResult> {
        let query = Query::paths(params)?;
        Ok(self.run_query::<PathsResult>(&query).await?.into_data())
    }

    /// Lists raw events, newest first.
    ///
    /// When `params.cursor` is non-blank the cursor URL is requested as-is
    /// and the other filters are ignored.
    pub async fn list_events(&self, params: &ListEventsParams) -> Result<Paginated<EventRecord>> {
        let metadata = match non_blank(&params.cursor) {
            Some(cursor) => cursor_request(cursor)?,
            None => {
                let limit = params.limit.unwrap_or(DEFAULT_EVENTS_LIMIT).to_string();
                RequestMetadata::new(Method::GET, project_url(self.config(), "events")?)
                    .with_optional_param("event", non_blank(&params.event))
                    .with_optional_param("person_id", non_blank(&params.person_id))
                    .with_optional_param("properties", non_blank(&params.properties))
                    .with_query_param("limit", &limit)
            }
        };

        let page = self.call::<ListPage<EventRecord>>(metadata).await?;
        Ok(page.into_data().into())
    }

    /// Lists persons.
    ///
    /// When `params.cursor` is non-blank the cursor URL is requested as-is
    /// and the other filters are ignored.
    pub async fn list_persons(
        &self,
        params: &ListPersonsParams,
    ) -> Result<Paginated<PersonRecord>> {
        let metadata = match non_blank(&params.cursor) {
            Some(cursor) => cursor_request(cursor)?,
            None => {
                let limit = params.limit.unwrap_or(DEFAULT_PERSONS_LIMIT).to_string();
                RequestMetadata::new(Method::GET, project_url(self.config(), "persons")?)
                    .with_optional_param("search", non_blank(&params.search))
                    .with_optional_param("properties", non_blank(&params.properties))
                    .with_query_param("limit", &limit)
            }
        };

        let page = self.call::<ListPage<PersonRecord>>(metadata).await?;
        Ok(page.into_data().into())
    }

    /// Posts any [`Query`] to the project's query endpoint.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use posthog_insights::{Client, Config, Query, QueryResult};
    ///
    /// # async fn example() -> Result<(), posthog_insights::Error> {
    /// let client = Client::new(Config::builder("phx_key", "42").build()?)?;
    ///
    /// let query = Query::hogql("SELECT event, count() FROM events GROUP BY event", 50)?;
    /// let response = client.run_query::<QueryResult>(&query).await?;
    /// println!("{} rows in {:?}", response.results.len(), response.latency);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run_query<T>(&self, query: &Query) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        let metadata = RequestMetadata::new(Method::POST, project_url(self.config(), "query")?)
            .with_body(query.to_request_body()?);

        tracing::debug!(kind = query.kind_name(), "Running analytics query");
        self.call(metadata).await
    }

    /// Executes one logical request.
    ///
    /// The request is attempted at most twice. A rate-limited attempt is
    /// retried after the delay the error carries; a failed transport call is
    /// retried after the policy's fixed backoff. Every other error, and any
    /// error from the retry itself, is returned unchanged.
    pub async fn call<T>(&self, metadata: RequestMetadata) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        let start_time = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.attempt_with_timeout(&metadata, attempt).await {
                Ok((status, data)) => {
                    return Ok(Response::new(data, status, start_time.elapsed(), attempt));
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        attempt = attempt,
                        method = %metadata.method,
                        path = %metadata.path(),
                        "Request failed"
                    );

                    let Some(delay) = self.inner.retry_policy.delay_for(&e, attempt) else {
                        return Err(e);
                    };

                    tracing::info!(
                        delay_ms = delay.as_millis() as u64,
                        attempt = attempt,
                        kind = ?e.kind(),
                        "Retrying request after delay"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Runs one attempt under the configured timeout.
    ///
    /// Each attempt gets a fresh window. The timer is dropped with the
    /// `timeout` future on every exit path.
    async fn attempt_with_timeout<T>(
        &self,
        metadata: &RequestMetadata,
        attempt: usize,
    ) -> Result<(StatusCode, T)>
    where
        T: DeserializeOwned,
    {
        let timeout = self.inner.config.timeout();

        match tokio::time::timeout(timeout, self.execute_request(metadata, attempt)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(Error::Timeout {
                path: metadata.path().to_string(),
                after: timeout,
            }),
        }
    }

    /// Sends the request and turns the response into data or a classified error.
    async fn execute_request<T>(
        &self,
        metadata: &RequestMetadata,
        attempt: usize,
    ) -> Result<(StatusCode, T)>
    where
        T: DeserializeOwned,
    {
        let path = metadata.path();

        tracing::debug!(
            method = %metadata.method,
            path = %path,
            attempt = attempt,
            "Executing HTTP request"
        );

        let mut request = self
            .inner
            .http_client
            .request(metadata.method.clone(), metadata.url.clone())
            .headers(self.inner.default_headers.clone());

        if let Some(body) = &metadata.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|source| Error::Transport {
            path: path.to_string(),
            source,
        })?;

        let status = response.status();
        tracing::info!(status = status.as_u16(), attempt = attempt, "Received HTTP response");

        if !status.is_success() {
            let retry_after = retry_after_from_headers(response.headers());
            // Best-effort: an unreadable body still yields the classified error.
            let raw_response = response.text().await.unwrap_or_default();
            let error = Error::from_status(status, path, &raw_response, retry_after);

            if status.is_client_error() {
                tracing::error!(status = status.as_u16(), path = %path, "Client error (4xx)");
            } else {
                tracing::warn!(status = status.as_u16(), path = %path, "Server error");
            }

            return Err(error);
        }

        let raw_body = response.text().await.map_err(|source| Error::Transport {
            path: path.to_string(),
            source,
        })?;

        match serde_json::from_str::<T>(&raw_body) {
            Ok(data) => Ok((status, data)),
            Err(e) => {
                tracing::error!(error = %e, path = %path, "Failed to deserialize response");

                Err(Error::DeserializationFailed {
                    raw_response: raw_body,
                    serde_error: e.to_string(),
                    status,
                })
            }
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("retry_policy", &self.inner.retry_policy)
            .finish()
    }
}

/// A cursor is an absolute URL and is requested verbatim.
fn cursor_request(cursor: &str) -> Result<RequestMetadata> {
    Ok(RequestMetadata::new(Method::GET, Url::parse(cursor)?))
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use posthog_insights::{Client, Config, RetryPolicy};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), posthog_insights::Error> {
/// let config = Config::builder("phx_key", "42")
///     .timeout(Duration::from_secs(60))
///     .build()?;
///
/// let client = Client::builder(config)
///     .retry_policy(RetryPolicy::none())
///     .default_header("User-Agent", "insights-bot/1.0")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    config: Config,
    default_headers: HeaderMap,
    retry_policy: RetryPolicy,
}

impl ClientBuilder {
    /// Creates a builder with the default retry policy.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            default_headers: HeaderMap::new(),
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Adds a header sent with every request.
    ///
    /// `Authorization` and `Content-Type` are always set by the client and
    /// cannot be overridden here.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the retry policy.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key cannot be used as a header value or
    /// the HTTP client cannot be created.
    pub fn build(self) -> Result<Client> {
        let mut default_headers = self.default_headers;

        let mut auth = HeaderValue::try_from(format!("Bearer {}", self.config.api_key()))
            .map_err(|_| {
                Error::ConfigurationError("posthog apiKey is not a valid header value".to_string())
            })?;
        auth.set_sensitive(true);
        default_headers.insert(header::AUTHORIZATION, auth);
        default_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let http_client = reqwest::Client::builder().build().map_err(|e| {
            Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Client {
            inner: Arc::new(ClientInner {
                http_client,
                config: self.config,
                default_headers,
                retry_policy: self.retry_policy,
            }),
        })
    }
}
