//! # posthog-insights - A typed client for PostHog product analytics
//!
//! `posthog-insights` runs analytics queries against one PostHog project:
//! HogQL, trends, funnels, retention, lifecycle and user paths, plus paginated
//! listings of raw events and persons. It is built on `reqwest` and
//! classifies every failure into a small set of error kinds.
//!
//! ## Quick Start
//!
//! ```no_run
//! use posthog_insights::{Client, Config};
//! use posthog_insights::params::{BreakdownType, DateWindow, FunnelsParams};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), posthog_insights::Error> {
//!     let config = Config::builder("phx_personal_api_key", "12345")
//!         .host("https://us.posthog.com")
//!         .timeout(Duration::from_secs(60))
//!         .build()?;
//!     let client = Client::new(config)?;
//!
//!     // Raw HogQL
//!     let rows = client
//!         .hogql_query("SELECT event, count() FROM events GROUP BY event", 100)
//!         .await?;
//!     println!("columns: {:?}", rows.columns);
//!
//!     // A three-step funnel broken down by browser
//!     let funnel = client
//!         .funnels_query(
//!             &FunnelsParams::new(
//!                 ["$pageview", "signup_started", "signup_completed"],
//!                 DateWindow::since("-30d"),
//!             )
//!             .window_days(7)
//!             .breakdown_by("$browser", Some(BreakdownType::Event)),
//!         )
//!         .await?;
//!     println!("empty funnel: {}", funnel.results.is_empty());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Typed query descriptors** - every analysis kind is a [`Query`] variant
//! - **Classified errors** - every failure maps to one [`ErrorKind`]
//! - **Bounded retry** - one retry after a rate limit or a transport failure, nothing else
//! - **Per-attempt timeout** - every attempt gets the full configured window
//! - **Structured logging** - request lifecycle events through `tracing`
//! - **Cursor pagination** - [`Paginated`] hands back the server's next-page URL verbatim
//!
//! ## Error Handling
//!
//! Errors carry enough detail to act on without parsing messages:
//!
//! ```no_run
//! use posthog_insights::{Client, Config, Error, ErrorKind};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = Client::new(Config::builder("phx_key", "42").build()?)?;
//! match client.hogql_query("SELECT 1", 1).await {
//!     Ok(result) => println!("{:?}", result.results),
//!     Err(e) if e.kind() == ErrorKind::RateLimited => {
//!         eprintln!("still rate limited, server asked for {:?}", e.retry_after());
//!     }
//!     Err(Error::DeserializationFailed { raw_response, serde_error, status }) => {
//!         eprintln!("unexpected body (status {}): {}", status, serde_error);
//!         eprintln!("  raw: {}", raw_response);
//!     }
//!     Err(e) => eprintln!("{} ({:?})", e, e.kind()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Retries
//!
//! The default [`RetryPolicy`] retries once on either retryable kind. Either
//! half can be switched off:
//!
//! ```no_run
//! use posthog_insights::{Client, Config, RetryPolicy};
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), posthog_insights::Error> {
//! let client = Client::builder(Config::builder("phx_key", "42").build()?)
//!     .retry_policy(RetryPolicy {
//!         retry_rate_limited: false,
//!         transport_backoff: Duration::from_millis(250),
//!         ..RetryPolicy::default()
//!     })
//!     .build()?;
//! # Ok(())
//! # }
//! ```

mod client;
pub mod config;
mod error;
pub mod metadata;
pub mod params;
pub mod query;
pub mod rate_limit;
mod response;
pub mod retry;

pub use client::{Client, ClientBuilder};
pub use config::{Config, ConfigBuilder};
pub use error::{Error, ErrorKind, Result};
pub use query::Query;
pub use response::{
    EventRecord, FunnelStep, FunnelSteps, FunnelsResult, LifecycleResult, LifecycleSeries,
    Paginated, PathEdge, PathsResult, PersonRecord, QueryResult, RetentionCohort,
    RetentionResult, RetentionValue, Response, TrendsResult, TrendsSeries,
};
pub use retry::RetryPolicy;
