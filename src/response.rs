//! Typed results and the execution envelope around them.
//!
//! Result types mirror what the provider returns for each analysis kind.
//! They ignore fields they do not model and default the ones the provider
//! sometimes leaves out, so a newer server does not break deserialization.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// A successful response plus how it was obtained.
///
/// # Examples
///
/// ```
/// # use posthog_insights::Response;
/// # use http::StatusCode;
/// # use std::time::Duration;
/// let response = Response::new(42, StatusCode::OK, Duration::from_millis(100), 2);
///
/// assert!(response.was_retried());
/// assert_eq!(response.map(|n| n.to_string()).data, "42");
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The deserialized response data.
    pub data: T,

    /// The HTTP status code of the final attempt.
    pub status: StatusCode,

    /// Time from the first attempt to the successful response, retry wait included.
    pub latency: Duration,

    /// Attempts made: `1`, or `2` when the single retry was used.
    pub attempts: usize,
}

impl<T> Response<T> {
    /// Creates a new `Response`.
    pub fn new(data: T, status: StatusCode, latency: Duration, attempts: usize) -> Self {
        Self {
            data,
            status,
            latency,
            attempts,
        }
    }

    /// Maps the response data, keeping the metadata.
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            status: self.status,
            latency: self.latency,
            attempts: self.attempts,
        }
    }

    /// Returns `true` if the request needed its retry.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Discards the metadata.
    pub fn into_data(self) -> T {
        self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

/// One page of a listing.
///
/// `next_cursor`, when present, is an absolute URL. Pass it back unchanged as
/// the `cursor` parameter to fetch the following page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginated<T> {
    /// Records on this page.
    pub results: Vec<T>,
    /// URL of the next page, if any.
    pub next_cursor: Option<String>,
}

impl<T> Paginated<T> {
    /// Returns `true` if another page exists.
    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }
}

/// Listing payload as sent by the provider.
#[derive(Debug, Deserialize)]
pub(crate) struct ListPage<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
    #[serde(default)]
    next: Option<String>,
}

impl<T> From<ListPage<T>> for Paginated<T> {
    fn from(page: ListPage<T>) -> Self {
        Paginated {
            results: page.results,
            next_cursor: page.next.filter(|n| !n.is_empty()),
        }
    }
}

/// A raw event record.
pub type EventRecord = Map<String, Value>;

/// A raw person record.
pub type PersonRecord = Map<String, Value>;

/// Result of a HogQL query: column names and rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names, in row order.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Rows of cell values.
    #[serde(default)]
    pub results: Vec<Vec<Value>>,
}

/// Result of a trends query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendsResult {
    /// One series per event (and per breakdown value).
    #[serde(default)]
    pub results: Vec<TrendsSeries>,
}

/// A single trends series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendsSeries {
    /// Series label.
    #[serde(default)]
    pub label: String,
    /// Total over the window.
    #[serde(default)]
    pub count: f64,
    /// Value per bucket.
    #[serde(default)]
    pub data: Vec<f64>,
    /// Display label per bucket.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Date per bucket.
    #[serde(default)]
    pub days: Vec<String>,
    /// Breakdown value, when broken down.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown_value: Option<Value>,
}

/// Result of a funnel query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelsResult {
    /// Steps, flat or grouped per breakdown value.
    pub results: FunnelSteps,
}

/// Funnel steps as returned by the provider.
///
/// An empty `results` array carries no shape of its own and is read as
/// `Steps(vec![])`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, from = "RawFunnelSteps")]
pub enum FunnelSteps {
    /// Broken down: one ordered list per breakdown value.
    Breakdown(Vec<Vec<FunnelStep>>),
    /// No breakdown: one ordered list of steps.
    Steps(Vec<FunnelStep>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFunnelSteps {
    // Tried first: a struct also deserializes from an array, so the flat
    // variant would swallow nested step lists.
    Breakdown(Vec<Vec<FunnelStep>>),
    Steps(Vec<FunnelStep>),
}

impl From<RawFunnelSteps> for FunnelSteps {
    fn from(raw: RawFunnelSteps) -> Self {
        match raw {
            RawFunnelSteps::Breakdown(groups) if groups.is_empty() => {
                FunnelSteps::Steps(Vec::new())
            }
            RawFunnelSteps::Breakdown(groups) => FunnelSteps::Breakdown(groups),
            RawFunnelSteps::Steps(steps) => FunnelSteps::Steps(steps),
        }
    }
}

impl FunnelSteps {
    /// Returns `true` if there are no steps at all.
    pub fn is_empty(&self) -> bool {
        match self {
            FunnelSteps::Steps(steps) => steps.is_empty(),
            FunnelSteps::Breakdown(groups) => groups.iter().all(Vec::is_empty),
        }
    }
}

/// One funnel step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunnelStep {
    /// Event or action identifier.
    #[serde(default)]
    pub action_id: Value,
    /// Step name.
    #[serde(default)]
    pub name: String,
    /// User-facing name, when one was set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
    /// Zero-based position.
    #[serde(default)]
    pub order: u32,
    /// Users reaching this step.
    #[serde(default)]
    pub count: u64,
    /// Mean seconds from the previous step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_conversion_time: Option<f64>,
    /// Median seconds from the previous step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub median_conversion_time: Option<f64>,
    /// Breakdown value, when broken down.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown_value: Option<Value>,
}

/// Result of a retention query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetentionResult {
    /// One row per cohort.
    #[serde(default)]
    pub results: Vec<RetentionCohort>,
}

/// A retention cohort row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetentionCohort {
    /// Cohort label.
    #[serde(default)]
    pub label: String,
    /// Cohort start date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Users retained per period; the first entry is the cohort size.
    #[serde(default)]
    pub values: Vec<RetentionValue>,
}

impl RetentionCohort {
    /// Number of users that entered the cohort.
    pub fn size(&self) -> u64 {
        self.values.first().map(|v| v.count).unwrap_or(0)
    }
}

/// Users retained in one period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetentionValue {
    /// Retained users.
    #[serde(default)]
    pub count: u64,
}

/// Result of a lifecycle query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifecycleResult {
    /// One series per status (new, returning, resurrecting, dormant).
    #[serde(default)]
    pub results: Vec<LifecycleSeries>,
}

/// One lifecycle status over time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifecycleSeries {
    /// Status name.
    #[serde(default)]
    pub status: String,
    /// Series label.
    #[serde(default)]
    pub label: String,
    /// Total over the window. Dormant counts are negative.
    #[serde(default)]
    pub count: f64,
    /// Value per bucket.
    #[serde(default)]
    pub data: Vec<f64>,
    /// Display label per bucket.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Date per bucket.
    #[serde(default)]
    pub days: Vec<String>,
}

/// Result of a paths query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathsResult {
    /// Edges between consecutive steps.
    #[serde(default)]
    pub results: Vec<PathEdge>,
}

/// A weighted transition between two path steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathEdge {
    /// Origin step.
    pub source: String,
    /// Destination step.
    pub target: String,
    /// Users taking this edge.
    #[serde(default)]
    pub value: u64,
    /// Mean seconds between the two steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_conversion_time: Option<f64>,
    /// Users that stopped at the origin step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_dropoff: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_page_into_paginated() {
        let page: ListPage<EventRecord> = serde_json::from_value(json!({
            "results": [{"event": "$pageview"}],
            "next": "https://eu.posthog.com/api/projects/42/events?cursor=abc"
        }))
        .unwrap();
        let paginated = Paginated::from(page);

        assert_eq!(paginated.results.len(), 1);
        assert_eq!(paginated.results[0]["event"], "$pageview");
        assert!(paginated.has_more());
    }

    #[test]
    fn test_missing_or_null_next_means_last_page() {
        let page: ListPage<PersonRecord> =
            serde_json::from_value(json!({"results": [], "next": null})).unwrap();
        assert_eq!(Paginated::from(page).next_cursor, None);

        let page: ListPage<PersonRecord> = serde_json::from_value(json!({"results": []})).unwrap();
        assert!(!Paginated::from(page).has_more());
    }

    #[test]
    fn test_funnel_steps_flat_and_breakdown() {
        let flat: FunnelsResult = serde_json::from_value(json!({
            "results": [
                {"action_id": "sign_up", "name": "sign_up", "order": 0, "count": 100},
                {"action_id": "purchase", "name": "purchase", "order": 1, "count": 25}
            ]
        }))
        .unwrap();
        match &flat.results {
            FunnelSteps::Steps(steps) => assert_eq!(steps[1].count, 25),
            other => panic!("Expected flat steps, got {:?}", other),
        }

        let grouped: FunnelsResult = serde_json::from_value(json!({
            "results": [
                [{"name": "sign_up", "order": 0, "count": 60, "breakdown_value": ["Chrome"]}],
                [{"name": "sign_up", "order": 0, "count": 40, "breakdown_value": ["Safari"]}]
            ]
        }))
        .unwrap();
        assert!(matches!(grouped.results, FunnelSteps::Breakdown(ref g) if g.len() == 2));
    }

    #[test]
    fn test_empty_funnel() {
        let empty: FunnelsResult = serde_json::from_value(json!({"results": []})).unwrap();
        assert!(empty.results.is_empty());
        assert_eq!(empty.results, FunnelSteps::Steps(Vec::new()));
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let result: TrendsResult = serde_json::from_value(json!({
            "results": [{
                "label": "$pageview",
                "count": 12.0,
                "data": [5, 7],
                "days": ["2024-01-01", "2024-01-02"],
                "action": {"id": "$pageview"}
            }],
            "hasMore": false,
            "timings": []
        }))
        .unwrap();
        assert_eq!(result.results[0].data, vec![5.0, 7.0]);
        assert!(result.results[0].labels.is_empty());
    }

    #[test]
    fn test_retention_cohort_size() {
        let result: RetentionResult = serde_json::from_value(json!({
            "results": [{"label": "Day 0", "date": "2024-01-01", "values": [{"count": 10}, {"count": 4}]}]
        }))
        .unwrap();
        assert_eq!(result.results[0].size(), 10);
        assert_eq!(RetentionCohort::default().size(), 0);
    }
}
