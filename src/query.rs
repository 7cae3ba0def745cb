//! Typed query descriptors for the provider's query endpoint.
//!
//! Each analysis kind is one [`Query`] variant. Serializing a `Query` yields
//! the provider's nested query object with its `kind` tag; optional fields
//! that were not supplied are left out of the JSON entirely.
//!
//! ```
//! use posthog_insights::params::{DateWindow, FunnelsParams};
//! use posthog_insights::Query;
//!
//! let query = Query::funnels(
//!     &FunnelsParams::new(["sign_up", "purchase"], DateWindow::since("-30d")).window_days(7),
//! )
//! .unwrap();
//!
//! let body = query.to_request_body().unwrap();
//! assert_eq!(body["query"]["kind"], "FunnelsQuery");
//! assert_eq!(body["query"]["funnelsFilter"]["funnelWindowInterval"], 7);
//! ```

use crate::params::{
    BreakdownType, DateWindow, FunnelsParams, InsightFilters, Interval, LifecycleParams,
    PathType, PathsParams, RetentionParams, RetentionPeriod, RetentionType, TrendsParams,
    DEFAULT_FUNNEL_WINDOW_DAYS, DEFAULT_PATH_STEP_LIMIT,
};
use crate::{Error, Result};
use serde::Serialize;
use serde_json::Value;

/// One query-kind analysis, ready to be posted to the query endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Query {
    /// Ad-hoc HogQL.
    #[serde(rename = "HogQLQuery")]
    HogQL(HogQLQuery),
    /// Event volumes over time.
    #[serde(rename = "TrendsQuery")]
    Trends(SeriesQuery),
    /// Ordered conversion steps.
    #[serde(rename = "FunnelsQuery")]
    Funnels(FunnelsQuery),
    /// Cohort retention.
    #[serde(rename = "RetentionQuery")]
    Retention(RetentionQuery),
    /// New / returning / resurrecting / dormant users.
    #[serde(rename = "LifecycleQuery")]
    Lifecycle(SeriesQuery),
    /// Navigation paths.
    #[serde(rename = "PathsQuery")]
    Paths(PathsQuery),
}

/// Body of a HogQL query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HogQLQuery {
    /// The HogQL statement.
    pub query: String,
    /// Maximum rows returned.
    pub limit: u32,
}

/// A series entry selecting one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename = "EventsNode")]
pub struct EventsNode {
    /// Event name.
    pub event: String,
}

/// The `dateRange` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateRange {
    /// Start of the range.
    pub date_from: String,
    /// End of the range; omitted means now.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
}

/// Breakdown and test-account filters shared by insight queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterFields {
    /// Present only when a breakdown property was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown_filter: Option<BreakdownFilter>,
    /// Present only when set to `true`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_test_accounts: Option<bool>,
}

/// The `breakdownFilter` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakdownFilter {
    /// One entry per breakdown dimension.
    pub breakdowns: Vec<Breakdown>,
}

/// A single breakdown dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breakdown {
    /// Property name.
    pub property: String,
    /// Property source.
    #[serde(rename = "type")]
    pub kind: BreakdownType,
}

/// Trends and lifecycle share this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesQuery {
    /// One node per event.
    pub series: Vec<EventsNode>,
    /// Date window.
    pub date_range: DateRange,
    /// Bucket size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<Interval>,
    /// Breakdown / test-account filters.
    #[serde(flatten)]
    pub filters: FilterFields,
}

/// Body of a funnel query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelsQuery {
    /// One node per step, in order.
    pub series: Vec<EventsNode>,
    /// Date window.
    pub date_range: DateRange,
    /// Conversion window.
    pub funnels_filter: FunnelsFilter,
    /// Breakdown / test-account filters.
    #[serde(flatten)]
    pub filters: FilterFields,
}

/// The `funnelsFilter` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelsFilter {
    /// Always `"day"`.
    pub funnel_window_interval_unit: &'static str,
    /// Window length in days.
    pub funnel_window_interval: u32,
}

/// Body of a retention query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionQuery {
    /// Date window.
    pub date_range: DateRange,
    /// Cohort definition.
    pub retention_filter: RetentionFilter,
    /// Test-account filter.
    #[serde(flatten)]
    pub filters: FilterFields,
}

/// The `retentionFilter` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionFilter {
    /// Event that places a user in a cohort.
    pub target_entity: EventEntity,
    /// Event that counts as a return.
    pub returning_entity: EventEntity,
    /// Cohort granularity.
    pub period: RetentionPeriod,
    /// First-time or recurring.
    pub retention_type: RetentionType,
}

/// An entity reference of type `events`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "events")]
pub struct EventEntity {
    /// Event name.
    pub id: String,
}

/// Body of a paths query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathsQuery {
    /// Date window.
    pub date_range: DateRange,
    /// Path shape.
    pub paths_filter: PathsFilter,
    /// Test-account filter.
    #[serde(flatten)]
    pub filters: FilterFields,
}

/// The `pathsFilter` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathsFilter {
    /// What a step is made of.
    pub path_type: PathType,
    /// Only paths starting here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_point: Option<String>,
    /// Only paths ending here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_point: Option<String>,
    /// Maximum steps per path.
    pub step_limit: u32,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a Query,
}

impl Query {
    /// Builds a HogQL query.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the statement is blank or the limit is zero.
    pub fn hogql(query: impl Into<String>, limit: u32) -> Result<Self> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(invalid("query is required"));
        }
        if limit == 0 {
            return Err(invalid("limit must be at least 1"));
        }
        Ok(Query::HogQL(HogQLQuery { query, limit }))
    }

    /// Builds a trends query.
    pub fn trends(params: &TrendsParams) -> Result<Self> {
        Ok(Query::Trends(series_query(params)?))
    }

    /// Builds a lifecycle query.
    pub fn lifecycle(params: &LifecycleParams) -> Result<Self> {
        Ok(Query::Lifecycle(series_query(params)?))
    }

    /// Builds a funnel query. Needs at least two steps.
    pub fn funnels(params: &FunnelsParams) -> Result<Self> {
        if params.steps.len() < 2 {
            return Err(invalid("steps array requires at least 2 event names"));
        }
        let window = params.funnel_window_days.unwrap_or(DEFAULT_FUNNEL_WINDOW_DAYS);
        if window == 0 {
            return Err(invalid("funnel_window_days must be at least 1"));
        }

        Ok(Query::Funnels(FunnelsQuery {
            series: events_nodes(&params.steps)?,
            date_range: date_range(&params.dates)?,
            funnels_filter: FunnelsFilter {
                funnel_window_interval_unit: "day",
                funnel_window_interval: window,
            },
            filters: FilterFields::from(&params.filters),
        }))
    }

    /// Builds a retention query.
    ///
    /// The returning event defaults to the target event.
    pub fn retention(params: &RetentionParams) -> Result<Self> {
        let target = params.target_entity.trim();
        if target.is_empty() {
            return Err(invalid("target_entity is required"));
        }
        let returning = present(&params.returning_entity).unwrap_or_else(|| target.to_string());

        Ok(Query::Retention(RetentionQuery {
            date_range: date_range(&params.dates)?,
            retention_filter: RetentionFilter {
                target_entity: EventEntity {
                    id: target.to_string(),
                },
                returning_entity: EventEntity { id: returning },
                period: params.period.unwrap_or_default(),
                retention_type: params.retention_type.unwrap_or_default(),
            },
            filters: FilterFields::test_accounts_only(params.filter_test_accounts),
        }))
    }

    /// Builds a paths query.
    pub fn paths(params: &PathsParams) -> Result<Self> {
        let step_limit = params.step_limit.unwrap_or(DEFAULT_PATH_STEP_LIMIT);
        if step_limit == 0 {
            return Err(invalid("step_limit must be at least 1"));
        }

        Ok(Query::Paths(PathsQuery {
            date_range: date_range(&params.dates)?,
            paths_filter: PathsFilter {
                path_type: params.path_type.unwrap_or_default(),
                start_point: present(&params.start_point),
                end_point: present(&params.end_point),
                step_limit,
            },
            filters: FilterFields::test_accounts_only(params.filter_test_accounts),
        }))
    }

    /// The wire name of this query kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Query::HogQL(_) => "HogQLQuery",
            Query::Trends(_) => "TrendsQuery",
            Query::Funnels(_) => "FunnelsQuery",
            Query::Retention(_) => "RetentionQuery",
            Query::Lifecycle(_) => "LifecycleQuery",
            Query::Paths(_) => "PathsQuery",
        }
    }

    /// Serializes the request body `{"query": {...}}`.
    pub fn to_request_body(&self) -> Result<Value> {
        serde_json::to_value(QueryRequest { query: self })
            .map_err(|e| Error::SerializationFailed(e.to_string()))
    }
}

impl From<&InsightFilters> for FilterFields {
    fn from(filters: &InsightFilters) -> Self {
        let breakdown_filter = present(&filters.breakdown_by).map(|property| BreakdownFilter {
            breakdowns: vec![Breakdown {
                property,
                kind: filters.breakdown_type.unwrap_or_default(),
            }],
        });

        Self {
            breakdown_filter,
            ..FilterFields::test_accounts_only(filters.filter_test_accounts)
        }
    }
}

impl FilterFields {
    fn test_accounts_only(enabled: bool) -> Self {
        Self {
            breakdown_filter: None,
            filter_test_accounts: enabled.then_some(true),
        }
    }
}

fn series_query(params: &TrendsParams) -> Result<SeriesQuery> {
    if params.events.is_empty() {
        return Err(invalid("events array is required and must be non-empty"));
    }

    Ok(SeriesQuery {
        series: events_nodes(&params.events)?,
        date_range: date_range(&params.dates)?,
        interval: params.interval,
        filters: FilterFields::from(&params.filters),
    })
}

fn events_nodes(events: &[String]) -> Result<Vec<EventsNode>> {
    events
        .iter()
        .map(|event| {
            if event.trim().is_empty() {
                Err(invalid("event names must not be blank"))
            } else {
                Ok(EventsNode {
                    event: event.clone(),
                })
            }
        })
        .collect()
}

fn date_range(dates: &DateWindow) -> Result<DateRange> {
    let date_from = dates.date_from.trim();
    if date_from.is_empty() {
        return Err(invalid("date_from is required"));
    }
    Ok(DateRange {
        date_from: date_from.to_string(),
        date_to: present(&dates.date_to),
    })
}

/// Blank strings count as absent so they never reach the wire.
fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn invalid(message: &str) -> Error {
    Error::InvalidInput(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(query: &Query) -> Value {
        query.to_request_body().unwrap()
    }

    #[test]
    fn test_hogql_body() {
        let query = Query::hogql("SELECT event FROM events LIMIT 1", 100).unwrap();
        assert_eq!(
            body(&query),
            json!({
                "query": {
                    "kind": "HogQLQuery",
                    "query": "SELECT event FROM events LIMIT 1",
                    "limit": 100
                }
            })
        );
    }

    #[test]
    fn test_hogql_rejects_blank_query() {
        assert!(matches!(Query::hogql("  ", 10), Err(Error::InvalidInput(_))));
        assert!(matches!(Query::hogql("SELECT 1", 0), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_trends_minimal_body_omits_optionals() {
        let params = TrendsParams::new(["$pageview"], DateWindow::since("-7d"));
        let query = Query::trends(&params).unwrap();
        assert_eq!(
            body(&query),
            json!({
                "query": {
                    "kind": "TrendsQuery",
                    "series": [{"kind": "EventsNode", "event": "$pageview"}],
                    "dateRange": {"date_from": "-7d"}
                }
            })
        );
    }

    #[test]
    fn test_trends_with_all_filters() {
        let dates = DateWindow::since("-30d").to("-1d");
        let params = TrendsParams::new(["$pageview", "sign_up"], dates)
            .interval(Interval::Week)
            .breakdown_by("$browser")
            .filter_test_accounts(true);
        let b = body(&Query::trends(&params).unwrap());

        assert_eq!(b["query"]["interval"], "week");
        assert_eq!(b["query"]["dateRange"]["date_to"], "-1d");
        assert_eq!(b["query"]["series"][1]["event"], "sign_up");
        assert_eq!(
            b["query"]["breakdownFilter"],
            json!({"breakdowns": [{"property": "$browser", "type": "event"}]})
        );
        assert_eq!(b["query"]["filterTestAccounts"], true);
    }

    #[test]
    fn test_breakdown_type_is_kept_when_given() {
        let params = TrendsParams::new(["$pageview"], DateWindow::since("-7d"))
            .breakdown_by("plan")
            .breakdown_type(BreakdownType::Person);
        let b = body(&Query::trends(&params).unwrap());
        assert_eq!(b["query"]["breakdownFilter"]["breakdowns"][0]["type"], "person");
    }

    #[test]
    fn test_blank_optionals_are_omitted() {
        let mut params = TrendsParams::new(["$pageview"], DateWindow::since("-7d").to(""));
        params.filters.breakdown_by = Some("   ".to_string());
        let b = body(&Query::trends(&params).unwrap());
        let query = b["query"].as_object().unwrap();

        assert!(!query.contains_key("breakdownFilter"));
        assert!(!query.contains_key("filterTestAccounts"));
        assert!(!b["query"]["dateRange"].as_object().unwrap().contains_key("date_to"));
    }

    #[test]
    fn test_trends_requires_events_and_start_date() {
        let no_events = TrendsParams::new(Vec::<String>::new(), DateWindow::since("-7d"));
        assert!(matches!(Query::trends(&no_events), Err(Error::InvalidInput(_))));

        let no_date = TrendsParams::new(["$pageview"], DateWindow::since(" "));
        assert!(matches!(Query::trends(&no_date), Err(Error::InvalidInput(_))));

        let blank_event = TrendsParams::new(["$pageview", ""], DateWindow::since("-7d"));
        assert!(matches!(Query::trends(&blank_event), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_funnels_body() {
        let params =
            FunnelsParams::new(["sign_up", "purchase"], DateWindow::since("-30d")).window_days(7);
        let b = body(&Query::funnels(&params).unwrap());

        assert_eq!(b["query"]["kind"], "FunnelsQuery");
        assert_eq!(
            b["query"]["series"],
            json!([
                {"kind": "EventsNode", "event": "sign_up"},
                {"kind": "EventsNode", "event": "purchase"}
            ])
        );
        assert_eq!(
            b["query"]["funnelsFilter"],
            json!({"funnelWindowIntervalUnit": "day", "funnelWindowInterval": 7})
        );
    }

    #[test]
    fn test_funnels_defaults_and_validation() {
        let params = FunnelsParams::new(["a", "b", "c"], DateWindow::since("-30d"));
        let b = body(&Query::funnels(&params).unwrap());
        assert_eq!(b["query"]["funnelsFilter"]["funnelWindowInterval"], 14);

        let one_step = FunnelsParams::new(["a"], DateWindow::since("-30d"));
        assert!(matches!(Query::funnels(&one_step), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_retention_body_with_defaults() {
        let params = RetentionParams::new("sign_up", DateWindow::since("-30d"));
        let b = body(&Query::retention(&params).unwrap());

        assert_eq!(
            b["query"],
            json!({
                "kind": "RetentionQuery",
                "dateRange": {"date_from": "-30d"},
                "retentionFilter": {
                    "targetEntity": {"id": "sign_up", "type": "events"},
                    "returningEntity": {"id": "sign_up", "type": "events"},
                    "period": "Day",
                    "retentionType": "retention_first_time"
                }
            })
        );
    }

    #[test]
    fn test_retention_body_with_overrides() {
        let params = RetentionParams::new("sign_up", DateWindow::since("-30d"))
            .returning_entity("purchase")
            .period(RetentionPeriod::Week)
            .retention_type(RetentionType::Recurring)
            .filter_test_accounts(true);
        let b = body(&Query::retention(&params).unwrap());
        let filter = &b["query"]["retentionFilter"];

        assert_eq!(filter["targetEntity"], json!({"id": "sign_up", "type": "events"}));
        assert_eq!(filter["returningEntity"]["id"], "purchase");
        assert_eq!(filter["period"], "Week");
        assert_eq!(filter["retentionType"], "retention_recurring");
        assert_eq!(b["query"]["filterTestAccounts"], true);
    }

    #[test]
    fn test_lifecycle_uses_series_shape() {
        let params =
            TrendsParams::new(["$pageview"], DateWindow::since("-30d")).interval(Interval::Day);
        let b = body(&Query::lifecycle(&params).unwrap());
        assert_eq!(b["query"]["kind"], "LifecycleQuery");
        assert_eq!(b["query"]["series"][0]["kind"], "EventsNode");
        assert_eq!(b["query"]["interval"], "day");
    }

    #[test]
    fn test_paths_body() {
        let params = PathsParams::new(DateWindow::since("-30d"))
            .path_type(PathType::Screen)
            .step_limit(3)
            .start_point("Home");
        let b = body(&Query::paths(&params).unwrap());

        assert_eq!(
            b["query"]["pathsFilter"],
            json!({"pathType": "$screen", "startPoint": "Home", "stepLimit": 3})
        );
    }

    #[test]
    fn test_paths_defaults() {
        let b = body(&Query::paths(&PathsParams::new(DateWindow::since("-7d"))).unwrap());
        assert_eq!(
            b["query"]["pathsFilter"],
            json!({"pathType": "$pageview", "stepLimit": 5})
        );
    }

    #[test]
    fn test_building_is_idempotent() {
        let params = FunnelsParams::new(["sign_up", "purchase"], DateWindow::since("-30d"))
            .breakdown_by("$os", None);
        let first = body(&Query::funnels(&params).unwrap());
        let second = body(&Query::funnels(&params).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn test_kind_name_matches_tag() {
        let query = Query::paths(&PathsParams::new(DateWindow::since("-7d"))).unwrap();
        assert_eq!(body(&query)["query"]["kind"], query.kind_name());
    }
}
