//! Caller-facing parameters for each analysis kind.
//!
//! These are plain value types. The mapping to the provider's wire format
//! lives in [`crate::query`]; nothing here knows about JSON layout beyond the
//! spelling of the enum values.

use crate::Error;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Default conversion window for funnels, in days.
pub const DEFAULT_FUNNEL_WINDOW_DAYS: u32 = 14;

/// Default maximum number of steps per path.
pub const DEFAULT_PATH_STEP_LIMIT: u32 = 5;

/// Default page size for event listings.
pub const DEFAULT_EVENTS_LIMIT: u32 = 20;

/// Default page size for person listings.
pub const DEFAULT_PERSONS_LIMIT: u32 = 10;

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
        }

        impl $name {
            /// The spelling used on the wire.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(Error::InvalidInput(format!(
                        "unknown {} {:?}, expected one of: {}",
                        stringify!($name),
                        other,
                        [$($wire),+].join(", ")
                    ))),
                }
            }
        }
    };
}

wire_enum! {
    /// Time bucket for trends and lifecycle series.
    Interval {
        /// Hourly buckets.
        Hour => "hour",
        /// Daily buckets.
        Day => "day",
        /// Weekly buckets.
        Week => "week",
        /// Monthly buckets.
        Month => "month",
    }
}

wire_enum! {
    /// Where a breakdown property is read from.
    BreakdownType {
        /// Event properties (the default).
        Event => "event",
        /// Person properties.
        Person => "person",
        /// Session properties.
        Session => "session",
    }
}

wire_enum! {
    /// Cohort granularity for retention.
    RetentionPeriod {
        /// Daily cohorts (the default).
        Day => "Day",
        /// Weekly cohorts.
        Week => "Week",
        /// Monthly cohorts.
        Month => "Month",
    }
}

wire_enum! {
    /// Which occurrences of the target event enter a retention cohort.
    RetentionType {
        /// Only the first occurrence (the default).
        FirstTime => "retention_first_time",
        /// Any occurrence.
        Recurring => "retention_recurring",
    }
}

wire_enum! {
    /// What a path step is made of.
    PathType {
        /// Web page views (the default).
        Pageview => "$pageview",
        /// Mobile screen views.
        Screen => "$screen",
        /// Custom events.
        CustomEvent => "custom_event",
        /// A HogQL expression.
        HogQL => "hogql",
    }
}

impl Default for BreakdownType {
    fn default() -> Self {
        BreakdownType::Event
    }
}

impl Default for RetentionPeriod {
    fn default() -> Self {
        RetentionPeriod::Day
    }
}

impl Default for RetentionType {
    fn default() -> Self {
        RetentionType::FirstTime
    }
}

impl Default for PathType {
    fn default() -> Self {
        PathType::Pageview
    }
}

/// Date window shared by every insight query.
///
/// Dates are passed through untouched: relative (`-7d`, `-1m`) or absolute
/// (`2024-01-31`). A missing end means "now".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateWindow {
    /// Start of the window.
    pub date_from: String,
    /// Optional end of the window.
    pub date_to: Option<String>,
}

impl DateWindow {
    /// A window from `date_from` until now.
    pub fn since(date_from: impl Into<String>) -> Self {
        Self {
            date_from: date_from.into(),
            date_to: None,
        }
    }

    /// Sets the end of the window.
    pub fn to(mut self, date_to: impl Into<String>) -> Self {
        self.date_to = Some(date_to.into());
        self
    }
}

/// Optional filters layered onto trends, funnels and lifecycle queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsightFilters {
    /// Property to split results by.
    pub breakdown_by: Option<String>,
    /// Source of the breakdown property; defaults to [`BreakdownType::Event`].
    pub breakdown_type: Option<BreakdownType>,
    /// Exclude internal and test accounts.
    pub filter_test_accounts: bool,
}

/// Parameters for a trends query.
///
/// # Examples
///
/// ```
/// use posthog_insights::params::{DateWindow, Interval, TrendsParams};
///
/// let params = TrendsParams::new(["$pageview", "sign_up"], DateWindow::since("-7d"))
///     .interval(Interval::Day)
///     .breakdown_by("$browser");
/// assert_eq!(params.events.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrendsParams {
    /// Events to chart, one series each. At least one.
    pub events: Vec<String>,
    /// Date window.
    pub dates: DateWindow,
    /// Bucket size; the provider's default when absent.
    pub interval: Option<Interval>,
    /// Breakdown and test-account filters.
    pub filters: InsightFilters,
}

impl TrendsParams {
    /// Creates trends parameters for the given events.
    pub fn new<I, S>(events: I, dates: DateWindow) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            events: events.into_iter().map(Into::into).collect(),
            dates,
            ..Default::default()
        }
    }

    /// Sets the bucket size.
    pub fn interval(mut self, interval: Interval) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Splits each series by an event property.
    pub fn breakdown_by(mut self, property: impl Into<String>) -> Self {
        self.filters.breakdown_by = Some(property.into());
        self
    }

    /// Sets where the breakdown property is read from.
    pub fn breakdown_type(mut self, kind: BreakdownType) -> Self {
        self.filters.breakdown_type = Some(kind);
        self
    }

    /// Excludes internal and test accounts.
    pub fn filter_test_accounts(mut self, enabled: bool) -> Self {
        self.filters.filter_test_accounts = enabled;
        self
    }
}

/// Parameters for a lifecycle query. Same shape as [`TrendsParams`].
pub type LifecycleParams = TrendsParams;

/// Parameters for a funnel query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunnelsParams {
    /// Ordered step events. At least two.
    pub steps: Vec<String>,
    /// Date window.
    pub dates: DateWindow,
    /// Conversion window in days; [`DEFAULT_FUNNEL_WINDOW_DAYS`] when absent.
    pub funnel_window_days: Option<u32>,
    /// Breakdown and test-account filters.
    pub filters: InsightFilters,
}

impl FunnelsParams {
    /// Creates funnel parameters for the ordered steps.
    pub fn new<I, S>(steps: I, dates: DateWindow) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            steps: steps.into_iter().map(Into::into).collect(),
            dates,
            ..Default::default()
        }
    }

    /// Sets the conversion window.
    pub fn window_days(mut self, days: u32) -> Self {
        self.funnel_window_days = Some(days);
        self
    }

    /// Splits each step by a property.
    pub fn breakdown_by(
        mut self,
        property: impl Into<String>,
        kind: Option<BreakdownType>,
    ) -> Self {
        self.filters.breakdown_by = Some(property.into());
        self.filters.breakdown_type = kind;
        self
    }

    /// Excludes internal and test accounts.
    pub fn filter_test_accounts(mut self, enabled: bool) -> Self {
        self.filters.filter_test_accounts = enabled;
        self
    }
}

/// Parameters for a retention query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionParams {
    /// Event that places a user in a cohort.
    pub target_entity: String,
    /// Event that counts as a return; the target event when absent.
    pub returning_entity: Option<String>,
    /// Date window.
    pub dates: DateWindow,
    /// Cohort granularity.
    pub period: Option<RetentionPeriod>,
    /// First-time or recurring retention.
    pub retention_type: Option<RetentionType>,
    /// Exclude internal and test accounts.
    pub filter_test_accounts: bool,
}

impl RetentionParams {
    /// Creates retention parameters for a target event.
    pub fn new(target_entity: impl Into<String>, dates: DateWindow) -> Self {
        Self {
            target_entity: target_entity.into(),
            dates,
            ..Default::default()
        }
    }

    /// Counts a different event as the return.
    pub fn returning_entity(mut self, event: impl Into<String>) -> Self {
        self.returning_entity = Some(event.into());
        self
    }

    /// Sets the cohort granularity.
    pub fn period(mut self, period: RetentionPeriod) -> Self {
        self.period = Some(period);
        self
    }

    /// Sets first-time or recurring retention.
    pub fn retention_type(mut self, retention_type: RetentionType) -> Self {
        self.retention_type = Some(retention_type);
        self
    }

    /// Excludes internal and test accounts.
    pub fn filter_test_accounts(mut self, enabled: bool) -> Self {
        self.filter_test_accounts = enabled;
        self
    }
}

/// Parameters for a paths query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathsParams {
    /// Date window.
    pub dates: DateWindow,
    /// What a step is made of.
    pub path_type: Option<PathType>,
    /// Only paths starting here.
    pub start_point: Option<String>,
    /// Only paths ending here.
    pub end_point: Option<String>,
    /// Maximum steps per path; [`DEFAULT_PATH_STEP_LIMIT`] when absent.
    pub step_limit: Option<u32>,
    /// Exclude internal and test accounts.
    pub filter_test_accounts: bool,
}

impl PathsParams {
    /// Creates paths parameters for a date window.
    pub fn new(dates: DateWindow) -> Self {
        Self {
            dates,
            ..Default::default()
        }
    }

    /// Sets what a step is made of.
    pub fn path_type(mut self, path_type: PathType) -> Self {
        self.path_type = Some(path_type);
        self
    }

    /// Anchors paths at a start point.
    pub fn start_point(mut self, point: impl Into<String>) -> Self {
        self.start_point = Some(point.into());
        self
    }

    /// Anchors paths at an end point.
    pub fn end_point(mut self, point: impl Into<String>) -> Self {
        self.end_point = Some(point.into());
        self
    }

    /// Sets the maximum steps per path.
    pub fn step_limit(mut self, limit: u32) -> Self {
        self.step_limit = Some(limit);
        self
    }

    /// Excludes internal and test accounts.
    pub fn filter_test_accounts(mut self, enabled: bool) -> Self {
        self.filter_test_accounts = enabled;
        self
    }
}

/// Filters for listing raw events.
///
/// When `cursor` is set every other field is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListEventsParams {
    /// Only events with this name.
    pub event: Option<String>,
    /// Only events of this person.
    pub person_id: Option<String>,
    /// JSON-encoded property filters.
    pub properties: Option<String>,
    /// Page size; [`DEFAULT_EVENTS_LIMIT`] when absent.
    pub limit: Option<u32>,
    /// `next_cursor` of a previous page.
    pub cursor: Option<String>,
}

/// Filters for listing persons.
///
/// When `cursor` is set every other field is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPersonsParams {
    /// Free-text search over name, email and distinct id.
    pub search: Option<String>,
    /// JSON-encoded property filters.
    pub properties: Option<String>,
    /// Page size; [`DEFAULT_PERSONS_LIMIT`] when absent.
    pub limit: Option<u32>,
    /// `next_cursor` of a previous page.
    pub cursor: Option<String>,
}
