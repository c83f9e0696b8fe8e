use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::transition::{TransitionQualifier, TransitionType};

/// Open bag of source columns that have no dedicated [`VisitRecord`] field.
///
/// Keys are `<table prefix>_<column>`, e.g. `url_favicon_id` or
/// `visit_segment_id`.
pub type ExtraMetadata = BTreeMap<String, serde_json::Value>;

// ── VisitRecord ───────────────────────────────────────────────────────────────

/// One normalized navigation event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub url: String,
    #[serde(default)]
    pub title: String,
    /// UTC instant of the visit.
    pub timestamp: DateTime<Utc>,
    /// Lowercase network location; empty when the URL could not be parsed.
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub visit_count: Option<i64>,
    #[serde(default)]
    pub typed_count: Option<i64>,
    #[serde(default)]
    pub hidden: Option<bool>,
    #[serde(default)]
    pub last_visit_time: Option<DateTime<Utc>>,
    /// Id of the visit that led here. Reference only.
    #[serde(default)]
    pub from_visit: Option<i64>,
    pub transition_type: TransitionType,
    #[serde(default)]
    pub transition_qualifiers: Vec<TransitionQualifier>,
    #[serde(default)]
    pub transition_raw: i64,
    #[serde(default)]
    pub visit_id: i64,
    #[serde(default)]
    pub url_id: i64,
    #[serde(default)]
    pub visit_time_raw: i64,
    #[serde(default)]
    pub last_visit_time_raw: i64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_metadata: ExtraMetadata,
    /// Name of the source this record came from; set when merging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl VisitRecord {
    /// Copy of this record tagged with `source`.
    pub fn tagged(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }
}

// ── Daily data ────────────────────────────────────────────────────────────────

/// Visit totals for one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub visits: u64,
    pub unique_urls: u64,
}

/// All visits of one calendar date; the shape of a per-date history file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub total_visits: u64,
    pub unique_urls: u64,
    #[serde(default)]
    pub visits: Vec<VisitRecord>,
}

impl DailyBucket {
    /// Build a bucket, deriving its totals from `visits`.
    pub fn from_visits(date: NaiveDate, visits: Vec<VisitRecord>) -> Self {
        let unique_urls = count_unique_urls(&visits);
        Self {
            date,
            total_visits: visits.len() as u64,
            unique_urls,
            visits,
        }
    }

    pub fn summary(&self) -> DailySummary {
        DailySummary {
            date: self.date,
            visits: self.total_visits,
            unique_urls: self.unique_urls,
        }
    }
}

/// Number of distinct non-empty URLs in `visits`.
pub fn count_unique_urls(visits: &[VisitRecord]) -> u64 {
    visits
        .iter()
        .filter(|v| !v.url.is_empty())
        .map(|v| v.url.as_str())
        .collect::<std::collections::HashSet<_>>()
        .len() as u64
}

// ── Ranked entries ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainCount {
    pub domain: String,
    pub visit_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlCount {
    pub url: String,
    pub visit_count: u64,
    /// First non-empty title seen for the URL, if any.
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryCount {
    pub query: String,
    pub count: u64,
}

// ── WeekdayDistribution ───────────────────────────────────────────────────────

/// Visit counts per UTC weekday, serialized as `{"Mon": n, …, "Sun": n}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayDistribution {
    #[serde(rename = "Mon", default)]
    pub mon: u64,
    #[serde(rename = "Tue", default)]
    pub tue: u64,
    #[serde(rename = "Wed", default)]
    pub wed: u64,
    #[serde(rename = "Thu", default)]
    pub thu: u64,
    #[serde(rename = "Fri", default)]
    pub fri: u64,
    #[serde(rename = "Sat", default)]
    pub sat: u64,
    #[serde(rename = "Sun", default)]
    pub sun: u64,
}

impl WeekdayDistribution {
    fn slot(&mut self, day: Weekday) -> &mut u64 {
        match day {
            Weekday::Mon => &mut self.mon,
            Weekday::Tue => &mut self.tue,
            Weekday::Wed => &mut self.wed,
            Weekday::Thu => &mut self.thu,
            Weekday::Fri => &mut self.fri,
            Weekday::Sat => &mut self.sat,
            Weekday::Sun => &mut self.sun,
        }
    }

    pub fn increment(&mut self, day: Weekday) {
        *self.slot(day) += 1;
    }

    pub fn get(&self, day: Weekday) -> u64 {
        match day {
            Weekday::Mon => self.mon,
            Weekday::Tue => self.tue,
            Weekday::Wed => self.wed,
            Weekday::Thu => self.thu,
            Weekday::Fri => self.fri,
            Weekday::Sat => self.sat,
            Weekday::Sun => self.sun,
        }
    }

    /// Add every bucket of `other` into `self`.
    pub fn accumulate(&mut self, other: &WeekdayDistribution) {
        self.mon += other.mon;
        self.tue += other.tue;
        self.wed += other.wed;
        self.thu += other.thu;
        self.fri += other.fri;
        self.sat += other.sat;
        self.sun += other.sun;
    }

    pub fn total(&self) -> u64 {
        self.mon + self.tue + self.wed + self.thu + self.fri + self.sat + self.sun
    }
}

// ── Aggregates ────────────────────────────────────────────────────────────────

/// Number of hourly buckets.
pub const HOURS_PER_DAY: usize = 24;

/// Ranked and bucketed statistics shared by per-period and merged aggregates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub total_visits: u64,
    pub unique_urls: u64,
    #[serde(default)]
    pub top_domains: Vec<DomainCount>,
    #[serde(default)]
    pub top_urls: Vec<UrlCount>,
    #[serde(default)]
    pub daily_summary: Vec<DailySummary>,
    #[serde(default)]
    pub hourly_distribution: [u64; HOURS_PER_DAY],
    #[serde(default)]
    pub weekday_distribution: WeekdayDistribution,
    #[serde(default)]
    pub top_search_queries: Vec<QueryCount>,
}

/// Statistics for one source over one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    /// Period descriptor, `"<start> to <end>"`.
    pub period: String,
    #[serde(flatten)]
    pub stats: AggregateStats,
}

/// Statistics combined across sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedAggregate {
    /// Period descriptors of every contributing aggregate, in merge order.
    pub periods: Vec<String>,
    #[serde(flatten)]
    pub stats: AggregateStats,
}

// ── Period ────────────────────────────────────────────────────────────────────

/// A bounded time range covered by an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The `weeks` weeks ending at `end`, or `None` when the start would
    /// fall outside the representable range.
    pub fn weeks_ending(end: DateTime<Utc>, weeks: u32) -> Option<Self> {
        let start = end.checked_sub_signed(TimeDelta::try_weeks(i64::from(weeks))?)?;
        Some(Self { start, end })
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start.date_naive(), self.end.date_naive())
    }
}

// ── Summary document ──────────────────────────────────────────────────────────

/// Condensed per-date view handed to downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    #[serde(default)]
    pub urls_visited: Vec<String>,
    #[serde(default)]
    pub titles: Vec<String>,
    #[serde(default)]
    pub top_domains: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryDocument {
    #[serde(default)]
    pub daily_summaries: Vec<DaySummary>,
}
