//! Ranked and bucketed statistics over one period of visits.

use std::collections::{HashMap, HashSet};

use timeline_core::models::{
    Aggregate, AggregateStats, DomainCount, Period, QueryCount, UrlCount, VisitRecord,
    WeekdayDistribution, HOURS_PER_DAY,
};
use timeline_core::ranking::FrequencyCounter;
use timeline_core::time_utils::{utc_hour, utc_weekday};
use timeline_core::url_utils::extract_search_query;
use tracing::debug;

use crate::grouper::DailyGrouper;

/// Maximum entries in `top_domains`.
pub const TOP_DOMAINS_LIMIT: usize = 20;
/// Maximum entries in `top_urls`.
pub const TOP_URLS_LIMIT: usize = 50;
/// Maximum entries in `top_search_queries`.
pub const TOP_QUERIES_LIMIT: usize = 50;

// ── TitleIndex ────────────────────────────────────────────────────────────────

/// First non-empty title seen for each URL.
#[derive(Debug, Clone, Default)]
pub struct TitleIndex {
    titles: HashMap<String, String>,
}

impl TitleIndex {
    /// Remember `title` for `url` unless one is already known. Empty values
    /// are ignored.
    pub fn offer(&mut self, url: &str, title: &str) {
        if url.is_empty() || title.is_empty() || self.titles.contains_key(url) {
            return;
        }
        self.titles.insert(url.to_string(), title.to_string());
    }

    pub fn get(&self, url: &str) -> Option<&str> {
        self.titles.get(url).map(String::as_str)
    }
}

// ── Ranked list builders ──────────────────────────────────────────────────────

pub(crate) fn rank_domains(counter: &FrequencyCounter) -> Vec<DomainCount> {
    counter
        .most_common(TOP_DOMAINS_LIMIT)
        .into_iter()
        .map(|(domain, visit_count)| DomainCount {
            domain,
            visit_count,
        })
        .collect()
}

pub(crate) fn rank_urls(counter: &FrequencyCounter, titles: &TitleIndex) -> Vec<UrlCount> {
    counter
        .most_common(TOP_URLS_LIMIT)
        .into_iter()
        .map(|(url, visit_count)| UrlCount {
            title: titles.get(&url).map(str::to_string),
            url,
            visit_count,
        })
        .collect()
}

pub(crate) fn rank_queries(counter: &FrequencyCounter) -> Vec<QueryCount> {
    counter
        .most_common(TOP_QUERIES_LIMIT)
        .into_iter()
        .map(|(query, count)| QueryCount { query, count })
        .collect()
}

// ── Aggregator ────────────────────────────────────────────────────────────────

/// Computes an [`Aggregate`] from a period's chronological records.
pub struct Aggregator;

impl Aggregator {
    pub fn aggregate(period: &Period, records: &[VisitRecord]) -> Aggregate {
        let mut domains = FrequencyCounter::new();
        let mut urls = FrequencyCounter::new();
        let mut queries = FrequencyCounter::new();
        let mut titles = TitleIndex::default();
        let mut hourly = [0u64; HOURS_PER_DAY];
        let mut weekdays = WeekdayDistribution::default();
        let mut unique: HashSet<&str> = HashSet::new();

        for record in records {
            if !record.domain.is_empty() {
                domains.increment(&record.domain);
            }
            if !record.url.is_empty() {
                urls.increment(&record.url);
                unique.insert(&record.url);
                titles.offer(&record.url, &record.title);
                if let Some(query) = extract_search_query(&record.url) {
                    queries.increment(&query);
                }
            }
            hourly[utc_hour(record.timestamp)] += 1;
            weekdays.increment(utc_weekday(record.timestamp));
        }

        debug!(
            records = records.len(),
            domains = domains.len(),
            urls = urls.len(),
            queries = queries.len(),
            "aggregated period {}",
            period
        );

        Aggregate {
            period: period.to_string(),
            stats: AggregateStats {
                total_visits: records.len() as u64,
                unique_urls: unique.len() as u64,
                top_domains: rank_domains(&domains),
                top_urls: rank_urls(&urls, &titles),
                daily_summary: DailyGrouper::summaries(records),
                hourly_distribution: hourly,
                weekday_distribution: weekdays,
                top_search_queries: rank_queries(&queries),
            },
        }
    }
}
