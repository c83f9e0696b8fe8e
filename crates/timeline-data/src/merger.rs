//! Combining several sources' artifacts into one timeline.
//!
//! Counts and distributions are summed across sources. URL cardinalities are
//! set unions: the global `unique_urls` is the size of the union of every URL
//! a source exposes (its daily records plus its ranked URLs), and each
//! date's `unique_urls` is recomputed from the concatenated records of that
//! date. Rankings are rebuilt from the summed counts with the first-seen
//! tie-break, where "first seen" follows source order and then each source's
//! ranked-list order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use timeline_core::models::{
    Aggregate, AggregateStats, DailyBucket, MergedAggregate, SummaryDocument, VisitRecord,
    WeekdayDistribution, HOURS_PER_DAY,
};
use timeline_core::ranking::FrequencyCounter;
use tracing::{debug, warn};

use crate::aggregator::{
    rank_domains, rank_queries, rank_urls, TitleIndex, TOP_DOMAINS_LIMIT, TOP_QUERIES_LIMIT,
    TOP_URLS_LIMIT,
};
use crate::grouper::DailyGrouper;
use crate::summary::{build_summary_document, merge_summary_documents};

// ── Inputs ────────────────────────────────────────────────────────────────────

/// Everything one named source contributes to a merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceArtifacts {
    pub name: String,
    pub aggregates: Vec<Aggregate>,
    pub daily: Vec<DailyBucket>,
    /// The source's summary document; rebuilt from `daily` when absent.
    pub summary: Option<SummaryDocument>,
}

impl SourceArtifacts {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.aggregates.is_empty() && self.daily.is_empty() && self.summary.is_none()
    }
}

// ── Precision warnings ────────────────────────────────────────────────────────

/// A ranked list of an [`Aggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankedList {
    TopDomains,
    TopUrls,
    TopSearchQueries,
}

impl RankedList {
    pub fn cap(self) -> usize {
        match self {
            RankedList::TopDomains => TOP_DOMAINS_LIMIT,
            RankedList::TopUrls => TOP_URLS_LIMIT,
            RankedList::TopSearchQueries => TOP_QUERIES_LIMIT,
        }
    }
}

impl fmt::Display for RankedList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RankedList::TopDomains => "top_domains",
            RankedList::TopUrls => "top_urls",
            RankedList::TopSearchQueries => "top_search_queries",
        };
        f.write_str(name)
    }
}

/// A source list that was full, so items ranked below its cap were dropped
/// before merging and merged counts for them may be low.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrecisionWarning {
    pub source: String,
    pub period: String,
    pub list: RankedList,
}

impl fmt::Display for PrecisionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of source {} ({}) is at its cap of {}; merged counts for lower-ranked items may be incomplete",
            self.list,
            self.source,
            self.period,
            self.list.cap()
        )
    }
}

fn precision_warnings(source: &str, aggregate: &Aggregate) -> Vec<PrecisionWarning> {
    let stats = &aggregate.stats;
    [
        (RankedList::TopDomains, stats.top_domains.len()),
        (RankedList::TopUrls, stats.top_urls.len()),
        (RankedList::TopSearchQueries, stats.top_search_queries.len()),
    ]
    .into_iter()
    .filter(|(list, len)| *len >= list.cap())
    .map(|(list, _)| PrecisionWarning {
        source: source.to_string(),
        period: aggregate.period.clone(),
        list,
    })
    .collect()
}

// ── Output ────────────────────────────────────────────────────────────────────

/// The combined view produced by [`MultiSourceMerger::merge`].
#[derive(Debug, Clone, PartialEq)]
pub struct MergedTimeline {
    pub aggregate: MergedAggregate,
    /// Per-date buckets, dates ascending, records tagged with their source.
    pub daily: Vec<DailyBucket>,
    pub summary: SummaryDocument,
    pub precision_warnings: Vec<PrecisionWarning>,
}

// ── Merger ────────────────────────────────────────────────────────────────────

/// Merges source artifacts in the order given.
pub struct MultiSourceMerger;

impl MultiSourceMerger {
    pub fn merge(sources: &[SourceArtifacts]) -> MergedTimeline {
        let daily = Self::merge_daily(sources);

        let mut periods = Vec::new();
        let mut total_visits = 0u64;
        let mut domains = FrequencyCounter::new();
        let mut urls = FrequencyCounter::new();
        let mut queries = FrequencyCounter::new();
        let mut titles = TitleIndex::default();
        let mut hourly = [0u64; HOURS_PER_DAY];
        let mut weekdays = WeekdayDistribution::default();
        let mut warnings = Vec::new();

        for source in sources {
            for aggregate in &source.aggregates {
                let stats = &aggregate.stats;
                periods.push(aggregate.period.clone());
                total_visits += stats.total_visits;
                for entry in stats.top_domains.iter().filter(|e| !e.domain.is_empty()) {
                    domains.add(&entry.domain, entry.visit_count);
                }
                for entry in stats.top_urls.iter().filter(|e| !e.url.is_empty()) {
                    urls.add(&entry.url, entry.visit_count);
                    if let Some(title) = &entry.title {
                        titles.offer(&entry.url, title);
                    }
                }
                for entry in stats.top_search_queries.iter().filter(|e| !e.query.is_empty()) {
                    queries.add(&entry.query, entry.count);
                }
                for (slot, count) in hourly.iter_mut().zip(stats.hourly_distribution) {
                    *slot += count;
                }
                weekdays.accumulate(&stats.weekday_distribution);

                for warning in precision_warnings(&source.name, aggregate) {
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        let mut unique: BTreeSet<&str> = BTreeSet::new();
        for bucket in &daily {
            unique.extend(
                bucket
                    .visits
                    .iter()
                    .filter(|v| !v.url.is_empty())
                    .map(|v| v.url.as_str()),
            );
        }
        for source in sources {
            for aggregate in &source.aggregates {
                unique.extend(
                    aggregate
                        .stats
                        .top_urls
                        .iter()
                        .filter(|e| !e.url.is_empty())
                        .map(|e| e.url.as_str()),
                );
            }
        }
        let unique_urls = unique.len() as u64;

        let summaries: Vec<SummaryDocument> = sources
            .iter()
            .filter_map(|source| match &source.summary {
                Some(doc) => Some(doc.clone()),
                None if !source.daily.is_empty() => Some(build_summary_document(&source.daily)),
                None => None,
            })
            .collect();

        debug!(
            sources = sources.len(),
            periods = periods.len(),
            dates = daily.len(),
            total_visits,
            unique_urls,
            "merged sources"
        );

        MergedTimeline {
            aggregate: MergedAggregate {
                periods,
                stats: AggregateStats {
                    total_visits,
                    unique_urls,
                    top_domains: rank_domains(&domains),
                    top_urls: rank_urls(&urls, &titles),
                    daily_summary: DailyGrouper::summarize_buckets(&daily),
                    hourly_distribution: hourly,
                    weekday_distribution: weekdays,
                    top_search_queries: rank_queries(&queries),
                },
            },
            summary: merge_summary_documents(&summaries),
            daily,
            precision_warnings: warnings,
        }
    }

    /// Concatenate each date's records across sources, tagging every record
    /// with its source name, and rebuild the per-date totals.
    pub fn merge_daily(sources: &[SourceArtifacts]) -> Vec<DailyBucket> {
        let mut by_date: BTreeMap<NaiveDate, Vec<VisitRecord>> = BTreeMap::new();
        for source in sources {
            for bucket in &source.daily {
                by_date.entry(bucket.date).or_default().extend(
                    bucket
                        .visits
                        .iter()
                        .cloned()
                        .map(|visit| visit.tagged(&source.name)),
                );
            }
        }
        by_date
            .into_iter()
            .map(|(date, visits)| DailyBucket::from_visits(date, visits))
            .collect()
    }
}
