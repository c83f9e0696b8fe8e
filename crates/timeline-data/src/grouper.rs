//! Per-date partitioning of visit records.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use timeline_core::models::{count_unique_urls, DailyBucket, DailySummary, VisitRecord};
use timeline_core::time_utils::utc_date;

/// Partitions a chronological record sequence by UTC calendar date.
///
/// Input order is a precondition from the upstream source and is not
/// re-checked; relative order is kept within each date.
pub struct DailyGrouper;

impl DailyGrouper {
    /// Group `records` by the UTC date of their timestamp, dates ascending.
    pub fn group(records: &[VisitRecord]) -> BTreeMap<NaiveDate, Vec<VisitRecord>> {
        let mut by_date: BTreeMap<NaiveDate, Vec<VisitRecord>> = BTreeMap::new();
        for record in records {
            by_date
                .entry(utc_date(record.timestamp))
                .or_default()
                .push(record.clone());
        }
        by_date
    }

    /// One [`DailyBucket`] per date, dates ascending.
    pub fn buckets(records: &[VisitRecord]) -> Vec<DailyBucket> {
        Self::group(records)
            .into_iter()
            .map(|(date, visits)| DailyBucket::from_visits(date, visits))
            .collect()
    }

    /// Per-date visit totals, dates ascending.
    pub fn summaries(records: &[VisitRecord]) -> Vec<DailySummary> {
        Self::group(records)
            .into_iter()
            .map(|(date, visits)| DailySummary {
                date,
                visits: visits.len() as u64,
                unique_urls: count_unique_urls(&visits),
            })
            .collect()
    }

    /// Summaries of already-built buckets.
    pub fn summarize_buckets(buckets: &[DailyBucket]) -> Vec<DailySummary> {
        buckets.iter().map(DailyBucket::summary).collect()
    }
}
