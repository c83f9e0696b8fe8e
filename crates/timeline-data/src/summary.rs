//! The condensed per-date document handed to downstream consumers.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::NaiveDate;
use timeline_core::models::{DailyBucket, DaySummary, SummaryDocument};
use timeline_core::ranking::FrequencyCounter;

/// Maximum domains listed per date.
pub const SUMMARY_DOMAINS_LIMIT: usize = 10;

/// First-seen deduplication of non-empty strings.
fn dedup_first_seen<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    values
        .filter(|v| !v.is_empty() && seen.insert(*v))
        .map(str::to_string)
        .collect()
}

/// Condense one day's bucket.
pub fn summarize_bucket(bucket: &DailyBucket) -> DaySummary {
    let mut domains = FrequencyCounter::new();
    for visit in bucket.visits.iter().filter(|v| !v.domain.is_empty()) {
        domains.increment(&visit.domain);
    }
    DaySummary {
        date: bucket.date,
        urls_visited: dedup_first_seen(bucket.visits.iter().map(|v| v.url.as_str())),
        titles: dedup_first_seen(bucket.visits.iter().map(|v| v.title.as_str())),
        top_domains: domains
            .most_common(SUMMARY_DOMAINS_LIMIT)
            .into_iter()
            .map(|(domain, _)| domain)
            .collect(),
    }
}

/// One [`DaySummary`] per bucket, in bucket order.
pub fn build_summary_document(buckets: &[DailyBucket]) -> SummaryDocument {
    SummaryDocument {
        daily_summaries: buckets.iter().map(summarize_bucket).collect(),
    }
}

#[derive(Default)]
struct DayUnion {
    urls: BTreeSet<String>,
    titles: BTreeSet<String>,
    domains: FrequencyCounter,
}

/// Combine per-source documents date by date.
///
/// URL and title lists become sorted unions. Domains are ranked by how many
/// sources list them for that date; ties keep the order in which the domains
/// were first seen across `documents`.
pub fn merge_summary_documents(documents: &[SummaryDocument]) -> SummaryDocument {
    let mut days: BTreeMap<NaiveDate, DayUnion> = BTreeMap::new();
    for doc in documents {
        for day in &doc.daily_summaries {
            let entry = days.entry(day.date).or_default();
            entry.urls.extend(day.urls_visited.iter().cloned());
            entry.titles.extend(day.titles.iter().cloned());
            for domain in &day.top_domains {
                entry.domains.increment(domain);
            }
        }
    }

    SummaryDocument {
        daily_summaries: days
            .into_iter()
            .map(|(date, day)| DaySummary {
                date,
                urls_visited: day.urls.into_iter().collect(),
                titles: day.titles.into_iter().collect(),
                top_domains: day
                    .domains
                    .most_common(SUMMARY_DOMAINS_LIMIT)
                    .into_iter()
                    .map(|(domain, _)| domain)
                    .collect(),
            })
            .collect(),
    }
}
