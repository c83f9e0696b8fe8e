//! Export and merge pipelines.
//!
//! Export pulls raw rows from a [`VisitSource`], normalizes them, writes one
//! history file per date, then the period aggregate and the summary
//! document. Merge reloads the artifacts of several exported sources and
//! writes their combined view.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use timeline_core::error::{Result, TimelineError};
use timeline_core::models::{Aggregate, DailyBucket, Period, SummaryDocument, VisitRecord};
use timeline_core::settings::{ExportConfig, MergeConfig};
use timeline_core::time_utils::TimestampConverter;
use tracing::{debug, info, warn};

use crate::aggregator::Aggregator;
use crate::grouper::DailyGrouper;
use crate::merger::{MultiSourceMerger, PrecisionWarning};
use crate::normalizer::RecordNormalizer;
use crate::source::VisitSource;
use crate::store::ArtifactStore;
use crate::summary::build_summary_document;

// ── Export ────────────────────────────────────────────────────────────────────

/// Everything computed from one period's records.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutput {
    pub buckets: Vec<DailyBucket>,
    pub aggregate: Aggregate,
    pub summary: SummaryDocument,
}

/// Outcome of [`run_export`].
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub period: Period,
    pub visits: usize,
    pub daily_files: Vec<PathBuf>,
    pub aggregate_file: PathBuf,
    pub summary_file: PathBuf,
}

/// Compute every export artifact from chronological `records`.
pub fn build_export(records: &[VisitRecord], period: &Period) -> ExportOutput {
    let buckets = DailyGrouper::buckets(records);
    let aggregate = Aggregator::aggregate(period, records);
    let summary = build_summary_document(&buckets);
    ExportOutput {
        buckets,
        aggregate,
        summary,
    }
}

/// Export the `config.weeks` weeks ending now.
pub fn run_export(config: &ExportConfig, source: &impl VisitSource) -> Result<ExportReport> {
    run_export_at(config, source, Utc::now())
}

/// Export the `config.weeks` weeks ending at `now`.
pub fn run_export_at(
    config: &ExportConfig,
    source: &impl VisitSource,
    now: DateTime<Utc>,
) -> Result<ExportReport> {
    let period = Period::weeks_ending(now, config.weeks).ok_or_else(|| {
        TimelineError::Config(format!(
            "a {} week window ending {} is out of range",
            config.weeks,
            now.to_rfc3339()
        ))
    })?;
    let since_raw = TimestampConverter::to_raw(period.start);
    info!(
        "Exporting visits since {} ({} weeks)",
        period.start.to_rfc3339(),
        config.weeks
    );

    let rows = source.fetch_visits(since_raw)?;
    let records = RecordNormalizer::normalize_all(rows);
    let output = build_export(&records, &period);

    let store = ArtifactStore::new(&config.output_dir);
    let mut daily_files = Vec::with_capacity(output.buckets.len());
    for bucket in &output.buckets {
        daily_files.push(store.write_daily_bucket(bucket)?);
    }
    info!("Wrote {} daily files", daily_files.len());

    let aggregate_file = store.write_aggregate(config.weeks, &output.aggregate)?;
    info!("Wrote aggregate to {}", aggregate_file.display());
    let summary_file = store.write_summary(&output.summary)?;
    info!("Wrote summary to {}", summary_file.display());

    Ok(ExportReport {
        period,
        visits: records.len(),
        daily_files,
        aggregate_file,
        summary_file,
    })
}

// ── Merge ─────────────────────────────────────────────────────────────────────

/// Outcome of [`run_merge`].
#[derive(Debug, Clone)]
pub struct MergeReport {
    pub merged_sources: Vec<String>,
    /// Sources with no artifacts, in configuration order.
    pub skipped_sources: Vec<String>,
    pub daily_files: usize,
    pub output_dir: PathBuf,
    pub precision_warnings: Vec<PrecisionWarning>,
}

/// Merge every configured source under `config.base_dir` into
/// `<base_dir>/merge`.
///
/// Sources without artifacts are skipped with a warning; the merge still
/// runs on whatever remains.
pub fn run_merge(config: &MergeConfig) -> Result<MergeReport> {
    let mut loaded = Vec::new();
    let mut skipped_sources = Vec::new();

    for name in &config.sources {
        let store = ArtifactStore::new(config.source_dir(name));
        match store.load_source(name) {
            Ok(artifacts) => {
                debug!("Loaded source {}", name);
                loaded.push(artifacts);
            }
            Err(TimelineError::PartialMergeInput { name, path }) => {
                warn!("Skipping source {}: no artifacts in {}", name, path.display());
                skipped_sources.push(name);
            }
            Err(e) => return Err(e),
        }
    }

    let merged = MultiSourceMerger::merge(&loaded);

    let store = ArtifactStore::new(config.merge_dir());
    info!("Merging daily files...");
    for bucket in &merged.daily {
        store.write_daily_bucket(bucket)?;
    }
    info!("Merging aggregate data...");
    store.write_merged_aggregate(&merged.aggregate)?;
    info!("Merging summary data...");
    store.write_summary(&merged.summary)?;
    info!("Merged output written to {}", store.root().display());

    Ok(MergeReport {
        merged_sources: loaded.into_iter().map(|s| s.name).collect(),
        skipped_sources,
        daily_files: merged.daily.len(),
        output_dir: store.root().to_path_buf(),
        precision_warnings: merged.precision_warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RawVisitRow;
    use chrono::Weekday;
    use tempfile::TempDir;
    use timeline_core::models::{DomainCount, MergedAggregate, QueryCount};
    use timeline_core::transition::{TransitionQualifier, TransitionType};

    fn utc(ts: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc)
    }

    fn row(url: &str, ts: &str, transition: i64, id: i64) -> RawVisitRow {
        RawVisitRow {
            url: Some(url.to_string()),
            title: Some(String::new()),
            visit_time: Some(TimestampConverter::to_raw(utc(ts))),
            transition: Some(transition),
            visit_id: Some(id),
            ..Default::default()
        }
    }

    fn scenario_rows() -> Vec<RawVisitRow> {
        vec![
            row("https://example.com/", "2024-01-01T10:00:00Z", 0x8100_0000, 1),
            row("https://example.com/", "2024-01-01T15:00:00Z", 8, 2),
            row("https://search.brave.com/search?q=rust", "2024-01-02T09:00:00Z", 1, 3),
        ]
    }

    // ── build_export ──────────────────────────────────────────────────────────

    #[test]
    fn test_end_to_end_scenario() {
        let records = RecordNormalizer::normalize_all(scenario_rows());
        assert_eq!(records[0].transition_type, TransitionType::Link);
        assert_eq!(
            records[0].transition_qualifiers,
            vec![TransitionQualifier::ChainStart, TransitionQualifier::UserGesture]
        );
        assert_eq!(records[1].transition_type, TransitionType::Reload);
        assert_eq!(records[2].transition_type, TransitionType::Typed);

        let period = Period::weeks_ending(utc("2024-01-03T00:00:00Z"), 3).unwrap();
        let output = build_export(&records, &period);
        let stats = &output.aggregate.stats;

        let days: Vec<(String, u64, u64)> = stats
            .daily_summary
            .iter()
            .map(|d| (d.date.to_string(), d.visits, d.unique_urls))
            .collect();
        assert_eq!(
            days,
            vec![
                ("2024-01-01".to_string(), 2, 1),
                ("2024-01-02".to_string(), 1, 1),
            ]
        );
        assert_eq!(
            stats.top_domains,
            vec![
                DomainCount {
                    domain: "example.com".to_string(),
                    visit_count: 2
                },
                DomainCount {
                    domain: "search.brave.com".to_string(),
                    visit_count: 1
                },
            ]
        );
        assert_eq!(
            stats.top_search_queries,
            vec![QueryCount {
                query: "rust".to_string(),
                count: 1
            }]
        );
        assert_eq!(stats.hourly_distribution[10], 1);
        assert_eq!(stats.hourly_distribution[15], 1);
        assert_eq!(stats.hourly_distribution[9], 1);
        assert_eq!(stats.hourly_distribution.iter().sum::<u64>(), 3);
        assert_eq!(stats.weekday_distribution.get(Weekday::Mon), 2);
        assert_eq!(stats.weekday_distribution.get(Weekday::Tue), 1);

        assert_eq!(output.buckets.len(), 2);
        assert_eq!(output.summary.daily_summaries.len(), 2);
        assert_eq!(
            output.summary.daily_summaries[0].urls_visited,
            vec!["https://example.com/"]
        );
    }

    // ── run_export ────────────────────────────────────────────────────────────

    #[test]
    fn test_run_export_writes_artifacts_within_window() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("vivaldi");
        let config = ExportConfig::new(1, out.clone(), "unused".into(), None).unwrap();
        let mut rows = vec![row("https://old.com/", "2023-12-01T00:00:00Z", 0, 99)];
        rows.extend(scenario_rows());

        let report = run_export_at(&config, &rows, utc("2024-01-03T00:00:00Z")).unwrap();
        assert_eq!(report.visits, 3);
        assert_eq!(report.daily_files.len(), 2);
        assert!(out.join("daily/history_2024-01-01.json").is_file());
        assert!(out.join("daily/history_2024-01-02.json").is_file());
        assert!(!out.join("daily/history_2023-12-01.json").exists());
        assert_eq!(report.aggregate_file, out.join("aggregate_1weeks.json"));
        assert!(report.summary_file.is_file());

        let text = std::fs::read_to_string(&report.aggregate_file).unwrap();
        let aggregate: Aggregate = serde_json::from_str(&text).unwrap();
        assert_eq!(aggregate.period, "2023-12-27 to 2024-01-03");
        assert_eq!(aggregate.stats.total_visits, 3);
    }

    #[test]
    fn test_run_export_rejects_window_before_representable_time() {
        let dir = TempDir::new().unwrap();
        let config = ExportConfig::new(1, dir.path().join("out"), "unused".into(), None).unwrap();
        let err = run_export_at(&config, &scenario_rows(), DateTime::<Utc>::MIN_UTC).unwrap_err();
        assert!(matches!(err, TimelineError::Config(_)));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_run_export_propagates_source_failure() {
        let dir = TempDir::new().unwrap();
        let config =
            ExportConfig::new(3, dir.path().join("out"), dir.path().join("History"), None).unwrap();
        let source = crate::source::SqliteHistorySource::new(&config.db_path, None);
        let err = run_export(&config, &source).unwrap_err();
        assert!(matches!(err, TimelineError::SourceUnavailable { .. }));
        assert!(!dir.path().join("out").exists());
    }

    // ── run_merge ─────────────────────────────────────────────────────────────

    #[test]
    fn test_run_merge_combines_and_skips_missing_sources() {
        let dir = TempDir::new().unwrap();
        let now = utc("2024-01-03T00:00:00Z");
        for (name, rows) in [
            ("vivaldi", scenario_rows()),
            (
                "chrome",
                vec![row("https://example.com/", "2024-01-01T11:00:00Z", 0, 7)],
            ),
        ] {
            let config = ExportConfig::new(3, dir.path().join(name), "unused".into(), None).unwrap();
            run_export_at(&config, &rows, now).unwrap();
        }

        let config = MergeConfig::new(
            dir.path().to_path_buf(),
            vec!["vivaldi".into(), "firefox".into(), "chrome".into()],
        )
        .unwrap();
        let report = run_merge(&config).unwrap();
        assert_eq!(report.merged_sources, vec!["vivaldi", "chrome"]);
        assert_eq!(report.skipped_sources, vec!["firefox"]);
        assert_eq!(report.daily_files, 2);
        assert!(report.precision_warnings.is_empty());

        let merge_dir = dir.path().join("merge");
        let text = std::fs::read_to_string(merge_dir.join("aggregate_merged.json")).unwrap();
        let merged: MergedAggregate = serde_json::from_str(&text).unwrap();
        assert_eq!(merged.stats.total_visits, 4);
        assert_eq!(merged.stats.unique_urls, 2);
        assert_eq!(merged.stats.daily_summary[0].visits, 3);
        assert_eq!(merged.stats.daily_summary[0].unique_urls, 1);
        assert_eq!(merged.periods.len(), 2);

        let day: DailyBucket = serde_json::from_str(
            &std::fs::read_to_string(merge_dir.join("daily/history_2024-01-01.json")).unwrap(),
        )
        .unwrap();
        let sources: Vec<&str> = day
            .visits
            .iter()
            .filter_map(|v| v.source.as_deref())
            .collect();
        assert_eq!(sources, vec!["vivaldi", "vivaldi", "chrome"]);
        assert!(merge_dir.join("llm_input.json").is_file());
    }

    #[test]
    fn test_run_merge_is_idempotent_on_disk() {
        let dir = TempDir::new().unwrap();
        let export = ExportConfig::new(3, dir.path().join("vivaldi"), "unused".into(), None).unwrap();
        run_export_at(&export, &scenario_rows(), utc("2024-01-03T00:00:00Z")).unwrap();

        let config = MergeConfig::new(dir.path().to_path_buf(), vec!["vivaldi".into()]).unwrap();
        let path = dir.path().join("merge/aggregate_merged.json");
        run_merge(&config).unwrap();
        let first = std::fs::read(&path).unwrap();
        run_merge(&config).unwrap();
        let second = std::fs::read(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_run_merge_with_no_sources_present() {
        let dir = TempDir::new().unwrap();
        let config = MergeConfig::new(dir.path().to_path_buf(), vec!["chrome".into()]).unwrap();
        let report = run_merge(&config).unwrap();
        assert!(report.merged_sources.is_empty());
        assert_eq!(report.skipped_sources, vec!["chrome"]);
        assert_eq!(report.daily_files, 0);
    }
}
