use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use timeline_core::error::{Result, TimelineError};
use timeline_core::models::{Aggregate, DailyBucket, MergedAggregate, SummaryDocument};
use tracing::{debug, warn};

use crate::merger::SourceArtifacts;

const DAILY_DIR: &str = "daily";
const SUMMARY_FILE: &str = "llm_input.json";
const MERGED_AGGREGATE_FILE: &str = "aggregate_merged.json";

/// Reads and writes the JSON artifacts of one output directory.
///
/// Layout:
///
/// ```text
/// <root>/daily/history_<YYYY-MM-DD>.json
/// <root>/aggregate_<weeks>weeks.json
/// <root>/aggregate_merged.json
/// <root>/llm_input.json
/// ```
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn daily_dir(&self) -> PathBuf {
        self.root.join(DAILY_DIR)
    }

    pub fn daily_path(&self, date: NaiveDate) -> PathBuf {
        self.daily_dir().join(format!("history_{}.json", date))
    }

    pub fn aggregate_path(&self, weeks: u32) -> PathBuf {
        self.root.join(format!("aggregate_{}weeks.json", weeks))
    }

    pub fn merged_aggregate_path(&self) -> PathBuf {
        self.root.join(MERGED_AGGREGATE_FILE)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.root.join(SUMMARY_FILE)
    }

    // ── Writing ───────────────────────────────────────────────────────────────

    pub fn write_daily_bucket(&self, bucket: &DailyBucket) -> Result<PathBuf> {
        let path = self.daily_path(bucket.date);
        write_json(&path, bucket)?;
        Ok(path)
    }

    pub fn write_aggregate(&self, weeks: u32, aggregate: &Aggregate) -> Result<PathBuf> {
        let path = self.aggregate_path(weeks);
        write_json(&path, aggregate)?;
        Ok(path)
    }

    pub fn write_merged_aggregate(&self, aggregate: &MergedAggregate) -> Result<PathBuf> {
        let path = self.merged_aggregate_path();
        write_json(&path, aggregate)?;
        Ok(path)
    }

    pub fn write_summary(&self, summary: &SummaryDocument) -> Result<PathBuf> {
        let path = self.summary_path();
        write_json(&path, summary)?;
        Ok(path)
    }

    // ── Reading ───────────────────────────────────────────────────────────────

    /// Per-date history files, sorted by date.
    pub fn daily_files(&self) -> Vec<PathBuf> {
        let re = Regex::new(r"^history_\d{4}-\d{2}-\d{2}\.json$").expect("regex is valid");
        list_matching(&self.daily_dir(), &re)
    }

    /// Per-period aggregate files, sorted by path.
    pub fn aggregate_files(&self) -> Vec<PathBuf> {
        let re = Regex::new(r"^aggregate_\d+weeks\.json$").expect("regex is valid");
        list_matching(&self.root, &re)
    }

    /// Load everything this directory holds for source `name`.
    ///
    /// Returns [`TimelineError::PartialMergeInput`] when the directory holds
    /// no artifacts at all.
    pub fn load_source(&self, name: &str) -> Result<SourceArtifacts> {
        let mut artifacts = SourceArtifacts::new(name);

        for path in self.daily_files() {
            artifacts.daily.push(read_json(&path)?);
        }
        for path in self.aggregate_files() {
            artifacts.aggregates.push(read_json(&path)?);
        }
        let summary_path = self.summary_path();
        if summary_path.is_file() {
            artifacts.summary = Some(read_json(&summary_path)?);
        }

        if artifacts.is_empty() {
            return Err(TimelineError::PartialMergeInput {
                name: name.to_string(),
                path: self.root.clone(),
            });
        }

        debug!(
            source = name,
            daily = artifacts.daily.len(),
            aggregates = artifacts.aggregates.len(),
            has_summary = artifacts.summary.is_some(),
            "Loaded source artifacts"
        );
        Ok(artifacts)
    }
}

/// Files directly inside `dir` whose names match `re`, sorted by path.
fn list_matching(dir: &Path, re: &Regex) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .file_name()
                    .to_str()
                    .map(|name| re.is_match(name))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|source| TimelineError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// Pretty-print `value` to `path`, creating parent directories as needed.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let write_err = |source| TimelineError::FileWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    let json = serde_json::to_string_pretty(value)?;

    // Temp file then rename, so readers never see a half-written file.
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(write_err)?;
    std::fs::rename(&tmp, path).map_err(write_err)?;
    debug!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use timeline_core::models::{AggregateStats, DaySummary};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn aggregate(period: &str, total: u64) -> Aggregate {
        Aggregate {
            period: period.to_string(),
            stats: AggregateStats {
                total_visits: total,
                ..Default::default()
            },
        }
    }

    // ── paths ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_artifact_paths() {
        let store = ArtifactStore::new("/data/vivaldi");
        assert_eq!(
            store.daily_path(date("2024-01-05")),
            PathBuf::from("/data/vivaldi/daily/history_2024-01-05.json")
        );
        assert_eq!(
            store.aggregate_path(3),
            PathBuf::from("/data/vivaldi/aggregate_3weeks.json")
        );
        assert_eq!(
            store.summary_path(),
            PathBuf::from("/data/vivaldi/llm_input.json")
        );
        assert_eq!(
            store.merged_aggregate_path(),
            PathBuf::from("/data/vivaldi/aggregate_merged.json")
        );
    }

    // ── writing ───────────────────────────────────────────────────────────────

    #[test]
    fn test_write_creates_directories_and_pretty_json() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().join("nested/out"));
        let bucket = DailyBucket::from_visits(date("2024-01-01"), vec![]);
        let path = store.write_daily_bucket(&bucket).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n  \"date\": \"2024-01-01\""));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_write_overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.write_aggregate(3, &aggregate("first", 1)).unwrap();
        store.write_aggregate(3, &aggregate("second", 2)).unwrap();
        let loaded: Aggregate = read_json(&store.aggregate_path(3)).unwrap();
        assert_eq!(loaded.period, "second");
    }

    // ── reading ───────────────────────────────────────────────────────────────

    #[test]
    fn test_load_source_reads_everything_in_order() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        for d in ["2024-01-03", "2024-01-01", "2024-01-02"] {
            store
                .write_daily_bucket(&DailyBucket::from_visits(date(d), vec![]))
                .unwrap();
        }
        store.write_aggregate(3, &aggregate("p3", 3)).unwrap();
        store
            .write_summary(&SummaryDocument {
                daily_summaries: vec![DaySummary {
                    date: date("2024-01-01"),
                    urls_visited: vec![],
                    titles: vec![],
                    top_domains: vec![],
                }],
            })
            .unwrap();
        // Files that do not follow the naming scheme are ignored.
        std::fs::write(store.daily_dir().join("notes.json"), "{}").unwrap();
        std::fs::write(dir.path().join("aggregate_old.json"), "{}").unwrap();

        let artifacts = store.load_source("vivaldi").unwrap();
        assert_eq!(artifacts.name, "vivaldi");
        let dates: Vec<String> = artifacts.daily.iter().map(|b| b.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);
        assert_eq!(artifacts.aggregates.len(), 1);
        assert_eq!(artifacts.aggregates[0].stats.total_visits, 3);
        assert!(artifacts.summary.is_some());
    }

    #[test]
    fn test_load_source_missing_directory_is_partial_input() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path().join("chrome"));
        let err = store.load_source("chrome").unwrap_err();
        assert!(matches!(
            err,
            TimelineError::PartialMergeInput { ref name, .. } if name == "chrome"
        ));
    }

    #[test]
    fn test_load_source_empty_directory_is_partial_input() {
        let dir = TempDir::new().unwrap();
        let err = ArtifactStore::new(dir.path()).load_source("chrome").unwrap_err();
        assert!(matches!(err, TimelineError::PartialMergeInput { .. }));
    }

    #[test]
    fn test_load_source_corrupt_json_is_error() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        std::fs::write(store.aggregate_path(3), "{not json").unwrap();
        let err = store.load_source("vivaldi").unwrap_err();
        assert!(matches!(err, TimelineError::JsonParse(_)));
    }
}
