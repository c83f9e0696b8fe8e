use std::path::PathBuf;

use chrono::TimeDelta;
use clap::{Args, Parser, Subcommand};

use crate::error::{Result, TimelineError};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Export browsing history into timeline files and merge them across browsers
#[derive(Parser, Debug, Clone)]
#[command(
    name = "visit-timeline",
    about = "Export browsing history into timeline files and merge them across browsers",
    version
)]
pub struct Settings {
    #[command(subcommand)]
    pub command: Command,

    /// Logging level
    #[arg(long, global = true, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path (logs go to stderr when unset)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Export one browser's history into per-date, aggregate and summary files
    Export(ExportArgs),
    /// Merge several exported sources into one combined view
    Merge(MergeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Number of weeks of history to export
    #[arg(long, default_value = "3")]
    pub weeks: u32,

    /// Output directory for timeline data
    #[arg(long, default_value = "timeline_data", env = "TIMELINE_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// Path to the browser's History SQLite database (auto-detected if not specified)
    #[arg(long, env = "TIMELINE_HISTORY_DB")]
    pub db_path: Option<PathBuf>,

    /// Directory for the temporary database copy (system temp dir if not specified)
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct MergeArgs {
    /// Base timeline data directory holding one subdirectory per source
    #[arg(long, default_value = "timeline_data", env = "TIMELINE_OUTPUT_DIR")]
    pub base_dir: PathBuf,

    /// Comma-separated list of source subdirectories, in merge order
    #[arg(long, default_value = "vivaldi,chrome")]
    pub sources: String,
}

impl Settings {
    /// Effective log level after applying `--debug`.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            &self.log_level
        }
    }
}

// ── Pipeline configuration ─────────────────────────────────────────────────────

/// Validated configuration for one export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Retention window in weeks (always ≥ 1).
    pub weeks: u32,
    pub output_dir: PathBuf,
    pub db_path: PathBuf,
    pub scratch_dir: Option<PathBuf>,
}

impl ExportConfig {
    pub fn new(
        weeks: u32,
        output_dir: PathBuf,
        db_path: PathBuf,
        scratch_dir: Option<PathBuf>,
    ) -> Result<Self> {
        if weeks == 0 {
            return Err(TimelineError::Config(
                "weeks must be a positive integer".to_string(),
            ));
        }
        if TimeDelta::try_weeks(i64::from(weeks)).is_none() {
            return Err(TimelineError::Config(format!(
                "weeks value {weeks} is too large"
            )));
        }
        Ok(Self {
            weeks,
            output_dir,
            db_path,
            scratch_dir,
        })
    }
}

/// Validated configuration for one merge run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConfig {
    pub base_dir: PathBuf,
    /// Source names in merge order, without duplicates.
    pub sources: Vec<String>,
}

impl MergeConfig {
    pub fn new(base_dir: PathBuf, sources: Vec<String>) -> Result<Self> {
        if sources.is_empty() {
            return Err(TimelineError::Config(
                "at least one source is required".to_string(),
            ));
        }
        Ok(Self { base_dir, sources })
    }

    /// Directory holding the artifacts of `source`.
    pub fn source_dir(&self, source: &str) -> PathBuf {
        self.base_dir.join(source)
    }

    /// Directory receiving merged artifacts.
    pub fn merge_dir(&self) -> PathBuf {
        self.base_dir.join("merge")
    }
}

impl ExportArgs {
    /// Resolve into an [`ExportConfig`], using `discover_db` when no database
    /// path was given.
    pub fn into_config(
        self,
        discover_db: impl FnOnce() -> Option<PathBuf>,
    ) -> Result<ExportConfig> {
        let db_path = self.db_path.or_else(discover_db).ok_or_else(|| {
            TimelineError::Config(
                "no history database found; pass --db-path".to_string(),
            )
        })?;
        ExportConfig::new(self.weeks, self.output_dir, db_path, self.scratch_dir)
    }
}

impl MergeArgs {
    pub fn into_config(self) -> Result<MergeConfig> {
        MergeConfig::new(self.base_dir, parse_sources(&self.sources))
    }
}

/// Split a comma-separated source list, trimming blanks and dropping
/// repeated names (first occurrence keeps its position).
pub fn parse_sources(list: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !out.iter().any(|existing| existing == name) {
            out.push(name.to_string());
        }
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────
