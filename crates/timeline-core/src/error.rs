use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the visit timeline pipeline.
#[derive(Error, Debug)]
pub enum TimelineError {
    /// The browsing-history database is missing or could not be read.
    #[error("History source unavailable at {path}: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },

    /// The copied history database could not be opened or queried.
    #[error("Failed to read history database {path}: {source}")]
    HistoryDatabase {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A visit URL could not be parsed.
    #[error("Failed to parse URL {url:?}: {source}")]
    UrlParse {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// A named merge source has no artifacts on disk.
    #[error("No artifacts found for source {name} in {path}")]
    PartialMergeInput { name: String, path: PathBuf },

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An artifact could not be written to disk.
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed or produced.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience alias used throughout the timeline crates.
pub type Result<T> = std::result::Result<T, TimelineError>;
