use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a `DEBUG`/`INFO`/`WARNING`/`ERROR`/`CRITICAL` level name to an
/// [`EnvFilter`] directive.
fn filter_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_lowercase(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Output goes to `log_file` (appended, no colours) when one is given and to
/// stderr otherwise. Falls back to `"info"` if the level is not recognised.
pub fn setup_logging(log_level: &str, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(filter_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));

    let (stderr_layer, file_layer) = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (None, Some(layer))
        }
        None => {
            let layer = fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr);
            (Some(layer), None)
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}

// ── History database discovery ─────────────────────────────────────────────────

/// Browser profile directories checked, in order, below the user's config
/// directory.
const PROFILE_CANDIDATES: &[&str] = &[
    "vivaldi/Default",
    "Vivaldi/Default",
    "google-chrome/Default",
    "Google/Chrome/Default",
    "chromium/Default",
    "Chromium/Default",
];

/// First existing `History` database below `config_dir`.
pub fn discover_history_db_in(config_dir: &Path) -> Option<PathBuf> {
    PROFILE_CANDIDATES
        .iter()
        .map(|profile| config_dir.join(profile).join("History"))
        .find(|p| p.is_file())
}

/// Locate a browser history database in the platform config directory
/// (`~/.config` on Linux, `~/Library/Application Support` on macOS).
pub fn discover_history_db() -> Option<PathBuf> {
    let found = discover_history_db_in(&dirs::config_dir()?);
    if let Some(path) = &found {
        tracing::debug!("Discovered history database at {}", path.display());
    }
    found
}

// ── Tests ──────────────────────────────────────────────────────────────────────
