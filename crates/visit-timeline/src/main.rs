mod bootstrap;

use anyhow::{Context, Result};
use clap::Parser;
use timeline_core::settings::{Command, Settings};
use timeline_data::pipeline::{run_export, run_merge};
use timeline_data::source::SqliteHistorySource;

fn main() -> Result<()> {
    let settings = Settings::parse();

    bootstrap::setup_logging(settings.effective_log_level(), settings.log_file.as_ref())
        .context("failed to initialise logging")?;

    tracing::info!("visit-timeline v{} starting", env!("CARGO_PKG_VERSION"));

    match settings.command {
        Command::Export(args) => {
            let config = args.into_config(bootstrap::discover_history_db)?;
            let source = SqliteHistorySource::new(&config.db_path, config.scratch_dir.clone());
            tracing::info!("Using history database {}", source.db_path().display());

            let report = run_export(&config, &source)?;

            println!(
                "Exported {} visits for {} into {}",
                report.visits,
                report.period,
                config.output_dir.display()
            );
            println!("  daily files: {}", report.daily_files.len());
            println!("  aggregate:   {}", report.aggregate_file.display());
            println!("  summary:     {}", report.summary_file.display());
        }

        Command::Merge(args) => {
            let config = args.into_config()?;
            let report = run_merge(&config)?;

            println!(
                "Merged {} source(s) into {}",
                report.merged_sources.len(),
                report.output_dir.display()
            );
            if !report.skipped_sources.is_empty() {
                println!("  skipped (no data): {}", report.skipped_sources.join(", "));
            }
            println!("  daily files: {}", report.daily_files);
            for warning in &report.precision_warnings {
                println!("  note: {}", warning);
            }
        }
    }

    Ok(())
}
