//! Analyze command implementation

use anyhow::{Context, Result};
use breakout_analyzer::analyze;
use breakout_analyzer::config::Config;
use breakout_analyzer::report::{
    csv_filename, export_events_csv, format_events_table, format_summary,
};
use std::path::PathBuf;
use tracing::{info, warn};

use super::{build_source, RunOverrides};

pub fn run(
    config_path: String,
    ticker: String,
    overrides: RunOverrides,
    output: Option<String>,
    export: bool,
) -> Result<()> {
    info!("Starting breakout analysis");

    let mut config = Config::load_or_default(&config_path)?;
    info!("Loaded configuration from: {}", config_path);
    overrides.apply_source(&mut config)?;

    let request = overrides.request(&ticker, &config)?;
    let source = build_source(&config)?;

    let report = analyze(source.as_ref(), &request)
        .context(format!("Error analyzing data for {}", request.ticker))?;

    let Some(summary) = report.summary() else {
        warn!(
            "No breakouts found for {} in {} bars with the given parameters",
            request.ticker, report.bars_analyzed
        );
        println!("No breakouts found for the given parameters.");
        return Ok(());
    };

    println!("\n{}", format_summary(&request.ticker, &summary));
    println!(
        "Parameters: volume > {:.0}% over 20-day avg, price change > {:.2}%, hold {} days",
        request.thresholds.volume_threshold_pct,
        request.thresholds.price_threshold_pct,
        request.thresholds.holding_period
    );
    println!("\n{}\n", format_events_table(&report.events));

    let target = match (output, export) {
        (Some(path), _) => Some(PathBuf::from(path)),
        (None, true) => {
            Some(PathBuf::from(&config.data.results_dir).join(csv_filename(&request.ticker)))
        }
        (None, false) => None,
    };

    if let Some(path) = target {
        let written = export_events_csv(&report.events, &path)
            .context(format!("Failed to write {}", path.display()))?;
        println!("Results written to {}", written.display());
    }

    info!("Analysis completed successfully");

    Ok(())
}
