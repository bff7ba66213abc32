//! Download command - fetch daily bars from Yahoo Finance into CSV files

use anyhow::{Context, Result};
use breakout_analyzer::config::Config;
use breakout_analyzer::data::YahooDataFetcher;
use breakout_analyzer::Ticker;
use tracing::{info, warn};

use super::{parse_tickers, resolve_dates};

pub fn run(
    config_path: String,
    tickers: String,
    start: Option<String>,
    end: Option<String>,
    output: Option<String>,
) -> Result<()> {
    info!("Starting data download from Yahoo Finance");

    let config = Config::load_or_default(&config_path)?;
    let output = output.unwrap_or_else(|| config.data.data_dir.clone());
    let (start, end) = resolve_dates(
        start.as_deref(),
        end.as_deref(),
        config.analysis.lookback_days,
    )?;

    let symbols = parse_tickers(&tickers);
    if symbols.is_empty() {
        anyhow::bail!("No tickers given");
    }

    let fetcher = YahooDataFetcher::new(config.data.request_timeout())
        .context("Failed to build Yahoo Finance client")?;

    println!("\n{}", "=".repeat(60));
    println!("DOWNLOADING DAILY BARS FROM YAHOO FINANCE");
    println!("{}", "=".repeat(60));
    println!("  Tickers: {:?}", symbols);
    println!("  Range:   {} to {}", start, end);
    println!("  Output:  {}", output);
    println!("{}\n", "=".repeat(60));

    let mut total_bars = 0;
    let mut success_count = 0;

    for symbol in &symbols {
        let ticker = Ticker::new(symbol);
        print!("  Downloading {}... ", ticker);

        match fetcher.download(&ticker, start, end, &output) {
            Ok((filepath, count)) => {
                info!("Stored {} bars for {} in {}", count, ticker, filepath.display());
                total_bars += count;
                println!("✓ {} bars", count);
                success_count += 1;
            }
            Err(e) => {
                warn!("Download failed for {}: {}", ticker, e);
                println!("✗ Error: {}", e);
            }
        }
    }

    println!("\n{}", "=".repeat(60));
    println!("DOWNLOAD COMPLETE");
    println!("{}", "=".repeat(60));
    println!("  Successful: {}/{}", success_count, symbols.len());
    println!("  Total bars: {}", total_bars);
    println!("{}", "=".repeat(60));

    Ok(())
}
