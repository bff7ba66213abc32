//! Scan command - independent breakout analyses over many tickers

use anyhow::Result;
use breakout_analyzer::config::Config;
use breakout_analyzer::{analyze, AnalysisRequest, BreakoutSummary, MarketDataSource, Ticker};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

use super::{build_source, parse_tickers, RunOverrides};

/// Outcome of one ticker in a scan
#[derive(Debug)]
pub struct ScanResult {
    pub ticker: Ticker,
    pub bars: usize,
    pub outcome: Result<Option<BreakoutSummary>, String>,
}

fn scan_one(source: &dyn MarketDataSource, request: &AnalysisRequest) -> ScanResult {
    match analyze(source, request) {
        Ok(report) => ScanResult {
            ticker: request.ticker.clone(),
            bars: report.bars_analyzed,
            outcome: Ok(report.summary()),
        },
        Err(e) => {
            let cause = std::error::Error::source(&e)
                .map(|c| format!("{}: {}", e, c))
                .unwrap_or_else(|| e.to_string());
            warn!("Scan of {} failed: {}", request.ticker, cause);
            ScanResult {
                ticker: request.ticker.clone(),
                bars: 0,
                outcome: Err(cause),
            }
        }
    }
}

fn metric(summary: &BreakoutSummary, sort_by: &str) -> f64 {
    match sort_by {
        "count" => summary.count as f64,
        "win_rate" => summary.win_rate_pct,
        _ => summary.avg_return_pct,
    }
}

/// Tickers with breakouts first (best metric first), then empty, then failed
pub fn sort_results(results: &mut [ScanResult], sort_by: &str) {
    results.sort_by(|a, b| match (&a.outcome, &b.outcome) {
        (Ok(Some(x)), Ok(Some(y))) => metric(y, sort_by)
            .partial_cmp(&metric(x, sort_by))
            .unwrap_or(CmpOrdering::Equal),
        (Ok(Some(_)), _) => CmpOrdering::Less,
        (_, Ok(Some(_))) => CmpOrdering::Greater,
        (Ok(None), Err(_)) => CmpOrdering::Less,
        (Err(_), Ok(None)) => CmpOrdering::Greater,
        _ => a.ticker.as_str().cmp(b.ticker.as_str()),
    });
}

pub fn run(
    config_path: String,
    tickers: String,
    overrides: RunOverrides,
    sort_by: String,
    sequential: bool,
) -> Result<()> {
    info!("Starting breakout scan");

    if !["count", "avg_return", "win_rate"].contains(&sort_by.as_str()) {
        anyhow::bail!(
            "Unknown sort metric: {}. Use count, avg_return or win_rate",
            sort_by
        );
    }

    let mut config = Config::load_or_default(&config_path)?;
    overrides.apply_source(&mut config)?;

    let symbols = parse_tickers(&tickers);
    if symbols.is_empty() {
        anyhow::bail!("No tickers given");
    }

    let requests: Vec<AnalysisRequest> = symbols
        .iter()
        .map(|s| overrides.request(s, &config))
        .collect::<Result<_>>()?;
    let source = build_source(&config)?;

    let thresholds = overrides.thresholds(&config);
    println!("\n{}", "=".repeat(70));
    println!("BREAKOUT SCAN");
    println!("{}", "=".repeat(70));
    println!("  Tickers:   {}", symbols.len());
    println!("  Range:     {} to {}", requests[0].start_date, requests[0].end_date);
    println!(
        "  Params:    volume > {:.0}%, price > {:.2}%, hold {} days",
        thresholds.volume_threshold_pct, thresholds.price_threshold_pct, thresholds.holding_period
    );
    println!("  Source:    {}", config.data.source);
    println!("  Mode:      {}", if sequential { "sequential" } else { "parallel" });
    println!("{}\n", "=".repeat(70));

    let pb = ProgressBar::new(requests.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("⚡ {percent:>3}%|{bar:40}| {pos}/{len} [{elapsed}<{eta}] ✓ {msg}")?
            .progress_chars("█░ "),
    );

    let with_breakouts = AtomicUsize::new(0);
    let scan = |request: &AnalysisRequest| {
        let result = scan_one(source.as_ref(), request);
        pb.inc(1);
        if matches!(result.outcome, Ok(Some(_))) {
            let count = with_breakouts.fetch_add(1, Ordering::Relaxed) + 1;
            pb.set_message(format!("{} with breakouts", count));
        }
        result
    };

    let mut results: Vec<ScanResult> = if sequential {
        requests.iter().map(scan).collect()
    } else {
        requests.par_iter().map(scan).collect()
    };

    pb.finish_with_message(format!(
        "{} with breakouts",
        with_breakouts.load(Ordering::Relaxed)
    ));
    println!();

    sort_results(&mut results, &sort_by);
    info!("Scanned {} tickers, sorted by: {}", results.len(), sort_by);

    println!("{}", "=".repeat(90));
    println!("SCAN RESULTS (sorted by {})", sort_by);
    println!("{}", "=".repeat(90));
    println!(
        "{:<4} {:<8} {:>6} {:>9} {:>9} {:>8} {:>9} {:>9}",
        "Rank", "Ticker", "Bars", "Breakouts", "AvgRet%", "WinR%", "Best%", "Worst%"
    );
    println!("{}", "-".repeat(90));

    for (i, result) in results.iter().enumerate() {
        match &result.outcome {
            Ok(Some(s)) => println!(
                "{:<4} {:<8} {:>6} {:>9} {:>9.2} {:>8.1} {:>9.2} {:>9.2}",
                i + 1,
                result.ticker,
                result.bars,
                s.count,
                s.avg_return_pct,
                s.win_rate_pct,
                s.best_return_pct,
                s.worst_return_pct
            ),
            Ok(None) => println!(
                "{:<4} {:<8} {:>6} {:>9}   no breakouts found",
                i + 1,
                result.ticker,
                result.bars,
                0
            ),
            Err(e) => println!("{:<4} {:<8} analysis failed: {}", i + 1, result.ticker, e),
        }
    }
    println!("{}", "=".repeat(90));

    Ok(())
}
