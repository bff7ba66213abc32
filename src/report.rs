//! Breakout reports: summary statistics, terminal tables and CSV export

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::info;

use crate::types::{round_dp, BreakoutEvent, Ticker};

/// Aggregate outcome of a set of breakouts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakoutSummary {
    pub count: usize,
    pub avg_return_pct: f64,
    /// Share of breakouts with a positive holding return, in percent
    pub win_rate_pct: f64,
    pub best_return_pct: f64,
    pub worst_return_pct: f64,
}

impl BreakoutSummary {
    /// `None` for an empty event list
    pub fn from_events(events: &[BreakoutEvent]) -> Option<Self> {
        if events.is_empty() {
            return None;
        }

        let returns: Vec<f64> = events.iter().map(|e| e.holding_return_pct).collect();
        let wins = events.iter().filter(|e| e.is_win()).count();

        Some(Self {
            count: events.len(),
            avg_return_pct: round_dp(returns.iter().mean(), 2),
            win_rate_pct: round_dp(wins as f64 / events.len() as f64 * 100.0, 1),
            best_return_pct: Statistics::max(returns.iter()),
            worst_return_pct: Statistics::min(returns.iter()),
        })
    }
}

/// Default export name, e.g. `AAPL_breakout_analysis.csv`
pub fn csv_filename(ticker: &Ticker) -> String {
    format!("{}_breakout_analysis.csv", ticker)
}

/// Serialize events as CSV, one row per event with a header row
pub fn write_events_csv<W: io::Write>(events: &[BreakoutEvent], writer: W) -> csv::Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for event in events {
        writer.serialize(event)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write events to `path`, creating parent directories as needed
pub fn export_events_csv(events: &[BreakoutEvent], path: impl AsRef<Path>) -> csv::Result<PathBuf> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::File::create(path)?;
    write_events_csv(events, file)?;

    info!("Exported {} breakouts to {}", events.len(), path.display());
    Ok(path.to_path_buf())
}

/// Summary block in the style of the backtest results banner
pub fn format_summary(ticker: &Ticker, summary: &BreakoutSummary) -> String {
    let rule = "=".repeat(60);
    let mut out = String::new();
    out.push_str(&format!("{}\n", rule));
    out.push_str(&format!("BREAKOUT ANALYSIS: {}\n", ticker));
    out.push_str(&format!("{}\n", rule));
    out.push_str(&format!("Number of Breakouts: {}\n", summary.count));
    out.push_str(&format!("Average Return:      {:.2}%\n", summary.avg_return_pct));
    out.push_str(&format!("Win Rate:            {:.1}%\n", summary.win_rate_pct));
    out.push_str(&format!("Best Return:         {:.2}%\n", summary.best_return_pct));
    out.push_str(&format!("Worst Return:        {:.2}%\n", summary.worst_return_pct));
    out.push_str(&rule);
    out
}

/// Fixed-width table of events, headers matching the CSV columns
pub fn format_events_table(events: &[BreakoutEvent]) -> String {
    let mut out = format!(
        "{:<10} {:<10} {:>11} {:>10} {:>8} {:>12} {:>12} {:>15} {:>18}\n",
        "Date",
        "Exit_Date",
        "Entry_Price",
        "Exit_Price",
        "Return",
        "Volume",
        "Avg_Volume",
        "Volume_Increase",
        "Daily_Price_Change"
    );
    out.push_str(&"-".repeat(112));

    for e in events {
        out.push_str(&format!(
            "\n{:<10} {:<10} {:>11.2} {:>10.2} {:>7.2}% {:>12} {:>12} {:>14.2}% {:>17.2}%",
            e.date.format("%Y-%m-%d"),
            e.exit_date.format("%Y-%m-%d"),
            e.entry_price,
            e.exit_price,
            e.holding_return_pct,
            e.volume,
            e.avg_volume,
            e.volume_increase_pct,
            e.daily_price_change_pct
        ));
    }

    out
}
