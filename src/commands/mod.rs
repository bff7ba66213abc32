//! Subcommand implementations and the helpers they share

pub mod analyze;
pub mod download;
pub mod scan;

use anyhow::{Context, Result};
use breakout_analyzer::config::Config;
use breakout_analyzer::data::{CsvDataSource, DataSourceKind, MarketDataSource, YahooDataFetcher};
use breakout_analyzer::{AnalysisRequest, BreakoutThresholds};
use chrono::{Local, NaiveDate, TimeDelta};
use tracing::info;

/// Command-line values that take precedence over the config file
#[derive(Debug, Default)]
pub struct RunOverrides {
    pub start: Option<String>,
    pub end: Option<String>,
    pub volume_threshold: Option<f64>,
    pub price_threshold: Option<f64>,
    pub holding_period: Option<usize>,
    pub source: Option<String>,
}

impl RunOverrides {
    /// Apply the source override to the config
    pub fn apply_source(&self, config: &mut Config) -> Result<()> {
        if let Some(source) = &self.source {
            info!("Overriding data source to: {}", source);
            config.data.source = source.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        }
        Ok(())
    }

    pub fn thresholds(&self, config: &Config) -> BreakoutThresholds {
        let mut thresholds = config.analysis.thresholds();
        if let Some(v) = self.volume_threshold {
            thresholds.volume_threshold_pct = v;
        }
        if let Some(p) = self.price_threshold {
            thresholds.price_threshold_pct = p;
        }
        if let Some(h) = self.holding_period {
            thresholds.holding_period = h;
        }
        thresholds
    }

    /// Start and end dates; end defaults to today, start to end minus the lookback
    pub fn date_range(&self, config: &Config) -> Result<(NaiveDate, NaiveDate)> {
        resolve_dates(
            self.start.as_deref(),
            self.end.as_deref(),
            config.analysis.lookback_days,
        )
    }

    pub fn request(&self, ticker: &str, config: &Config) -> Result<AnalysisRequest> {
        let (start, end) = self.date_range(config)?;
        Ok(AnalysisRequest::new(ticker, start, end, self.thresholds(config)))
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .context(format!("Invalid date '{}', expected YYYY-MM-DD", value))
}

pub fn resolve_dates(
    start: Option<&str>,
    end: Option<&str>,
    lookback_days: i64,
) -> Result<(NaiveDate, NaiveDate)> {
    let end = match end {
        Some(s) => parse_date(s)?,
        None => Local::now().date_naive(),
    };
    let start = match start {
        Some(s) => parse_date(s)?,
        None => TimeDelta::try_days(lookback_days)
            .and_then(|lookback| end.checked_sub_signed(lookback))
            .context(format!("Lookback of {} days is out of range", lookback_days))?,
    };
    Ok((start, end))
}

/// Split a comma-separated ticker list, dropping blanks
pub fn parse_tickers(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Build the configured market data source
pub fn build_source(config: &Config) -> Result<Box<dyn MarketDataSource>> {
    let source: Box<dyn MarketDataSource> = match config.data.source {
        DataSourceKind::Yahoo => Box::new(
            YahooDataFetcher::new(config.data.request_timeout())
                .context("Failed to build Yahoo Finance client")?,
        ),
        DataSourceKind::Csv => Box::new(CsvDataSource::new(&config.data.data_dir)),
    };
    Ok(source)
}
