//! Data loading and management
//!
//! Daily bars come from a [`MarketDataSource`]: either CSV files on disk or
//! the Yahoo Finance chart API. Both return a chronologically sorted series
//! restricted to the requested (inclusive) date range.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use itertools::Itertools;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;
use tracing::{debug, info, warn};

use crate::error::{DataError, DataResult};
use crate::types::{Bar, Ticker};

// =============================================================================
// Constants
// =============================================================================

const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const YAHOO_USER_AGENT: &str = "Mozilla/5.0";

// =============================================================================
// Data Source Abstraction
// =============================================================================

/// Supplier of daily bars for a ticker
///
/// Implementations must return bars sorted by date without duplicates, limited
/// to `start..=end`. Failures are fatal to the calling analysis run.
pub trait MarketDataSource: Send + Sync {
    /// Short label used in logs
    fn name(&self) -> &str;

    fn fetch_daily_bars(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DataResult<Vec<Bar>>;
}

/// Selectable data source backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceKind {
    #[default]
    Yahoo,
    Csv,
}

impl std::str::FromStr for DataSourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yahoo" => Ok(DataSourceKind::Yahoo),
            "csv" => Ok(DataSourceKind::Csv),
            _ => Err(format!("Unknown data source: {}. Use 'yahoo' or 'csv'", s)),
        }
    }
}

impl std::fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSourceKind::Yahoo => write!(f, "yahoo"),
            DataSourceKind::Csv => write!(f, "csv"),
        }
    }
}

// =============================================================================
// Series Helpers
// =============================================================================

/// Sort by date and drop repeated dates, keeping the first occurrence
pub fn normalize_series(bars: &mut Vec<Bar>) {
    bars.sort_by_key(|b| b.date);
    bars.dedup_by_key(|b| b.date);
}

fn retain_range(bars: &mut Vec<Bar>, start: NaiveDate, end: NaiveDate) {
    bars.retain(|b| b.date >= start && b.date <= end);
}

// =============================================================================
// CSV Data Loading
// =============================================================================

/// Load bars from a CSV file with header `date,open,high,low,close,volume`
///
/// Rows that fail validation are skipped with a warning.
pub fn load_csv(path: impl AsRef<Path>) -> DataResult<Vec<Bar>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(DataError::NotFound(path.to_path_buf()));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let mut bars = Vec::new();

    for (row_idx, result) in reader.deserialize::<Bar>().enumerate() {
        let bar = result?;
        match bar.validate() {
            Ok(()) => bars.push(bar),
            Err(e) => warn!("Skipping row {} of {}: {}", row_idx + 1, path.display(), e),
        }
    }

    normalize_series(&mut bars);
    debug!("Loaded {} bars from {}", bars.len(), path.display());

    Ok(bars)
}

/// Write bars to CSV in the format read by [`load_csv`]
pub fn save_bars_csv(bars: &[Bar], path: impl AsRef<Path>) -> DataResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for bar in bars {
        writer.serialize(bar)?;
    }
    writer.flush()?;

    info!("Saved {} bars to {}", bars.len(), path.display());
    Ok(())
}

/// Reads `{data_dir}/{TICKER}.csv`
#[derive(Debug, Clone)]
pub struct CsvDataSource {
    data_dir: PathBuf,
}

impl CsvDataSource {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, ticker: &Ticker) -> PathBuf {
        self.data_dir.join(format!("{}.csv", ticker.as_str()))
    }

    /// Fetch a ticker from `source` into this store, returning the file and bar count
    pub fn store_from(
        &self,
        source: &dyn MarketDataSource,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DataResult<(PathBuf, usize)> {
        let bars = source.fetch_daily_bars(ticker, start, end)?;
        let path = self.path_for(ticker);
        save_bars_csv(&bars, &path)?;
        Ok((path, bars.len()))
    }
}

impl MarketDataSource for CsvDataSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch_daily_bars(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DataResult<Vec<Bar>> {
        let path = self.path_for(ticker);
        let mut bars = load_csv(&path)?;
        retain_range(&mut bars, start, end);

        if bars.is_empty() {
            return Err(DataError::Empty {
                ticker: ticker.clone(),
                start,
                end,
            });
        }

        info!("Loaded {} bars for {} from {}", bars.len(), ticker, path.display());
        Ok(bars)
    }
}

// =============================================================================
// Yahoo Finance Data Fetcher
// =============================================================================

#[derive(Debug, serde::Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, serde::Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, serde::Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, serde::Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, serde::Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: Option<i64>,
}

#[derive(Debug, serde::Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

fn value_at(column: &[Option<f64>], i: usize) -> Option<f64> {
    column.get(i).copied().flatten()
}

/// Turn a chart API payload into bars dated in the exchange's local time
fn parse_chart(body: &str) -> DataResult<Vec<Bar>> {
    let response: ChartResponse =
        serde_json::from_str(body).map_err(|e| DataError::Parse(e.to_string()))?;

    if let Some(error) = response.chart.error {
        return Err(DataError::Api(format!(
            "{} - {}",
            error.code, error.description
        )));
    }

    let Some(data) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };

    let offset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();

    let mut bars = Vec::with_capacity(data.timestamp.len());
    for (i, &ts) in data.timestamp.iter().enumerate() {
        let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = (
            value_at(&quote.open, i),
            value_at(&quote.high, i),
            value_at(&quote.low, i),
            value_at(&quote.close, i),
            value_at(&quote.volume, i),
        ) else {
            debug!("Skipping incomplete row at timestamp {}", ts);
            continue;
        };

        let Some(date) = DateTime::from_timestamp(ts + offset, 0).map(|dt| dt.date_naive()) else {
            warn!("Skipping row with out-of-range timestamp {}", ts);
            continue;
        };

        match Bar::new(date, open, high, low, close, volume) {
            Ok(bar) => bars.push(bar),
            Err(e) => warn!("Skipping invalid bar on {}: {}", date, e),
        }
    }

    normalize_series(&mut bars);
    Ok(bars)
}

/// Fetch daily bars from the Yahoo Finance chart API
pub struct YahooDataFetcher {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooDataFetcher {
    pub fn new(timeout: StdDuration) -> DataResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(YAHOO_USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: YAHOO_CHART_URL.to_string(),
        })
    }

    /// Point the fetcher at a different chart endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Chart URL covering `start..=end`; `period2` is exclusive so it points at the next midnight
    pub fn chart_url(&self, ticker: &Ticker, start: NaiveDate, end: NaiveDate) -> String {
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = (end + Duration::days(1))
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp();

        format!(
            "{}/{}?interval=1d&period1={}&period2={}&events=history",
            self.base_url,
            ticker.as_str(),
            period1,
            period2
        )
    }

    /// Fetch a ticker's history and store it as `{data_dir}/{TICKER}.csv`
    ///
    /// Returns the written path and the number of bars in it.
    pub fn download(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
        data_dir: impl AsRef<Path>,
    ) -> DataResult<(PathBuf, usize)> {
        CsvDataSource::new(data_dir).store_from(self, ticker, start, end)
    }
}

impl MarketDataSource for YahooDataFetcher {
    fn name(&self) -> &str {
        "yahoo"
    }

    fn fetch_daily_bars(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DataResult<Vec<Bar>> {
        let url = self.chart_url(ticker, start, end);
        debug!("Fetching {}", url);

        let response = self.client.get(&url).send()?;
        let status = response.status();
        let body = response.text()?;

        let mut bars = match parse_chart(&body) {
            Ok(bars) => bars,
            Err(DataError::Parse(_)) if !status.is_success() => {
                return Err(DataError::Api(format!("HTTP {}", status)));
            }
            Err(e) => return Err(e),
        };
        retain_range(&mut bars, start, end);

        if bars.is_empty() {
            return Err(DataError::Empty {
                ticker: ticker.clone(),
                start,
                end,
            });
        }

        info!("Fetched {} daily bars for {}", bars.len(), ticker);
        Ok(bars)
    }
}

// =============================================================================
// Data Validation
// =============================================================================

/// Validate bar data for consistency
pub fn validate_series(bars: &[Bar]) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if bars.is_empty() {
        errors.push("No bars provided".to_string());
        return ValidationResult { errors, warnings };
    }

    for (i, bar) in bars.iter().enumerate() {
        if let Err(e) = bar.validate() {
            errors.push(format!("Bar {} ({}): {}", i, bar.date, e));
        }
    }

    for (i, (prev, next)) in bars.iter().tuple_windows().enumerate() {
        if next.date <= prev.date {
            warnings.push(format!(
                "Bar {} ({}): not after previous bar ({})",
                i + 1,
                next.date,
                prev.date
            ));
        }
    }

    ValidationResult { errors, warnings }
}

/// Result of data validation
#[derive(Debug)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
