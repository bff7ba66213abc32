//! Core data types used across the breakout analyzer

use chrono::NaiveDate;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for bar data
#[derive(Debug, Error, PartialEq)]
pub enum BarValidationError {
    #[error("high ({high}) must be >= low ({low})")]
    HighLessThanLow { high: f64, low: f64 },

    #[error("volume ({0}) must be >= 0")]
    NegativeVolume(f64),

    #[error("prices must be positive: open={open}, high={high}, low={low}, close={close}")]
    NonPositivePrice {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },

    #[error("non-finite value in bar dated {0}")]
    NonFinite(NaiveDate),
}

/// One trading day of OHLCV data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Create a new bar with validation
    pub fn new(
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, BarValidationError> {
        let bar = Self::new_unchecked(date, open, high, low, close, volume);
        bar.validate()?;
        Ok(bar)
    }

    /// Create a bar without validation (synthetic series, trusted sources)
    pub fn new_unchecked(
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn validate(&self) -> Result<(), BarValidationError> {
        let fields = [self.open, self.high, self.low, self.close, self.volume];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(BarValidationError::NonFinite(self.date));
        }

        if self.open <= 0.0 || self.high <= 0.0 || self.low <= 0.0 || self.close <= 0.0 {
            return Err(BarValidationError::NonPositivePrice {
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }

        if self.high < self.low {
            return Err(BarValidationError::HighLessThanLow {
                high: self.high,
                low: self.low,
            });
        }

        if self.volume < 0.0 {
            return Err(BarValidationError::NegativeVolume(self.volume));
        }

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Equity ticker symbol, normalized to upper case
///
/// Backed by `Arc<str>` since tickers are cloned into every report row of a scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticker(#[serde(with = "arc_str_serde")] std::sync::Arc<str>);

mod arc_str_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::sync::Arc;

    pub fn serialize<S>(value: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Arc<str>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Arc::from(s.trim().to_uppercase().as_str()))
    }
}

impl Ticker {
    pub fn new(s: impl AsRef<str>) -> Self {
        Ticker(std::sync::Arc::from(s.as_ref().trim().to_uppercase().as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Numeric parameters of a breakout run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakoutThresholds {
    /// Minimum volume excess over the 20-day average, in percent
    pub volume_threshold_pct: f64,
    /// Minimum close-to-close gain, in percent
    pub price_threshold_pct: f64,
    /// Trading days between entry and exit
    pub holding_period: usize,
}

impl Default for BreakoutThresholds {
    fn default() -> Self {
        Self {
            volume_threshold_pct: 200.0,
            price_threshold_pct: 2.0,
            holding_period: 10,
        }
    }
}

/// Request validation failures, raised before any data is fetched
#[derive(Debug, Error, PartialEq)]
pub enum RequestValidationError {
    #[error("ticker must not be empty")]
    EmptyTicker,

    #[error("end date ({end}) must not be before start date ({start})")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },

    #[error("volume threshold ({0}%) must be a finite value >= 0")]
    InvalidVolumeThreshold(f64),

    #[error("price threshold ({0}%) must be finite")]
    InvalidPriceThreshold(f64),

    #[error("holding period must be at least 1 trading day")]
    ZeroHoldingPeriod,
}

/// Parameters of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub ticker: Ticker,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(flatten)]
    pub thresholds: BreakoutThresholds,
}

impl AnalysisRequest {
    pub fn new(
        ticker: impl AsRef<str>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        thresholds: BreakoutThresholds,
    ) -> Self {
        Self {
            ticker: Ticker::new(ticker),
            start_date,
            end_date,
            thresholds,
        }
    }

    pub fn validate(&self) -> Result<(), RequestValidationError> {
        if self.ticker.is_empty() {
            return Err(RequestValidationError::EmptyTicker);
        }

        if self.end_date < self.start_date {
            return Err(RequestValidationError::InvertedDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }

        let volume = self.thresholds.volume_threshold_pct;
        if !volume.is_finite() || volume < 0.0 {
            return Err(RequestValidationError::InvalidVolumeThreshold(volume));
        }

        let price = self.thresholds.price_threshold_pct;
        if !price.is_finite() {
            return Err(RequestValidationError::InvalidPriceThreshold(price));
        }

        if self.thresholds.holding_period == 0 {
            return Err(RequestValidationError::ZeroHoldingPeriod);
        }

        Ok(())
    }
}

/// One detected breakout and its outcome after the holding period
///
/// Prices and percentages are rounded to two decimals, volumes truncated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakoutEvent {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Exit_Date")]
    pub exit_date: NaiveDate,
    #[serde(rename = "Entry_Price")]
    pub entry_price: f64,
    #[serde(rename = "Exit_Price")]
    pub exit_price: f64,
    #[serde(rename = "Return")]
    pub holding_return_pct: f64,
    #[serde(rename = "Volume")]
    pub volume: u64,
    #[serde(rename = "Avg_Volume")]
    pub avg_volume: u64,
    #[serde(rename = "Volume_Increase")]
    pub volume_increase_pct: f64,
    #[serde(rename = "Daily_Price_Change")]
    pub daily_price_change_pct: f64,
}

impl BreakoutEvent {
    pub fn is_win(&self) -> bool {
        self.holding_return_pct > 0.0
    }
}

/// Round to `dp` decimal places using decimal arithmetic
pub fn round_dp(value: f64, dp: u32) -> f64 {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(dp))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

/// Truncate a non-negative count to an integer
pub fn truncate_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.trunc() as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_bar_validation() {
        let ok = Bar::new(date(2024, 1, 2), 100.0, 105.0, 95.0, 102.0, 1000.0);
        assert!(ok.is_ok());

        let bad = Bar::new(date(2024, 1, 2), 100.0, 90.0, 95.0, 92.0, 1000.0);
        assert_eq!(
            bad.unwrap_err(),
            BarValidationError::HighLessThanLow {
                high: 90.0,
                low: 95.0
            }
        );

        let zero_close = Bar::new_unchecked(date(2024, 1, 2), 1.0, 1.0, 1.0, 0.0, 10.0);
        assert!(!zero_close.is_valid());

        let neg_volume = Bar::new_unchecked(date(2024, 1, 2), 1.0, 1.0, 1.0, 1.0, -1.0);
        assert_eq!(
            neg_volume.validate(),
            Err(BarValidationError::NegativeVolume(-1.0))
        );
    }

    #[test]
    fn test_ticker_normalization() {
        let ticker = Ticker::new(" aapl ");
        assert_eq!(ticker.as_str(), "AAPL");
        assert_eq!(ticker.to_string(), "AAPL");
        assert!(Ticker::new("   ").is_empty());
    }

    #[test]
    fn test_request_validation() {
        let good = AnalysisRequest::new(
            "MSFT",
            date(2024, 1, 1),
            date(2024, 6, 1),
            BreakoutThresholds::default(),
        );
        assert!(good.validate().is_ok());

        let mut req = good.clone();
        req.ticker = Ticker::new("");
        assert_eq!(req.validate(), Err(RequestValidationError::EmptyTicker));

        let mut req = good.clone();
        req.end_date = date(2023, 12, 31);
        assert!(matches!(
            req.validate(),
            Err(RequestValidationError::InvertedDateRange { .. })
        ));

        let mut req = good.clone();
        req.thresholds.volume_threshold_pct = -1.0;
        assert!(matches!(
            req.validate(),
            Err(RequestValidationError::InvalidVolumeThreshold(_))
        ));

        let mut req = good.clone();
        req.thresholds.price_threshold_pct = f64::NAN;
        assert!(matches!(
            req.validate(),
            Err(RequestValidationError::InvalidPriceThreshold(_))
        ));

        let mut req = good;
        req.thresholds.holding_period = 0;
        assert_eq!(req.validate(), Err(RequestValidationError::ZeroHoldingPeriod));
    }

    #[test]
    fn test_negative_price_threshold_is_allowed() {
        let req = AnalysisRequest::new(
            "SPY",
            date(2024, 1, 1),
            date(2024, 1, 1),
            BreakoutThresholds {
                price_threshold_pct: -3.5,
                ..Default::default()
            },
        );
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_rounding_helpers() {
        assert_eq!(round_dp(5.000000000000001, 2), 5.0);
        assert_eq!(round_dp(-1.23456, 2), -1.23);
        assert_eq!(round_dp(1_150_000.0, 2), 1_150_000.0);
        assert_eq!(truncate_count(1_149_999.9), 1_149_999);
        assert_eq!(truncate_count(f64::NAN), 0);
    }
}
