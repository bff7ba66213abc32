//! Breakout Analyzer
//!
//! Detects high-volume price breakouts in daily equity bars and measures the
//! return over a fixed holding period after each one.

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod indicators;
pub mod report;
pub mod types;

pub use analysis::{analyze, AnalysisReport, BreakoutAnalyzer, EnrichedBar};
pub use config::Config;
pub use data::{CsvDataSource, MarketDataSource, YahooDataFetcher};
pub use error::{AnalysisError, DataError};
pub use report::BreakoutSummary;
pub use types::*;
