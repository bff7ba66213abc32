//! Error types for data retrieval and analysis runs

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{RequestValidationError, Ticker};

/// Failures of a market data source
#[derive(Debug, Error)]
pub enum DataError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("market data API error: {0}")]
    Api(String),

    #[error("malformed market data: {0}")]
    Parse(String),

    #[error("data file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no bars returned for {ticker} between {start} and {end}")]
    Empty {
        ticker: Ticker,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
}

/// Run-level failures of a breakout analysis
///
/// Short histories and unresolved holding windows are not errors; they yield
/// an empty event list.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid analysis request: {0}")]
    InvalidRequest(#[from] RequestValidationError),

    #[error("market data unavailable for {ticker}")]
    DataUnavailable {
        ticker: Ticker,
        #[source]
        source: DataError,
    },
}

pub type DataResult<T> = Result<T, DataError>;
