//! Breakout detection and forward-return resolution
//!
//! A breakout is a day whose volume exceeds the trailing 20-day average by a
//! configured margin while the close-to-close gain exceeds a configured
//! percentage. Each breakout is resolved to the close `holding_period` trading
//! days later; breakouts too close to the end of the series are dropped.
//!
//! The 20-day baseline includes the breakout day's own volume, so a spike
//! inflates its own reference average.

use tracing::{debug, info};

use crate::data::MarketDataSource;
use crate::error::{AnalysisError, DataError};
use crate::indicators::{pct_change, rolling_mean};
use crate::report::BreakoutSummary;
use crate::types::{
    round_dp, truncate_count, AnalysisRequest, Bar, BreakoutEvent, BreakoutThresholds,
};

/// Bars in the trailing volume baseline
pub const VOLUME_WINDOW: usize = 20;

/// A bar with its derived statistics
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedBar {
    pub bar: Bar,
    /// Mean volume of the 20 bars ending here, `None` before the window fills
    pub trailing_avg_volume: Option<f64>,
    /// Close-to-close change in percent, `None` for the first bar
    pub daily_return_pct: Option<f64>,
}

/// Derive trailing average volume and daily return for every bar
///
/// Returns an empty series when there are fewer than [`VOLUME_WINDOW`] bars,
/// since no baseline can be formed.
pub fn enrich(bars: &[Bar]) -> Vec<EnrichedBar> {
    if bars.len() < VOLUME_WINDOW {
        debug!(
            "Insufficient history: {} bars, need {}",
            bars.len(),
            VOLUME_WINDOW
        );
        return Vec::new();
    }

    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let avg_volume = rolling_mean(&volumes, VOLUME_WINDOW);
    let returns = pct_change(&closes);

    bars.iter()
        .zip(avg_volume)
        .zip(returns)
        .map(|((bar, trailing_avg_volume), daily_return_pct)| EnrichedBar {
            bar: bar.clone(),
            trailing_avg_volume,
            daily_return_pct,
        })
        .collect()
}

/// Scans enriched series for breakouts and measures their outcome
#[derive(Debug, Clone)]
pub struct BreakoutAnalyzer {
    thresholds: BreakoutThresholds,
}

impl BreakoutAnalyzer {
    pub fn new(thresholds: BreakoutThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &BreakoutThresholds {
        &self.thresholds
    }

    /// Both conditions are strict: equality does not qualify
    pub fn is_breakout(&self, bar: &EnrichedBar) -> bool {
        let (Some(avg_volume), Some(daily_return)) = (bar.trailing_avg_volume, bar.daily_return_pct)
        else {
            return false;
        };

        let volume_floor = avg_volume * (1.0 + self.thresholds.volume_threshold_pct / 100.0);
        bar.bar.volume > volume_floor && daily_return > self.thresholds.price_threshold_pct
    }

    /// Indices of candidate breakout days, in chronological order
    pub fn detect(&self, enriched: &[EnrichedBar]) -> Vec<usize> {
        enriched
            .iter()
            .enumerate()
            .filter(|(_, bar)| self.is_breakout(bar))
            .map(|(i, _)| i)
            .collect()
    }

    /// Resolve a candidate to an event, `None` if the holding window runs past the series
    pub fn resolve(&self, enriched: &[EnrichedBar], index: usize) -> Option<BreakoutEvent> {
        let entry = enriched.get(index)?;
        let exit_index = index.checked_add(self.thresholds.holding_period);
        let Some(exit) = exit_index.and_then(|j| enriched.get(j)) else {
            debug!(
                "Dropping breakout on {}: fewer than {} bars remain",
                entry.bar.date, self.thresholds.holding_period
            );
            return None;
        };

        let avg_volume = entry.trailing_avg_volume?;
        let daily_return = entry.daily_return_pct?;

        let entry_price = entry.bar.close;
        let exit_price = exit.bar.close;
        let holding_return = (exit_price - entry_price) / entry_price * 100.0;
        let volume_increase = (entry.bar.volume / avg_volume - 1.0) * 100.0;

        debug!(
            "Breakout on {}: volume {:.0} vs avg {:.0}, return {:.2}%, exit {} at {:.2}",
            entry.bar.date, entry.bar.volume, avg_volume, daily_return, exit.bar.date, exit_price
        );

        Some(BreakoutEvent {
            date: entry.bar.date,
            exit_date: exit.bar.date,
            entry_price: round_dp(entry_price, 2),
            exit_price: round_dp(exit_price, 2),
            holding_return_pct: round_dp(holding_return, 2),
            volume: truncate_count(entry.bar.volume),
            avg_volume: truncate_count(avg_volume),
            volume_increase_pct: round_dp(volume_increase, 2),
            daily_price_change_pct: round_dp(daily_return, 2),
        })
    }

    /// Full pipeline over an already fetched series
    pub fn analyze_series(&self, bars: &[Bar]) -> Vec<BreakoutEvent> {
        let enriched = enrich(bars);
        let candidates = self.detect(&enriched);

        let events: Vec<BreakoutEvent> = candidates
            .iter()
            .filter_map(|&i| self.resolve(&enriched, i))
            .collect();

        debug!(
            "{} bars, {} candidates, {} resolved events",
            bars.len(),
            candidates.len(),
            events.len()
        );

        events
    }
}

/// Result of one analysis run
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub request: AnalysisRequest,
    pub bars_analyzed: usize,
    pub events: Vec<BreakoutEvent>,
}

impl AnalysisReport {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Aggregate statistics, `None` when no breakouts were found
    pub fn summary(&self) -> Option<BreakoutSummary> {
        BreakoutSummary::from_events(&self.events)
    }
}

/// Validate the request, fetch its bars and run the breakout analysis
///
/// Only request validation and data retrieval can fail; every other
/// condition degrades to an empty event list.
pub fn analyze(
    source: &dyn MarketDataSource,
    request: &AnalysisRequest,
) -> Result<AnalysisReport, AnalysisError> {
    request.validate()?;

    info!(
        "Analyzing {} from {} to {} via {}",
        request.ticker,
        request.start_date,
        request.end_date,
        source.name()
    );

    let bars = source
        .fetch_daily_bars(&request.ticker, request.start_date, request.end_date)
        .map_err(|source| AnalysisError::DataUnavailable {
            ticker: request.ticker.clone(),
            source,
        })?;

    if bars.is_empty() {
        return Err(AnalysisError::DataUnavailable {
            ticker: request.ticker.clone(),
            source: DataError::Empty {
                ticker: request.ticker.clone(),
                start: request.start_date,
                end: request.end_date,
            },
        });
    }

    let analyzer = BreakoutAnalyzer::new(request.thresholds);
    let events = analyzer.analyze_series(&bars);

    info!(
        "Found {} breakouts for {} in {} bars",
        events.len(),
        request.ticker,
        bars.len()
    );

    Ok(AnalysisReport {
        request: request.clone(),
        bars_analyzed: bars.len(),
        events,
    })
}
