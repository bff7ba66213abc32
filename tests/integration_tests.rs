//! Integration tests for the breakout analyzer
//!
//! These tests drive the public API end to end with synthetic series and an
//! in-memory data source, so no network access is needed.

use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate};

use breakout_analyzer::analysis::{enrich, VOLUME_WINDOW};
use breakout_analyzer::data::{save_bars_csv, CsvDataSource, MarketDataSource};
use breakout_analyzer::error::DataResult;
use breakout_analyzer::report::write_events_csv;
use breakout_analyzer::{
    analyze, AnalysisError, AnalysisRequest, Bar, BreakoutAnalyzer, BreakoutThresholds, DataError,
    Ticker,
};

// =============================================================================
// Test Utilities
// =============================================================================

fn day(offset: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(offset as i64)
}

fn generate_bars(closes: &[f64], volumes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (&close, &volume))| {
            Bar::new_unchecked(day(i), close, close * 1.01, close * 0.99, close, volume)
        })
        .collect()
}

/// Constant close and volume
fn generate_flat_bars(count: usize) -> Vec<Bar> {
    generate_bars(&vec![100.0; count], &vec![1_000_000.0; count])
}

/// 25 flat bars with a 4x volume, +5% close spike on day 21 (index 20)
fn generate_spike_bars() -> Vec<Bar> {
    let mut closes = vec![100.0; 25];
    let mut volumes = vec![1_000_000.0; 25];
    closes[20] = 105.0;
    volumes[20] = 4_000_000.0;
    generate_bars(&closes, &volumes)
}

/// Alternating up/down closes with periodic volume bursts
fn generate_choppy_bars(count: usize) -> Vec<Bar> {
    let closes: Vec<f64> = (0..count)
        .map(|i| 100.0 + (i % 7) as f64 * 3.0 - (i % 3) as f64 * 2.0)
        .collect();
    let volumes: Vec<f64> = (0..count)
        .map(|i| if i % 9 == 0 { 5_000_000.0 } else { 900_000.0 + (i % 4) as f64 * 50_000.0 })
        .collect();
    generate_bars(&closes, &volumes)
}

fn thresholds(volume: f64, price: f64, holding: usize) -> BreakoutThresholds {
    BreakoutThresholds {
        volume_threshold_pct: volume,
        price_threshold_pct: price,
        holding_period: holding,
    }
}

fn request(ticker: &str, thresholds: BreakoutThresholds) -> AnalysisRequest {
    AnalysisRequest::new(ticker, day(0), day(365), thresholds)
}

/// In-memory source returning a fixed series, or a failure
struct MockSource {
    bars: Vec<Bar>,
    fail: bool,
}

impl MockSource {
    fn with_bars(bars: Vec<Bar>) -> Self {
        Self { bars, fail: false }
    }

    fn failing() -> Self {
        Self {
            bars: Vec::new(),
            fail: true,
        }
    }
}

impl MarketDataSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn fetch_daily_bars(
        &self,
        _ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DataResult<Vec<Bar>> {
        if self.fail {
            return Err(DataError::Api("connection reset".to_string()));
        }
        Ok(self
            .bars
            .iter()
            .filter(|b| b.date >= start && b.date <= end)
            .cloned()
            .collect())
    }
}

// =============================================================================
// Breakout Scenarios
// =============================================================================

#[test]
fn test_spike_scenario_single_event() {
    let bars = generate_spike_bars();
    let analyzer = BreakoutAnalyzer::new(thresholds(200.0, 2.0, 3));

    let enriched = enrich(&bars);
    assert_relative_eq!(enriched[20].trailing_avg_volume.unwrap(), 1_150_000.0);

    let events = analyzer.analyze_series(&bars);
    assert_eq!(events.len(), 1);

    let event = &events[0];
    assert_eq!(event.date, bars[20].date);
    assert_eq!(event.exit_date, bars[23].date);
    assert_eq!(event.entry_price, 105.0);
    assert_eq!(event.exit_price, bars[23].close);
    assert_eq!(event.volume, 4_000_000);
    assert_eq!(event.avg_volume, 1_150_000);
    assert_relative_eq!(event.daily_price_change_pct, 5.0);
    assert_relative_eq!(event.volume_increase_pct, 247.83);
    assert_relative_eq!(event.holding_return_pct, -4.76);
}

#[test]
fn test_spike_scenario_holding_past_end_is_dropped() {
    let bars = generate_spike_bars();
    let analyzer = BreakoutAnalyzer::new(thresholds(200.0, 2.0, 5));
    assert!(analyzer.analyze_series(&bars).is_empty());

    // exactly 4 bars remain after the spike
    let analyzer = BreakoutAnalyzer::new(thresholds(200.0, 2.0, 4));
    let events = analyzer.analyze_series(&bars);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].exit_date, bars[24].date);
}

#[test]
fn test_holding_period_at_usize_max_is_dropped() {
    let bars = generate_spike_bars();
    let req = request("SPKE", thresholds(200.0, 2.0, usize::MAX));
    assert!(req.validate().is_ok());

    let analyzer = BreakoutAnalyzer::new(req.thresholds);
    assert!(analyzer.analyze_series(&bars).is_empty());

    let report = analyze(&MockSource::with_bars(bars), &req).unwrap();
    assert_eq!(report.bars_analyzed, 25);
    assert!(report.is_empty());
}

#[test]
fn test_flat_series_never_breaks_out() {
    for count in [VOLUME_WINDOW, 21, 60, 250] {
        let bars = generate_flat_bars(count);
        for price in [0.0, 0.5, 2.0] {
            let analyzer = BreakoutAnalyzer::new(thresholds(0.0, price, 1));
            assert!(analyzer.analyze_series(&bars).is_empty());
        }
    }
}

#[test]
fn test_short_series_is_always_empty() {
    for count in 0..VOLUME_WINDOW {
        let closes: Vec<f64> = (0..count).map(|i| 100.0 * 1.5_f64.powi(i as i32)).collect();
        let volumes: Vec<f64> = (0..count).map(|i| 1000.0 * 10_f64.powi(i as i32)).collect();

        let bars = generate_bars(&closes, &volumes);
        let analyzer = BreakoutAnalyzer::new(thresholds(0.0, -100.0, 1));
        assert!(analyzer.analyze_series(&bars).is_empty(), "count {}", count);
    }
}

// =============================================================================
// Threshold Boundaries
// =============================================================================

#[test]
fn test_volume_exactly_at_threshold_does_not_qualify() {
    // avg = (19 * 1e6 + 19e6) / 20 = 1.9e6 and 1.9e6 * (1 + 900/100) = 19e6
    let mut closes = vec![100.0; 25];
    let mut volumes = vec![1_000_000.0; 25];
    closes[20] = 110.0;
    volumes[20] = 19_000_000.0;
    let bars = generate_bars(&closes, &volumes);

    let at_threshold = BreakoutAnalyzer::new(thresholds(900.0, 2.0, 1));
    assert!(at_threshold.analyze_series(&bars).is_empty());

    let below_threshold = BreakoutAnalyzer::new(thresholds(899.0, 2.0, 1));
    assert_eq!(below_threshold.analyze_series(&bars).len(), 1);
}

#[test]
fn test_return_exactly_at_threshold_does_not_qualify() {
    let mut closes = vec![100.0; 25];
    let mut volumes = vec![1_000_000.0; 25];
    closes[20] = 125.0;
    volumes[20] = 10_000_000.0;
    let bars = generate_bars(&closes, &volumes);

    let at_threshold = BreakoutAnalyzer::new(thresholds(100.0, 25.0, 1));
    assert!(at_threshold.analyze_series(&bars).is_empty());

    let below_threshold = BreakoutAnalyzer::new(thresholds(100.0, 24.99, 1));
    assert_eq!(below_threshold.analyze_series(&bars).len(), 1);
}

// =============================================================================
// Series Properties
// =============================================================================

#[test]
fn test_events_are_ordered_and_exits_in_bounds() {
    let bars = generate_choppy_bars(300);
    let holding = 7;
    let analyzer = BreakoutAnalyzer::new(thresholds(50.0, 0.5, holding));
    let events = analyzer.analyze_series(&bars);
    assert!(!events.is_empty());

    for pair in events.windows(2) {
        assert!(pair[0].date < pair[1].date);
    }

    for event in &events {
        let entry_idx = bars.iter().position(|b| b.date == event.date).unwrap();
        let exit_idx = entry_idx + holding;
        assert!(exit_idx < bars.len());
        assert_eq!(event.exit_date, bars[exit_idx].date);
        assert_relative_eq!(event.exit_price, bars[exit_idx].close, epsilon = 0.005);
    }
}

#[test]
fn test_analysis_is_idempotent() {
    let bars = generate_choppy_bars(200);
    let analyzer = BreakoutAnalyzer::new(thresholds(50.0, 0.5, 3));
    assert_eq!(analyzer.analyze_series(&bars), analyzer.analyze_series(&bars));
}

// =============================================================================
// Analysis Entry Point
// =============================================================================

#[test]
fn test_analyze_with_injected_source() {
    let source = MockSource::with_bars(generate_spike_bars());
    let report = analyze(&source, &request("spke", thresholds(200.0, 2.0, 3))).unwrap();

    assert_eq!(report.request.ticker.as_str(), "SPKE");
    assert_eq!(report.bars_analyzed, 25);
    assert_eq!(report.events.len(), 1);

    let summary = report.summary().unwrap();
    assert_eq!(summary.count, 1);
    assert_relative_eq!(summary.win_rate_pct, 0.0);
}

#[test]
fn test_analyze_insufficient_history_is_empty_not_error() {
    let source = MockSource::with_bars(generate_flat_bars(10));
    let report = analyze(&source, &request("FLAT", thresholds(0.0, -5.0, 1))).unwrap();
    assert!(report.is_empty());
    assert!(report.summary().is_none());
}

#[test]
fn test_analyze_fetch_failure_is_data_unavailable() {
    let source = MockSource::failing();
    let err = analyze(&source, &request("ERR", BreakoutThresholds::default())).unwrap_err();

    match err {
        AnalysisError::DataUnavailable { ticker, source } => {
            assert_eq!(ticker.as_str(), "ERR");
            assert!(matches!(source, DataError::Api(_)));
        }
        other => panic!("expected DataUnavailable, got {:?}", other),
    }
}

#[test]
fn test_analyze_no_rows_is_data_unavailable() {
    let source = MockSource::with_bars(Vec::new());
    let err = analyze(&source, &request("NONE", BreakoutThresholds::default())).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::DataUnavailable {
            source: DataError::Empty { .. },
            ..
        }
    ));
}

#[test]
fn test_analyze_rejects_invalid_request_before_fetching() {
    let source = MockSource::failing();
    let err = analyze(&source, &request("AAPL", thresholds(200.0, 2.0, 0))).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidRequest(_)));
}

// =============================================================================
// CSV Round Trip
// =============================================================================

#[test]
fn test_csv_source_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let source = CsvDataSource::new(dir.path());
    let ticker = Ticker::new("SPKE");

    save_bars_csv(&generate_spike_bars(), source.path_for(&ticker)).unwrap();

    let report = analyze(&source, &request("spke", thresholds(200.0, 2.0, 3))).unwrap();
    assert_eq!(report.events.len(), 1);
    assert_eq!(report.events[0].date, day(20));

    let mut buf = Vec::new();
    write_events_csv(&report.events, &mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(text.lines().nth(1).unwrap().starts_with("2024-01-21,2024-01-24,105.0,100.0,"));
}

#[test]
fn test_csv_source_restricts_date_range() {
    let dir = tempfile::tempdir().unwrap();
    let source = CsvDataSource::new(dir.path());
    let ticker = Ticker::new("SPKE");
    save_bars_csv(&generate_spike_bars(), source.path_for(&ticker)).unwrap();

    let bars = source.fetch_daily_bars(&ticker, day(1), day(22)).unwrap();
    assert_eq!(bars.len(), 22);
    assert_eq!(bars[0].date, day(1));
    assert_eq!(bars.last().unwrap().date, day(22));
}

#[test]
fn test_csv_source_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = CsvDataSource::new(dir.path());
    let err = analyze(&source, &request("MISSING", BreakoutThresholds::default())).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::DataUnavailable {
            source: DataError::NotFound(_),
            ..
        }
    ));
}
