//! Technical indicators
//!
//! Windowed statistics over daily series. Undefined values are `None`, never NaN.

/// Simple Moving Average over a window ending at (and including) each index
///
/// Keeps a running sum instead of re-summing every window. Windows whose mean
/// is zero are reported as `None` since nothing can be measured against them.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = Vec::with_capacity(values.len());

    if period == 0 {
        result.resize(values.len(), None);
        return result;
    }

    let mut sum = 0.0;
    for (i, &value) in values.iter().enumerate() {
        sum += value;
        if i >= period {
            sum -= values[i - period];
        }

        if i + 1 < period {
            result.push(None);
            continue;
        }

        let mean = sum / period as f64;
        if mean > 0.0 && mean.is_finite() {
            result.push(Some(mean));
        } else {
            result.push(None);
        }
    }

    result
}

/// Percentage change versus the previous value
///
/// First element and any element following a zero value are `None`.
pub fn pct_change(values: &[f64]) -> Vec<Option<f64>> {
    let mut result = Vec::with_capacity(values.len());

    for i in 0..values.len() {
        if i == 0 {
            result.push(None);
            continue;
        }

        let prev = values[i - 1];
        if prev == 0.0 {
            result.push(None);
            continue;
        }

        let change = (values[i] - prev) / prev * 100.0;
        result.push(change.is_finite().then_some(change));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_mean() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = rolling_mean(&values, 3);

        assert_eq!(result[0], None);
        assert_eq!(result[1], None);
        assert_eq!(result[2], Some(2.0));
        assert_eq!(result[3], Some(3.0));
        assert_eq!(result[4], Some(4.0));
    }

    #[test]
    fn test_rolling_mean_short_input() {
        let result = rolling_mean(&[10.0, 20.0], 20);
        assert_eq!(result, vec![None, None]);
    }

    #[test]
    fn test_rolling_mean_zero_window() {
        let values = vec![0.0, 0.0, 0.0, 6.0];
        let result = rolling_mean(&values, 3);

        assert_eq!(result[2], None);
        assert_eq!(result[3], Some(2.0));
    }

    #[test]
    fn test_rolling_mean_zero_period() {
        assert_eq!(rolling_mean(&[1.0, 2.0], 0), vec![None, None]);
    }

    #[test]
    fn test_pct_change() {
        let values = vec![100.0, 125.0, 100.0, 0.0, 50.0];
        let result = pct_change(&values);

        assert_eq!(result[0], None);
        assert_eq!(result[1], Some(25.0));
        assert_eq!(result[2], Some(-20.0));
        assert_eq!(result[3], Some(-100.0));
        assert_eq!(result[4], None);
    }
}
