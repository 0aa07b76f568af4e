//! Average True Range and the volatility percentage derived from it.

use crate::domain::indicator::last_close;
use crate::domain::ohlcv::Bar;

/// True ranges for bars[1..], each against the previous close.
pub(crate) fn true_ranges(bars: &[Bar]) -> Vec<f64> {
    bars.windows(2)
        .map(|pair| pair[1].true_range(pair[0].close))
        .collect()
}

/// Wilder smoothing: seed with the mean of the first `period` values, then
/// avg = (avg * (period-1) + value) / period. Caller guarantees
/// `values.len() >= period > 0`.
pub(crate) fn wilder(values: &[f64], period: usize) -> f64 {
    let mut avg = values[..period].iter().sum::<f64>() / period as f64;
    for value in &values[period..] {
        avg = (avg * (period - 1) as f64 + value) / period as f64;
    }
    avg
}

/// ATR over the causal history. Fewer than `period + 1` bars reads 0.
pub fn atr(bars: &[Bar], period: usize) -> f64 {
    if period == 0 || bars.len() < period + 1 {
        return 0.0;
    }
    wilder(&true_ranges(bars), period)
}

/// ATR as a percentage of the latest close.
pub fn volatility_pct(bars: &[Bar], period: usize) -> f64 {
    let close = last_close(bars);
    if close == 0.0 {
        return 0.0;
    }
    atr(bars, period) / close * 100.0
}
