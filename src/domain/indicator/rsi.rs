//! RSI (Relative Strength Index) with Wilder's smoothing.
//!
//! - First average: simple mean of gains/losses over the first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! RSI = 100 - (100 / (1 + avg_gain / avg_loss)), 100 when avg_loss == 0.
//! Fewer than n+1 bars, or a window with no movement at all, reads 50.

use crate::domain::ohlcv::Bar;

pub const NEUTRAL_RSI: f64 = 50.0;

pub fn rsi(bars: &[Bar], period: usize) -> f64 {
    if period == 0 || bars.len() < period + 1 {
        return NEUTRAL_RSI;
    }

    let mut gains: Vec<f64> = Vec::with_capacity(bars.len() - 1);
    let mut losses: Vec<f64> = Vec::with_capacity(bars.len() - 1);
    for pair in bars.windows(2) {
        let change = pair[1].close - pair[0].close;
        gains.push(if change > 0.0 { change } else { 0.0 });
        losses.push(if change < 0.0 { -change } else { 0.0 });
    }

    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;

    for i in period..gains.len() {
        avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
    }

    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            return NEUTRAL_RSI;
        }
        return 100.0;
    }
    100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::closes_to_bars;

    #[test]
    fn rsi_insufficient_data_is_neutral() {
        assert_eq!(rsi(&[], 14), NEUTRAL_RSI);
        let bars = closes_to_bars(&[100.0; 14]);
        assert_eq!(rsi(&bars, 14), NEUTRAL_RSI);
    }

    #[test]
    fn rsi_all_gains_is_100() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let bars = closes_to_bars(&closes);
        assert!((rsi(&bars, 14) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let bars = closes_to_bars(&closes);
        assert!(rsi(&bars, 14).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_flat_market_is_neutral() {
        let bars = closes_to_bars(&[100.0; 30]);
        assert_eq!(rsi(&bars, 14), NEUTRAL_RSI);
    }

    #[test]
    fn rsi_wilder_smoothing_step() {
        // period 2: changes +2, -1, +1
        let bars = closes_to_bars(&[10.0, 12.0, 11.0, 12.0]);
        let avg_gain = ((2.0 + 0.0) / 2.0 * 1.0 + 1.0) / 2.0;
        let avg_loss = ((0.0 + 1.0) / 2.0 * 1.0 + 0.0) / 2.0;
        let expected = 100.0 - 100.0 / (1.0 + avg_gain / avg_loss);
        assert!((rsi(&bars, 2) - expected).abs() < 1e-12);
    }

    #[test]
    fn rsi_known_series_is_bullish() {
        let bars = closes_to_bars(&[
            44.0, 44.25, 44.50, 43.75, 44.50, 44.25, 44.75, 45.25, 45.50, 45.25, 45.50, 46.0,
            46.25, 46.0, 46.50,
        ]);
        let value = rsi(&bars, 14);
        assert!(value > 50.0 && value < 100.0);
    }

    #[test]
    fn rsi_zero_period_is_neutral() {
        let bars = closes_to_bars(&[100.0, 101.0]);
        assert_eq!(rsi(&bars, 0), NEUTRAL_RSI);
    }
}
