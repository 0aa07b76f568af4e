//! Stochastic oscillator.
//!
//! Raw %K = (close - lowest low) / (highest high - lowest low) * 100 over
//! `period` bars. %K is smoothed by `smooth_k` repeated 3-bar simple-average
//! passes, and %D is the mean of the last `smooth_d` smoothed %K values.
//! Not enough history reads {50, 50}.

use crate::domain::ohlcv::Bar;

const SMOOTHING_WINDOW: usize = 3;
const NEUTRAL: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stochastic {
    pub k: f64,
    pub d: f64,
}

impl Stochastic {
    pub const NEUTRAL: Stochastic = Stochastic {
        k: NEUTRAL,
        d: NEUTRAL,
    };
}

/// Bars needed before the oscillator leaves its neutral fallback.
pub fn required_bars(period: usize, smooth_k: usize, smooth_d: usize) -> usize {
    period + (SMOOTHING_WINDOW - 1) * smooth_k + smooth_d.max(1) - 1
}

pub fn stochastic(bars: &[Bar], period: usize, smooth_k: usize, smooth_d: usize) -> Stochastic {
    if period == 0 || bars.len() < required_bars(period, smooth_k, smooth_d) {
        return Stochastic::NEUTRAL;
    }

    let raw_count = (SMOOTHING_WINDOW - 1) * smooth_k + smooth_d.max(1);
    let first_end = bars.len() - raw_count;
    let mut k_values: Vec<f64> = (first_end..bars.len())
        .map(|end| raw_k(&bars[end + 1 - period..=end]))
        .collect();

    for _ in 0..smooth_k {
        k_values = k_values
            .windows(SMOOTHING_WINDOW)
            .map(|w| w.iter().sum::<f64>() / SMOOTHING_WINDOW as f64)
            .collect();
    }

    let k = k_values.last().copied().unwrap_or(NEUTRAL);
    let tail = &k_values[k_values.len().saturating_sub(smooth_d.max(1))..];
    let d = tail.iter().sum::<f64>() / tail.len() as f64;
    Stochastic { k, d }
}

fn raw_k(window: &[Bar]) -> f64 {
    let highest = window
        .iter()
        .map(|b| b.high)
        .fold(f64::NEG_INFINITY, f64::max);
    let lowest = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let range = highest - lowest;
    if range == 0.0 {
        return NEUTRAL;
    }
    let close = window[window.len() - 1].close;
    (close - lowest) / range * 100.0
}
