//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow), both over the full causal history.
//! Signal Line = EMA(signal) over a synthetic history holding `signal` copies
//! of the current line value, not a running EMA of past line values. The
//! strategy thresholds were tuned against this form, so it stays as is.
//! Histogram = MACD Line - Signal Line

use crate::domain::indicator::moving_average::{ema, ema_of_values};
use crate::domain::ohlcv::Bar;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Macd {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

pub fn macd(bars: &[Bar], fast: usize, slow: usize, signal_period: usize) -> Macd {
    let line = ema(bars, fast) - ema(bars, slow);
    let synthetic = vec![line; signal_period];
    let signal = ema_of_values(&synthetic, signal_period);
    Macd {
        line,
        signal,
        histogram: line - signal,
    }
}
