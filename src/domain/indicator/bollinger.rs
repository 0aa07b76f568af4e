//! Bollinger Bands.
//!
//! - Middle: SMA over n closes
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the population standard deviation (divides by N, not N-1).
//! Fewer than n bars puts all three bands on the latest close.

use crate::domain::indicator::last_close;
use crate::domain::ohlcv::Bar;

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BollingerBands {
    /// Band width relative to the middle band, in percent.
    pub fn width_pct(&self) -> f64 {
        if self.middle == 0.0 {
            0.0
        } else {
            (self.upper - self.lower) / self.middle * 100.0
        }
    }
}

pub fn bollinger(bars: &[Bar], period: usize, multiplier: f64) -> BollingerBands {
    if period == 0 || bars.len() < period {
        let close = last_close(bars);
        return BollingerBands {
            upper: close,
            middle: close,
            lower: close,
        };
    }

    let window = &bars[bars.len() - period..];
    let middle = window.iter().map(|b| b.close).sum::<f64>() / period as f64;
    let stddev = population_stddev(window, middle);

    BollingerBands {
        upper: middle + multiplier * stddev,
        middle,
        lower: middle - multiplier * stddev,
    }
}

fn population_stddev(window: &[Bar], mean: f64) -> f64 {
    let variance = window
        .iter()
        .map(|b| {
            let diff = b.close - mean;
            diff * diff
        })
        .sum::<f64>()
        / window.len() as f64;
    variance.sqrt()
}
