//! Simple and exponential moving averages over bar closes.
//!
//! Both return the latest close when fewer than `period` bars are available,
//! so comparisons against them stay defined during warm-up.
//!
//! EMA: k = 2/(n+1), seeded with the SMA of the first n closes, then
//! EMA[i] = C[i]*k + EMA[i-1]*(1-k).

use crate::domain::indicator::last_close;
use crate::domain::ohlcv::Bar;

pub fn sma(bars: &[Bar], period: usize) -> f64 {
    if period == 0 || bars.len() < period {
        return last_close(bars);
    }
    let window = &bars[bars.len() - period..];
    window.iter().map(|b| b.close).sum::<f64>() / period as f64
}

pub fn ema(bars: &[Bar], period: usize) -> f64 {
    if period == 0 || bars.len() < period {
        return last_close(bars);
    }
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    ema_of_values(&closes, period)
}

/// EMA recurrence over plain values. Fewer values than `period` yields the
/// last value (0.0 when empty).
pub fn ema_of_values(values: &[f64], period: usize) -> f64 {
    if period == 0 || values.len() < period {
        return values.last().copied().unwrap_or(0.0);
    }
    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = values[..period].iter().sum::<f64>() / period as f64;
    for value in &values[period..] {
        ema = value * k + ema * (1.0 - k);
    }
    ema
}
