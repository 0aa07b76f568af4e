//! Swing-point support and resistance.
//!
//! Bar i is a local low (support) when its low is strictly below the low of
//! every bar within `lookback` on both sides, and a local high (resistance)
//! symmetrically on highs. Bars closer than `lookback` to either end of the
//! history are never flagged.

use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelKind {
    Support,
    Resistance,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Level {
    pub index: usize,
    pub price: f64,
    pub kind: LevelKind,
}

fn has_full_neighbourhood(bars: &[Bar], i: usize, lookback: usize) -> bool {
    lookback > 0 && i >= lookback && i + lookback < bars.len()
}

pub fn is_local_low(bars: &[Bar], i: usize, lookback: usize) -> bool {
    if !has_full_neighbourhood(bars, i, lookback) {
        return false;
    }
    let low = bars[i].low;
    (i - lookback..=i + lookback)
        .filter(|&j| j != i)
        .all(|j| low < bars[j].low)
}

pub fn is_local_high(bars: &[Bar], i: usize, lookback: usize) -> bool {
    if !has_full_neighbourhood(bars, i, lookback) {
        return false;
    }
    let high = bars[i].high;
    (i - lookback..=i + lookback)
        .filter(|&j| j != i)
        .all(|j| high > bars[j].high)
}

/// All swing levels in index order.
pub fn levels(bars: &[Bar], lookback: usize) -> Vec<Level> {
    let mut out = Vec::new();
    for i in 0..bars.len() {
        if is_local_low(bars, i, lookback) {
            out.push(Level {
                index: i,
                price: bars[i].low,
                kind: LevelKind::Support,
            });
        }
        if is_local_high(bars, i, lookback) {
            out.push(Level {
                index: i,
                price: bars[i].high,
                kind: LevelKind::Resistance,
            });
        }
    }
    out
}

/// Closest support at or below `price` and closest resistance at or above it.
pub fn nearest_levels(bars: &[Bar], lookback: usize, price: f64) -> (Option<f64>, Option<f64>) {
    let mut support: Option<f64> = None;
    let mut resistance: Option<f64> = None;
    for level in levels(bars, lookback) {
        match level.kind {
            LevelKind::Support if level.price <= price => {
                if support.is_none_or(|s| level.price > s) {
                    support = Some(level.price);
                }
            }
            LevelKind::Resistance if level.price >= price => {
                if resistance.is_none_or(|r| level.price < r) {
                    resistance = Some(level.price);
                }
            }
            _ => {}
        }
    }
    (support, resistance)
}
