//! Average Directional Index.
//!
//! +DM/-DM/TR are Wilder-smoothed the same way as ATR, one DX value is
//! produced per bar once the smoothing is seeded, and ADX is the Wilder
//! average of the DX series. Fewer than period+2 bars has no opinion and
//! returns `None`, which callers must not read as "zero trend strength".

use crate::domain::ohlcv::Bar;

pub fn adx(bars: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period + 2 {
        return None;
    }

    let mut tr = Vec::with_capacity(bars.len() - 1);
    let mut plus_dm = Vec::with_capacity(bars.len() - 1);
    let mut minus_dm = Vec::with_capacity(bars.len() - 1);

    for pair in bars.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        let up_move = curr.high - prev.high;
        let down_move = prev.low - curr.low;
        plus_dm.push(if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        });
        minus_dm.push(if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        });
        tr.push(curr.true_range(prev.close));
    }

    let n = period as f64;
    let mut s_tr = tr[..period].iter().sum::<f64>() / n;
    let mut s_plus = plus_dm[..period].iter().sum::<f64>() / n;
    let mut s_minus = minus_dm[..period].iter().sum::<f64>() / n;

    let mut dx_values = Vec::with_capacity(tr.len() - period + 1);
    dx_values.push(dx(s_tr, s_plus, s_minus));

    for i in period..tr.len() {
        s_tr = (s_tr * (n - 1.0) + tr[i]) / n;
        s_plus = (s_plus * (n - 1.0) + plus_dm[i]) / n;
        s_minus = (s_minus * (n - 1.0) + minus_dm[i]) / n;
        dx_values.push(dx(s_tr, s_plus, s_minus));
    }

    let seed_len = period.min(dx_values.len());
    let mut adx = dx_values[..seed_len].iter().sum::<f64>() / seed_len as f64;
    for value in &dx_values[seed_len..] {
        adx = (adx * (n - 1.0) + value) / n;
    }
    Some(adx)
}

fn dx(s_tr: f64, s_plus: f64, s_minus: f64) -> f64 {
    if s_tr == 0.0 {
        return 0.0;
    }
    let plus_di = 100.0 * s_plus / s_tr;
    let minus_di = 100.0 * s_minus / s_tr;
    let sum = plus_di + minus_di;
    if sum == 0.0 {
        0.0
    } else {
        100.0 * (plus_di - minus_di).abs() / sum
    }
}
