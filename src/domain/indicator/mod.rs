//! Technical indicator implementations.
//!
//! Every function takes the causal bar history available "as of now" and
//! returns the value for its last bar. Nothing is cached between calls; the
//! decision engine recomputes each indicator from scratch on every step.
//! Warm-up shortfalls return documented neutral values instead of failing.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod macd;
pub mod moving_average;
pub mod rsi;
pub mod snapshot;
pub mod stochastic;
pub mod support_resistance;

pub use adx::adx;
pub use atr::{atr, volatility_pct};
pub use bollinger::{bollinger, BollingerBands};
pub use macd::{macd, Macd};
pub use moving_average::{ema, ema_of_values, sma};
pub use rsi::rsi;
pub use snapshot::IndicatorSnapshot;
pub use stochastic::{stochastic, Stochastic};

use crate::domain::ohlcv::Bar;

/// Close of the last bar, 0.0 for an empty history.
pub fn last_close(bars: &[Bar]) -> f64 {
    bars.last().map(|b| b.close).unwrap_or(0.0)
}


#[cfg(test)]
mod tests {
    use super::test_bars::closes_to_bars;
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn last_close_of_empty_is_zero() {
        assert_eq!(last_close(&[]), 0.0);
        assert_eq!(last_close(&closes_to_bars(&[1.0, 2.0])), 2.0);
    }

    proptest! {
        #[test]
        fn indicators_are_repeatable(closes in prop::collection::vec(1.0f64..1000.0, 0..60)) {
            let bars = closes_to_bars(&closes);
            prop_assert_eq!(rsi(&bars, 14), rsi(&bars, 14));
            prop_assert_eq!(ema(&bars, 9), ema(&bars, 9));
            prop_assert_eq!(atr(&bars, 14), atr(&bars, 14));
            prop_assert_eq!(adx(&bars, 14), adx(&bars, 14));
            prop_assert_eq!(macd(&bars, 12, 26, 9), macd(&bars, 12, 26, 9));
            prop_assert_eq!(stochastic(&bars, 14, 3, 3), stochastic(&bars, 14, 3, 3));
        }

        #[test]
        fn rsi_stays_in_range(closes in prop::collection::vec(1.0f64..1000.0, 0..60)) {
            let value = rsi(&closes_to_bars(&closes), 14);
            prop_assert!((0.0..=100.0).contains(&value));
        }

        #[test]
        fn short_histories_use_fallbacks(closes in prop::collection::vec(1.0f64..1000.0, 1..14)) {
            let bars = closes_to_bars(&closes);
            prop_assert_eq!(rsi(&bars, 14), 50.0);
            prop_assert_eq!(atr(&bars, 14), 0.0);
            prop_assert_eq!(adx(&bars, 14), None);
            prop_assert_eq!(stochastic(&bars, 14, 3, 3), Stochastic::NEUTRAL);
            prop_assert_eq!(sma(&bars, 20), last_close(&bars));
            prop_assert_eq!(ema(&bars, 20), last_close(&bars));
        }
    }
}
