//! Strategy configuration: every threshold the decision engine reads.
//!
//! A `StrategyConfig` is passed into each decision call. Percentages are in
//! percent units (0.1 means 0.1 %).

use crate::domain::indicator::bollinger;

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub name: String,

    // Indicator periods
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub sma_short: usize,
    pub sma_long: usize,
    pub rsi_period: usize,
    pub atr_period: usize,
    pub adx_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub stoch_period: usize,
    pub stoch_smooth_k: usize,
    pub stoch_smooth_d: usize,
    pub bollinger_period: usize,
    pub bollinger_multiplier: f64,
    pub sr_lookback: usize,
    pub warmup_bars: usize,

    // Entry filters
    pub min_volatility_pct: f64,
    pub low_volatility_pct: f64,
    pub weak_trend_adx: f64,
    pub strong_trend_adx: f64,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub stoch_oversold: f64,
    pub stoch_overbought: f64,

    // Exits
    pub profit_target_pct: f64,
    pub stop_loss_pct: f64,
    pub trailing_activation_pct: f64,
    pub trailing_offset_pct: f64,

    // Sizing
    pub risk_pct: f64,
    pub max_position_pct: f64,
    pub leverage: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            name: "Momentum scalper".into(),
            ema_fast: 9,
            ema_slow: 21,
            sma_short: 20,
            sma_long: 50,
            rsi_period: 14,
            atr_period: 14,
            adx_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            stoch_period: 14,
            stoch_smooth_k: 3,
            stoch_smooth_d: 3,
            bollinger_period: bollinger::DEFAULT_PERIOD,
            bollinger_multiplier: bollinger::DEFAULT_MULTIPLIER,
            sr_lookback: 3,
            warmup_bars: 26,
            min_volatility_pct: 0.02,
            low_volatility_pct: 0.05,
            weak_trend_adx: 20.0,
            strong_trend_adx: 25.0,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            stoch_oversold: 20.0,
            stoch_overbought: 80.0,
            profit_target_pct: 0.1,
            stop_loss_pct: 0.15,
            trailing_activation_pct: 0.05,
            trailing_offset_pct: 0.08,
            risk_pct: 1.0,
            max_position_pct: 50.0,
            leverage: 10.0,
        }
    }
}

impl StrategyConfig {
    pub fn stop_loss_price(&self, entry: f64, long: bool) -> f64 {
        if long {
            entry * (1.0 - self.stop_loss_pct / 100.0)
        } else {
            entry * (1.0 + self.stop_loss_pct / 100.0)
        }
    }

    pub fn take_profit_price(&self, entry: f64, long: bool) -> f64 {
        if long {
            entry * (1.0 + self.profit_target_pct / 100.0)
        } else {
            entry * (1.0 - self.profit_target_pct / 100.0)
        }
    }

    /// Units to trade: fixed fractional risk over the stop distance, capped so
    /// the margin never exceeds `max_position_pct` of the balance.
    pub fn position_size(&self, balance: f64, price: f64) -> f64 {
        if balance <= 0.0 || price <= 0.0 || self.stop_loss_pct <= 0.0 {
            return 0.0;
        }
        let risk_amount = balance * self.risk_pct / 100.0;
        let stop_distance = price * self.stop_loss_pct / 100.0;
        let risk_size = risk_amount / stop_distance;
        let cap = balance * self.max_position_pct / 100.0 * self.leverage / price;
        risk_size.min(cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_exit_thresholds() {
        let s = StrategyConfig::default();
        assert_eq!(s.profit_target_pct, 0.1);
        assert_eq!(s.stop_loss_pct, 0.15);
        assert_eq!(s.leverage, 10.0);
    }

    #[test]
    fn stop_and_target_prices_long() {
        let s = StrategyConfig::default();
        assert!((s.stop_loss_price(100.0, true) - 99.85).abs() < 1e-9);
        assert!((s.take_profit_price(100.0, true) - 100.1).abs() < 1e-9);
    }

    #[test]
    fn stop_and_target_prices_short() {
        let s = StrategyConfig::default();
        assert!((s.stop_loss_price(100.0, false) - 100.15).abs() < 1e-9);
        assert!((s.take_profit_price(100.0, false) - 99.9).abs() < 1e-9);
    }

    #[test]
    fn position_size_is_capped_by_balance_fraction() {
        let s = StrategyConfig::default();
        // risk: 100 / 0.15 = 666.67 units; cap: 10000 * 0.5 * 10 / 100 = 500
        assert!((s.position_size(10_000.0, 100.0) - 500.0).abs() < 1e-9);
    }

    #[test]
    fn position_size_uses_risk_when_below_cap() {
        let s = StrategyConfig {
            risk_pct: 0.3,
            ..StrategyConfig::default()
        };
        // risk: 30 / 0.15 = 200 units < 500 cap
        assert!((s.position_size(10_000.0, 100.0) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn position_size_zero_without_balance() {
        let s = StrategyConfig::default();
        assert_eq!(s.position_size(0.0, 100.0), 0.0);
        assert_eq!(s.position_size(100.0, 0.0), 0.0);
    }
}
