//! Per-bar bundle of every signal the decision engine reads.

use crate::domain::indicator::{
    adx, atr, bollinger, ema, last_close, macd, rsi, sma, stochastic, volatility_pct,
    BollingerBands, Macd, Stochastic,
};
use crate::domain::ohlcv::Bar;
use crate::domain::pattern::{detect_pattern, PatternSignal};
use crate::domain::strategy::StrategyConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub close: f64,
    pub prev_close: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub sma_short: f64,
    pub sma_long: f64,
    pub rsi: f64,
    pub atr: f64,
    pub adx: Option<f64>,
    pub macd: Macd,
    pub stochastic: Stochastic,
    pub bollinger: BollingerBands,
    pub volatility_pct: f64,
    pub pattern: PatternSignal,
}

impl IndicatorSnapshot {
    pub fn compute(bars: &[Bar], strategy: &StrategyConfig) -> Self {
        let close = last_close(bars);
        let prev_close = if bars.len() >= 2 {
            bars[bars.len() - 2].close
        } else {
            close
        };

        IndicatorSnapshot {
            close,
            prev_close,
            ema_fast: ema(bars, strategy.ema_fast),
            ema_slow: ema(bars, strategy.ema_slow),
            sma_short: sma(bars, strategy.sma_short),
            sma_long: sma(bars, strategy.sma_long),
            rsi: rsi(bars, strategy.rsi_period),
            atr: atr(bars, strategy.atr_period),
            adx: adx(bars, strategy.adx_period),
            macd: macd(
                bars,
                strategy.macd_fast,
                strategy.macd_slow,
                strategy.macd_signal,
            ),
            stochastic: stochastic(
                bars,
                strategy.stoch_period,
                strategy.stoch_smooth_k,
                strategy.stoch_smooth_d,
            ),
            bollinger: bollinger(
                bars,
                strategy.bollinger_period,
                strategy.bollinger_multiplier,
            ),
            volatility_pct: volatility_pct(bars, strategy.atr_period),
            pattern: detect_pattern(bars),
        }
    }
}
