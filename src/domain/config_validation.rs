//! Configuration validation.
//!
//! The `[backtest]` section is checked straight from the config source; the
//! strategy is checked after it has been resolved into a [`StrategyConfig`]
//! so defaults are validated too.

use crate::domain::error::SimError;
use crate::domain::ohlcv::Interval;
use crate::domain::strategy::StrategyConfig;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), SimError> {
    config.require_string("backtest", "ticker")?;
    parse_interval(config.get_string("backtest", "interval").as_deref())?;
    validate_dates(config)?;
    validate_initial_balance(config)?;
    validate_fee(config)?;
    Ok(())
}

pub fn validate_strategy(strategy: &StrategyConfig) -> Result<(), SimError> {
    let periods = [
        ("ema_fast", strategy.ema_fast),
        ("ema_slow", strategy.ema_slow),
        ("sma_short", strategy.sma_short),
        ("sma_long", strategy.sma_long),
        ("rsi_period", strategy.rsi_period),
        ("atr_period", strategy.atr_period),
        ("adx_period", strategy.adx_period),
        ("macd_fast", strategy.macd_fast),
        ("macd_slow", strategy.macd_slow),
        ("macd_signal", strategy.macd_signal),
        ("stoch_period", strategy.stoch_period),
        ("stoch_smooth_k", strategy.stoch_smooth_k),
        ("stoch_smooth_d", strategy.stoch_smooth_d),
        ("bollinger_period", strategy.bollinger_period),
        ("sr_lookback", strategy.sr_lookback),
        ("warmup_bars", strategy.warmup_bars),
    ];
    for (key, value) in periods {
        if value == 0 {
            return Err(SimError::invalid("strategy", key, "must be at least 1"));
        }
    }

    if strategy.ema_fast >= strategy.ema_slow {
        return Err(SimError::invalid(
            "strategy",
            "ema_fast",
            "ema_fast must be shorter than ema_slow",
        ));
    }
    if strategy.macd_fast >= strategy.macd_slow {
        return Err(SimError::invalid(
            "strategy",
            "macd_fast",
            "macd_fast must be shorter than macd_slow",
        ));
    }
    if strategy.rsi_oversold >= strategy.rsi_overbought {
        return Err(SimError::invalid(
            "strategy",
            "rsi_oversold",
            "rsi_oversold must be below rsi_overbought",
        ));
    }
    if strategy.stoch_oversold >= strategy.stoch_overbought {
        return Err(SimError::invalid(
            "strategy",
            "stoch_oversold",
            "stoch_oversold must be below stoch_overbought",
        ));
    }
    if strategy.weak_trend_adx > strategy.strong_trend_adx {
        return Err(SimError::invalid(
            "strategy",
            "weak_trend_adx",
            "weak_trend_adx must not exceed strong_trend_adx",
        ));
    }

    let positive = [
        ("profit_target_pct", strategy.profit_target_pct),
        ("stop_loss_pct", strategy.stop_loss_pct),
        ("risk_pct", strategy.risk_pct),
        ("leverage", strategy.leverage),
        ("bollinger_multiplier", strategy.bollinger_multiplier),
    ];
    for (key, value) in positive {
        if value <= 0.0 || !value.is_finite() {
            return Err(SimError::invalid("strategy", key, "must be positive"));
        }
    }

    let non_negative = [
        ("min_volatility_pct", strategy.min_volatility_pct),
        ("low_volatility_pct", strategy.low_volatility_pct),
        ("trailing_activation_pct", strategy.trailing_activation_pct),
        ("trailing_offset_pct", strategy.trailing_offset_pct),
    ];
    for (key, value) in non_negative {
        if value < 0.0 {
            return Err(SimError::invalid("strategy", key, "must be non-negative"));
        }
    }

    if strategy.max_position_pct <= 0.0 || strategy.max_position_pct >= 100.0 {
        return Err(SimError::invalid(
            "strategy",
            "max_position_pct",
            "max_position_pct must be in (0, 100)",
        ));
    }
    Ok(())
}

/// A full-size entry (margin plus entry fee) must leave part of the balance
/// free; reserving all of it would read as bankruptcy on the next bar.
pub fn validate_position_budget(strategy: &StrategyConfig, fee_pct: f64) -> Result<(), SimError> {
    let committed_pct = strategy.max_position_pct * (1.0 + fee_pct / 100.0);
    if committed_pct >= 100.0 {
        return Err(SimError::invalid(
            "strategy",
            "max_position_pct",
            format!(
                "max_position_pct plus entry fee commits {committed_pct:.4}% of the balance, \
                 must stay below 100%"
            ),
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), SimError> {
    let start_date = parse_date(
        config.get_string("backtest", "start_date").as_deref(),
        "start_date",
    )?;
    let end_date = parse_date(
        config.get_string("backtest", "end_date").as_deref(),
        "end_date",
    )?;

    if start_date > end_date {
        return Err(SimError::invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    Ok(())
}

fn validate_initial_balance(config: &dyn ConfigPort) -> Result<(), SimError> {
    if !config.has_key("backtest", "initial_balance") {
        return Ok(());
    }
    let value = config.get_double("backtest", "initial_balance", 0.0);
    if value <= 0.0 {
        return Err(SimError::invalid(
            "backtest",
            "initial_balance",
            "initial_balance must be positive",
        ));
    }
    Ok(())
}

fn validate_fee(config: &dyn ConfigPort) -> Result<(), SimError> {
    let value = config.get_double("backtest", "fee_pct", 0.0);
    if value < 0.0 {
        return Err(SimError::invalid(
            "backtest",
            "fee_pct",
            "fee_pct must be non-negative",
        ));
    }
    Ok(())
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, SimError> {
    match value {
        None => Err(SimError::missing("backtest", field)),
        Some(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|_| {
            SimError::invalid(
                "backtest",
                field,
                format!("invalid {field} format, expected YYYY-MM-DD"),
            )
        }),
    }
}

pub fn parse_interval(value: Option<&str>) -> Result<Interval, SimError> {
    match value {
        None => Err(SimError::missing("backtest", "interval")),
        Some(s) => s
            .parse::<Interval>()
            .map_err(|e| SimError::invalid("backtest", "interval", e.to_string())),
    }
}
