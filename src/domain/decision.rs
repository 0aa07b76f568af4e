//! Decision engine: indicators plus position/account state in, one action out.
//!
//! [`decide`] is pure. It reads only the causal history it is given and the
//! thresholds in [`StrategyConfig`]; the same inputs always yield the same
//! [`Action`]. The action contract is shared with any live executor, so an
//! `Enter` carries everything needed to place the order.

use crate::domain::account::Account;
use crate::domain::indicator::{support_resistance, IndicatorSnapshot};
use crate::domain::ohlcv::Bar;
use crate::domain::pattern::PatternDirection;
use crate::domain::position::{Direction, EntrySnapshot, EntryTrigger, ExitReason, Position};
use crate::domain::strategy::StrategyConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitReason {
    InsufficientData,
    LowVolatility,
    WeakTrend,
    NoSignal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryOrder {
    pub direction: Direction,
    pub price: f64,
    pub size: f64,
    pub leverage: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub reason: EntryTrigger,
    pub snapshot: EntrySnapshot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Halt,
    Wait { reason: WaitReason },
    Hold,
    Exit { price: f64, reason: ExitReason },
    Enter(EntryOrder),
}

impl Action {
    fn wait(reason: WaitReason) -> Self {
        Action::Wait { reason }
    }
}

pub fn decide(
    history: &[Bar],
    position: Option<&Position>,
    account: &Account,
    strategy: &StrategyConfig,
) -> Action {
    if account.is_bankrupt() {
        return Action::Halt;
    }
    if history.is_empty() || history.len() < strategy.warmup_bars {
        return Action::wait(WaitReason::InsufficientData);
    }

    let snapshot = IndicatorSnapshot::compute(history, strategy);
    match position {
        Some(pos) => manage_position(pos, &snapshot, strategy),
        None => {
            let mut action = seek_entry(&snapshot, account, strategy);
            if let Action::Enter(order) = &mut action {
                // Swing levels are only captured for entries.
                let (support, resistance) = support_resistance::nearest_levels(
                    history,
                    strategy.sr_lookback,
                    snapshot.close,
                );
                order.snapshot.support = support;
                order.snapshot.resistance = resistance;
            }
            action
        }
    }
}

fn manage_position(pos: &Position, s: &IndicatorSnapshot, strategy: &StrategyConfig) -> Action {
    let price = s.close;
    let move_pct = pos.move_pct(price);

    if move_pct >= strategy.profit_target_pct {
        return Action::Exit {
            price,
            reason: ExitReason::TakeProfit,
        };
    }
    if move_pct <= -strategy.stop_loss_pct {
        return Action::Exit {
            price,
            reason: ExitReason::StopLoss,
        };
    }

    let against = match pos.direction {
        Direction::Long => Direction::Short,
        Direction::Short => Direction::Long,
    };
    if entry_signal(s, against, strategy).is_some() {
        return Action::Exit {
            price,
            reason: ExitReason::Signal,
        };
    }

    if move_pct > strategy.trailing_activation_pct {
        // Trail is anchored to the entry price, not to the best price seen.
        let offset = strategy.trailing_offset_pct / 100.0;
        let hit = match pos.direction {
            Direction::Long => price * (1.0 - offset) <= pos.entry_price,
            Direction::Short => price * (1.0 + offset) >= pos.entry_price,
        };
        if hit {
            return Action::Exit {
                price,
                reason: ExitReason::TrailingStop,
            };
        }
    }

    Action::Hold
}

fn seek_entry(s: &IndicatorSnapshot, account: &Account, strategy: &StrategyConfig) -> Action {
    if s.volatility_pct < strategy.min_volatility_pct {
        return Action::wait(WaitReason::LowVolatility);
    }
    let weak_trend = s.adx.is_some_and(|adx| adx < strategy.weak_trend_adx);
    if weak_trend && s.volatility_pct < strategy.low_volatility_pct {
        return Action::wait(WaitReason::WeakTrend);
    }

    let (direction, trigger) = match entry_signal(s, Direction::Long, strategy) {
        Some(trigger) => (Direction::Long, trigger),
        None => match entry_signal(s, Direction::Short, strategy) {
            Some(trigger) => (Direction::Short, trigger),
            None => return Action::wait(WaitReason::NoSignal),
        },
    };

    let exhausted = match direction {
        Direction::Long => s.rsi > strategy.rsi_overbought,
        Direction::Short => s.rsi < strategy.rsi_oversold,
    };
    if weak_trend && exhausted {
        return Action::wait(WaitReason::NoSignal);
    }

    let price = s.close;
    let size = strategy.position_size(account.balance, price);
    if size <= 0.0 {
        return Action::wait(WaitReason::NoSignal);
    }
    let long = direction.is_long();

    Action::Enter(EntryOrder {
        direction,
        price,
        size,
        leverage: strategy.leverage,
        stop_loss: strategy.stop_loss_price(price, long),
        take_profit: strategy.take_profit_price(price, long),
        reason: trigger,
        snapshot: EntrySnapshot::from(s),
    })
}

/// Entry trigger for `direction`, if any. Long and short signals are mutually
/// exclusive because each requires the close to move its way.
fn entry_signal(
    s: &IndicatorSnapshot,
    direction: Direction,
    strategy: &StrategyConfig,
) -> Option<EntryTrigger> {
    let long = direction.is_long();
    let close_moved = if long {
        s.close > s.prev_close
    } else {
        s.close < s.prev_close
    };
    if !close_moved {
        return None;
    }

    let price_action = if long {
        s.close > s.ema_fast
    } else {
        s.close < s.ema_fast
    };
    let momentum = if long {
        s.ema_fast > s.ema_slow
    } else {
        s.ema_fast < s.ema_slow
    };

    if price_action {
        let k = s.stochastic.k;
        let d = s.stochastic.d;
        let oscillator = if long {
            k > d && k < strategy.stoch_overbought
        } else {
            k < d && k > strategy.stoch_oversold
        };
        let histogram = if long {
            s.macd.histogram > 0.0 && s.macd.line > 0.0
        } else {
            s.macd.histogram < 0.0 && s.macd.line < 0.0
        };
        let pattern = match s.pattern.direction {
            PatternDirection::Bullish => long,
            PatternDirection::Bearish => !long,
            PatternDirection::Neutral => false,
        };
        if momentum || oscillator || histogram || pattern {
            return Some(EntryTrigger::Confirmation);
        }
    }

    if long && s.rsi < strategy.rsi_oversold {
        return Some(EntryTrigger::OversoldBounce);
    }
    if !long && s.rsi > strategy.rsi_overbought {
        return Some(EntryTrigger::OverboughtDrop);
    }

    if momentum && s.adx.is_some_and(|adx| adx >= strategy.strong_trend_adx) {
        return Some(EntryTrigger::TrendOverride);
    }

    None
}
