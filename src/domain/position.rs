//! Open position and closed trade records.

use chrono::NaiveDateTime;
use std::fmt;

use crate::domain::indicator::IndicatorSnapshot;
use crate::domain::pattern::CandlePattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn is_long(&self) -> bool {
        matches!(self, Direction::Long)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an entry fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryTrigger {
    /// Price action plus at least one indicator confirmation.
    Confirmation,
    OversoldBounce,
    OverboughtDrop,
    TrendOverride,
}

impl EntryTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryTrigger::Confirmation => "confirmation",
            EntryTrigger::OversoldBounce => "oversold_bounce",
            EntryTrigger::OverboughtDrop => "overbought_drop",
            EntryTrigger::TrendOverride => "trend_override",
        }
    }
}

impl fmt::Display for EntryTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    Signal,
    TrailingStop,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::TakeProfit => "take_profit",
            ExitReason::StopLoss => "stop_loss",
            ExitReason::Signal => "signal",
            ExitReason::TrailingStop => "trailing_stop",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Indicator values captured when a position opens, kept for audit.
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySnapshot {
    pub rsi: f64,
    pub atr: f64,
    pub adx: Option<f64>,
    pub macd_histogram: f64,
    pub stoch_k: f64,
    pub volatility_pct: f64,
    pub sma_short: f64,
    pub sma_long: f64,
    pub bollinger_width_pct: f64,
    /// Nearest swing low below and swing high above the entry price.
    pub support: Option<f64>,
    pub resistance: Option<f64>,
    pub pattern: CandlePattern,
}

impl From<&IndicatorSnapshot> for EntrySnapshot {
    fn from(s: &IndicatorSnapshot) -> Self {
        EntrySnapshot {
            rsi: s.rsi,
            atr: s.atr,
            adx: s.adx,
            macd_histogram: s.macd.histogram,
            stoch_k: s.stochastic.k,
            volatility_pct: s.volatility_pct,
            sma_short: s.sma_short,
            sma_long: s.sma_long,
            bollinger_width_pct: s.bollinger.width_pct(),
            support: None,
            resistance: None,
            pattern: s.pattern.pattern,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub direction: Direction,
    pub entry_price: f64,
    /// Units held, already leverage-adjusted.
    pub size: f64,
    pub margin: f64,
    pub leverage: f64,
    pub entry_time: NaiveDateTime,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub entry_reason: EntryTrigger,
    pub entry_fee: f64,
    pub snapshot: EntrySnapshot,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.direction.is_long()
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.direction.sign() * (price - self.entry_price) * self.size
    }

    /// Signed price move since entry, in percent; positive is favourable.
    pub fn move_pct(&self, price: f64) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        self.direction.sign() * (price - self.entry_price) / self.entry_price * 100.0
    }

    pub fn should_stop_loss(&self, price: f64) -> bool {
        if self.stop_loss == 0.0 {
            return false;
        }
        if self.is_long() {
            price <= self.stop_loss
        } else {
            price >= self.stop_loss
        }
    }

    pub fn should_take_profit(&self, price: f64) -> bool {
        if self.take_profit == 0.0 {
            return false;
        }
        if self.is_long() {
            price >= self.take_profit
        } else {
            price <= self.take_profit
        }
    }

    /// Stop-loss wins when a single price satisfies both levels.
    pub fn price_trigger(&self, price: f64) -> Option<ExitReason> {
        if self.should_stop_loss(price) {
            Some(ExitReason::StopLoss)
        } else if self.should_take_profit(price) {
            Some(ExitReason::TakeProfit)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub direction: Direction,
    pub entry_price: f64,
    pub exit_price: f64,
    pub size: f64,
    pub margin: f64,
    pub leverage: f64,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub entry_reason: EntryTrigger,
    pub exit_reason: ExitReason,
    /// Realized profit net of entry and exit fees.
    pub profit: f64,
    /// Net profit relative to margin, in percent.
    pub profit_pct: f64,
    pub fees: f64,
    pub new_balance: f64,
    pub snapshot: EntrySnapshot,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.profit > 0.0
    }

    pub fn is_loss(&self) -> bool {
        self.profit < 0.0
    }
}
