//! Backtest engine and event loop.
//!
//! [`Simulator`] is the only owner of the account, the open position and the
//! ledger. [`run_backtest`] feeds it one causal prefix of the bar history per
//! step and stops early on a halt.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};

use super::account::Account;
use super::decision::{decide, Action, EntryOrder, WaitReason};
use super::error::SimError;
use super::metrics::SimulationStats;
use super::ohlcv::{Bar, Interval};
use super::position::{ExitReason, Position, Trade};
use super::strategy::StrategyConfig;
use crate::ports::data_port::BarSource;
use crate::ports::result_port::ResultSink;

pub const DEFAULT_INITIAL_BALANCE: f64 = 10_000.0;
pub const DEFAULT_FEE_PCT: f64 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub ticker: String,
    pub interval: Interval,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_balance: f64,
    /// Fee charged on margin at entry and again at exit, in percent.
    pub fee_pct: f64,
}

impl BacktestConfig {
    pub fn new(
        ticker: impl Into<String>,
        interval: Interval,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        BacktestConfig {
            ticker: ticker.into(),
            interval,
            start_date,
            end_date,
            initial_balance: DEFAULT_INITIAL_BALANCE,
            fee_pct: DEFAULT_FEE_PCT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEntry {
    Trade(Trade),
    Halt {
        timestamp: NaiveDateTime,
        balance: f64,
    },
}

/// Append-only record of closed trades and halts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub(crate) fn push(&mut self, entry: LedgerEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn trades(&self) -> impl Iterator<Item = &Trade> {
        self.entries.iter().filter_map(|e| match e {
            LedgerEntry::Trade(t) => Some(t),
            LedgerEntry::Halt { .. } => None,
        })
    }

    /// Timestamp and balance of the halt entry, if the run halted.
    pub fn halt(&self) -> Option<(NaiveDateTime, f64)> {
        self.entries.iter().find_map(|e| match e {
            LedgerEntry::Halt { timestamp, balance } => Some((*timestamp, *balance)),
            LedgerEntry::Trade(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub ledger: Ledger,
    pub stats: SimulationStats,
    pub account: Account,
    /// Position still open when the bars ran out; it is not force-closed.
    pub open_position: Option<Position>,
    pub bars_processed: usize,
}

pub struct Simulator<'a> {
    strategy: &'a StrategyConfig,
    fee_pct: f64,
    initial_balance: f64,
    account: Account,
    position: Option<Position>,
    ledger: Ledger,
    halted: bool,
    bars_processed: usize,
}

impl<'a> Simulator<'a> {
    pub fn new(config: &BacktestConfig, strategy: &'a StrategyConfig) -> Self {
        Simulator {
            strategy,
            fee_pct: config.fee_pct,
            initial_balance: config.initial_balance,
            account: Account::new(config.initial_balance),
            position: None,
            ledger: Ledger::default(),
            halted: false,
            bars_processed: 0,
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Decides on `history` (the causal view ending at the current bar) and
    /// applies the result. Returns the action the decision engine produced.
    pub fn step(&mut self, history: &[Bar]) -> Action {
        if self.halted {
            return Action::Halt;
        }
        let Some(bar) = history.last() else {
            return Action::Wait {
                reason: WaitReason::InsufficientData,
            };
        };
        self.bars_processed += 1;
        let action = decide(history, self.position.as_ref(), &self.account, self.strategy);
        self.apply_action(&action, bar);
        action
    }

    /// Applies `action` at `bar`. On `Hold` and `Wait` the stored stop-loss
    /// and take-profit levels are checked against the bar close.
    pub fn apply_action(&mut self, action: &Action, bar: &Bar) {
        if self.halted {
            return;
        }
        match action {
            Action::Halt => self.halt(bar.timestamp),
            Action::Enter(order) => {
                if self.position.is_some() {
                    debug!(timestamp = %bar.timestamp, "entry ignored, position already open");
                } else {
                    self.open(order, bar.timestamp);
                }
            }
            Action::Exit { price, reason } => {
                if let Some(pos) = self.position.take() {
                    self.close(pos, *price, *reason, bar.timestamp);
                }
            }
            Action::Hold | Action::Wait { .. } => self.monitor(bar),
        }
        self.mark(bar.close);
    }

    pub fn finish(self) -> BacktestResult {
        let stats = SimulationStats::compute(&self.ledger, self.initial_balance);
        BacktestResult {
            ledger: self.ledger,
            stats,
            account: self.account,
            open_position: self.position,
            bars_processed: self.bars_processed,
        }
    }

    fn halt(&mut self, timestamp: NaiveDateTime) {
        info!(%timestamp, balance = self.account.balance, "balance exhausted, halting");
        self.ledger.push(LedgerEntry::Halt {
            timestamp,
            balance: self.account.balance,
        });
        self.halted = true;
    }

    fn open(&mut self, order: &EntryOrder, timestamp: NaiveDateTime) {
        let margin = order.size * order.price / order.leverage;
        let fee = margin * self.fee_pct / 100.0;
        if !margin.is_finite() || !self.account.can_afford(margin + fee) {
            warn!(
                %timestamp,
                required = margin + fee,
                balance = self.account.balance,
                "insufficient funds, entry skipped"
            );
            return;
        }

        self.account.reserve(margin + fee);
        info!(
            %timestamp,
            direction = %order.direction,
            price = order.price,
            size = order.size,
            reason = %order.reason,
            "position opened"
        );
        self.position = Some(Position {
            direction: order.direction,
            entry_price: order.price,
            size: order.size,
            margin,
            leverage: order.leverage,
            entry_time: timestamp,
            stop_loss: order.stop_loss,
            take_profit: order.take_profit,
            entry_reason: order.reason,
            entry_fee: fee,
            snapshot: order.snapshot.clone(),
        });
    }

    fn monitor(&mut self, bar: &Bar) {
        let trigger = self
            .position
            .as_ref()
            .and_then(|pos| pos.price_trigger(bar.close));
        if let Some(reason) = trigger
            && let Some(pos) = self.position.take()
        {
            self.close(pos, bar.close, reason, bar.timestamp);
        }
    }

    fn close(&mut self, pos: Position, price: f64, reason: ExitReason, timestamp: NaiveDateTime) {
        let pnl = pos.unrealized_pnl(price);
        let exit_fee = pos.margin * self.fee_pct / 100.0;
        self.account.release(pos.margin + pnl - exit_fee);

        let profit = pnl - pos.entry_fee - exit_fee;
        let profit_pct = if pos.margin > 0.0 {
            profit / pos.margin * 100.0
        } else {
            0.0
        };
        info!(
            %timestamp,
            direction = %pos.direction,
            price,
            profit,
            reason = %reason,
            balance = self.account.balance,
            "position closed"
        );

        self.ledger.push(LedgerEntry::Trade(Trade {
            direction: pos.direction,
            entry_price: pos.entry_price,
            exit_price: price,
            size: pos.size,
            margin: pos.margin,
            leverage: pos.leverage,
            entry_time: pos.entry_time,
            exit_time: timestamp,
            stop_loss: pos.stop_loss,
            take_profit: pos.take_profit,
            entry_reason: pos.entry_reason,
            exit_reason: reason,
            profit,
            profit_pct,
            fees: pos.entry_fee + exit_fee,
            new_balance: self.account.balance,
            snapshot: pos.snapshot,
        }));
    }

    fn mark(&mut self, price: f64) {
        let locked = self
            .position
            .as_ref()
            .map(|pos| pos.margin + pos.unrealized_pnl(price))
            .unwrap_or(0.0);
        self.account.mark(locked);
    }
}

/// Runs the strategy over `bars`, one causal prefix per step.
pub fn run_backtest(
    bars: &[Bar],
    config: &BacktestConfig,
    strategy: &StrategyConfig,
) -> BacktestResult {
    info!(
        ticker = %config.ticker,
        interval = %config.interval,
        bars = bars.len(),
        strategy = %strategy.name,
        "starting backtest"
    );
    let mut sim = Simulator::new(config, strategy);
    for end in 1..=bars.len() {
        sim.step(&bars[..end]);
        if sim.is_halted() {
            break;
        }
    }
    let result = sim.finish();
    info!(
        trades = result.stats.total_trades,
        final_balance = result.stats.final_balance,
        halted = result.stats.halted,
        "backtest finished"
    );
    result
}

/// Fetches bars through `source` and runs the backtest. An empty fetch is a
/// hard failure.
pub fn run_simulation(
    source: &dyn BarSource,
    config: &BacktestConfig,
    strategy: &StrategyConfig,
) -> Result<BacktestResult, SimError> {
    let bars = source.fetch_bars(
        &config.ticker,
        config.start_date,
        config.end_date,
        config.interval,
    )?;
    if bars.is_empty() {
        return Err(SimError::NoData {
            ticker: config.ticker.clone(),
            interval: config.interval,
        });
    }
    Ok(run_backtest(&bars, config, strategy))
}

/// Row describing one simulation run, as handed to a [`ResultSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRecord {
    pub ticker: String,
    pub interval: Interval,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub strategy_name: String,
    pub initial_balance: f64,
    pub fee_pct: f64,
    pub leverage: f64,
    pub bars_processed: usize,
    pub halted_at: Option<NaiveDateTime>,
    pub halt_balance: Option<f64>,
}

impl SimulationRecord {
    pub fn new(
        config: &BacktestConfig,
        strategy: &StrategyConfig,
        result: &BacktestResult,
    ) -> Self {
        let halt = result.ledger.halt();
        SimulationRecord {
            ticker: config.ticker.clone(),
            interval: config.interval,
            start_date: config.start_date,
            end_date: config.end_date,
            strategy_name: strategy.name.clone(),
            initial_balance: config.initial_balance,
            fee_pct: config.fee_pct,
            leverage: strategy.leverage,
            bars_processed: result.bars_processed,
            halted_at: halt.map(|(timestamp, _)| timestamp),
            halt_balance: halt.map(|(_, balance)| balance),
        }
    }
}

/// Writes the run and its trades to `sink`, returning the simulation id.
pub fn persist_result(
    sink: &dyn ResultSink,
    config: &BacktestConfig,
    strategy: &StrategyConfig,
    result: &BacktestResult,
) -> Result<i64, SimError> {
    let record = SimulationRecord::new(config, strategy, result);
    let id = sink.save_simulation(&record, &result.stats)?;
    let trades: Vec<Trade> = result.ledger.trades().cloned().collect();
    sink.save_trades(id, &trades)?;
    debug!(simulation_id = id, trades = trades.len(), "results persisted");
    Ok(id)
}
