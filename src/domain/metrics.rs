//! Summary statistics over a simulation ledger.

use super::backtest::{Ledger, LedgerEntry};

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationStats {
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub win_rate: f64,
    pub loss_rate: f64,
    /// Sum of winning trade profits.
    pub total_gain: f64,
    /// Sum of losing trade profits, as a positive number.
    pub total_loss: f64,
    pub profit_factor: f64,
    pub net_pnl: f64,
    /// Net P&L relative to the starting balance, in percent.
    pub pnl_pct: f64,
    pub initial_balance: f64,
    pub final_balance: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub total_fees: f64,
    /// Largest peak-to-trough fall of the closed-trade balance curve, as a fraction.
    pub max_drawdown: f64,
    pub halted: bool,
}

impl SimulationStats {
    pub fn compute(ledger: &Ledger, initial_balance: f64) -> Self {
        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut total_gain = 0.0_f64;
        let mut total_loss = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_fees = 0.0_f64;
        let mut balance_curve = vec![initial_balance];
        let mut final_balance = initial_balance;
        let mut halted = false;

        for entry in ledger.entries() {
            match entry {
                LedgerEntry::Trade(trade) => {
                    let profit = trade.profit;
                    if trade.is_win() {
                        trades_won += 1;
                        total_gain += profit;
                        largest_win = largest_win.max(profit);
                    } else if trade.is_loss() {
                        trades_lost += 1;
                        total_loss += profit.abs();
                        largest_loss = largest_loss.max(profit.abs());
                    } else {
                        trades_breakeven += 1;
                    }
                    total_fees += trade.fees;
                    final_balance = trade.new_balance;
                    balance_curve.push(trade.new_balance);
                }
                LedgerEntry::Halt { balance, .. } => {
                    halted = true;
                    final_balance = *balance;
                }
            }
        }

        let total_trades = trades_won + trades_lost + trades_breakeven;
        let rate = |n: usize| {
            if total_trades > 0 {
                n as f64 / total_trades as f64
            } else {
                0.0
            }
        };

        let profit_factor = if total_loss > 0.0 {
            total_gain / total_loss
        } else if total_gain > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if trades_won > 0 {
            total_gain / trades_won as f64
        } else {
            0.0
        };
        let avg_loss = if trades_lost > 0 {
            total_loss / trades_lost as f64
        } else {
            0.0
        };

        let net_pnl = total_gain - total_loss;
        let pnl_pct = if initial_balance > 0.0 {
            net_pnl / initial_balance * 100.0
        } else {
            0.0
        };

        SimulationStats {
            total_trades,
            trades_won,
            trades_lost,
            trades_breakeven,
            win_rate: rate(trades_won),
            loss_rate: rate(trades_lost),
            total_gain,
            total_loss,
            profit_factor,
            net_pnl,
            pnl_pct,
            initial_balance,
            final_balance,
            avg_win,
            avg_loss,
            largest_win,
            largest_loss,
            total_fees,
            max_drawdown: compute_drawdown(&balance_curve),
            halted,
        }
    }
}

fn compute_drawdown(curve: &[f64]) -> f64 {
    let Some(&first) = curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &value in curve {
        if value > peak {
            peak = value;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - value) / peak);
        }
    }
    max_dd
}
