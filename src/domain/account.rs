//! Simulated account balance.
//!
//! Only the simulator mutates an account: it reserves margin plus the entry
//! fee when a position opens and releases margin plus net P&L when it closes.

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub balance: f64,
    /// Balance plus the open position's margin and unrealized P&L.
    pub equity: f64,
}

impl Account {
    pub fn new(balance: f64) -> Self {
        Account {
            balance,
            equity: balance,
        }
    }

    pub fn is_bankrupt(&self) -> bool {
        self.balance <= 0.0
    }

    pub fn can_afford(&self, amount: f64) -> bool {
        amount <= self.balance
    }

    pub fn reserve(&mut self, amount: f64) {
        self.balance -= amount;
    }

    pub fn release(&mut self, amount: f64) {
        self.balance += amount;
    }

    pub fn mark(&mut self, locked: f64) {
        self.equity = self.balance + locked;
    }
}
