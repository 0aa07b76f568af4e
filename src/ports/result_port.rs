//! Result persistence port trait.

use crate::domain::backtest::SimulationRecord;
use crate::domain::error::SimError;
use crate::domain::metrics::SimulationStats;
use crate::domain::position::Trade;

pub trait ResultSink {
    /// Stores one simulation run and returns its id.
    fn save_simulation(
        &self,
        record: &SimulationRecord,
        stats: &SimulationStats,
    ) -> Result<i64, SimError>;

    fn save_trades(&self, simulation_id: i64, trades: &[Trade]) -> Result<(), SimError>;
}
