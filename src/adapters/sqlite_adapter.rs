//! SQLite bar source and result sink.

use crate::domain::backtest::SimulationRecord;
use crate::domain::error::SimError;
use crate::domain::metrics::SimulationStats;
use crate::domain::ohlcv::{Bar, Interval, TIMESTAMP_FORMAT};
use crate::domain::position::Trade;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::BarSource;
use crate::ports::result_port::ResultSink;
use chrono::{NaiveDate, NaiveDateTime};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS bars (
    ticker TEXT NOT NULL,
    interval TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    open REAL NOT NULL,
    high REAL NOT NULL,
    low REAL NOT NULL,
    close REAL NOT NULL,
    volume REAL NOT NULL,
    PRIMARY KEY (ticker, interval, timestamp)
);
CREATE TABLE IF NOT EXISTS simulations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticker TEXT NOT NULL,
    interval TEXT NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    strategy_name TEXT NOT NULL,
    initial_balance REAL NOT NULL,
    fee_pct REAL NOT NULL,
    leverage REAL NOT NULL,
    bars_processed INTEGER NOT NULL,
    total_trades INTEGER NOT NULL,
    trades_won INTEGER NOT NULL,
    trades_lost INTEGER NOT NULL,
    win_rate REAL NOT NULL,
    profit_factor REAL,
    net_pnl REAL NOT NULL,
    pnl_pct REAL NOT NULL,
    final_balance REAL NOT NULL,
    max_drawdown REAL NOT NULL,
    halted INTEGER NOT NULL,
    halted_at TEXT,
    halt_balance REAL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE IF NOT EXISTS trades (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    simulation_id INTEGER NOT NULL REFERENCES simulations(id),
    direction TEXT NOT NULL,
    entry_price REAL NOT NULL,
    exit_price REAL NOT NULL,
    size REAL NOT NULL,
    margin REAL NOT NULL,
    leverage REAL NOT NULL,
    entry_time TEXT NOT NULL,
    exit_time TEXT NOT NULL,
    stop_loss REAL NOT NULL,
    take_profit REAL NOT NULL,
    entry_reason TEXT NOT NULL,
    exit_reason TEXT NOT NULL,
    profit REAL NOT NULL,
    profit_pct REAL NOT NULL,
    fees REAL NOT NULL,
    new_balance REAL NOT NULL,
    entry_rsi REAL NOT NULL,
    entry_adx REAL,
    entry_sma_short REAL NOT NULL,
    entry_sma_long REAL NOT NULL,
    entry_bollinger_width REAL NOT NULL,
    entry_support REAL,
    entry_resistance REAL,
    entry_pattern TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_trades_simulation ON trades(simulation_id);";

fn pool_err(e: r2d2::Error) -> SimError {
    SimError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> SimError {
    SimError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn to_sql_time(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn from_sql_time(s: &str) -> Result<NaiveDateTime, SimError> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).map_err(|e| SimError::Database {
        reason: format!("bad timestamp '{s}': {e}"),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredSimulation {
    pub final_balance: f64,
    pub halted: bool,
    pub halted_at: Option<NaiveDateTime>,
    pub halt_balance: Option<f64>,
}

#[derive(Clone)]
pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SimError> {
        let db_path = config.require_string("sqlite", "path")?;
        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    /// Single-connection in-memory database with the schema applied.
    pub fn in_memory() -> Result<Self, SimError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(pool_err)?;
        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, SimError> {
        self.pool.get().map_err(pool_err)
    }

    pub fn initialize_schema(&self) -> Result<(), SimError> {
        self.conn()?.execute_batch(SCHEMA).map_err(query_err)
    }

    pub fn insert_bars(
        &self,
        ticker: &str,
        interval: Interval,
        bars: &[Bar],
    ) -> Result<(), SimError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        for bar in bars {
            tx.execute(
                "INSERT OR REPLACE INTO bars
                    (ticker, interval, timestamp, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    ticker,
                    interval.as_str(),
                    to_sql_time(bar.timestamp),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                ],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)
    }

    pub fn trade_count(&self, simulation_id: i64) -> Result<usize, SimError> {
        let count: i64 = self
            .conn()?
            .query_row(
                "SELECT COUNT(*) FROM trades WHERE simulation_id = ?1",
                params![simulation_id],
                |row| row.get(0),
            )
            .map_err(query_err)?;
        Ok(count as usize)
    }

    /// Headline figures of a stored simulation.
    pub fn simulation_summary(
        &self,
        simulation_id: i64,
    ) -> Result<Option<StoredSimulation>, SimError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT final_balance, halted, halted_at, halt_balance
                 FROM simulations WHERE id = ?1",
            )
            .map_err(query_err)?;
        let mut rows = stmt
            .query_map(params![simulation_id], |row| {
                Ok((
                    row.get::<_, f64>(0)?,
                    row.get::<_, i64>(1)? != 0,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<f64>>(3)?,
                ))
            })
            .map_err(query_err)?;
        let Some((final_balance, halted, halted_at, halt_balance)) =
            rows.next().transpose().map_err(query_err)?
        else {
            return Ok(None);
        };
        Ok(Some(StoredSimulation {
            final_balance,
            halted,
            halted_at: halted_at.as_deref().map(from_sql_time).transpose()?,
            halt_balance,
        }))
    }
}

impl BarSource for SqliteAdapter {
    fn fetch_bars(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        interval: Interval,
    ) -> Result<Vec<Bar>, SimError> {
        let conn = self.conn()?;
        let start = format!("{} 00:00:00", start_date.format("%Y-%m-%d"));
        let end = format!("{} 23:59:59", end_date.format("%Y-%m-%d"));

        let mut stmt = conn
            .prepare(
                "SELECT timestamp, open, high, low, close, volume
                 FROM bars
                 WHERE ticker = ?1 AND interval = ?2 AND timestamp >= ?3 AND timestamp <= ?4
                 ORDER BY timestamp ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![ticker, interval.as_str(), start, end], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, f64>(5)?,
                ))
            })
            .map_err(query_err)?;

        let mut bars = Vec::new();
        for row in rows {
            let (ts, open, high, low, close, volume) = row.map_err(query_err)?;
            bars.push(Bar {
                timestamp: from_sql_time(&ts)?,
                open,
                high,
                low,
                close,
                volume,
            });
        }
        Ok(bars)
    }

    fn data_range(
        &self,
        ticker: &str,
        interval: Interval,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, SimError> {
        let result: (Option<String>, Option<String>, i64) = self
            .conn()?
            .query_row(
                "SELECT MIN(timestamp), MAX(timestamp), COUNT(*) FROM bars
                 WHERE ticker = ?1 AND interval = ?2",
                params![ticker, interval.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_err)?;

        match result {
            (Some(min), Some(max), count) if count > 0 => Ok(Some((
                from_sql_time(&min)?,
                from_sql_time(&max)?,
                count as usize,
            ))),
            _ => Ok(None),
        }
    }
}

impl ResultSink for SqliteAdapter {
    fn save_simulation(
        &self,
        record: &SimulationRecord,
        stats: &SimulationStats,
    ) -> Result<i64, SimError> {
        let conn = self.conn()?;
        // Infinite profit factor is stored as NULL.
        let profit_factor = stats.profit_factor.is_finite().then_some(stats.profit_factor);
        conn.execute(
            "INSERT INTO simulations (ticker, interval, start_date, end_date, strategy_name,
                initial_balance, fee_pct, leverage, bars_processed, total_trades, trades_won,
                trades_lost, win_rate, profit_factor, net_pnl, pnl_pct, final_balance,
                max_drawdown, halted, halted_at, halt_balance)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                ?17, ?18, ?19, ?20, ?21)",
            params![
                record.ticker,
                record.interval.as_str(),
                record.start_date.format("%Y-%m-%d").to_string(),
                record.end_date.format("%Y-%m-%d").to_string(),
                record.strategy_name,
                record.initial_balance,
                record.fee_pct,
                record.leverage,
                record.bars_processed as i64,
                stats.total_trades as i64,
                stats.trades_won as i64,
                stats.trades_lost as i64,
                stats.win_rate,
                profit_factor,
                stats.net_pnl,
                stats.pnl_pct,
                stats.final_balance,
                stats.max_drawdown,
                stats.halted,
                record.halted_at.map(to_sql_time),
                record.halt_balance,
            ],
        )
        .map_err(query_err)?;
        Ok(conn.last_insert_rowid())
    }

    fn save_trades(&self, simulation_id: i64, trades: &[Trade]) -> Result<(), SimError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        for t in trades {
            tx.execute(
                "INSERT INTO trades (simulation_id, direction, entry_price, exit_price, size,
                    margin, leverage, entry_time, exit_time, stop_loss, take_profit, entry_reason,
                    exit_reason, profit, profit_pct, fees, new_balance, entry_rsi, entry_adx,
                    entry_sma_short, entry_sma_long, entry_bollinger_width, entry_support,
                    entry_resistance, entry_pattern)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                    ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25)",
                params![
                    simulation_id,
                    t.direction.as_str(),
                    t.entry_price,
                    t.exit_price,
                    t.size,
                    t.margin,
                    t.leverage,
                    to_sql_time(t.entry_time),
                    to_sql_time(t.exit_time),
                    t.stop_loss,
                    t.take_profit,
                    t.entry_reason.as_str(),
                    t.exit_reason.as_str(),
                    t.profit,
                    t.profit_pct,
                    t.fees,
                    t.new_balance,
                    t.snapshot.rsi,
                    t.snapshot.adx,
                    t.snapshot.sma_short,
                    t.snapshot.sma_long,
                    t.snapshot.bollinger_width_pct,
                    t.snapshot.support,
                    t.snapshot.resistance,
                    t.snapshot.pattern.as_str(),
                ],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)
    }
}
