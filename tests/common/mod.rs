#![allow(dead_code)]

use barsim::domain::backtest::{BacktestConfig, SimulationRecord};
use barsim::domain::error::SimError;
use barsim::domain::metrics::SimulationStats;
pub use barsim::domain::ohlcv::{Bar, Interval};
use barsim::domain::position::Trade;
use barsim::ports::data_port::BarSource;
use barsim::ports::result_port::ResultSink;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::cell::RefCell;
use std::collections::HashMap;

pub struct MockBarSource {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockBarSource {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }

    fn check(&self, ticker: &str) -> Result<(), SimError> {
        match self.errors.get(ticker) {
            Some(reason) => Err(SimError::Database {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl BarSource for MockBarSource {
    fn fetch_bars(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        _interval: Interval,
    ) -> Result<Vec<Bar>, SimError> {
        self.check(ticker)?;
        Ok(self
            .data
            .get(ticker)
            .map(|bars| {
                bars.iter()
                    .filter(|b| {
                        let d = b.timestamp.date();
                        d >= start_date && d <= end_date
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn data_range(
        &self,
        ticker: &str,
        _interval: Interval,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, SimError> {
        self.check(ticker)?;
        match self.data.get(ticker) {
            Some(bars) if !bars.is_empty() => Ok(Some((
                bars[0].timestamp,
                bars[bars.len() - 1].timestamp,
                bars.len(),
            ))),
            _ => Ok(None),
        }
    }
}

/// Records everything it is asked to persist.
#[derive(Default)]
pub struct RecordingSink {
    pub simulations: RefCell<Vec<(SimulationRecord, SimulationStats)>>,
    pub trades: RefCell<Vec<(i64, Vec<Trade>)>>,
}

impl ResultSink for RecordingSink {
    fn save_simulation(
        &self,
        record: &SimulationRecord,
        stats: &SimulationStats,
    ) -> Result<i64, SimError> {
        let mut sims = self.simulations.borrow_mut();
        sims.push((record.clone(), stats.clone()));
        Ok(sims.len() as i64)
    }

    fn save_trades(&self, simulation_id: i64, trades: &[Trade]) -> Result<(), SimError> {
        self.trades
            .borrow_mut()
            .push((simulation_id, trades.to_vec()));
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Five-minute timestamps starting 2024-01-01 00:00.
pub fn ts(i: usize) -> NaiveDateTime {
    date(2024, 1, 1).and_hms_opt(0, 0, 0).unwrap() + Duration::minutes(5 * i as i64)
}

pub fn make_bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        timestamp: ts(i),
        open,
        high,
        low,
        close,
        volume: 1000.0,
    }
}

/// Bars with open = high = low = close.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(i, c, c, c, c))
        .collect()
}

pub fn rising_bars(count: usize, start_price: f64) -> Vec<Bar> {
    let closes: Vec<f64> = (0..count).map(|i| start_price + i as f64).collect();
    bars_from_closes(&closes)
}

/// Trending sine wave with real candle bodies and shadows.
pub fn wave_bars(count: usize) -> Vec<Bar> {
    let mut prev = 100.0;
    (0..count)
        .map(|i| {
            let x = i as f64;
            let close = 100.0 + (x * 0.35).sin() * 2.5 + (x * 0.9).cos() * 0.6 + x * 0.02;
            let open = prev;
            prev = close;
            let high = open.max(close) + 0.3;
            let low = open.min(close) - 0.3;
            make_bar(i, open, high, low, close)
        })
        .collect()
}

pub fn sample_config() -> BacktestConfig {
    BacktestConfig::new("BTCUSDT", Interval::M5, date(2024, 1, 1), date(2024, 1, 31))
}

/// `ExitCode` has no `PartialEq`; compare through its debug form.
pub fn assert_exit(actual: std::process::ExitCode, expected: u8) {
    assert_eq!(
        format!("{actual:?}"),
        format!("{:?}", std::process::ExitCode::from(expected))
    );
}
