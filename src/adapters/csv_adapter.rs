//! CSV file bar source.
//!
//! One file per ticker and interval: `<dir>/<TICKER>_<interval>.csv` with a
//! header row and columns `timestamp,open,high,low,close,volume`.

use crate::domain::error::SimError;
use crate::domain::ohlcv::{Bar, Interval, TIMESTAMP_FORMAT};
use crate::ports::data_port::BarSource;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn csv_path(&self, ticker: &str, interval: Interval) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", ticker, interval))
    }

    fn read_all(&self, ticker: &str, interval: Interval) -> Result<Vec<Bar>, SimError> {
        let path = self.csv_path(ticker, interval);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).map_err(|e| SimError::Database {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut bars = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| SimError::Database {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;
            let row = line + 2;
            bars.push(Bar {
                timestamp: parse_timestamp(field(&record, 0, "timestamp", row)?).ok_or_else(
                    || SimError::Database {
                        reason: format!("row {row}: invalid timestamp"),
                    },
                )?,
                open: parse_number(&record, 1, "open", row)?,
                high: parse_number(&record, 2, "high", row)?,
                low: parse_number(&record, 3, "low", row)?,
                close: parse_number(&record, 4, "close", row)?,
                volume: parse_number(&record, 5, "volume", row)?,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);
        Ok(bars)
    }
}

fn field<'r>(
    record: &'r csv::StringRecord,
    index: usize,
    name: &str,
    row: usize,
) -> Result<&'r str, SimError> {
    record.get(index).ok_or_else(|| SimError::Database {
        reason: format!("row {row}: missing {name} column"),
    })
}

fn parse_number(
    record: &csv::StringRecord,
    index: usize,
    name: &str,
    row: usize,
) -> Result<f64, SimError> {
    field(record, index, name, row)?
        .parse()
        .map_err(|e| SimError::Database {
            reason: format!("row {row}: invalid {name} value: {e}"),
        })
}

/// Accepts a full timestamp or a bare date (midnight).
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

impl BarSource for CsvAdapter {
    fn fetch_bars(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        interval: Interval,
    ) -> Result<Vec<Bar>, SimError> {
        let mut bars = self.read_all(ticker, interval)?;
        bars.retain(|b| {
            let date = b.timestamp.date();
            date >= start_date && date <= end_date
        });
        Ok(bars)
    }

    fn data_range(
        &self,
        ticker: &str,
        interval: Interval,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, SimError> {
        let bars = self.read_all(ticker, interval)?;
        match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Ok(Some((first.timestamp, last.timestamp, bars.len()))),
            _ => Ok(None),
        }
    }
}
