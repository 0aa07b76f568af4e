//! Bar source that consults a secondary source when the primary has nothing.

use crate::domain::error::SimError;
use crate::domain::ohlcv::{Bar, Interval};
use crate::ports::data_port::BarSource;
use chrono::{NaiveDate, NaiveDateTime};
use tracing::info;

pub struct FallbackSource<P, S> {
    primary: P,
    secondary: S,
}

impl<P: BarSource, S: BarSource> FallbackSource<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

impl<P: BarSource, S: BarSource> BarSource for FallbackSource<P, S> {
    /// Errors from the primary are returned as-is; only an empty result
    /// falls through.
    fn fetch_bars(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        interval: Interval,
    ) -> Result<Vec<Bar>, SimError> {
        let bars = self
            .primary
            .fetch_bars(ticker, start_date, end_date, interval)?;
        if !bars.is_empty() {
            return Ok(bars);
        }
        info!(%ticker, %interval, "primary source empty, trying fallback");
        self.secondary
            .fetch_bars(ticker, start_date, end_date, interval)
    }

    fn data_range(
        &self,
        ticker: &str,
        interval: Interval,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, SimError> {
        match self.primary.data_range(ticker, interval)? {
            Some(range) => Ok(Some(range)),
            None => self.secondary.data_range(ticker, interval),
        }
    }
}
