//! Bar source port trait.

use crate::domain::error::SimError;
use crate::domain::ohlcv::{Bar, Interval};
use chrono::{NaiveDate, NaiveDateTime};

/// Historical bar storage.
///
/// `fetch_bars` returns bars in ascending timestamp order, inclusive of both
/// dates. An empty vector is a valid answer; deciding what to do about it is
/// the caller's job.
pub trait BarSource {
    fn fetch_bars(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        interval: Interval,
    ) -> Result<Vec<Bar>, SimError>;

    /// First timestamp, last timestamp and bar count, if any bars exist.
    fn data_range(
        &self,
        ticker: &str,
        interval: Interval,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, SimError>;
}

impl<T: BarSource + ?Sized> BarSource for Box<T> {
    fn fetch_bars(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        interval: Interval,
    ) -> Result<Vec<Bar>, SimError> {
        (**self).fetch_bars(ticker, start_date, end_date, interval)
    }

    fn data_range(
        &self,
        ticker: &str,
        interval: Interval,
    ) -> Result<Option<(NaiveDateTime, NaiveDateTime, usize)>, SimError> {
        (**self).data_range(ticker, interval)
    }
}
