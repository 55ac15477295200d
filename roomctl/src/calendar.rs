//! Listing windows: a single day, an inclusive run of days, or a calendar month.
//!
//! All windows are computed in UTC and converted to a half-open [`TimeRange`]. A reservation
//! belongs to a window when it starts before the window ends and ends at or after the window
//! starts (see [`lists`]), so a booking spanning midnight at a month boundary shows up in both
//! months, and one ending exactly at midnight also shows up on the following day. This is looser
//! than the write-time overlap rule in [`crate::conflict`], which stays half-open.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use thiserror::Error;

use crate::conflict::TimeRange;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("invalid month '{0}', expected YYYY-MM")]
    InvalidMonth(String),
    #[error("start date {start} is after end date {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
    #[error("date out of range")]
    OutOfRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// One calendar day.
    Day(NaiveDate),
    /// `start` through `end`, both inclusive (typically a week).
    Days { start: NaiveDate, end: NaiveDate },
    /// A calendar month; `first` is always the first of the month.
    Month { first: NaiveDate },
}

impl Window {
    pub fn day(date: &str) -> Result<Self, WindowError> {
        Ok(Window::Day(parse_date(date)?))
    }

    pub fn days(start: &str, end: &str) -> Result<Self, WindowError> {
        let start = parse_date(start)?;
        let end = parse_date(end)?;
        if start > end {
            return Err(WindowError::InvertedRange { start, end });
        }
        Ok(Window::Days { start, end })
    }

    pub fn month(month: &str) -> Result<Self, WindowError> {
        let invalid = || WindowError::InvalidMonth(month.to_string());
        let (year, month_num) = month.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month_num.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month_num: u32 = month_num.parse().map_err(|_| invalid())?;
        let first = NaiveDate::from_ymd_opt(year, month_num, 1).ok_or_else(invalid)?;
        Ok(Window::Month { first })
    }

    /// The half-open instant range covered by this window.
    pub fn range(&self) -> Result<TimeRange, WindowError> {
        let (first, next) = match *self {
            Window::Day(date) => (date, next_day(date)?),
            Window::Days { start, end } => (start, next_day(end)?),
            Window::Month { first } => {
                let next = if first.month() == 12 {
                    NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
                };
                (first, next.ok_or(WindowError::OutOfRange)?)
            }
        };

        TimeRange::new(midnight(first), midnight(next)).map_err(|_| WindowError::OutOfRange)
    }
}

/// Whether a reservation spanning `start..end` is listed in `window`.
pub fn lists(window: &TimeRange, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    start < window.end() && end >= window.start()
}

fn parse_date(value: &str) -> Result<NaiveDate, WindowError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| WindowError::InvalidDate(value.to_string()))
}

fn next_day(date: NaiveDate) -> Result<NaiveDate, WindowError> {
    date.checked_add_days(Days::new(1)).ok_or(WindowError::OutOfRange)
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
