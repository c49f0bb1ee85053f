use crate::error::ValidationError;
use chrono::NaiveDate;
use std::fmt;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// An observation-date interval, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl SearchWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::DateOrder {
                start: start.format(DATE_FORMAT).to_string(),
                end: end.format(DATE_FORMAT).to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, ValidationError> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Listing marker for the first day of the window.
    pub fn start_marker(&self, prefix: &str) -> String {
        date_marker(prefix, self.start)
    }

    /// Listing marker for the day after the window, `None` when the window
    /// is open-ended because `end` is the last representable date.
    pub fn end_marker(&self, prefix: &str) -> Option<String> {
        self.end.succ_opt().map(|day| date_marker(prefix, day))
    }
}

impl fmt::Display for SearchWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

pub fn parse_date(text: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
        .map_err(|_| ValidationError::DateFormat(text.to_string()))
}

fn date_marker(prefix: &str, day: NaiveDate) -> String {
    format!("{prefix}/{}", day.format("%Y/%m/%d"))
}
