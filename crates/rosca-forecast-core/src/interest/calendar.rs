use chrono::{Datelike, Months, NaiveDate};

use crate::config::{CalendarConfig, MAX_DAY_OF_MONTH};
use crate::{types::*, RoscaError, RoscaResult};

/// Maps simulation month indices onto a reference calendar.
///
/// Only relative offsets between dates matter to the engine, so the start
/// date is normalised to the first of its month and every month index is an
/// offset from there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    start: NaiveDate,
    collection_day: u32,
    payout_day: u32,
}

impl Calendar {
    pub fn new(start: NaiveDate, collection_day: u32, payout_day: u32) -> RoscaResult<Self> {
        check_day("calendar.collection_day", collection_day)?;
        check_day("calendar.payout_day", payout_day)?;
        let start = start
            .with_day(1)
            .ok_or_else(|| RoscaError::DateError(format!("cannot normalise {start}")))?;
        Ok(Self {
            start,
            collection_day,
            payout_day,
        })
    }

    pub fn from_config(config: &CalendarConfig) -> RoscaResult<Self> {
        Self::new(config.start_date, config.collection_day, config.payout_day)
    }

    /// The date of `day` in simulation month `month`.
    pub fn date_for(&self, month: MonthIndex, day: u32) -> RoscaResult<NaiveDate> {
        check_day("day", day)?;
        self.start
            .checked_add_months(Months::new(month))
            .and_then(|first| first.with_day(day))
            .ok_or_else(|| RoscaError::DateError(format!("month {month} day {day} is out of range")))
    }

    pub fn collection_date(&self, month: MonthIndex) -> RoscaResult<NaiveDate> {
        self.date_for(month, self.collection_day)
    }

    pub fn payout_date(&self, month: MonthIndex) -> RoscaResult<NaiveDate> {
        self.date_for(month, self.payout_day)
    }

    /// Short label such as "Jan 2025". Falls back to "M{n}" past the
    /// representable calendar.
    pub fn month_label(&self, month: MonthIndex) -> String {
        match self.start.checked_add_months(Months::new(month)) {
            Some(date) => date.format("%b %Y").to_string(),
            None => format!("M{}", month + 1),
        }
    }
}

/// Signed number of days from `from` to `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

fn check_day(field: &str, day: u32) -> RoscaResult<()> {
    if day == 0 || day > MAX_DAY_OF_MONTH {
        return Err(RoscaError::InvalidInput {
            field: field.into(),
            reason: format!("Day of month must be between 1 and {MAX_DAY_OF_MONTH}, got {day}."),
        });
    }
    Ok(())
}
