//! Week period.

use chrono::{Datelike, Days};

use crate::calendar::{shift, start_of_day, CalendarUnit};
use crate::error::{QuotaError, Result};
use crate::period::{Moment, TICK};
use crate::unit::WordForms;

const DAYS_IN_WEEK: i64 = 7;

/// Week starting on Monday.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Week;

impl CalendarUnit for Week {
    fn ref_base(&self) -> &'static str {
        "week"
    }

    fn title(&self) -> WordForms {
        WordForms::new("week", "weeks")
    }

    fn calendar_aligned_start(&self, point: &Moment) -> Result<Moment> {
        let since_monday = point.weekday().num_days_from_monday();
        let monday = point
            .date_naive()
            .checked_sub_days(Days::new(u64::from(since_monday)))
            .ok_or_else(|| QuotaError::out_of_range(point))?;
        start_of_day(monday, *point.offset())
    }

    fn calendar_aligned_end(&self, point: &Moment) -> Result<Moment> {
        let start = self.calendar_aligned_start(point)?;
        self.end_from_start(&start)
    }

    fn end_from_start(&self, start: &Moment) -> Result<Moment> {
        shift(start, chrono::TimeDelta::days(DAYS_IN_WEEK) - TICK)
    }

    fn start_from_end(&self, end: &Moment) -> Result<Moment> {
        shift(end, TICK - chrono::TimeDelta::days(DAYS_IN_WEEK))
    }
}
