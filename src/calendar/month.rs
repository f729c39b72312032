//! Month period.

use chrono::Datelike;

use crate::calendar::{add_months, shift, start_of_day, sub_months, CalendarUnit};
use crate::error::{QuotaError, Result};
use crate::period::{Moment, TICK};
use crate::unit::WordForms;

/// Calendar month.
///
/// A rolling month keeps the day of month and time of day; when the day does
/// not exist in the target month (the 31st, or the 29th of February) it
/// clamps to that month's last day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Month;

impl CalendarUnit for Month {
    fn ref_base(&self) -> &'static str {
        "month"
    }

    fn title(&self) -> WordForms {
        WordForms::new("month", "months")
    }

    fn calendar_aligned_start(&self, point: &Moment) -> Result<Moment> {
        let first_day = point
            .date_naive()
            .with_day(1)
            .ok_or_else(|| QuotaError::out_of_range(point))?;
        start_of_day(first_day, *point.offset())
    }

    fn calendar_aligned_end(&self, point: &Moment) -> Result<Moment> {
        let start = self.calendar_aligned_start(point)?;
        shift(&add_months(&start, 1)?, -TICK)
    }

    fn end_from_start(&self, start: &Moment) -> Result<Moment> {
        shift(&add_months(start, 1)?, -TICK)
    }

    fn start_from_end(&self, end: &Moment) -> Result<Moment> {
        shift(&sub_months(end, 1)?, TICK)
    }
}
