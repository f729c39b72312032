//! Year period.

use chrono::{Datelike, NaiveDate};

use crate::calendar::{add_months, shift, start_of_day, sub_months, CalendarUnit};
use crate::error::{QuotaError, Result};
use crate::period::{Moment, TICK};
use crate::unit::WordForms;

const MONTHS_IN_YEAR: u32 = 12;

/// Calendar year, January 1st to December 31st.
///
/// Rolling years from February 29th land on February 28th of non-leap years.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Year;

impl CalendarUnit for Year {
    fn ref_base(&self) -> &'static str {
        "year"
    }

    fn title(&self) -> WordForms {
        WordForms::new("year", "years")
    }

    fn calendar_aligned_start(&self, point: &Moment) -> Result<Moment> {
        let first_day = NaiveDate::from_ymd_opt(point.year(), 1, 1)
            .ok_or_else(|| QuotaError::out_of_range(point.year()))?;
        start_of_day(first_day, *point.offset())
    }

    fn calendar_aligned_end(&self, point: &Moment) -> Result<Moment> {
        let start = self.calendar_aligned_start(point)?;
        shift(&add_months(&start, MONTHS_IN_YEAR)?, -TICK)
    }

    fn end_from_start(&self, start: &Moment) -> Result<Moment> {
        shift(&add_months(start, MONTHS_IN_YEAR)?, -TICK)
    }

    fn start_from_end(&self, end: &Moment) -> Result<Moment> {
        shift(&sub_months(end, MONTHS_IN_YEAR)?, TICK)
    }
}
