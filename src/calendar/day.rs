//! Day period, optionally scaled to several days.

use chrono::{Datelike, Days, TimeDelta};

use crate::calendar::{shift, start_of_day, CalendarUnit};
use crate::error::{ConstructionError, QuotaError, Result};
use crate::period::{Moment, TICK};
use crate::unit::WordForms;

/// A run of `factor` consecutive days.
///
/// Calendar-aligned windows of a scaled day are blocks of `factor` days
/// counted from 0001-01-01, so every date belongs to exactly one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Day {
    factor: u32,
}

impl Day {
    pub(crate) const ONE: Day = Day { factor: 1 };
    pub(crate) const TWO: Day = Day { factor: 2 };
    pub(crate) const TEN: Day = Day { factor: 10 };

    /// Create a day unit spanning `factor` days.
    pub fn new(factor: u32) -> std::result::Result<Self, ConstructionError> {
        if factor == 0 {
            return Err(ConstructionError::ZeroScale);
        }
        Ok(Self { factor })
    }

    fn span(&self) -> TimeDelta {
        TimeDelta::days(i64::from(self.factor))
    }
}

impl Default for Day {
    fn default() -> Self {
        Self::ONE
    }
}

impl CalendarUnit for Day {
    fn ref_base(&self) -> &'static str {
        "day"
    }

    fn factor(&self) -> u32 {
        self.factor
    }

    fn title(&self) -> WordForms {
        WordForms::new("day", "days")
    }

    fn calendar_aligned_start(&self, point: &Moment) -> Result<Moment> {
        let date = point.date_naive();
        let into_block = (i64::from(date.num_days_from_ce()) - 1).rem_euclid(i64::from(self.factor));
        let block_start = date
            .checked_sub_days(Days::new(into_block as u64))
            .ok_or_else(|| QuotaError::out_of_range(point))?;
        start_of_day(block_start, *point.offset())
    }

    fn calendar_aligned_end(&self, point: &Moment) -> Result<Moment> {
        let start = self.calendar_aligned_start(point)?;
        self.end_from_start(&start)
    }

    fn end_from_start(&self, start: &Moment) -> Result<Moment> {
        shift(start, self.span() - TICK)
    }

    fn start_from_end(&self, end: &Moment) -> Result<Moment> {
        shift(end, TICK - self.span())
    }
}
