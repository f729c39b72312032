//! Calendar period types and their window arithmetic.
//!
//! Every period unit implements the four primitives of [`CalendarUnit`].
//! [`CalendarPeriodType`] is the closed set of units used by limits; the
//! windows built from those primitives (calendar-aligned, ending at an
//! instant, walked forward from an anchor) are implemented once on it.
//!
//! # Available Units
//!
//! | Unit | Reference | Calendar-aligned window |
//! |------|-----------|-------------------------|
//! | Year | `year` | January 1st to December 31st |
//! | Month | `month` | 1st to last day of the month |
//! | Week | `week` | Monday to Sunday |
//! | Day×k | `day`, `day_x10` | k-day block counted from 0001-01-01 |
//!
//! All computations keep the UTC offset of their input. Windows are closed:
//! a window ends one [`TICK`](crate::period::TICK) before the next one starts.

mod day;
mod month;
mod week;
mod year;

pub use day::Day;
pub use month::Month;
pub use week::Week;
pub use year::Year;

use std::fmt;
use std::str::FromStr;

use chrono::{FixedOffset, Months, NaiveDate, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{ConstructionError, QuotaError, Result};
use crate::period::{localize, CalendarPeriod, Moment, TICK};
use crate::reference;
use crate::unit::WordForms;

/// Period unit arithmetic.
///
/// Implementations only provide the four boundary primitives; everything
/// else is derived from them.
pub trait CalendarUnit {
    /// Reference name of the unit, without scaling (`"day"`, `"month"`).
    fn ref_base(&self) -> &'static str;

    /// How many base units one period spans.
    fn factor(&self) -> u32 {
        1
    }

    /// Display words for the base unit.
    fn title(&self) -> WordForms;

    /// First instant of the calendar-aligned window containing `point`.
    fn calendar_aligned_start(&self, point: &Moment) -> Result<Moment>;

    /// Last instant of the calendar-aligned window containing `point`.
    fn calendar_aligned_end(&self, point: &Moment) -> Result<Moment>;

    /// End of the window that starts at `start`: the same moment one period
    /// later, minus one tick.
    ///
    /// Month and year arithmetic clamp to the last day of the target month
    /// when the day of month does not exist there.
    fn end_from_start(&self, start: &Moment) -> Result<Moment>;

    /// Start of the window that ends at `end`. Inverse of
    /// [`end_from_start`](CalendarUnit::end_from_start), with the same clamping.
    fn start_from_end(&self, end: &Moment) -> Result<Moment>;

    /// Start of the window following the one that starts at `start`.
    fn next_start_from_current_start(&self, start: &Moment) -> Result<Moment> {
        shift(&self.end_from_start(start)?, TICK)
    }
}

/// The closed set of period types a limit can be measured against.
///
/// Serializes as its reference string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CalendarPeriodType {
    /// Calendar or rolling year.
    Year(Year),
    /// Calendar or rolling month.
    Month(Month),
    /// Monday-based week.
    Week(Week),
    /// One or more days.
    Day(Day),
}

impl CalendarPeriodType {
    /// One year.
    pub const YEAR: Self = Self::Year(Year);
    /// One month.
    pub const MONTH: Self = Self::Month(Month);
    /// One week.
    pub const WEEK: Self = Self::Week(Week);
    /// One day.
    pub const DAY: Self = Self::Day(Day::ONE);
    /// Two days.
    pub const DAY_X2: Self = Self::Day(Day::TWO);
    /// Ten days.
    pub const DAY_X10: Self = Self::Day(Day::TEN);

    /// The unscaled period types.
    pub fn all() -> [Self; 4] {
        [Self::YEAR, Self::MONTH, Self::WEEK, Self::DAY]
    }

    /// A period of `factor` days.
    pub fn days(factor: u32) -> std::result::Result<Self, ConstructionError> {
        Ok(Self::Day(Day::new(factor)?))
    }

    fn unit(&self) -> &dyn CalendarUnit {
        match self {
            Self::Year(unit) => unit,
            Self::Month(unit) => unit,
            Self::Week(unit) => unit,
            Self::Day(unit) => unit,
        }
    }

    /// Reference name: the base name, with `_x<factor>` when scaled.
    pub fn reference(&self) -> String {
        match self.factor() {
            1 => self.ref_base().to_string(),
            factor => format!("{}_x{factor}", self.ref_base()),
        }
    }

    /// Decode a period reference such as `month` or `day_x10`.
    pub fn from_reference(reference: &str) -> Result<Self> {
        Ok(reference::parse_period_type(reference)?)
    }

    /// Words describing this period, e.g. "calendar day" / "per calendar day".
    pub fn for_user_text(&self, is_calendar: bool) -> PeriodText {
        let title = self.title();
        let calendar = if is_calendar { "calendar " } else { "" };
        let nominative = match self.factor() {
            1 => format!("{calendar}{}", title.singular),
            factor => format!("{factor} {calendar}{}", title.plural),
        };
        PeriodText {
            per: format!("per {nominative}"),
            nominative,
        }
    }

    /// The calendar-aligned window containing `moment`.
    pub fn calendarian_period_for_moment(&self, moment: &Moment) -> Result<CalendarPeriod> {
        Ok(CalendarPeriod::new(
            self.calendar_aligned_start(moment)?,
            self.calendar_aligned_end(moment)?,
            *self,
        ))
    }

    /// The window that starts at `start`.
    pub fn period_starting_at(&self, start: &Moment) -> Result<CalendarPeriod> {
        Ok(CalendarPeriod::new(*start, self.end_from_start(start)?, *self))
    }

    /// The window that ends at `end`.
    pub fn period_ending_at(&self, end: &Moment) -> Result<CalendarPeriod> {
        Ok(CalendarPeriod::new(self.start_from_end(end)?, *end, *self))
    }

    /// The window containing `now` in the sequence of consecutive windows
    /// starting at `anchor`.
    ///
    /// Walks forward one window at a time, so each window starts one tick
    /// after the previous (possibly clamped) end. A 2024-01-31 monthly
    /// anchor therefore continues on the 29th of every later month.
    ///
    /// Cost is linear in the number of windows between `anchor` and `now`,
    /// with a `trace!` event per step. A daily anchor ten years back walks
    /// about 3650 windows; there is no cap.
    pub fn current_period_from_anchor(&self, anchor: &Moment, now: &Moment) -> Result<CalendarPeriod> {
        if anchor > now {
            return Err(QuotaError::AnchorAfterControl {
                anchor: *anchor,
                control: *now,
            });
        }

        let mut start = *anchor;
        let mut steps: u64 = 0;
        loop {
            let next = self.next_start_from_current_start(&start)?;
            if next > *now {
                debug!(period_type = %self, %anchor, %start, steps, "resolved anchored window");
                return self.period_starting_at(&start);
            }
            trace!(period_type = %self, %next, "advancing anchored window");
            start = next;
            steps += 1;
        }
    }
}

impl CalendarUnit for CalendarPeriodType {
    fn ref_base(&self) -> &'static str {
        self.unit().ref_base()
    }

    fn factor(&self) -> u32 {
        self.unit().factor()
    }

    fn title(&self) -> WordForms {
        self.unit().title()
    }

    fn calendar_aligned_start(&self, point: &Moment) -> Result<Moment> {
        self.unit().calendar_aligned_start(point)
    }

    fn calendar_aligned_end(&self, point: &Moment) -> Result<Moment> {
        self.unit().calendar_aligned_end(point)
    }

    fn end_from_start(&self, start: &Moment) -> Result<Moment> {
        self.unit().end_from_start(start)
    }

    fn start_from_end(&self, end: &Moment) -> Result<Moment> {
        self.unit().start_from_end(end)
    }
}

impl fmt::Display for CalendarPeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reference())
    }
}

impl FromStr for CalendarPeriodType {
    type Err = QuotaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_reference(s)
    }
}

impl TryFrom<String> for CalendarPeriodType {
    type Error = QuotaError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_reference(&value)
    }
}

impl From<CalendarPeriodType> for String {
    fn from(value: CalendarPeriodType) -> Self {
        value.reference()
    }
}

/// Display words for a period type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodText {
    /// "calendar month", "10 days".
    pub nominative: String,
    /// "per calendar month", "per 10 days".
    pub per: String,
}

pub(crate) fn shift(moment: &Moment, delta: TimeDelta) -> Result<Moment> {
    moment
        .checked_add_signed(delta)
        .ok_or_else(|| QuotaError::out_of_range(format!("{moment} + {delta}")))
}

pub(crate) fn add_months(moment: &Moment, months: u32) -> Result<Moment> {
    moment
        .checked_add_months(Months::new(months))
        .ok_or_else(|| QuotaError::out_of_range(format!("{moment} + {months} months")))
}

pub(crate) fn sub_months(moment: &Moment, months: u32) -> Result<Moment> {
    moment
        .checked_sub_months(Months::new(months))
        .ok_or_else(|| QuotaError::out_of_range(format!("{moment} - {months} months")))
}

pub(crate) fn start_of_day(date: NaiveDate, offset: FixedOffset) -> Result<Moment> {
    localize(date.and_time(NaiveTime::MIN), offset)
}
