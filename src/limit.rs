//! Count-per-period limits.
//!
//! A [`Limit`] caps how many events may happen within a reporting period.
//! Besides real caps there are two reserved states: *unlimited* (no ceiling)
//! and *disabled* (nothing is ever available).
//!
//! # Examples
//!
//! ```ignore
//! use calendar_quota::{Limit, CalendarPeriodType};
//!
//! // 10 per calendar day
//! let daily = Limit::per_calendar(10, CalendarPeriodType::DAY)?;
//! assert_eq!(daily.reference(), "10-day-cal");
//!
//! // 100 per rolling month, decoded from configuration
//! let monthly: Limit = "100-month".parse()?;
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::calendar::CalendarPeriodType;
use crate::error::{ConstructionError, QuotaError, Result};
use crate::fetcher::CountSource;
use crate::period::{CalendarPeriod, Moment};
use crate::reference;
use crate::state::LimitState;
use crate::unit::DisplayUnit;

const UNLIMITED_REF: &str = "unlimited";
const DISABLED_REF: &str = "disabled";

/// Three-way classification of a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitKind {
    /// At most this many events per period.
    Real(u64),
    /// No ceiling.
    Unlimited,
    /// Nothing is available.
    Disabled,
}

/// Limit for a count per calendar period.
///
/// Built through [`Limit::try_new`], the convenience constructors, the
/// [`LimitBuilder`], or decoded from a reference string. Equality is over all
/// fields; the reference string is a lossless encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Limit {
    limit: Option<u64>,
    period_type: Option<CalendarPeriodType>,
    is_calendar_aligned: Option<bool>,
    unit: DisplayUnit,
}

impl Limit {
    /// Nothing is ever available.
    pub const DISABLED: Limit = Limit {
        limit: None,
        period_type: None,
        is_calendar_aligned: None,
        unit: DisplayUnit::Item,
    };

    /// No ceiling.
    pub const UNLIMITED: Limit = Limit {
        limit: Some(0),
        period_type: None,
        is_calendar_aligned: None,
        unit: DisplayUnit::Item,
    };

    /// 10 per calendar day.
    pub const DAY_10_CAL: Limit = Limit::calendar_const(10, CalendarPeriodType::DAY);

    /// 100 per calendar month.
    pub const MONTH_100_CAL: Limit = Limit::calendar_const(100, CalendarPeriodType::MONTH);

    /// 150 per calendar month.
    pub const MONTH_150_CAL: Limit = Limit::calendar_const(150, CalendarPeriodType::MONTH);

    const fn calendar_const(count: u64, period_type: CalendarPeriodType) -> Limit {
        Limit {
            limit: Some(count),
            period_type: Some(period_type),
            is_calendar_aligned: Some(true),
            unit: DisplayUnit::Item,
        }
    }

    /// Create a limit, checking that the fields describe one of the three
    /// states.
    ///
    /// * real limit: `limit > 0` with a period type and an alignment flag
    /// * unlimited: `limit == 0`, no period type, no alignment flag
    /// * disabled: no limit, no period type, no alignment flag
    ///
    /// Unlimited and disabled limits must use the default unit.
    pub fn try_new(
        limit: Option<u64>,
        period_type: Option<CalendarPeriodType>,
        is_calendar_aligned: Option<bool>,
        unit: DisplayUnit,
    ) -> std::result::Result<Self, ConstructionError> {
        match limit {
            Some(count) if count > 0 => {
                if period_type.is_none() {
                    return Err(ConstructionError::MissingPeriodType(count));
                }
                if is_calendar_aligned.is_none() {
                    return Err(ConstructionError::MissingAlignment(count));
                }
            }
            sentinel => {
                let state = if sentinel.is_some() { UNLIMITED_REF } else { DISABLED_REF };
                if period_type.is_some() || is_calendar_aligned.is_some() {
                    return Err(ConstructionError::UnexpectedPeriod(state));
                }
                if !unit.is_default() {
                    return Err(ConstructionError::UnexpectedUnit(state));
                }
            }
        }

        Ok(Self {
            limit,
            period_type,
            is_calendar_aligned,
            unit,
        })
    }

    /// `count` events per calendar-aligned period.
    pub fn per_calendar(count: u64, period_type: CalendarPeriodType) -> std::result::Result<Self, ConstructionError> {
        Self::try_new(Some(count), Some(period_type), Some(true), DisplayUnit::default())
    }

    /// `count` events per rolling period.
    pub fn rolling(count: u64, period_type: CalendarPeriodType) -> std::result::Result<Self, ConstructionError> {
        Self::try_new(Some(count), Some(period_type), Some(false), DisplayUnit::default())
    }

    /// The same limit counted in `unit`.
    pub fn with_unit(self, unit: DisplayUnit) -> std::result::Result<Self, ConstructionError> {
        Self::try_new(self.limit, self.period_type, self.is_calendar_aligned, unit)
    }

    /// Create a new limit builder.
    pub fn builder() -> LimitBuilder {
        LimitBuilder::new()
    }

    /// The raw limit value: positive for a real limit, `0` when unlimited,
    /// `None` when disabled.
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// The period the limit is measured against.
    pub fn period_type(&self) -> Option<CalendarPeriodType> {
        self.period_type
    }

    /// Whether periods snap to calendar boundaries.
    pub fn is_calendar_aligned(&self) -> Option<bool> {
        self.is_calendar_aligned
    }

    /// What the limit counts.
    pub fn unit(&self) -> DisplayUnit {
        self.unit
    }

    /// Classify the limit.
    pub fn kind(&self) -> LimitKind {
        match self.limit {
            None => LimitKind::Disabled,
            Some(0) => LimitKind::Unlimited,
            Some(count) => LimitKind::Real(count),
        }
    }

    /// A positive cap.
    pub fn is_real_limit(&self) -> bool {
        matches!(self.kind(), LimitKind::Real(_))
    }

    /// No ceiling.
    pub fn is_unlimited(&self) -> bool {
        self.kind() == LimitKind::Unlimited
    }

    /// Nothing available.
    pub fn is_disabled(&self) -> bool {
        self.kind() == LimitKind::Disabled
    }

    /// Canonical reference: `unlimited`, `disabled` or
    /// `<limit>[unit]-<period>[-cal]`.
    pub fn reference(&self) -> String {
        match (self.kind(), self.period_type) {
            (LimitKind::Real(count), Some(period_type)) => {
                let unit = if self.unit.is_default() { "" } else { self.unit.short_code() };
                let calendar = if self.is_calendar_aligned == Some(true) { "-cal" } else { "" };
                format!("{count}{unit}-{period_type}{calendar}")
            }
            (LimitKind::Unlimited, _) => UNLIMITED_REF.to_string(),
            _ => DISABLED_REF.to_string(),
        }
    }

    /// Decode a reference string.
    pub fn from_reference(reference: &str) -> Result<Self> {
        Ok(reference::parse_limit(reference)?)
    }

    /// The window consumption is measured in at `moment`.
    ///
    /// `None` for unlimited and disabled limits. Calendar-aligned limits use
    /// the calendar window containing `moment`; rolling limits use the window
    /// ending at `moment`.
    pub fn reporting_period_for(&self, moment: &Moment) -> Result<Option<CalendarPeriod>> {
        self.reporting_period_for_anchored(moment, None)
    }

    /// Like [`reporting_period_for`](Self::reporting_period_for), but a rolling
    /// limit with an `anchor` uses the anchored window containing `moment`
    /// (e.g. periods counted from a subscription start).
    pub fn reporting_period_for_anchored(
        &self,
        moment: &Moment,
        anchor: Option<&Moment>,
    ) -> Result<Option<CalendarPeriod>> {
        let Some(period_type) = self.period_type.filter(|_| self.is_real_limit()) else {
            return Ok(None);
        };

        let period = match (self.is_calendar_aligned, anchor) {
            (Some(true), _) => period_type.calendarian_period_for_moment(moment)?,
            (_, Some(anchor)) => period_type.current_period_from_anchor(anchor, moment)?,
            (_, None) => period_type.period_ending_at(moment)?,
        };
        Ok(Some(period))
    }

    /// Human-readable description, e.g. "10 items per calendar day".
    pub fn as_plain_text(&self) -> String {
        match (self.kind(), self.period_type) {
            (LimitKind::Real(count), Some(period_type)) => {
                let period = period_type.for_user_text(self.is_calendar_aligned == Some(true));
                format!("{count} {} {}", self.unit.words().for_count(count), period.per)
            }
            (LimitKind::Unlimited, _) => "Unlimited".to_string(),
            _ => "Not available".to_string(),
        }
    }

    /// State of this limit at `control_instant`.
    pub fn state<'a>(&'a self, control_instant: Moment, source: CountSource<'a>) -> LimitState<'a> {
        LimitState::new(self, control_instant, source)
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reference())
    }
}

impl FromStr for Limit {
    type Err = QuotaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_reference(s)
    }
}

impl TryFrom<String> for Limit {
    type Error = QuotaError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_reference(&value)
    }
}

impl From<Limit> for String {
    fn from(value: Limit) -> Self {
        value.reference()
    }
}

/// Builder for creating limits with validation.
#[derive(Debug, Default)]
pub struct LimitBuilder {
    limit: Option<Option<u64>>,
    period_type: Option<CalendarPeriodType>,
    is_calendar_aligned: Option<bool>,
    unit: DisplayUnit,
}

impl LimitBuilder {
    /// Create a new limit builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the count per period; `0` means unlimited.
    pub fn limit(mut self, count: u64) -> Self {
        self.limit = Some(Some(count));
        self
    }

    /// Build an unlimited limit.
    pub fn unlimited(self) -> Self {
        self.limit(0)
    }

    /// Build a disabled limit.
    pub fn disabled(mut self) -> Self {
        self.limit = Some(None);
        self
    }

    /// Set the period type.
    pub fn period_type(mut self, period_type: CalendarPeriodType) -> Self {
        self.period_type = Some(period_type);
        self
    }

    /// Set calendar alignment.
    pub fn calendar_aligned(mut self, is_calendar_aligned: bool) -> Self {
        self.is_calendar_aligned = Some(is_calendar_aligned);
        self
    }

    /// Set the display unit.
    pub fn unit(mut self, unit: DisplayUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Build the limit, returning an error if the fields are inconsistent.
    pub fn build(self) -> Result<Limit> {
        let limit = self.limit.ok_or(ConstructionError::MissingRequired("limit"))?;
        Ok(Limit::try_new(limit, self.period_type, self.is_calendar_aligned, self.unit)?)
    }
}
