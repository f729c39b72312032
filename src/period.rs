//! Time periods.
//!
//! A [`Period`] is an interval of civil time that may be open on either end.
//! Periods are plain values: they are never mutated, and combining them with
//! [`Period::union`] produces a new period spanning all inputs.
//!
//! # Examples
//!
//! ```ignore
//! use calendar_quota::{Period, CalendarPeriodType};
//!
//! let day = CalendarPeriodType::DAY.calendarian_period_for_moment(now)?;
//! let month = CalendarPeriodType::MONTH.calendarian_period_for_moment(now)?;
//!
//! // The span covering both windows, which here is the month.
//! let widest = Period::union(&[day.period(), month.period()]).unwrap();
//! ```

use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone};
use serde::{Deserialize, Serialize};

use crate::calendar::CalendarPeriodType;
use crate::error::{DecodeError, DecodeErrorKind, QuotaError, Result};
use crate::render::RenderOptions;

/// A civil instant with its UTC offset carried through every computation.
pub type Moment = DateTime<FixedOffset>;

/// Smallest step between two windows: the end of one window is the start of
/// the next minus one tick.
pub const TICK: TimeDelta = TimeDelta::microseconds(1);

const INFINITY_REF: &str = "infinity";
const FROM_PREFIX: &str = "from-";
const TO_PREFIX: &str = "to-";
const TO_SEPARATOR: &str = "-to-";

/// Arbitrary time period, possibly open on either end.
///
/// Equality is by the `(start, end)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Period {
    start: Option<Moment>,
    end: Option<Moment>,
}

impl Period {
    /// The unbounded period.
    pub const INFINITY: Period = Period {
        start: None,
        end: None,
    };

    /// Create a period from optional bounds.
    pub fn new(start: Option<Moment>, end: Option<Moment>) -> Self {
        Self { start, end }
    }

    /// Create a period with both bounds present.
    pub fn closed(start: Moment, end: Moment) -> Self {
        Self::new(Some(start), Some(end))
    }

    /// Create a period that starts at `start` and never ends.
    pub fn starting(start: Moment) -> Self {
        Self::new(Some(start), None)
    }

    /// Create a period with no start that ends at `end`.
    pub fn ending(end: Moment) -> Self {
        Self::new(None, Some(end))
    }

    /// Get the start bound.
    pub fn start(&self) -> Option<Moment> {
        self.start
    }

    /// Get the end bound.
    pub fn end(&self) -> Option<Moment> {
        self.end
    }

    /// Check if `point` lies before the start of this period.
    pub fn starts_after(&self, point: &Moment) -> bool {
        self.start.is_some_and(|start| *point < start)
    }

    /// Check if `point` lies after the end of this period.
    pub fn ends_before(&self, point: &Moment) -> bool {
        self.end.is_some_and(|end| *point > end)
    }

    /// Check if `point` lies within this period, bounds included.
    pub fn contains(&self, point: &Moment) -> bool {
        !self.starts_after(point) && !self.ends_before(point)
    }

    /// Neither bound is present.
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Both bounds are present.
    pub fn is_closed(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    /// Only the end bound is present.
    pub fn is_left_open(&self) -> bool {
        self.start.is_none() && self.end.is_some()
    }

    /// Only the start bound is present.
    pub fn is_right_open(&self) -> bool {
        self.start.is_some() && self.end.is_none()
    }

    /// Length of a closed period.
    pub fn duration(&self) -> Option<TimeDelta> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// The span of all `periods`: earliest start to latest end.
    ///
    /// A missing bound on any input makes that bound missing in the result.
    /// The result may cover gaps that no input covers. Returns `None` for an
    /// empty input.
    pub fn union<'a, I>(periods: I) -> Option<Period>
    where
        I: IntoIterator<Item = &'a Period>,
    {
        let mut iter = periods.into_iter();
        let first = *iter.next()?;

        Some(iter.fold(first, |acc, period| Period {
            start: match (acc.start, period.start) {
                (Some(a), Some(b)) => Some(a.min(b)),
                _ => None,
            },
            end: match (acc.end, period.end) {
                (Some(a), Some(b)) => Some(a.max(b)),
                _ => None,
            },
        }))
    }

    /// Compact textual reference: `infinity`, `from-<ts>`, `to-<ts>` or
    /// `from-<ts>-to-<ts>`, timestamps in RFC 3339.
    pub fn reference(&self) -> String {
        match (self.start, self.end) {
            (None, None) => INFINITY_REF.to_string(),
            (None, Some(end)) => format!("{TO_PREFIX}{}", end.to_rfc3339()),
            (Some(start), None) => format!("{FROM_PREFIX}{}", start.to_rfc3339()),
            (Some(start), Some(end)) => format!(
                "{FROM_PREFIX}{}{TO_SEPARATOR}{}",
                start.to_rfc3339(),
                end.to_rfc3339()
            ),
        }
    }

    /// Decode a reference produced by [`Period::reference`].
    ///
    /// Timestamps are converted into `offset`. A timestamp without a time of
    /// day is the first instant of that date for a start bound and the last
    /// instant of that date for an end bound.
    pub fn from_reference(reference: &str, offset: FixedOffset) -> Result<Self> {
        if reference == INFINITY_REF {
            return Ok(Self::INFINITY);
        }

        if let Some(rest) = reference.strip_prefix(FROM_PREFIX) {
            return match rest.split_once(TO_SEPARATOR) {
                Some((start, end)) => {
                    let start = parse_bound(reference, start, offset, Bound::Start)?;
                    let end = parse_bound(reference, end, offset, Bound::End)?;
                    Ok(Self::closed(start, end))
                }
                None => Ok(Self::starting(parse_bound(reference, rest, offset, Bound::Start)?)),
            };
        }

        if let Some(rest) = reference.strip_prefix(TO_PREFIX) {
            return Ok(Self::ending(parse_bound(reference, rest, offset, Bound::End)?));
        }

        let kind = if reference.is_empty() {
            DecodeErrorKind::Empty
        } else {
            DecodeErrorKind::UnexpectedToken {
                expected: "`infinity`, `from-` or `to-`",
                found: reference.to_string(),
            }
        };
        Err(DecodeError::new(reference, 0, kind).into())
    }

    /// Human-readable text.
    ///
    /// Closed periods print the offset once, so both bounds must share it.
    pub fn as_plain_text(&self, options: &RenderOptions) -> Result<String> {
        let format = options.datetime_format.as_str();
        match (self.start, self.end) {
            (None, None) => Ok("unbounded".to_string()),
            (None, Some(end)) => Ok(format!(
                "through {} {}",
                format_moment(&end, format)?,
                end.offset()
            )),
            (Some(start), None) => Ok(format!(
                "from {} {}",
                format_moment(&start, format)?,
                start.offset()
            )),
            (Some(start), Some(end)) => {
                if start.offset() != end.offset() {
                    return Err(QuotaError::ZoneMismatch {
                        start: start.offset().to_string(),
                        end: end.offset().to_string(),
                    });
                }
                let start_text = format_moment(&start, format)?;
                let end_text = format_moment(&end, format)?;
                let body = if options.dash_if_closed {
                    format!("{start_text} – {end_text}")
                } else {
                    format!("from {start_text} through {end_text}")
                };
                Ok(format!("{body} ({})", start.offset()))
            }
        }
    }
}

/// Free-function form of [`Period::union`].
pub fn combine_periods<'a, I>(periods: I) -> Option<Period>
where
    I: IntoIterator<Item = &'a Period>,
{
    Period::union(periods)
}

/// A closed period produced by a [`CalendarPeriodType`].
///
/// Remembers which period type built it, so a calendar day can be told apart
/// from an arbitrary period that happens to have the same bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CalendarPeriod {
    start: Moment,
    end: Moment,
    period_type: CalendarPeriodType,
}

impl CalendarPeriod {
    pub(crate) fn new(start: Moment, end: Moment, period_type: CalendarPeriodType) -> Self {
        Self {
            start,
            end,
            period_type,
        }
    }

    /// First instant of the window.
    pub fn start(&self) -> Moment {
        self.start
    }

    /// Last instant of the window.
    pub fn end(&self) -> Moment {
        self.end
    }

    /// The period type that produced this window.
    pub fn period_type(&self) -> CalendarPeriodType {
        self.period_type
    }

    /// The plain period, without the period type.
    pub fn period(&self) -> Period {
        Period::closed(self.start, self.end)
    }

    /// Check if `point` lies within this window.
    pub fn contains(&self, point: &Moment) -> bool {
        self.start <= *point && *point <= self.end
    }
}

impl From<CalendarPeriod> for Period {
    fn from(value: CalendarPeriod) -> Self {
        value.period()
    }
}

impl PartialEq<Period> for CalendarPeriod {
    fn eq(&self, other: &Period) -> bool {
        self.period() == *other
    }
}

/// Render `moment` with a strftime-style `format`, rejecting bad specifiers
/// instead of panicking.
pub(crate) fn format_moment(moment: &Moment, format: &str) -> Result<String> {
    let mut out = String::new();
    write!(out, "{}", moment.format(format))
        .map_err(|_| QuotaError::InvalidFormat(format.to_string()))?;
    Ok(out)
}

/// Attach `offset` to a local wall-clock time.
pub(crate) fn localize(naive: NaiveDateTime, offset: FixedOffset) -> Result<Moment> {
    offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| QuotaError::out_of_range(naive))
}

#[derive(Clone, Copy)]
enum Bound {
    Start,
    End,
}

fn parse_bound(reference: &str, text: &str, offset: FixedOffset, bound: Bound) -> Result<Moment> {
    let at = reference.len() - text.len();
    let invalid = || DecodeError::new(reference, at, DecodeErrorKind::InvalidTimestamp(text.to_string()));

    if let Ok(moment) = DateTime::parse_from_rfc3339(text) {
        return Ok(moment.with_timezone(&offset));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return localize(naive, offset).map_err(|_| invalid().into());
    }
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| invalid())?;
    let time = match bound {
        Bound::Start => NaiveTime::MIN,
        Bound::End => last_instant_of_day(),
    };
    localize(date.and_time(time), offset).map_err(|_| invalid().into())
}

/// 23:59:59.999999, one tick before midnight.
pub(crate) fn last_instant_of_day() -> NaiveTime {
    NaiveTime::MIN - TICK
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> Moment {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn msk() -> FixedOffset {
        FixedOffset::east_opt(3 * 3600).unwrap()
    }

    #[test]
    fn test_contains_bounds_inclusive() {
        let period = Period::closed(at("2024-01-25T00:00:00+03:00"), at("2024-01-25T23:59:59.999999+03:00"));
        assert!(period.contains(&at("2024-01-25T00:00:00+03:00")));
        assert!(period.contains(&at("2024-01-25T23:59:59.999999+03:00")));
        assert!(!period.contains(&at("2024-01-26T00:00:00+03:00")));
        assert!(!period.contains(&at("2024-01-24T23:59:59.999999+03:00")));
    }

    #[test]
    fn test_open_periods() {
        let point = at("2024-01-25T12:00:00+03:00");
        assert!(Period::INFINITY.is_unbounded());
        assert!(Period::INFINITY.contains(&point));

        let from = Period::starting(point);
        assert!(from.is_right_open());
        assert!(from.contains(&at("2099-01-01T00:00:00+03:00")));
        assert!(from.starts_after(&at("2024-01-25T11:59:59+03:00")));

        let through = Period::ending(point);
        assert!(through.is_left_open());
        assert!(through.ends_before(&at("2024-01-25T12:00:01+03:00")));
        assert!(!through.is_closed());
        assert_eq!(through.duration(), None);
    }

    #[test]
    fn test_union_single_and_open() {
        let p = Period::closed(at("2024-01-25T10:00:00+03:00"), at("2024-01-25T23:00:00+03:00"));
        assert_eq!(Period::union([&p]), Some(p));
        assert_eq!(Period::union(std::iter::empty()), None);

        let open = Period::starting(at("2024-01-20T00:00:00+03:00"));
        let widest = Period::union([&p, &open]).unwrap();
        assert_eq!(widest.start(), Some(at("2024-01-20T00:00:00+03:00")));
        assert_eq!(widest.end(), None);
    }

    #[test]
    fn test_reference_round_trip() {
        let closed = Period::closed(at("2024-01-25T10:00:00+03:00"), at("2024-01-25T23:00:00.5+03:00"));
        for period in [Period::INFINITY, closed, Period::starting(at("2024-01-25T10:00:00+03:00")), Period::ending(at("2024-01-25T10:00:00+03:00"))] {
            let decoded = Period::from_reference(&period.reference(), msk()).unwrap();
            assert_eq!(decoded, period);
        }
    }

    #[test]
    fn test_reference_bare_dates() {
        let period = Period::from_reference("from-2024-01-01-to-2024-01-31", msk()).unwrap();
        assert_eq!(period.start(), Some(at("2024-01-01T00:00:00+03:00")));
        assert_eq!(period.end(), Some(at("2024-01-31T23:59:59.999999+03:00")));

        let through = Period::from_reference("to-2024-01-31", msk()).unwrap();
        assert_eq!(through.end(), Some(at("2024-01-31T23:59:59.999999+03:00")));

        let converted = Period::from_reference("from-2024-01-01T00:00:00+00:00", msk()).unwrap();
        assert_eq!(converted.start().unwrap().to_rfc3339(), "2024-01-01T03:00:00+03:00");
    }

    #[test]
    fn test_reference_rejects_garbage() {
        assert!(Period::from_reference("", msk()).is_err());
        assert!(Period::from_reference("since-2024-01-01", msk()).is_err());
        assert!(Period::from_reference("from-yesterday", msk()).is_err());
    }

    #[test]
    fn test_plain_text() {
        let options = RenderOptions::default();
        let closed = Period::closed(at("2024-01-25T00:00:00+03:00"), at("2024-01-25T23:59:59.999999+03:00"));
        assert_eq!(
            closed.as_plain_text(&options).unwrap(),
            "25.01.24 00:00:00 – 25.01.24 23:59:59 (+03:00)"
        );
        assert_eq!(Period::INFINITY.as_plain_text(&options).unwrap(), "unbounded");
        assert_eq!(
            Period::starting(at("2024-01-25T00:00:00+03:00")).as_plain_text(&options).unwrap(),
            "from 25.01.24 00:00:00 +03:00"
        );

        let options = RenderOptions::default().with_dash_if_closed(false);
        assert_eq!(
            closed.as_plain_text(&options).unwrap(),
            "from 25.01.24 00:00:00 through 25.01.24 23:59:59 (+03:00)"
        );
    }

    #[test]
    fn test_plain_text_zone_mismatch() {
        let mixed = Period::closed(at("2024-01-25T00:00:00+03:00"), at("2024-01-25T23:00:00+00:00"));
        let err = mixed.as_plain_text(&RenderOptions::default()).unwrap_err();
        assert!(matches!(err, QuotaError::ZoneMismatch { .. }));
    }
}
