//! Groups of limits evaluated together.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConstructionError, QuotaError, Result};
use crate::fetcher::CountSource;
use crate::limit::Limit;
use crate::period::{Moment, Period};
use crate::reference;
use crate::state::LimitSetState;

const SEPARATOR: &str = ",";

/// A non-empty set of limits, e.g. a daily and a monthly cap at once.
///
/// Members are unique; iteration follows the order of their references,
/// which is also the order of [`LimitSet::reference`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LimitSet {
    items: BTreeMap<String, Limit>,
}

impl LimitSet {
    /// Create a set from `limits`, dropping duplicates.
    pub fn new(limits: impl IntoIterator<Item = Limit>) -> std::result::Result<Self, ConstructionError> {
        let items: BTreeMap<String, Limit> = limits
            .into_iter()
            .map(|limit| (limit.reference(), limit))
            .collect();
        if items.is_empty() {
            return Err(ConstructionError::EmptySet);
        }
        Ok(Self { items })
    }

    /// The set holding only [`Limit::UNLIMITED`].
    pub fn unlimited() -> Self {
        Self {
            items: BTreeMap::from([(Limit::UNLIMITED.reference(), Limit::UNLIMITED)]),
        }
    }

    /// Iterate over the members.
    pub fn iter(&self) -> impl Iterator<Item = &Limit> {
        self.items.values()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false; sets cannot be empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Check if `limit` is a member.
    pub fn contains(&self, limit: &Limit) -> bool {
        self.items.contains_key(&limit.reference())
    }

    /// Whether any member is a real limit.
    pub fn has_any_real_limit(&self) -> bool {
        self.iter().any(Limit::is_real_limit)
    }

    /// The span covering every member's reporting period at `moment`.
    ///
    /// `None` when no member has a reporting period.
    pub fn combined_reporting_period(&self, moment: &Moment) -> Result<Option<Period>> {
        self.combined_reporting_period_anchored(moment, None)
    }

    /// Like [`combined_reporting_period`](Self::combined_reporting_period),
    /// with rolling members anchored at `anchor`.
    pub fn combined_reporting_period_anchored(
        &self,
        moment: &Moment,
        anchor: Option<&Moment>,
    ) -> Result<Option<Period>> {
        let mut periods = Vec::with_capacity(self.len());
        for limit in self.iter() {
            if let Some(period) = limit.reporting_period_for_anchored(moment, anchor)? {
                periods.push(period.period());
            }
        }
        Ok(Period::union(&periods))
    }

    /// Sorted, comma-joined member references.
    pub fn reference(&self) -> String {
        self.items.keys().map(String::as_str).collect::<Vec<_>>().join(SEPARATOR)
    }

    /// Decode a set reference such as `10-day-cal,100-month-cal`.
    pub fn from_reference(reference: &str) -> Result<Self> {
        let limits = reference::parse_limit_set(reference)?;
        Ok(Self::new(limits)?)
    }

    /// State of this set at `control_instant`.
    pub fn state<'a>(&'a self, control_instant: Moment, source: CountSource<'a>) -> LimitSetState<'a> {
        LimitSetState::new(self, control_instant, source)
    }
}

impl<'a> IntoIterator for &'a LimitSet {
    type Item = &'a Limit;
    type IntoIter = std::collections::btree_map::Values<'a, String, Limit>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.values()
    }
}

impl fmt::Display for LimitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reference())
    }
}

impl FromStr for LimitSet {
    type Err = QuotaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_reference(s)
    }
}

impl TryFrom<String> for LimitSet {
    type Error = QuotaError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_reference(&value)
    }
}

impl From<LimitSet> for String {
    fn from(value: LimitSet) -> Self {
        value.reference()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::CalendarPeriodType;
    use chrono::DateTime;

    fn at(s: &str) -> Moment {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn day_and_month() -> LimitSet {
        LimitSet::new([Limit::DAY_10_CAL, Limit::MONTH_100_CAL]).unwrap()
    }

    #[test]
    fn test_empty_set_rejected() {
        assert_eq!(LimitSet::new([]), Err(ConstructionError::EmptySet));
    }

    #[test]
    fn test_members_are_unique() {
        let set = LimitSet::new([Limit::DAY_10_CAL, Limit::DAY_10_CAL, Limit::MONTH_100_CAL]).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&Limit::DAY_10_CAL));
        assert!(!set.contains(&Limit::MONTH_150_CAL));
    }

    #[test]
    fn test_reference_is_sorted() {
        let set = LimitSet::new([Limit::MONTH_100_CAL, Limit::DAY_10_CAL]).unwrap();
        assert_eq!(set.reference(), "10-day-cal,100-month-cal");
        assert_eq!(set, day_and_month());

        let decoded = LimitSet::from_reference("100-month-cal,10-day-cal").unwrap();
        assert_eq!(decoded, set);
    }

    #[test]
    fn test_has_any_real_limit() {
        assert!(day_and_month().has_any_real_limit());
        assert!(!LimitSet::unlimited().has_any_real_limit());
        assert!(!LimitSet::new([Limit::DISABLED, Limit::UNLIMITED]).unwrap().has_any_real_limit());
    }

    #[test]
    fn test_combined_reporting_period() {
        let now = at("2024-01-25T12:30:12.987654+03:00");
        let combined = day_and_month().combined_reporting_period(&now).unwrap().unwrap();
        assert_eq!(combined.start(), Some(at("2024-01-01T00:00:00+03:00")));
        assert_eq!(combined.end(), Some(at("2024-01-31T23:59:59.999999+03:00")));

        let rolling = LimitSet::new([
            Limit::DAY_10_CAL,
            Limit::rolling(5, CalendarPeriodType::WEEK).unwrap(),
        ])
        .unwrap();
        let combined = rolling.combined_reporting_period(&now).unwrap().unwrap();
        assert_eq!(combined.start(), Some(at("2024-01-18T12:30:12.987655+03:00")));
        assert_eq!(combined.end(), Some(at("2024-01-25T23:59:59.999999+03:00")));

        assert_eq!(LimitSet::unlimited().combined_reporting_period(&now).unwrap(), None);
    }

    #[test]
    fn test_serde_as_reference() {
        #[derive(Deserialize)]
        struct Plan {
            limits: LimitSet,
        }

        let plan: Plan = serde_json::from_str(r#"{"limits": "100-month-cal,10-day-cal"}"#).unwrap();
        assert_eq!(plan.limits, day_and_month());
        assert_eq!(
            serde_json::to_string(&plan.limits).unwrap(),
            "\"10-day-cal,100-month-cal\""
        );
    }
}
