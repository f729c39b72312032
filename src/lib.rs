//! Calendar periods and count-per-period quota limits.
//!
//! `calendar_quota` provides:
//!
//! - **Periods**: open or closed time intervals with containment and span union
//! - **Period Types**: year, month, week and (scaled) day windows, calendar-aligned,
//!   rolling or walked forward from an anchor, with month-end and leap-year clamping
//! - **Limits**: "at most N per period" caps plus unlimited and disabled states,
//!   encoded as compact reference strings such as `10-day-cal`
//! - **Limit Sets**: several caps evaluated together
//! - **State Reports**: spent, balance and percentages at a control instant, from a
//!   literal count or a caller-supplied fetcher
//!
//! # Quick Start
//!
//! ```ignore
//! use calendar_quota::prelude::*;
//!
//! let limits: LimitSet = "10-day-cal,100-month-cal".parse()?;
//! let fetcher = |period: &Period| -> Result<u64, FetchError> { Ok(store.count(period)?) };
//!
//! let report = limits.state(now, CountSource::fetcher(&fetcher)).report()?;
//! if report.any_limit_exceeded {
//!     println!("Quota exhausted");
//! }
//! println!("{}", report.as_plain_text(&RenderOptions::default())?);
//! ```
//!
//! # Reference Strings
//!
//! | Reference | Meaning |
//! |-----------|---------|
//! | `10-day-cal` | 10 items per calendar day |
//! | `100-month` | 100 items per rolling month |
//! | `5r-day_x10` | 5 reports per rolling 10 days |
//! | `unlimited` | no ceiling |
//! | `disabled` | nothing available |
//!
//! The engine performs no I/O and holds no shared state; every call is
//! independent and safe to run concurrently.

pub mod calendar;
pub mod error;
pub mod fetcher;
pub mod limit;
pub mod limit_set;
pub mod period;
pub mod render;
pub mod state;
pub mod unit;

mod reference;

// Re-export main types
pub use calendar::{CalendarPeriodType, CalendarUnit, Day, Month, PeriodText, Week, Year};
pub use error::{ConstructionError, DecodeError, DecodeErrorKind, FetchError, QuotaError, Result};
pub use fetcher::{AsyncCountFetcher, CountFetcher, CountSource};
pub use limit::{Limit, LimitBuilder, LimitKind};
pub use limit_set::LimitSet;
pub use period::{combine_periods, CalendarPeriod, Moment, Period, TICK};
pub use render::RenderOptions;
pub use state::{LimitSetState, LimitSetStateReport, LimitState, LimitStateReport};
pub use unit::{DisplayUnit, WordForms};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::calendar::{CalendarPeriodType, CalendarUnit};
    pub use crate::error::{FetchError, QuotaError, Result};
    pub use crate::fetcher::{AsyncCountFetcher, CountFetcher, CountSource};
    pub use crate::limit::Limit;
    pub use crate::limit_set::LimitSet;
    pub use crate::period::{Moment, Period};
    pub use crate::render::RenderOptions;
    pub use crate::unit::DisplayUnit;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn at(s: &str) -> Moment {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn test_integration_daily_quota() {
        use crate::prelude::*;

        let limit: Limit = "10-day-cal".parse().unwrap();
        let fetcher = |_: &Period| -> std::result::Result<u64, FetchError> { Ok(4) };
        let report = limit
            .state(at("2024-11-29T20:36:20.123456+03:00"), CountSource::fetcher(&fetcher))
            .report()
            .unwrap();

        assert_eq!(report.spent_percentage, Some(40));
        assert_eq!(report.balance, Some(6));
        assert_eq!(report.balance_percentage, Some(60));
        assert_eq!(report.period_start, Some(at("2024-11-29T00:00:00+03:00")));
        assert_eq!(report.period_end, Some(at("2024-11-29T23:59:59.999999+03:00")));
    }

    #[test]
    fn test_integration_set_exceeded() {
        let set = LimitSet::from_reference("10-day-cal,100-month-cal").unwrap();
        let now = at("2024-11-29T20:36:20.123456+03:00");

        assert!(!set.state(now, CountSource::Spent(4)).any_limit_exceeded().unwrap());
        assert!(set.state(now, CountSource::Spent(12)).any_limit_exceeded().unwrap());
    }

    #[test]
    fn test_integration_report_json() {
        let limit = Limit::UNLIMITED;
        let report = limit
            .state(at("2024-11-29T20:36:20+03:00"), CountSource::Spent(3))
            .report()
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(json["reference"], "unlimited");
        assert_eq!(json["balance"], serde_json::Value::Null);
        assert_eq!(json["period_start"], serde_json::Value::Null);
        assert_eq!(json["is_positive_balance"], true);
    }
}
