//! Integration tests for limits, limit sets and their reference strings.

use calendar_quota::{
    CalendarPeriodType, ConstructionError, DecodeErrorKind, DisplayUnit, Limit, LimitSet, QuotaError,
};
use serde::Deserialize;
use tracing_test::traced_test;

fn sample_limits() -> Vec<Limit> {
    let mut limits = vec![Limit::UNLIMITED, Limit::DISABLED];
    let period_types = [
        CalendarPeriodType::YEAR,
        CalendarPeriodType::MONTH,
        CalendarPeriodType::WEEK,
        CalendarPeriodType::DAY,
        CalendarPeriodType::DAY_X2,
        CalendarPeriodType::days(30).unwrap(),
    ];
    let counts = [1, 10, 150, 4_000_000];
    for (period_type, count) in period_types.into_iter().zip(counts.into_iter().cycle()) {
        for unit in DisplayUnit::all() {
            limits.push(Limit::per_calendar(count, period_type).unwrap().with_unit(unit).unwrap());
            limits.push(Limit::rolling(count, period_type).unwrap().with_unit(unit).unwrap());
        }
    }
    limits
}

#[test]
fn test_limit_reference_round_trip() {
    for limit in sample_limits() {
        let decoded = Limit::from_reference(&limit.reference()).unwrap();
        assert_eq!(decoded, limit, "{limit}");
    }
}

#[test]
fn test_reference_examples() {
    let daily = Limit::from_reference("10-day-cal").unwrap();
    assert_eq!(daily, Limit::DAY_10_CAL);
    assert_eq!(daily.as_plain_text(), "10 items per calendar day");

    let monthly = Limit::from_reference("100-month").unwrap();
    assert_eq!(monthly.is_calendar_aligned(), Some(false));
    assert_eq!(monthly.as_plain_text(), "100 items per month");

    let explicit = Limit::from_reference("10i-day-cal").unwrap();
    assert_eq!(explicit, Limit::DAY_10_CAL);

    let reports = Limit::from_reference("5r-day_x10").unwrap();
    assert_eq!(reports.unit(), DisplayUnit::Report);
    assert_eq!(reports.as_plain_text(), "5 reports per 10 days");

    assert!(Limit::from_reference("unlimited").unwrap().is_unlimited());
    assert!(Limit::from_reference("disabled").unwrap().is_disabled());
}

#[test]
fn test_parsing_ignores_case() {
    assert_eq!(Limit::from_reference("10-DAY-Cal").unwrap(), Limit::DAY_10_CAL);
    assert_eq!(Limit::from_reference("Unlimited").unwrap(), Limit::UNLIMITED);
}

#[test]
fn test_malformed_references_fail() {
    let inputs = [
        "",
        "10",
        "10-",
        "-day",
        "10-day-",
        "10-day-calendar",
        "10-fortnight",
        "10kg-day",
        "10-month_x2",
        "10-day_x0",
        "10 day",
        "unlimited-day",
        "99999999999999999999999-day",
    ];
    for input in inputs {
        let err = Limit::from_reference(input).unwrap_err();
        assert!(matches!(err, QuotaError::Decode(_)), "{input:?}: {err}");
    }
}

#[test]
fn test_decode_error_is_structured() {
    let Err(QuotaError::Decode(err)) = Limit::from_reference("10-fortnight") else {
        panic!("expected a decode error");
    };
    assert_eq!(err.input, "10-fortnight");
    assert_eq!(err.offset, 3);
    assert_eq!(err.kind, DecodeErrorKind::UnknownPeriod("fortnight".to_string()));
}

#[test]
fn test_zero_count_with_period_is_inconsistent() {
    let Err(QuotaError::Decode(err)) = Limit::from_reference("0-day") else {
        panic!("expected a decode error");
    };
    assert!(matches!(err.kind, DecodeErrorKind::Inconsistent(_)));
}

#[traced_test]
#[test]
fn test_decode_failure_is_logged() {
    assert!(Limit::from_reference("10-fortnight").is_err());
    assert!(logs_contain("rejected reference"));
}

#[test]
fn test_construction_errors_surface() {
    assert_eq!(
        Limit::try_new(Some(10), None, None, DisplayUnit::Item),
        Err(ConstructionError::MissingPeriodType(10))
    );
    assert_eq!(
        Limit::DISABLED.with_unit(DisplayUnit::ConventionalUnit),
        Err(ConstructionError::UnexpectedUnit("disabled"))
    );

    let err = Limit::builder().build().unwrap_err();
    assert!(matches!(err, QuotaError::Construction(ConstructionError::MissingRequired("limit"))));
}

#[test]
fn test_limit_set_reference_round_trip() {
    let limits = sample_limits();
    for window in limits.windows(3) {
        let set = LimitSet::new(window.iter().copied()).unwrap();
        assert_eq!(LimitSet::from_reference(&set.reference()).unwrap(), set);
    }

    let everything = LimitSet::new(limits).unwrap();
    assert_eq!(LimitSet::from_reference(&everything.reference()).unwrap(), everything);
}

#[test]
fn test_limit_set_reference_is_sorted() {
    let set = LimitSet::from_reference("100-month-cal,disabled,10-day-cal").unwrap();
    assert_eq!(set.reference(), "10-day-cal,100-month-cal,disabled");
    assert_eq!(set.len(), 3);
}

#[test]
fn test_limit_set_rejects_bad_member() {
    assert!(LimitSet::from_reference("10-day-cal,,100-month").is_err());
    assert!(LimitSet::from_reference("10-day-cal,bogus").is_err());
    assert!(LimitSet::from_reference("").is_err());
}

#[test]
fn test_limits_from_configuration() {
    #[derive(Deserialize)]
    struct Plan {
        name: String,
        limits: LimitSet,
        fallback: Limit,
    }

    let plan: Plan = serde_json::from_str(
        r#"{"name": "basic", "limits": "10-day-cal,100-month-cal", "fallback": "disabled"}"#,
    )
    .unwrap();
    assert_eq!(plan.name, "basic");
    assert!(plan.limits.contains(&Limit::DAY_10_CAL));
    assert!(plan.limits.contains(&Limit::MONTH_100_CAL));
    assert_eq!(plan.fallback, Limit::DISABLED);

    let bad = serde_json::from_str::<Plan>(r#"{"name": "x", "limits": "10-day-cal", "fallback": "none"}"#);
    assert!(bad.is_err());
}
