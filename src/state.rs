//! Limit state at a control instant.
//!
//! States are thin views over a limit (or set), a control instant and a count
//! source. Every accessor recomputes from those inputs; nothing is cached.
//! [`LimitState::report`] and [`LimitSetState::report`] take one consistent
//! snapshot, fetching at most once per distinct reporting period.
//!
//! # Example
//!
//! ```ignore
//! use calendar_quota::{Limit, CountSource};
//!
//! let fetcher = |period: &Period| Ok(events.count_within(period));
//! let report = Limit::DAY_10_CAL
//!     .state(now, CountSource::fetcher(&fetcher))
//!     .report()?;
//!
//! if !report.is_positive_balance {
//!     return Err(QuotaExhausted);
//! }
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::calendar::CalendarPeriodType;
use crate::error::Result;
use crate::fetcher::{fetch, fetch_async, AsyncCountFetcher, CountSource};
use crate::limit::{Limit, LimitKind};
use crate::limit_set::LimitSet;
use crate::period::{format_moment, CalendarPeriod, Moment, Period};
use crate::render::{RenderOptions, Table};
use crate::unit::DisplayUnit;

const TABLE_HEADERS: [&str; 8] = [
    "Limit",
    "Reporting period",
    "As of",
    "Spent",
    "Available",
    "Spent, %",
    "Available, %",
    "Positive balance",
];

/// State of a single limit.
#[derive(Debug, Clone, Copy)]
pub struct LimitState<'a> {
    limit: &'a Limit,
    control_instant: Moment,
    source: CountSource<'a>,
    anchor: Option<Moment>,
}

impl<'a> LimitState<'a> {
    /// Create a state of `limit` at `control_instant`.
    pub fn new(limit: &'a Limit, control_instant: Moment, source: CountSource<'a>) -> Self {
        Self {
            limit,
            control_instant,
            source,
            anchor: None,
        }
    }

    /// Count rolling periods from `anchor` instead of ending them at the
    /// control instant.
    pub fn with_anchor(mut self, anchor: Moment) -> Self {
        self.anchor = Some(anchor);
        self
    }

    /// The limit being reported on.
    pub fn limit(&self) -> &'a Limit {
        self.limit
    }

    /// The instant the state is computed for.
    pub fn control_instant(&self) -> Moment {
        self.control_instant
    }

    /// The anchor for rolling periods, if any.
    pub fn anchor(&self) -> Option<Moment> {
        self.anchor
    }

    /// The window consumption is measured in.
    pub fn reporting_period(&self) -> Result<Option<CalendarPeriod>> {
        self.limit
            .reporting_period_for_anchored(&self.control_instant, self.anchor.as_ref())
    }

    /// Events counted in the reporting period.
    ///
    /// A literal count is returned as is. A fetcher is asked for the
    /// reporting period; without one the count is absent.
    pub fn spent(&self) -> Result<Option<u64>> {
        let period = self.reporting_period()?;
        resolve_spent(self.source, period.as_ref())
    }

    /// What is left: `limit - spent` for a real limit, `0` when disabled,
    /// absent when unlimited.
    pub fn balance(&self) -> Result<Option<i64>> {
        Ok(balance_of(self.limit, self.spent()?))
    }

    /// Spent share of the limit, rounded half to even.
    pub fn spent_percentage(&self) -> Result<Option<i64>> {
        Ok(spent_percentage_of(self.limit, self.spent()?))
    }

    /// Remaining share of the limit, rounded half to even.
    pub fn balance_percentage(&self) -> Result<Option<i64>> {
        Ok(balance_percentage_of(self.limit, balance_of(self.limit, self.spent()?)))
    }

    /// Whether anything is still available.
    pub fn is_positive_balance(&self) -> Result<bool> {
        Ok(is_positive(self.limit, balance_of(self.limit, self.spent()?)))
    }

    /// Take a snapshot of every field.
    pub fn report(&self) -> Result<LimitStateReport> {
        let period = self.reporting_period()?;
        let spent = resolve_spent(self.source, period.as_ref())?;
        Ok(LimitStateReport::compute(self.limit, self.control_instant, period, spent))
    }

    /// Take a snapshot of `limit` at `control_instant`, counting with an
    /// async `fetcher`.
    ///
    /// Async fetchers are not stored in a [`CountSource`], so this path
    /// builds no state; `anchor` plays the role of [`LimitState::with_anchor`].
    pub async fn report_async<F: AsyncCountFetcher>(
        limit: &Limit,
        control_instant: Moment,
        anchor: Option<Moment>,
        fetcher: &F,
    ) -> Result<LimitStateReport> {
        let period = limit.reporting_period_for_anchored(&control_instant, anchor.as_ref())?;
        let spent = match &period {
            Some(period) => Some(fetch_async(fetcher, &period.period()).await?),
            None => None,
        };
        Ok(LimitStateReport::compute(limit, control_instant, period, spent))
    }

    /// Render as labelled lines.
    pub fn as_plain_text(&self, options: &RenderOptions) -> Result<String> {
        self.report()?.as_plain_text(options)
    }

    /// Render as a one-row table.
    pub fn as_table(&self, options: &RenderOptions) -> Result<String> {
        self.report()?.as_table(options)
    }
}

/// State of every limit in a set, evaluated with one count source.
#[derive(Debug, Clone, Copy)]
pub struct LimitSetState<'a> {
    set: &'a LimitSet,
    control_instant: Moment,
    source: CountSource<'a>,
    anchor: Option<Moment>,
}

impl<'a> LimitSetState<'a> {
    /// Create a state of `set` at `control_instant`.
    pub fn new(set: &'a LimitSet, control_instant: Moment, source: CountSource<'a>) -> Self {
        Self {
            set,
            control_instant,
            source,
            anchor: None,
        }
    }

    /// Count rolling periods from `anchor`.
    pub fn with_anchor(mut self, anchor: Moment) -> Self {
        self.anchor = Some(anchor);
        self
    }

    /// The set being reported on.
    pub fn set(&self) -> &'a LimitSet {
        self.set
    }

    /// The instant the state is computed for.
    pub fn control_instant(&self) -> Moment {
        self.control_instant
    }

    /// One state per member, sharing the count source and anchor.
    pub fn per_member_states(&self) -> Vec<LimitState<'a>> {
        self.set
            .iter()
            .map(|limit| LimitState {
                limit,
                control_instant: self.control_instant,
                source: self.source,
                anchor: self.anchor,
            })
            .collect()
    }

    /// Whether any member has no balance left.
    pub fn any_limit_exceeded(&self) -> Result<bool> {
        Ok(self.report()?.any_limit_exceeded)
    }

    /// Take a snapshot of every member, fetching once per distinct period.
    pub fn report(&self) -> Result<LimitSetStateReport> {
        let mut fetched: HashMap<Period, u64> = HashMap::new();
        let mut limits = Vec::with_capacity(self.set.len());

        for limit in self.set {
            let period = limit.reporting_period_for_anchored(&self.control_instant, self.anchor.as_ref())?;
            let spent = match (self.source, &period) {
                (CountSource::Fetcher(fetcher), Some(period)) => {
                    let key = period.period();
                    let count = match fetched.get(&key) {
                        Some(count) => *count,
                        None => fetch(fetcher, &key)?,
                    };
                    fetched.insert(key, count);
                    Some(count)
                }
                (source, period) => resolve_spent(source, period.as_ref())?,
            };
            limits.push(LimitStateReport::compute(limit, self.control_instant, period, spent));
        }

        Ok(LimitSetStateReport::new(self.set, self.control_instant, limits))
    }

    /// Take a snapshot of every member of `set`, counting with an async
    /// `fetcher` once per distinct period.
    pub async fn report_async<F: AsyncCountFetcher>(
        set: &LimitSet,
        control_instant: Moment,
        anchor: Option<Moment>,
        fetcher: &F,
    ) -> Result<LimitSetStateReport> {
        let mut fetched: HashMap<Period, u64> = HashMap::new();
        let mut limits = Vec::with_capacity(set.len());

        for limit in set {
            let period = limit.reporting_period_for_anchored(&control_instant, anchor.as_ref())?;
            let spent = match &period {
                Some(period) => {
                    let key = period.period();
                    let count = match fetched.get(&key) {
                        Some(count) => *count,
                        None => fetch_async(fetcher, &key).await?,
                    };
                    fetched.insert(key, count);
                    Some(count)
                }
                None => None,
            };
            limits.push(LimitStateReport::compute(limit, control_instant, period, spent));
        }

        Ok(LimitSetStateReport::new(set, control_instant, limits))
    }

    /// Render every member as labelled lines under a heading.
    pub fn as_plain_text(&self, options: &RenderOptions) -> Result<String> {
        self.report()?.as_plain_text(options)
    }

    /// Render one table row per member.
    pub fn as_table(&self, options: &RenderOptions) -> Result<String> {
        self.report()?.as_table(options)
    }
}

/// Serializable snapshot of a [`LimitState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitStateReport {
    /// Reference of the limit.
    pub reference: String,
    /// Raw limit value.
    pub limit: Option<u64>,
    /// What the limit counts.
    pub unit: DisplayUnit,
    /// Period type of a real limit.
    pub period_type: Option<CalendarPeriodType>,
    /// Calendar alignment of a real limit.
    pub is_calendar_aligned: Option<bool>,
    /// The instant the state was computed for.
    pub control_instant: Moment,
    /// Events counted.
    pub spent: Option<u64>,
    /// What is left; negative when overspent.
    pub balance: Option<i64>,
    /// Spent share of the limit.
    pub spent_percentage: Option<i64>,
    /// Remaining share of the limit.
    pub balance_percentage: Option<i64>,
    /// First instant of the reporting period.
    pub period_start: Option<Moment>,
    /// Last instant of the reporting period.
    pub period_end: Option<Moment>,
    /// Whether anything is still available.
    pub is_positive_balance: bool,
}

impl LimitStateReport {
    fn compute(limit: &Limit, control_instant: Moment, period: Option<CalendarPeriod>, spent: Option<u64>) -> Self {
        let balance = balance_of(limit, spent);
        Self {
            reference: limit.reference(),
            limit: limit.limit(),
            unit: limit.unit(),
            period_type: limit.period_type(),
            is_calendar_aligned: limit.is_calendar_aligned(),
            control_instant,
            spent,
            balance,
            spent_percentage: spent_percentage_of(limit, spent),
            balance_percentage: balance_percentage_of(limit, balance),
            period_start: period.map(|p| p.start()),
            period_end: period.map(|p| p.end()),
            is_positive_balance: is_positive(limit, balance),
        }
    }

    /// The limit this report describes.
    pub fn to_limit(&self) -> Result<Limit> {
        Ok(Limit::try_new(
            self.limit,
            self.period_type,
            self.is_calendar_aligned,
            self.unit,
        )?)
    }

    /// The reporting period, if the limit has one.
    pub fn reporting_period(&self) -> Option<Period> {
        match (self.period_start, self.period_end) {
            (None, None) => None,
            (start, end) => Some(Period::new(start, end)),
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Render as labelled lines.
    pub fn as_plain_text(&self, options: &RenderOptions) -> Result<String> {
        let mut rows = vec![format!("Limit: {}", self.to_limit()?.as_plain_text())];
        if let Some(period) = self.reporting_period() {
            rows.push(format!("Reporting period: {}", period.as_plain_text(options)?));
        }
        rows.push(format!("As of: {}", format_instant(&self.control_instant, options)?));
        if let Some(spent) = self.spent {
            rows.push(format!("Spent: {spent}"));
        }
        match self.balance {
            Some(balance) if balance < 0 => rows.push(format!("Overspent: {}", balance.unsigned_abs())),
            Some(balance) => rows.push(format!("Available: {balance}")),
            None => {}
        }
        if let Some(percentage) = self.spent_percentage {
            rows.push(format!("Spent, %: {percentage}"));
        }
        if let Some(percentage) = self.balance_percentage {
            rows.push(format!("Available, %: {percentage}"));
        }
        rows.push(format!(
            "Has available balance (yes/no): {}",
            yes_no(self.is_positive_balance)
        ));
        Ok(options.indent_lines(rows))
    }

    /// Render as a one-row table.
    pub fn as_table(&self, options: &RenderOptions) -> Result<String> {
        let mut table = Table::new(TABLE_HEADERS.to_vec());
        table.push_row(self.table_row(options)?);
        Ok(table.render(options))
    }

    fn table_row(&self, options: &RenderOptions) -> Result<Vec<String>> {
        let period = match self.reporting_period() {
            Some(period) => period.as_plain_text(options)?,
            None => String::new(),
        };
        Ok(vec![
            self.reference.clone(),
            period,
            format_instant(&self.control_instant, options)?,
            cell(self.spent),
            cell(self.balance),
            cell(self.spent_percentage),
            cell(self.balance_percentage),
            yes_no(self.is_positive_balance).to_string(),
        ])
    }
}

/// Serializable snapshot of a [`LimitSetState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitSetStateReport {
    /// Reference of the set.
    pub reference: String,
    /// The instant the state was computed for.
    pub control_instant: Moment,
    /// Whether any member has no balance left.
    pub any_limit_exceeded: bool,
    /// Member snapshots, in set order.
    pub limits: Vec<LimitStateReport>,
}

impl LimitSetStateReport {
    fn new(set: &LimitSet, control_instant: Moment, limits: Vec<LimitStateReport>) -> Self {
        Self {
            reference: set.reference(),
            control_instant,
            any_limit_exceeded: limits.iter().any(|state| !state.is_positive_balance),
            limits,
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Render every member as labelled lines under a heading.
    pub fn as_plain_text(&self, options: &RenderOptions) -> Result<String> {
        let mut blocks = vec![options.indent_lines(["Limits state:"])];
        let nested = options.nested(2);
        for state in &self.limits {
            blocks.push(state.as_plain_text(&nested)?);
        }
        Ok(blocks.join("\n"))
    }

    /// Render one table row per member.
    pub fn as_table(&self, options: &RenderOptions) -> Result<String> {
        let mut table = Table::new(TABLE_HEADERS.to_vec());
        for state in &self.limits {
            table.push_row(state.table_row(options)?);
        }
        Ok(table.render(options))
    }
}

fn resolve_spent(source: CountSource<'_>, period: Option<&CalendarPeriod>) -> Result<Option<u64>> {
    match (source, period) {
        (CountSource::Spent(spent), _) => Ok(Some(spent)),
        (CountSource::Fetcher(fetcher), Some(period)) => fetch(fetcher, &period.period()).map(Some),
        (CountSource::Fetcher(_), None) => Ok(None),
    }
}

fn balance_of(limit: &Limit, spent: Option<u64>) -> Option<i64> {
    match limit.kind() {
        LimitKind::Real(count) => spent.map(|spent| saturate(i128::from(count) - i128::from(spent))),
        LimitKind::Disabled => Some(0),
        LimitKind::Unlimited => None,
    }
}

fn spent_percentage_of(limit: &Limit, spent: Option<u64>) -> Option<i64> {
    match limit.kind() {
        LimitKind::Real(count) => spent.map(|spent| percentage(i128::from(spent), count)),
        _ => None,
    }
}

fn balance_percentage_of(limit: &Limit, balance: Option<i64>) -> Option<i64> {
    match limit.kind() {
        LimitKind::Real(count) => balance.map(|balance| percentage(i128::from(balance), count)),
        _ => None,
    }
}

fn is_positive(limit: &Limit, balance: Option<i64>) -> bool {
    limit.is_unlimited() || balance.is_some_and(|balance| balance > 0)
}

/// `100 * value / whole`, rounded half to even. `whole` is positive.
fn percentage(value: i128, whole: u64) -> i64 {
    let whole = i128::from(whole);
    let scaled = value * 100;
    let quotient = scaled.div_euclid(whole);
    let rounded = match (2 * scaled.rem_euclid(whole)).cmp(&whole) {
        Ordering::Greater => quotient + 1,
        Ordering::Equal if quotient % 2 != 0 => quotient + 1,
        _ => quotient,
    };
    saturate(rounded)
}

fn saturate(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

fn format_instant(moment: &Moment, options: &RenderOptions) -> Result<String> {
    Ok(format!(
        "{} {}",
        format_moment(moment, &options.datetime_format)?,
        moment.offset()
    ))
}

fn cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
