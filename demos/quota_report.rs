//! Quota report example.
//!
//! Run with:
//! ```
//! RUST_LOG=calendar_quota=debug cargo run --example quota_report
//! ```

use calendar_quota::{CountSource, FetchError, LimitSet, Moment, Period, RenderOptions};
use chrono::DateTime;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Events recorded by the application, e.g. generated reports
    let events: Vec<Moment> = [
        "2024-11-02T09:15:00+03:00",
        "2024-11-18T14:40:00+03:00",
        "2024-11-29T08:05:00+03:00",
        "2024-11-29T11:30:00+03:00",
        "2024-11-29T19:55:00+03:00",
    ]
    .iter()
    .map(|s| DateTime::parse_from_rfc3339(s))
    .collect::<Result<_, _>>()?;

    let fetcher = |period: &Period| -> Result<u64, FetchError> {
        Ok(events.iter().filter(|event| period.contains(event)).count() as u64)
    };

    let now = DateTime::parse_from_rfc3339("2024-11-29T20:36:20+03:00")?;
    let limits: LimitSet = "3r-day-cal,100r-month-cal,20r-week".parse()?;
    let state = limits.state(now, CountSource::fetcher(&fetcher));

    println!("=== Limits: {limits} ===\n");
    for limit in &limits {
        println!("- {}", limit.as_plain_text());
    }

    let options = RenderOptions::default();
    println!("\n{}\n", state.as_plain_text(&options)?);
    println!("{}\n", state.as_table(&options)?);

    let report = state.report()?;
    if report.any_limit_exceeded {
        println!("At least one limit is exhausted");
    }
    println!("{}", report.to_json()?);

    Ok(())
}
