//! Count sources.
//!
//! The engine never stores consumption. Callers supply either a literal count
//! or a fetcher that reports how many events happened within a period.

use std::future::Future;

use tracing::debug;

use crate::error::{FetchError, QuotaError, Result};
use crate::period::Period;

/// Reports the number of events within a period.
///
/// Implemented for closures, so a plain `|period: &Period| Ok(4)` works.
/// Failures are passed through to the caller unchanged as
/// [`QuotaError::CountSource`].
pub trait CountFetcher {
    /// Count the events within `period`.
    fn count_for_period(&self, period: &Period) -> std::result::Result<u64, FetchError>;
}

impl<F> CountFetcher for F
where
    F: Fn(&Period) -> std::result::Result<u64, FetchError>,
{
    fn count_for_period(&self, period: &Period) -> std::result::Result<u64, FetchError> {
        self(period)
    }
}

/// Async variant of [`CountFetcher`] for I/O-backed sources.
///
/// # Example
///
/// ```ignore
/// struct Events(PgPool);
///
/// impl AsyncCountFetcher for Events {
///     async fn count_for_period(&self, period: &Period) -> Result<u64, FetchError> {
///         let count = query_count(&self.0, period.start(), period.end()).await?;
///         Ok(count)
///     }
/// }
/// ```
pub trait AsyncCountFetcher: Send + Sync {
    /// Count the events within `period`.
    fn count_for_period(
        &self,
        period: &Period,
    ) -> impl Future<Output = std::result::Result<u64, FetchError>> + Send;
}

/// Where a state takes its spent count from.
#[derive(Clone, Copy)]
pub enum CountSource<'a> {
    /// A count known in advance, used for every reporting period.
    Spent(u64),
    /// Ask the fetcher for each reporting period.
    Fetcher(&'a dyn CountFetcher),
}

impl<'a> CountSource<'a> {
    /// Use `fetcher` as the count source.
    pub fn fetcher(fetcher: &'a dyn CountFetcher) -> Self {
        Self::Fetcher(fetcher)
    }
}

impl From<u64> for CountSource<'_> {
    fn from(spent: u64) -> Self {
        Self::Spent(spent)
    }
}

impl std::fmt::Debug for CountSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spent(spent) => f.debug_tuple("Spent").field(spent).finish(),
            Self::Fetcher(_) => f.write_str("Fetcher(..)"),
        }
    }
}

pub(crate) fn fetch(fetcher: &dyn CountFetcher, period: &Period) -> Result<u64> {
    debug!(start = ?period.start(), end = ?period.end(), "fetching spent count");
    fetcher.count_for_period(period).map_err(QuotaError::CountSource)
}

pub(crate) async fn fetch_async<F: AsyncCountFetcher>(fetcher: &F, period: &Period) -> Result<u64> {
    debug!(start = ?period.start(), end = ?period.end(), "fetching spent count");
    fetcher
        .count_for_period(period)
        .await
        .map_err(QuotaError::CountSource)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_closure_is_a_fetcher() {
        let calls = Cell::new(0);
        let fetcher = |_: &Period| -> std::result::Result<u64, FetchError> {
            calls.set(calls.get() + 1);
            Ok(7)
        };

        assert_eq!(fetch(&fetcher, &Period::INFINITY).unwrap(), 7);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_failure_passes_through() {
        let fetcher = |_: &Period| -> std::result::Result<u64, FetchError> { Err("db down".into()) };

        let err = fetch(&fetcher, &Period::INFINITY).unwrap_err();
        assert!(matches!(err, QuotaError::CountSource(_)));
        assert_eq!(err.to_string(), "Count source failed: db down");
    }

    #[test]
    fn test_literal_source() {
        let source = CountSource::from(3);
        assert!(matches!(source, CountSource::Spent(3)));
        assert_eq!(format!("{source:?}"), "Spent(3)");
    }
}
