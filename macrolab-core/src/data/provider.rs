//! Series provider trait and structured error types.
//!
//! The SeriesProvider trait abstracts over data sources (CSV directories,
//! synthetic fixtures, and whatever transports a deployment wires in) so the
//! resolver can be exercised against fakes. Providers return an empty series
//! for "no data"; a `DataError` is reserved for genuine fetch failures, which
//! the resolver records in lineage and never propagates.

use chrono::NaiveDate;
use std::time::Duration;
use thiserror::Error;

use crate::domain::TimeSeries;

/// Structured error types for series fetches.
#[derive(Debug, Clone, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("series not found: {series_id}")]
    SeriesNotFound { series_id: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("data error: {0}")]
    Other(String),
}

impl DataError {
    /// Transient failures are worth retrying; a missing series is not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DataError::NetworkUnreachable(_) | DataError::RateLimited { .. } | DataError::Io(_)
        )
    }
}

/// Trait for series providers.
///
/// Implementations handle the specifics of one source. The retry wrapper and
/// memo cache sit above this trait — providers know about neither.
pub trait SeriesProvider: Send + Sync {
    /// Provider name as it appears in candidate lists and lineage.
    fn name(&self) -> &str;

    /// Fetch observations for a series id over an inclusive date range.
    fn fetch(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TimeSeries, DataError>;
}

/// Bounded retry with linear backoff for one provider call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(700),
        }
    }
}

impl RetryPolicy {
    /// No retries, no sleeping — for tests.
    pub fn none() -> Self {
        Self {
            attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Call `fetch` up to `attempts` times, sleeping `base_delay × attempt`
    /// between tries. Only transient errors are retried; the last error is
    /// returned if the budget runs out.
    pub fn fetch(
        &self,
        provider: &dyn SeriesProvider,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TimeSeries, DataError> {
        let mut last_err = DataError::Other("retry budget exhausted".into());
        for attempt in 1..=self.attempts.max(1) {
            match provider.fetch(series_id, start, end) {
                Ok(series) => return Ok(series),
                Err(e) => {
                    let transient = e.is_transient();
                    last_err = e;
                    if !transient || attempt == self.attempts {
                        break;
                    }
                    std::thread::sleep(self.base_delay * attempt);
                }
            }
        }
        Err(last_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyProvider {
        fail_times: u32,
        calls: AtomicU32,
    }

    impl SeriesProvider for FlakyProvider {
        fn name(&self) -> &str {
            "FLAKY"
        }

        fn fetch(
            &self,
            _series_id: &str,
            start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<TimeSeries, DataError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_times {
                Err(DataError::NetworkUnreachable("boom".into()))
            } else {
                Ok(TimeSeries::from_points(vec![(start, 1.0)]))
            }
        }
    }

    fn dates() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
        )
    }

    #[test]
    fn retries_transient_failures() {
        let provider = FlakyProvider {
            fail_times: 2,
            calls: AtomicU32::new(0),
        };
        let policy = RetryPolicy {
            attempts: 3,
            base_delay: Duration::ZERO,
        };
        let (start, end) = dates();
        let out = policy.fetch(&provider, "X", start, end);
        assert!(out.is_ok());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn budget_exhaustion_returns_last_error() {
        let provider = FlakyProvider {
            fail_times: 10,
            calls: AtomicU32::new(0),
        };
        let policy = RetryPolicy {
            attempts: 3,
            base_delay: Duration::ZERO,
        };
        let (start, end) = dates();
        assert!(policy.fetch(&provider, "X", start, end).is_err());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    struct NotFoundProvider(AtomicU32);

    impl SeriesProvider for NotFoundProvider {
        fn name(&self) -> &str {
            "NF"
        }

        fn fetch(
            &self,
            series_id: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<TimeSeries, DataError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(DataError::SeriesNotFound {
                series_id: series_id.to_string(),
            })
        }
    }

    #[test]
    fn non_transient_errors_are_not_retried() {
        let provider = NotFoundProvider(AtomicU32::new(0));
        let policy = RetryPolicy {
            attempts: 3,
            base_delay: Duration::ZERO,
        };
        let (start, end) = dates();
        assert!(policy.fetch(&provider, "X", start, end).is_err());
        assert_eq!(provider.0.load(Ordering::SeqCst), 1);
    }
}
