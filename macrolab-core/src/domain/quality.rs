//! Data-quality scoring at monthly resolution.
//!
//! Score = max(0, 1 − missingness − excess_staleness/365), where excess
//! staleness is the number of days past [`MAX_STALENESS_DAYS_MONTHLY`]. An
//! empty series always scores exactly 0 with staleness pinned to a sentinel
//! "very large" value.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::series::TimeSeries;

/// Staleness tolerated before the score starts decaying, in days.
pub const MAX_STALENESS_DAYS_MONTHLY: i64 = 60;

/// Monthly missingness tolerated after resampling; a candidate whose score
/// reaches `1 − MAX_MISSINGNESS_AFTER_RESAMPLE` is good enough to stop the
/// resolver's fallback scan.
pub const MAX_MISSINGNESS_AFTER_RESAMPLE: f64 = 0.10;

/// Staleness sentinel for series with no valid observation.
pub const STALENESS_SENTINEL_DAYS: i64 = 9999;

/// Quality of one fetched series, derived at monthly resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Fraction of empty months in [0, 1].
    pub missingness: f64,
    /// Days since the last valid observation, relative to the assessment date.
    pub staleness_days: i64,
    /// Composite quality in [0, 1]; higher is better.
    pub score: f64,
}

impl QualityReport {
    /// Report for an empty or all-NaN series.
    pub fn empty() -> Self {
        Self {
            missingness: 1.0,
            staleness_days: STALENESS_SENTINEL_DAYS,
            score: 0.0,
        }
    }

    /// Assess a raw series as of `as_of` (normally "today"; injected so tests
    /// and replays are deterministic).
    pub fn assess(series: &TimeSeries, as_of: NaiveDate) -> Self {
        if series.is_empty() {
            return Self::empty();
        }
        let monthly = series.monthly_last();
        let missing = monthly.values().filter(|v| !v.is_finite()).count();
        let missingness = missing as f64 / monthly.len() as f64;
        let Some(last_valid) = monthly.last_valid_date() else {
            return Self::empty();
        };
        let staleness_days = (as_of - last_valid).num_days().max(0);
        let excess = (staleness_days - MAX_STALENESS_DAYS_MONTHLY).max(0) as f64;
        let score = (1.0 - missingness - excess / 365.0).max(0.0);
        Self {
            missingness,
            staleness_days,
            score,
        }
    }

    /// Quality bar at which the resolver stops trying further candidates.
    pub fn good_enough(&self) -> bool {
        self.score >= 1.0 - MAX_MISSINGNESS_AFTER_RESAMPLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn monthly_series(months: usize, end: NaiveDate) -> TimeSeries {
        // one observation roughly per month, counting back from `end`
        TimeSeries::from_points(
            (0..months)
                .map(|i| (end - Duration::days(30 * i as i64), i as f64))
                .collect(),
        )
    }

    #[test]
    fn empty_series_scores_zero() {
        let q = QualityReport::assess(&TimeSeries::new(), d(2024, 6, 1));
        assert_eq!(q.score, 0.0);
        assert_eq!(q.missingness, 1.0);
        assert_eq!(q.staleness_days, STALENESS_SENTINEL_DAYS);
    }

    #[test]
    fn fresh_complete_series_scores_one() {
        let q = QualityReport::assess(&monthly_series(24, d(2024, 5, 31)), d(2024, 6, 1));
        assert!(q.missingness.abs() < 1e-12);
        assert!(q.score > 0.99);
        assert!(q.good_enough());
    }

    #[test]
    fn staleness_decays_score_past_tolerance() {
        let series = monthly_series(24, d(2023, 5, 31));
        let q = QualityReport::assess(&series, d(2024, 6, 1));
        assert!(q.staleness_days > MAX_STALENESS_DAYS_MONTHLY);
        assert!(q.score < 1.0 - 0.5); // roughly a year stale
        assert!(q.score >= 0.0);
    }

    #[test]
    fn gaps_raise_missingness() {
        // observations in Jan and Jun only — four empty months between
        let series = TimeSeries::from_points(vec![
            (d(2024, 1, 15), 1.0),
            (d(2024, 6, 15), 2.0),
        ]);
        let q = QualityReport::assess(&series, d(2024, 6, 20));
        assert!((q.missingness - 4.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn score_always_in_unit_interval() {
        let ancient = monthly_series(6, d(2000, 1, 31));
        let q = QualityReport::assess(&ancient, d(2024, 6, 1));
        assert!((0.0..=1.0).contains(&q.score));
    }
}
