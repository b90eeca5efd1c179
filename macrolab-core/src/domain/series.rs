//! Single-valued time series — the unit every provider returns and every
//! transform consumes.
//!
//! Invariants: dates are strictly ascending and unique. Values may be NaN in
//! derived series (rolling warm-up, empty resample bins); raw provider series
//! are expected to carry finite values only.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// A date-indexed sequence of f64 observations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TimeSeries {
    points: Vec<(NaiveDate, f64)>,
}

impl TimeSeries {
    /// Empty series.
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Build from unordered points. Sorts ascending and deduplicates dates,
    /// keeping the last occurrence of each date.
    pub fn from_points(mut points: Vec<(NaiveDate, f64)>) -> Self {
        points.sort_by_key(|(d, _)| *d);
        points.dedup_by(|later, earlier| {
            if later.0 == earlier.0 {
                // dedup_by removes `later`; keep its value in the survivor
                earlier.1 = later.1;
                true
            } else {
                false
            }
        });
        Self { points }
    }

    /// Build from parallel date/value vectors (must be equal length).
    pub fn from_parts(dates: Vec<NaiveDate>, values: Vec<f64>) -> Self {
        debug_assert_eq!(dates.len(), values.len());
        Self::from_points(dates.into_iter().zip(values).collect())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.points.iter().copied()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|(d, _)| *d)
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|(_, v)| *v)
    }

    pub fn first(&self) -> Option<(NaiveDate, f64)> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<(NaiveDate, f64)> {
        self.points.last().copied()
    }

    /// Date of the most recent finite observation.
    pub fn last_valid_date(&self) -> Option<NaiveDate> {
        self.points
            .iter()
            .rev()
            .find(|(_, v)| v.is_finite())
            .map(|(d, _)| *d)
    }

    /// Exact-date lookup.
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |(d, _)| *d)
            .ok()
            .map(|i| self.points[i].1)
    }

    /// Restrict to the inclusive [start, end] window.
    pub fn restrict(&self, start: NaiveDate, end: NaiveDate) -> TimeSeries {
        TimeSeries {
            points: self
                .points
                .iter()
                .copied()
                .filter(|(d, _)| *d >= start && *d <= end)
                .collect(),
        }
    }

    /// Drop NaN/infinite observations.
    pub fn drop_non_finite(&self) -> TimeSeries {
        TimeSeries {
            points: self
                .points
                .iter()
                .copied()
                .filter(|(_, v)| v.is_finite())
                .collect(),
        }
    }

    /// Apply `f` to every value, keeping dates.
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> TimeSeries {
        TimeSeries {
            points: self.points.iter().map(|(d, v)| (*d, f(*v))).collect(),
        }
    }

    /// Resample to calendar-month bins, taking the last finite observation per
    /// bin. The output covers every month between the first and last
    /// observation; months with no finite observation carry NaN. Output dates
    /// are month-ends.
    pub fn monthly_last(&self) -> TimeSeries {
        let (Some((first, _)), Some((last, _))) = (self.first(), self.last()) else {
            return TimeSeries::new();
        };
        let mut out = Vec::new();
        let mut ym = (first.year(), first.month());
        let end_ym = (last.year(), last.month());
        let mut cursor = 0usize;
        loop {
            let eom = month_end(ym.0, ym.1);
            let mut value = f64::NAN;
            while cursor < self.points.len() && self.points[cursor].0 <= eom {
                if self.points[cursor].1.is_finite() {
                    value = self.points[cursor].1;
                }
                cursor += 1;
            }
            out.push((eom, value));
            if ym == end_ym {
                break;
            }
            ym = next_month(ym.0, ym.1);
        }
        TimeSeries { points: out }
    }

    /// Resample to a daily grid from first to last observation, carrying the
    /// previous value forward. Stepwise constant between observations.
    pub fn to_daily_ffill(&self) -> TimeSeries {
        let (Some((first, _)), Some((last, _))) = (self.first(), self.last()) else {
            return TimeSeries::new();
        };
        let mut out = Vec::with_capacity((last - first).num_days() as usize + 1);
        let mut cursor = 0usize;
        let mut carry = f64::NAN;
        let mut day = first;
        while day <= last {
            while cursor < self.points.len() && self.points[cursor].0 <= day {
                carry = self.points[cursor].1;
                cursor += 1;
            }
            out.push((day, carry));
            day += Duration::days(1);
        }
        TimeSeries { points: out }
    }

    /// Exact-date reindex onto `index`; NaN where a date has no observation.
    pub fn reindex(&self, index: &[NaiveDate]) -> Vec<f64> {
        index
            .iter()
            .map(|d| self.get(*d).unwrap_or(f64::NAN))
            .collect()
    }

    /// Positional percent change over `periods` steps, × 1 (not percent).
    /// NaN while the lag is unavailable or either endpoint is non-finite.
    pub fn pct_change(&self, periods: usize) -> TimeSeries {
        let n = self.points.len();
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let (date, value) = self.points[i];
            let v = if i >= periods {
                let base = self.points[i - periods].1;
                if value.is_finite() && base.is_finite() && base != 0.0 {
                    value / base - 1.0
                } else {
                    f64::NAN
                }
            } else {
                f64::NAN
            };
            out.push((date, v));
        }
        TimeSeries { points: out }
    }

    /// Trailing rolling mean over `window` observations. Strictly causal:
    /// index i sees observations i−window+1 ..= i only. NaN until the window
    /// is full or whenever the window contains a non-finite value.
    pub fn rolling_mean(&self, window: usize) -> TimeSeries {
        self.rolling(window, |w| w.iter().sum::<f64>() / w.len() as f64)
    }

    /// Trailing rolling sample standard deviation (n−1 denominator).
    pub fn rolling_std(&self, window: usize) -> TimeSeries {
        self.rolling(window, |w| {
            let mean = w.iter().sum::<f64>() / w.len() as f64;
            let var = w.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (w.len() - 1) as f64;
            var.sqrt()
        })
    }

    /// Trailing rolling minimum.
    pub fn rolling_min(&self, window: usize) -> TimeSeries {
        self.rolling(window, |w| w.iter().copied().fold(f64::INFINITY, f64::min))
    }

    /// Rolling percentile rank of the latest value within its trailing
    /// `window`, scaled to [0, 100]. Average rank under ties, NaN until the
    /// window is full or when the latest value is non-finite.
    pub fn rolling_pct_rank(&self, window: usize) -> TimeSeries {
        let n = self.points.len();
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let (date, last) = self.points[i];
            let v = if i + 1 >= window && last.is_finite() {
                let w: Vec<f64> = self.points[i + 1 - window..=i]
                    .iter()
                    .map(|(_, v)| *v)
                    .filter(|v| v.is_finite())
                    .collect();
                let below = w.iter().filter(|v| **v < last).count() as f64;
                let equal = w.iter().filter(|v| **v == last).count() as f64;
                // average rank of the tied group, as a fraction of the window
                let rank = (below + (equal + 1.0) / 2.0) / w.len() as f64;
                (rank * 100.0).clamp(0.0, 100.0)
            } else {
                f64::NAN
            };
            out.push((date, v));
        }
        TimeSeries { points: out }
    }

    /// Running maximum of all observations up to and including each index.
    pub fn cummax(&self) -> TimeSeries {
        let mut peak = f64::NAN;
        let points = self
            .points
            .iter()
            .map(|(d, v)| {
                if v.is_finite() && !(peak.is_finite() && peak >= *v) {
                    peak = *v;
                }
                (*d, peak)
            })
            .collect();
        TimeSeries { points }
    }

    /// Linear-interpolation quantile over finite values, pandas-style.
    /// `p` in [0, 1]. None when no finite values exist.
    pub fn quantile(&self, p: f64) -> Option<f64> {
        let mut sorted: Vec<f64> = self.values().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let pos = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
        let lo = pos.floor() as usize;
        let frac = pos - lo as f64;
        let v = if lo + 1 < sorted.len() {
            sorted[lo] * (1.0 - frac) + sorted[lo + 1] * frac
        } else {
            sorted[lo]
        };
        Some(v)
    }

    /// Inner-join on dates, then apply `op` pairwise.
    pub fn zip_with(&self, other: &TimeSeries, op: impl Fn(f64, f64) -> f64) -> TimeSeries {
        let mut out = Vec::new();
        let (mut i, mut j) = (0usize, 0usize);
        while i < self.points.len() && j < other.points.len() {
            let (da, va) = self.points[i];
            let (db, vb) = other.points[j];
            match da.cmp(&db) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    out.push((da, op(va, vb)));
                    i += 1;
                    j += 1;
                }
            }
        }
        TimeSeries { points: out }
    }

    /// Inner-join subtraction.
    pub fn sub(&self, other: &TimeSeries) -> TimeSeries {
        self.zip_with(other, |a, b| a - b)
    }

    /// Inner-join division; division by zero and infinities become NaN.
    pub fn safe_div(&self, other: &TimeSeries) -> TimeSeries {
        self.zip_with(other, |a, b| {
            let q = a / b;
            if q.is_finite() {
                q
            } else {
                f64::NAN
            }
        })
    }

    /// Generic trailing-window reduction. NaN until the window is full or
    /// whenever it contains a non-finite value.
    pub fn rolling_apply(&self, window: usize, f: impl Fn(&[f64]) -> f64) -> TimeSeries {
        self.rolling(window, f)
    }

    fn rolling(&self, window: usize, f: impl Fn(&[f64]) -> f64) -> TimeSeries {
        assert!(window >= 1, "rolling window must be >= 1");
        let n = self.points.len();
        let mut out = Vec::with_capacity(n);
        let raw: Vec<f64> = self.values().collect();
        for i in 0..n {
            let v = if i + 1 >= window {
                let w = &raw[i + 1 - window..=i];
                if w.iter().all(|v| v.is_finite()) {
                    f(w)
                } else {
                    f64::NAN
                }
            } else {
                f64::NAN
            };
            out.push((self.points[i].0, v));
        }
        TimeSeries { points: out }
    }
}

/// Last calendar day of (year, month).
pub fn month_end(year: i32, month: u32) -> NaiveDate {
    let (ny, nm) = next_month(year, month);
    NaiveDate::from_ymd_opt(ny, nm, 1).unwrap() - Duration::days(1)
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}
