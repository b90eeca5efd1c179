//! Per-series numeric transform pipeline.
//!
//! Every catalog indicator names one transform. After the numeric step the
//! series is winsorized against the 1st/99th percentile of its own history and
//! remaining undefined values are dropped. All window operations are trailing
//! only — index i never sees an observation after i — which the composite
//! builder and regime classifiers rely on for backtest validity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::TimeSeries;

/// Winsorization tail probability applied after every transform.
pub const WINSOR_TAIL: f64 = 0.01;

#[derive(Debug, Error)]
pub enum TransformParseError {
    #[error("bad z-score window in transform '{0}'")]
    BadWindow(String),
}

/// Named transform applied to a raw indicator series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Transform {
    /// Identity.
    Level,
    /// Ratio to the value 12 periods prior, minus 1, × 100.
    YoY,
    /// Ratio to the previous period, minus 1, × 100.
    MoM,
    /// Trailing z-score over `window` observations.
    ZScore { window: usize },
    /// Negated trailing z-score, for indicators where higher raw values are
    /// economically worse (unemployment, spreads).
    ZScoreInv { window: usize },
}

impl FromStr for Transform {
    type Err = TransformParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LEVEL" => return Ok(Transform::Level),
            "yoy" => return Ok(Transform::YoY),
            "mom" => return Ok(Transform::MoM),
            _ => {}
        }
        if let Some(rest) = s.strip_prefix("zscore_") {
            let (window_str, inverted) = match rest.strip_suffix("_inv") {
                Some(w) => (w, true),
                None => (rest, false),
            };
            let window: usize = window_str
                .parse()
                .map_err(|_| TransformParseError::BadWindow(s.to_string()))?;
            if window < 2 {
                return Err(TransformParseError::BadWindow(s.to_string()));
            }
            return Ok(if inverted {
                Transform::ZScoreInv { window }
            } else {
                Transform::ZScore { window }
            });
        }
        // unrecognized names pass the series through untouched
        Ok(Transform::Level)
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Level => write!(f, "LEVEL"),
            Transform::YoY => write!(f, "yoy"),
            Transform::MoM => write!(f, "mom"),
            Transform::ZScore { window } => write!(f, "zscore_{window}"),
            Transform::ZScoreInv { window } => write!(f, "zscore_{window}_inv"),
        }
    }
}

impl TryFrom<String> for Transform {
    type Error = TransformParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Transform> for String {
    fn from(t: Transform) -> String {
        t.to_string()
    }
}

/// Apply a transform, winsorize against the result's own history, and drop
/// undefined values.
pub fn apply(series: &TimeSeries, transform: Transform) -> TimeSeries {
    let out = match transform {
        Transform::Level => series.clone(),
        Transform::YoY => yoy(series),
        Transform::MoM => mom(series),
        Transform::ZScore { window } => zscore(series, window),
        Transform::ZScoreInv { window } => zscore(series, window).map_values(|v| -v),
    };
    winsorize(&out, WINSOR_TAIL).drop_non_finite()
}

/// Year-over-year percent change (12-period lag).
pub fn yoy(series: &TimeSeries) -> TimeSeries {
    series.pct_change(12).map_values(|v| v * 100.0)
}

/// Period-over-period percent change.
pub fn mom(series: &TimeSeries) -> TimeSeries {
    series.pct_change(1).map_values(|v| v * 100.0)
}

/// Trailing z-score: (x − trailing mean) / trailing standard deviation.
/// A zero or undefined standard deviation yields NaN, never a division blowup.
pub fn zscore(series: &TimeSeries, window: usize) -> TimeSeries {
    let mean = series.rolling_mean(window);
    let sd = series.rolling_std(window);
    let dates: Vec<_> = series.dates().collect();
    let values: Vec<f64> = series
        .values()
        .zip(mean.values().zip(sd.values()))
        .map(|(v, (m, s))| {
            if v.is_finite() && m.is_finite() && s.is_finite() && s > 0.0 {
                (v - m) / s
            } else {
                f64::NAN
            }
        })
        .collect();
    TimeSeries::from_parts(dates, values)
}

/// Clip values outside the [p, 1−p] quantiles of the series' own history.
pub fn winsorize(series: &TimeSeries, p: f64) -> TimeSeries {
    let (Some(lo), Some(hi)) = (series.quantile(p), series.quantile(1.0 - p)) else {
        return series.clone();
    };
    series.map_values(|v| if v.is_finite() { v.clamp(lo, hi) } else { v })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn monthly(values: &[f64]) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, 31).unwrap();
        TimeSeries::from_points(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| (start + Duration::days(31 * i as i64), *v))
                .collect(),
        )
    }

    #[test]
    fn parse_round_trips() {
        for name in ["LEVEL", "yoy", "mom", "zscore_36", "zscore_36_inv", "zscore_252"] {
            let t: Transform = name.parse().unwrap();
            assert_eq!(t.to_string(), name);
        }
    }

    #[test]
    fn parse_unknown_degrades_to_level() {
        assert_eq!("diff".parse::<Transform>().unwrap(), Transform::Level);
    }

    #[test]
    fn parse_rejects_bad_window() {
        assert!("zscore_abc".parse::<Transform>().is_err());
        assert!("zscore_1".parse::<Transform>().is_err());
    }

    #[test]
    fn level_keeps_interior_values() {
        let values: Vec<f64> = (0..200).map(|i| i as f64).collect();
        let series = monthly(&values);
        let out = apply(&series, Transform::Level);
        assert_eq!(out.len(), series.len());
        // interior values are within the winsor bounds and untouched
        for (date, v) in series.iter().skip(5).take(190) {
            assert_eq!(out.get(date), Some(v));
        }
    }

    #[test]
    fn winsorize_clips_outliers() {
        let mut values: Vec<f64> = vec![1.0; 99];
        values.push(1000.0);
        let series = monthly(&values);
        let out = winsorize(&series, 0.01);
        let max = out.values().fold(f64::NEG_INFINITY, f64::max);
        assert!(max < 1000.0);
    }

    #[test]
    fn yoy_uses_twelve_period_lag() {
        let values: Vec<f64> = (0..24).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let series = monthly(&values);
        let out = yoy(&series);
        let finite: Vec<f64> = out.values().filter(|v| v.is_finite()).collect();
        assert_eq!(finite.len(), 12);
        for v in finite {
            assert!((v - (1.01f64.powi(12) - 1.0) * 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn zscore_zero_std_is_undefined() {
        let series = monthly(&[5.0; 40]);
        let out = zscore(&series, 36);
        assert!(out.values().all(|v| v.is_nan()));
    }

    #[test]
    fn zscore_is_causal() {
        let values: Vec<f64> = (0..60).map(|i| (i as f64 * 0.7).sin() * 10.0).collect();
        let full = monthly(&values);
        let truncated = monthly(&values[..48]);
        let z_full = zscore(&full, 36);
        let z_trunc = zscore(&truncated, 36);
        // appending future observations must not change past outputs
        for (date, v) in z_trunc.iter() {
            let w = z_full.get(date).unwrap();
            if v.is_nan() {
                assert!(w.is_nan());
            } else {
                assert!((v - w).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn apply_drops_warmup_nans() {
        let values: Vec<f64> = (0..48).map(|i| i as f64).collect();
        let series = monthly(&values);
        let out = apply(&series, Transform::ZScore { window: 36 });
        assert!(out.values().all(|v| v.is_finite()));
        assert_eq!(out.len(), 48 - 35);
    }

    #[test]
    fn inverted_zscore_negates() {
        let values: Vec<f64> = (0..48).map(|i| (i as f64).sqrt() * 3.0).collect();
        let series = monthly(&values);
        let z = zscore(&series, 36);
        let zi = zscore(&series, 36).map_values(|v| -v);
        for (a, b) in z.values().zip(zi.values()) {
            if a.is_finite() {
                assert!((a + b).abs() < 1e-12);
            }
        }
    }
}
