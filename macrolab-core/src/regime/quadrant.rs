//! Closed-form quadrant classifier.
//!
//! Scores each regime as the negative squared Euclidean distance from the
//! (growth, inflation) z-score pair to the regime's canonical quadrant
//! center, scaled by 1/(2σ²), then softmaxes across the four scores. No
//! fitting, no warm-up: usable per country and as the fallback when the
//! mixture classifier lacks history.

use crate::domain::{Regime, TimeSeries};

use super::{argmax_regime, RegimeFrame, RegimeState};

/// Default scale: one z-unit of slack around each quadrant center.
pub const DEFAULT_SIGMA: f64 = 1.0;

/// Classify each timestamp where both inputs are present; rows missing either
/// input are dropped, not imputed.
pub fn quadrant_probabilities(
    growth_z: &TimeSeries,
    infl_z: &TimeSeries,
    sigma: f64,
) -> RegimeFrame {
    let joined = growth_z.zip_with(infl_z, |g, i| {
        // pack the pair; rows with either side non-finite are dropped below
        if g.is_finite() && i.is_finite() {
            0.0
        } else {
            f64::NAN
        }
    });
    let mut index = Vec::new();
    let mut probs = Vec::new();
    let mut state = Vec::new();

    for (date, marker) in joined.iter() {
        if !marker.is_finite() {
            continue;
        }
        let g = growth_z.get(date).unwrap();
        let i = infl_z.get(date).unwrap();
        let mut scores = [0.0_f64; 4];
        for (c, regime) in Regime::ALL.iter().enumerate() {
            let (cx, cy) = regime.center();
            let d2 = (g - cx).powi(2) + (i - cy).powi(2);
            scores[c] = -d2 / (2.0 * sigma * sigma);
        }
        let row = softmax(scores);
        state.push(RegimeState::Dominant(argmax_regime(&row)));
        probs.push(row);
        index.push(date);
    }

    RegimeFrame {
        index,
        probs,
        state,
    }
}

fn softmax(scores: [f64; 4]) -> [f64; 4] {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut out = [0.0_f64; 4];
    let mut sum = 0.0;
    for (c, s) in scores.iter().enumerate() {
        let e = (s - max).exp();
        out[c] = e;
        sum += e;
    }
    for p in &mut out {
        *p /= sum;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn pair(g: f64, i: f64) -> (TimeSeries, TimeSeries) {
        let date = d(2024, 1, 31);
        (
            TimeSeries::from_points(vec![(date, g)]),
            TimeSeries::from_points(vec![(date, i)]),
        )
    }

    #[test]
    fn rows_sum_to_one() {
        let (g, i) = pair(0.3, -1.2);
        let out = quadrant_probabilities(&g, &i, DEFAULT_SIGMA);
        assert_eq!(out.probs.len(), 1);
        let sum: f64 = out.probs[0].iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        for p in out.probs[0] {
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn high_growth_low_inflation_is_goldilocks() {
        let (g, i) = pair(0.8, -0.6);
        let out = quadrant_probabilities(&g, &i, DEFAULT_SIGMA);
        let goldilocks = out.prob(0, Regime::Goldilocks);
        for regime in [Regime::Reflation, Regime::Stagflation, Regime::Slowdown] {
            assert!(goldilocks > out.prob(0, regime));
        }
        assert_eq!(out.state[0], RegimeState::Dominant(Regime::Goldilocks));
    }

    #[test]
    fn exact_center_dominates() {
        for regime in Regime::ALL {
            let (cx, cy) = regime.center();
            let (g, i) = pair(cx, cy);
            let out = quadrant_probabilities(&g, &i, DEFAULT_SIGMA);
            assert_eq!(out.state[0], RegimeState::Dominant(regime));
        }
    }

    #[test]
    fn missing_input_rows_are_dropped() {
        let dates = [d(2024, 1, 31), d(2024, 2, 29), d(2024, 3, 31)];
        let g = TimeSeries::from_points(vec![
            (dates[0], 1.0),
            (dates[1], f64::NAN),
            (dates[2], -1.0),
        ]);
        let i = TimeSeries::from_points(vec![(dates[0], 1.0), (dates[2], -1.0)]);
        let out = quadrant_probabilities(&g, &i, DEFAULT_SIGMA);
        assert_eq!(out.index, vec![dates[0], dates[2]]);
    }

    #[test]
    fn empty_inputs_yield_empty_frame() {
        let out = quadrant_probabilities(&TimeSeries::new(), &TimeSeries::new(), DEFAULT_SIGMA);
        assert!(out.index.is_empty());
        assert!(out.is_degenerate());
    }

    #[test]
    fn sigma_flattens_the_distribution() {
        let (g, i) = pair(0.8, -0.6);
        let sharp = quadrant_probabilities(&g, &i, 0.5);
        let flat = quadrant_probabilities(&g, &i, 3.0);
        assert!(sharp.prob(0, Regime::Goldilocks) > flat.prob(0, Regime::Goldilocks));
    }
}
