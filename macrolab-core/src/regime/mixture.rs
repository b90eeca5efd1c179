//! Driver-based unsupervised regime classification.
//!
//! Fits a 4-component Gaussian mixture (diagonal covariance, deterministic
//! seeded EM) over the macro driver vectors and reads regimes out of the
//! responsibility matrix. Components are labeled by where the growth and
//! inflation drivers sit in their own history at the component's
//! peak-responsibility timestamp; components that land on the same label are
//! summed — the mixture may discover more structure than four semantic
//! regimes, and that is intentional.

use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::domain::{Frame, Regime};

use super::{argmax_regime, RegimeFrame, RegimeState};

/// Complete-row warm-up required before fitting.
pub const MIN_OBSERVATIONS: usize = 36;

/// Fixed seed for reproducible EM initialization.
pub const MIXTURE_SEED: u64 = 7;

/// Responsibility clip bounds applied before renormalization — prevents
/// overconfident 0/1 probabilities on a small, noisy feature set.
pub const RESP_CLIP: (f64, f64) = (0.02, 0.94);

/// Exponential smoothing coefficient (span 3, recursive form).
pub const SMOOTHING_ALPHA: f64 = 0.5;

const MAX_ITER: usize = 200;
const TOL: f64 = 1e-6;
const VAR_FLOOR: f64 = 1e-6;

/// Diagonal-covariance Gaussian mixture fitted by seeded EM.
#[derive(Debug, Clone)]
pub struct GaussianMixture {
    pub weights: Vec<f64>,
    pub means: Vec<Vec<f64>>,
    pub vars: Vec<Vec<f64>>,
}

impl GaussianMixture {
    /// Fit `k` components to rows of `x`. Initialization draws component
    /// means from `k` distinct observations chosen by a seeded RNG, so the
    /// fit is a pure function of (x, k, seed).
    pub fn fit(x: &[Vec<f64>], k: usize, seed: u64) -> Self {
        let n = x.len();
        let dims = x[0].len();
        assert!(n >= k, "need at least k observations");

        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut rng);
        let means: Vec<Vec<f64>> = indices[..k].iter().map(|&i| x[i].clone()).collect();

        let col_vars: Vec<f64> = (0..dims)
            .map(|d| {
                let mean = x.iter().map(|row| row[d]).sum::<f64>() / n as f64;
                let var =
                    x.iter().map(|row| (row[d] - mean).powi(2)).sum::<f64>() / n as f64;
                var.max(VAR_FLOOR)
            })
            .collect();

        let mut model = Self {
            weights: vec![1.0 / k as f64; k],
            means,
            vars: vec![col_vars; k],
        };

        let mut prev_ll = f64::NEG_INFINITY;
        for _ in 0..MAX_ITER {
            let (resp, ll) = model.e_step(x);
            model.m_step(x, &resp);
            if (ll - prev_ll).abs() / (n as f64) < TOL {
                break;
            }
            prev_ll = ll;
        }
        model
    }

    /// Soft cluster assignment per row (posterior component probabilities).
    pub fn responsibilities(&self, x: &[Vec<f64>]) -> Vec<Vec<f64>> {
        self.e_step(x).0
    }

    fn e_step(&self, x: &[Vec<f64>]) -> (Vec<Vec<f64>>, f64) {
        let k = self.weights.len();
        let mut resp = Vec::with_capacity(x.len());
        let mut ll = 0.0;
        for row in x {
            let mut logp = vec![0.0_f64; k];
            for c in 0..k {
                logp[c] = self.weights[c].ln() + self.log_pdf(row, c);
            }
            let max = logp.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let lse = max + logp.iter().map(|lp| (lp - max).exp()).sum::<f64>().ln();
            ll += lse;
            resp.push(logp.iter().map(|lp| (lp - lse).exp()).collect());
        }
        (resp, ll)
    }

    fn m_step(&mut self, x: &[Vec<f64>], resp: &[Vec<f64>]) {
        let k = self.weights.len();
        let dims = x[0].len();
        let n = x.len() as f64;
        for c in 0..k {
            let nk: f64 = resp.iter().map(|r| r[c]).sum();
            if nk <= 0.0 {
                continue;
            }
            self.weights[c] = nk / n;
            for d in 0..dims {
                let mean =
                    x.iter().zip(resp).map(|(row, r)| r[c] * row[d]).sum::<f64>() / nk;
                self.means[c][d] = mean;
                let var = x
                    .iter()
                    .zip(resp)
                    .map(|(row, r)| r[c] * (row[d] - mean).powi(2))
                    .sum::<f64>()
                    / nk;
                self.vars[c][d] = var.max(VAR_FLOOR);
            }
        }
    }

    fn log_pdf(&self, row: &[f64], c: usize) -> f64 {
        let mut lp = 0.0;
        for (d, v) in row.iter().enumerate() {
            let var = self.vars[c][d];
            lp += -0.5 * (std::f64::consts::TAU * var).ln()
                - (v - self.means[c][d]).powi(2) / (2.0 * var);
        }
        lp
    }
}

/// Classify the macro driver frame.
///
/// The first driver column is the growth proxy and the second the inflation
/// proxy; both anchor component labeling. Rows with any missing driver are
/// excluded from the fit and come back as undefined timestamps.
pub fn infer_regimes(drivers: &Frame) -> RegimeFrame {
    let complete = drivers.drop_incomplete_rows();
    if complete.nrows() < MIN_OBSERVATIONS {
        return RegimeFrame::insufficient(drivers.index().to_vec());
    }

    let x: Vec<Vec<f64>> = (0..complete.nrows()).map(|r| complete.row(r)).collect();
    let model = GaussianMixture::fit(&x, 4, MIXTURE_SEED);
    let mut resp = model.responsibilities(&x);
    clip_and_renormalize(&mut resp);

    let growth_col = complete.columns()[0].clone();
    let infl_col = complete.columns()[1].clone();
    let growth_ranks = pct_ranks(complete.column(&growth_col).unwrap());
    let infl_ranks = pct_ranks(complete.column(&infl_col).unwrap());
    let labels = label_components(&resp, &growth_ranks, &infl_ranks);

    let mut probs = collapse_labels(&resp, &labels);
    smooth(&mut probs, SMOOTHING_ALPHA);
    renormalize_rows(&mut probs);

    // reindex onto the full driver index; excluded rows stay undefined
    let mut by_date = std::collections::HashMap::new();
    for (r, date) in complete.index().iter().enumerate() {
        by_date.insert(*date, probs[r]);
    }
    let index = drivers.index().to_vec();
    let mut out_probs = Vec::with_capacity(index.len());
    let mut out_state = Vec::with_capacity(index.len());
    for date in &index {
        match by_date.get(date) {
            Some(row) => {
                out_probs.push(*row);
                out_state.push(RegimeState::Dominant(argmax_regime(row)));
            }
            None => {
                out_probs.push([f64::NAN; 4]);
                out_state.push(RegimeState::Undefined);
            }
        }
    }

    RegimeFrame {
        index,
        probs: out_probs,
        state: out_state,
    }
}

/// Clip responsibilities into [`RESP_CLIP`] and renormalize each row.
fn clip_and_renormalize(resp: &mut [Vec<f64>]) {
    let (lo, hi) = RESP_CLIP;
    for row in resp.iter_mut() {
        let mut sum = 0.0;
        for p in row.iter_mut() {
            *p = p.clamp(lo, hi);
            sum += *p;
        }
        for p in row.iter_mut() {
            *p /= sum;
        }
    }
}

/// Percentile rank of each value within the whole slice (average rank under
/// ties, 1-based, divided by n).
fn pct_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut indexed: Vec<(usize, f64)> = values.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut ranks = vec![0.0_f64; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j < n && (indexed[j].1 - indexed[i].1).abs() < 1e-15 {
            j += 1;
        }
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        for idx in &indexed[i..j] {
            ranks[idx.0] = avg_rank / n as f64;
        }
        i = j;
    }
    ranks
}

/// Label each component by the growth/inflation percentile ranks at the
/// timestamp where the component peaks.
fn label_components(
    resp: &[Vec<f64>],
    growth_ranks: &[f64],
    infl_ranks: &[f64],
) -> Vec<Regime> {
    let k = resp[0].len();
    (0..k)
        .map(|c| {
            let mut peak = 0usize;
            for r in 1..resp.len() {
                if resp[r][c] > resp[peak][c] {
                    peak = r;
                }
            }
            let growth_high = growth_ranks[peak] >= 0.5;
            let inflation_high = infl_ranks[peak] >= 0.5;
            Regime::from_quadrant(growth_high, inflation_high)
        })
        .collect()
}

/// Sum colliding component probabilities into canonical regime columns
/// ([`Regime::ALL`] order); labels that never occur stay zero.
fn collapse_labels(resp: &[Vec<f64>], labels: &[Regime]) -> Vec<[f64; 4]> {
    resp.iter()
        .map(|row| {
            let mut out = [0.0_f64; 4];
            for (c, p) in row.iter().enumerate() {
                let slot = Regime::ALL
                    .iter()
                    .position(|r| *r == labels[c])
                    .unwrap();
                out[slot] += p;
            }
            out
        })
        .collect()
}

/// Recursive exponential smoothing down the rows, per column.
fn smooth(probs: &mut [[f64; 4]], alpha: f64) {
    for r in 1..probs.len() {
        for c in 0..4 {
            probs[r][c] = alpha * probs[r][c] + (1.0 - alpha) * probs[r - 1][c];
        }
    }
}

/// Re-impose the simplex constraint after smoothing.
fn renormalize_rows(probs: &mut [[f64; 4]]) {
    for row in probs.iter_mut() {
        let sum: f64 = row.iter().sum();
        if sum > 0.0 {
            for p in row.iter_mut() {
                *p /= sum;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::domain::series::month_end;

    fn monthly_index(n: usize) -> Vec<NaiveDate> {
        let (mut y, mut m) = (2015, 1);
        (0..n)
            .map(|_| {
                let d = month_end(y, m);
                if m == 12 {
                    y += 1;
                    m = 1;
                } else {
                    m += 1;
                }
                d
            })
            .collect()
    }

    /// Driver frame alternating between a hot (high growth, high inflation)
    /// and a cold (low, low) state in long blocks, with three auxiliary
    /// drivers tracking the same cycle.
    fn two_state_drivers(n: usize) -> Frame {
        let index = monthly_index(n);
        let phase = |i: usize| if (i / 12) % 2 == 0 { 1.0 } else { -1.0 };
        let wobble = |i: usize| ((i as f64) * 0.7).sin() * 0.1;
        let mut frame = Frame::with_index(index);
        frame.push_column(
            "growth".into(),
            (0..n).map(|i| 2.0 * phase(i) + wobble(i)).collect(),
        );
        frame.push_column(
            "inflation".into(),
            (0..n).map(|i| 1.5 * phase(i) - wobble(i)).collect(),
        );
        frame.push_column(
            "real_rates".into(),
            (0..n).map(|i| 0.5 * phase(i) + wobble(i) * 2.0).collect(),
        );
        frame.push_column(
            "slope".into(),
            (0..n).map(|i| -0.8 * phase(i) + wobble(i)).collect(),
        );
        frame.push_column(
            "stress".into(),
            (0..n).map(|i| -1.2 * phase(i) - wobble(i)).collect(),
        );
        frame
    }

    #[test]
    fn short_history_is_insufficient_not_an_error() {
        let frame = two_state_drivers(20);
        let out = infer_regimes(&frame);
        assert!(out.is_degenerate());
        assert_eq!(out.index.len(), 20);
        assert!(out
            .state
            .iter()
            .all(|s| *s == RegimeState::InsufficientData));
    }

    #[test]
    fn defined_rows_satisfy_the_simplex() {
        let out = infer_regimes(&two_state_drivers(96));
        let mut defined = 0;
        for row in &out.probs {
            if row.iter().all(|p| p.is_finite()) {
                defined += 1;
                let sum: f64 = row.iter().sum();
                assert!((sum - 1.0).abs() < 1e-6);
                for p in row {
                    assert!((0.0..=1.0).contains(p));
                }
            }
        }
        assert_eq!(defined, 96);
    }

    #[test]
    fn classification_is_deterministic() {
        let frame = two_state_drivers(96);
        let a = infer_regimes(&frame);
        let b = infer_regimes(&frame);
        assert_eq!(a, b);
    }

    #[test]
    fn hot_blocks_lean_reflation_cold_blocks_lean_slowdown() {
        let out = infer_regimes(&two_state_drivers(96));
        // deep inside a hot block growth and inflation both rank high
        let hot = out.prob(6, Regime::Reflation) + out.prob(6, Regime::Goldilocks);
        let cold = out.prob(18, Regime::Slowdown) + out.prob(18, Regime::Stagflation);
        assert!(hot > 0.5, "hot block should favor high-growth regimes: {hot}");
        assert!(cold > 0.5, "cold block should favor low-growth regimes: {cold}");
    }

    #[test]
    fn incomplete_rows_come_back_undefined() {
        let mut frame = two_state_drivers(96);
        // punch a hole in one driver
        let n = frame.nrows();
        let mut col = frame.column("stress").unwrap().to_vec();
        col[40] = f64::NAN;
        let index = frame.index().to_vec();
        let mut rebuilt = Frame::with_index(index);
        for name in ["growth", "inflation", "real_rates", "slope"] {
            rebuilt.push_column(name.into(), frame.column(name).unwrap().to_vec());
        }
        rebuilt.push_column("stress".into(), col);
        frame = rebuilt;
        assert_eq!(frame.nrows(), n);

        let out = infer_regimes(&frame);
        assert_eq!(out.state[40], RegimeState::Undefined);
        assert!(out.probs[40].iter().all(|p| p.is_nan()));
        assert!(matches!(out.state[39], RegimeState::Dominant(_)));
        assert!(matches!(out.state[41], RegimeState::Dominant(_)));
    }

    #[test]
    fn colliding_labels_sum_probabilities() {
        let resp = vec![
            vec![0.4, 0.3, 0.2, 0.1],
            vec![0.1, 0.2, 0.3, 0.4],
        ];
        let labels = vec![
            Regime::Reflation,
            Regime::Reflation,
            Regime::Slowdown,
            Regime::Goldilocks,
        ];
        let out = collapse_labels(&resp, &labels);
        // Reflation column receives both colliding components
        assert!((out[0][1] - 0.7).abs() < 1e-12);
        assert!((out[0][2] - 0.2).abs() < 1e-12);
        assert!((out[0][0] - 0.1).abs() < 1e-12);
        // Stagflation never occurs: zero, not NaN
        assert_eq!(out[0][3], 0.0);
    }

    #[test]
    fn clip_keeps_rows_on_the_simplex() {
        let mut resp = vec![vec![0.999, 0.0005, 0.0003, 0.0002]];
        clip_and_renormalize(&mut resp);
        let sum: f64 = resp[0].iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        // no component may keep an overconfident share
        let max = resp[0].iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert!(max < 0.95);
        let min = resp[0].iter().copied().fold(f64::INFINITY, f64::min);
        assert!(min > 0.0);
    }

    #[test]
    fn smoothing_then_renormalizing_restores_the_simplex() {
        let mut probs = vec![
            [0.7, 0.1, 0.1, 0.1],
            [0.1, 0.7, 0.1, 0.1],
            [0.1, 0.1, 0.7, 0.1],
        ];
        smooth(&mut probs, SMOOTHING_ALPHA);
        renormalize_rows(&mut probs);
        for row in &probs {
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
        // span-3 smoothing weights the current observation at one half
        assert!((probs[1][1] - (0.5 * 0.7 + 0.5 * 0.1)).abs() < 1e-9);
    }

    #[test]
    fn pct_ranks_average_ties() {
        let ranks = pct_ranks(&[1.0, 2.0, 2.0, 3.0]);
        assert!((ranks[0] - 0.25).abs() < 1e-12);
        assert!((ranks[1] - ranks[2]).abs() < 1e-12);
        assert!((ranks[1] - 0.625).abs() < 1e-12);
        assert!((ranks[3] - 1.0).abs() < 1e-12);
    }
}
