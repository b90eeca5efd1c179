//! Constrained allocation engine.
//!
//! Converts monthly asset returns, a profile anchor, the latest regime
//! probabilities, and a credit-stress percentile into a target weight vector.
//! This is a risk-adjusted scoring heuristic with bucket targets and a
//! per-asset ceiling, not a mean-variance optimizer.

use serde::{Deserialize, Serialize};

use crate::domain::{Frame, Regime};

/// Per-asset weight ceiling.
pub const WEIGHT_CEILING: f64 = 0.25;

/// Trailing complete monthly observations used for estimation.
pub const LOOKBACK_MONTHS: usize = 120;

/// Stress percentile above which the high-yield de-risking rule fires.
pub const STRESS_DERISK_THRESHOLD: f64 = 0.6;

/// Fixed score penalty applied to the high-yield credit asset under stress.
pub const STRESS_DERISK_PENALTY: f64 = 0.05;

/// High-yield credit asset targeted by the de-risking rule.
const HIGH_YIELD_TICKER: &str = "HYG";

/// Static bucket membership lists (intersected with the available universe).
pub const EQUITY_BUCKET: &[&str] = &[
    "SPY", "VGK", "EWJ", "IEMG", "IVE", "IVW", "CV9.PA", "CG9.PA",
];
pub const BOND_BUCKET: &[&str] = &[
    "SHY", "IEI", "IEF", "TLT", "LQD", "HYG", "EM13.MI", "CBE7.AS", "LYXD.DE", "IEAC.L",
    "IHYG.L",
];
pub const GOLD_BUCKET: &[&str] = &["GLD"];

/// Investor profile anchoring the bucket split before regime tilts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Profile {
    Conservative,
    #[default]
    Balanced,
    Growth,
}

/// Anchor bucket weights (equity, bonds, gold); always sums to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub equity: f64,
    pub bonds: f64,
    pub gold: f64,
}

impl Profile {
    pub fn anchor(&self) -> Anchor {
        match self {
            Profile::Conservative => Anchor {
                equity: 0.35,
                bonds: 0.55,
                gold: 0.10,
            },
            Profile::Balanced => Anchor {
                equity: 0.50,
                bonds: 0.40,
                gold: 0.10,
            },
            Profile::Growth => Anchor {
                equity: 0.65,
                bonds: 0.25,
                gold: 0.10,
            },
        }
    }
}

/// One row of the output weight table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightRow {
    pub ticker: String,
    pub weight: f64,
    /// Bucket anchor weight divided evenly across bucket members.
    pub anchor: f64,
    /// weight − anchor.
    pub delta: f64,
}

/// Recommend target weights.
///
/// `regime_probs` is the latest defined probability row in [`Regime::ALL`]
/// order (absent probabilities count as zero tilt). `stress` is the credit
/// stress percentile in [0, 1]. `flex` bounds the regime tilt around each
/// bucket anchor. With no complete investable history the result is a
/// structurally valid all-zero table.
pub fn recommend_weights(
    monthly_ret: &Frame,
    profile: Profile,
    regime_probs: Option<[f64; 4]>,
    stress: f64,
    flex: f64,
) -> Vec<WeightRow> {
    let in_universe = |bucket: &[&str]| -> Vec<String> {
        bucket
            .iter()
            .filter(|t| monthly_ret.has_column(t))
            .map(|t| t.to_string())
            .collect()
    };
    let equity = in_universe(EQUITY_BUCKET);
    let bonds = in_universe(BOND_BUCKET);
    let gold = in_universe(GOLD_BUCKET);
    let investable: Vec<String> = equity
        .iter()
        .chain(&bonds)
        .chain(&gold)
        .cloned()
        .collect();
    if investable.is_empty() {
        return Vec::new();
    }

    let restricted = {
        let series: Vec<_> = investable
            .iter()
            .filter_map(|t| monthly_ret.column_series(t).map(|s| (t.clone(), s)))
            .collect();
        Frame::from_series_outer(&series)
    };
    let window = restricted.tail_complete(LOOKBACK_MONTHS);
    if window.nrows() == 0 {
        return zero_table(&investable);
    }

    // expected return: half long-run mean, half trailing-12-month mean
    let rows: Vec<Vec<f64>> = (0..window.nrows()).map(|r| window.row(r)).collect();
    let p = investable.len();
    let n = rows.len();
    let mu: Vec<f64> = (0..p)
        .map(|a| {
            let long_run = rows.iter().map(|r| r[a]).sum::<f64>() / n as f64;
            let tail = &rows[n.saturating_sub(12)..];
            let recent = tail.iter().map(|r| r[a]).sum::<f64>() / tail.len() as f64;
            0.5 * long_run + 0.5 * recent
        })
        .collect();

    // risk: diagonal of the shrunk covariance
    let (cov, _) = shrinkage_covariance(&rows);
    let risk: Vec<f64> = (0..p).map(|a| cov[a][a]).collect();

    let mut score: Vec<f64> = mu
        .iter()
        .zip(&risk)
        .map(|(m, v)| m - 0.5 * v)
        .collect();
    if stress > STRESS_DERISK_THRESHOLD {
        if let Some(i) = investable.iter().position(|t| t == HIGH_YIELD_TICKER) {
            score[i] -= STRESS_DERISK_PENALTY;
        }
    }

    // clip negatives, normalize across the full investable set
    let mut w: Vec<f64> = score.iter().map(|s| s.max(0.0)).collect();
    let total: f64 = w.iter().sum();
    if total > 0.0 {
        for v in &mut w {
            *v /= total;
        }
    }

    // bucket targets: anchor ± flex × regime tilt
    let probs = regime_probs.unwrap_or([0.0; 4]);
    let prob = |regime: Regime| {
        let c = Regime::ALL.iter().position(|r| *r == regime).unwrap();
        probs[c]
    };
    let anchor = profile.anchor();
    let equity_target =
        anchor.equity + flex * (prob(Regime::Goldilocks) - prob(Regime::Slowdown));
    let bond_target =
        anchor.bonds + flex * (prob(Regime::Slowdown) + prob(Regime::Stagflation) - 0.5);
    let gold_target = anchor.gold;

    let idx_of = |t: &String| investable.iter().position(|x| x == t).unwrap();
    let mut scaled = vec![0.0_f64; p];
    for (bucket, target) in [
        (&equity, equity_target),
        (&bonds, bond_target),
        (&gold, gold_target),
    ] {
        let s: f64 = bucket.iter().map(|t| w[idx_of(t)]).sum();
        if s > 0.0 {
            for t in bucket.iter() {
                let i = idx_of(t);
                scaled[i] = w[i] * target / s;
            }
        }
    }

    cap_and_renormalize(&mut scaled, WEIGHT_CEILING);

    let anchor_of = |t: &String| -> f64 {
        if equity.contains(t) {
            anchor.equity / equity.len().max(1) as f64
        } else if bonds.contains(t) {
            anchor.bonds / bonds.len().max(1) as f64
        } else {
            anchor.gold / gold.len().max(1) as f64
        }
    };

    let mut out: Vec<WeightRow> = investable
        .iter()
        .enumerate()
        .map(|(i, t)| WeightRow {
            ticker: t.clone(),
            weight: scaled[i],
            anchor: anchor_of(t),
            delta: scaled[i] - anchor_of(t),
        })
        .collect();
    out.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(std::cmp::Ordering::Equal));
    out
}

fn zero_table(investable: &[String]) -> Vec<WeightRow> {
    investable
        .iter()
        .map(|t| WeightRow {
            ticker: t.clone(),
            weight: 0.0,
            anchor: 0.0,
            delta: 0.0,
        })
        .collect()
}

/// Clip to `[0, cap]` and rescale to sum 1, redistributing the excess of
/// capped assets across the uncapped ones until the cap holds everywhere.
/// When the cap makes a unit sum infeasible (cap × assets < 1) every asset
/// ends at the cap.
fn cap_and_renormalize(w: &mut [f64], cap: f64) {
    let total: f64 = w.iter().map(|v| v.max(0.0)).sum();
    if total <= 0.0 {
        for v in w.iter_mut() {
            *v = 0.0;
        }
        return;
    }
    for v in w.iter_mut() {
        *v = v.max(0.0) / total;
    }
    for _ in 0..w.len().max(1) {
        let mut capped_sum = 0.0;
        let mut free_sum = 0.0;
        for v in w.iter_mut() {
            if *v >= cap {
                *v = cap;
                capped_sum += cap;
            } else {
                free_sum += *v;
            }
        }
        let residual = 1.0 - capped_sum;
        if free_sum <= 0.0 || residual <= 0.0 {
            break;
        }
        let scale = residual / free_sum;
        let mut done = true;
        for v in w.iter_mut() {
            if *v < cap {
                *v *= scale;
                if *v > cap {
                    done = false;
                }
            }
        }
        if done {
            break;
        }
    }
    for v in w.iter_mut() {
        if *v > cap {
            *v = cap;
        }
    }
}

/// Ledoit–Wolf-style shrinkage of the sample covariance toward a scaled
/// identity target. Returns (shrunk covariance, shrinkage intensity).
pub fn shrinkage_covariance(rows: &[Vec<f64>]) -> (Vec<Vec<f64>>, f64) {
    let n = rows.len();
    let p = rows[0].len();

    let means: Vec<f64> = (0..p)
        .map(|a| rows.iter().map(|r| r[a]).sum::<f64>() / n as f64)
        .collect();
    let centered: Vec<Vec<f64>> = rows
        .iter()
        .map(|r| r.iter().zip(&means).map(|(v, m)| v - m).collect())
        .collect();

    let mut sample = vec![vec![0.0_f64; p]; p];
    for row in &centered {
        for a in 0..p {
            for b in 0..p {
                sample[a][b] += row[a] * row[b];
            }
        }
    }
    for r in sample.iter_mut() {
        for v in r.iter_mut() {
            *v /= n as f64;
        }
    }

    let m = (0..p).map(|a| sample[a][a]).sum::<f64>() / p as f64;
    let d2: f64 = (0..p)
        .map(|a| {
            (0..p)
                .map(|b| {
                    let target = if a == b { m } else { 0.0 };
                    (sample[a][b] - target).powi(2)
                })
                .sum::<f64>()
        })
        .sum::<f64>()
        / p as f64;

    let mut b2_sum = 0.0;
    for row in &centered {
        let mut norm = 0.0;
        for a in 0..p {
            for b in 0..p {
                norm += (row[a] * row[b] - sample[a][b]).powi(2);
            }
        }
        b2_sum += norm;
    }
    let b2 = (b2_sum / (n as f64 * n as f64) / p as f64).min(d2);
    let delta = if d2 > 0.0 { b2 / d2 } else { 0.0 };

    let mut shrunk = sample;
    for a in 0..p {
        for b in 0..p {
            let target = if a == b { m } else { 0.0 };
            shrunk[a][b] = delta * target + (1.0 - delta) * shrunk[a][b];
        }
    }
    (shrunk, delta)
}
