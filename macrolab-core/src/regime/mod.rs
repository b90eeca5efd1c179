//! Regime classification.
//!
//! Two interchangeable strategies, both consumed downstream:
//! - [`mixture::infer_regimes`] — unsupervised Gaussian-mixture classification
//!   over the macro driver frame (needs warm-up history).
//! - [`quadrant::quadrant_probabilities`] — closed-form quadrant scores over a
//!   (growth, inflation) z-score pair (no warm-up; per-country overlay and
//!   fallback).

pub mod mixture;
pub mod quadrant;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::Regime;

pub use mixture::infer_regimes;
pub use quadrant::quadrant_probabilities;

/// Classifier state at one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegimeState {
    /// Arg-max regime of a defined probability row.
    Dominant(Regime),
    /// Timestamp outside the classifier's fitted rows.
    Undefined,
    /// Terminal degenerate output: warm-up precondition not met.
    InsufficientData,
}

/// Probability frame over the four canonical regimes plus the dominant-state
/// series. Probability columns follow [`Regime::ALL`] order; undefined
/// timestamps carry NaN rows, not zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeFrame {
    pub index: Vec<NaiveDate>,
    pub probs: Vec<[f64; 4]>,
    pub state: Vec<RegimeState>,
}

impl RegimeFrame {
    /// Frame with no timestamps at all.
    pub fn empty() -> Self {
        Self {
            index: Vec::new(),
            probs: Vec::new(),
            state: Vec::new(),
        }
    }

    /// All-undefined frame over `index` with the insufficient-data state.
    pub fn insufficient(index: Vec<NaiveDate>) -> Self {
        let n = index.len();
        Self {
            index,
            probs: vec![[f64::NAN; 4]; n],
            state: vec![RegimeState::InsufficientData; n],
        }
    }

    /// Whether no timestamp carries a defined probability row.
    pub fn is_degenerate(&self) -> bool {
        !self
            .probs
            .iter()
            .any(|row| row.iter().all(|p| p.is_finite()))
    }

    /// Probability of one regime at row `r`.
    pub fn prob(&self, r: usize, regime: Regime) -> f64 {
        let c = Regime::ALL.iter().position(|x| *x == regime).unwrap();
        self.probs[r][c]
    }

    /// Most recent fully-defined probability row.
    pub fn latest_defined(&self) -> Option<(NaiveDate, [f64; 4])> {
        self.index
            .iter()
            .zip(self.probs.iter())
            .rev()
            .find(|(_, row)| row.iter().all(|p| p.is_finite()))
            .map(|(date, row)| (*date, *row))
    }
}

/// Arg-max regime of one probability row (first wins on exact ties,
/// following [`Regime::ALL`] order).
pub(crate) fn argmax_regime(row: &[f64; 4]) -> Regime {
    let mut best = 0usize;
    for c in 1..4 {
        if row[c] > row[best] {
            best = c;
        }
    }
    Regime::ALL[best]
}
