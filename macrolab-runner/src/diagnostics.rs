//! Post-run diagnostics — cheap invariant checks over session artifacts.

use serde::{Deserialize, Serialize};

use macrolab_core::data::prices::forbidden_tickers;
use macrolab_core::domain::Frame;
use macrolab_core::regime::RegimeFrame;

use crate::session::SessionArtifacts;

/// One named check outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    fn new(name: &str, passed: bool, detail: String) -> Self {
        Self {
            name: name.to_string(),
            passed,
            detail,
        }
    }
}

/// Defined regime probability rows must sum to 1 within 1e-6, each
/// component inside [0, 1].
pub fn check_regime_probs(frame: &RegimeFrame) -> bool {
    let mut any_defined = false;
    for row in &frame.probs {
        if row.iter().all(|p| p.is_finite()) {
            any_defined = true;
            let sum: f64 = row.iter().sum();
            if (sum - 1.0).abs() >= 1e-6 || row.iter().any(|p| !(0.0..=1.0).contains(p)) {
                return false;
            }
        }
    }
    any_defined
}

/// Every finite cell of a percentile frame must lie in [0, 100].
pub fn check_percentiles(frame: &Frame) -> bool {
    frame.columns().iter().all(|name| {
        frame
            .column(name)
            .unwrap()
            .iter()
            .filter(|v| v.is_finite())
            .all(|v| (0.0..=100.0).contains(v))
    })
}

/// Run the standard check battery over one session's artifacts.
pub fn run_checks(artifacts: &SessionArtifacts, tickers: &[String]) -> Vec<CheckResult> {
    let mut out = Vec::new();

    let forbidden = forbidden_tickers(tickers);
    out.push(CheckResult::new(
        "allowed_tickers",
        forbidden.is_empty(),
        format!("forbidden: {forbidden:?}"),
    ));

    let probs_ok = check_regime_probs(&artifacts.regimes)
        || artifacts
            .overlay
            .as_ref()
            .map(check_regime_probs)
            .unwrap_or(false);
    out.push(CheckResult::new(
        "regime_probabilities",
        probs_ok,
        "defined rows sum to 1 within 1e-6".into(),
    ));

    let total: f64 = artifacts.weights.iter().map(|r| r.weight).sum();
    let weights_ok = artifacts.weights.is_empty()
        || total.abs() < 1e-9
        || ((total - 1.0).abs() < 1e-6
            && artifacts.weights.iter().all(|r| r.weight <= 0.25 + 1e-9));
    out.push(CheckResult::new(
        "weight_table",
        weights_ok,
        format!("sum {total:.6}"),
    ));

    let stress_ok = (0.0..=1.0).contains(&artifacts.stress_percentile);
    out.push(CheckResult::new(
        "stress_percentile",
        stress_ok,
        format!("{:.3}", artifacts.stress_percentile),
    ));

    out
}
