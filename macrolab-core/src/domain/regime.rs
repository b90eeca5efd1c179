//! The four canonical macro-financial regimes.

use serde::{Deserialize, Serialize};

/// Canonical regime labels, defined by the (growth, inflation) quadrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Regime {
    /// Growth high, inflation high.
    Reflation,
    /// Growth high, inflation low.
    Goldilocks,
    /// Growth low, inflation high.
    Stagflation,
    /// Growth low, inflation low.
    Slowdown,
}

impl Regime {
    /// Fixed presentation order used by probability frames.
    pub const ALL: [Regime; 4] = [
        Regime::Goldilocks,
        Regime::Reflation,
        Regime::Slowdown,
        Regime::Stagflation,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Regime::Reflation => "Reflation",
            Regime::Goldilocks => "Goldilocks",
            Regime::Stagflation => "Stagflation",
            Regime::Slowdown => "Slowdown",
        }
    }

    /// Label a (growth-high, inflation-high) pair.
    pub fn from_quadrant(growth_high: bool, inflation_high: bool) -> Regime {
        match (growth_high, inflation_high) {
            (true, true) => Regime::Reflation,
            (true, false) => Regime::Goldilocks,
            (false, true) => Regime::Stagflation,
            (false, false) => Regime::Slowdown,
        }
    }

    /// Canonical quadrant center in (growth, inflation) z-space.
    pub fn center(&self) -> (f64, f64) {
        match self {
            Regime::Reflation => (1.0, 1.0),
            Regime::Goldilocks => (1.0, -1.0),
            Regime::Stagflation => (-1.0, 1.0),
            Regime::Slowdown => (-1.0, -1.0),
        }
    }
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadrant_labels() {
        assert_eq!(Regime::from_quadrant(true, true), Regime::Reflation);
        assert_eq!(Regime::from_quadrant(true, false), Regime::Goldilocks);
        assert_eq!(Regime::from_quadrant(false, true), Regime::Stagflation);
        assert_eq!(Regime::from_quadrant(false, false), Regime::Slowdown);
    }

    #[test]
    fn centers_match_labels() {
        for r in Regime::ALL {
            let (g, i) = r.center();
            assert_eq!(Regime::from_quadrant(g > 0.0, i > 0.0), r);
        }
    }
}
