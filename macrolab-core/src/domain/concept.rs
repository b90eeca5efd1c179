//! Concepts — abstract macro quantities resolved from competing providers.

use serde::{Deserialize, Serialize};

/// One (provider, provider-series-id) pair considered for a concept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub provider: String,
    pub series_id: String,
}

impl Candidate {
    pub fn new(provider: &str, series_id: &str) -> Self {
        Self {
            provider: provider.to_string(),
            series_id: series_id.to_string(),
        }
    }

    /// `PROVIDER:SERIES_ID` label used in lineage records.
    pub fn label(&self) -> String {
        format!("{}:{}", self.provider, self.series_id)
    }
}

/// An abstract macro/financial quantity with a priority-ordered candidate
/// list. Configuration: created at startup, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub name: String,
    pub candidates: Vec<Candidate>,
}

impl Concept {
    pub fn new(name: &str, candidates: Vec<Candidate>) -> Self {
        Self {
            name: name.to_string(),
            candidates,
        }
    }
}

/// Built-in concept priority table.
pub fn default_concepts() -> Vec<Concept> {
    let table: &[(&str, &[(&str, &str)])] = &[
        ("us_3m", &[("FRED", "DTB3"), ("TREASURY", "DGS3MO")]),
        ("us_2y", &[("FRED", "DGS2"), ("TREASURY", "DGS2")]),
        ("us_10y", &[("FRED", "DGS10"), ("TREASURY", "DGS10")]),
        ("us_30y", &[("FRED", "DGS30"), ("TREASURY", "DGS30")]),
        ("us_real_10y", &[("FRED", "DFII10"), ("TREASURY", "REAL10Y")]),
        (
            "ger_2y",
            &[
                ("BUNDESBANK", "GER2Y"),
                ("ECB", "GER2Y"),
                ("FRED", "IRLTLT01DEM156N"),
            ],
        ),
        (
            "ger_10y",
            &[
                ("BUNDESBANK", "GER10Y"),
                ("ECB", "GER10Y"),
                ("FRED", "IRLTLT01DEM156N"),
            ],
        ),
        ("ger_30y", &[("BUNDESBANK", "GER30Y"), ("ECB", "GER30Y")]),
        ("hy_oas", &[("FRED", "BAMLH0A0HYM2")]),
        ("ig_oas", &[("FRED", "BAMLC0A0CM")]),
        ("hy_yield", &[("FRED", "BAMLH0A0HYM2SYTW")]),
        ("ig_yield", &[("FRED", "BAMLC0A0CMEY")]),
        (
            "euro_inflation",
            &[("ECB", "EA_HICP"), ("OECD", "CPALTT01EZM661S")],
        ),
        (
            "euro_unemployment",
            &[("ECB", "EA_UNEMP"), ("FRED", "LRHUTTTTEZM156S")],
        ),
        (
            "euro_cli",
            &[("OECD", "LOLITOAAEA"), ("FRED", "OECDELOLITONOSTSAM")],
        ),
        (
            "japan_inflation",
            &[("OECD", "CPGRLE01JPM659N"), ("FRED", "CPGRLE01JPQ657N")],
        ),
        ("commodities_impulse", &[("WB_PINK", "CRUDE_BRENT")]),
    ];
    table
        .iter()
        .map(|(name, candidates)| {
            Concept::new(
                name,
                candidates
                    .iter()
                    .map(|(p, s)| Candidate::new(p, s))
                    .collect(),
            )
        })
        .collect()
}

/// Look up a built-in concept by name.
pub fn find_concept(name: &str) -> Option<Concept> {
    default_concepts().into_iter().find(|c| c.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_order_is_preserved() {
        let c = find_concept("us_2y").unwrap();
        assert_eq!(c.candidates[0].provider, "FRED");
        assert_eq!(c.candidates[1].provider, "TREASURY");
    }

    #[test]
    fn candidate_label_format() {
        assert_eq!(Candidate::new("FRED", "DGS10").label(), "FRED:DGS10");
    }

    #[test]
    fn unknown_concept_is_none() {
        assert!(find_concept("not_a_concept").is_none());
    }
}
