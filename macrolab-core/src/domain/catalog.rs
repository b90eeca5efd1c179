//! Indicator catalog — configuration records driving the composite layer.
//!
//! Catalog entries are loaded once per session, validated eagerly, and never
//! mutated. A TOML file (`[[indicators]]` tables) can override the compiled-in
//! default catalog; malformed files are rejected with a structured error
//! rather than failing silently deep in the pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::transform::Transform;

/// Release frequency of an indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    D,
    M,
    Q,
    A,
}

impl Frequency {
    /// Whether the series is forward-filled onto the daily composite grid.
    pub fn ffill_applied(&self) -> bool {
        matches!(self, Frequency::M | Frequency::Q | Frequency::A)
    }
}

/// Hard (measured activity) vs soft (survey/sentiment) indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndicatorKind {
    Hard,
    Soft,
}

/// Position of an indicator relative to the economic cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Timing {
    Leading,
    Coincident,
    Lagging,
}

/// Macro category grouping indicators into composites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Pillar {
    Growth,
    Inflation,
    Labor,
    Financial,
}

impl std::fmt::Display for Pillar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Pillar::Growth => "GROWTH",
            Pillar::Inflation => "INFLATION",
            Pillar::Labor => "LABOR",
            Pillar::Financial => "FINANCIAL",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                IndicatorKind::Hard => "HARD",
                IndicatorKind::Soft => "SOFT",
            }
        )
    }
}

impl std::fmt::Display for Timing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Timing::Leading => "LEADING",
                Timing::Coincident => "COINCIDENT",
                Timing::Lagging => "LAGGING",
            }
        )
    }
}

/// One catalog entry. Immutable after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorDefinition {
    pub id: String,
    pub display_name: String,
    /// Provider name; unknown sources degrade to an empty series at fetch.
    pub source: String,
    pub source_key: String,
    pub country: String,
    pub frequency: Frequency,
    #[serde(rename = "type")]
    pub kind: IndicatorKind,
    pub timing: Timing,
    pub pillar: Pillar,
    pub transform: Transform,
    pub weight: f64,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("catalog has no indicators")]
    EmptyCatalog,

    #[error("indicator '{id}' has negative weight {weight}")]
    NegativeWeight { id: String, weight: f64 },

    #[error("duplicate indicator id '{0}'")]
    DuplicateId(String),
}

/// Validated, ordered collection of indicator definitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub indicators: Vec<IndicatorDefinition>,
}

impl Catalog {
    /// Validate an already-parsed indicator list.
    pub fn new(indicators: Vec<IndicatorDefinition>) -> Result<Self, CatalogError> {
        if indicators.is_empty() {
            return Err(CatalogError::EmptyCatalog);
        }
        let mut seen = std::collections::HashSet::new();
        for ind in &indicators {
            if !(ind.weight >= 0.0) {
                return Err(CatalogError::NegativeWeight {
                    id: ind.id.clone(),
                    weight: ind.weight,
                });
            }
            if !seen.insert(ind.id.clone()) {
                return Err(CatalogError::DuplicateId(ind.id.clone()));
            }
        }
        Ok(Self { indicators })
    }

    /// Parse a `[[indicators]]` TOML document.
    pub fn from_toml(content: &str) -> Result<Self, CatalogError> {
        let parsed: Catalog = toml::from_str(content)?;
        Self::new(parsed.indicators)
    }

    /// Load from a TOML file, falling back to the built-in default catalog
    /// when the file is absent. A present-but-malformed file is an error.
    pub fn load_or_default(path: &Path) -> Result<Self, CatalogError> {
        if !path.exists() {
            return Ok(Self::default_catalog());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    /// Compiled-in default indicator set.
    pub fn default_catalog() -> Self {
        let defs = [
            ("oecd_cli_us", "OECD CLI United States", "OECD", "OECD.SDD.STES,DSD_STES@DF_CLI,4.1/.M.LI...AA...H", "US", Frequency::M, IndicatorKind::Soft, Timing::Leading, Pillar::Growth, "zscore_36", 1.0),
            ("eurostat_consumer_conf", "Eurostat Consumer Confidence EU", "EUROSTAT", "teibs020", "EA", Frequency::M, IndicatorKind::Soft, Timing::Leading, Pillar::Growth, "zscore_36", 1.0),
            ("eurostat_industry_conf", "Eurostat Industry Confidence EU", "EUROSTAT", "ei_bsco_m", "EA", Frequency::M, IndicatorKind::Soft, Timing::Leading, Pillar::Growth, "zscore_36", 1.0),
            ("us_umcsent", "US Michigan Sentiment", "FRED", "UMCSENT", "US", Frequency::M, IndicatorKind::Soft, Timing::Leading, Pillar::Growth, "zscore_36", 1.0),
            ("us_indpro", "US Industrial Production", "FRED", "INDPRO", "US", Frequency::M, IndicatorKind::Hard, Timing::Coincident, Pillar::Growth, "yoy", 1.0),
            ("us_retail", "US Retail Sales", "FRED", "RRSFS", "US", Frequency::M, IndicatorKind::Hard, Timing::Coincident, Pillar::Growth, "yoy", 1.0),
            ("us_unrate", "US Unemployment Rate", "FRED", "UNRATE", "US", Frequency::M, IndicatorKind::Hard, Timing::Lagging, Pillar::Labor, "zscore_36_inv", 1.0),
            ("us_cpi", "US CPI Inflation", "FRED", "CPIAUCSL", "US", Frequency::M, IndicatorKind::Hard, Timing::Lagging, Pillar::Inflation, "yoy", 1.0),
            ("us_slope", "US 10Y-2Y Slope", "FRED", "T10Y2Y", "US", Frequency::D, IndicatorKind::Hard, Timing::Leading, Pillar::Financial, "zscore_252", 1.0),
            ("ea_slope", "Euro Area 10Y-2Y Slope", "ECB", "YC/B.U2.EUR.4F.G_N_A.SV_C_YM.SR_10Y", "EA", Frequency::D, IndicatorKind::Hard, Timing::Leading, Pillar::Financial, "zscore_252", 1.0),
            ("us_pmi_proxy", "US ISM PMI Proxy", "FRED", "NAPM", "US", Frequency::M, IndicatorKind::Soft, Timing::Leading, Pillar::Growth, "zscore_36", 1.0),
            ("eu_unemployment", "Euro Area Unemployment", "FRED", "LRHUTTTTEZM156S", "EA", Frequency::M, IndicatorKind::Hard, Timing::Lagging, Pillar::Labor, "zscore_36_inv", 1.0),
            ("eu_hicp", "Euro Area HICP", "FRED", "CP0000EZ19M086NEST", "EA", Frequency::M, IndicatorKind::Hard, Timing::Lagging, Pillar::Inflation, "yoy", 1.0),
            ("eu_ip", "Euro Area Industrial Production", "FRED", "PRMNTO01EZM661N", "EA", Frequency::M, IndicatorKind::Hard, Timing::Coincident, Pillar::Growth, "yoy", 1.0),
            ("us_housing", "US Housing Starts", "FRED", "HOUST", "US", Frequency::M, IndicatorKind::Hard, Timing::Leading, Pillar::Growth, "yoy", 0.8),
            ("us_wages", "US Average Hourly Earnings", "FRED", "CES0500000003", "US", Frequency::M, IndicatorKind::Hard, Timing::Lagging, Pillar::Inflation, "yoy", 0.8),
        ];
        let indicators = defs
            .into_iter()
            .map(
                |(id, name, source, key, country, frequency, kind, timing, pillar, transform, weight)| {
                    IndicatorDefinition {
                        id: id.to_string(),
                        display_name: name.to_string(),
                        source: source.to_string(),
                        source_key: key.to_string(),
                        country: country.to_string(),
                        frequency,
                        kind,
                        timing,
                        pillar,
                        transform: transform.parse().expect("default catalog transform"),
                        weight,
                    }
                },
            )
            .collect();
        Self { indicators }
    }
}
