//! Serializable run configuration with a content-addressable run id.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use macrolab_core::allocation::{Profile, BOND_BUCKET, EQUITY_BUCKET, GOLD_BUCKET};
use macrolab_core::data::ProviderFlags;

/// Unique identifier for one session run (content hash of the configuration).
pub type RunId = String;

/// All parameters needed to reproduce a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    /// Query window (inclusive).
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Staleness anchor; normally today.
    pub as_of: NaiveDate,
    pub profile: Profile,
    /// Anchor flexibility for regime tilts, in weight points.
    pub flex: f64,
    pub provider_flags: ProviderFlags,
    /// Market tickers to load (validated against the allowed registry).
    pub tickers: Vec<String>,
}

impl RunConfig {
    /// Twenty years ending at `as_of`, balanced profile, full universe.
    pub fn defaults(as_of: NaiveDate) -> Self {
        Self {
            start: as_of - chrono::Duration::days(20 * 365),
            end: as_of,
            as_of,
            profile: Profile::Balanced,
            flex: 0.10,
            provider_flags: ProviderFlags::all_enabled(),
            tickers: default_universe(),
        }
    }

    /// Deterministic content hash; identical configs share cached artifacts.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("RunConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// Parse a TOML run configuration.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Investable buckets plus the proxy inputs the driver frame needs.
pub fn default_universe() -> Vec<String> {
    EQUITY_BUCKET
        .iter()
        .chain(BOND_BUCKET)
        .chain(GOLD_BUCKET)
        .chain(["BZ=F"].iter())
        .map(|t| t.to_string())
        .collect()
}
