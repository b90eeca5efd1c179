//! End-to-end session: one date-range/provider-toggle query through the whole
//! pipeline, producing every artifact the presentation layer consumes.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use macrolab_core::allocation::{recommend_weights, WeightRow};
use macrolab_core::composite::{build_composites, fetch_catalog_cached, Contribution, TidyObservation};
use macrolab_core::data::{
    fetch_prices, resolve_cached, MemoCache, PricePanelProvider, ProviderRegistry, ResolvedSeries,
    RetryPolicy,
};
use macrolab_core::domain::{Catalog, Frame};
use macrolab_core::features::{build_market_features, MarketFeatures};
use macrolab_core::regime::{infer_regimes, quadrant_probabilities, RegimeFrame};

use crate::config::RunConfig;
use crate::drivers::{build_driver_frame, stress_percentile};

/// Concepts the driver frame resolves every session.
pub const SESSION_CONCEPTS: [&str; 7] = [
    "us_2y",
    "us_10y",
    "us_real_10y",
    "hy_oas",
    "ig_oas",
    "euro_inflation",
    "euro_unemployment",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
}

/// Structured note about a soft failure or degraded path, surfaced alongside
/// best-effort results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub severity: Severity,
    pub message: String,
}

/// Every intermediate and final artifact of one session.
#[derive(Debug, Clone)]
pub struct SessionArtifacts {
    pub run_id: String,
    pub resolved: BTreeMap<String, ResolvedSeries>,
    pub features: MarketFeatures,
    pub tidy: Vec<TidyObservation>,
    pub composites: Frame,
    pub ledger: Vec<Contribution>,
    pub drivers: Frame,
    /// Mixture classification over the driver frame.
    pub regimes: RegimeFrame,
    /// Quadrant overlay on the US growth/inflation composites, when present.
    pub overlay: Option<RegimeFrame>,
    pub stress_percentile: f64,
    pub weights: Vec<WeightRow>,
    pub annotations: Vec<Annotation>,
}

/// Run one session.
///
/// The only fatal failure is a forbidden ticker at the price boundary; every
/// provider-side problem degrades to proxies, sentinels, or annotations.
pub fn run_session(
    config: &RunConfig,
    registry: &ProviderRegistry,
    prices: &dyn PricePanelProvider,
    cache: &MemoCache,
    catalog: &Catalog,
) -> Result<SessionArtifacts> {
    let mut annotations = Vec::new();
    let retry = RetryPolicy::default();

    let panel = fetch_prices(prices, &config.tickers, config.start, config.end)
        .context("price panel load failed")?;
    let features = build_market_features(&panel);

    let mut resolved = BTreeMap::new();
    for name in SESSION_CONCEPTS {
        let Some(concept) = macrolab_core::domain::find_concept(name) else {
            continue;
        };
        let out = resolve_cached(
            cache,
            registry,
            retry,
            &concept,
            "global",
            config.start,
            config.end,
            &config.provider_flags,
            config.as_of,
        );
        if out.is_unresolved() {
            annotations.push(Annotation {
                severity: Severity::Warning,
                message: format!("concept '{name}' unresolved; no macro signal"),
            });
        }
        resolved.insert(name.to_string(), out);
    }

    let (drivers, driver_annotations) = build_driver_frame(&resolved, &features);
    annotations.extend(driver_annotations);

    let regimes = infer_regimes(&drivers);
    if regimes.is_degenerate() {
        annotations.push(Annotation {
            severity: Severity::Info,
            message: "mixture classifier lacks history; quadrant overlay is the fallback".into(),
        });
    }

    let stress = stress_percentile(&drivers);

    let tidy = fetch_catalog_cached(cache, catalog, registry, retry, config.start, config.end);
    let fetched: std::collections::HashSet<&str> =
        tidy.iter().map(|r| r.indicator_id.as_str()).collect();
    for ind in &catalog.indicators {
        if !fetched.contains(ind.id.as_str()) {
            annotations.push(Annotation {
                severity: Severity::Warning,
                message: format!("indicator '{}' returned no data", ind.id),
            });
        }
    }
    let (composites, ledger) = build_composites(&tidy);

    let overlay = match (
        composites.column_series("US|GROWTH"),
        composites.column_series("US|INFLATION"),
    ) {
        (Some(growth), Some(inflation)) => {
            Some(quadrant_probabilities(&growth, &inflation, 1.0))
        }
        _ => None,
    };

    // latest defined mixture probabilities, falling back to the overlay
    let latest_probs = regimes
        .latest_defined()
        .or_else(|| overlay.as_ref().and_then(|o| o.latest_defined()))
        .map(|(_, row)| row);

    let weights = recommend_weights(
        &features.monthly_ret,
        config.profile,
        latest_probs,
        stress,
        config.flex,
    );
    if !weights.is_empty() && weights.iter().all(|r| r.weight == 0.0) {
        annotations.push(Annotation {
            severity: Severity::Warning,
            message: "no complete investable history; allocation is all zero".into(),
        });
    }

    Ok(SessionArtifacts {
        run_id: config.run_id(),
        resolved,
        features,
        tidy,
        composites,
        ledger,
        drivers,
        regimes,
        overlay,
        stress_percentile: stress,
        weights,
        annotations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use macrolab_core::data::SyntheticProvider;
    use std::sync::Arc;
    use std::time::Duration;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn registry() -> ProviderRegistry {
        ProviderRegistry::new()
            .register(Arc::new(SyntheticProvider::new("FRED")))
            .register(Arc::new(SyntheticProvider::new("TREASURY")))
            .register(Arc::new(SyntheticProvider::new("ECB")))
            .register(Arc::new(SyntheticProvider::new("OECD")))
            .register(Arc::new(SyntheticProvider::new("EUROSTAT")))
            .register(Arc::new(SyntheticProvider::new("BUNDESBANK")))
    }

    fn config() -> RunConfig {
        let mut c = RunConfig::defaults(d(2024, 6, 1));
        c.start = d(2006, 1, 1);
        c.end = d(2024, 5, 31);
        c
    }

    #[test]
    fn full_session_produces_all_artifacts() {
        let cache = MemoCache::new(Duration::from_secs(60), Arc::new(macrolab_core::data::SystemClock));
        let prices = SyntheticProvider::new("MARKET");
        let catalog = Catalog::default_catalog();
        let out = run_session(&config(), &registry(), &prices, &cache, &catalog).unwrap();

        assert_eq!(out.resolved.len(), SESSION_CONCEPTS.len());
        assert!(!out.tidy.is_empty());
        assert!(!out.composites.is_empty());
        assert!(!out.ledger.is_empty());
        assert_eq!(out.drivers.ncols(), 5);
        assert!(!out.weights.is_empty());
        let total: f64 = out.weights.iter().map(|r| r.weight).sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!((0.0..=1.0).contains(&out.stress_percentile));
        assert!(out.overlay.is_some());
    }

    #[test]
    fn forbidden_ticker_aborts_the_session() {
        let cache = MemoCache::new(Duration::from_secs(60), Arc::new(macrolab_core::data::SystemClock));
        let prices = SyntheticProvider::new("MARKET");
        let catalog = Catalog::default_catalog();
        let mut bad = config();
        bad.tickers.push("EVIL".into());
        assert!(run_session(&bad, &registry(), &prices, &cache, &catalog).is_err());
    }

    #[test]
    fn disabled_providers_surface_annotations_not_errors() {
        let cache = MemoCache::new(Duration::from_secs(60), Arc::new(macrolab_core::data::SystemClock));
        let prices = SyntheticProvider::new("MARKET");
        let catalog = Catalog::default_catalog();
        let mut c = config();
        // disable everything the concept table knows about
        for p in ["FRED", "TREASURY", "ECB", "OECD", "EUROSTAT", "BUNDESBANK", "WB_PINK"] {
            c.provider_flags = c.provider_flags.clone().disable(p);
        }
        let out = run_session(&c, &registry(), &prices, &cache, &catalog).unwrap();
        assert!(out.resolved.values().all(|r| r.is_unresolved()));
        assert!(out
            .annotations
            .iter()
            .any(|a| a.severity == Severity::Warning));
        // proxies keep the driver frame alive
        assert_eq!(out.drivers.ncols(), 5);
    }
}
