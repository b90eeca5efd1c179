//! Macro driver frame assembly.
//!
//! Builds the five-driver monthly frame the mixture classifier consumes:
//! growth (SPY 6-month return trend), inflation (resolved euro inflation,
//! Brent year-over-year proxy when unresolved), real rates, curve slope, and
//! credit stress (high-yield OAS, investment-grade/high-yield price ratio
//! proxy when unresolved). Resolved series are aligned at monthly resolution
//! and interior gaps are interpolated in both directions, matching the
//! upstream data's mixed release calendars.

use std::collections::BTreeMap;

use macrolab_core::data::ResolvedSeries;
use macrolab_core::domain::Frame;
use macrolab_core::features::{MarketFeatures, PCT_RANK_WINDOW};

use crate::session::{Annotation, Severity};

/// Driver column order; the first two anchor mixture-component labeling.
pub const DRIVER_COLUMNS: [&str; 5] = ["growth", "inflation", "real_rates", "slope", "stress"];

fn monthly_aligned(resolved: Option<&ResolvedSeries>, index: &[chrono::NaiveDate]) -> Vec<f64> {
    match resolved {
        Some(r) if !r.series.is_empty() => r.series.monthly_last().reindex(index),
        _ => vec![f64::NAN; index.len()],
    }
}

fn fill_gaps(primary: Vec<f64>, fallback: &[f64]) -> Vec<f64> {
    primary
        .iter()
        .zip(fallback)
        .map(|(p, f)| if p.is_finite() { *p } else { *f })
        .collect()
}

/// Assemble the driver frame on the monthly return index.
///
/// Unresolved concepts degrade to their proxies and produce warning
/// annotations; a missing proxy leaves NaN cells for the classifier's
/// complete-row filter to drop.
pub fn build_driver_frame(
    resolved: &BTreeMap<String, ResolvedSeries>,
    features: &MarketFeatures,
) -> (Frame, Vec<Annotation>) {
    let index = features.monthly_ret.index().to_vec();
    let mut annotations = Vec::new();

    let growth = features
        .monthly_ret
        .column_series("SPY")
        .map(|s| s.rolling_mean(6).reindex(&index))
        .unwrap_or_else(|| vec![f64::NAN; index.len()]);

    let inflation_primary = monthly_aligned(resolved.get("euro_inflation"), &index);
    let brent_yoy = features
        .monthly_px
        .column_series("BZ=F")
        .map(|s| s.pct_change(12).map_values(|v| v * 100.0).reindex(&index))
        .unwrap_or_else(|| vec![f64::NAN; index.len()]);
    if unresolved(resolved, "euro_inflation") {
        annotations.push(Annotation {
            severity: Severity::Warning,
            message: "euro_inflation unresolved; using Brent year-over-year proxy".into(),
        });
    }
    let inflation = fill_gaps(inflation_primary, &brent_yoy);

    let real_rates = monthly_aligned(resolved.get("us_real_10y"), &index);

    let slope = match (resolved.get("us_10y"), resolved.get("us_2y")) {
        (Some(long), Some(short)) if !long.series.is_empty() && !short.series.is_empty() => {
            long.series
                .sub(&short.series)
                .monthly_last()
                .reindex(&index)
        }
        _ => vec![f64::NAN; index.len()],
    };

    let stress_primary = monthly_aligned(resolved.get("hy_oas"), &index);
    let credit_ratio = match (
        features.monthly_px.column_series("LQD"),
        features.monthly_px.column_series("HYG"),
    ) {
        (Some(lqd), Some(hyg)) => lqd
            .safe_div(&hyg)
            .map_values(|v| v - 1.0)
            .reindex(&index),
        _ => vec![f64::NAN; index.len()],
    };
    if unresolved(resolved, "hy_oas") {
        annotations.push(Annotation {
            severity: Severity::Warning,
            message: "hy_oas unresolved; using LQD/HYG price-ratio proxy".into(),
        });
    }
    let stress = fill_gaps(stress_primary, &credit_ratio);

    let mut frame = Frame::with_index(index);
    frame.push_column("growth".into(), growth);
    frame.push_column("inflation".into(), inflation);
    frame.push_column("real_rates".into(), real_rates);
    frame.push_column("slope".into(), slope);
    frame.push_column("stress".into(), stress);
    (frame.interpolate_both(), annotations)
}

fn unresolved(resolved: &BTreeMap<String, ResolvedSeries>, concept: &str) -> bool {
    resolved.get(concept).map(|r| r.is_unresolved()).unwrap_or(true)
}

/// Latest rolling percentile rank of the stress driver, as a fraction in
/// [0, 1]. Defaults to 0.5 when the rank window has not filled.
pub fn stress_percentile(drivers: &Frame) -> f64 {
    let Some(stress) = drivers.column_series("stress") else {
        return 0.5;
    };
    let ranked = stress.rolling_pct_rank(PCT_RANK_WINDOW).drop_non_finite();
    match ranked.last() {
        Some((_, v)) => v / 100.0,
        None => 0.5,
    }
}
