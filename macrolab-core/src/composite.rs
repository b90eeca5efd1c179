//! Catalog fetch and composite aggregation.
//!
//! Indicators are fetched per catalog entry, transformed, and denormalized
//! into tidy observations. Composites roll those up three ways per country —
//! by pillar (sum of contributions), by hard/soft kind and by timing (mean of
//! contributions) — outer-joined on date and forward-filled onto a daily
//! grid, so a monthly release persists as the composite value until the next
//! release. The raw contribution ledger is returned untouched for
//! attribution.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::data::cache::MemoCache;
use crate::data::provider::RetryPolicy;
use crate::data::registry::ProviderRegistry;
use crate::domain::{
    Catalog, Frame, Frequency, IndicatorKind, Pillar, TimeSeries, Timing,
};
use crate::transform;

/// One transformed observation with its catalog attributes denormalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TidyObservation {
    pub date: NaiveDate,
    /// Transformed value.
    pub value: f64,
    /// Last raw observation available when this row was built.
    pub as_of: Option<NaiveDate>,
    pub ffill_applied: bool,
    pub indicator_id: String,
    pub display_name: String,
    pub source: String,
    pub country: String,
    pub frequency: Frequency,
    pub kind: IndicatorKind,
    pub timing: Timing,
    pub pillar: Pillar,
    pub weight: f64,
}

/// One ledger record: weight × transformed value for an indicator on a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub date: NaiveDate,
    pub country: String,
    pub display_name: String,
    pub kind: IndicatorKind,
    pub timing: Timing,
    pub weight: f64,
    pub value: f64,
    pub contribution: f64,
    pub source: String,
}

/// Fetch and transform every catalog indicator into tidy observations.
///
/// Fetches fan out across rayon workers purely for latency; rows come back
/// grouped in catalog order. An unknown source or a failed fetch degrades to
/// no rows for that indicator — catalog processing never aborts.
pub fn fetch_catalog(
    catalog: &Catalog,
    registry: &ProviderRegistry,
    retry: RetryPolicy,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<TidyObservation> {
    catalog
        .indicators
        .par_iter()
        .map(|ind| {
            let Some(provider) = registry.get(&ind.source) else {
                return Vec::new();
            };
            let raw = match retry.fetch(provider.as_ref(), &ind.source_key, start, end) {
                Ok(series) => series,
                Err(_) => return Vec::new(),
            };
            if raw.is_empty() {
                return Vec::new();
            }
            let as_of = raw.last_valid_date();
            let transformed = transform::apply(&raw, ind.transform);
            transformed
                .iter()
                .map(|(date, value)| TidyObservation {
                    date,
                    value,
                    as_of,
                    ffill_applied: ind.frequency.ffill_applied(),
                    indicator_id: ind.id.clone(),
                    display_name: ind.display_name.clone(),
                    source: ind.source.clone(),
                    country: ind.country.clone(),
                    frequency: ind.frequency,
                    kind: ind.kind,
                    timing: ind.timing,
                    pillar: ind.pillar,
                    weight: ind.weight,
                })
                .collect()
        })
        .collect::<Vec<Vec<TidyObservation>>>()
        .into_iter()
        .flatten()
        .collect()
}

/// Memoized [`fetch_catalog`] keyed by the catalog content and date range.
pub fn fetch_catalog_cached(
    cache: &MemoCache,
    catalog: &Catalog,
    registry: &ProviderRegistry,
    retry: RetryPolicy,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<TidyObservation> {
    let args = (&catalog.indicators, start, end);
    cache.get_or_compute("fetch_catalog", &args, || {
        fetch_catalog(catalog, registry, retry, start, end)
    })
}

/// Roll tidy observations up into daily composites plus the raw ledger.
pub fn build_composites(rows: &[TidyObservation]) -> (Frame, Vec<Contribution>) {
    if rows.is_empty() {
        return (Frame::default(), Vec::new());
    }

    // pillar columns: sum of contributions per (date, country|pillar)
    let mut pillar_sums: BTreeMap<String, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
    // kind/timing columns: mean of contributions per (date, country|group)
    let mut kind_acc: BTreeMap<String, BTreeMap<NaiveDate, (f64, u32)>> = BTreeMap::new();
    let mut timing_acc: BTreeMap<String, BTreeMap<NaiveDate, (f64, u32)>> = BTreeMap::new();
    let mut ledger = Vec::with_capacity(rows.len());

    for row in rows {
        let contribution = row.weight * row.value;
        ledger.push(Contribution {
            date: row.date,
            country: row.country.clone(),
            display_name: row.display_name.clone(),
            kind: row.kind,
            timing: row.timing,
            weight: row.weight,
            value: row.value,
            contribution,
            source: row.source.clone(),
        });

        let pillar_col = format!("{}|{}", row.country, row.pillar);
        *pillar_sums
            .entry(pillar_col)
            .or_default()
            .entry(row.date)
            .or_insert(0.0) += contribution;

        let kind_col = format!("{}|{}", row.country, row.kind);
        let slot = kind_acc
            .entry(kind_col)
            .or_default()
            .entry(row.date)
            .or_insert((0.0, 0));
        slot.0 += contribution;
        slot.1 += 1;

        let timing_col = format!("{}|{}", row.country, row.timing);
        let slot = timing_acc
            .entry(timing_col)
            .or_default()
            .entry(row.date)
            .or_insert((0.0, 0));
        slot.0 += contribution;
        slot.1 += 1;
    }

    let mut series: Vec<(String, TimeSeries)> = Vec::new();
    for (col, by_date) in pillar_sums {
        series.push((col, TimeSeries::from_points(by_date.into_iter().collect())));
    }
    for (col, by_date) in kind_acc.into_iter().chain(timing_acc) {
        let points = by_date
            .into_iter()
            .map(|(date, (sum, count))| (date, sum / count as f64))
            .collect();
        series.push((col, TimeSeries::from_points(points)));
    }

    let composites = Frame::from_series_outer(&series).resample_daily_ffill();
    (composites, ledger)
}
