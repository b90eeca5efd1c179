//! Series resolution — one concept, many competing candidates.
//!
//! Candidates are tried in priority order; every attempt is recorded in an
//! append-only lineage that fully explains the final choice. Fetch failures
//! degrade the candidate, never the resolution: the worst possible outcome is
//! the `NONE` sentinel with an empty series and a lineage showing why.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::cache::MemoCache;
use super::provider::RetryPolicy;
use super::registry::{ProviderFlags, ProviderRegistry};
use crate::domain::{Concept, QualityReport, TimeSeries};

/// Sentinel source when every candidate failed or was disabled.
pub const SOURCE_NONE: &str = "NONE";

/// Outcome class of one candidate attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// Provider disabled by request flags; not a failure.
    Skipped,
    /// Fetched with a positive quality score.
    Ok,
    /// Fetched but empty or scoring zero.
    Bad,
    /// Fetch raised; recovered locally.
    Error,
}

/// One audit record in a resolution lineage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageEntry {
    /// `PROVIDER:SERIES_ID` label.
    pub candidate: String,
    pub status: AttemptStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityReport>,
}

/// The winning candidate (or the NONE sentinel) plus the full audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSeries {
    pub concept: String,
    pub region: String,
    pub source: String,
    pub series_id: String,
    pub series: TimeSeries,
    pub quality: QualityReport,
    pub lineage: Vec<LineageEntry>,
}

impl ResolvedSeries {
    /// Whether every candidate failed or was disabled.
    pub fn is_unresolved(&self) -> bool {
        self.source == SOURCE_NONE
    }

    fn none(concept: &str, region: &str, lineage: Vec<LineageEntry>) -> Self {
        Self {
            concept: concept.to_string(),
            region: region.to_string(),
            source: SOURCE_NONE.to_string(),
            series_id: String::new(),
            series: TimeSeries::new(),
            quality: QualityReport::empty(),
            lineage,
        }
    }
}

/// Resolve one concept against the registry.
///
/// Iterates the candidate list in priority order, scoring each fetched series
/// and keeping the best strictly-greater score (ties keep the earlier,
/// higher-priority candidate). Stops early once a candidate is good enough.
/// `as_of` anchors staleness; pass today's date in production.
#[allow(clippy::too_many_arguments)]
pub fn resolve(
    registry: &ProviderRegistry,
    retry: RetryPolicy,
    concept: &Concept,
    region: &str,
    start: NaiveDate,
    end: NaiveDate,
    flags: &ProviderFlags,
    as_of: NaiveDate,
) -> ResolvedSeries {
    let mut lineage: Vec<LineageEntry> = Vec::new();
    let mut best: Option<ResolvedSeries> = None;
    let mut best_score = 0.0_f64;

    for candidate in &concept.candidates {
        if !flags.is_enabled(&candidate.provider) {
            lineage.push(LineageEntry {
                candidate: candidate.label(),
                status: AttemptStatus::Skipped,
                reason: Some("provider disabled".into()),
                quality: None,
            });
            continue;
        }
        let Some(provider) = registry.get(&candidate.provider) else {
            lineage.push(LineageEntry {
                candidate: candidate.label(),
                status: AttemptStatus::Error,
                reason: Some(format!("unknown provider '{}'", candidate.provider)),
                quality: None,
            });
            continue;
        };
        match retry.fetch(provider.as_ref(), &candidate.series_id, start, end) {
            Ok(series) => {
                let quality = QualityReport::assess(&series, as_of);
                let status = if quality.score > 0.0 {
                    AttemptStatus::Ok
                } else {
                    AttemptStatus::Bad
                };
                lineage.push(LineageEntry {
                    candidate: candidate.label(),
                    status,
                    reason: None,
                    quality: Some(quality),
                });
                if quality.score > best_score {
                    best_score = quality.score;
                    best = Some(ResolvedSeries {
                        concept: concept.name.clone(),
                        region: region.to_string(),
                        source: candidate.provider.clone(),
                        series_id: candidate.series_id.clone(),
                        series,
                        quality,
                        lineage: Vec::new(),
                    });
                }
                if quality.good_enough() {
                    break;
                }
            }
            Err(e) => {
                lineage.push(LineageEntry {
                    candidate: candidate.label(),
                    status: AttemptStatus::Error,
                    reason: Some(e.to_string()),
                    quality: None,
                });
            }
        }
    }

    match best {
        Some(mut resolved) => {
            resolved.lineage = lineage;
            resolved
        }
        None => ResolvedSeries::none(&concept.name, region, lineage),
    }
}

/// Memoized [`resolve`]: identical arguments within the cache TTL return the
/// stored result without touching any provider.
#[allow(clippy::too_many_arguments)]
pub fn resolve_cached(
    cache: &MemoCache,
    registry: &ProviderRegistry,
    retry: RetryPolicy,
    concept: &Concept,
    region: &str,
    start: NaiveDate,
    end: NaiveDate,
    flags: &ProviderFlags,
    as_of: NaiveDate,
) -> ResolvedSeries {
    let args = (&concept.name, region, start, end, flags, as_of);
    cache.get_or_compute("resolve_series", &args, || {
        resolve(registry, retry, concept, region, start, end, flags, as_of)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::{DataError, SeriesProvider};
    use crate::data::SystemClock;
    use crate::domain::Candidate;
    use chrono::Duration;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// Provider returning a fixed series, counting calls.
    struct FixedProvider {
        name: String,
        series: TimeSeries,
        calls: AtomicU32,
    }

    impl FixedProvider {
        fn arc(name: &str, series: TimeSeries) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                series,
                calls: AtomicU32::new(0),
            })
        }
    }

    impl SeriesProvider for FixedProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn fetch(
            &self,
            _series_id: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<TimeSeries, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.series.restrict(start, end))
        }
    }

    struct FailingProvider(String);

    impl SeriesProvider for FailingProvider {
        fn name(&self) -> &str {
            &self.0
        }

        fn fetch(
            &self,
            _series_id: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<TimeSeries, DataError> {
            Err(DataError::NetworkUnreachable("down".into()))
        }
    }

    /// Fresh monthly series ending at `end`.
    fn healthy_series(end: NaiveDate) -> TimeSeries {
        TimeSeries::from_points(
            (0..48)
                .map(|i| (end - Duration::days(30 * i), 2.0 + i as f64 * 0.01))
                .collect(),
        )
    }

    fn concept_two(p1: &str, p2: &str) -> Concept {
        Concept::new(
            "us_2y",
            vec![Candidate::new(p1, "DGS2"), Candidate::new(p2, "DGS2")],
        )
    }

    #[test]
    fn disabled_first_candidate_falls_through_to_second() {
        let end = d(2024, 5, 31);
        let registry = ProviderRegistry::new()
            .register(FixedProvider::arc("FRED", healthy_series(end)))
            .register(FixedProvider::arc("TREASURY", healthy_series(end)));
        let flags = ProviderFlags::all_enabled().disable("FRED");

        let out = resolve(
            &registry,
            RetryPolicy::none(),
            &concept_two("FRED", "TREASURY"),
            "global",
            d(2018, 1, 1),
            end,
            &flags,
            d(2024, 6, 1),
        );
        assert_eq!(out.source, "TREASURY");
        assert_eq!(out.lineage[0].status, AttemptStatus::Skipped);
        assert_eq!(out.lineage[1].status, AttemptStatus::Ok);
    }

    #[test]
    fn all_candidates_failing_yields_none_sentinel() {
        let registry = ProviderRegistry::new()
            .register(Arc::new(FailingProvider("FRED".into())))
            .register(Arc::new(FailingProvider("TREASURY".into())));

        let out = resolve(
            &registry,
            RetryPolicy::none(),
            &concept_two("FRED", "TREASURY"),
            "global",
            d(2018, 1, 1),
            d(2024, 5, 31),
            &ProviderFlags::all_enabled(),
            d(2024, 6, 1),
        );
        assert!(out.is_unresolved());
        assert_eq!(out.source, SOURCE_NONE);
        assert!(out.series.is_empty());
        assert_eq!(out.quality.score, 0.0);
        assert!(out
            .lineage
            .iter()
            .all(|e| e.status == AttemptStatus::Error));
    }

    #[test]
    fn good_enough_score_short_circuits() {
        let end = d(2024, 5, 31);
        let first = FixedProvider::arc("FRED", healthy_series(end));
        let second = FixedProvider::arc("TREASURY", healthy_series(end));
        let registry = ProviderRegistry::new()
            .register(first.clone())
            .register(second.clone());

        let out = resolve(
            &registry,
            RetryPolicy::none(),
            &concept_two("FRED", "TREASURY"),
            "global",
            d(2018, 1, 1),
            end,
            &ProviderFlags::all_enabled(),
            d(2024, 6, 1),
        );
        assert_eq!(out.source, "FRED");
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
        assert_eq!(out.lineage.len(), 1);
    }

    #[test]
    fn equal_scores_keep_higher_priority_candidate() {
        // both providers return the same mildly stale series: equal
        // sub-threshold scores
        let stale = healthy_series(d(2023, 12, 31));
        let registry = ProviderRegistry::new()
            .register(FixedProvider::arc("FRED", stale.clone()))
            .register(FixedProvider::arc("TREASURY", stale));

        let out = resolve(
            &registry,
            RetryPolicy::none(),
            &concept_two("FRED", "TREASURY"),
            "global",
            d(2018, 1, 1),
            d(2024, 5, 31),
            &ProviderFlags::all_enabled(),
            d(2024, 6, 1),
        );
        assert!(out.quality.score > 0.0 && out.quality.score < 0.9);
        assert_eq!(out.source, "FRED");
        assert_eq!(out.lineage.len(), 2);
    }

    #[test]
    fn better_later_candidate_replaces_incumbent() {
        // first candidate is fresh but missing ~half its months (score ~0.5);
        // second is complete but a few months stale (score ~0.75): the second
        // must replace the incumbent, and neither reaches the stop bar
        let fresh_but_gappy = {
            let end = d(2024, 5, 31);
            TimeSeries::from_points(
                (0..24)
                    .map(|i| (end - Duration::days(61 * i), 1.0 + i as f64))
                    .collect(),
            )
        };
        let registry = ProviderRegistry::new()
            .register(FixedProvider::arc("FRED", fresh_but_gappy))
            .register(FixedProvider::arc("TREASURY", healthy_series(d(2023, 12, 31))));

        let out = resolve(
            &registry,
            RetryPolicy::none(),
            &concept_two("FRED", "TREASURY"),
            "global",
            d(2018, 1, 1),
            d(2024, 5, 31),
            &ProviderFlags::all_enabled(),
            d(2024, 6, 1),
        );
        assert_eq!(out.source, "TREASURY");
        assert_eq!(out.lineage.len(), 2);
    }

    #[test]
    fn cached_resolution_skips_provider_calls() {
        let end = d(2024, 5, 31);
        let provider = FixedProvider::arc("FRED", healthy_series(end));
        let registry = ProviderRegistry::new().register(provider.clone());
        let cache = MemoCache::new(std::time::Duration::from_secs(60), Arc::new(SystemClock));
        let concept = Concept::new("us_2y", vec![Candidate::new("FRED", "DGS2")]);
        let flags = ProviderFlags::all_enabled();

        let a = resolve_cached(
            &cache,
            &registry,
            RetryPolicy::none(),
            &concept,
            "global",
            d(2018, 1, 1),
            end,
            &flags,
            d(2024, 6, 1),
        );
        let b = resolve_cached(
            &cache,
            &registry,
            RetryPolicy::none(),
            &concept,
            "global",
            d(2018, 1, 1),
            end,
            &flags,
            d(2024, 6, 1),
        );
        assert_eq!(a, b);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}
