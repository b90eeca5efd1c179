//! MacroLab Core — reconciliation → composite → regime → allocation engine.
//!
//! This crate contains the heart of the macro-financial pipeline:
//! - Domain types (time series, frames, catalog entries, concepts, regimes)
//! - Per-series transform pipeline (level/yoy/mom/zscore + winsorization)
//! - Provider abstraction with priority-ordered series resolution and lineage
//! - Catalog fetch and weighted composite builder with contribution ledger
//! - Two regime classifiers (Gaussian mixture, closed-form quadrant)
//! - Constrained allocation engine with profile anchors and regime tilts
//! - TTL memoization cache keyed by content hash

pub mod allocation;
pub mod composite;
pub mod data;
pub mod domain;
pub mod features;
pub mod regime;
pub mod signals;
pub mod transform;
