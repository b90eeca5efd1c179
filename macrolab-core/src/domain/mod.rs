//! Domain types: series, frames, quality reports, catalog entries, concepts, regimes.

pub mod catalog;
pub mod concept;
pub mod frame;
pub mod quality;
pub mod regime;
pub mod series;

pub use catalog::{
    Catalog, CatalogError, Frequency, IndicatorDefinition, IndicatorKind, Pillar, Timing,
};
pub use concept::{default_concepts, find_concept, Candidate, Concept};
pub use frame::Frame;
pub use quality::QualityReport;
pub use regime::Regime;
pub use series::TimeSeries;
