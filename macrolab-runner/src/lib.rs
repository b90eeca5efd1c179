//! MacroLab Runner — session orchestration over the core engine.
//!
//! Pulls one end-to-end query together: market panel → features, concept
//! resolution, macro driver frame with proxy fallbacks, regime classification
//! with overlay fallback, stress gating, allocation, diagnostics checks, and
//! CSV artifact export.

pub mod config;
pub mod diagnostics;
pub mod drivers;
pub mod export;
pub mod session;

pub use config::RunConfig;
pub use diagnostics::{run_checks, CheckResult};
pub use drivers::{build_driver_frame, stress_percentile, DRIVER_COLUMNS};
pub use export::save_artifacts;
pub use session::{run_session, Annotation, SessionArtifacts, Severity};
