//! CSV artifact export — one directory per run id.
//!
//! Files: `weights.csv`, `regime_probs.csv`, `contributions.csv`,
//! `lineage.csv`, `drivers.csv`, `annotations.csv`. All plain tabular CSV;
//! the presentation layer re-derives nothing.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use macrolab_core::domain::Regime;
use macrolab_core::regime::RegimeState;

use crate::session::SessionArtifacts;

/// Write every artifact table under `{out_dir}/{run_id}/`, returning the run
/// directory.
pub fn save_artifacts(out_dir: &Path, artifacts: &SessionArtifacts) -> Result<PathBuf> {
    let run_dir = out_dir.join(&artifacts.run_id);
    std::fs::create_dir_all(&run_dir).context("create run directory")?;

    write_weights(&run_dir, artifacts)?;
    write_regime_probs(&run_dir, artifacts)?;
    write_contributions(&run_dir, artifacts)?;
    write_lineage(&run_dir, artifacts)?;
    write_drivers(&run_dir, artifacts)?;
    write_annotations(&run_dir, artifacts)?;

    Ok(run_dir)
}

fn write_weights(dir: &Path, artifacts: &SessionArtifacts) -> Result<()> {
    let mut w = csv::Writer::from_path(dir.join("weights.csv")).context("weights.csv")?;
    w.write_record(["ticker", "weight", "anchor", "delta"])?;
    for row in &artifacts.weights {
        w.write_record([
            row.ticker.clone(),
            row.weight.to_string(),
            row.anchor.to_string(),
            row.delta.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

fn write_regime_probs(dir: &Path, artifacts: &SessionArtifacts) -> Result<()> {
    let mut w =
        csv::Writer::from_path(dir.join("regime_probs.csv")).context("regime_probs.csv")?;
    let mut header = vec!["date".to_string()];
    header.extend(Regime::ALL.iter().map(|r| r.name().to_string()));
    header.push("state".into());
    w.write_record(&header)?;
    for (i, date) in artifacts.regimes.index.iter().enumerate() {
        let mut record = vec![date.format("%Y-%m-%d").to_string()];
        for p in artifacts.regimes.probs[i] {
            record.push(if p.is_finite() {
                format!("{p:.6}")
            } else {
                String::new()
            });
        }
        record.push(match artifacts.regimes.state[i] {
            RegimeState::Dominant(r) => r.name().to_string(),
            RegimeState::Undefined => String::new(),
            RegimeState::InsufficientData => "Insufficient data".to_string(),
        });
        w.write_record(&record)?;
    }
    w.flush()?;
    Ok(())
}

fn write_contributions(dir: &Path, artifacts: &SessionArtifacts) -> Result<()> {
    let mut w =
        csv::Writer::from_path(dir.join("contributions.csv")).context("contributions.csv")?;
    w.write_record([
        "date",
        "country",
        "display_name",
        "type",
        "timing",
        "weight",
        "value",
        "contribution",
        "source",
    ])?;
    for c in &artifacts.ledger {
        w.write_record([
            c.date.format("%Y-%m-%d").to_string(),
            c.country.clone(),
            c.display_name.clone(),
            c.kind.to_string(),
            c.timing.to_string(),
            c.weight.to_string(),
            c.value.to_string(),
            c.contribution.to_string(),
            c.source.clone(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

fn write_lineage(dir: &Path, artifacts: &SessionArtifacts) -> Result<()> {
    let mut w = csv::Writer::from_path(dir.join("lineage.csv")).context("lineage.csv")?;
    w.write_record([
        "concept", "source", "series_id", "candidate", "status", "reason", "score",
    ])?;
    for (name, resolved) in &artifacts.resolved {
        for entry in &resolved.lineage {
            w.write_record([
                name.clone(),
                resolved.source.clone(),
                resolved.series_id.clone(),
                entry.candidate.clone(),
                format!("{:?}", entry.status).to_lowercase(),
                entry.reason.clone().unwrap_or_default(),
                entry
                    .quality
                    .map(|q| format!("{:.4}", q.score))
                    .unwrap_or_default(),
            ])?;
        }
    }
    w.flush()?;
    Ok(())
}

fn write_drivers(dir: &Path, artifacts: &SessionArtifacts) -> Result<()> {
    let mut w = csv::Writer::from_path(dir.join("drivers.csv")).context("drivers.csv")?;
    let mut header = vec!["date".to_string()];
    header.extend(artifacts.drivers.columns().iter().cloned());
    w.write_record(&header)?;
    for (i, date) in artifacts.drivers.index().iter().enumerate() {
        let mut record = vec![date.format("%Y-%m-%d").to_string()];
        for name in artifacts.drivers.columns() {
            let v = artifacts.drivers.column(name).unwrap()[i];
            record.push(if v.is_finite() {
                format!("{v:.6}")
            } else {
                String::new()
            });
        }
        w.write_record(&record)?;
    }
    w.flush()?;
    Ok(())
}

fn write_annotations(dir: &Path, artifacts: &SessionArtifacts) -> Result<()> {
    let mut w =
        csv::Writer::from_path(dir.join("annotations.csv")).context("annotations.csv")?;
    w.write_record(["severity", "message"])?;
    for a in &artifacts.annotations {
        w.write_record([format!("{:?}", a.severity), a.message.clone()])?;
    }
    w.flush()?;
    Ok(())
}
