//! MacroLab CLI — resolve, regimes, recommend, catalog, and run commands.
//!
//! Data comes from CSV directories (one subdirectory per provider, one
//! `date,value` file per series id) or from the deterministic synthetic
//! source with `--synthetic`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use macrolab_core::allocation::Profile;
use macrolab_core::data::{
    resolve, CsvStore, MemoCache, PricePanelProvider, ProviderFlags, ProviderRegistry,
    RetryPolicy, SyntheticProvider,
};
use macrolab_core::domain::{find_concept, Catalog};
use macrolab_core::regime::RegimeState;
use macrolab_runner::{run_checks, run_session, save_artifacts, RunConfig};

/// Provider names the built-in concept table and catalog reference.
const PROVIDER_NAMES: [&str; 7] = [
    "FRED",
    "TREASURY",
    "ECB",
    "OECD",
    "EUROSTAT",
    "BUNDESBANK",
    "WB_PINK",
];

#[derive(Parser)]
#[command(name = "macrolab", about = "MacroLab CLI — macro regime and allocation pipeline")]
struct Cli {
    /// Root data directory with one subdirectory per provider.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Use deterministic synthetic data instead of CSV files.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Start date (YYYY-MM-DD). Defaults to 20 years before today.
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<String>,

    /// Disable a provider (repeatable).
    #[arg(long = "disable", value_name = "PROVIDER")]
    disabled: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one concept and print its quality and lineage.
    Resolve {
        /// Concept name, e.g. us_10y, hy_oas, euro_inflation.
        concept: String,
    },
    /// Print the latest regime probabilities and dominant state.
    Regimes,
    /// Print the recommended weight table.
    Recommend {
        /// Profile: conservative, balanced, growth.
        #[arg(long, default_value = "balanced")]
        profile: String,

        /// Anchor flexibility in weight points.
        #[arg(long, default_value_t = 0.10)]
        flex: f64,
    },
    /// Print the indicator catalog (from a TOML file or the built-in set).
    Catalog {
        /// Path to a catalog TOML file.
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Run a full session, print diagnostics, and export CSV artifacts.
    Run {
        #[arg(long, default_value = "balanced")]
        profile: String,

        #[arg(long, default_value_t = 0.10)]
        flex: f64,

        /// Output directory for artifact CSVs.
        #[arg(long, default_value = "results")]
        out_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let today = chrono::Local::now().date_naive();
    let start = parse_date_or(&cli.start, today - chrono::Duration::days(20 * 365))?;
    let end = parse_date_or(&cli.end, today)?;

    let registry = build_registry(&cli);
    let mut flags = ProviderFlags::all_enabled();
    for p in &cli.disabled {
        flags = flags.disable(p);
    }

    match &cli.command {
        Commands::Resolve { concept } => {
            let Some(concept) = find_concept(concept) else {
                bail!("unknown concept '{concept}'");
            };
            let out = resolve(
                &registry,
                RetryPolicy::default(),
                &concept,
                "global",
                start,
                end,
                &flags,
                today,
            );
            println!(
                "{}: source={} series_id={} score={:.3} missingness={:.3} staleness={}d",
                out.concept,
                out.source,
                out.series_id,
                out.quality.score,
                out.quality.missingness,
                out.quality.staleness_days,
            );
            println!("lineage:");
            for entry in &out.lineage {
                let score = entry
                    .quality
                    .map(|q| format!(" score={:.3}", q.score))
                    .unwrap_or_default();
                let reason = entry
                    .reason
                    .as_deref()
                    .map(|r| format!(" ({r})"))
                    .unwrap_or_default();
                println!("  {} -> {:?}{}{}", entry.candidate, entry.status, score, reason);
            }
            Ok(())
        }
        Commands::Regimes => {
            let artifacts = run_pipeline(&cli, &registry, flags, start, end, "balanced", 0.10)?;
            match artifacts.regimes.latest_defined() {
                Some((date, probs)) => {
                    println!("regime probabilities as of {date}:");
                    for (regime, p) in macrolab_core::domain::Regime::ALL.iter().zip(probs) {
                        println!("  {:12} {:.3}", regime.name(), p);
                    }
                }
                None => println!("mixture classifier: insufficient data"),
            }
            if let Some(last) = artifacts.regimes.state.last() {
                match last {
                    RegimeState::Dominant(r) => println!("dominant state: {r}"),
                    RegimeState::InsufficientData => println!("dominant state: insufficient data"),
                    RegimeState::Undefined => println!("dominant state: undefined"),
                }
            }
            print_annotations(&artifacts.annotations);
            Ok(())
        }
        Commands::Recommend { profile, flex } => {
            let artifacts = run_pipeline(&cli, &registry, flags, start, end, profile, *flex)?;
            println!("stress percentile: {:.2}", artifacts.stress_percentile);
            println!("{:<10} {:>8} {:>8} {:>8}", "ticker", "weight", "anchor", "delta");
            for row in &artifacts.weights {
                println!(
                    "{:<10} {:>8.4} {:>8.4} {:>8.4}",
                    row.ticker, row.weight, row.anchor, row.delta
                );
            }
            print_annotations(&artifacts.annotations);
            Ok(())
        }
        Commands::Catalog { file } => {
            let catalog = match file {
                Some(path) => Catalog::load_or_default(path).context("catalog load failed")?,
                None => Catalog::default_catalog(),
            };
            for ind in &catalog.indicators {
                println!(
                    "{:<24} {:<8} {:<2} {:<10} {:<10} {:<9} w={:.1} {}",
                    ind.id,
                    ind.source,
                    format!("{:?}", ind.frequency),
                    ind.pillar,
                    ind.timing,
                    ind.transform,
                    ind.weight,
                    ind.display_name,
                );
            }
            Ok(())
        }
        Commands::Run {
            profile,
            flex,
            out_dir,
        } => {
            let artifacts = run_pipeline(&cli, &registry, flags, start, end, profile, *flex)?;
            let config_tickers = macrolab_runner::config::default_universe();
            for check in run_checks(&artifacts, &config_tickers) {
                let mark = if check.passed { "PASS" } else { "FAIL" };
                println!("[{mark}] {:<22} {}", check.name, check.detail);
            }
            let run_dir = save_artifacts(out_dir, &artifacts)?;
            println!("artifacts written to {}", run_dir.display());
            print_annotations(&artifacts.annotations);
            Ok(())
        }
    }
}

fn parse_date_or(arg: &Option<String>, default: NaiveDate) -> Result<NaiveDate> {
    match arg {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid date '{s}' (expected YYYY-MM-DD)")),
        None => Ok(default),
    }
}

fn parse_profile(name: &str) -> Result<Profile> {
    match name.to_ascii_lowercase().as_str() {
        "conservative" => Ok(Profile::Conservative),
        "balanced" => Ok(Profile::Balanced),
        "growth" => Ok(Profile::Growth),
        other => bail!("unknown profile '{other}' (conservative, balanced, growth)"),
    }
}

fn build_registry(cli: &Cli) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    for name in PROVIDER_NAMES {
        if cli.synthetic {
            registry = registry.register(Arc::new(SyntheticProvider::new(name)));
        } else {
            registry = registry.register(Arc::new(CsvStore::new(name, cli.data_dir.join(name))));
        }
    }
    registry
}

fn price_provider(cli: &Cli) -> Box<dyn PricePanelProvider> {
    if cli.synthetic {
        Box::new(SyntheticProvider::new("MARKET"))
    } else {
        Box::new(CsvStore::new("MARKET", cli.data_dir.join("MARKET")))
    }
}

#[allow(clippy::too_many_arguments)]
fn run_pipeline(
    cli: &Cli,
    registry: &ProviderRegistry,
    flags: ProviderFlags,
    start: NaiveDate,
    end: NaiveDate,
    profile: &str,
    flex: f64,
) -> Result<macrolab_runner::SessionArtifacts> {
    let mut config = RunConfig::defaults(end);
    config.start = start;
    config.end = end;
    config.profile = parse_profile(profile)?;
    config.flex = flex;
    config.provider_flags = flags;

    let prices = price_provider(cli);
    let cache = MemoCache::with_default_ttl();
    let catalog = Catalog::default_catalog();
    run_session(&config, registry, prices.as_ref(), &cache, &catalog)
}

fn print_annotations(annotations: &[macrolab_runner::Annotation]) {
    for a in annotations {
        eprintln!("{:?}: {}", a.severity, a.message);
    }
}
