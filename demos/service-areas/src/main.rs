//! service_areas — compute highway-aware service areas for every origin group
//! described by a JSON run configuration.
//!
//! ```text
//! service_areas <config.json> [--sqlite]
//! ```
//!
//! Example configuration:
//!
//! ```json
//! {
//!   "output":             "output/trailheads",
//!   "origins":            "data/trailheads.csv",
//!   "local_surface":      "data/local_minutes.asc",
//!   "highway_surface":    "data/highway_minutes.asc",
//!   "connectors":         "data/ramps.csv",
//!   "connector_id_field": "ramp_id",
//!   "group_field":        "trail_id",
//!   "max_cost":           { "field": "minutes" },
//!   "value_policy":       "actual",
//!   "solver":             { "tolerance": 1.0, "max_speed": 1900.0 }
//! }
//! ```
//!
//! Re-running with the same configuration and inputs skips every group that
//! already finished.  Set `RUST_LOG=debug` to see individual passes.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, bail};

use sa_batch::{BatchBuilder, BatchInputs, BatchReport, LogObserver};
use sa_core::RunConfig;
use sa_spatial::{CellSampler, DijkstraCostDistance};
use sa_store::{DirStore, RasterStore};

const USAGE: &str = "usage: service_areas <config.json> [--sqlite]";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let Some(config_path) = args.next() else {
        bail!(USAGE);
    };
    let sqlite = match args.next().as_deref() {
        None => false,
        Some("--sqlite") => true,
        Some(other) => bail!("unexpected argument {other:?}\n{USAGE}"),
    };

    let config = read_config(Path::new(&config_path))?;
    let inputs = BatchInputs::load(&config).context("loading inputs")?;

    let t0 = Instant::now();
    let report = if sqlite { run_sqlite(config, inputs)? } else { run_dir(config, inputs)? };
    print_summary(&report, t0.elapsed().as_secs_f64());

    if !report.is_success() {
        bail!("{} groups failed", report.failed.len());
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<RunConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config: RunConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

fn run_dir(config: RunConfig, inputs: BatchInputs) -> Result<BatchReport> {
    let store = DirStore::open(&config.output)?;
    run_with(config, inputs, store)
}

#[cfg(feature = "sqlite")]
fn run_sqlite(config: RunConfig, inputs: BatchInputs) -> Result<BatchReport> {
    let store = sa_store::SqliteStore::open(&config.output)?;
    run_with(config, inputs, store)
}

#[cfg(not(feature = "sqlite"))]
fn run_sqlite(_config: RunConfig, _inputs: BatchInputs) -> Result<BatchReport> {
    bail!("--sqlite requires building with the `sqlite` feature")
}

fn run_with<St: RasterStore>(config: RunConfig, inputs: BatchInputs, store: St) -> Result<BatchReport> {
    let runner = BatchBuilder::new(config, inputs, DijkstraCostDistance, CellSampler, store).build()?;
    Ok(runner.run(&LogObserver)?)
}

fn print_summary(report: &BatchReport, secs: f64) {
    println!();
    println!("Run complete in {secs:.3} s");
    println!("  computed      : {}", report.computed.len());
    println!("  skipped       : {}", report.skipped.len());
    println!("  failed        : {}", report.failed.len());
    println!("  oracle calls  : {}", report.oracle_calls);
    for (name, error) in &report.failed {
        println!("  ! {name}: {error}");
    }
}
