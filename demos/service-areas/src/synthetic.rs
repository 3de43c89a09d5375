//! synthetic — end-to-end run over a generated world.
//!
//! Builds a 240 × 180 grid of 30 m cells with two highways and paired ramps,
//! scatters a dozen trails of trailheads over it, writes everything to
//! `output/synthetic/inputs` together with a `config.json` that the
//! `service_areas` binary accepts, and computes one service area per trail.
//! The batch then runs a second time to show that finished groups are
//! skipped.

mod world;

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use log::info;

use sa_batch::{BatchBuilder, BatchInputs, LogObserver};
use sa_core::{MaxCost, RunConfig, SolverParams, ValuePolicy};
use sa_spatial::{CellSampler, DijkstraCostDistance};
use sa_store::{DirStore, RasterStore, write_asc};

use world::{HIGHWAY_SPEED, build_world, random_trailheads, write_origins, write_ramps};

// ── Constants ─────────────────────────────────────────────────────────────────

const TRAILS:     u32 = 12;
const PER_TRAIL:  u32 = 3;
const SEED:       u64 = 42;
const OUTPUT_DIR: &str = "output/synthetic";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=== synthetic — dual-surface service areas ===");
    println!("Trails: {TRAILS}  |  Trailheads per trail: {PER_TRAIL}  |  Seed: {SEED}");
    println!();

    // 1. Build and export the world.
    let world = build_world()?;
    let origins = random_trailheads(&world.grid, TRAILS, PER_TRAIL, SEED);
    let root = Path::new(OUTPUT_DIR);
    let inputs_dir = root.join("inputs");
    std::fs::create_dir_all(&inputs_dir)?;

    write_asc(&inputs_dir.join("local.asc"), world.local.raster())?;
    write_asc(&inputs_dir.join("highway.asc"), world.highway.raster())?;
    write_origins(&inputs_dir.join("trailheads.csv"), &origins)?;
    write_ramps(&inputs_dir.join("ramps.csv"), &world.ramps)?;
    info!(
        "world: {}x{} cells, {} ramp points, {} trailheads",
        world.grid.ncols,
        world.grid.nrows,
        world.ramps.len(),
        origins.len()
    );

    // 2. Run configuration, saved for the `service_areas` binary.
    let mut config = RunConfig::new(
        root.join("areas"),
        inputs_dir.join("trailheads.csv"),
        inputs_dir.join("local.asc"),
        inputs_dir.join("highway.asc"),
        inputs_dir.join("ramps.csv"),
        "ramp_id",
    );
    config.group_field = Some("trail_id".into());
    config.max_cost = MaxCost::Field("minutes".into());
    config.value_policy = ValuePolicy::Actual;
    config.solver = SolverParams { tolerance: 0.1, max_speed: HIGHWAY_SPEED, max_iterations: None };
    std::fs::write(root.join("config.json"), serde_json::to_string_pretty(&config)?)?;

    // 3. Run twice over the same store.  The second run finds every group
    //    complete and makes no cost-distance calls.
    for attempt in 1..=2 {
        let inputs = BatchInputs::load(&config)?;
        let store = DirStore::open(&config.output)?;
        let runner = BatchBuilder::new(config.clone(), inputs, DijkstraCostDistance, CellSampler, store)
            .build()?;

        let t0 = Instant::now();
        let report = runner.run(&LogObserver)?;
        println!(
            "Run {attempt}: {} computed, {} skipped, {} failed, {} oracle calls in {:.3} s",
            report.computed.len(),
            report.skipped.len(),
            report.failed.len(),
            report.oracle_calls,
            t0.elapsed().as_secs_f64()
        );

        if attempt == 1 {
            println!();
            println!("{:<20} {:>8} {:>8} {:>10} {:>10}", "Group", "Origins", "Cutoff", "Cells", "Max (min)");
            println!("{}", "-".repeat(60));
            for g in runner.groups() {
                let Some(area) = runner.store().load(&g.name)? else {
                    println!("{:<20} {:>8} (not computed)", g.name, g.origins.len());
                    continue;
                };
                println!(
                    "{:<20} {:>8} {:>8} {:>10} {:>10.2}",
                    g.name,
                    g.origins.len(),
                    g.cutoff.map_or_else(|| "-".to_owned(), |c| c.to_string()),
                    area.defined_count(),
                    area.max_value().unwrap_or(0.0),
                );
            }
            println!();
        }
    }

    println!("Outputs in {}", config.output.display());
    Ok(())
}
