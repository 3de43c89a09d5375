//! Synthetic world: a small town grid crossed by two highways.
//!
//! ```text
//!                 │ north–south highway (column NCOLS / 3)
//!   ──●──────●────┼────●──────●──  east–west highway (row NROWS / 2)
//!                 ●
//!                 │
//! ```
//!
//! `●` marks a ramp.  Every ramp is an on/off pair: two adjacent cells that
//! share one connector id.  Costs are minutes per metre.

use std::path::Path;

use anyhow::Result;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use sa_core::{
    AttrValue, CellPos, Connector, ConnectorId, ConnectorSet, CostSurface, GridSpec, Origin,
    Raster, Sheet,
};

// ── Constants ─────────────────────────────────────────────────────────────────

pub const NCOLS:        u32 = 240;
pub const NROWS:        u32 = 180;
pub const CELL_SIZE:    f64 = 30.0;
const XLL:              f64 = 500_000.0;
const YLL:              f64 = 4_200_000.0;

/// Metres per minute.
const LOCAL_SPEED:      f64 = 500.0;
/// Metres per minute.
pub const HIGHWAY_SPEED: f64 = 1_600.0;

/// Cells between consecutive ramps along a highway.
const RAMP_SPACING:     u32 = 40;

// ── World ─────────────────────────────────────────────────────────────────────

pub struct World {
    pub grid:    GridSpec,
    pub local:   CostSurface,
    pub highway: CostSurface,
    pub ramps:   ConnectorSet,
}

pub fn build_world() -> Result<World> {
    let grid = GridSpec::new(NCOLS, NROWS, XLL, YLL, CELL_SIZE);
    let ew_row = NROWS / 2;
    let ns_col = NCOLS / 3;

    let local = CostSurface::new(Sheet::Local, Raster::filled(grid, 1.0 / LOCAL_SPEED))?;

    let on_highway = |p: CellPos| p.row == ew_row || p.col == ns_col;
    let values = (0..grid.cell_count())
        .map(|i| on_highway(grid.pos(i)).then_some(1.0 / HIGHWAY_SPEED))
        .collect();
    let highway = CostSurface::new(Sheet::Highway, Raster::from_values(grid, values)?)?;

    let mut points = Vec::new();
    let mut next_id = 1u32;
    let mut ramp = |a: CellPos, b: CellPos| {
        let id = ConnectorId(next_id);
        next_id += 1;
        points.push(Connector { id, point: grid.center(a) });
        points.push(Connector { id, point: grid.center(b) });
    };
    for col in (RAMP_SPACING / 2..NCOLS - 1).step_by(RAMP_SPACING as usize) {
        if col.abs_diff(ns_col) > 2 {
            ramp(CellPos::new(ew_row, col), CellPos::new(ew_row, col + 1));
        }
    }
    for row in (RAMP_SPACING / 2..NROWS - 1).step_by(RAMP_SPACING as usize) {
        if row.abs_diff(ew_row) > 2 {
            ramp(CellPos::new(row, ns_col), CellPos::new(row + 1, ns_col));
        }
    }

    Ok(World { grid, local, highway, ramps: ConnectorSet::new(points) })
}

/// `groups` trails of `per_trail` trailheads each, clustered around random
/// centres.  Every trailhead carries `trail_id`, `minutes` and `score`.
pub fn random_trailheads(grid: &GridSpec, groups: u32, per_trail: u32, seed: u64) -> Vec<Origin> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut origins = Vec::new();
    for trail in 0..groups {
        let row = rng.gen_range(10..grid.nrows - 10);
        let col = rng.gen_range(10..grid.ncols - 10);
        let minutes = f64::from(rng.gen_range(4u32..=12));
        for _ in 0..per_trail {
            let pos = CellPos::new(row + rng.gen_range(0..6), col + rng.gen_range(0..6));
            origins.push(
                Origin::new(grid.center(pos))
                    .with_attr("trail_id", AttrValue::Number(f64::from(trail)))
                    .with_attr("minutes", AttrValue::Number(minutes))
                    .with_attr("score", AttrValue::Number(rng.gen_range(1.0..100.0))),
            );
        }
    }
    origins
}

// ── Export ────────────────────────────────────────────────────────────────────

pub fn write_origins(path: &Path, origins: &[Origin]) -> Result<()> {
    let fields = ["trail_id", "minutes", "score"];
    let mut w = csv::Writer::from_path(path)?;
    w.write_record(["x", "y"].iter().chain(fields.iter()))?;
    for o in origins {
        let mut row = vec![o.point.x.to_string(), o.point.y.to_string()];
        for f in fields {
            row.push(o.attr(f).and_then(AttrValue::as_number).map(|v| v.to_string()).unwrap_or_default());
        }
        w.write_record(&row)?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_ramps(path: &Path, ramps: &ConnectorSet) -> Result<()> {
    let mut w = csv::Writer::from_path(path)?;
    w.write_record(["ramp_id", "x", "y"])?;
    for c in ramps.points() {
        w.write_record([c.id.0.to_string(), c.point.x.to_string(), c.point.y.to_string()])?;
    }
    w.flush()?;
    Ok(())
}
