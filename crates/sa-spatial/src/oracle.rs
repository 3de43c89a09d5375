//! Cost-distance trait and default Dijkstra implementation.
//!
//! # Pluggability
//!
//! The solver calls cost distance via the [`CostDistance`] trait, so
//! applications can swap in a tiled, out-of-core, or GPU engine without
//! touching the convergence loop.  The default [`DijkstraCostDistance`] is
//! an in-memory 8-connected raster Dijkstra.
//!
//! # Cost model
//!
//! Moving between adjacent cells `a` and `b` costs
//!
//! ```text
//! (cost[a] + cost[b]) / 2 · cell_size            (orthogonal)
//! (cost[a] + cost[b]) / 2 · cell_size · √2       (diagonal)
//! ```
//!
//! A seed's own cell carries the seed's start cost.  No-data surface cells
//! are impassable, and a cell whose accumulated cost would exceed the cutoff
//! is neither reported nor expanded.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use log::trace;

use sa_core::{CellId, CellPos, CostSurface, Raster, WorldPoint};

use crate::{AnalysisEnv, SpatialResult};

// ── Seed ──────────────────────────────────────────────────────────────────────

/// A weighted source for one cost-distance computation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Seed {
    pub point:      WorldPoint,
    /// Cost already accumulated when the source is reached.
    pub start_cost: f64,
}

impl Seed {
    #[inline]
    pub fn new(point: WorldPoint, start_cost: f64) -> Self {
        Self { point, start_cost }
    }

    /// A seed with no starting cost.
    #[inline]
    pub fn origin(point: WorldPoint) -> Self {
        Self { point, start_cost: 0.0 }
    }
}

// ── CostDistance trait ────────────────────────────────────────────────────────

/// Pluggable multi-source minimum accumulated cost engine.
///
/// # Contract
///
/// - The result covers exactly `env.output_spec()`.
/// - Cells unreachable from every seed are no-data.
/// - With `cutoff = Some(c)`, no cell holds a value greater than `c`.
/// - Seeds outside the window, on no-data cells, or with a negative,
///   non-finite, or over-cutoff start cost are ignored.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync` so one engine can serve every
/// worker of the batch pool.
pub trait CostDistance: Send + Sync {
    fn cost_distance(
        &self,
        env:     &AnalysisEnv,
        seeds:   &[Seed],
        surface: &CostSurface,
        cutoff:  Option<f64>,
    ) -> SpatialResult<Raster>;
}

// ── DijkstraCostDistance ──────────────────────────────────────────────────────

/// Standard Dijkstra over the 8-connected cell graph of the window.
pub struct DijkstraCostDistance;

impl CostDistance for DijkstraCostDistance {
    fn cost_distance(
        &self,
        env:     &AnalysisEnv,
        seeds:   &[Seed],
        surface: &CostSurface,
        cutoff:  Option<f64>,
    ) -> SpatialResult<Raster> {
        env.check_grid(surface.spec())?;
        Ok(dijkstra(env, seeds, surface, cutoff))
    }
}

// ── Dijkstra internals ────────────────────────────────────────────────────────

/// (row offset, col offset, length factor) of the 8 neighbours.
const NEIGHBOURS: [(i32, i32, f64); 8] = [
    (-1, 0, 1.0),
    (1, 0, 1.0),
    (0, -1, 1.0),
    (0, 1, 1.0),
    (-1, -1, std::f64::consts::SQRT_2),
    (-1, 1, std::f64::consts::SQRT_2),
    (1, -1, std::f64::consts::SQRT_2),
    (1, 1, std::f64::consts::SQRT_2),
];

fn dijkstra(
    env:     &AnalysisEnv,
    seeds:   &[Seed],
    surface: &CostSurface,
    cutoff:  Option<f64>,
) -> Raster {
    let out_spec = env.output_spec();
    let window = env.window;
    let n = out_spec.cell_count();
    let limit = cutoff.unwrap_or(f64::INFINITY);
    let half_cell = surface.spec().cell_size * 0.5;

    // Cell costs of the window, copied once so the inner loop is a flat scan.
    let cost: Vec<Option<f64>> = surface.raster().crop(&window).values().collect();

    // dist[c] = best known accumulated cost of window cell c.
    let mut dist = vec![f64::INFINITY; n];

    // Min-heap keyed on the cost's bit pattern: for non-negative finite
    // floats, bit order equals numeric order.  Secondary key CellId makes
    // tie-breaking deterministic.
    let mut heap: BinaryHeap<Reverse<(u64, CellId)>> = BinaryHeap::new();

    for seed in seeds {
        // `+ 0.0` folds -0.0 into +0.0 so the bit-pattern ordering holds.
        let start = seed.start_cost + 0.0;
        if !(start.is_finite() && start >= 0.0 && start <= limit) {
            continue;
        }
        let Some(idx) = env.local_index(seed.point) else {
            continue;
        };
        if cost[idx].is_none() {
            continue;
        }
        if start < dist[idx] {
            dist[idx] = start;
            heap.push(Reverse((start.to_bits(), CellId(idx as u32))));
        }
    }
    trace!("cost distance: {} of {} seeds placed", heap.len(), seeds.len());

    let nrows = out_spec.nrows as i32;
    let ncols = out_spec.ncols as i32;

    while let Some(Reverse((bits, cell))) = heap.pop() {
        let d = f64::from_bits(bits);
        let idx = cell.index();

        // Skip stale heap entries.
        if d > dist[idx] {
            continue;
        }
        let Some(here) = cost[idx] else { continue };
        let pos = out_spec.pos(idx);

        for &(dr, dc, factor) in &NEIGHBOURS {
            let r = pos.row as i32 + dr;
            let c = pos.col as i32 + dc;
            if r < 0 || c < 0 || r >= nrows || c >= ncols {
                continue;
            }
            let nidx = out_spec.index(CellPos::new(r as u32, c as u32));
            let Some(there) = cost[nidx] else { continue };

            let next = d + (here + there) * half_cell * factor;
            if next > limit {
                continue;
            }
            if next < dist[nidx] {
                dist[nidx] = next;
                heap.push(Reverse((next.to_bits(), CellId(nidx as u32))));
            }
        }
    }

    let mut out = Raster::empty(out_spec);
    for (i, &d) in dist.iter().enumerate() {
        if d.is_finite() {
            out.set_index(i, Some(d));
        }
    }
    out
}
