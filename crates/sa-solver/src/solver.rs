//! The dual-surface convergence loop.
//!
//! # Algorithm
//!
//! ```text
//! ① Local pass from the origins (start cost 0).
//!   Sample at connectors → Local arrivals.  None reached → done.
//! ② active = every id with a Local arrival
//!   loop:
//!     Highway pass seeded by `active` at their Local arrival cost.
//!     Sample → merge into Highway arrivals → improved.
//!     improved empty → done.
//!     Local pass seeded by `improved` at their Highway arrival cost.
//!     Sample → merge into Local arrivals → active.
//!     active empty → done.
//! ```
//!
//! Every merge accepts only strict improvements (see [`ArrivalRecord`]), and
//! every pass is bounded by the cutoff, so the loop reaches a fixed point.
//!
//! [`ArrivalRecord`]: crate::ArrivalRecord

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use sa_core::{ConnectorId, ConnectorSet, CostSurface, SolverParams, WorldPoint};
use sa_spatial::{AnalysisEnv, CostDistance, Sampler, Seed};

use crate::tracker::ArrivalRecord;
use crate::{PassObserver, PassRaster, RampTracker, SolverResult};

// ── Solve ─────────────────────────────────────────────────────────────────────

/// Result of one group's solve.
#[derive(Clone, Debug)]
pub struct Solve {
    /// Every pass in the order it was computed.
    pub passes:    Vec<PassRaster>,
    /// Final arrival records.
    pub tracker:   RampTracker,
    /// `true` if `max_iterations` ended the loop early.
    pub truncated: bool,
}

// ── ConvergenceSolver ─────────────────────────────────────────────────────────

/// Alternates cost-distance passes between the Local and Highway sheets
/// until no connector arrival improves.
///
/// Stateless between calls: one solver serves every group of a batch.
pub struct ConvergenceSolver<O: CostDistance, S: Sampler> {
    oracle:  O,
    sampler: S,
    params:  SolverParams,
}

impl<O: CostDistance, S: Sampler> ConvergenceSolver<O, S> {
    pub fn new(oracle: O, sampler: S, params: SolverParams) -> Self {
        Self { oracle, sampler, params }
    }

    /// Solve one group.
    ///
    /// `connectors` should already be restricted to the group's window;
    /// connectors outside it are simply never reached.
    ///
    /// # Errors
    ///
    /// [`SolverError::Oracle`][crate::SolverError::Oracle] if any
    /// cost-distance or sampling call fails.  No partial result is returned.
    #[allow(clippy::too_many_arguments)]
    pub fn solve<P: PassObserver>(
        &self,
        env:        &AnalysisEnv,
        origins:    &[WorldPoint],
        cutoff:     Option<f64>,
        local:      &CostSurface,
        highway:    &CostSurface,
        connectors: &ConnectorSet,
        observer:   &mut P,
    ) -> SolverResult<Solve> {
        let mut tracker = RampTracker::new(self.params.tolerance);
        let mut passes: Vec<PassRaster> = Vec::new();
        let points = connectors.by_id();

        // ── ① Local pass from the origins ─────────────────────────────────
        let seeds = origins.iter().map(|&p| Seed::origin(p)).collect();
        let mut active = self.step(
            env, local, seeds, cutoff, connectors, &mut tracker, &mut passes, observer,
        )?;

        if active.is_empty() {
            debug!("no connector reached from {} origins; single-sheet result", origins.len());
            observer.on_solved(passes.len(), false);
            return Ok(Solve { passes, tracker, truncated: false });
        }

        // ── ② Alternation ─────────────────────────────────────────────────
        let mut rounds = 0usize;
        let mut truncated = false;
        loop {
            if let Some(max) = self.params.max_iterations {
                if rounds >= max {
                    warn!(
                        "stopping after {rounds} highway/local rounds with {} connectors still improving",
                        active.len()
                    );
                    truncated = true;
                    break;
                }
            }
            rounds += 1;

            let seeds = seeds_for(&points, &active, &tracker.local);
            let improved = self.step(
                env, highway, seeds, cutoff, connectors, &mut tracker, &mut passes, observer,
            )?;
            if improved.is_empty() {
                break;
            }

            let seeds = seeds_for(&points, &improved, &tracker.highway);
            active = self.step(
                env, local, seeds, cutoff, connectors, &mut tracker, &mut passes, observer,
            )?;
            if active.is_empty() {
                break;
            }
        }

        debug!("converged after {} passes ({rounds} rounds)", passes.len());
        observer.on_solved(passes.len(), truncated);
        Ok(Solve { passes, tracker, truncated })
    }

    /// Run one pass on `surface`, sample it, and merge the samples into the
    /// surface's arrival record.  Returns the improved ids.
    #[allow(clippy::too_many_arguments)]
    fn step<P: PassObserver>(
        &self,
        env:        &AnalysisEnv,
        surface:    &CostSurface,
        seeds:      Vec<Seed>,
        cutoff:     Option<f64>,
        connectors: &ConnectorSet,
        tracker:    &mut RampTracker,
        passes:     &mut Vec<PassRaster>,
        observer:   &mut P,
    ) -> SolverResult<BTreeSet<ConnectorId>> {
        let sheet = surface.sheet();
        let index = passes.len() + 1;
        debug!("pass {index} ({sheet}): {} seeds", seeds.len());

        let raster = self.oracle.cost_distance(env, &seeds, surface, cutoff)?;
        let candidates = self.sampler.sample_at(&raster, connectors)?;
        let improved = tracker.update(sheet, &candidates);

        let pass = PassRaster { index, sheet, seeds, raster };
        observer.on_pass(&pass, improved.len());
        passes.push(pass);
        Ok(improved)
    }
}

/// One seed per point of each id in `ids`, carrying the id's cost in
/// `record`.  Ordered by id, then by input order of the points.
fn seeds_for(
    points: &BTreeMap<ConnectorId, Vec<WorldPoint>>,
    ids:    &BTreeSet<ConnectorId>,
    record: &ArrivalRecord,
) -> Vec<Seed> {
    let mut seeds = Vec::new();
    for &id in ids {
        let (Some(cost), Some(at)) = (record.get(id), points.get(&id)) else { continue };
        seeds.extend(at.iter().map(|&p| Seed::new(p, cost)));
    }
    seeds
}
