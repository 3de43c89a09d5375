//! `BatchBuilder`, `BatchRunner` and the per-group pipeline.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use log::debug;
use rustc_hash::FxHasher;

use sa_core::{Raster, RunConfig, SaError, Sheet};
use sa_solver::{ConvergenceSolver, PassObserver, PassRaster, SolverError, SolverResult, compose};
use sa_spatial::{AnalysisEnv, ConnectorIndex, CostDistance, Sampler};
use sa_store::RasterStore;

use crate::group::{OriginGroup, plan_groups};
use crate::{BatchError, BatchInputs, BatchObserver, BatchResult};

// ── BatchReport ───────────────────────────────────────────────────────────────

/// Summary of one [`BatchRunner::run`].
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Output names computed and committed by this run.
    pub computed:     Vec<String>,
    /// Output names already complete in the store.
    pub skipped:      Vec<String>,
    /// Groups whose solve failed; none of them was committed.
    pub failed:       Vec<(String, BatchError)>,
    /// Cost-distance passes run across all groups.
    pub oracle_calls: usize,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

// ── BatchBuilder ──────────────────────────────────────────────────────────────

/// Fluent builder for [`BatchRunner`].
///
/// # Required inputs
///
/// - [`RunConfig`] — grouping, cutoff, value policy, solver parameters
/// - [`BatchInputs`] — origins, both cost surfaces, connectors
/// - `O: CostDistance` — e.g. [`sa_spatial::DijkstraCostDistance`]
/// - `S: Sampler` — e.g. [`sa_spatial::CellSampler`]
/// - `St: RasterStore` — e.g. [`sa_store::DirStore`]
///
/// # Example
///
/// ```rust,ignore
/// let store = DirStore::open(&config.output)?;
/// let inputs = BatchInputs::load(&config)?;
/// let runner = BatchBuilder::new(config, inputs, DijkstraCostDistance, CellSampler, store)
///     .build()?;
/// let report = runner.run(&LogObserver)?;
/// ```
pub struct BatchBuilder<O: CostDistance, S: Sampler, St: RasterStore> {
    config:  RunConfig,
    inputs:  BatchInputs,
    oracle:  O,
    sampler: S,
    store:   St,
    index:   Option<ConnectorIndex>,
}

impl<O: CostDistance, S: Sampler, St: RasterStore> BatchBuilder<O, S, St> {
    pub fn new(config: RunConfig, inputs: BatchInputs, oracle: O, sampler: S, store: St) -> Self {
        Self { config, inputs, oracle, sampler, store, index: None }
    }

    /// Supply a prebuilt index over `inputs.connectors`.
    ///
    /// If not called, the index is bulk-loaded in [`build`](Self::build).
    pub fn connector_index(mut self, index: ConnectorIndex) -> Self {
        self.index = Some(index);
        self
    }

    /// Validate configuration and inputs, resolve every group, and return a
    /// ready-to-run [`BatchRunner`].
    ///
    /// # Errors
    ///
    /// [`BatchError::Config`] for any invalid option combination, missing
    /// attribute, or misaligned surfaces.  Nothing is written.
    pub fn build(self) -> BatchResult<BatchRunner<O, S, St>> {
        let config = self.config;
        let inputs = self.inputs;
        config.validate()?;

        // ── Inputs ────────────────────────────────────────────────────────
        if inputs.origins.is_empty() {
            return Err(SaError::Config("no origin features".into()).into());
        }
        if inputs.local.sheet() != Sheet::Local || inputs.highway.sheet() != Sheet::Highway {
            return Err(SaError::Config("cost surfaces are tagged with the wrong sheets".into()).into());
        }
        let grid = *inputs.local.spec();
        if !grid.same_as(inputs.highway.spec()) {
            return Err(SaError::Config(format!(
                "highway surface grid {:?} does not match local surface grid {grid:?}",
                inputs.highway.spec()
            ))
            .into());
        }

        // ── Groups ────────────────────────────────────────────────────────
        let groups = plan_groups(&config, &inputs.origins)?;
        let index = self.index.unwrap_or_else(|| ConnectorIndex::new(&inputs.connectors));
        let data_hash = hash_inputs(&inputs);
        debug!(
            "{} groups planned, {} connector points indexed, input hash {data_hash:016x}",
            groups.len(),
            index.len()
        );

        let solver = ConvergenceSolver::new(self.oracle, self.sampler, config.solver.clone());
        Ok(BatchRunner { config, inputs, groups, solver, store: self.store, index, data_hash })
    }
}

// ── BatchRunner ───────────────────────────────────────────────────────────────

/// Runs the convergence solver for every origin group and persists the
/// results.
///
/// Create via [`BatchBuilder`].
pub struct BatchRunner<O: CostDistance, S: Sampler, St: RasterStore> {
    config:    RunConfig,
    inputs:    BatchInputs,
    groups:    Vec<OriginGroup>,
    solver:    ConvergenceSolver<O, S>,
    store:     St,
    index:     ConnectorIndex,
    data_hash: u64,
}

/// What happened to one group.
enum Outcome {
    Skipped,
    Computed { passes: usize },
    Failed { passes: usize, error: SolverError },
}

impl<O: CostDistance, S: Sampler, St: RasterStore> BatchRunner<O, S, St> {
    // ── Public API ────────────────────────────────────────────────────────

    /// Process every group.
    ///
    /// Groups already complete in the store are skipped.  A group whose
    /// solve fails is listed in [`BatchReport::failed`] and not committed;
    /// the other groups still run.
    ///
    /// # Errors
    ///
    /// [`BatchError::Store`] if the store cannot be read or written (the run
    /// stops at the first such error), [`BatchError::ThreadPool`] if the
    /// worker pool cannot be created, [`BatchError::Poisoned`] if a worker
    /// panicked while claiming a group.
    pub fn run<B: BatchObserver>(&self, observer: &B) -> BatchResult<BatchReport> {
        observer.on_run_start(self.groups.len());
        let claims: Mutex<HashSet<String>> = Mutex::new(HashSet::new());

        let outcomes = self.process_all(&claims, observer);
        // Scratch space goes away on every exit path.
        let finished = self.store.finish();
        let outcomes = outcomes?;
        finished?;

        let mut report = BatchReport::default();
        for (group, outcome) in self.groups.iter().zip(outcomes) {
            match outcome {
                Outcome::Skipped => report.skipped.push(group.name.clone()),
                Outcome::Computed { passes } => {
                    report.oracle_calls += passes;
                    report.computed.push(group.name.clone());
                }
                Outcome::Failed { passes, error } => {
                    report.oracle_calls += passes;
                    let name = group.name.clone();
                    report.failed.push((name.clone(), BatchError::Group { name, source: error }));
                }
            }
        }
        observer.on_run_end(&report);
        Ok(report)
    }

    /// Resolved groups in processing order.
    pub fn groups(&self) -> &[OriginGroup] {
        &self.groups
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    /// Fingerprint under which `group`'s output is memoised.
    ///
    /// Covers every configuration option that affects the output, the
    /// group's origins and resolved parameters, and the content of both
    /// surfaces and the connector set.
    pub fn fingerprint(&self, group: &OriginGroup) -> u64 {
        let mut h = FxHasher::default();
        self.config.canonical().hash(&mut h);
        self.data_hash.hash(&mut h);
        group.name.hash(&mut h);
        group.cutoff.map(f64::to_bits).hash(&mut h);
        group.constant.map(f64::to_bits).hash(&mut h);
        for o in &group.origins {
            o.point.x.to_bits().hash(&mut h);
            o.point.y.to_bits().hash(&mut h);
        }
        h.finish()
    }

    // ── Internals ─────────────────────────────────────────────────────────

    #[cfg(not(feature = "parallel"))]
    fn process_all<B: BatchObserver>(
        &self,
        claims:   &Mutex<HashSet<String>>,
        observer: &B,
    ) -> BatchResult<Vec<Outcome>> {
        self.groups.iter().map(|g| self.process(g, claims, observer)).collect()
    }

    #[cfg(feature = "parallel")]
    fn process_all<B: BatchObserver>(
        &self,
        claims:   &Mutex<HashSet<String>>,
        observer: &B,
    ) -> BatchResult<Vec<Outcome>> {
        use rayon::prelude::*;

        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(n) = self.config.num_threads {
            builder = builder.num_threads(n);
        }
        let pool = builder.build().map_err(|e| BatchError::ThreadPool(e.to_string()))?;
        pool.install(|| {
            self.groups
                .par_iter()
                .map(|g| self.process(g, claims, observer))
                .collect()
        })
    }

    /// Skip check, solve, compose, commit.
    fn process<B: BatchObserver>(
        &self,
        group:    &OriginGroup,
        claims:   &Mutex<HashSet<String>>,
        observer: &B,
    ) -> BatchResult<Outcome> {
        let name = group.name.as_str();
        let fingerprint = self.fingerprint(group);

        // ── Skip check + claim, serialised across workers ─────────────────
        {
            let mut claimed = lock_claims(claims)?;
            if self.store.is_complete(name, fingerprint)? || !claimed.insert(name.to_owned()) {
                observer.on_group_skipped(name);
                return Ok(Outcome::Skipped);
            }
        }

        observer.on_group_start(name, group.origins.len(), group.cutoff);
        let started = Instant::now();
        let mut forward = ForwardPasses { name, observer, passes: 0 };

        match self.solve_group(group, &mut forward) {
            Ok(raster) => {
                self.store.commit(name, fingerprint, &raster)?;
                observer.on_group_done(name, forward.passes, started.elapsed());
                Ok(Outcome::Computed { passes: forward.passes })
            }
            Err(error) => {
                observer.on_group_failed(name, &error);
                Ok(Outcome::Failed { passes: forward.passes, error })
            }
        }
    }

    fn solve_group<P: PassObserver>(
        &self,
        group:    &OriginGroup,
        observer: &mut P,
    ) -> SolverResult<Raster> {
        let points = group.points();
        let radius = group.cutoff.map(|c| c * self.config.solver.max_speed);
        let env = AnalysisEnv::around(*self.inputs.local.spec(), &points, radius)?;
        let connectors = self.index.within(&env.extent());
        debug!(
            "{}: window {}x{} cells, {} connector points",
            group.name,
            env.window.ncols,
            env.window.nrows,
            connectors.len()
        );

        let solve = self.solver.solve(
            &env,
            &points,
            group.cutoff,
            &self.inputs.local,
            &self.inputs.highway,
            &connectors,
            observer,
        )?;
        compose(&solve.passes, group.cutoff, &self.config.value_policy, group.constant)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Relays solver pass callbacks to the batch observer, tagged with the
/// group's output name.
struct ForwardPasses<'a, B: BatchObserver> {
    name:     &'a str,
    observer: &'a B,
    passes:   usize,
}

impl<B: BatchObserver> PassObserver for ForwardPasses<'_, B> {
    fn on_pass(&mut self, pass: &PassRaster, improved: usize) {
        self.passes += 1;
        self.observer.on_pass(self.name, pass.index, pass.sheet, pass.seeds.len(), improved);
    }
}

/// Lock the run-wide claim set.
pub(crate) fn lock_claims(
    claims: &Mutex<HashSet<String>>,
) -> BatchResult<MutexGuard<'_, HashSet<String>>> {
    claims.lock().map_err(|_| BatchError::Poisoned("claim set"))
}

/// Content hash of the surfaces and connectors.
fn hash_inputs(inputs: &BatchInputs) -> u64 {
    let mut h = FxHasher::default();
    for surface in [&inputs.local, &inputs.highway] {
        let s = surface.spec();
        (s.ncols, s.nrows).hash(&mut h);
        (s.xll.to_bits(), s.yll.to_bits(), s.cell_size.to_bits()).hash(&mut h);
        for v in surface.raster().values() {
            v.map(f64::to_bits).hash(&mut h);
        }
    }
    for c in inputs.connectors.points() {
        (c.id, c.point.x.to_bits(), c.point.y.to_bits()).hash(&mut h);
    }
    h.finish()
}
