//! Integration tests for sa-batch.
//!
//! The test world is a 200 × 5 grid of unit cells with local cost 1.  Row 2
//! carries a highway from column 10 to column 40 at cost 0.25, with ramp 1
//! at column 10 and ramp 2 at column 40.  Group 1 starts near the west end,
//! group 2 far to the east, out of reach of the highway.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use sa_core::{
    AttrValue, CellPos, Connector, ConnectorId, ConnectorSet, CostSurface, GridSpec, MaxCost,
    Origin, Raster, RunConfig, Sheet, ValuePolicy, WorldPoint,
};
use sa_solver::SolverError;
use sa_spatial::{AnalysisEnv, CellSampler, CostDistance, DijkstraCostDistance, Seed, SpatialError, SpatialResult};
use sa_store::{DirStore, RasterStore, StoreError, StoreResult};

use crate::{BatchBuilder, BatchInputs, BatchObserver, BatchReport, BatchRunner, NoopObserver};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn grid() -> GridSpec {
    GridSpec::new(200, 5, 0.0, 0.0, 1.0)
}

fn at(col: u32) -> WorldPoint {
    grid().center(CellPos::new(2, col))
}

fn origin(col: u32, group: f64) -> Origin {
    Origin::new(at(col)).with_attr("grp", AttrValue::Number(group))
}

fn inputs(origins: Vec<Origin>) -> BatchInputs {
    let g = grid();
    let local = CostSurface::new(Sheet::Local, Raster::filled(g, 1.0)).unwrap();
    let hw = (0..g.cell_count())
        .map(|i| {
            let p = g.pos(i);
            (p.row == 2 && (10..=40).contains(&p.col)).then_some(0.25)
        })
        .collect();
    let highway = CostSurface::new(Sheet::Highway, Raster::from_values(g, hw).unwrap()).unwrap();
    let ramps = ConnectorSet::new(vec![
        Connector { id: ConnectorId(1), point: at(10) },
        Connector { id: ConnectorId(2), point: at(40) },
    ]);
    BatchInputs::new(origins, local, highway, ramps)
}

fn two_groups() -> Vec<Origin> {
    vec![origin(2, 1.0), origin(190, 2.0)]
}

fn config(dir: &Path) -> RunConfig {
    let mut c = RunConfig::new(dir, "origins.csv", "local.asc", "highway.asc", "ramps.csv", "ramp_id");
    c.group_field = Some("grp".into());
    c.max_cost = MaxCost::Constant(20.0);
    // Cheapest cell costs 0.25 per unit, so 4 units per cost unit is a safe
    // upper bound on travel speed.
    c.solver.max_speed = 4.0;
    c.num_threads = Some(2);
    c
}

type Runner<O> = BatchRunner<O, CellSampler, DirStore>;

fn runner<O: CostDistance>(config: RunConfig, inputs: BatchInputs, oracle: O) -> Runner<O> {
    let store = DirStore::open(&config.output).unwrap();
    BatchBuilder::new(config, inputs, oracle, CellSampler, store).build().unwrap()
}

fn value_at(r: &Raster, p: WorldPoint) -> Option<f64> {
    r.spec().cell_of(p).and_then(|pos| r.get(pos))
}

/// Wraps the default oracle and counts calls.
#[derive(Clone, Default)]
struct CountingOracle {
    calls: Arc<AtomicUsize>,
}

impl CostDistance for CountingOracle {
    fn cost_distance(
        &self,
        env:     &AnalysisEnv,
        seeds:   &[Seed],
        surface: &CostSurface,
        cutoff:  Option<f64>,
    ) -> SpatialResult<Raster> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        DijkstraCostDistance.cost_distance(env, seeds, surface, cutoff)
    }
}

/// Fails every call.
struct FailingOracle;

impl CostDistance for FailingOracle {
    fn cost_distance(
        &self,
        _env:     &AnalysisEnv,
        _seeds:   &[Seed],
        _surface: &CostSurface,
        _cutoff:  Option<f64>,
    ) -> SpatialResult<Raster> {
        Err(SpatialError::NoInputs)
    }
}

#[derive(Default)]
struct CountingObserver {
    started: AtomicUsize,
    passes:  AtomicUsize,
    done:    AtomicUsize,
    skipped: AtomicUsize,
    failed:  AtomicUsize,
    ended:   AtomicUsize,
}

impl BatchObserver for CountingObserver {
    fn on_group_start(&self, _name: &str, _origins: usize, _cutoff: Option<f64>) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }
    fn on_pass(&self, _name: &str, _index: usize, _sheet: Sheet, _seeds: usize, _improved: usize) {
        self.passes.fetch_add(1, Ordering::Relaxed);
    }
    fn on_group_done(&self, _name: &str, _passes: usize, _elapsed: Duration) {
        self.done.fetch_add(1, Ordering::Relaxed);
    }
    fn on_group_skipped(&self, _name: &str) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }
    fn on_group_failed(&self, _name: &str, _error: &SolverError) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }
    fn on_run_end(&self, _report: &BatchReport) {
        self.ended.fetch_add(1, Ordering::Relaxed);
    }
}

fn asc_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".asc"))
        .collect();
    names.sort();
    names
}

// ── Group planning ────────────────────────────────────────────────────────────

#[cfg(test)]
mod group_tests {
    use super::*;
    use crate::group::{group_constant, group_cutoff, partition, plan_groups};
    use sa_core::{GroupKey, SaError};

    #[test]
    fn partition_orders_by_key() {
        let origins = vec![
            origin(1, 7.0),
            Origin::new(at(2)).with_attr("grp", AttrValue::Text("west".into())),
            origin(3, 2.0),
            origin(4, 7.0),
        ];
        let groups = partition(&origins, Some("grp")).unwrap();
        let keys: Vec<_> = groups.keys().cloned().collect();
        assert_eq!(keys, vec![GroupKey::Int(2), GroupKey::Int(7), GroupKey::Text("west".into())]);
        assert_eq!(groups[&GroupKey::Int(7)].len(), 2);

        let all = partition(&origins, None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[&GroupKey::Implicit].len(), 4);
    }

    #[test]
    fn partition_requires_field() {
        let origins = vec![origin(1, 1.0), Origin::new(at(2))];
        assert!(matches!(partition(&origins, Some("grp")), Err(SaError::MissingField { .. })));
    }

    #[test]
    fn cutoffs_use_group_minimum() {
        let origins = vec![
            origin(1, 1.0).with_attr("minutes", AttrValue::Number(20.0)),
            origin(2, 1.0).with_attr("minutes", AttrValue::Number(12.34)),
        ];
        assert_eq!(group_cutoff(&MaxCost::Field("minutes".into()), &origins).unwrap(), Some(12.3));
        assert_eq!(group_cutoff(&MaxCost::Constant(45.0), &origins).unwrap(), Some(45.0));
        assert_eq!(group_cutoff(&MaxCost::None, &origins).unwrap(), None);
        assert!(group_cutoff(&MaxCost::Field("nope".into()), &origins).is_err());
    }

    #[test]
    fn score_curve_cutoff() {
        let curve = MaxCost::ScoreCurve {
            field:       "score".into(),
            coefficient: 30.0,
            offset:      1.5,
            cap:         60.0,
        };
        // 30 · log10(6) = 23.34…
        let origins = vec![origin(1, 1.0).with_attr("score", AttrValue::Number(4.5))];
        assert_eq!(group_cutoff(&curve, &origins).unwrap(), Some(23.3));
        // 30 · log10(1001.5) ≈ 90 → capped.
        let origins = vec![origin(1, 1.0).with_attr("score", AttrValue::Number(1000.0))];
        assert_eq!(group_cutoff(&curve, &origins).unwrap(), Some(60.0));
    }

    #[test]
    fn constant_uses_group_minimum() {
        let origins = vec![
            origin(1, 1.0).with_attr("value", AttrValue::Number(5.0)),
            origin(2, 1.0).with_attr("value", AttrValue::Number(3.0)),
        ];
        let policy = ValuePolicy::ConstantFromField("value".into());
        assert_eq!(group_constant(&policy, &origins).unwrap(), Some(3.0));
        assert_eq!(group_constant(&ValuePolicy::Actual, &origins).unwrap(), None);
        let bad = vec![origin(1, 1.0).with_attr("value", AttrValue::Text("high".into()))];
        assert!(matches!(group_constant(&policy, &bad), Err(SaError::Parse(_))));
    }

    #[test]
    fn output_names_must_be_unique() {
        let mut c = config(Path::new("unused"));
        c.max_cost = MaxCost::None;
        let origins = vec![
            Origin::new(at(1)).with_attr("grp", AttrValue::Text("a b".into())),
            Origin::new(at(2)).with_attr("grp", AttrValue::Text("a_b".into())),
        ];
        assert!(matches!(plan_groups(&c, &origins), Err(SaError::Config(_))));
    }
}

// ── Builder validation ────────────────────────────────────────────────────────

#[cfg(test)]
mod builder_tests {
    use super::*;
    use crate::BatchError;
    use sa_core::SaError;

    fn build_err(config: RunConfig, inputs: BatchInputs) -> BatchError {
        let store = DirStore::open(&config.output).unwrap();
        match BatchBuilder::new(config, inputs, DijkstraCostDistance, CellSampler, store).build() {
            Ok(_) => panic!("expected a configuration error"),
            Err(e) => e,
        }
    }

    #[test]
    fn constant_policy_without_cutoff_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = config(dir.path());
        c.max_cost = MaxCost::None;
        c.value_policy = ValuePolicy::ConstantValue(7.0);
        assert!(matches!(build_err(c, inputs(two_groups())), BatchError::Config(SaError::Config(_))));
        assert!(asc_files(dir.path()).is_empty());
    }

    #[test]
    fn missing_fields_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = config(dir.path());
        c.group_field = Some("region".into());
        assert!(matches!(
            build_err(c, inputs(two_groups())),
            BatchError::Config(SaError::MissingField { .. })
        ));

        let mut c = config(dir.path());
        c.max_cost = MaxCost::Field("minutes".into());
        assert!(matches!(
            build_err(c, inputs(two_groups())),
            BatchError::Config(SaError::MissingField { .. })
        ));

        let mut c = config(dir.path());
        c.value_policy = ValuePolicy::ConstantFromField("value".into());
        assert!(matches!(
            build_err(c, inputs(two_groups())),
            BatchError::Config(SaError::MissingField { .. })
        ));
    }

    #[test]
    fn misaligned_surfaces_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut i = inputs(two_groups());
        let shifted = GridSpec::new(200, 5, 1.0, 0.0, 1.0);
        i.highway = Arc::new(CostSurface::new(Sheet::Highway, Raster::filled(shifted, 1.0)).unwrap());
        assert!(matches!(build_err(config(dir.path()), i), BatchError::Config(_)));
    }

    #[test]
    fn empty_origins_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(build_err(config(dir.path()), inputs(Vec::new())), BatchError::Config(_)));
    }

    #[test]
    fn groups_resolved_at_build() {
        let dir = tempfile::tempdir().unwrap();
        let r = runner(config(dir.path()), inputs(two_groups()), DijkstraCostDistance);
        let names: Vec<&str> = r.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["grp_1_servArea", "grp_2_servArea"]);
        assert!(r.groups().iter().all(|g| g.cutoff == Some(20.0)));
    }
}

// ── Runs ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod run_tests {
    use super::*;
    use crate::{BatchError, LogObserver};

    #[test_log::test]
    fn computes_every_group() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = CountingOracle::default();
        let r = runner(config(dir.path()), inputs(two_groups()), oracle.clone());
        let obs = CountingObserver::default();
        let report = r.run(&obs).unwrap();

        assert_eq!(report.computed, vec!["grp_1_servArea", "grp_2_servArea"]);
        assert!(report.skipped.is_empty());
        assert!(report.is_success());
        // Group 1: Local, Highway, Local, Highway.  Group 2: one Local pass.
        assert_eq!(report.oracle_calls, 5);
        assert_eq!(oracle.calls.load(Ordering::Relaxed), 5);
        assert_eq!(obs.passes.load(Ordering::Relaxed), 5);
        assert_eq!(obs.started.load(Ordering::Relaxed), 2);
        assert_eq!(obs.done.load(Ordering::Relaxed), 2);
        assert_eq!(obs.ended.load(Ordering::Relaxed), 1);
        assert_eq!(asc_files(dir.path()), vec!["grp_1_servArea.asc", "grp_2_servArea.asc"]);

        // Ramp 1 at 8, highway to ramp 2 at 15.5, then 4 cells east.
        let g1 = r.store().load("grp_1_servArea").unwrap().unwrap();
        assert_eq!(value_at(&g1, at(44)), Some(19.5));
        assert_eq!(value_at(&g1, at(45)), None);
        // The highway pass out of ramp 1 beats local travel here.
        assert_eq!(value_at(&g1, at(12)), Some(8.5));
        assert_eq!(value_at(&g1, at(9)), Some(7.0));
        assert!(g1.max_value().unwrap() <= 20.0);

        // Group 2 is restricted to its window around column 190.
        let g2 = r.store().load("grp_2_servArea").unwrap().unwrap();
        assert!(g2.spec().ncols < 200);
        assert_eq!(value_at(&g2, at(180)), Some(10.0));
    }

    #[test_log::test]
    fn second_run_skips_everything() {
        let dir = tempfile::tempdir().unwrap();
        let first = CountingOracle::default();
        runner(config(dir.path()), inputs(two_groups()), first.clone())
            .run(&LogObserver)
            .unwrap();
        assert!(first.calls.load(Ordering::Relaxed) > 0);

        // Fresh runner and store over the same directory, as after a restart.
        let second = CountingOracle::default();
        let obs = CountingObserver::default();
        let report = runner(config(dir.path()), inputs(two_groups()), second.clone())
            .run(&obs)
            .unwrap();
        assert_eq!(second.calls.load(Ordering::Relaxed), 0);
        assert_eq!(report.oracle_calls, 0);
        assert_eq!(report.skipped, vec!["grp_1_servArea", "grp_2_servArea"]);
        assert!(report.computed.is_empty());
        assert_eq!(obs.skipped.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn changed_configuration_recomputes() {
        let dir = tempfile::tempdir().unwrap();
        runner(config(dir.path()), inputs(two_groups()), DijkstraCostDistance)
            .run(&NoopObserver)
            .unwrap();

        let mut c = config(dir.path());
        c.value_policy = ValuePolicy::Rounded;
        let report = runner(c, inputs(two_groups()), DijkstraCostDistance).run(&NoopObserver).unwrap();
        assert_eq!(report.computed.len(), 2);

        // Moving one origin only invalidates its own group.
        let moved = vec![origin(3, 1.0), origin(190, 2.0)];
        let mut c = config(dir.path());
        c.value_policy = ValuePolicy::Rounded;
        let report = runner(c, inputs(moved), DijkstraCostDistance).run(&NoopObserver).unwrap();
        assert_eq!(report.computed, vec!["grp_1_servArea"]);
        assert_eq!(report.skipped, vec!["grp_2_servArea"]);
    }

    #[test]
    fn fingerprints_are_stable_across_runners() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let ra = runner(config(a.path()), inputs(two_groups()), DijkstraCostDistance);
        let rb = runner(config(b.path()), inputs(two_groups()), DijkstraCostDistance);
        for (ga, gb) in ra.groups().iter().zip(rb.groups()) {
            assert_eq!(ra.fingerprint(ga), rb.fingerprint(gb));
        }
        assert_ne!(ra.fingerprint(&ra.groups()[0]), ra.fingerprint(&ra.groups()[1]));
    }

    #[test]
    fn constant_value_policy() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = config(dir.path());
        c.value_policy = ValuePolicy::ConstantValue(7.0);
        let r = runner(c, inputs(two_groups()), DijkstraCostDistance);
        r.run(&NoopObserver).unwrap();
        let g1 = r.store().load("grp_1_servArea").unwrap().unwrap();
        assert!(g1.values().flatten().all(|v| v == 7.0));
        assert_eq!(value_at(&g1, at(44)), Some(7.0));
        assert_eq!(value_at(&g1, at(45)), None);
    }

    #[test]
    fn constant_from_field_uses_group_minimum() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = config(dir.path());
        c.value_policy = ValuePolicy::ConstantFromField("value".into());
        let origins = vec![
            origin(2, 1.0).with_attr("value", AttrValue::Number(5.0)),
            origin(4, 1.0).with_attr("value", AttrValue::Number(3.0)),
        ];
        let r = runner(c, inputs(origins), DijkstraCostDistance);
        r.run(&NoopObserver).unwrap();
        let g1 = r.store().load("grp_1_servArea").unwrap().unwrap();
        assert!(g1.defined_count() > 0);
        assert!(g1.values().flatten().all(|v| v == 3.0));
    }

    #[test]
    fn implicit_group_when_no_field() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = config(dir.path());
        c.group_field = None;
        c.max_cost = MaxCost::None;
        let r = runner(c, inputs(two_groups()), DijkstraCostDistance);
        let report = r.run(&NoopObserver).unwrap();
        assert_eq!(report.computed, vec!["grp_all_servArea"]);
        let out = r.store().load("grp_all_servArea").unwrap().unwrap();
        assert_eq!(out.spec().cell_count(), grid().cell_count());
        assert_eq!(out.defined_count(), grid().cell_count());
    }

    #[test_log::test]
    fn failed_groups_are_not_committed_and_retry() {
        let dir = tempfile::tempdir().unwrap();
        let obs = CountingObserver::default();
        let report = runner(config(dir.path()), inputs(two_groups()), FailingOracle)
            .run(&obs)
            .unwrap();
        assert_eq!(report.failed.len(), 2);
        assert!(report.computed.is_empty());
        assert!(matches!(report.failed[0].1, BatchError::Group { .. }));
        assert_eq!(obs.failed.load(Ordering::Relaxed), 2);
        assert!(asc_files(dir.path()).is_empty());

        let report = runner(config(dir.path()), inputs(two_groups()), DijkstraCostDistance)
            .run(&NoopObserver)
            .unwrap();
        assert_eq!(report.computed.len(), 2);
    }

    #[test]
    fn group_outside_grid_fails_alone() {
        let dir = tempfile::tempdir().unwrap();
        let mut origins = two_groups();
        origins.push(Origin::new(WorldPoint::new(-500.0, 2.5)).with_attr("grp", AttrValue::Number(3.0)));
        let report = runner(config(dir.path()), inputs(origins), DijkstraCostDistance)
            .run(&NoopObserver)
            .unwrap();
        assert_eq!(report.computed, vec!["grp_1_servArea", "grp_2_servArea"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "grp_3_servArea");
    }

    /// Store whose commits always fail.
    struct BrokenStore;

    impl RasterStore for BrokenStore {
        fn is_complete(&self, _name: &str, _fingerprint: u64) -> StoreResult<bool> {
            Ok(false)
        }
        fn commit(&self, _name: &str, _fingerprint: u64, _raster: &Raster) -> StoreResult<()> {
            Err(StoreError::Io(std::io::Error::other("disk full")))
        }
        fn load(&self, _name: &str) -> StoreResult<Option<Raster>> {
            Ok(None)
        }
    }

    #[test]
    fn store_failure_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let r = BatchBuilder::new(
            config(dir.path()),
            inputs(two_groups()),
            DijkstraCostDistance,
            CellSampler,
            BrokenStore,
        )
        .build()
        .unwrap();
        assert!(matches!(r.run(&NoopObserver), Err(BatchError::Store(_))));
    }

    #[test]
    fn scratch_root_removed_after_run() {
        let dir = tempfile::tempdir().unwrap();
        let r = runner(config(dir.path()), inputs(two_groups()), DijkstraCostDistance);
        r.run(&NoopObserver).unwrap();
        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().starts_with(".scratch"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn window_matches_full_grid_result() {
        let windowed = tempfile::tempdir().unwrap();
        let full = tempfile::tempdir().unwrap();
        let rw = runner(config(windowed.path()), inputs(two_groups()), DijkstraCostDistance);
        rw.run(&NoopObserver).unwrap();

        let mut c = config(full.path());
        c.solver.max_speed = 1.0e6;
        let rf = runner(c, inputs(two_groups()), DijkstraCostDistance);
        rf.run(&NoopObserver).unwrap();

        for name in ["grp_1_servArea", "grp_2_servArea"] {
            let w = rw.store().load(name).unwrap().unwrap();
            let f = rf.store().load(name).unwrap().unwrap();
            assert_eq!(f.spec().cell_count(), grid().cell_count());
            assert_eq!(w.defined_count(), f.defined_count(), "{name}");
            for i in 0..f.len() {
                let p = f.spec().center(f.spec().pos(i));
                match (f.get_index(i), value_at(&w, p)) {
                    (Some(a), Some(b)) => assert!((a - b).abs() < 1e-9, "{name} at {p}"),
                    (None, None) => {}
                    (a, b) => panic!("{name} at {p}: full {a:?} vs windowed {b:?}"),
                }
            }
        }
    }

    #[test]
    fn worker_count_does_not_change_outputs() {
        let origins: Vec<Origin> = (0..6).map(|i| origin(5 + i * 30, i as f64)).collect();
        let one = tempfile::tempdir().unwrap();
        let many = tempfile::tempdir().unwrap();

        let mut c = config(one.path());
        c.num_threads = Some(1);
        let r1 = runner(c, inputs(origins.clone()), DijkstraCostDistance);
        assert_eq!(r1.run(&NoopObserver).unwrap().computed.len(), 6);

        let mut c = config(many.path());
        c.num_threads = Some(4);
        let r4 = runner(c, inputs(origins), DijkstraCostDistance);
        assert_eq!(r4.run(&NoopObserver).unwrap().computed.len(), 6);

        for g in r1.groups() {
            assert_eq!(r1.store().load(&g.name).unwrap(), r4.store().load(&g.name).unwrap());
        }
    }

    #[test]
    fn poisoned_claim_set_is_reported() {
        use std::collections::HashSet;
        use std::sync::Mutex;

        use crate::runner::lock_claims;

        let claims: Mutex<HashSet<String>> = Mutex::new(HashSet::new());
        lock_claims(&claims).unwrap().insert("grp_1_servArea".into());

        std::thread::scope(|s| {
            let worker = s.spawn(|| {
                let _held = claims.lock().unwrap();
                panic!("worker died while claiming");
            });
            assert!(worker.join().is_err());
        });

        let err = lock_claims(&claims).unwrap_err();
        assert!(matches!(err, BatchError::Poisoned("claim set")));
        assert_eq!(err.to_string(), "claim set lock poisoned");
    }
}
