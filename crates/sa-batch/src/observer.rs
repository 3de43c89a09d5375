//! Batch observer trait for progress reporting.

use std::time::Duration;

use log::{debug, info, warn};

use sa_core::Sheet;
use sa_solver::SolverError;

use crate::BatchReport;

/// Callbacks invoked by [`BatchRunner::run`][crate::BatchRunner::run].
///
/// Groups may run on several worker threads at once, so observers are
/// `Send + Sync` and every method takes `&self`.  All methods have default
/// no-op implementations.
///
/// # Example — count finished groups
///
/// ```rust,ignore
/// struct Counter(AtomicUsize);
///
/// impl BatchObserver for Counter {
///     fn on_group_done(&self, _name: &str, _passes: usize, _elapsed: Duration) {
///         self.0.fetch_add(1, Ordering::Relaxed);
///     }
/// }
/// ```
pub trait BatchObserver: Send + Sync {
    /// Called once before any group is processed.
    fn on_run_start(&self, _groups: usize) {}

    /// Called when a group is found complete in the store.
    fn on_group_skipped(&self, _name: &str) {}

    /// Called when a group's solve begins.
    fn on_group_start(&self, _name: &str, _origins: usize, _cutoff: Option<f64>) {}

    /// Called after every pass of a group's solve.
    fn on_pass(&self, _name: &str, _index: usize, _sheet: Sheet, _seeds: usize, _improved: usize) {}

    /// Called after a group's output has been committed.
    fn on_group_done(&self, _name: &str, _passes: usize, _elapsed: Duration) {}

    /// Called when a group's solve or composition fails.
    fn on_group_failed(&self, _name: &str, _error: &SolverError) {}

    /// Called once after every group has been processed.
    fn on_run_end(&self, _report: &BatchReport) {}
}

/// A [`BatchObserver`] that does nothing.
pub struct NoopObserver;

impl BatchObserver for NoopObserver {}

/// A [`BatchObserver`] that forwards every callback to the `log` facade.
pub struct LogObserver;

impl BatchObserver for LogObserver {
    fn on_run_start(&self, groups: usize) {
        info!("service areas: {groups} groups");
    }

    fn on_group_skipped(&self, name: &str) {
        info!("{name}: already complete, skipping");
    }

    fn on_group_start(&self, name: &str, origins: usize, cutoff: Option<f64>) {
        match cutoff {
            Some(c) => info!("{name}: {origins} origins, cutoff {c}"),
            None => info!("{name}: {origins} origins, unbounded"),
        }
    }

    fn on_pass(&self, name: &str, index: usize, sheet: Sheet, seeds: usize, improved: usize) {
        debug!("{name}: pass {index} ({sheet}) from {seeds} seeds, {improved} connectors improved");
    }

    fn on_group_done(&self, name: &str, passes: usize, elapsed: Duration) {
        info!("{name}: done in {passes} passes, {:.2}s", elapsed.as_secs_f64());
    }

    fn on_group_failed(&self, name: &str, error: &SolverError) {
        warn!("{name}: failed: {error}");
    }

    fn on_run_end(&self, report: &BatchReport) {
        info!(
            "service areas: {} computed, {} skipped, {} failed, {} cost-distance calls",
            report.computed.len(),
            report.skipped.len(),
            report.failed.len(),
            report.oracle_calls
        );
    }
}
