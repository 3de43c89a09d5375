//! Per-pass results and the callback hook fired after each pass.

use sa_core::{Raster, Sheet};
use sa_spatial::Seed;

/// Output of one cost-distance call within a group's solve.
#[derive(Clone, Debug)]
pub struct PassRaster {
    /// 1-based position in the pass sequence.
    pub index:  usize,
    pub sheet:  Sheet,
    pub seeds:  Vec<Seed>,
    pub raster: Raster,
}

/// Callbacks invoked by [`ConvergenceSolver::solve`][crate::ConvergenceSolver::solve].
///
/// All methods have default no-op implementations.
pub trait PassObserver {
    /// Called after each pass has been computed and sampled.
    ///
    /// `improved` is the number of connectors whose arrival cost on the
    /// pass's sheet was lowered by it.
    fn on_pass(&mut self, _pass: &PassRaster, _improved: usize) {}

    /// Called once when the solve finishes.  `truncated` is `true` if the
    /// iteration cap stopped the loop before its fixed point.
    fn on_solved(&mut self, _passes: usize, _truncated: bool) {}
}

/// A [`PassObserver`] that does nothing.
pub struct NoopPassObserver;

impl PassObserver for NoopPassObserver {}
