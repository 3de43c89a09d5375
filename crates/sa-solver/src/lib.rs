//! `sa-solver` — dual-surface service-area computation for one origin group.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                  |
//! |-------------|-----------------------------------------------------------|
//! | [`tracker`] | `ArrivalRecord`, `RampTracker`                            |
//! | [`pass`]    | `PassRaster`, `PassObserver`, `NoopPassObserver`          |
//! | [`solver`]  | `ConvergenceSolver`, `Solve`                              |
//! | [`compose`] | `compose` — merge passes and apply the value policy       |
//! | [`error`]   | `SolverError`, `SolverResult<T>`                          |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use sa_solver::{compose, ConvergenceSolver, NoopPassObserver};
//! use sa_spatial::{AnalysisEnv, CellSampler, DijkstraCostDistance};
//!
//! let solver = ConvergenceSolver::new(DijkstraCostDistance, CellSampler, params);
//! let env = AnalysisEnv::around(*local.spec(), &origins, Some(cutoff * params.max_speed))?;
//! let solve = solver.solve(&env, &origins, Some(cutoff), &local, &highway, &ramps, &mut NoopPassObserver)?;
//! let out = compose(&solve.passes, Some(cutoff), &ValuePolicy::Actual, None)?;
//! ```
//!
//! # Approximation
//!
//! The loop finds a fixed point of alternating single-sheet searches.  It is
//! not a certified shortest-path search over the merged two-sheet graph.

pub mod compose;
pub mod error;
pub mod pass;
pub mod solver;
pub mod tracker;


pub use compose::compose;
pub use error::{SolverError, SolverResult};
pub use pass::{NoopPassObserver, PassObserver, PassRaster};
pub use solver::{ConvergenceSolver, Solve};
pub use tracker::{ArrivalRecord, RampTracker};
