//! `sa-batch` — runs the service-area solver over every origin group.
//!
//! # Per-group pipeline
//!
//! ```text
//! build():  validate config → check surfaces → partition origins →
//!           resolve cutoff / constant per group → index connectors
//!
//! run(), for each group (Rayon pool with the `parallel` feature):
//!   ① Skip     — store already holds the output under this fingerprint.
//!   ② Window   — origins' bounding box buffered by cutoff × max_speed,
//!                snapped to whole cells; whole grid when unbounded.
//!   ③ Solve    — ConvergenceSolver over the window's connectors.
//!   ④ Compose  — cellwise minimum + value policy.
//!   ⑤ Commit   — store writes the raster, then records the fingerprint.
//! ```
//!
//! A solver failure fails only its group.  A store failure stops the run.
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                   |
//! |------------|----------------------------------------------------------|
//! | `parallel` | Runs groups on a Rayon pool of `num_threads` workers.    |
//! | `sqlite`   | Enables `sa_store::SqliteStore`.                         |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use sa_batch::{BatchBuilder, BatchInputs, LogObserver};
//! use sa_spatial::{CellSampler, DijkstraCostDistance};
//! use sa_store::DirStore;
//!
//! let inputs = BatchInputs::load(&config)?;
//! let store = DirStore::open(&config.output)?;
//! let runner = BatchBuilder::new(config, inputs, DijkstraCostDistance, CellSampler, store)
//!     .build()?;
//! let report = runner.run(&LogObserver)?;
//! ```

pub mod error;
pub mod group;
pub mod inputs;
pub mod observer;
pub mod runner;

#[cfg(test)]
mod tests;

pub use error::{BatchError, BatchResult};
pub use group::OriginGroup;
pub use inputs::BatchInputs;
pub use observer::{BatchObserver, LogObserver, NoopObserver};
pub use runner::{BatchBuilder, BatchReport, BatchRunner};
