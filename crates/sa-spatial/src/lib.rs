//! `sa-spatial` — the raster primitives the service-area solver is built on.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                       |
//! |-------------|----------------------------------------------------------------|
//! | [`env`]     | `AnalysisEnv` — explicit per-group grid + window context       |
//! | [`oracle`]  | `CostDistance` trait, `Seed`, `DijkstraCostDistance`           |
//! | [`sampler`] | `Sampler` trait, `CellSampler`                                 |
//! | [`ops`]     | `cellwise_minimum`                                             |
//! | [`index`]   | `ConnectorIndex` — R-tree over connector points                |
//! | [`error`]   | `SpatialError`, `SpatialResult<T>`                             |
//!
//! # Pluggability
//!
//! The solver only talks to the [`CostDistance`] and [`Sampler`] traits, so a
//! GPU or tiled cost-distance engine can replace the default Dijkstra
//! without touching the convergence loop.

pub mod env;
pub mod error;
pub mod index;
pub mod oracle;
pub mod ops;
pub mod sampler;


pub use env::AnalysisEnv;
pub use error::{SpatialError, SpatialResult};
pub use index::ConnectorIndex;
pub use oracle::{CostDistance, DijkstraCostDistance, Seed};
pub use ops::cellwise_minimum;
pub use sampler::{CellSampler, Sampler};
