//! `sa-core` — foundational types for the `servarea` service-area framework.
//!
//! This crate is a dependency of every other `sa-*` crate.  It intentionally
//! has no `sa-*` dependencies and minimal external ones (only `thiserror`,
//! plus optional `serde`).
//!
//! # What lives here
//!
//! | Module        | Contents                                                |
//! |---------------|---------------------------------------------------------|
//! | [`ids`]       | `ConnectorId`, `CellId`, `GroupKey`                     |
//! | [`geo`]       | `WorldPoint`, `Envelope`                                |
//! | [`grid`]      | `GridSpec`, `CellPos`, `GridWindow`                     |
//! | [`raster`]    | `Raster`, `Sheet`, `CostSurface`                        |
//! | [`features`]  | `AttrValue`, `Origin`, `Connector`, `ConnectorSet`      |
//! | [`config`]    | `RunConfig`, `MaxCost`, `ValuePolicy`, `SolverParams`   |
//! | [`error`]     | `SaError`, `SaResult`                                   |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                        |
//! |---------|---------------------------------------------------------------|
//! | `serde` | `Serialize`/`Deserialize` on ids, points and config (JSON runs) |

pub mod config;
pub mod error;
pub mod features;
pub mod geo;
pub mod grid;
pub mod ids;
pub mod raster;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{MaxCost, RunConfig, SolverParams, ValuePolicy};
pub use error::{SaError, SaResult};
pub use features::{AttrValue, Connector, ConnectorSet, Origin};
pub use geo::{Envelope, WorldPoint};
pub use grid::{CellPos, GridSpec, GridWindow};
pub use ids::{CellId, ConnectorId, GroupKey};
pub use raster::{CostSurface, Raster, Sheet};
