//! Spatial-subsystem error type.

use thiserror::Error;

use sa_core::{GridSpec, SaError};

/// Errors produced by `sa-spatial`.
#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("raster grid {got:?} does not match analysis grid {expected:?}")]
    GridMismatch { expected: GridSpec, got: GridSpec },

    #[error("search extent does not overlap the cost surface grid")]
    EmptyWindow,

    #[error("cellwise operation needs at least one raster")]
    NoInputs,

    #[error(transparent)]
    Core(#[from] SaError),
}

pub type SpatialResult<T> = Result<T, SpatialError>;
