use sa_spatial::SpatialError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("cost-distance or sampling failed: {0}")]
    Oracle(#[from] SpatialError),

    #[error("cannot compose service area: {0}")]
    Compose(String),
}

pub type SolverResult<T> = Result<T, SolverError>;
