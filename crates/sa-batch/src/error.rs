use sa_core::SaError;
use sa_solver::SolverError;
use sa_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("batch configuration error: {0}")]
    Config(#[from] SaError),

    #[error("output store error: {0}")]
    Store(#[from] StoreError),

    #[error("group {name} failed: {source}")]
    Group {
        name:   String,
        #[source]
        source: SolverError,
    },

    #[error("could not start worker pool: {0}")]
    ThreadPool(String),

    /// A worker panicked while holding the named lock.
    #[error("{0} lock poisoned")]
    Poisoned(&'static str),
}

pub type BatchResult<T> = Result<T, BatchError>;
