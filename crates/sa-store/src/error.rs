//! Error types for sa-store.

use sa_core::SaError;
use thiserror::Error;

/// Errors raised while loading inputs or persisting outputs.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed {what}: {detail}")]
    Format { what: &'static str, detail: String },

    #[error(transparent)]
    Core(#[from] SaError),

    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    pub(crate) fn format(what: &'static str, detail: impl Into<String>) -> Self {
        StoreError::Format { what, detail: detail.into() }
    }
}

/// Alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;
