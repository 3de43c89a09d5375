//! Framework error type.
//!
//! Sub-crates define their own error enums and wrap `SaError` as one
//! variant via `#[from]`, so configuration problems detected in `sa-core`
//! surface unchanged at the batch level.

use thiserror::Error;

/// The top-level error type for `sa-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum SaError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("attribute field {field:?} missing on {what}")]
    MissingField { field: String, what: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for all `sa-*` crates.
pub type SaResult<T> = Result<T, SaError>;
