//! Error types for brewlab-le
//!
//! Input absence and catalog misses are not errors (they surface as `None`
//! fields); only rejected input, rejected imports and storage failures are.

use thiserror::Error;

/// Result type for learning engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the learning engine
#[derive(Error, Debug)]
pub enum Error {
    /// Storage, configuration or I/O failure from the common layer
    #[error(transparent)]
    Common(#[from] brewlab_common::Error),

    /// Malformed or incomplete user input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Import payload failed validation; existing state was not touched
    #[error("Import rejected: {0}")]
    ImportRejected(String),

    /// Tunable parameter outside its valid range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// JSON encoding failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
