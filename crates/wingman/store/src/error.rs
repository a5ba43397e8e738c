//! Error types for wingman-store

use thiserror::Error;

/// Storage-specific errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query error
    #[error("Query error: {0}")]
    Query(String),
}

impl StoreError {
    pub(crate) fn query(e: sqlx::Error) -> Self {
        StoreError::Query(e.to_string())
    }
}
