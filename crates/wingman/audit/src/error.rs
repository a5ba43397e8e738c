//! Error types for wingman-audit

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    /// Database unreachable or query failed
    #[error("Audit database error: {0}")]
    Database(String),

    /// Fallback file could not be written
    #[error("Audit file error: {0}")]
    File(String),

    /// Record could not be serialized
    #[error("Invalid audit record: {0}")]
    InvalidRecord(String),
}

impl AuditError {
    pub(crate) fn database(e: sqlx::Error) -> Self {
        AuditError::Database(e.to_string())
    }

    pub(crate) fn file(e: std::io::Error) -> Self {
        AuditError::File(e.to_string())
    }
}
