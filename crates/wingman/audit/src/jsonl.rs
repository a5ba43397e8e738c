//! JSON-Lines file sink
//!
//! One serialized record per line, appended with a single write so
//! concurrent appenders from one process cannot interleave partial
//! lines.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::error::AuditError;

#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append<T: Serialize>(&self, record: &T) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(record)
            .map_err(|e| AuditError::InvalidRecord(e.to_string()))?;
        line.push('\n');

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(AuditError::file)?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(AuditError::file)?;
        file.write_all(line.as_bytes()).await.map_err(AuditError::file)?;
        file.flush().await.map_err(AuditError::file)?;
        Ok(())
    }
}
