//! Execution audit writer with database-first, file-fallback semantics
//!
//! Exactly one record per consumed token. The fallback path is logged
//! as a warning but never surfaces an error to the execution flow
//! unless both sinks fail.

use wingman_types::ExecutionAuditEntry;

use crate::error::AuditError;
use crate::jsonl::JsonlSink;
use crate::pg::PgAuditStore;

pub struct AuditWriter {
    database: Option<PgAuditStore>,
    fallback: JsonlSink,
}

impl AuditWriter {
    pub fn new(database: Option<PgAuditStore>, fallback: JsonlSink) -> Self {
        if database.is_none() {
            tracing::warn!(
                path = %fallback.path().display(),
                "audit database not configured, using file sink only"
            );
        }
        Self { database, fallback }
    }

    /// Connects to the database if a URL is given; a failed connection
    /// degrades to file-only mode rather than refusing to start.
    pub async fn connect(database_url: Option<&str>, fallback: JsonlSink) -> Self {
        let database = match database_url {
            Some(url) => match PgAuditStore::connect(url).await {
                Ok(store) => Some(store),
                Err(e) => {
                    tracing::warn!(error = %e, "audit database unavailable, falling back to file sink");
                    None
                }
            },
            None => None,
        };
        Self::new(database, fallback)
    }

    pub fn has_database(&self) -> bool {
        self.database.is_some()
    }

    /// Appends one record, preferring the database.
    pub async fn append(&self, entry: &ExecutionAuditEntry) -> Result<(), AuditError> {
        if let Some(database) = &self.database {
            match database.append(entry).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        execution_id = %entry.execution_id,
                        "audit database write failed, using file fallback"
                    );
                }
            }
        }
        self.fallback.append(entry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wingman_types::DeploymentEnv;

    #[tokio::test]
    async fn file_only_mode_appends_to_fallback() {
        let dir = TempDir::new().unwrap();
        let sink = JsonlSink::new(dir.path().join("audit.jsonl"));
        let writer = AuditWriter::new(None, sink.clone());
        assert!(!writer.has_database());

        let mut entry = ExecutionAuditEntry::new(
            "appr-1",
            "worker-1",
            "docker compose ps",
            DeploymentEnv::Test,
            "hash",
        );
        entry.exit_code = 0;
        entry.duration_ms = 42;
        writer.append(&entry).await.unwrap();

        let content = tokio::fs::read_to_string(sink.path()).await.unwrap();
        let record: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(record["approval_id"], "appr-1");
        assert_eq!(record["exit_code"], 0);
        assert_eq!(record["token_hash"], "hash");
    }

    #[tokio::test]
    async fn unreachable_database_degrades_to_file_only() {
        let dir = TempDir::new().unwrap();
        let sink = JsonlSink::new(dir.path().join("audit.jsonl"));
        let writer = AuditWriter::connect(
            Some("postgres://127.0.0.1:1/wingman?connect_timeout=1"),
            sink,
        )
        .await;
        assert!(!writer.has_database());
    }
}
