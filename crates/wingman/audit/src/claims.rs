//! Worker claim log
//!
//! Claims arrive through the approval API and are appended here as
//! JSON lines. The watcher tails this file; nothing ever rewrites it.

use std::path::Path;

use wingman_types::ClaimRecord;

use crate::error::AuditError;
use crate::jsonl::JsonlSink;

#[derive(Debug, Clone)]
pub struct ClaimLog {
    sink: JsonlSink,
}

impl ClaimLog {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            sink: JsonlSink::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.sink.path()
    }

    pub async fn append(&self, record: &ClaimRecord) -> Result<(), AuditError> {
        self.sink.append(record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wingman_types::ClaimStatus;

    #[tokio::test]
    async fn claims_round_trip_through_the_log() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = ClaimLog::new(dir.path().join("claims.jsonl"));

        let mut record = ClaimRecord::new(
            "worker-9",
            "deployed api version 2.4.1",
            ClaimStatus::Unverifiable,
        );
        record.environment = Some("prd".to_string());
        log.append(&record).await.unwrap();

        let content = tokio::fs::read_to_string(log.path()).await.unwrap();
        let parsed: ClaimRecord = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(parsed.worker_id, "worker-9");
        assert_eq!(parsed.status, ClaimStatus::Unverifiable);
    }
}
