//! Execution audit entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::risk::DeploymentEnv;

/// One executed (or attempted) command. Append-only once written.
///
/// `token_hash` is the SHA-256 of the presented token; the token itself
/// never reaches storage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionAuditEntry {
    pub execution_id: String,
    pub approval_id: String,
    pub worker_id: String,
    pub command: String,
    pub environment: DeploymentEnv,
    pub exit_code: i32,
    pub output: String,
    pub duration_ms: i64,
    pub token_hash: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub artifacts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ExecutionAuditEntry {
    pub fn new(
        approval_id: impl Into<String>,
        worker_id: impl Into<String>,
        command: impl Into<String>,
        environment: DeploymentEnv,
        token_hash: impl Into<String>,
    ) -> Self {
        Self {
            execution_id: uuid::Uuid::new_v4().to_string(),
            approval_id: approval_id.into(),
            worker_id: worker_id.into(),
            command: command.into(),
            environment,
            exit_code: -1,
            output: String::new(),
            duration_ms: 0,
            token_hash: token_hash.into(),
            artifacts: Vec::new(),
            error: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_entry_omits_empty_optionals() {
        let entry = ExecutionAuditEntry::new(
            "ap-1",
            "w1",
            "docker compose ps",
            DeploymentEnv::Test,
            "deadbeef",
        );
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("artifacts"));
        assert!(!json.contains("\"error\""));
        let back: ExecutionAuditEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.execution_id, entry.execution_id);
        assert!(back.artifacts.is_empty());
    }
}
