//! Approval requests, their lifecycle, and the dedup fingerprint

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::risk::{DeploymentEnv, ParseEnumError, RiskLevel};

/// Lifecycle state of an [`ApprovalRequest`].
///
/// A request leaves `Pending` exactly once; every other state is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    AutoApproved,
    AutoRejected,
    Expired,
}

impl ApprovalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }

    /// Whether a capability token may be minted against this state.
    pub fn allows_execution(&self) -> bool {
        matches!(self, ApprovalStatus::Approved | ApprovalStatus::AutoApproved)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "PENDING",
            ApprovalStatus::Approved => "APPROVED",
            ApprovalStatus::Rejected => "REJECTED",
            ApprovalStatus::AutoApproved => "AUTO_APPROVED",
            ApprovalStatus::AutoRejected => "AUTO_REJECTED",
            ApprovalStatus::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ApprovalStatus::Pending),
            "APPROVED" => Ok(ApprovalStatus::Approved),
            "REJECTED" => Ok(ApprovalStatus::Rejected),
            "AUTO_APPROVED" => Ok(ApprovalStatus::AutoApproved),
            "AUTO_REJECTED" => Ok(ApprovalStatus::AutoRejected),
            "EXPIRED" => Ok(ApprovalStatus::Expired),
            other => Err(ParseEnumError {
                kind: "approval status",
                value: other.to_string(),
            }),
        }
    }
}

/// SHA-256 fingerprint over the dedup tuple.
///
/// Fields are joined with a `\x1f` separator so adjacent fields cannot
/// collide by concatenation.
pub fn request_fingerprint(
    worker_id: &str,
    task_name: &str,
    risk_level: RiskLevel,
    instruction: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(worker_id.as_bytes());
    hasher.update([0x1f]);
    hasher.update(task_name.as_bytes());
    hasher.update([0x1f]);
    hasher.update(risk_level.as_str().as_bytes());
    hasher.update([0x1f]);
    hasher.update(instruction.as_bytes());
    hex::encode(hasher.finalize())
}

/// The canonical unit of governance: one proposed operation awaiting or
/// carrying a decision.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub request_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    pub status: ApprovalStatus,
    pub worker_id: String,
    pub task_name: String,
    pub instruction: String,
    pub deployment_env: DeploymentEnv,
    pub risk_level: RiskLevel,
    pub risk_reason: String,
    pub fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_results: Option<serde_json::Value>,
}

impl ApprovalRequest {
    /// Build a fresh request in the given initial state.
    ///
    /// `AUTO_*` births get their `decided_at` stamped immediately; human
    /// decisions arrive later through the store's decide path.
    pub fn new(
        worker_id: impl Into<String>,
        task_name: impl Into<String>,
        instruction: impl Into<String>,
        deployment_env: DeploymentEnv,
        risk_level: RiskLevel,
        risk_reason: impl Into<String>,
        status: ApprovalStatus,
    ) -> Self {
        let worker_id = worker_id.into();
        let task_name = task_name.into();
        let instruction = instruction.into();
        let now = Utc::now();
        let fingerprint = request_fingerprint(&worker_id, &task_name, risk_level, &instruction);
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            created_at: now,
            decided_at: status.is_terminal().then_some(now),
            status,
            worker_id,
            task_name,
            instruction,
            deployment_env,
            risk_level,
            risk_reason: risk_reason.into(),
            fingerprint,
            decided_by: None,
            decision_note: None,
            validation_results: None,
        }
    }
}

/// One quarantined worker. While present in the quarantine set, the
/// approval API auto-rejects the worker's requests.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuarantineEntry {
    pub worker_id: String,
    pub reason: String,
    pub environment: DeploymentEnv,
    pub quarantined_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_field_sensitive() {
        let a = request_fingerprint("w1", "deploy", RiskLevel::High, "restart api");
        let b = request_fingerprint("w1", "deploy", RiskLevel::High, "restart api");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let other_worker = request_fingerprint("w2", "deploy", RiskLevel::High, "restart api");
        let other_risk = request_fingerprint("w1", "deploy", RiskLevel::Medium, "restart api");
        assert_ne!(a, other_worker);
        assert_ne!(a, other_risk);
    }

    #[test]
    fn fingerprint_fields_do_not_bleed_into_neighbors() {
        let a = request_fingerprint("wx", "ytask", RiskLevel::Low, "i");
        let b = request_fingerprint("w", "xytask", RiskLevel::Low, "i");
        assert_ne!(a, b);
    }

    #[test]
    fn auto_births_are_decided_immediately() {
        let auto = ApprovalRequest::new(
            "w1",
            "logs",
            "Show docker logs",
            DeploymentEnv::Dev,
            RiskLevel::Low,
            "low risk",
            ApprovalStatus::AutoApproved,
        );
        assert!(auto.decided_at.is_some());
        assert!(auto.status.allows_execution());

        let pending = ApprovalRequest::new(
            "w1",
            "deploy",
            "Apply migration",
            DeploymentEnv::Test,
            RiskLevel::Medium,
            "schema change",
            ApprovalStatus::Pending,
        );
        assert!(pending.decided_at.is_none());
        assert!(!pending.status.is_terminal());
    }

    #[test]
    fn status_wire_spelling_round_trips() {
        for status in [
            ApprovalStatus::Pending,
            ApprovalStatus::Approved,
            ApprovalStatus::Rejected,
            ApprovalStatus::AutoApproved,
            ApprovalStatus::AutoRejected,
            ApprovalStatus::Expired,
        ] {
            assert_eq!(status.as_str().parse::<ApprovalStatus>().unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }
}
