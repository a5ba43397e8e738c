//! Deterministic claim verifier
//!
//! Cheap rule-based verdicts over worker claims. Claims that reference
//! an approval request id are checked against the store; everything
//! without a checkable assertion is UNVERIFIABLE. The enhanced flag
//! adds scanner findings to the details without changing the rules.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::json;
use wingman_store::ApprovalStore;
use wingman_types::ClaimStatus;
use wingman_validation::CodeScanner;

use crate::error::ApiResult;

pub const VERIFIER_NAME: &str = "deterministic";

fn uuid_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
            .unwrap_or_else(|e| panic!("uuid regex: {e}"))
    })
}

#[derive(Debug, Clone)]
pub struct VerifierReport {
    pub verdict: ClaimStatus,
    pub details: serde_json::Value,
}

/// Verify one claim against the approval store.
///
/// Rules, in order: an empty claim is UNVERIFIABLE; a claim naming an
/// approval request id is TRUE when that approval exists and carries a
/// terminal decision, FALSE otherwise; anything else is UNVERIFIABLE.
pub async fn verify_claim(
    store: &ApprovalStore,
    claim: &str,
    use_enhanced: bool,
) -> ApiResult<VerifierReport> {
    let trimmed = claim.trim();

    let mut detail_fields = serde_json::Map::new();
    if use_enhanced {
        detail_fields.insert(
            "contains_secret".to_string(),
            json!(CodeScanner::contains_secret(trimmed)),
        );
        detail_fields.insert(
            "contains_critical".to_string(),
            json!(CodeScanner::contains_critical(trimmed)),
        );
    }

    if trimmed.is_empty() {
        detail_fields.insert("reason".to_string(), json!("empty claim"));
        return Ok(VerifierReport {
            verdict: ClaimStatus::Unverifiable,
            details: serde_json::Value::Object(detail_fields),
        });
    }

    if let Some(candidate) = uuid_regex().find(trimmed) {
        let request_id = candidate.as_str();
        detail_fields.insert("approval_id".to_string(), json!(request_id));
        let verdict = match store.get(request_id).await? {
            Some(request) if request.status.is_terminal() => {
                detail_fields.insert("approval_status".to_string(), json!(request.status));
                ClaimStatus::True
            }
            Some(request) => {
                detail_fields.insert("approval_status".to_string(), json!(request.status));
                detail_fields.insert("reason".to_string(), json!("approval still pending"));
                ClaimStatus::False
            }
            None => {
                detail_fields.insert("reason".to_string(), json!("approval not found"));
                ClaimStatus::False
            }
        };
        return Ok(VerifierReport {
            verdict,
            details: serde_json::Value::Object(detail_fields),
        });
    }

    detail_fields.insert(
        "reason".to_string(),
        json!("no checkable assertion in claim"),
    );
    Ok(VerifierReport {
        verdict: ClaimStatus::Unverifiable,
        details: serde_json::Value::Object(detail_fields),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wingman_types::{ApprovalRequest, ApprovalStatus, DeploymentEnv, RiskLevel};

    async fn store() -> (tempfile::TempDir, ApprovalStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ApprovalStore::open(
            dir.path().join("approvals.db"),
            None,
            Duration::from_secs(3600),
        )
        .await
        .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn empty_claim_is_unverifiable() {
        let (_dir, store) = store().await;
        let report = verify_claim(&store, "   ", false).await.unwrap();
        assert_eq!(report.verdict, ClaimStatus::Unverifiable);
    }

    #[tokio::test]
    async fn prose_claim_is_unverifiable() {
        let (_dir, store) = store().await;
        let report = verify_claim(&store, "deployed api v2 successfully", false)
            .await
            .unwrap();
        assert_eq!(report.verdict, ClaimStatus::Unverifiable);
        assert!(report.details["reason"]
            .as_str()
            .unwrap()
            .contains("no checkable assertion"));
    }

    #[tokio::test]
    async fn claim_naming_a_decided_approval_is_true() {
        let (_dir, store) = store().await;
        let request = ApprovalRequest::new(
            "w1",
            "deploy",
            "deploy api v2",
            DeploymentEnv::Test,
            RiskLevel::Low,
            "low",
            ApprovalStatus::AutoApproved,
        );
        let id = request.request_id.clone();
        store.create(request).await.unwrap();

        let claim = format!("completed work under approval {id}");
        let report = verify_claim(&store, &claim, false).await.unwrap();
        assert_eq!(report.verdict, ClaimStatus::True);
    }

    #[tokio::test]
    async fn claim_naming_an_unknown_approval_is_false() {
        let (_dir, store) = store().await;
        let claim = "done per approval 2c3b34e5-15a1-4f2e-9c5a-000000000000";
        let report = verify_claim(&store, claim, false).await.unwrap();
        assert_eq!(report.verdict, ClaimStatus::False);
    }

    #[tokio::test]
    async fn claim_naming_a_pending_approval_is_false() {
        let (_dir, store) = store().await;
        let request = ApprovalRequest::new(
            "w1",
            "deploy",
            "apply migration",
            DeploymentEnv::Test,
            RiskLevel::Medium,
            "schema change",
            ApprovalStatus::Pending,
        );
        let id = request.request_id.clone();
        store.create(request).await.unwrap();

        let report = verify_claim(&store, &id, false).await.unwrap();
        assert_eq!(report.verdict, ClaimStatus::False);
        assert!(report.details["reason"]
            .as_str()
            .unwrap()
            .contains("pending"));
    }

    #[tokio::test]
    async fn enhanced_mode_flags_secret_material() {
        let (_dir, store) = store().await;
        let report = verify_claim(&store, "exported api_key=abcdef123456 to prod", true)
            .await
            .unwrap();
        assert_eq!(report.details["contains_secret"], json!(true));
    }
}
