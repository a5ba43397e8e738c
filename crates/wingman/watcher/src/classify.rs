//! Severity classification for claim events
//!
//! A TRUE claim is not an event. FALSE claims escalate with the
//! environment, and a FALSE claim in prd that names a destructive
//! operation is CRITICAL.

use wingman_types::{ClaimEventType, ClaimRecord, ClaimStatus, DeploymentEnv, RiskLevel};
use wingman_validation::CodeScanner;

/// Classifies one claim record into an alertable event, or `None` when
/// the record needs no attention.
pub fn classify(record: &ClaimRecord) -> Option<(ClaimEventType, RiskLevel)> {
    match record.status {
        ClaimStatus::True => None,
        ClaimStatus::Unverifiable => Some((ClaimEventType::Unverifiable, RiskLevel::Low)),
        ClaimStatus::False => {
            let env = record
                .environment
                .as_deref()
                .and_then(|e| e.parse::<DeploymentEnv>().ok());
            let severity = match env {
                Some(DeploymentEnv::Prd) => {
                    if CodeScanner::contains_critical(&record.claim) {
                        RiskLevel::Critical
                    } else {
                        RiskLevel::High
                    }
                }
                // test, dev, and unattributed environments all rank a
                // false claim as worth a look, not a page.
                _ => RiskLevel::Medium,
            };
            Some((ClaimEventType::FalseClaim, severity))
        }
    }
}
