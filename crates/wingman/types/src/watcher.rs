//! Watcher incidents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::risk::RiskLevel;

/// Kind of failure signal the watcher detected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimEventType {
    FalseClaim,
    Unverifiable,
    ApprovalPendingNew,
}

impl ClaimEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimEventType::FalseClaim => "FALSE_CLAIM",
            ClaimEventType::Unverifiable => "UNVERIFIABLE",
            ClaimEventType::ApprovalPendingNew => "APPROVAL_PENDING_NEW",
        }
    }
}

impl fmt::Display for ClaimEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One alert derived from the claim-audit stream or the approval queue.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WatcherIncident {
    pub severity: RiskLevel,
    pub event_type: ClaimEventType,
    pub worker_id: String,
    pub claim: String,
    pub environment: String,
    pub sent_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub fingerprint: String,
}

impl WatcherIncident {
    /// Dedup fingerprint: one incident per `(event_type, worker_id,
    /// time-bucket)` where the bucket width is the dedup window.
    pub fn dedup_fingerprint(
        event_type: ClaimEventType,
        worker_id: &str,
        at: DateTime<Utc>,
        window_secs: i64,
    ) -> String {
        let bucket = if window_secs > 0 {
            at.timestamp() / window_secs
        } else {
            at.timestamp()
        };
        format!("{}:{}:{}", event_type, worker_id, bucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn same_bucket_yields_same_fingerprint() {
        let t0 = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let a = WatcherIncident::dedup_fingerprint(ClaimEventType::FalseClaim, "w1", t0, 600);
        let b = WatcherIncident::dedup_fingerprint(
            ClaimEventType::FalseClaim,
            "w1",
            t0 + Duration::seconds(30),
            600,
        );
        assert_eq!(a, b);
    }

    #[test]
    fn bucket_boundary_splits_fingerprints() {
        let t0 = DateTime::from_timestamp(1_700_000_400, 0).unwrap();
        let a = WatcherIncident::dedup_fingerprint(ClaimEventType::FalseClaim, "w1", t0, 600);
        let b = WatcherIncident::dedup_fingerprint(
            ClaimEventType::FalseClaim,
            "w1",
            t0 + Duration::seconds(600),
            600,
        );
        assert_ne!(a, b);
    }

    #[test]
    fn event_type_and_worker_separate_fingerprints() {
        let t0 = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let a = WatcherIncident::dedup_fingerprint(ClaimEventType::FalseClaim, "w1", t0, 600);
        let b = WatcherIncident::dedup_fingerprint(ClaimEventType::Unverifiable, "w1", t0, 600);
        let c = WatcherIncident::dedup_fingerprint(ClaimEventType::FalseClaim, "w2", t0, 600);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
