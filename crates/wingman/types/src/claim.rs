//! Claim audit records shared by the claim log writer and the watcher

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Verdict attached to a logged worker claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClaimStatus {
    True,
    False,
    Unverifiable,
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClaimStatus::True => "TRUE",
            ClaimStatus::False => "FALSE",
            ClaimStatus::Unverifiable => "UNVERIFIABLE",
        };
        f.write_str(s)
    }
}

/// One line of the claims JSONL stream.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub timestamp: DateTime<Utc>,
    pub worker_id: String,
    pub claim: String,
    pub status: ClaimStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

impl ClaimRecord {
    pub fn new(
        worker_id: impl Into<String>,
        claim: impl Into<String>,
        status: ClaimStatus,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            worker_id: worker_id.into(),
            claim: claim.into(),
            status,
            environment: None,
        }
    }
}
