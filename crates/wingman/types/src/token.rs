//! Capability token claims
//!
//! The signed envelope lives in `wingman-token`; this is the claims
//! payload both the minting and verifying sides agree on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::risk::DeploymentEnv;

/// Claims carried inside a capability token.
///
/// `iat`/`exp` are Unix timestamps so the signed payload has a single
/// canonical numeric form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub jti: String,
    pub approval_id: String,
    pub worker_id: String,
    pub environment: DeploymentEnv,
    /// Exact or prefix-matched command strings. Empty means
    /// "no restriction", which is never permitted in prd.
    pub allowed_commands: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

impl TokenClaims {
    pub fn new(
        approval_id: impl Into<String>,
        worker_id: impl Into<String>,
        environment: DeploymentEnv,
        allowed_commands: Vec<String>,
        ttl_secs: i64,
    ) -> Self {
        let now = Utc::now().timestamp();
        Self {
            jti: uuid::Uuid::new_v4().to_string(),
            approval_id: approval_id.into(),
            worker_id: worker_id.into(),
            environment,
            allowed_commands,
            iat: now,
            exp: now + ttl_secs,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}
