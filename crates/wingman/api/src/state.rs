//! Shared application state for API handlers

use std::sync::Arc;

use chrono::{DateTime, Utc};
use wingman_audit::ClaimLog;
use wingman_store::ApprovalStore;
use wingman_token::TokenService;
use wingman_types::DeploymentEnv;
use wingman_validation::ValidationPipeline;

use crate::config::RoleKeys;

#[derive(Clone)]
pub struct AppState {
    pub store: ApprovalStore,
    pub pipeline: Arc<ValidationPipeline>,
    pub tokens: Arc<TokenService>,
    pub claims: ClaimLog,
    pub keys: RoleKeys,
    pub deployment_env: DeploymentEnv,
    pub require_approval: bool,
    pub version: String,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        store: ApprovalStore,
        pipeline: Arc<ValidationPipeline>,
        tokens: Arc<TokenService>,
        claims: ClaimLog,
        keys: RoleKeys,
        deployment_env: DeploymentEnv,
        require_approval: bool,
    ) -> Self {
        Self {
            store,
            pipeline,
            tokens,
            claims,
            keys,
            deployment_env,
            require_approval,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Utc::now(),
        }
    }
}
