//! Shared gateway state

use std::sync::Arc;

use chrono::{DateTime, Utc};
use wingman_audit::AuditWriter;
use wingman_token::{ReplayGuard, TokenService};
use wingman_types::DeploymentEnv;

use crate::executor::CommandExecutor;

/// State shared by all gateway handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub tokens: Arc<TokenService>,
    pub replay: Arc<ReplayGuard>,
    pub audit: Arc<AuditWriter>,
    pub executor: Arc<CommandExecutor>,
    pub allowed_environments: Arc<Vec<DeploymentEnv>>,
    pub version: String,
    pub started_at: DateTime<Utc>,
}

impl GatewayState {
    pub fn new(
        tokens: Arc<TokenService>,
        audit: Arc<AuditWriter>,
        executor: Arc<CommandExecutor>,
        allowed_environments: Vec<DeploymentEnv>,
    ) -> Self {
        Self {
            tokens,
            replay: Arc::new(ReplayGuard::new()),
            audit,
            executor,
            allowed_environments: Arc::new(allowed_environments),
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Utc::now(),
        }
    }

    pub fn environment_allowed(&self, env: DeploymentEnv) -> bool {
        self.allowed_environments.contains(&env)
    }
}
