//! Configuration for the approval API
//!
//! All knobs come from environment variables (or CLI flags) gathered
//! into one struct at startup. Key material stays inside this struct
//! and is never logged.

use std::path::PathBuf;

use wingman_types::DeploymentEnv;

/// Role-scoped authorization keys. `None` means the corresponding
/// endpoints are unauthenticated, which is acceptable in dev only.
#[derive(Debug, Clone, Default)]
pub struct RoleKeys {
    pub request: Option<String>,
    pub read: Option<String>,
    pub decide: Option<String>,
    /// Legacy single key accepted for any role.
    pub legacy: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub listen_addr: String,
    pub deployment_env: DeploymentEnv,
    /// `false` disables the approval gate entirely (dev only).
    pub require_approval: bool,
    pub approval_db: PathBuf,
    pub approval_db_fallback: Option<PathBuf>,
    pub pending_ttl_secs: u64,
    pub keys: RoleKeys,
    pub token_secret: Vec<u8>,
    pub token_ttl_secs: i64,
    pub claims_log: PathBuf,
    pub llm_endpoint: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
}

impl ApiConfig {
    /// PRD deployments must not run with open endpoints or a default
    /// signing secret.
    pub fn validate(&self) -> Result<(), String> {
        if self.deployment_env.is_production() {
            if self.keys.request.is_none() && self.keys.legacy.is_none() {
                return Err("prd requires a request key".to_string());
            }
            if self.keys.read.is_none() && self.keys.legacy.is_none() {
                return Err("prd requires a read key".to_string());
            }
            if self.keys.decide.is_none() && self.keys.legacy.is_none() {
                return Err("prd requires a decide key".to_string());
            }
            if !self.require_approval {
                return Err("approval gate cannot be disabled in prd".to_string());
            }
        }
        if self.token_secret.is_empty() {
            return Err("token signing secret must be set".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config(env: DeploymentEnv) -> ApiConfig {
        ApiConfig {
            listen_addr: "127.0.0.1:8080".to_string(),
            deployment_env: env,
            require_approval: true,
            approval_db: PathBuf::from("approvals.db"),
            approval_db_fallback: None,
            pending_ttl_secs: 3600,
            keys: RoleKeys::default(),
            token_secret: b"secret".to_vec(),
            token_ttl_secs: 600,
            claims_log: PathBuf::from("claims.jsonl"),
            llm_endpoint: None,
            llm_api_key: None,
            llm_model: "gpt-4o-mini".to_string(),
        }
    }

    #[test]
    fn dev_allows_open_endpoints() {
        assert!(base_config(DeploymentEnv::Dev).validate().is_ok());
    }

    #[test]
    fn prd_requires_all_keys() {
        let mut config = base_config(DeploymentEnv::Prd);
        assert!(config.validate().is_err());
        config.keys.legacy = Some("k".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn prd_cannot_disable_the_gate() {
        let mut config = base_config(DeploymentEnv::Prd);
        config.keys.legacy = Some("k".to_string());
        config.require_approval = false;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_secret_is_rejected() {
        let mut config = base_config(DeploymentEnv::Dev);
        config.token_secret.clear();
        assert!(config.validate().is_err());
    }
}
