//! Configuration for the execution gateway
//!
//! All knobs come from environment variables (or CLI flags) gathered
//! into one struct at startup. The signing secret stays inside this
//! struct and is never logged.

use std::path::PathBuf;

use wingman_types::DeploymentEnv;

/// Where execution audit records land first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStorage {
    Postgres,
    Jsonl,
}

impl std::str::FromStr for AuditStorage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(AuditStorage::Postgres),
            "jsonl" => Ok(AuditStorage::Jsonl),
            other => Err(format!("unknown audit storage backend: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub listen_addr: String,
    /// Environments this gateway instance will execute for. A token
    /// minted for any other environment is refused.
    pub allowed_environments: Vec<DeploymentEnv>,
    pub token_secret: Vec<u8>,
    pub audit_storage: AuditStorage,
    pub database_url: Option<String>,
    pub audit_log: PathBuf,
    pub exec_timeout_secs: u64,
    pub exec_workdir: Option<PathBuf>,
    pub max_output_bytes: usize,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.token_secret.is_empty() {
            return Err("token signing secret must be set".to_string());
        }
        if self.allowed_environments.is_empty() {
            return Err("at least one allowed environment is required".to_string());
        }
        if self.audit_storage == AuditStorage::Postgres && self.database_url.is_none() {
            return Err("postgres audit storage requires a database URL".to_string());
        }
        if self.exec_timeout_secs == 0 {
            return Err("execution timeout must be positive".to_string());
        }
        Ok(())
    }
}

/// Parses a comma-separated environment list, e.g. "dev,test".
pub fn parse_environments(raw: &str) -> Result<Vec<DeploymentEnv>, String> {
    let mut envs = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let env: DeploymentEnv = part
            .parse()
            .map_err(|e| format!("invalid environment {part:?}: {e}"))?;
        if !envs.contains(&env) {
            envs.push(env);
        }
    }
    Ok(envs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> GatewayConfig {
        GatewayConfig {
            listen_addr: "127.0.0.1:8081".to_string(),
            allowed_environments: vec![DeploymentEnv::Dev],
            token_secret: b"secret".to_vec(),
            audit_storage: AuditStorage::Jsonl,
            database_url: None,
            audit_log: PathBuf::from("wingman_executions.jsonl"),
            exec_timeout_secs: 300,
            exec_workdir: None,
            max_output_bytes: 64 * 1024,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn empty_secret_is_rejected() {
        let mut config = base_config();
        config.token_secret.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn postgres_needs_a_database_url() {
        let mut config = base_config();
        config.audit_storage = AuditStorage::Postgres;
        assert!(config.validate().is_err());
        config.database_url = Some("postgres://localhost/wingman".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn environment_list_parses_and_dedupes() {
        let envs = parse_environments("dev, test,dev").unwrap();
        assert_eq!(envs, vec![DeploymentEnv::Dev, DeploymentEnv::Test]);
        assert!(parse_environments("dev,staging").is_err());
    }

    #[test]
    fn empty_environment_list_is_rejected() {
        let mut config = base_config();
        config.allowed_environments.clear();
        assert!(config.validate().is_err());
    }
}
