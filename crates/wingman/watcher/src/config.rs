//! Configuration for the watcher
//!
//! All knobs come from environment variables (or CLI flags) gathered
//! into one struct at startup. Notifier credentials stay inside this
//! struct and are never logged.

use std::path::PathBuf;
use std::str::FromStr;

/// A notification sink named in `WINGMAN_NOTIFY_BACKENDS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyBackend {
    Stdout,
    Telegram,
    Webhook,
}

impl FromStr for NotifyBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdout" => Ok(NotifyBackend::Stdout),
            "telegram" => Ok(NotifyBackend::Telegram),
            "webhook" => Ok(NotifyBackend::Webhook),
            other => Err(format!("unknown notify backend: {other}")),
        }
    }
}

/// Parses a comma-separated backend list, e.g. "stdout,telegram".
pub fn parse_backends(raw: &str) -> Result<Vec<NotifyBackend>, String> {
    let mut backends = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let backend: NotifyBackend = part.parse()?;
        if !backends.contains(&backend) {
            backends.push(backend);
        }
    }
    Ok(backends)
}

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Claims JSONL stream written by the approval API.
    pub claims_log: PathBuf,
    /// Cursor state file (offset + recent fingerprints).
    pub state_file: PathBuf,
    /// Claims tailer interval; 0 disables the tailer loop.
    pub interval_secs: u64,
    /// Dedup window and fingerprint bucket width.
    pub dedup_window_secs: i64,
    /// Approval poller interval; 0 disables the poller loop.
    pub approval_poll_secs: u64,
    /// Base URL of the approval API for pending polling.
    pub api_url: String,
    /// Read key presented to the approval API.
    pub read_key: Option<String>,
    pub approval_db: PathBuf,
    pub approval_db_fallback: Option<PathBuf>,
    pub backends: Vec<NotifyBackend>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub webhook_url: Option<String>,
    /// Quarantine the worker on CRITICAL incidents.
    pub quarantine_on_critical: bool,
    /// Argv-only remediation command template; placeholders
    /// {worker_id}, {verdict}, {severity}.
    pub remediation_template: Option<Vec<String>>,
}

impl WatcherConfig {
    /// Whether any stream loop is enabled at all.
    pub fn has_work(&self) -> bool {
        self.interval_secs > 0 || self.approval_poll_secs > 0
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.dedup_window_secs <= 0 {
            return Err("dedup window must be positive".to_string());
        }
        if let Some(template) = &self.remediation_template {
            match template.first() {
                None => return Err("remediation template is empty".to_string()),
                Some(program) if program.contains('{') => {
                    return Err("remediation program must not be a placeholder".to_string());
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> WatcherConfig {
        WatcherConfig {
            claims_log: PathBuf::from("wingman_claims.jsonl"),
            state_file: PathBuf::from("wingman_watcher_state.json"),
            interval_secs: 5,
            dedup_window_secs: 600,
            approval_poll_secs: 30,
            api_url: "http://127.0.0.1:8080".to_string(),
            read_key: None,
            approval_db: PathBuf::from("wingman_approvals.db"),
            approval_db_fallback: None,
            backends: vec![NotifyBackend::Stdout],
            telegram_bot_token: None,
            telegram_chat_id: None,
            webhook_url: None,
            quarantine_on_critical: true,
            remediation_template: None,
        }
    }

    #[test]
    fn backend_list_parses_and_dedupes() {
        let backends = parse_backends("stdout, telegram,stdout").unwrap();
        assert_eq!(backends, vec![NotifyBackend::Stdout, NotifyBackend::Telegram]);
        assert!(parse_backends("stdout,pager").is_err());
    }

    #[test]
    fn disabled_loops_mean_no_work() {
        let mut config = base_config();
        assert!(config.has_work());
        config.interval_secs = 0;
        assert!(config.has_work());
        config.approval_poll_secs = 0;
        assert!(!config.has_work());
    }

    #[test]
    fn remediation_program_cannot_be_a_placeholder() {
        let mut config = base_config();
        config.remediation_template =
            Some(vec!["{worker_id}".to_string(), "stop".to_string()]);
        assert!(config.validate().is_err());
        config.remediation_template =
            Some(vec!["wingctl".to_string(), "stop".to_string(), "{worker_id}".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_dedup_window_is_rejected() {
        let mut config = base_config();
        config.dedup_window_secs = 0;
        assert!(config.validate().is_err());
    }
}
