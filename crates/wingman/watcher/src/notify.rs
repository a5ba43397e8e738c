//! Notification sinks
//!
//! Each sink is independent: a failing sink is logged and the others
//! still fire. Credentials never appear in log lines.

use async_trait::async_trait;
use thiserror::Error;
use wingman_types::WatcherIncident;

use crate::config::{NotifyBackend, WatcherConfig};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("telegram delivery failed: {0}")]
    Telegram(String),

    #[error("webhook delivery failed: {0}")]
    Webhook(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn notify(&self, incident: &WatcherIncident) -> Result<(), NotifyError>;
}

fn summary_line(incident: &WatcherIncident) -> String {
    let mut claim = incident.claim.clone();
    if claim.len() > 200 {
        let mut cut = 200;
        while cut > 0 && !claim.is_char_boundary(cut) {
            cut -= 1;
        }
        claim.truncate(cut);
        claim.push('…');
    }
    format!(
        "[{}] {} worker={} env={} claim={:?}",
        incident.severity, incident.event_type, incident.worker_id, incident.environment, claim
    )
}

/// Structured log line on the watcher's own output.
pub struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
    fn name(&self) -> &'static str {
        "stdout"
    }

    async fn notify(&self, incident: &WatcherIncident) -> Result<(), NotifyError> {
        tracing::warn!(
            severity = %incident.severity,
            event_type = %incident.event_type,
            worker_id = %incident.worker_id,
            environment = %incident.environment,
            fingerprint = %incident.fingerprint,
            "watcher incident"
        );
        Ok(())
    }
}

/// Sends a message to a Telegram chat through the bot API.
pub struct TelegramNotifier {
    client: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(client: reqwest::Client, bot_token: String, chat_id: String) -> Self {
        Self {
            client,
            bot_token,
            chat_id,
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn notify(&self, incident: &WatcherIncident) -> Result<(), NotifyError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "chat_id": self.chat_id,
                "text": summary_line(incident),
            }))
            .send()
            .await
            .map_err(|e| NotifyError::Telegram(e.without_url().to_string()))?;
        if !response.status().is_success() {
            return Err(NotifyError::Telegram(format!(
                "status {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// POSTs the full incident as JSON to a configured URL.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn notify(&self, incident: &WatcherIncident) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(incident)
            .send()
            .await
            .map_err(|e| NotifyError::Webhook(e.without_url().to_string()))?;
        if !response.status().is_success() {
            return Err(NotifyError::Webhook(format!(
                "status {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Instantiates the configured sinks. A sink with missing credentials
/// is skipped with a one-shot warning.
pub fn build_notifiers(config: &WatcherConfig) -> Vec<Box<dyn Notifier>> {
    let client = reqwest::Client::new();
    let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();

    for backend in &config.backends {
        match backend {
            NotifyBackend::Stdout => notifiers.push(Box::new(StdoutNotifier)),
            NotifyBackend::Telegram => {
                match (&config.telegram_bot_token, &config.telegram_chat_id) {
                    (Some(token), Some(chat_id)) => notifiers.push(Box::new(
                        TelegramNotifier::new(client.clone(), token.clone(), chat_id.clone()),
                    )),
                    _ => {
                        tracing::warn!("telegram notifier disabled, credentials not configured")
                    }
                }
            }
            NotifyBackend::Webhook => match &config.webhook_url {
                Some(url) => notifiers.push(Box::new(WebhookNotifier::new(
                    client.clone(),
                    url.clone(),
                ))),
                None => tracing::warn!("webhook notifier disabled, URL not configured"),
            },
        }
    }

    notifiers
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;
    use wingman_types::{ClaimEventType, RiskLevel};

    fn incident(claim: &str) -> WatcherIncident {
        WatcherIncident {
            severity: RiskLevel::High,
            event_type: ClaimEventType::FalseClaim,
            worker_id: "worker-1".to_string(),
            claim: claim.to_string(),
            environment: "prd".to_string(),
            sent_at: Utc::now(),
            acknowledged_at: None,
            fingerprint: "fp".to_string(),
        }
    }

    fn config_with(backends: Vec<NotifyBackend>) -> WatcherConfig {
        WatcherConfig {
            claims_log: PathBuf::from("claims.jsonl"),
            state_file: PathBuf::from("state.json"),
            interval_secs: 5,
            dedup_window_secs: 600,
            approval_poll_secs: 0,
            api_url: "http://127.0.0.1:8080".to_string(),
            read_key: None,
            approval_db: PathBuf::from("approvals.db"),
            approval_db_fallback: None,
            backends,
            telegram_bot_token: None,
            telegram_chat_id: None,
            webhook_url: None,
            quarantine_on_critical: false,
            remediation_template: None,
        }
    }

    #[test]
    fn summary_truncates_long_claims() {
        let line = summary_line(&incident(&"x".repeat(500)));
        assert!(line.len() < 300);
        assert!(line.contains("worker=worker-1"));
    }

    #[test]
    fn missing_credentials_drop_the_sink() {
        let notifiers = config_with(vec![
            NotifyBackend::Stdout,
            NotifyBackend::Telegram,
            NotifyBackend::Webhook,
        ]);
        let notifiers = build_notifiers(&notifiers);
        assert_eq!(notifiers.len(), 1);
        assert_eq!(notifiers[0].name(), "stdout");
    }

    #[test]
    fn configured_sinks_are_built() {
        let mut config = config_with(vec![NotifyBackend::Telegram, NotifyBackend::Webhook]);
        config.telegram_bot_token = Some("123456789:AAtesttesttesttesttesttesttesttest".to_string());
        config.telegram_chat_id = Some("42".to_string());
        config.webhook_url = Some("http://127.0.0.1:9/hook".to_string());
        let notifiers = build_notifiers(&config);
        let names: Vec<_> = notifiers.iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["telegram", "webhook"]);
    }

    #[tokio::test]
    async fn stdout_sink_always_succeeds() {
        assert!(StdoutNotifier.notify(&incident("restarted api")).await.is_ok());
    }
}
