//! Watcher coordinator
//!
//! One long-running process, two loops: the claims tailer and the
//! approval poller. Both funnel into the same dedup state and the same
//! notification fan-out. The cursor is flushed after every tail pass
//! and once more on shutdown.

use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Deserialize;
use wingman_store::ApprovalStore;
use wingman_types::{
    ApprovalRequest, ClaimEventType, ClaimRecord, DeploymentEnv, QuarantineEntry, RiskLevel,
    WatcherIncident,
};

use crate::classify::classify;
use crate::config::WatcherConfig;
use crate::cursor::CursorState;
use crate::error::{WatcherError, WatcherResult};
use crate::notify::{build_notifiers, Notifier};
use crate::tailer::ClaimsTailer;

const READ_KEY_HEADER: &str = "x-wingman-approval-read-key";
const REMEDIATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Store TTL is owned by the approval API; the watcher only reads and
/// records, so it opens the store with a nominal TTL.
const NOMINAL_PENDING_TTL: Duration = Duration::from_secs(3600);

#[derive(Deserialize)]
struct PendingResponse {
    pending: Vec<ApprovalRequest>,
}

pub struct Watcher {
    config: WatcherConfig,
    store: ApprovalStore,
    notifiers: Vec<Box<dyn Notifier>>,
    tailer: ClaimsTailer,
    cursor: Mutex<CursorState>,
    http: reqwest::Client,
}

impl Watcher {
    /// Open the durable store, build the notifier set, and load the
    /// cursor. Configuration must already be validated.
    pub async fn new(config: WatcherConfig) -> WatcherResult<Self> {
        let store = ApprovalStore::open(
            &config.approval_db,
            config.approval_db_fallback.as_deref(),
            NOMINAL_PENDING_TTL,
        )
        .await?;
        if store.using_fallback() {
            tracing::warn!("approval store is running on its fallback path");
        }

        let notifiers = build_notifiers(&config);
        let cursor = Mutex::new(CursorState::load(&config.state_file));
        let tailer = ClaimsTailer::new(config.claims_log.clone());

        Ok(Self {
            config,
            store,
            notifiers,
            tailer,
            cursor,
            http: reqwest::Client::new(),
        })
    }

    /// Run both loops until SIGINT or SIGTERM, then flush the cursor.
    pub async fn run(&self) -> WatcherResult<()> {
        let claims_enabled = self.config.interval_secs > 0;
        let poll_enabled = self.config.approval_poll_secs > 0;

        let mut claims_tick =
            tokio::time::interval(Duration::from_secs(self.config.interval_secs.max(1)));
        let mut poll_tick =
            tokio::time::interval(Duration::from_secs(self.config.approval_poll_secs.max(1)));

        tracing::info!(
            claims = claims_enabled,
            approvals = poll_enabled,
            dedup_window_secs = self.config.dedup_window_secs,
            "watcher running"
        );

        loop {
            tokio::select! {
                _ = claims_tick.tick(), if claims_enabled => {
                    if let Err(e) = self.process_claims().await {
                        tracing::error!(error = %e, "claims pass failed");
                    }
                }
                _ = poll_tick.tick(), if poll_enabled => {
                    if let Err(e) = self.poll_approvals().await {
                        tracing::warn!(error = %e, "approval poll failed");
                    }
                }
                _ = shutdown_signal() => break,
            }
        }

        self.flush_cursor();
        tracing::info!("watcher shutting down");
        Ok(())
    }

    /// One tail pass over the claims stream.
    pub async fn process_claims(&self) -> WatcherResult<()> {
        let offset = self.cursor.lock().offset;
        let (records, new_offset) = self.tailer.read_from(offset)?;

        for record in records {
            self.handle_claim(record).await;
        }

        {
            let mut cursor = self.cursor.lock();
            cursor.offset = new_offset;
            cursor.prune(Utc::now(), self.config.dedup_window_secs);
        }
        self.flush_cursor();
        Ok(())
    }

    async fn handle_claim(&self, record: ClaimRecord) {
        let Some((event_type, severity)) = classify(&record) else {
            return;
        };

        let fingerprint = WatcherIncident::dedup_fingerprint(
            event_type,
            &record.worker_id,
            record.timestamp,
            self.config.dedup_window_secs,
        );
        if !self.cursor.lock().mark(&fingerprint, record.timestamp) {
            tracing::debug!(%fingerprint, "claim event deduplicated");
            return;
        }

        let environment = record
            .environment
            .clone()
            .unwrap_or_else(|| "unknown".to_string());
        let incident = WatcherIncident {
            severity,
            event_type,
            worker_id: record.worker_id.clone(),
            claim: record.claim.clone(),
            environment,
            sent_at: Utc::now(),
            acknowledged_at: None,
            fingerprint,
        };

        self.dispatch(&incident).await;
        self.record_incident(&incident).await;

        if severity == RiskLevel::Critical && self.config.quarantine_on_critical {
            self.quarantine(&record).await;
        }

        if let Some(template) = &self.config.remediation_template {
            run_remediation(template, &record.worker_id, &record.status.to_string(), severity)
                .await;
        }
    }

    /// One poll of the approval queue; each PENDING request raises at
    /// most one incident, keyed by its creation time bucket.
    pub async fn poll_approvals(&self) -> WatcherResult<()> {
        let url = format!(
            "{}/approvals/pending",
            self.config.api_url.trim_end_matches('/')
        );
        let mut request = self.http.get(&url);
        if let Some(key) = &self.config.read_key {
            request = request.header(READ_KEY_HEADER, key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| WatcherError::Poll(e.without_url().to_string()))?;
        if !response.status().is_success() {
            return Err(WatcherError::Poll(format!("status {}", response.status())));
        }
        let body: PendingResponse = response
            .json()
            .await
            .map_err(|e| WatcherError::Poll(e.without_url().to_string()))?;

        for pending in body.pending {
            let fingerprint = WatcherIncident::dedup_fingerprint(
                ClaimEventType::ApprovalPendingNew,
                &pending.worker_id,
                pending.created_at,
                self.config.dedup_window_secs,
            );
            if !self.cursor.lock().mark(&fingerprint, pending.created_at) {
                continue;
            }

            let incident = WatcherIncident {
                severity: pending.risk_level,
                event_type: ClaimEventType::ApprovalPendingNew,
                worker_id: pending.worker_id.clone(),
                claim: format!(
                    "approval {} pending: {}",
                    pending.request_id, pending.task_name
                ),
                environment: pending.deployment_env.to_string(),
                sent_at: Utc::now(),
                acknowledged_at: None,
                fingerprint,
            };
            self.dispatch(&incident).await;
            self.record_incident(&incident).await;
        }

        self.flush_cursor();
        Ok(())
    }

    /// Fan out to every sink; a failing sink never blocks the others.
    async fn dispatch(&self, incident: &WatcherIncident) {
        for notifier in &self.notifiers {
            if let Err(e) = notifier.notify(incident).await {
                tracing::warn!(sink = notifier.name(), error = %e, "notification failed");
            }
        }
    }

    async fn record_incident(&self, incident: &WatcherIncident) {
        match self.store.incident_record(incident).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(fingerprint = %incident.fingerprint, "incident already recorded")
            }
            Err(e) => tracing::error!(error = %e, "failed to record incident"),
        }
    }

    async fn quarantine(&self, record: &ClaimRecord) {
        let environment = record
            .environment
            .as_deref()
            .and_then(|e| e.parse::<DeploymentEnv>().ok())
            .unwrap_or(DeploymentEnv::Prd);
        let entry = QuarantineEntry {
            worker_id: record.worker_id.clone(),
            reason: "critical false claim detected by watcher".to_string(),
            environment,
            quarantined_at: Utc::now(),
        };
        match self.store.quarantine_add(&entry).await {
            Ok(()) => {
                tracing::warn!(worker_id = %entry.worker_id, "worker quarantined")
            }
            Err(e) => tracing::error!(error = %e, "failed to quarantine worker"),
        }
    }

    fn flush_cursor(&self) {
        let cursor = self.cursor.lock();
        if let Err(e) = cursor.save(&self.config.state_file) {
            tracing::error!(error = %e, "failed to persist cursor state");
        }
    }
}

/// Invokes the remediation template, argv only, no shell. Placeholders
/// {worker_id}, {verdict}, {severity} are substituted per argument.
async fn run_remediation(template: &[String], worker_id: &str, verdict: &str, severity: RiskLevel) {
    let argv: Vec<String> = template
        .iter()
        .map(|arg| {
            arg.replace("{worker_id}", worker_id)
                .replace("{verdict}", verdict)
                .replace("{severity}", severity.as_str())
        })
        .collect();
    let Some((program, args)) = argv.split_first() else {
        return;
    };

    let mut command = tokio::process::Command::new(program);
    command.args(args).kill_on_drop(true);
    match command.spawn() {
        Ok(mut child) => match tokio::time::timeout(REMEDIATION_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::info!(%worker_id, code = status.code(), "remediation command finished")
            }
            Ok(Err(e)) => tracing::warn!(error = %e, "remediation command failed"),
            Err(_) => tracing::warn!(%worker_id, "remediation command timed out"),
        },
        Err(e) => tracing::warn!(error = %e, "failed to spawn remediation command"),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("received terminate signal, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NotifyBackend;
    use crate::notify::NotifyError;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use wingman_types::ClaimStatus;

    struct CountingNotifier(Arc<AtomicUsize>);

    #[async_trait]
    impl Notifier for CountingNotifier {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn notify(&self, _incident: &WatcherIncident) -> Result<(), NotifyError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn test_config(dir: &std::path::Path) -> WatcherConfig {
        WatcherConfig {
            claims_log: dir.join("claims.jsonl"),
            state_file: dir.join("state.json"),
            interval_secs: 1,
            dedup_window_secs: 600,
            approval_poll_secs: 0,
            api_url: "http://127.0.0.1:8080".to_string(),
            read_key: None,
            approval_db: dir.join("approvals.db"),
            approval_db_fallback: None,
            backends: vec![NotifyBackend::Stdout],
            telegram_bot_token: None,
            telegram_chat_id: None,
            webhook_url: None,
            quarantine_on_critical: true,
            remediation_template: None,
        }
    }

    async fn test_watcher(dir: &std::path::Path) -> (Watcher, Arc<AtomicUsize>) {
        let config = test_config(dir);
        let store = ApprovalStore::open(&config.approval_db, None, NOMINAL_PENDING_TTL)
            .await
            .unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let watcher = Watcher {
            tailer: ClaimsTailer::new(config.claims_log.clone()),
            cursor: Mutex::new(CursorState::load(&config.state_file)),
            notifiers: vec![Box::new(CountingNotifier(counter.clone()))],
            http: reqwest::Client::new(),
            config,
            store,
        };
        (watcher, counter)
    }

    fn append_claim(path: &PathBuf, worker_id: &str, claim: &str, status: ClaimStatus, env: &str, at: chrono::DateTime<Utc>) {
        let mut record = ClaimRecord::new(worker_id, claim, status);
        record.environment = Some(env.to_string());
        record.timestamp = at;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        writeln!(file, "{}", serde_json::to_string(&record).unwrap()).unwrap();
    }

    #[tokio::test]
    async fn repeated_false_claims_alert_once_per_window() {
        let dir = tempfile::tempdir().unwrap();
        let (watcher, counter) = test_watcher(dir.path()).await;

        let t0 = Utc::now();
        let claims = watcher.config.claims_log.clone();
        append_claim(&claims, "worker-1", "restarted the api", ClaimStatus::False, "prd", t0);
        append_claim(
            &claims,
            "worker-1",
            "restarted the api",
            ClaimStatus::False,
            "prd",
            t0 + ChronoDuration::seconds(30),
        );

        watcher.process_claims().await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        let incidents = watcher.store.incidents_list(None, 50).await.unwrap();
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].worker_id, "worker-1");
    }

    #[tokio::test]
    async fn replay_from_zero_raises_nothing_new() {
        let dir = tempfile::tempdir().unwrap();
        let (watcher, counter) = test_watcher(dir.path()).await;

        let claims = watcher.config.claims_log.clone();
        append_claim(&claims, "worker-1", "migrated the db", ClaimStatus::False, "test", Utc::now());
        watcher.process_claims().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        // Force a re-read of the whole stream with the fingerprints kept.
        watcher.cursor.lock().offset = 0;
        watcher.process_claims().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn critical_false_claim_quarantines_the_worker() {
        let dir = tempfile::tempdir().unwrap();
        let (watcher, counter) = test_watcher(dir.path()).await;

        append_claim(
            &watcher.config.claims_log.clone(),
            "worker-9",
            "cleaned old data with rm -rf /var/lib/app",
            ClaimStatus::False,
            "prd",
            Utc::now(),
        );
        watcher.process_claims().await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        let entry = watcher.store.quarantine_get("worker-9").await.unwrap();
        let entry = entry.expect("worker should be quarantined");
        assert_eq!(entry.environment, DeploymentEnv::Prd);
    }

    #[tokio::test]
    async fn true_claims_raise_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (watcher, counter) = test_watcher(dir.path()).await;

        append_claim(
            &watcher.config.claims_log.clone(),
            "worker-1",
            "deployed api v2",
            ClaimStatus::True,
            "prd",
            Utc::now(),
        );
        watcher.process_claims().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cursor_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let (watcher, _counter) = test_watcher(dir.path()).await;

        append_claim(
            &watcher.config.claims_log.clone(),
            "worker-1",
            "something vague",
            ClaimStatus::Unverifiable,
            "dev",
            Utc::now(),
        );
        watcher.process_claims().await.unwrap();
        let offset = watcher.cursor.lock().offset;
        assert!(offset > 0);

        // A second watcher picks up the persisted cursor.
        let reloaded = CursorState::load(&watcher.config.state_file);
        assert_eq!(reloaded.offset, offset);
        assert!(!reloaded.fingerprints.is_empty());
    }
}
