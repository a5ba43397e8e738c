//! SQLite-backed approval store

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use wingman_types::{
    ApprovalRequest, ApprovalStatus, ClaimEventType, DeploymentEnv, QuarantineEntry, RiskLevel,
    WatcherIncident,
};

use crate::error::StoreError;
use crate::retry::with_retry;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Human or automatic verdict applied to a pending request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    fn to_status(self) -> ApprovalStatus {
        match self {
            Decision::Approve => ApprovalStatus::Approved,
            Decision::Reject => ApprovalStatus::Rejected,
        }
    }
}

/// Result of [`ApprovalStore::create`]: either the inserted row or an
/// existing PENDING row with the same fingerprint.
#[derive(Clone, Debug)]
pub struct CreateOutcome {
    pub request: ApprovalRequest,
    pub deduped: bool,
}

/// SQLite-backed storage for approvals, quarantine, and incidents.
#[derive(Clone, Debug)]
pub struct ApprovalStore {
    pool: SqlitePool,
    pending_ttl: Duration,
    using_fallback: bool,
}

impl ApprovalStore {
    /// Open the store at `primary`, falling back to `fallback` if the
    /// primary path cannot be initialized. Failing both is fatal to the
    /// caller.
    pub async fn open(
        primary: impl AsRef<Path>,
        fallback: Option<&Path>,
        pending_ttl: Duration,
    ) -> StoreResult<Self> {
        let primary = primary.as_ref();
        match Self::connect(primary).await {
            Ok(pool) => {
                let store = Self {
                    pool,
                    pending_ttl,
                    using_fallback: false,
                };
                store.initialize_schema().await?;
                Ok(store)
            }
            Err(primary_err) => {
                let Some(fallback) = fallback else {
                    return Err(primary_err);
                };
                tracing::error!(
                    path = %primary.display(),
                    error = %primary_err,
                    fallback = %fallback.display(),
                    "primary approval database unavailable, using fallback path"
                );
                let pool = Self::connect(fallback).await?;
                let store = Self {
                    pool,
                    pending_ttl,
                    using_fallback: true,
                };
                store.initialize_schema().await?;
                Ok(store)
            }
        }
    }

    /// Whether the store came up on the fallback path.
    pub fn using_fallback(&self) -> bool {
        self.using_fallback
    }

    async fn connect(path: &Path) -> StoreResult<SqlitePool> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    async fn initialize_schema(&self) -> StoreResult<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS approval_requests (
                request_id TEXT PRIMARY KEY,
                created_at TIMESTAMP NOT NULL,
                decided_at TIMESTAMP,
                status TEXT NOT NULL,
                worker_id TEXT NOT NULL,
                task_name TEXT NOT NULL,
                instruction TEXT NOT NULL,
                deployment_env TEXT NOT NULL,
                risk_level TEXT NOT NULL,
                risk_reason TEXT NOT NULL,
                fingerprint TEXT NOT NULL,
                decided_by TEXT,
                decision_note TEXT,
                validation_results TEXT
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS approvals_fingerprint_status
               ON approval_requests(fingerprint, status);"#,
            r#"CREATE INDEX IF NOT EXISTS approvals_status_created
               ON approval_requests(status, created_at);"#,
            r#"
            CREATE TABLE IF NOT EXISTS quarantine (
                worker_id TEXT PRIMARY KEY,
                reason TEXT NOT NULL,
                environment TEXT NOT NULL,
                quarantined_at TIMESTAMP NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS incidents (
                fingerprint TEXT PRIMARY KEY,
                severity TEXT NOT NULL,
                event_type TEXT NOT NULL,
                worker_id TEXT NOT NULL,
                claim TEXT NOT NULL,
                environment TEXT NOT NULL,
                sent_at TIMESTAMP NOT NULL,
                acknowledged_at TIMESTAMP
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS incidents_sent_at ON incidents(sent_at DESC);"#,
        ];

        for stmt in statements {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(StoreError::query)?;
        }

        Ok(())
    }

    /// Liveness probe used by health endpoints.
    pub async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(StoreError::query)
    }

    fn row_to_request(row: &SqliteRow) -> Result<ApprovalRequest, sqlx::Error> {
        fn decode<T: FromStr>(value: String) -> Result<T, sqlx::Error>
        where
            T::Err: std::error::Error + Send + Sync + 'static,
        {
            T::from_str(&value).map_err(|e| sqlx::Error::Decode(Box::new(e)))
        }

        let validation_results = row
            .try_get::<Option<String>, _>("validation_results")?
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(ApprovalRequest {
            request_id: row.try_get("request_id")?,
            created_at: row.try_get("created_at")?,
            decided_at: row.try_get("decided_at")?,
            status: decode::<ApprovalStatus>(row.try_get("status")?)?,
            worker_id: row.try_get("worker_id")?,
            task_name: row.try_get("task_name")?,
            instruction: row.try_get("instruction")?,
            deployment_env: decode::<DeploymentEnv>(row.try_get("deployment_env")?)?,
            risk_level: decode::<RiskLevel>(row.try_get("risk_level")?)?,
            risk_reason: row.try_get("risk_reason")?,
            fingerprint: row.try_get("fingerprint")?,
            decided_by: row.try_get("decided_by")?,
            decision_note: row.try_get("decision_note")?,
            validation_results,
        })
    }

    async fn insert_request(
        pool: &SqlitePool,
        request: &ApprovalRequest,
    ) -> Result<(), sqlx::Error> {
        let validation_results = request
            .validation_results
            .as_ref()
            .map(|v| v.to_string());
        sqlx::query(
            r#"
            INSERT INTO approval_requests (
                request_id, created_at, decided_at, status, worker_id, task_name,
                instruction, deployment_env, risk_level, risk_reason, fingerprint,
                decided_by, decision_note, validation_results
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(&request.request_id)
        .bind(request.created_at)
        .bind(request.decided_at)
        .bind(request.status.as_str())
        .bind(&request.worker_id)
        .bind(&request.task_name)
        .bind(&request.instruction)
        .bind(request.deployment_env.as_str())
        .bind(request.risk_level.as_str())
        .bind(&request.risk_reason)
        .bind(&request.fingerprint)
        .bind(&request.decided_by)
        .bind(&request.decision_note)
        .bind(validation_results)
        .execute(pool)
        .await
        .map(|_| ())
    }

    /// Insert a new request. For PENDING births the fingerprint is
    /// checked first; an existing PENDING row with the same fingerprint
    /// is returned instead of inserting a duplicate. The lookup is a
    /// best-effort optimization, not a uniqueness constraint.
    pub async fn create(&self, request: ApprovalRequest) -> StoreResult<CreateOutcome> {
        let pool = self.pool.clone();
        with_retry("approvals.create", || {
            let pool = pool.clone();
            let request = request.clone();
            async move {
                if request.status == ApprovalStatus::Pending {
                    let existing = sqlx::query(
                        r#"
                        SELECT * FROM approval_requests
                        WHERE fingerprint = $1 AND status = 'PENDING'
                        ORDER BY created_at ASC
                        LIMIT 1
                        "#,
                    )
                    .bind(&request.fingerprint)
                    .fetch_optional(&pool)
                    .await?;

                    if let Some(row) = existing {
                        return Ok(CreateOutcome {
                            request: Self::row_to_request(&row)?,
                            deduped: true,
                        });
                    }
                }

                Self::insert_request(&pool, &request).await?;
                Ok(CreateOutcome {
                    request,
                    deduped: false,
                })
            }
        })
        .await
    }

    pub async fn get(&self, request_id: &str) -> StoreResult<Option<ApprovalRequest>> {
        let pool = self.pool.clone();
        let request_id = request_id.to_string();
        with_retry("approvals.get", || {
            let pool = pool.clone();
            let request_id = request_id.clone();
            async move {
                let row = sqlx::query("SELECT * FROM approval_requests WHERE request_id = $1")
                    .bind(&request_id)
                    .fetch_optional(&pool)
                    .await?;
                row.map(|r| Self::row_to_request(&r)).transpose()
            }
        })
        .await
    }

    /// Mark PENDING rows older than the configured TTL as EXPIRED.
    /// Returns how many rows transitioned.
    pub async fn expire_stale_pending(&self) -> StoreResult<u64> {
        let ttl = ChronoDuration::from_std(self.pending_ttl)
            .map_err(|e| StoreError::InvalidData(format!("pending ttl out of range: {}", e)))?;
        let cutoff = Utc::now() - ttl;
        let pool = self.pool.clone();
        let expired = with_retry("approvals.expire", || {
            let pool = pool.clone();
            async move {
                let result = sqlx::query(
                    r#"
                    UPDATE approval_requests
                    SET status = 'EXPIRED', decided_at = $1
                    WHERE status = 'PENDING' AND created_at < $2
                    "#,
                )
                .bind(Utc::now())
                .bind(cutoff)
                .execute(&pool)
                .await?;
                Ok(result.rows_affected())
            }
        })
        .await?;

        if expired > 0 {
            tracing::info!(count = expired, "expired stale pending approvals");
        }
        Ok(expired)
    }

    /// List PENDING rows, oldest first, expiring stale ones beforehand.
    pub async fn list_pending(&self, limit: i64) -> StoreResult<Vec<ApprovalRequest>> {
        self.expire_stale_pending().await?;

        let pool = self.pool.clone();
        with_retry("approvals.list_pending", || {
            let pool = pool.clone();
            async move {
                let rows = sqlx::query(
                    r#"
                    SELECT * FROM approval_requests
                    WHERE status = 'PENDING'
                    ORDER BY created_at ASC
                    LIMIT $1
                    "#,
                )
                .bind(limit)
                .fetch_all(&pool)
                .await?;
                rows.iter().map(Self::row_to_request).collect()
            }
        })
        .await
    }

    /// Atomically move a PENDING request to APPROVED or REJECTED.
    ///
    /// Idempotent: if the row is already terminal the stored row is
    /// returned unchanged, whatever the requested decision was. The
    /// transition itself is guarded by `status = 'PENDING'` so two
    /// concurrent deciders produce exactly one effective transition.
    pub async fn decide(
        &self,
        request_id: &str,
        decision: Decision,
        decided_by: &str,
        note: Option<&str>,
    ) -> StoreResult<ApprovalRequest> {
        let pool = self.pool.clone();
        let request_id_owned = request_id.to_string();
        let decided_by = decided_by.to_string();
        let note = note.map(|n| n.to_string());
        let status = decision.to_status();

        let row = with_retry("approvals.decide", || {
            let pool = pool.clone();
            let request_id = request_id_owned.clone();
            let decided_by = decided_by.clone();
            let note = note.clone();
            async move {
                let result = sqlx::query(
                    r#"
                    UPDATE approval_requests
                    SET status = $1, decided_at = $2, decided_by = $3, decision_note = $4
                    WHERE request_id = $5 AND status = 'PENDING'
                    "#,
                )
                .bind(status.as_str())
                .bind(Utc::now())
                .bind(&decided_by)
                .bind(&note)
                .bind(&request_id)
                .execute(&pool)
                .await?;

                // rows_affected == 0 means either unknown id or an
                // already-terminal row; the fetch below distinguishes.
                let _ = result;
                let row = sqlx::query("SELECT * FROM approval_requests WHERE request_id = $1")
                    .bind(&request_id)
                    .fetch_optional(&pool)
                    .await?;
                row.map(|r| Self::row_to_request(&r)).transpose()
            }
        })
        .await?;

        row.ok_or_else(|| StoreError::NotFound(format!("approval request {}", request_id)))
    }

    // --- quarantine set -------------------------------------------------

    pub async fn quarantine_add(&self, entry: &QuarantineEntry) -> StoreResult<()> {
        let pool = self.pool.clone();
        let entry = entry.clone();
        with_retry("quarantine.add", || {
            let pool = pool.clone();
            let entry = entry.clone();
            async move {
                sqlx::query(
                    r#"
                    INSERT INTO quarantine (worker_id, reason, environment, quarantined_at)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (worker_id)
                    DO UPDATE SET
                        reason = EXCLUDED.reason,
                        environment = EXCLUDED.environment,
                        quarantined_at = EXCLUDED.quarantined_at
                    "#,
                )
                .bind(&entry.worker_id)
                .bind(&entry.reason)
                .bind(entry.environment.as_str())
                .bind(entry.quarantined_at)
                .execute(&pool)
                .await
                .map(|_| ())
            }
        })
        .await
    }

    pub async fn quarantine_remove(&self, worker_id: &str) -> StoreResult<bool> {
        let pool = self.pool.clone();
        let worker_id = worker_id.to_string();
        with_retry("quarantine.remove", || {
            let pool = pool.clone();
            let worker_id = worker_id.clone();
            async move {
                let result = sqlx::query("DELETE FROM quarantine WHERE worker_id = $1")
                    .bind(&worker_id)
                    .execute(&pool)
                    .await?;
                Ok(result.rows_affected() > 0)
            }
        })
        .await
    }

    pub async fn quarantine_get(&self, worker_id: &str) -> StoreResult<Option<QuarantineEntry>> {
        let pool = self.pool.clone();
        let worker_id = worker_id.to_string();
        with_retry("quarantine.get", || {
            let pool = pool.clone();
            let worker_id = worker_id.clone();
            async move {
                let row = sqlx::query("SELECT * FROM quarantine WHERE worker_id = $1")
                    .bind(&worker_id)
                    .fetch_optional(&pool)
                    .await?;
                row.map(|r| Self::row_to_quarantine(&r)).transpose()
            }
        })
        .await
    }

    pub async fn quarantine_list(&self) -> StoreResult<Vec<QuarantineEntry>> {
        let pool = self.pool.clone();
        with_retry("quarantine.list", || {
            let pool = pool.clone();
            async move {
                let rows = sqlx::query("SELECT * FROM quarantine ORDER BY quarantined_at DESC")
                    .fetch_all(&pool)
                    .await?;
                rows.iter().map(Self::row_to_quarantine).collect()
            }
        })
        .await
    }

    fn row_to_quarantine(row: &SqliteRow) -> Result<QuarantineEntry, sqlx::Error> {
        let environment: String = row.try_get("environment")?;
        Ok(QuarantineEntry {
            worker_id: row.try_get("worker_id")?,
            reason: row.try_get("reason")?,
            environment: environment
                .parse()
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            quarantined_at: row.try_get("quarantined_at")?,
        })
    }

    // --- watcher incidents ----------------------------------------------

    /// Record an incident. Returns false when an incident with the same
    /// dedup fingerprint was already recorded.
    pub async fn incident_record(&self, incident: &WatcherIncident) -> StoreResult<bool> {
        let pool = self.pool.clone();
        let incident = incident.clone();
        with_retry("incidents.record", || {
            let pool = pool.clone();
            let incident = incident.clone();
            async move {
                let result = sqlx::query(
                    r#"
                    INSERT OR IGNORE INTO incidents (
                        fingerprint, severity, event_type, worker_id, claim,
                        environment, sent_at, acknowledged_at
                    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    "#,
                )
                .bind(&incident.fingerprint)
                .bind(incident.severity.as_str())
                .bind(incident.event_type.as_str())
                .bind(&incident.worker_id)
                .bind(&incident.claim)
                .bind(&incident.environment)
                .bind(incident.sent_at)
                .bind(incident.acknowledged_at)
                .execute(&pool)
                .await?;
                Ok(result.rows_affected() > 0)
            }
        })
        .await
    }

    pub async fn incidents_list(
        &self,
        severity: Option<RiskLevel>,
        limit: i64,
    ) -> StoreResult<Vec<WatcherIncident>> {
        let pool = self.pool.clone();
        with_retry("incidents.list", || {
            let pool = pool.clone();
            async move {
                let rows = if let Some(severity) = severity {
                    sqlx::query(
                        r#"
                        SELECT * FROM incidents WHERE severity = $1
                        ORDER BY sent_at DESC LIMIT $2
                        "#,
                    )
                    .bind(severity.as_str())
                    .bind(limit)
                    .fetch_all(&pool)
                    .await?
                } else {
                    sqlx::query("SELECT * FROM incidents ORDER BY sent_at DESC LIMIT $1")
                        .bind(limit)
                        .fetch_all(&pool)
                        .await?
                };
                rows.iter().map(Self::row_to_incident).collect()
            }
        })
        .await
    }

    fn row_to_incident(row: &SqliteRow) -> Result<WatcherIncident, sqlx::Error> {
        let severity: String = row.try_get("severity")?;
        let event_type: String = row.try_get("event_type")?;
        let event_type = match event_type.as_str() {
            "FALSE_CLAIM" => ClaimEventType::FalseClaim,
            "UNVERIFIABLE" => ClaimEventType::Unverifiable,
            "APPROVAL_PENDING_NEW" => ClaimEventType::ApprovalPendingNew,
            other => {
                return Err(sqlx::Error::Decode(
                    format!("unknown event type: {}", other).into(),
                ))
            }
        };
        Ok(WatcherIncident {
            severity: severity
                .parse()
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            event_type,
            worker_id: row.try_get("worker_id")?,
            claim: row.try_get("claim")?,
            environment: row.try_get("environment")?,
            sent_at: row.try_get("sent_at")?,
            acknowledged_at: row.try_get("acknowledged_at")?,
            fingerprint: row.try_get("fingerprint")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open_store(dir: &TempDir, ttl: Duration) -> ApprovalStore {
        ApprovalStore::open(dir.path().join("approvals.db"), None, ttl)
            .await
            .unwrap()
    }

    fn pending_request(worker: &str, task: &str, instruction: &str) -> ApprovalRequest {
        ApprovalRequest::new(
            worker,
            task,
            instruction,
            DeploymentEnv::Test,
            RiskLevel::High,
            "destructive operation",
            ApprovalStatus::Pending,
        )
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, Duration::from_secs(3600)).await;

        let mut request = pending_request("w1", "deploy", "Run DROP TABLE orders");
        request.validation_results = Some(serde_json::json!({"overall_score": 72}));
        let outcome = store.create(request.clone()).await.unwrap();
        assert!(!outcome.deduped);

        let fetched = store.get(&request.request_id).await.unwrap().unwrap();
        assert_eq!(fetched.request_id, request.request_id);
        assert_eq!(fetched.status, ApprovalStatus::Pending);
        assert_eq!(fetched.risk_level, RiskLevel::High);
        assert_eq!(
            fetched.validation_results,
            Some(serde_json::json!({"overall_score": 72}))
        );

        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn pending_dedup_returns_existing_row() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, Duration::from_secs(3600)).await;

        let first = pending_request("w1", "deploy", "Run DROP TABLE orders");
        let second = pending_request("w1", "deploy", "Run DROP TABLE orders");
        assert_eq!(first.fingerprint, second.fingerprint);

        let a = store.create(first.clone()).await.unwrap();
        let b = store.create(second).await.unwrap();
        assert!(!a.deduped);
        assert!(b.deduped);
        assert_eq!(b.request.request_id, first.request_id);
    }

    #[tokio::test]
    async fn dedup_does_not_apply_to_terminal_births() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, Duration::from_secs(3600)).await;

        let auto = ApprovalRequest::new(
            "w1",
            "logs",
            "Show docker logs",
            DeploymentEnv::Dev,
            RiskLevel::Low,
            "low risk",
            ApprovalStatus::AutoApproved,
        );
        let again = ApprovalRequest::new(
            "w1",
            "logs",
            "Show docker logs",
            DeploymentEnv::Dev,
            RiskLevel::Low,
            "low risk",
            ApprovalStatus::AutoApproved,
        );
        let a = store.create(auto).await.unwrap();
        let b = store.create(again).await.unwrap();
        assert!(!a.deduped);
        assert!(!b.deduped);
        assert_ne!(a.request.request_id, b.request.request_id);
    }

    #[tokio::test]
    async fn decide_transitions_once_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, Duration::from_secs(3600)).await;

        let request = pending_request("w1", "deploy", "Run DROP TABLE orders");
        store.create(request.clone()).await.unwrap();

        let approved = store
            .decide(&request.request_id, Decision::Approve, "ops@example", Some("reviewed"))
            .await
            .unwrap();
        assert_eq!(approved.status, ApprovalStatus::Approved);
        assert_eq!(approved.decided_by.as_deref(), Some("ops@example"));
        assert!(approved.decided_at.is_some());

        // A losing reject sees the winner's state unchanged.
        let second = store
            .decide(&request.request_id, Decision::Reject, "other@example", None)
            .await
            .unwrap();
        assert_eq!(second.status, ApprovalStatus::Approved);
        assert_eq!(second.decided_by.as_deref(), Some("ops@example"));
        assert_eq!(second.decided_at, approved.decided_at);
    }

    #[tokio::test]
    async fn decide_unknown_id_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, Duration::from_secs(3600)).await;
        let err = store
            .decide("missing", Decision::Approve, "ops", None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_pending_expires_stale_rows_first() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, Duration::from_secs(1)).await;

        let mut stale = pending_request("w1", "deploy", "Run DROP TABLE orders");
        stale.created_at = Utc::now() - ChronoDuration::seconds(10);
        let fresh = pending_request("w2", "deploy", "Apply migration 42");
        store.create(stale.clone()).await.unwrap();
        store.create(fresh.clone()).await.unwrap();

        let pending = store.list_pending(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].request_id, fresh.request_id);

        let expired = store.get(&stale.request_id).await.unwrap().unwrap();
        assert_eq!(expired.status, ApprovalStatus::Expired);
        assert!(expired.decided_at.is_some());
    }

    #[tokio::test]
    async fn pending_list_is_oldest_first_and_limited() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, Duration::from_secs(3600)).await;

        for i in 0..3 {
            let mut req = pending_request("w1", "deploy", &format!("task {}", i));
            req.created_at = Utc::now() - ChronoDuration::seconds(30 - i);
            store.create(req).await.unwrap();
        }

        let pending = store.list_pending(2).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending[0].created_at <= pending[1].created_at);
    }

    #[tokio::test]
    async fn fallback_path_is_used_when_primary_fails() {
        let dir = TempDir::new().unwrap();
        let fallback = dir.path().join("fallback.db");
        let store = ApprovalStore::open(
            "/nonexistent-wingman-dir/approvals.db",
            Some(fallback.as_path()),
            Duration::from_secs(3600),
        )
        .await
        .unwrap();
        assert!(store.using_fallback());
        store.ping().await.unwrap();
    }

    #[tokio::test]
    async fn both_paths_failing_is_fatal() {
        let result = ApprovalStore::open(
            "/nonexistent-wingman-dir/approvals.db",
            Some(Path::new("/another-nonexistent-dir/approvals.db")),
            Duration::from_secs(3600),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn quarantine_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, Duration::from_secs(3600)).await;

        assert!(store.quarantine_get("w1").await.unwrap().is_none());

        let entry = QuarantineEntry {
            worker_id: "w1".to_string(),
            reason: "false claim in prd".to_string(),
            environment: DeploymentEnv::Prd,
            quarantined_at: Utc::now(),
        };
        store.quarantine_add(&entry).await.unwrap();

        let stored = store.quarantine_get("w1").await.unwrap().unwrap();
        assert_eq!(stored.reason, "false claim in prd");
        assert_eq!(stored.environment, DeploymentEnv::Prd);
        assert_eq!(store.quarantine_list().await.unwrap().len(), 1);

        assert!(store.quarantine_remove("w1").await.unwrap());
        assert!(!store.quarantine_remove("w1").await.unwrap());
        assert!(store.quarantine_get("w1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn incident_record_dedups_on_fingerprint() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, Duration::from_secs(3600)).await;

        let incident = WatcherIncident {
            severity: RiskLevel::High,
            event_type: ClaimEventType::FalseClaim,
            worker_id: "w1".to_string(),
            claim: "deployed api v2".to_string(),
            environment: "prd".to_string(),
            sent_at: Utc::now(),
            acknowledged_at: None,
            fingerprint: "FALSE_CLAIM:w1:12345".to_string(),
        };
        assert!(store.incident_record(&incident).await.unwrap());
        assert!(!store.incident_record(&incident).await.unwrap());

        let all = store.incidents_list(None, 10).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].event_type, ClaimEventType::FalseClaim);

        let high = store
            .incidents_list(Some(RiskLevel::High), 10)
            .await
            .unwrap();
        assert_eq!(high.len(), 1);
        let critical = store
            .incidents_list(Some(RiskLevel::Critical), 10)
            .await
            .unwrap();
        assert!(critical.is_empty());
    }
}
