//! Postgres execution-audit table
//!
//! The table is append-only. A trigger raises on UPDATE and DELETE so
//! not even a privileged application bug can rewrite history.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use wingman_types::ExecutionAuditEntry;

use crate::error::AuditError;

const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS execution_audit (
        execution_id TEXT PRIMARY KEY,
        approval_id TEXT NOT NULL,
        worker_id TEXT NOT NULL,
        command TEXT NOT NULL,
        environment TEXT NOT NULL,
        exit_code INTEGER NOT NULL,
        output TEXT NOT NULL,
        duration_ms BIGINT NOT NULL,
        token_hash TEXT NOT NULL,
        artifacts JSONB NOT NULL DEFAULT '[]',
        error TEXT,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_execution_audit_worker
        ON execution_audit (worker_id, created_at)
    "#,
    r#"
    CREATE OR REPLACE FUNCTION execution_audit_reject_mutation()
    RETURNS trigger AS $$
    BEGIN
        RAISE EXCEPTION 'execution_audit is append-only';
    END;
    $$ LANGUAGE plpgsql
    "#,
    r#"
    DROP TRIGGER IF EXISTS execution_audit_append_only ON execution_audit
    "#,
    r#"
    CREATE TRIGGER execution_audit_append_only
        BEFORE UPDATE OR DELETE ON execution_audit
        FOR EACH ROW EXECUTE FUNCTION execution_audit_reject_mutation()
    "#,
];

#[derive(Debug, Clone)]
pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub async fn connect(url: &str) -> Result<Self, AuditError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await
            .map_err(AuditError::database)?;
        let store = Self { pool };
        store.initialize_schema().await?;
        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<(), AuditError> {
        for stmt in SCHEMA_STATEMENTS {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(AuditError::database)?;
        }
        Ok(())
    }

    pub async fn append(&self, entry: &ExecutionAuditEntry) -> Result<(), AuditError> {
        let artifacts = serde_json::to_value(&entry.artifacts)
            .map_err(|e| AuditError::InvalidRecord(e.to_string()))?;
        sqlx::query(
            r#"
            INSERT INTO execution_audit
                (execution_id, approval_id, worker_id, command, environment,
                 exit_code, output, duration_ms, token_hash, artifacts, error, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(&entry.execution_id)
        .bind(&entry.approval_id)
        .bind(&entry.worker_id)
        .bind(&entry.command)
        .bind(entry.environment.as_str())
        .bind(entry.exit_code)
        .bind(&entry.output)
        .bind(entry.duration_ms)
        .bind(&entry.token_hash)
        .bind(artifacts)
        .bind(&entry.error)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(AuditError::database)?;
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), AuditError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(AuditError::database)?;
        Ok(())
    }
}
