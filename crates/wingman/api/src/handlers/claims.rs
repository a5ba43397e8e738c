//! Claim logging and verification
//!
//! Both endpoints append to the claims JSONL stream the watcher tails.

use std::time::Instant;

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wingman_types::{ClaimRecord, ClaimStatus};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::verifier::{verify_claim, VERIFIER_NAME};

#[derive(Debug, Deserialize)]
pub struct LogClaimRequest {
    pub worker_id: String,
    pub claim: String,
    /// Self-reported verdict; unverified until the watcher or /verify
    /// says otherwise.
    #[serde(default)]
    pub status: Option<ClaimStatus>,
    #[serde(default)]
    pub environment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogClaimResponse {
    pub status: &'static str,
    pub entry: ClaimRecord,
}

pub async fn log_claim(
    State(state): State<AppState>,
    Json(body): Json<LogClaimRequest>,
) -> ApiResult<Json<LogClaimResponse>> {
    if body.worker_id.trim().is_empty() {
        return Err(ApiError::BadRequest("worker_id is required".to_string()));
    }
    if body.claim.trim().is_empty() {
        return Err(ApiError::BadRequest("claim is required".to_string()));
    }

    let mut record = ClaimRecord::new(
        body.worker_id,
        body.claim,
        body.status.unwrap_or(ClaimStatus::Unverifiable),
    );
    record.environment = body.environment;

    state
        .claims
        .append(&record)
        .await
        .map_err(|e| ApiError::Internal(format!("claims log: {e}")))?;

    tracing::debug!(worker_id = %record.worker_id, status = %record.status, "claim logged");
    Ok(Json(LogClaimResponse {
        status: "logged",
        entry: record,
    }))
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub claim: String,
    #[serde(default)]
    pub use_enhanced: bool,
    #[serde(default)]
    pub worker_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub verdict: ClaimStatus,
    pub verifier: &'static str,
    pub processing_time_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub details: serde_json::Value,
}

/// Runs the deterministic verifier and appends the verdict to the
/// claims stream so the watcher sees verifier output alongside worker
/// self-reports.
pub async fn verify(
    State(state): State<AppState>,
    Json(body): Json<VerifyRequest>,
) -> ApiResult<Json<VerifyResponse>> {
    let started = Instant::now();
    let report = verify_claim(&state.store, &body.claim, body.use_enhanced).await?;

    let worker_id = body.worker_id.unwrap_or_else(|| "unattributed".to_string());
    let record = ClaimRecord::new(worker_id, body.claim, report.verdict);
    state
        .claims
        .append(&record)
        .await
        .map_err(|e| ApiError::Internal(format!("claims log: {e}")))?;

    Ok(Json(VerifyResponse {
        verdict: report.verdict,
        verifier: VERIFIER_NAME,
        processing_time_ms: started.elapsed().as_millis() as u64,
        timestamp: Utc::now(),
        details: report.details,
    }))
}
