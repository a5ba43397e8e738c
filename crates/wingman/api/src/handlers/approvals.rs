//! Approval lifecycle handlers
//!
//! `request_approval` routes each incoming operation to exactly one of
//! AUTO_REJECTED (quarantined worker), REJECTED (validation pipeline),
//! AUTO_APPROVED (low risk) or PENDING (human queue, fingerprint
//! deduped). The decide handlers are idempotent; a terminal row is
//! returned unchanged whatever the requested decision was.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use wingman_store::Decision;
use wingman_types::{ApprovalRequest, ApprovalStatus, DeploymentEnv, RiskLevel};
use wingman_validation::{CodeScanner, ValidationInput};

use crate::auth::{authorize, Role};
use crate::error::{ApiError, ApiResult};
use crate::risk::{assess_risk, RiskAssessment};
use crate::state::AppState;

const DEFAULT_PENDING_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct ApprovalRequestBody {
    pub worker_id: String,
    pub task_name: String,
    pub instruction: String,
    pub deployment_env: DeploymentEnv,
}

#[derive(Debug, Serialize)]
pub struct RiskBody {
    pub level: RiskLevel,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct ApprovalResponse {
    pub needs_approval: bool,
    pub status: ApprovalStatus,
    pub request: ApprovalRequest,
    pub risk: RiskBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deduped: Option<bool>,
}

impl ApprovalResponse {
    fn terminal(request: ApprovalRequest, risk: RiskAssessment) -> Self {
        Self {
            needs_approval: false,
            status: request.status,
            request,
            risk: RiskBody {
                level: risk.level,
                reason: risk.reason,
            },
            deduped: None,
        }
    }
}

pub async fn request_approval(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ApprovalRequestBody>,
) -> ApiResult<Json<ApprovalResponse>> {
    authorize(&state.keys, &headers, Role::Request)?;

    if body.worker_id.trim().is_empty() {
        return Err(ApiError::BadRequest("worker_id is required".to_string()));
    }
    if body.task_name.trim().is_empty() {
        return Err(ApiError::BadRequest("task_name is required".to_string()));
    }
    if body.instruction.trim().is_empty() {
        return Err(ApiError::BadRequest("instruction is required".to_string()));
    }

    // Quarantined workers never reach validation.
    if let Some(entry) = state.store.quarantine_get(&body.worker_id).await? {
        tracing::warn!(
            worker_id = %body.worker_id,
            quarantined_at = %entry.quarantined_at,
            "rejecting request from quarantined worker"
        );
        let request = ApprovalRequest::new(
            body.worker_id,
            body.task_name,
            body.instruction,
            body.deployment_env,
            RiskLevel::High,
            "worker quarantined",
            ApprovalStatus::AutoRejected,
        );
        let outcome = state.store.create(request).await?;
        return Ok(Json(ApprovalResponse::terminal(
            outcome.request,
            RiskAssessment {
                level: RiskLevel::High,
                reason: "worker quarantined".to_string(),
            },
        )));
    }

    let input = ValidationInput::new(
        body.task_name.clone(),
        body.instruction.clone(),
        body.deployment_env,
    );
    let report = state.pipeline.run(&input).await;
    let validation_json = serde_json::to_value(&report)
        .map_err(|e| ApiError::Internal(format!("validation report: {e}")))?;

    // Secrets never reach the human queue; anything else destructive
    // is still a human call and stays eligible for PENDING below.
    if CodeScanner::contains_secret(&body.instruction) {
        let reason = "instruction contains secret material";
        let mut request = ApprovalRequest::new(
            body.worker_id,
            body.task_name,
            body.instruction,
            body.deployment_env,
            RiskLevel::Critical,
            reason,
            ApprovalStatus::Rejected,
        );
        request.decided_by = Some("validation_pipeline".to_string());
        request.validation_results = Some(validation_json);
        let outcome = state.store.create(request).await?;
        return Ok(Json(ApprovalResponse::terminal(
            outcome.request,
            RiskAssessment {
                level: RiskLevel::Critical,
                reason: reason.to_string(),
            },
        )));
    }

    let assessment = assess_risk(
        &body.instruction,
        body.deployment_env,
        state.require_approval,
    );
    // Validation risk and heuristic risk combine as max rank.
    let risk_level = assessment.level.max(report.risk_level);

    if risk_level == RiskLevel::Low {
        let mut request = ApprovalRequest::new(
            body.worker_id,
            body.task_name,
            body.instruction,
            body.deployment_env,
            risk_level,
            assessment.reason.clone(),
            ApprovalStatus::AutoApproved,
        );
        request.validation_results = Some(validation_json);
        let outcome = state.store.create(request).await?;
        return Ok(Json(ApprovalResponse::terminal(
            outcome.request,
            assessment,
        )));
    }

    let mut request = ApprovalRequest::new(
        body.worker_id,
        body.task_name,
        body.instruction,
        body.deployment_env,
        risk_level,
        assessment.reason.clone(),
        ApprovalStatus::Pending,
    );
    request.validation_results = Some(validation_json);
    let outcome = state.store.create(request).await?;
    tracing::info!(
        request_id = %outcome.request.request_id,
        worker_id = %outcome.request.worker_id,
        risk = %risk_level,
        deduped = outcome.deduped,
        "approval request queued"
    );
    Ok(Json(ApprovalResponse {
        needs_approval: true,
        status: outcome.request.status,
        request: outcome.request,
        risk: RiskBody {
            level: risk_level,
            reason: assessment.reason,
        },
        deduped: Some(outcome.deduped),
    }))
}

#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub pending: Vec<ApprovalRequest>,
    pub count: usize,
}

/// Lists the human queue. Stale PENDING rows are expired first so the
/// listing never shows rows past their TTL.
pub async fn list_pending(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PendingQuery>,
) -> ApiResult<Json<PendingResponse>> {
    authorize(&state.keys, &headers, Role::Read)?;

    let expired = state.store.expire_stale_pending().await?;
    if expired > 0 {
        tracing::info!(expired, "expired stale pending approvals");
    }

    let limit = query.limit.unwrap_or(DEFAULT_PENDING_LIMIT).clamp(1, 500);
    let pending = state.store.list_pending(limit).await?;
    let count = pending.len();
    Ok(Json(PendingResponse { pending, count }))
}

pub async fn get_approval(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(request_id): Path<String>,
) -> ApiResult<Json<ApprovalRequest>> {
    authorize(&state.keys, &headers, Role::Read)?;
    let request = state
        .store
        .get(&request_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("approval request {request_id}")))?;
    Ok(Json(request))
}

#[derive(Debug, Deserialize)]
pub struct DecisionBody {
    pub decided_by: String,
    #[serde(default)]
    pub note: Option<String>,
}

pub async fn approve_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(request_id): Path<String>,
    Json(body): Json<DecisionBody>,
) -> ApiResult<Json<ApprovalRequest>> {
    decide(state, headers, request_id, Decision::Approve, body).await
}

pub async fn reject_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(request_id): Path<String>,
    Json(body): Json<DecisionBody>,
) -> ApiResult<Json<ApprovalRequest>> {
    decide(state, headers, request_id, Decision::Reject, body).await
}

async fn decide(
    state: AppState,
    headers: HeaderMap,
    request_id: String,
    decision: Decision,
    body: DecisionBody,
) -> ApiResult<Json<ApprovalRequest>> {
    authorize(&state.keys, &headers, Role::Decide)?;
    if body.decided_by.trim().is_empty() {
        return Err(ApiError::BadRequest("decided_by is required".to_string()));
    }

    let request = state
        .store
        .decide(&request_id, decision, &body.decided_by, body.note.as_deref())
        .await?;
    tracing::info!(
        request_id = %request.request_id,
        status = %request.status,
        decided_by = %body.decided_by,
        "approval decision recorded"
    );
    Ok(Json(request))
}
