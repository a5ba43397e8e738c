//! Execution and health handlers
//!
//! A token is consumed the moment it is presented with a valid
//! signature, before any policy check. Every consumed token produces
//! exactly one audit record, whether the command ran or the request
//! was refused after consumption.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wingman_token::{token_hash, TokenError};
use wingman_types::{DeploymentEnv, ExecutionAuditEntry, TokenClaims};

use crate::error::{GatewayError, GatewayResult};
use crate::scope::validate_scope;
use crate::state::GatewayState;

pub const TOKEN_HEADER: &str = "x-capability-token";

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub command: String,
    /// Cross-check against the token's approval binding.
    #[serde(default)]
    pub approval_id: Option<String>,
    /// Cross-check against the token's environment binding.
    #[serde(default)]
    pub environment: Option<DeploymentEnv>,
}

#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub success: bool,
    pub execution_id: String,
    pub approval_id: String,
    pub exit_code: i32,
    pub output: String,
    pub duration_ms: u64,
    pub timed_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// POST /gateway/execute
pub async fn execute_command(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(body): Json<ExecuteRequest>,
) -> GatewayResult<Json<ExecuteResponse>> {
    let token = headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| GatewayError::Unauthorized("capability token required".to_string()))?;

    let command = body.command.trim().to_string();
    if command.is_empty() {
        return Err(GatewayError::BadRequest("command is required".to_string()));
    }

    let now = Utc::now();
    let claims = state.tokens.verify(token, now).map_err(|e| match e {
        TokenError::Expired => GatewayError::Unauthorized("token expired".to_string()),
        _ => GatewayError::Unauthorized("invalid token".to_string()),
    })?;

    // Single use. The jti is burned here; a refusal below does not
    // un-burn it.
    if !state.replay.consume(&claims.jti) {
        tracing::warn!(jti = %claims.jti, worker_id = %claims.worker_id, "token replay detected");
        return Err(GatewayError::Unauthorized(
            "token replay detected".to_string(),
        ));
    }

    let token_digest = token_hash(token);

    if let Some(approval_id) = &body.approval_id {
        if approval_id != &claims.approval_id {
            return deny(&state, &claims, &command, &token_digest,
                "approval id does not match token").await;
        }
    }

    if let Some(env) = body.environment {
        if env != claims.environment {
            return deny(&state, &claims, &command, &token_digest,
                "environment does not match token").await;
        }
    }

    if !state.environment_allowed(claims.environment) {
        return deny(&state, &claims, &command, &token_digest,
            "environment not served by this gateway").await;
    }

    if let Err(reason) = validate_scope(&claims.allowed_commands, &command, claims.environment) {
        return deny(&state, &claims, &command, &token_digest, &reason).await;
    }

    tracing::info!(
        approval_id = %claims.approval_id,
        worker_id = %claims.worker_id,
        environment = %claims.environment,
        "executing approved command"
    );

    let outcome = state.executor.run(&command).await;

    let mut entry = ExecutionAuditEntry::new(
        claims.approval_id.clone(),
        claims.worker_id.clone(),
        command,
        claims.environment,
        token_digest,
    );
    entry.exit_code = outcome.exit_code;
    entry.output = outcome.output.clone();
    entry.duration_ms = outcome.duration_ms as i64;
    entry.error = outcome.error.clone();

    state
        .audit
        .append(&entry)
        .await
        .map_err(|e| GatewayError::Internal(format!("audit write failed: {e}")))?;

    let success = outcome.exit_code == 0 && !outcome.timed_out;
    if !success {
        tracing::warn!(
            approval_id = %claims.approval_id,
            exit_code = outcome.exit_code,
            timed_out = outcome.timed_out,
            "command finished unsuccessfully"
        );
    }

    Ok(Json(ExecuteResponse {
        success,
        execution_id: entry.execution_id,
        approval_id: entry.approval_id,
        exit_code: outcome.exit_code,
        output: outcome.output,
        duration_ms: outcome.duration_ms,
        timed_out: outcome.timed_out,
        error: outcome.error,
    }))
}

/// Records the refused attempt against the consumed token, then
/// surfaces a 403.
async fn deny(
    state: &GatewayState,
    claims: &TokenClaims,
    command: &str,
    token_digest: &str,
    reason: &str,
) -> GatewayResult<Json<ExecuteResponse>> {
    tracing::warn!(
        approval_id = %claims.approval_id,
        worker_id = %claims.worker_id,
        %reason,
        "execution refused"
    );

    let mut entry = ExecutionAuditEntry::new(
        claims.approval_id.clone(),
        claims.worker_id.clone(),
        command.to_string(),
        claims.environment,
        token_digest.to_string(),
    );
    entry.error = Some(reason.to_string());

    state
        .audit
        .append(&entry)
        .await
        .map_err(|e| GatewayError::Internal(format!("audit write failed: {e}")))?;

    Err(GatewayError::Forbidden(reason.to_string()))
}

#[derive(Debug, Serialize)]
pub struct GatewayHealth {
    pub status: String,
    pub version: String,
    pub allowed_environments: Vec<DeploymentEnv>,
    pub audit_backend: String,
    pub used_tokens: usize,
    pub timestamp: DateTime<Utc>,
}

/// GET /health
pub async fn health(State(state): State<GatewayState>) -> Json<GatewayHealth> {
    let audit_backend = if state.audit.has_database() {
        "postgres"
    } else {
        "jsonl"
    };
    Json(GatewayHealth {
        status: "healthy".to_string(),
        version: state.version.clone(),
        allowed_environments: state.allowed_environments.as_ref().clone(),
        audit_backend: audit_backend.to_string(),
        used_tokens: state.replay.len(),
        timestamp: Utc::now(),
    })
}
