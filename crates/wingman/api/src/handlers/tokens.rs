//! Capability token minting
//!
//! Tokens are minted against a terminal-approved request only, scoped
//! to one command and the approval's environment. The gateway verifies
//! and consumes them; this handler never logs the token itself.

use axum::{extract::State, http::HeaderMap, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wingman_types::DeploymentEnv;

use crate::auth::{authorize, Role};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub approval_id: String,
    pub command: String,
    #[serde(default)]
    pub environment: Option<DeploymentEnv>,
    #[serde(default)]
    pub worker_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub jti: String,
}

pub async fn mint_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<TokenRequest>,
) -> ApiResult<Json<TokenResponse>> {
    authorize(&state.keys, &headers, Role::Request)?;

    if body.command.trim().is_empty() {
        return Err(ApiError::BadRequest("command is required".to_string()));
    }

    let approval = state
        .store
        .get(&body.approval_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("approval request {}", body.approval_id)))?;

    if !approval.status.allows_execution() {
        return Err(ApiError::PolicyDenied(format!(
            "approval {} is {}, not approved",
            approval.request_id, approval.status
        )));
    }

    if let Some(environment) = body.environment {
        if environment != approval.deployment_env {
            return Err(ApiError::PolicyDenied(
                "environment does not match approval".to_string(),
            ));
        }
    }

    let worker_id = body.worker_id.unwrap_or_else(|| approval.worker_id.clone());
    let command = body.command.trim().to_string();
    let (token, claims) = state
        .tokens
        .mint(
            &approval.request_id,
            &worker_id,
            approval.deployment_env,
            vec![command],
        )
        .map_err(|e| ApiError::Internal(format!("token minting: {e}")))?;

    tracing::info!(
        approval_id = %approval.request_id,
        worker_id = %worker_id,
        jti = %claims.jti,
        "capability token issued"
    );
    Ok(Json(TokenResponse {
        token,
        expires_at: claims.expires_at(),
        jti: claims.jti,
    }))
}
