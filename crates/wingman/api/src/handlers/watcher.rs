//! Watcher alert reading and quarantine release

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use wingman_types::{RiskLevel, WatcherIncident};

use crate::auth::{authorize, Role};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const DEFAULT_ALERT_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    pub severity: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    pub alerts: Vec<WatcherIncident>,
}

pub async fn list_alerts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AlertsQuery>,
) -> ApiResult<Json<AlertsResponse>> {
    authorize(&state.keys, &headers, Role::Read)?;

    let severity = query
        .severity
        .as_deref()
        .map(|s| {
            s.parse::<RiskLevel>()
                .map_err(|e| ApiError::BadRequest(e.to_string()))
        })
        .transpose()?;

    let limit = query.limit.unwrap_or(DEFAULT_ALERT_LIMIT).clamp(1, 500);
    let alerts = state.store.incidents_list(severity, limit).await?;
    Ok(Json(AlertsResponse { alerts }))
}

#[derive(Debug, Deserialize)]
pub struct ReleaseBody {
    pub released_by: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReleaseResponse {
    pub success: bool,
    pub message: String,
}

pub async fn release_worker(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(worker_id): Path<String>,
    Json(body): Json<ReleaseBody>,
) -> ApiResult<Json<ReleaseResponse>> {
    authorize(&state.keys, &headers, Role::Decide)?;
    if body.released_by.trim().is_empty() {
        return Err(ApiError::BadRequest("released_by is required".to_string()));
    }

    let removed = state.store.quarantine_remove(&worker_id).await?;
    if removed {
        tracing::info!(
            worker_id = %worker_id,
            released_by = %body.released_by,
            reason = body.reason.as_deref().unwrap_or(""),
            "worker released from quarantine"
        );
        Ok(Json(ReleaseResponse {
            success: true,
            message: format!("worker {worker_id} released"),
        }))
    } else {
        Ok(Json(ReleaseResponse {
            success: false,
            message: format!("worker {worker_id} is not quarantined"),
        }))
    }
}
