//! Health and component self-checks

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;
use crate::verifier::VERIFIER_NAME;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub verifiers: Vec<&'static str>,
    pub database: DatabaseHealth,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
    pub status: String,
    pub using_fallback: bool,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.store.ping().await {
        Ok(()) => DatabaseHealth {
            status: "ok".to_string(),
            using_fallback: state.store.using_fallback(),
        },
        Err(e) => {
            tracing::warn!(error = %e, "approval database unreachable");
            DatabaseHealth {
                status: "unreachable".to_string(),
                using_fallback: state.store.using_fallback(),
            }
        }
    };

    let status = if database.status == "ok" {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: state.version.clone(),
        verifiers: vec![VERIFIER_NAME],
        database,
        timestamp: Utc::now(),
    })
}
