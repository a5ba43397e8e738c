//! Pre-flight instruction check

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use wingman_types::RiskLevel;
use wingman_validation::{Recommendation, ValidationInput};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub instruction: String,
    #[serde(default)]
    pub task_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PolicyCheck {
    pub name: String,
    pub score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub concerns: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub approved: bool,
    pub score: u8,
    pub recommendation: Recommendation,
    pub risk_level: RiskLevel,
    pub missing_sections: Vec<String>,
    pub policy_checks: Vec<PolicyCheck>,
    pub reasoning: String,
}

/// Runs the validation pipeline against a free-text instruction with
/// no side effects. Workers call this before submitting for approval.
pub async fn check_instruction(
    State(state): State<AppState>,
    Json(body): Json<CheckRequest>,
) -> ApiResult<Json<CheckResponse>> {
    if body.instruction.trim().is_empty() {
        return Err(ApiError::BadRequest("instruction is required".to_string()));
    }

    let task_name = body.task_name.unwrap_or_else(|| "preflight".to_string());
    let input = ValidationInput::new(task_name, body.instruction, state.deployment_env);
    let report = state.pipeline.run(&input).await;

    let missing_sections = report
        .validator_scores
        .get("content_quality")
        .and_then(|v| v.get("details"))
        .and_then(|d| d.get("missing_sections"))
        .and_then(|m| m.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|s| s.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    let policy_checks = report
        .validator_scores
        .iter()
        .map(|(name, value)| PolicyCheck {
            name: name.clone(),
            score: value
                .get("score")
                .and_then(|s| s.as_u64())
                .unwrap_or_default() as u8,
            risk_level: value
                .get("risk_level")
                .and_then(|r| serde_json::from_value(r.clone()).ok()),
            concerns: value
                .get("concerns")
                .and_then(|c| c.as_array())
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|s| s.as_str().map(String::from))
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect();

    Ok(Json(CheckResponse {
        approved: report.recommendation == Recommendation::Approve,
        score: report.overall_score,
        recommendation: report.recommendation,
        risk_level: report.risk_level,
        missing_sections,
        policy_checks,
        reasoning: report.reasoning,
    }))
}
