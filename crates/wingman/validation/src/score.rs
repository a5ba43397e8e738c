//! Core validation types shared by every validator

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use wingman_types::{DeploymentEnv, RiskLevel};

/// The text a validator inspects, with just enough context to judge it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationInput {
    pub task_name: String,
    pub instruction: String,
    pub deployment_env: DeploymentEnv,
}

impl ValidationInput {
    pub fn new(
        task_name: impl Into<String>,
        instruction: impl Into<String>,
        deployment_env: DeploymentEnv,
    ) -> Self {
        Self {
            task_name: task_name.into(),
            instruction: instruction.into(),
            deployment_env,
        }
    }
}

/// One validator's verdict.
///
/// `risk_level` is `None` for validators that only score quality and
/// have no opinion about risk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorScore {
    pub validator: String,
    pub score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub concerns: Vec<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

impl ValidatorScore {
    pub fn new(validator: impl Into<String>, score: u8) -> Self {
        Self {
            validator: validator.into(),
            score: score.min(100),
            risk_level: None,
            concerns: Vec::new(),
            details: serde_json::Value::Null,
        }
    }

    pub fn with_risk(mut self, risk: RiskLevel) -> Self {
        self.risk_level = Some(risk);
        self
    }

    pub fn with_concerns(mut self, concerns: Vec<String>) -> Self {
        self.concerns = concerns;
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// Final recommendation for an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Approve,
    ManualReview,
    Reject,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Approve => "APPROVE",
            Recommendation::ManualReview => "MANUAL_REVIEW",
            Recommendation::Reject => "REJECT",
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate output of a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub overall_score: u8,
    pub recommendation: Recommendation,
    pub risk_level: RiskLevel,
    pub validator_scores: serde_json::Map<String, serde_json::Value>,
    pub profile: String,
    pub reasoning: String,
}

/// A single stage of the validation ensemble.
///
/// Validators are infallible. Anything that can go wrong inside one
/// (a failed HTTP call, a parse error) must degrade to a conservative
/// score, never to an error.
#[async_trait]
pub trait Validator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn validate(&self, input: &ValidationInput) -> ValidatorScore;
}
