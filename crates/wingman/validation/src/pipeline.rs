//! ValidationPipeline - profile-weighted ensemble with ordered rules
//!
//! Decision rules, first match wins:
//! 1. any active validator below the hard floor rejects
//! 2. any secret found by the scanner rejects at CRITICAL
//! 3. weighted score with every active validator at or above the
//!    profile threshold and combined risk LOW approves
//! 4. everything else goes to manual review

use serde_json::json;
use wingman_types::RiskLevel;

use crate::dependency::DependencyAnalyzer;
use crate::profile::{Profile, HARD_FLOOR};
use crate::quality::ContentQualityValidator;
use crate::scanner::CodeScanner;
use crate::score::{Recommendation, ValidationInput, ValidationReport, Validator, ValidatorScore};
use crate::semantic::{SemanticAnalyzer, SemanticConfig};

/// Owns one instance of each validator and runs the profile-selected
/// subset against an instruction.
pub struct ValidationPipeline {
    scanner: CodeScanner,
    quality: ContentQualityValidator,
    dependency: DependencyAnalyzer,
    semantic: SemanticAnalyzer,
}

impl ValidationPipeline {
    pub fn new(semantic_config: SemanticConfig) -> Self {
        Self {
            scanner: CodeScanner::new(),
            quality: ContentQualityValidator::new(),
            dependency: DependencyAnalyzer::new(),
            semantic: SemanticAnalyzer::new(semantic_config),
        }
    }

    /// Heuristic-only pipeline, fully deterministic. Used by tests and
    /// by deployments without an LLM endpoint.
    pub fn offline() -> Self {
        Self::new(SemanticConfig::disabled())
    }

    fn validators(&self) -> [&dyn Validator; 4] {
        [&self.scanner, &self.quality, &self.dependency, &self.semantic]
    }

    /// Runs the active validators and applies the decision rules.
    pub async fn run(&self, input: &ValidationInput) -> ValidationReport {
        let profile = Profile::detect(&input.task_name, &input.instruction);
        self.run_with_profile(input, profile).await
    }

    pub async fn run_with_profile(
        &self,
        input: &ValidationInput,
        profile: Profile,
    ) -> ValidationReport {
        let mut scores: Vec<ValidatorScore> = Vec::new();
        for validator in self.validators() {
            if profile.weight_of(validator.name()).is_some() {
                scores.push(validator.validate(input).await);
            }
        }

        let mut validator_scores = serde_json::Map::new();
        for score in &scores {
            validator_scores.insert(
                score.validator.clone(),
                serde_json::to_value(score).unwrap_or_else(|_| json!(score.score)),
            );
        }

        let risk_level = scores
            .iter()
            .filter_map(|s| s.risk_level)
            .max()
            .unwrap_or(RiskLevel::Low);

        let secrets_found = scores
            .iter()
            .find(|s| s.validator == "code_scanner")
            .map(|s| s.details["secrets_found"].as_bool().unwrap_or(false))
            .unwrap_or(false);

        let weighted: f64 = scores
            .iter()
            .map(|s| {
                let weight = profile.weight_of(&s.validator).unwrap_or(0.0);
                f64::from(s.score) * weight
            })
            .sum();
        let overall_score = weighted.round().clamp(0.0, 100.0) as u8;

        let floor_breach = scores.iter().find(|s| s.score < HARD_FLOOR);

        let (recommendation, risk_level, reasoning) = if let Some(breach) = floor_breach {
            (
                Recommendation::Reject,
                risk_level,
                format!(
                    "{} scored {} which is below the floor of {}",
                    breach.validator, breach.score, HARD_FLOOR
                ),
            )
        } else if secrets_found {
            (
                Recommendation::Reject,
                RiskLevel::Critical,
                "secret material detected in instruction".to_string(),
            )
        } else if scores
            .iter()
            .all(|s| s.score >= profile.auto_approve_threshold)
            && risk_level == RiskLevel::Low
        {
            (
                Recommendation::Approve,
                risk_level,
                format!(
                    "all validators at or above {} with low risk",
                    profile.auto_approve_threshold
                ),
            )
        } else {
            let lagging: Vec<&str> = scores
                .iter()
                .filter(|s| s.score < profile.auto_approve_threshold)
                .map(|s| s.validator.as_str())
                .collect();
            let reason = if lagging.is_empty() {
                format!("combined risk is {risk_level}, human review required")
            } else {
                format!("below approval threshold: {}", lagging.join(", "))
            };
            (Recommendation::ManualReview, risk_level, reason)
        };

        tracing::debug!(
            profile = %profile.kind,
            overall_score,
            recommendation = %recommendation,
            risk = %risk_level,
            "validation pipeline complete"
        );

        ValidationReport {
            overall_score,
            recommendation,
            risk_level,
            validator_scores,
            profile: profile.kind.as_str().to_string(),
            reasoning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileKind;
    use wingman_types::DeploymentEnv;

    fn input(task: &str, text: &str, env: DeploymentEnv) -> ValidationInput {
        ValidationInput::new(task, text, env)
    }

    fn full_framework_instruction(extra: &str) -> String {
        let mut text = String::new();
        for section in crate::quality::FRAMEWORK_SECTIONS {
            text.push_str(&format!(
                "## {}\n- run `kubectl get pods` and verify 3 replicas within 300 s \
                 at https://dash.internal with 0 retries outstanding for this change\n\
                 1. check the rollout\n2. confirm health\n\n",
                section
            ));
        }
        text.push_str(extra);
        text
    }

    #[tokio::test]
    async fn clean_operational_probe_auto_approves() {
        let pipeline = ValidationPipeline::offline();
        let report = pipeline
            .run(&input(
                "health-check",
                "check service status with curl http://localhost:8080/health and tail logs",
                DeploymentEnv::Dev,
            ))
            .await;
        assert_eq!(report.profile, "operational");
        assert_eq!(report.recommendation, Recommendation::Approve);
        assert_eq!(report.risk_level, RiskLevel::Low);
        assert!(report.overall_score >= 85);
    }

    #[tokio::test]
    async fn secret_rejects_at_critical() {
        let pipeline = ValidationPipeline::offline();
        let report = pipeline
            .run(&input(
                "ops",
                "check status with api_key=deadbeef1234 against the gateway",
                DeploymentEnv::Dev,
            ))
            .await;
        assert_eq!(report.recommendation, Recommendation::Reject);
        assert_eq!(report.risk_level, RiskLevel::Critical);
    }

    #[tokio::test]
    async fn hard_floor_breach_rejects_before_anything_else() {
        let pipeline = ValidationPipeline::offline();
        // Stacked critical operations push the scanner below the floor.
        let report = pipeline
            .run(&input(
                "cleanup",
                "rm -rf /data && drop table users; truncate audit; mkfs.ext4 /dev/sda",
                DeploymentEnv::Prd,
            ))
            .await;
        assert_eq!(report.recommendation, Recommendation::Reject);
        assert!(report.reasoning.contains("floor"));
    }

    #[tokio::test]
    async fn sparse_deployment_instruction_goes_to_review() {
        let pipeline = ValidationPipeline::offline();
        let report = pipeline
            .run(&input(
                "deploy-api",
                full_framework_instruction("deploy the billing release to the api container").as_str(),
                DeploymentEnv::Test,
            ))
            .await;
        assert_eq!(report.profile, "deployment");
        // Dependency blast radius keeps combined risk above LOW.
        assert_eq!(report.recommendation, Recommendation::ManualReview);
    }

    #[tokio::test]
    async fn unknown_profile_defaults_to_deployment() {
        let pipeline = ValidationPipeline::offline();
        let report = pipeline
            .run(&input("mystery", "frobnicate the widget", DeploymentEnv::Dev))
            .await;
        assert_eq!(report.profile, "deployment");
    }

    #[tokio::test]
    async fn report_is_deterministic_offline() {
        let pipeline = ValidationPipeline::offline();
        let probe = input(
            "deploy",
            &full_framework_instruction("update the postgres schema"),
            DeploymentEnv::Test,
        );
        let a = pipeline.run(&probe).await;
        let b = pipeline.run(&probe).await;
        assert_eq!(a.overall_score, b.overall_score);
        assert_eq!(a.recommendation, b.recommendation);
        assert_eq!(a.risk_level, b.risk_level);
    }

    #[tokio::test]
    async fn explicit_profile_override_is_honored() {
        let pipeline = ValidationPipeline::offline();
        let report = pipeline
            .run_with_profile(
                &input("deploy", "deploy the service", DeploymentEnv::Test),
                Profile::operational(),
            )
            .await;
        assert_eq!(report.profile, ProfileKind::Operational.as_str());
        // Only scanner and semantic scores appear.
        assert_eq!(report.validator_scores.len(), 2);
    }
}
