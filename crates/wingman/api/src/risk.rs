//! Request risk heuristic
//!
//! A fast, regex-only pass that decides whether a request can skip the
//! human queue. This runs before fingerprint dedup so equal-risk
//! retries of the same request deduplicate cleanly. The full validation
//! pipeline runs separately; this heuristic only picks the queue.

use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};
use wingman_types::{DeploymentEnv, RiskLevel};

use wingman_validation::CodeScanner;

fn destructive_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        RegexBuilder::new(
            r"\b(delete|drop|truncate|destroy|wipe|purge|rm\s+-rf|force|terminate|shutdown)\b",
        )
        .case_insensitive(true)
        .build()
        .unwrap_or_else(|e| panic!("destructive regex: {e}"))
    })
}

fn change_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        RegexBuilder::new(r"\b(migrat(e|ion)|schema|deploy(ment)?|release|rollout|alter)\b")
            .case_insensitive(true)
            .build()
            .unwrap_or_else(|e| panic!("change regex: {e}"))
    })
}

/// Risk level plus the sentence that goes into `risk_reason`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub reason: String,
}

/// Heuristic queue selection. Production traffic is high risk by
/// default; `require_approval = false` drops that rule in dev.
pub fn assess_risk(
    instruction: &str,
    deployment_env: DeploymentEnv,
    require_approval: bool,
) -> RiskAssessment {
    if CodeScanner::contains_secret(instruction) {
        return RiskAssessment {
            level: RiskLevel::High,
            reason: "instruction contains secret material".to_string(),
        };
    }
    if CodeScanner::contains_critical(instruction) || destructive_regex().is_match(instruction) {
        return RiskAssessment {
            level: RiskLevel::High,
            reason: "destructive operation keywords".to_string(),
        };
    }
    if deployment_env.is_production() && require_approval {
        return RiskAssessment {
            level: RiskLevel::High,
            reason: "production environment requires approval".to_string(),
        };
    }
    if change_regex().is_match(instruction) {
        return RiskAssessment {
            level: RiskLevel::Medium,
            reason: "deployment or schema change keywords".to_string(),
        };
    }
    RiskAssessment {
        level: RiskLevel::Low,
        reason: "no elevated risk markers".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_dev_request_is_low() {
        let assessment = assess_risk("show docker logs of wingman-api", DeploymentEnv::Dev, true);
        assert_eq!(assessment.level, RiskLevel::Low);
    }

    #[test]
    fn production_is_high_by_default() {
        let assessment = assess_risk("show docker logs", DeploymentEnv::Prd, true);
        assert_eq!(assessment.level, RiskLevel::High);
    }

    #[test]
    fn disabling_the_gate_lowers_production() {
        let assessment = assess_risk("show docker logs", DeploymentEnv::Prd, false);
        assert_eq!(assessment.level, RiskLevel::Low);
    }

    #[test]
    fn destructive_keywords_are_high_everywhere() {
        let assessment = assess_risk("drop the staging cache", DeploymentEnv::Dev, true);
        assert_eq!(assessment.level, RiskLevel::High);
    }

    #[test]
    fn secrets_are_high_with_a_secret_reason() {
        let assessment = assess_risk(
            "run with api_key=abcdef123456 in the env",
            DeploymentEnv::Dev,
            true,
        );
        assert_eq!(assessment.level, RiskLevel::High);
        assert!(assessment.reason.contains("secret"));
    }

    #[test]
    fn migration_keywords_are_medium() {
        let assessment = assess_risk("apply the schema migration", DeploymentEnv::Test, true);
        assert_eq!(assessment.level, RiskLevel::Medium);
    }
}
