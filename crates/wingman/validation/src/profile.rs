//! Validation profiles
//!
//! A profile picks the active validators, their weights, and the
//! approve/reject thresholds. Detection is regex over task name plus
//! instruction, with deployment keywords checked first so that a task
//! mentioning both "status" and "deploy" lands in the stricter profile.
//! Anything unrecognized is treated as a deployment.

use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

pub const HARD_FLOOR: u8 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    Operational,
    Deployment,
}

impl ProfileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileKind::Operational => "operational",
            ProfileKind::Deployment => "deployment",
        }
    }
}

impl std::fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Active validators with weights, plus decision thresholds.
#[derive(Debug, Clone)]
pub struct Profile {
    pub kind: ProfileKind,
    pub weights: Vec<(&'static str, f64)>,
    pub auto_approve_threshold: u8,
    pub auto_reject_threshold: u8,
}

impl Profile {
    pub fn operational() -> Self {
        Self {
            kind: ProfileKind::Operational,
            weights: vec![("code_scanner", 0.6), ("semantic_analyzer", 0.4)],
            auto_approve_threshold: 85,
            auto_reject_threshold: HARD_FLOOR,
        }
    }

    pub fn deployment() -> Self {
        Self {
            kind: ProfileKind::Deployment,
            weights: vec![
                ("code_scanner", 0.3),
                ("content_quality", 0.25),
                ("dependency_analyzer", 0.2),
                ("semantic_analyzer", 0.25),
            ],
            auto_approve_threshold: 90,
            auto_reject_threshold: HARD_FLOOR,
        }
    }

    pub fn weight_of(&self, validator: &str) -> Option<f64> {
        self.weights
            .iter()
            .find(|(name, _)| *name == validator)
            .map(|(_, w)| *w)
    }

    /// Picks the profile for a task. Deployment keywords win ties.
    pub fn detect(task_name: &str, instruction: &str) -> Self {
        let text = format!("{task_name} {instruction}");
        if deployment_regex().is_match(&text) {
            return Self::deployment();
        }
        if operational_regex().is_match(&text) {
            return Self::operational();
        }
        Self::deployment()
    }
}

fn deployment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        RegexBuilder::new(
            r"\b(deploy(ment)?|release|rollout|roll.?back|migrat(e|ion)|schema|provision|upgrade|install|create|write|update|insert|alter|configure|scale)\b",
        )
        .case_insensitive(true)
        .build()
        .unwrap_or_else(|e| panic!("deployment profile regex: {e}"))
    })
}

fn operational_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        RegexBuilder::new(
            r"\b(status|health|logs?|tail|monitor|inspect|describe|list|get|show|read|check|ping|probe|metrics|top|ps)\b",
        )
        .case_insensitive(true)
        .build()
        .unwrap_or_else(|e| panic!("operational profile regex: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operational_weights_sum_to_one() {
        let total: f64 = Profile::operational().weights.iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn deployment_weights_sum_to_one() {
        let total: f64 = Profile::deployment().weights.iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn read_only_task_is_operational() {
        let profile = Profile::detect("health-probe", "check service status and tail logs");
        assert_eq!(profile.kind, ProfileKind::Operational);
    }

    #[test]
    fn deployment_keywords_win_over_operational() {
        let profile = Profile::detect("ops", "check status then deploy the new release");
        assert_eq!(profile.kind, ProfileKind::Deployment);
    }

    #[test]
    fn unknown_task_defaults_to_deployment() {
        let profile = Profile::detect("mystery", "frobnicate the widget");
        assert_eq!(profile.kind, ProfileKind::Deployment);
    }

    #[test]
    fn wire_spelling_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&ProfileKind::Operational).unwrap(),
            "\"operational\""
        );
    }
}
