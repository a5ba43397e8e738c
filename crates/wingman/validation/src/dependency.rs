//! DependencyAnalyzer - blast radius estimation
//!
//! Classifies which infrastructure categories an instruction touches,
//! extracts mentioned service names, and derives a blast radius from
//! fixed rules. The radius maps directly to both the score and the
//! reported risk level.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde_json::json;
use wingman_types::RiskLevel;

use crate::score::{ValidationInput, Validator, ValidatorScore};

struct CategoryPattern {
    category: &'static str,
    regex: Regex,
}

fn category(category: &'static str, pattern: &str) -> CategoryPattern {
    CategoryPattern {
        category,
        regex: RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .unwrap_or_else(|e| panic!("invalid category pattern {category}: {e}")),
    }
}

fn category_patterns() -> &'static [CategoryPattern] {
    static PATTERNS: OnceLock<Vec<CategoryPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            category(
                "container",
                r"\b(docker|podman|container|kubectl|k8s|kubernetes|pod|compose|helm)\b",
            ),
            category(
                "database",
                r"\b(postgres(ql)?|mysql|mariadb|mongo(db)?|redis|sqlite|database|db|sql|table|schema|migration)\b",
            ),
            category(
                "network",
                r"\b(nginx|haproxy|dns|firewall|iptables|load.?balancer|proxy|vpn|port|ingress)\b",
            ),
            category(
                "filesystem",
                r"\b(file|directory|folder|disk|mount|volume|path|log.?rotate|/var/|/etc/|/opt/)\b",
            ),
            category(
                "external_api",
                r"\b(api|webhook|endpoint|http[s]?://|third.?party|stripe|twilio|slack|telegram)\b",
            ),
        ]
    })
}

fn service_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Hyphenated names like auth-service, billing-api, worker-pool-2.
    RE.get_or_init(|| {
        Regex::new(r"\b[a-z][a-z0-9]*(?:-[a-z0-9]+)+\b")
            .unwrap_or_else(|e| panic!("service name regex: {e}"))
    })
}

fn ddl_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        RegexBuilder::new(r"\b(drop|truncate)\b")
            .case_insensitive(true)
            .build()
            .unwrap_or_else(|e| panic!("ddl regex: {e}"))
    })
}

fn blast_radius(
    categories: &BTreeSet<&'static str>,
    services: &BTreeSet<String>,
    has_ddl: bool,
) -> RiskLevel {
    let db = categories.contains("database");
    if db && has_ddl {
        return RiskLevel::Critical;
    }
    if services.len() >= 2 || (categories.contains("container") && db) {
        return RiskLevel::High;
    }
    let single_heavy = categories.contains("container") || db || categories.contains("network");
    if single_heavy {
        return RiskLevel::Medium;
    }
    RiskLevel::Low
}

fn radius_score(radius: RiskLevel) -> u8 {
    match radius {
        RiskLevel::Critical => 20,
        RiskLevel::High => 45,
        RiskLevel::Medium => 70,
        RiskLevel::Low => 95,
    }
}

/// Estimates which parts of the infrastructure an instruction can reach.
#[derive(Debug, Default, Clone)]
pub struct DependencyAnalyzer;

impl DependencyAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Validator for DependencyAnalyzer {
    fn name(&self) -> &'static str {
        "dependency_analyzer"
    }

    async fn validate(&self, input: &ValidationInput) -> ValidatorScore {
        let text = format!("{} {}", input.task_name, input.instruction);
        let lower = text.to_ascii_lowercase();

        let mut categories = BTreeSet::new();
        for pattern in category_patterns() {
            if pattern.regex.is_match(&text) {
                categories.insert(pattern.category);
            }
        }

        let services: BTreeSet<String> = service_name_regex()
            .find_iter(&lower)
            .map(|m| m.as_str().to_string())
            .collect();

        let has_ddl = ddl_regex().is_match(&text);
        let radius = blast_radius(&categories, &services, has_ddl);
        let score = radius_score(radius);

        let mut concerns = Vec::new();
        if radius >= RiskLevel::High {
            concerns.push(format!(
                "blast radius {}: {} categories, {} services",
                radius,
                categories.len(),
                services.len()
            ));
        }

        ValidatorScore::new(self.name(), score)
            .with_risk(radius)
            .with_concerns(concerns)
            .with_details(json!({
                "categories": categories.iter().collect::<Vec<_>>(),
                "services": services.iter().collect::<Vec<_>>(),
                "blast_radius": radius,
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wingman_types::DeploymentEnv;

    fn input(task: &str, text: &str) -> ValidationInput {
        ValidationInput::new(task, text, DeploymentEnv::Test)
    }

    #[tokio::test]
    async fn ddl_on_database_is_critical() {
        let score = DependencyAnalyzer::new()
            .validate(&input("cleanup", "DROP TABLE sessions in the postgres database"))
            .await;
        assert_eq!(score.risk_level, Some(RiskLevel::Critical));
        assert_eq!(score.score, 20);
    }

    #[tokio::test]
    async fn two_services_is_high() {
        let score = DependencyAnalyzer::new()
            .validate(&input(
                "restart",
                "restart auth-service and billing-api containers",
            ))
            .await;
        assert_eq!(score.risk_level, Some(RiskLevel::High));
        assert_eq!(score.score, 45);
    }

    #[tokio::test]
    async fn container_plus_database_is_high() {
        let score = DependencyAnalyzer::new()
            .validate(&input("deploy", "restart the docker container and run a mysql migration"))
            .await;
        assert_eq!(score.risk_level, Some(RiskLevel::High));
    }

    #[tokio::test]
    async fn single_container_is_medium() {
        let score = DependencyAnalyzer::new()
            .validate(&input("ops", "restart the nginx container"))
            .await;
        assert_eq!(score.risk_level, Some(RiskLevel::Medium));
        assert_eq!(score.score, 70);
    }

    #[tokio::test]
    async fn filesystem_only_is_low() {
        let score = DependencyAnalyzer::new()
            .validate(&input("ops", "rotate the file under /var/log and compress old entries"))
            .await;
        assert_eq!(score.risk_level, Some(RiskLevel::Low));
        assert_eq!(score.score, 95);
    }

    #[tokio::test]
    async fn service_names_are_extracted() {
        let score = DependencyAnalyzer::new()
            .validate(&input("ops", "check auth-service and worker-pool-2 status"))
            .await;
        let services = score.details["services"].as_array().unwrap();
        assert!(services.iter().any(|s| s == "auth-service"));
        assert!(services.iter().any(|s| s == "worker-pool-2"));
    }
}
