//! Risk levels and deployment environments
//!
//! Both enums round-trip through their wire spellings (`LOW`, `prd`, ...)
//! so they can be stored as TEXT columns and compared across services.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when a wire spelling does not name a known variant.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Four-valued severity rank used for routing decisions.
///
/// Ordering follows rank: `Low < Medium < High < Critical`, so the
/// combined risk of several assessments is simply their `max`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOW" => Ok(RiskLevel::Low),
            "MEDIUM" => Ok(RiskLevel::Medium),
            "HIGH" => Ok(RiskLevel::High),
            "CRITICAL" => Ok(RiskLevel::Critical),
            other => Err(ParseEnumError {
                kind: "risk level",
                value: other.to_string(),
            }),
        }
    }
}

/// Deployment environment a request or token is scoped to.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentEnv {
    #[default]
    Dev,
    Test,
    Prd,
}

impl DeploymentEnv {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentEnv::Dev => "dev",
            DeploymentEnv::Test => "test",
            DeploymentEnv::Prd => "prd",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, DeploymentEnv::Prd)
    }
}

impl fmt::Display for DeploymentEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentEnv {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dev" => Ok(DeploymentEnv::Dev),
            "test" => Ok(DeploymentEnv::Test),
            "prd" => Ok(DeploymentEnv::Prd),
            other => Err(ParseEnumError {
                kind: "deployment environment",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_ordering_matches_rank() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
        let combined = [RiskLevel::Medium, RiskLevel::Critical, RiskLevel::Low]
            .into_iter()
            .max()
            .unwrap();
        assert_eq!(combined, RiskLevel::Critical);
    }

    #[test]
    fn risk_round_trips_wire_spelling() {
        for level in [
            RiskLevel::Low,
            RiskLevel::Medium,
            RiskLevel::High,
            RiskLevel::Critical,
        ] {
            let json = serde_json::to_string(&level).unwrap();
            assert_eq!(json, format!("\"{}\"", level.as_str()));
            assert_eq!(level.as_str().parse::<RiskLevel>().unwrap(), level);
        }
    }

    #[test]
    fn env_parses_lowercase_only_spellings() {
        assert_eq!("PRD".parse::<DeploymentEnv>().unwrap(), DeploymentEnv::Prd);
        assert!("production".parse::<DeploymentEnv>().is_err());
        assert_eq!(
            serde_json::to_string(&DeploymentEnv::Test).unwrap(),
            "\"test\""
        );
    }
}
