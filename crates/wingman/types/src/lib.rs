//! Wingman Types - The shared governance data model
#![deny(unsafe_code)]

mod approval;
mod audit;
mod claim;
mod risk;
mod token;
mod watcher;

pub use approval::{request_fingerprint, ApprovalRequest, ApprovalStatus, QuarantineEntry};
pub use audit::ExecutionAuditEntry;
pub use claim::{ClaimRecord, ClaimStatus};
pub use risk::{DeploymentEnv, ParseEnumError, RiskLevel};
pub use token::TokenClaims;
pub use watcher::{ClaimEventType, WatcherIncident};
