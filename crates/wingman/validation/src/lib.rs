//! Wingman Validation - instruction quality and risk pipeline
//!
//! A profile-selected, weighted ensemble of validators that turns an
//! instruction into a recommendation (APPROVE / MANUAL_REVIEW / REJECT)
//! and a combined risk level. The CodeScanner, ContentQuality and
//! DependencyAnalyzer validators are fully deterministic; the
//! SemanticAnalyzer calls an external LLM but always falls back to a
//! deterministic heuristic, so the pipeline as a whole never fails.
#![deny(unsafe_code)]

mod dependency;
mod pipeline;
mod profile;
mod quality;
mod scanner;
mod score;
mod semantic;

pub use dependency::DependencyAnalyzer;
pub use pipeline::ValidationPipeline;
pub use profile::{Profile, ProfileKind};
pub use quality::{ContentQualityValidator, FRAMEWORK_SECTIONS};
pub use scanner::CodeScanner;
pub use score::{Recommendation, ValidationInput, ValidationReport, Validator, ValidatorScore};
pub use semantic::{SemanticAnalyzer, SemanticConfig};
