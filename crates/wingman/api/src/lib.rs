//! Wingman Approval API
//!
//! HTTP surface of the governance gateway: instruction pre-flight
//! checks, the approval queue, capability token minting, claim
//! logging, and the watcher's read/release endpoints. Stateless apart
//! from the approval store and the claims log.

#![deny(unsafe_code)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod risk;
pub mod router;
pub mod server;
pub mod state;
pub mod verifier;

pub use config::{ApiConfig, RoleKeys};
pub use error::{ApiError, ApiResult};
pub use router::create_router;
pub use server::Server;
pub use state::AppState;
