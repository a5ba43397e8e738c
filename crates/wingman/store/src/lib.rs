//! Wingman Store - durable approval state
//!
//! SQLite-backed persistence for approval requests (with fingerprint
//! dedup and TTL expiry), the worker quarantine set, and watcher
//! incidents. The approval database is the only mutable store shared
//! between the approval API and the watcher.
#![deny(unsafe_code)]

mod error;
mod retry;
mod store;

pub use error::StoreError;
pub use store::{ApprovalStore, CreateOutcome, Decision, StoreResult};
