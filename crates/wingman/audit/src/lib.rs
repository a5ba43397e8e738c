//! Wingman Audit - append-only execution and claim records
//!
//! Two write paths. Execution audit records go to a Postgres table
//! guarded by an append-only trigger, with a JSON-Lines file fallback
//! when the database is unreachable. Worker claims go straight to a
//! JSON-Lines log that the watcher tails.
#![deny(unsafe_code)]

mod claims;
mod error;
mod jsonl;
mod pg;
mod writer;

pub use claims::ClaimLog;
pub use error::AuditError;
pub use jsonl::JsonlSink;
pub use pg::PgAuditStore;
pub use writer::AuditWriter;
