//! Wingman Watcher
//!
//! Tails the claims audit stream and polls the approval queue,
//! classifies events by severity, deduplicates by time bucket,
//! notifies operators, and quarantines workers on critical findings.
//! The cursor (file offset + recent fingerprints) survives restarts.

#![deny(unsafe_code)]

pub mod classify;
pub mod config;
pub mod cursor;
pub mod error;
pub mod notify;
pub mod tailer;
pub mod watcher;

pub use config::{parse_backends, NotifyBackend, WatcherConfig};
pub use cursor::CursorState;
pub use error::{WatcherError, WatcherResult};
pub use notify::{Notifier, NotifyError};
pub use tailer::ClaimsTailer;
pub use watcher::Watcher;
