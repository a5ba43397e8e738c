//! Watcher error types

use thiserror::Error;
use wingman_store::StoreError;

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("approval poll failed: {0}")]
    Poll(String),

    #[error("state file error: {0}")]
    State(String),
}

pub type WatcherResult<T> = Result<T, WatcherError>;
