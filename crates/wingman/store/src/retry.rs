//! Retry policy for transient SQLite contention
//!
//! SQLite returns SQLITE_BUSY/SQLITE_LOCKED under writer contention.
//! Writes and reads both go through a small capped exponential backoff
//! with jitter rather than surfacing the contention to callers.

use rand::Rng;
use std::future::Future;
use std::time::Duration;

use crate::error::StoreError;

const MAX_ATTEMPTS: u32 = 5;
const BASE_DELAY_MS: u64 = 50;
const MAX_DELAY_MS: u64 = 1_000;

/// Whether the error is worth a retry at all.
fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            let msg = db.message().to_ascii_lowercase();
            msg.contains("database is locked") || msg.contains("database table is locked")
        }
        sqlx::Error::PoolTimedOut => true,
        _ => false,
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let exp = BASE_DELAY_MS.saturating_mul(1 << attempt.min(10));
    let capped = exp.min(MAX_DELAY_MS);
    let jitter = rand::thread_rng().gen_range(0..=BASE_DELAY_MS / 2);
    Duration::from_millis(capped + jitter)
}

/// Run `op`, retrying transient failures with capped exponential backoff.
pub(crate) async fn with_retry<T, F, Fut>(op_name: &str, mut op: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if is_transient(&err) && attempt + 1 < MAX_ATTEMPTS => {
                let delay = backoff_delay(attempt);
                tracing::warn!(
                    op = op_name,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "transient storage contention, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(StoreError::query(err)),
        }
    }
}
