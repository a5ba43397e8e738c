//! Persistent cursor: claims file offset plus recent fingerprints
//!
//! The fingerprint map is what makes a replay from offset 0 idempotent.
//! Entries are kept for at least two dedup windows before pruning.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CursorState {
    pub offset: u64,
    pub fingerprints: HashMap<String, DateTime<Utc>>,
}

impl CursorState {
    /// Loads the state file. A missing file starts fresh; a corrupt one
    /// is logged and discarded rather than wedging the watcher.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cursor state unreadable, starting fresh");
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cursor state unreadable, starting fresh");
                Self::default()
            }
        }
    }

    /// Writes the state atomically via a sibling temp file.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let serialized = serde_json::to_string(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, serialized)?;
        std::fs::rename(&tmp, path)
    }

    /// Records a fingerprint. Returns `true` when it was not seen
    /// before, meaning the alert should fire.
    pub fn mark(&mut self, fingerprint: &str, at: DateTime<Utc>) -> bool {
        self.fingerprints
            .insert(fingerprint.to_string(), at)
            .is_none()
    }

    pub fn is_marked(&self, fingerprint: &str) -> bool {
        self.fingerprints.contains_key(fingerprint)
    }

    /// Drops fingerprints older than two dedup windows.
    pub fn prune(&mut self, now: DateTime<Utc>, window_secs: i64) {
        let horizon = now - Duration::seconds(window_secs.saturating_mul(2));
        self.fingerprints.retain(|_, seen| *seen >= horizon);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_is_first_wins() {
        let mut state = CursorState::default();
        let now = Utc::now();
        assert!(state.mark("fp-1", now));
        assert!(!state.mark("fp-1", now));
        assert!(state.is_marked("fp-1"));
    }

    #[test]
    fn prune_keeps_two_windows() {
        let mut state = CursorState::default();
        let now = Utc::now();
        state.mark("old", now - Duration::seconds(1300));
        state.mark("recent", now - Duration::seconds(1100));
        state.prune(now, 600);
        assert!(!state.is_marked("old"));
        assert!(state.is_marked("recent"));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut state = CursorState::default();
        state.offset = 4096;
        state.mark("fp-1", Utc::now());
        state.save(&path).unwrap();

        let loaded = CursorState::load(&path);
        assert_eq!(loaded.offset, 4096);
        assert!(loaded.is_marked("fp-1"));
    }

    #[test]
    fn missing_and_corrupt_files_start_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let missing = CursorState::load(&dir.path().join("nope.json"));
        assert_eq!(missing.offset, 0);

        let path = dir.path().join("corrupt.json");
        std::fs::write(&path, "{not json").unwrap();
        let corrupt = CursorState::load(&path);
        assert_eq!(corrupt.offset, 0);
    }
}
