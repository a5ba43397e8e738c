//! In-process used-token set
//!
//! Single-process deployments keep the authoritative replay set in
//! memory. The insert must be atomic with the membership check so two
//! concurrent presentations of the same jti cannot both pass.

use std::collections::HashSet;

use parking_lot::Mutex;

/// Atomic add-if-absent set of consumed token ids.
#[derive(Debug, Default)]
pub struct ReplayGuard {
    used: Mutex<HashSet<String>>,
}

impl ReplayGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `jti` as used. Returns `true` if this call consumed it,
    /// `false` if it was already spent.
    pub fn consume(&self, jti: &str) -> bool {
        self.used.lock().insert(jti.to_string())
    }

    pub fn is_used(&self, jti: &str) -> bool {
        self.used.lock().contains(jti)
    }

    pub fn len(&self) -> usize {
        self.used.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.lock().is_empty()
    }
}
