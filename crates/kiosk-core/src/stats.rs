use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// Counters for mutation outcomes, keyed by mutation kind label.
#[derive(Debug, Default, Clone)]
pub struct MutationStats {
    pub dispatched: HashMap<&'static str, u64>,
    pub retries: HashMap<&'static str, u64>,
    pub committed: HashMap<&'static str, u64>,
    pub failed: HashMap<&'static str, u64>,
}

impl MutationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_dispatched(&self) -> u64 {
        self.dispatched.values().sum()
    }

    pub fn total_committed(&self) -> u64 {
        self.committed.values().sum()
    }

    pub fn total_failed(&self) -> u64 {
        self.failed.values().sum()
    }
}

/// Thread-safe wrapper for mutation stats; cheap to clone into frontends.
#[derive(Debug, Clone)]
pub struct SharedMutationStats {
    inner: Arc<RwLock<MutationStats>>,
}

impl Default for SharedMutationStats {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedMutationStats {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MutationStats::new())),
        }
    }

    pub fn record_dispatched(&self, kind: &'static str) {
        *self.inner.write().dispatched.entry(kind).or_insert(0) += 1;
    }

    pub fn record_retry(&self, kind: &'static str) {
        *self.inner.write().retries.entry(kind).or_insert(0) += 1;
    }

    pub fn record_committed(&self, kind: &'static str) {
        *self.inner.write().committed.entry(kind).or_insert(0) += 1;
    }

    pub fn record_failed(&self, kind: &'static str) {
        *self.inner.write().failed.entry(kind).or_insert(0) += 1;
    }

    pub fn snapshot(&self) -> MutationStats {
        self.inner.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_snapshot() {
        let stats = SharedMutationStats::new();
        stats.record_dispatched("cart_add");
        stats.record_dispatched("cart_add");
        stats.record_committed("cart_add");
        stats.record_failed("cart_update");

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.dispatched.get("cart_add"), Some(&2));
        assert_eq!(snapshot.total_dispatched(), 2);
        assert_eq!(snapshot.total_committed(), 1);
        assert_eq!(snapshot.total_failed(), 1);
    }
}
