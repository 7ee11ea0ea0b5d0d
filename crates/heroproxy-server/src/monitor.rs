//! The set of hero IDs under active refresh.

use dashmap::DashSet;

/// Concurrent set of monitored hero IDs.
///
/// Membership changes only through [`add`](Self::add) and
/// [`remove`](Self::remove); the underlying collection is never handed out.
/// IDs are added by the coordinator's first fetch and by discovery, and
/// removed on refresh failure or cache eviction. Removal is terminal for an
/// ID until something adds it afresh.
#[derive(Debug, Default)]
pub struct MonitoredSet {
    ids: DashSet<String>,
}

impl MonitoredSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an ID to monitoring. Returns true if it was not already present.
    pub fn add(&self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    /// Remove an ID from monitoring. Returns true if it was present.
    pub fn remove(&self, id: &str) -> bool {
        self.ids.remove(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Copy of the current membership, for iteration outside the set's
    /// internal locks.
    pub fn snapshot(&self) -> Vec<String> {
        self.ids.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_remove() {
        let set = MonitoredSet::new();
        assert!(set.add("70"));
        assert!(!set.add("70"));
        assert!(set.contains("70"));
        assert_eq!(set.len(), 1);

        assert!(set.remove("70"));
        assert!(!set.remove("70"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let set = MonitoredSet::new();
        set.add("1");
        set.add("2");

        let snapshot = set.snapshot();
        set.remove("1");

        assert_eq!(snapshot.len(), 2);
        assert_eq!(set.len(), 1);
    }
}
