use std::collections::HashMap;
use std::sync::RwLock;

/// Per-node monotonic counter map for tracking causal ordering of metric
/// events.
///
/// Merge is component-wise maximum: idempotent and commutative. The
/// internal map is serialized by a read/write lock; merging acquires the
/// target's write lock and reads the source through a snapshot.
#[derive(Debug, Default)]
pub struct VectorClock {
    clock: RwLock<HashMap<String, u64>>,
}

impl VectorClock {
    pub fn new() -> Self {
        VectorClock {
            clock: RwLock::new(HashMap::new()),
        }
    }

    /// Increment the counter for `node_id`.
    pub fn update(&self, node_id: &str) {
        let mut clock = self.clock.write().unwrap();
        *clock.entry(node_id.to_string()).or_insert(0) += 1;
    }

    /// Merge another clock into this one (component-wise maximum).
    pub fn merge(&self, other: &VectorClock) {
        self.merge_snapshot(&other.snapshot());
    }

    /// Merge a plain counter map (e.g. a clock carried by a metrics
    /// message).
    pub fn merge_snapshot(&self, snapshot: &HashMap<String, u64>) {
        let mut clock = self.clock.write().unwrap();
        for (node_id, &counter) in snapshot {
            let entry = clock.entry(node_id.clone()).or_insert(0);
            if *entry < counter {
                *entry = counter;
            }
        }
    }

    /// Counter for a specific node (0 when unseen).
    pub fn get(&self, node_id: &str) -> u64 {
        let clock = self.clock.read().unwrap();
        clock.get(node_id).copied().unwrap_or(0)
    }

    /// Copy of the full counter map.
    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.clock.read().unwrap().clone()
    }
}

impl Clone for VectorClock {
    fn clone(&self) -> Self {
        VectorClock {
            clock: RwLock::new(self.snapshot()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_increments() {
        let clock = VectorClock::new();
        clock.update("node1");
        clock.update("node1");
        clock.update("node2");
        assert_eq!(clock.get("node1"), 2);
        assert_eq!(clock.get("node2"), 1);
        assert_eq!(clock.get("node3"), 0);
    }

    #[test]
    fn test_merge_takes_componentwise_max() {
        let a = VectorClock::new();
        let b = VectorClock::new();
        a.update("n1");
        a.update("n1");
        b.update("n1");
        b.update("n2");

        a.merge(&b);
        assert_eq!(a.get("n1"), 2);
        assert_eq!(a.get("n2"), 1);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let a = VectorClock::new();
        let b = VectorClock::new();
        a.update("n1");
        b.update("n2");
        b.update("n2");

        a.merge(&b);
        let once = a.snapshot();
        a.merge(&b);
        assert_eq!(a.snapshot(), once);
    }

    #[test]
    fn test_merge_is_commutative() {
        let build = |updates: &[&str]| {
            let clock = VectorClock::new();
            for node in updates {
                clock.update(node);
            }
            clock
        };

        let ab = build(&["x", "x", "y"]);
        ab.merge(&build(&["y", "y", "z"]));

        let ba = build(&["y", "y", "z"]);
        ba.merge(&build(&["x", "x", "y"]));

        assert_eq!(ab.snapshot(), ba.snapshot());
    }

    #[test]
    fn test_clone_is_independent() {
        let original = VectorClock::new();
        original.update("n1");
        let cloned = original.clone();
        original.update("n1");

        assert_eq!(original.get("n1"), 2);
        assert_eq!(cloned.get("n1"), 1);
    }
}
