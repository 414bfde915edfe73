//! # Group Naming
//!
//! Session-owned generator for unique, human-readable sub-group names.

use std::sync::atomic::{AtomicU64, Ordering};

/// Prefix of generated sub-group names.
pub const SUB_GROUP_PREFIX: &str = "subGroup";

/// Produces `subGroup-1`, `subGroup-2`, ... across concurrent callers.
///
/// Owned by the calling session and passed explicitly to the operations that
/// need it, so two sessions never share a counter.
#[derive(Debug, Default)]
pub struct GroupNameGenerator {
    counter: AtomicU64,
}

impl GroupNameGenerator {
    /// Generator starting at 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generator whose first name uses `start`.
    pub fn starting_at(start: u64) -> Self {
        Self {
            counter: AtomicU64::new(start.saturating_sub(1)),
        }
    }

    /// Next unique name.
    pub fn next_name(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", SUB_GROUP_PREFIX, n)
    }

    /// Number of names handed out.
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_sequential_names() {
        let names = GroupNameGenerator::new();
        assert_eq!(names.next_name(), "subGroup-1");
        assert_eq!(names.next_name(), "subGroup-2");
        assert_eq!(names.issued(), 2);
    }

    #[test]
    fn test_starting_at() {
        let names = GroupNameGenerator::starting_at(10);
        assert_eq!(names.next_name(), "subGroup-10");
    }

    #[test]
    fn test_unique_across_threads() {
        let names = Arc::new(GroupNameGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let names = Arc::clone(&names);
                std::thread::spawn(move || (0..100).map(|_| names.next_name()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for name in handle.join().unwrap() {
                assert!(seen.insert(name));
            }
        }
        assert_eq!(seen.len(), 400);
    }

    #[test]
    fn test_sessions_are_independent() {
        let a = GroupNameGenerator::new();
        let b = GroupNameGenerator::new();
        a.next_name();
        assert_eq!(b.next_name(), "subGroup-1");
    }
}
