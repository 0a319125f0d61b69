//! The ordered membership set shared by every container level.
//!
//! Iteration follows insertion order, so two runs with the same seed visit members in
//! the same order. Removal keeps the order of the remaining members.
use std::hash::{BuildHasherDefault, Hash};

use indexmap::IndexSet;
use rustc_hash::FxHasher;

#[derive(Clone, Debug)]
pub struct AgentSet<T> {
    members: IndexSet<T, BuildHasherDefault<FxHasher>>,
}

impl<T: Copy + Eq + Hash> AgentSet<T> {
    #[must_use]
    pub fn new() -> AgentSet<T> {
        AgentSet {
            members: IndexSet::default(),
        }
    }

    /// Returns false if `member` was already present.
    pub fn add(&mut self, member: T) -> bool {
        self.members.insert(member)
    }

    /// Returns false if `member` was not present.
    pub fn remove(&mut self, member: T) -> bool {
        self.members.shift_remove(&member)
    }

    #[must_use]
    pub fn contains(&self, member: T) -> bool {
        self.members.contains(&member)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.members.iter().copied()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        self.members.get_index(index).copied()
    }

    /// A copy of the members for iterating while the set changes.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.members.iter().copied().collect()
    }
}

impl<T: Copy + Eq + Hash> Default for AgentSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_insertion_order_across_removals() {
        let mut set = AgentSet::new();
        for member in [5_u64, 3, 9, 1] {
            assert!(set.add(member));
        }
        assert!(set.remove(3));
        assert_eq!(set.snapshot(), vec![5, 9, 1]);
        assert_eq!(set.get(1), Some(9));
    }

    #[test]
    fn duplicate_adds_and_missing_removes() {
        let mut set = AgentSet::new();
        assert!(set.add(1_u64));
        assert!(!set.add(1));
        assert!(!set.remove(2));
        assert_eq!(set.len(), 1);
        assert!(set.remove(1));
        assert!(set.is_empty());
    }
}
