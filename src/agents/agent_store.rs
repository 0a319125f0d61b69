//! Holding area for persons who are temporarily outside the household hierarchy.
//!
//! Each stored person carries a release timestep. `release(t)` hands back everyone due
//! at or before `t` and forgets them, so a second call at the same time returns
//! nothing. The store only tracks membership; `World` keeps the household and person
//! records consistent around it.
use std::collections::BTreeMap;

use serde::Serialize;
use strum::{Display, EnumIter};

use crate::hashing::HashMap;
use crate::ids::PersonId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Display, EnumIter)]
pub enum StoreKind {
    /// Long-distance migrants, released back to their last household.
    LongDistance,
    /// Local-to-local migrants. Nothing puts persons here yet.
    LocalLocal,
}

#[derive(Clone, Debug, Default)]
pub struct AgentStore {
    releases: BTreeMap<i64, Vec<PersonId>>,
    members: HashMap<PersonId, i64>,
}

impl AgentStore {
    #[must_use]
    pub fn new() -> AgentStore {
        AgentStore::default()
    }

    /// # Panics
    ///
    /// Panics if `person` is already in the store.
    pub fn add(&mut self, person: PersonId, release_timestep: i64) {
        assert!(
            self.members.insert(person, release_timestep).is_none(),
            "Person {person} is already in the agent store"
        );
        self.releases
            .entry(release_timestep)
            .or_default()
            .push(person);
    }

    /// Takes `person` out early (death or permanent departure). Returns false if the
    /// person was not stored.
    pub fn remove(&mut self, person: PersonId) -> bool {
        let Some(release_timestep) = self.members.remove(&person) else {
            return false;
        };
        if let Some(due) = self.releases.get_mut(&release_timestep) {
            due.retain(|&stored| stored != person);
            if due.is_empty() {
                self.releases.remove(&release_timestep);
            }
        }
        true
    }

    /// Removes and returns every person due at or before `timestep`, earliest first.
    pub fn release(&mut self, timestep: i64) -> Vec<PersonId> {
        let not_due = self.releases.split_off(&(timestep + 1));
        let due = std::mem::replace(&mut self.releases, not_due);
        let released: Vec<PersonId> = due.into_values().flatten().collect();
        for person in &released {
            self.members.remove(person);
        }
        released
    }

    #[must_use]
    pub fn contains(&self, person: PersonId) -> bool {
        self.members.contains_key(&person)
    }

    #[must_use]
    pub fn release_timestep(&self, person: PersonId) -> Option<i64> {
        self.members.get(&person).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Stored persons ordered by release timestep, then by insertion.
    pub fn iter(&self) -> impl Iterator<Item = PersonId> + '_ {
        self.releases.values().flatten().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_returns_due_persons_once() {
        let mut store = AgentStore::new();
        store.add(PersonId(1), 62);
        store.add(PersonId(2), 70);
        assert!(store.release(61).is_empty());
        assert_eq!(store.release(62), vec![PersonId(1)]);
        assert!(store.release(62).is_empty());
        assert!(!store.contains(PersonId(1)));
        assert!(store.contains(PersonId(2)));
    }

    #[test]
    fn late_release_catches_everything_overdue() {
        let mut store = AgentStore::new();
        store.add(PersonId(3), 5);
        store.add(PersonId(1), 4);
        store.add(PersonId(2), 5);
        assert_eq!(
            store.release(10),
            vec![PersonId(1), PersonId(3), PersonId(2)]
        );
        assert!(store.is_empty());
    }

    #[test]
    fn early_removal() {
        let mut store = AgentStore::new();
        store.add(PersonId(1), 12);
        store.add(PersonId(2), 12);
        assert!(store.remove(PersonId(1)));
        assert!(!store.remove(PersonId(1)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.release(12), vec![PersonId(2)]);
    }

    #[test]
    #[should_panic(expected = "already in the agent store")]
    fn double_insert() {
        let mut store = AgentStore::new();
        store.add(PersonId(1), 12);
        store.add(PersonId(1), 13);
    }
}
