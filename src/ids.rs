//! Identifiers for every entity type and the generator that issues them.
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::AbmError;
use crate::hashing::HashSet;

/// Defines a `u64` newtype identifier.
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                $name(id)
            }
        }
    };
}

define_id!(PersonId);
define_id!(HouseholdId);
define_id!(NeighborhoodId);
define_id!(RegionId);

/// Issues unique IDs for one entity type.
///
/// `next` counts up from zero and skips anything reserved with `use_id`, which is
/// how IDs read from survey data are kept.
#[derive(Debug, Default)]
pub struct IdGenerator {
    next: u64,
    reserved: HashSet<u64>,
}

impl IdGenerator {
    #[must_use]
    pub fn new() -> IdGenerator {
        IdGenerator::default()
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next<T: From<u64>>(&mut self) -> T {
        while self.reserved.remove(&self.next) {
            self.next += 1;
        }
        let id = self.next;
        self.next += 1;
        T::from(id)
    }

    /// Reserves `id` so `next` never returns it.
    ///
    /// # Errors
    ///
    /// `AbmError::DuplicateId` if `id` was already reserved or issued.
    pub fn use_id(&mut self, id: u64) -> Result<(), AbmError> {
        if id < self.next || !self.reserved.insert(id) {
            return Err(AbmError::DuplicateId(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_from_zero() {
        let mut ids = IdGenerator::new();
        let first: PersonId = ids.next();
        let second: PersonId = ids.next();
        assert_eq!(first, PersonId(0));
        assert_eq!(second, PersonId(1));
    }

    #[test]
    fn skips_reserved_ids() {
        let mut ids = IdGenerator::new();
        ids.use_id(0).unwrap();
        ids.use_id(2).unwrap();
        let issued: Vec<HouseholdId> = (0..3).map(|_| ids.next()).collect();
        assert_eq!(issued, vec![HouseholdId(1), HouseholdId(3), HouseholdId(4)]);
    }

    #[test]
    fn reserving_twice_fails() {
        let mut ids = IdGenerator::new();
        ids.use_id(7).unwrap();
        assert!(matches!(ids.use_id(7), Err(AbmError::DuplicateId(7))));
    }

    #[test]
    fn reserving_an_issued_id_fails() {
        let mut ids = IdGenerator::new();
        let _: RegionId = ids.next();
        assert!(matches!(ids.use_id(0), Err(AbmError::DuplicateId(0))));
    }

    #[test]
    fn generators_are_independent() {
        let mut people = IdGenerator::new();
        let mut households = IdGenerator::new();
        let _: PersonId = people.next();
        let _: PersonId = people.next();
        let first_household: HouseholdId = households.next();
        assert_eq!(first_household, HouseholdId(0));
    }
}
