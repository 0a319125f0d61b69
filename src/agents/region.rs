use crate::agents::agent_set::AgentSet;
use crate::agents::agent_store::{AgentStore, StoreKind};
use crate::ids::{NeighborhoodId, PersonId, RegionId};

#[derive(Clone, Debug)]
pub struct Region {
    pub id: RegionId,
    pub neighborhoods: AgentSet<NeighborhoodId>,
    pub long_distance_store: AgentStore,
    pub local_store: AgentStore,
    /// Everyone who died here, in order of death.
    pub cemetery: Vec<PersonId>,
}

impl Region {
    #[must_use]
    pub fn new(id: RegionId) -> Region {
        Region {
            id,
            neighborhoods: AgentSet::new(),
            long_distance_store: AgentStore::new(),
            local_store: AgentStore::new(),
            cemetery: Vec::new(),
        }
    }

    #[must_use]
    pub fn store(&self, kind: StoreKind) -> &AgentStore {
        match kind {
            StoreKind::LongDistance => &self.long_distance_store,
            StoreKind::LocalLocal => &self.local_store,
        }
    }

    pub fn store_mut(&mut self, kind: StoreKind) -> &mut AgentStore {
        match kind {
            StoreKind::LongDistance => &mut self.long_distance_store,
            StoreKind::LocalLocal => &mut self.local_store,
        }
    }

    /// Every stored person across both stores.
    #[must_use]
    pub fn stored_persons(&self) -> Vec<PersonId> {
        self.long_distance_store
            .iter()
            .chain(self.local_store.iter())
            .collect()
    }
}
