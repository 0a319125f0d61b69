use crate::agents::agent_set::AgentSet;
use crate::ids::{HouseholdId, NeighborhoodId, PersonId};

/// Land and fuel characteristics of a household, drawn when it is founded or read
/// from the survey for initial households.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct HouseholdFlags {
    pub any_non_wood_fuel: bool,
    pub own_house_plot: bool,
    pub own_land: bool,
    pub rented_out_land: bool,
}

#[derive(Clone, Debug)]
pub struct Household {
    pub id: HouseholdId,
    /// `None` until the household is placed.
    pub neighborhood: Option<NeighborhoodId>,
    pub members: AgentSet<PersonId>,
    /// Members in an agent store who will return here.
    pub away_members: AgentSet<PersonId>,
    /// House plot area in square meters, returned to agricultural land on removal.
    pub area: f64,
    pub flags: HouseholdFlags,
    pub last_migrant_timestep: Option<i64>,
    pub initial_agent: bool,
}

impl Household {
    #[must_use]
    pub fn new(id: HouseholdId, flags: HouseholdFlags) -> Household {
        Household {
            id,
            neighborhood: None,
            members: AgentSet::new(),
            away_members: AgentSet::new(),
            area: 0.0,
            flags,
            last_migrant_timestep: None,
            initial_agent: false,
        }
    }

    #[must_use]
    pub fn num_members(&self) -> usize {
        self.members.len()
    }

    /// Present plus away members.
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.members.len() + self.away_members.len()
    }

    /// No one present and no one expected back.
    #[must_use]
    pub fn is_defunct(&self) -> bool {
        self.members.is_empty() && self.away_members.is_empty()
    }

    /// Present members followed by away members.
    #[must_use]
    pub fn all_members(&self) -> Vec<PersonId> {
        self.members.iter().chain(self.away_members.iter()).collect()
    }
}
