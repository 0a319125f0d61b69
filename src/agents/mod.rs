//! Persons, households, neighborhoods and regions, and the `World` arena that holds
//! them.
pub mod agent_set;
pub mod agent_store;
pub mod household;
pub mod neighborhood;
pub mod person;
pub mod region;
pub mod world;

pub use agent_set::AgentSet;
pub use agent_store::{AgentStore, StoreKind};
pub use household::{Household, HouseholdFlags};
pub use neighborhood::{
    ForestDistances, ForestType, LandUse, Neighborhood, ServiceKind, ServiceTimes,
};
pub use person::{
    CommunityContext, DesiredChildren, Ethnicity, MigrationRecord, ParentalBackground, Person,
    SchoolStatus, Sex,
};
pub use region::Region;
pub use world::{BirthDraws, World, WorldIds};

use crate::context::Context;
use crate::define_data_plugin;

define_data_plugin!(WorldPlugin, World, World::new());

pub trait ContextWorldExt {
    /// # Panics
    ///
    /// Panics if nothing has populated the world yet.
    fn world(&self) -> &World;

    /// Creates an empty world on first use.
    fn world_mut(&mut self) -> &mut World;
}

impl ContextWorldExt for Context {
    fn world(&self) -> &World {
        self.get_data_container(WorldPlugin)
            .expect("World not initialized")
    }

    fn world_mut(&mut self) -> &mut World {
        self.get_data_container_mut(WorldPlugin)
    }
}
