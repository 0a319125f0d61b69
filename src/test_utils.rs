//! Fixtures shared by the unit tests.
use std::path::PathBuf;

use crate::agents::{
    ContextWorldExt, Ethnicity, HouseholdFlags, LandUse, Neighborhood, Region, Sex, World,
};
use crate::context::Context;
use crate::global_properties::ContextGlobalPropertiesExt;
use crate::ids::{HouseholdId, NeighborhoodId, PersonId, RegionId};
use crate::parameters::{Parameters, ParametersValues};
use crate::random::ContextRandomExt;
use crate::statistics::ContextStatisticsExt;

pub(crate) fn demo_parameters_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/parameters.json")
}

pub(crate) fn test_parameters() -> ParametersValues {
    let mut parameters: ParametersValues =
        serde_json::from_str(include_str!("../data/parameters.json")).unwrap();
    parameters.model.input_data_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("data")
        .join(&parameters.model.input_data_dir);
    parameters
}

fn farmland() -> LandUse {
    LandUse {
        agveg: 200_000.0,
        nonagveg: 50_000.0,
        privbldg: 20_000.0,
        pubbldg: 5_000.0,
        other: 5_000.0,
    }
}

/// One region with two neighborhoods a kilometer apart. Returns the world, the first
/// neighborhood and the region.
pub(crate) fn test_world() -> (World, NeighborhoodId, RegionId) {
    let mut world = World::new();
    let rid = populate_world(&mut world);
    let nid = world.region_neighborhoods(rid)[0];
    (world, nid, rid)
}

fn populate_world(world: &mut World) -> RegionId {
    let rid: RegionId = world.ids.regions.next();
    world.add_region(Region::new(rid));
    let first: NeighborhoodId = world.ids.neighborhoods.next();
    let second: NeighborhoodId = world.ids.neighborhoods.next();
    let mut near = Neighborhood::new(first, rid, farmland(), 0.0, 0.0);
    near.services.school = 30.0;
    near.services.market = 45.0;
    near.dist_nara_km = 10.0;
    let mut far = Neighborhood::new(second, rid, farmland(), 1000.0, 0.0);
    far.services.school = 90.0;
    far.services.market = 120.0;
    far.dist_nara_km = 12.0;
    near.neighborhoods_by_distance = vec![second];
    far.neighborhoods_by_distance = vec![first];
    world.add_neighborhood(near);
    world.add_neighborhood(far);
    rid
}

/// A context with the demo parameters, statistics, a seeded RNG and the world of
/// `test_world`.
pub(crate) fn test_context(seed: u64) -> (Context, NeighborhoodId, RegionId) {
    test_context_with(test_parameters(), seed)
}

/// `test_context` with modified parameters.
pub(crate) fn test_context_with(
    parameters: ParametersValues,
    seed: u64,
) -> (Context, NeighborhoodId, RegionId) {
    let mut context = Context::new();
    context
        .set_global_property_value(Parameters, parameters)
        .unwrap();
    context.init_statistics();
    context.init_random(seed);
    let rid = populate_world(context.world_mut());
    let nid = context.world().region_neighborhoods(rid)[0];
    (context, nid, rid)
}

#[allow(clippy::cast_possible_truncation)]
pub(crate) fn add_person(world: &mut World, age_years: f64, sex: Sex, ethnicity: Ethnicity) -> PersonId {
    let age_months = (age_years * 12.0).round() as i64;
    world.new_person(-age_months, age_months, sex, ethnicity)
}

/// A placed household with `members` present. The plot takes no land.
pub(crate) fn add_household(
    world: &mut World,
    neighborhood: NeighborhoodId,
    members: &[PersonId],
) -> HouseholdId {
    let hid = world.new_household(HouseholdFlags::default());
    assert!(world.add_household_to_neighborhood(hid, neighborhood, None));
    for &pid in members {
        world.add_person_to_household(pid, hid);
    }
    hid
}
