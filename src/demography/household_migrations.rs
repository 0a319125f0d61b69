use crate::agents::{ContextWorldExt, Ethnicity};
use crate::context::Context;
use crate::define_rng;
use crate::demographics_report::{record_person_event, PersonEvent};
use crate::demography::placement::{found_household, place_household, random_neighborhood};
use crate::demography::{tally, NeighborhoodCounts};
use crate::error::AbmError;
use crate::hashing::HashMap;
use crate::ids::{HouseholdId, NeighborhoodId, PersonId, RegionId};
use crate::log::{debug, trace};
use crate::parameters::ContextParametersExt;
use crate::random::ContextRandomExt;
use crate::statistics::ContextStatisticsExt;

define_rng!(HouseholdMigrationRng);

/// Creates in-migrant copies of every member of `template`, present or away, with
/// relationships among the copies mirroring those among the originals.
fn clone_members(
    context: &mut Context,
    template: HouseholdId,
    ethnicity: Ethnicity,
    timestep: i64,
) -> Vec<PersonId> {
    let world = context.world_mut();
    let originals = world.household(template).all_members();
    let copies: HashMap<PersonId, PersonId> = originals
        .iter()
        .map(|&original| {
            let source = world.person(original);
            let (birth, age, sex) = (source.birth_timestep, source.age_months, source.sex);
            (original, world.new_person(birth, age, sex, ethnicity))
        })
        .collect();

    for &original in &originals {
        let source = world.person(original).clone();
        let copy = world.person_mut(copies[&original]);
        copy.in_migrant = true;
        copy.mother = source.mother.and_then(|id| copies.get(&id).copied());
        copy.father = source.father.and_then(|id| copies.get(&id).copied());
        copy.spouse = source.spouse.and_then(|id| copies.get(&id).copied());
        if copy.spouse.is_some() {
            copy.marriage_timestep = source.marriage_timestep;
        }
        copy.children = source
            .children
            .iter()
            .filter_map(|id| copies.get(id).copied())
            .collect();
        copy.num_children = source.num_children;
        if copy.is_female() {
            copy.last_birth_timestep = source.last_birth_timestep;
            copy.birth_interval = source.birth_interval;
        }
        copy.desired_children = source.desired_children;
        copy.first_birth_timing = source.first_birth_timing;
        copy.schooling = source.schooling;
        copy.final_schooling = source.final_schooling;
        copy.school_status = source.school_status;
        copy.work = source.work;
        copy.parents_contracep_ever = source.parents_contracep_ever;
        copy.parental_background = source.parental_background;
        copy.childhood_context = source.childhood_context;
    }
    trace!(
        "cloned {} members of household {template} at timestep {timestep}",
        originals.len()
    );
    originals.iter().map(|original| copies[original]).collect()
}

/// Brings in one household modelled on a random existing household of `size`. Returns
/// `None` when the region has no household of that size.
fn arrive(
    context: &mut Context,
    region: RegionId,
    size: usize,
    ethnicity: Ethnicity,
    timestep: i64,
) -> Result<Option<NeighborhoodId>, AbmError> {
    let templates: Vec<HouseholdId> = {
        let world = context.world();
        world
            .region_households(region)
            .into_iter()
            .filter(|&hid| world.household(hid).total_size() == size)
            .collect()
    };
    if templates.is_empty() {
        debug!("no household of size {size} to model an in-migrant household on");
        return Ok(None);
    }
    let template = templates[context.sample_range(HouseholdMigrationRng, 0..templates.len())];
    let members = clone_members(context, template, ethnicity, timestep);

    let household = found_household(context);
    let preferred = random_neighborhood(context, region);
    let neighborhood = place_household(context, household, preferred)?;
    for &member in &members {
        context.world_mut().add_person_to_household(member, household);
        record_person_event(context, PersonEvent::InMigration, member, timestep);
    }
    trace!("in-migrant household {household} arrived in neighborhood {neighborhood}");
    Ok(Some(neighborhood))
}

/// Household arrivals and departures for one timestep in `region`. Returns the
/// in-migrant and out-migrant household counts.
///
/// # Errors
///
/// `AbmError::NoLandAvailable` when an arriving household fits nowhere.
pub fn household_migrations(
    context: &mut Context,
    region: RegionId,
    timestep: i64,
) -> Result<(NeighborhoodCounts, NeighborhoodCounts), AbmError> {
    let arrivals = {
        let stats = context.statistics();
        context.sample(HouseholdMigrationRng, |rng| {
            let count = stats.draw_inmigrant_household_count(rng);
            (0..count)
                .map(|_| {
                    (
                        stats.draw_inmigrant_household_size(rng),
                        stats.draw_inmigrant_ethnicity(rng),
                    )
                })
                .collect::<Vec<_>>()
        })
    };
    let mut inmigrants = NeighborhoodCounts::new();
    for (size, ethnicity) in arrivals {
        let neighborhood = arrive(context, region, size, ethnicity, timestep)?;
        tally(&mut inmigrants, neighborhood);
    }

    let probability = context.parameters().household.outmigration_probability;
    let mut outmigrants = NeighborhoodCounts::new();
    for household in context.world().region_households(region) {
        // Nobody present to leave.
        if context.world().household(household).members.is_empty() {
            continue;
        }
        if !context.sample_bool(HouseholdMigrationRng, probability) {
            continue;
        }
        let world = context.world();
        let neighborhood = world.household(household).neighborhood;
        let members = world.household(household).members.snapshot();
        for &member in &members {
            record_person_event(context, PersonEvent::PermanentOutmigration, member, timestep);
        }
        context.world_mut().out_migrate_household(household);
        trace!("household {household} left the region");
        tally(&mut outmigrants, neighborhood);
    }
    Ok((inmigrants, outmigrants))
}
