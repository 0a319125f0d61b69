use rand::Rng;

use crate::agents::{BirthDraws, ContextWorldExt, Sex};
use crate::context::Context;
use crate::define_rng;
use crate::demographics_report::{record_person_event, PersonEvent};
use crate::demography::{tally, NeighborhoodCounts};
use crate::ids::{PersonId, RegionId};
use crate::log::trace;
use crate::parameters::ContextParametersExt;
use crate::random::ContextRandomExt;
use crate::statistics::ContextStatisticsExt;

define_rng!(BirthRng);

/// Months of marriage before the hazard model allows a first birth.
const MIN_MONTHS_TO_FIRST_BIRTH: i64 = 9;

const NEWBORN_WORK_SHARE: f64 = 0.1;

/// Whether a present woman gives birth at `timestep`.
///
/// A woman without children must have married within the first-birth window and be
/// ready by her first-birth model. A mother must have waited longer than her birth
/// interval and not yet have her desired number of children. The hazard model draws
/// from the birth stream.
pub fn is_eligible_for_birth(context: &Context, person: PersonId, timestep: i64) -> bool {
    let world = context.world();
    let parameters = &context.parameters().birth;
    let record = world.person(person);
    if !record.is_present() || !record.is_female() || !record.is_married() {
        return false;
    }
    let age = record.age_years();
    if age < parameters.min_age_years || age > parameters.max_age_years {
        return false;
    }
    let Some(months_married) = record.months_married(timestep) else {
        return false;
    };

    if record.num_children == 0 {
        if months_married >= parameters.first_birth_window_months {
            return false;
        }
        let stats = context.statistics();
        if stats.uses_first_birth_timing() {
            return months_married >= record.first_birth_timing;
        }
        if months_married < MIN_MONTHS_TO_FIRST_BIRTH {
            return false;
        }
        let probability = stats
            .first_birth_probability(world, person, timestep)
            .unwrap_or(0.0);
        return context.sample_bool(BirthRng, probability);
    }

    let waited = record.last_birth_timestep.map_or(true, |last| {
        timestep - last > record.birth_interval.unwrap_or(0)
    });
    waited && !record.desired_children.is_reached(record.num_children)
}

fn draw_birth(context: &Context) -> BirthDraws {
    let stats = context.statistics();
    context.sample(BirthRng, |rng| BirthDraws {
        mother_interval: stats.draw_birth_interval(rng),
        child_sex: if rng.random_bool(0.5) {
            Sex::Female
        } else {
            Sex::Male
        },
        child_interval: stats.draw_birth_interval(rng),
        child_first_birth_timing: stats.draw_first_birth_timing(rng),
    })
}

/// Every eligible present woman of `region` has a child with her husband. The child
/// joins the mother's household.
///
/// With `simulate` set (burn-in) only the mothers' birth histories change.
pub fn births(
    context: &mut Context,
    region: RegionId,
    timestep: i64,
    simulate: bool,
) -> NeighborhoodCounts {
    let mut counts = NeighborhoodCounts::new();
    let feedback = context.parameters().feedback.clone();
    for mother in context.world().region_present_persons(region) {
        if !is_eligible_for_birth(context, mother, timestep) {
            continue;
        }
        let record = context.world().person(mother);
        let (Some(father), Some(household)) = (record.spouse, record.household) else {
            continue;
        };
        let neighborhood = context.world().person_neighborhood(mother);
        let draws = draw_birth(context);
        let (work, parents_contracep_ever) = context.sample(BirthRng, |rng| {
            (
                rng.random_bool(NEWBORN_WORK_SHARE),
                rng.random_bool(0.5),
            )
        });

        let world = context.world_mut();
        if let Some(child) = world.give_birth(mother, father, timestep, &draws, simulate) {
            world.add_person_to_household(child, household);
            let record = world.person_mut(child);
            record.work = work;
            record.parents_contracep_ever = parents_contracep_ever;
            if let (true, Some(nid)) = (feedback.birth_nonagveg, neighborhood) {
                let land = &mut world.neighborhood_mut(nid).land;
                if land.nonagveg - feedback.birth_nonagveg_area >= 0.0 {
                    land.nonagveg -= feedback.birth_nonagveg_area;
                    land.other += feedback.birth_nonagveg_area;
                }
            }
            trace!("person {mother} gave birth to {child}");
            record_person_event(context, PersonEvent::Birth, child, timestep);
        }
        tally(&mut counts, neighborhood);
    }
    counts
}
