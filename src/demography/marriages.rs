use crate::agents::{ContextWorldExt, Sex};
use crate::clock::Clock;
use crate::context::Context;
use crate::define_rng;
use crate::demographics_report::{record_person_event, PersonEvent};
use crate::demography::inmigrants::new_inmigrant;
use crate::demography::placement::{found_household, place_household, random_neighborhood};
use crate::demography::{tally, NeighborhoodCounts};
use crate::error::AbmError;
use crate::ids::{NeighborhoodId, PersonId, RegionId};
use crate::log::trace;
use crate::parameters::ContextParametersExt;
use crate::random::ContextRandomExt;
use crate::statistics::ContextStatisticsExt;

define_rng!(MarriageRng);

/// Converts a drawn age in years to months, rounding the fractional year to whole
/// months.
#[allow(clippy::cast_possible_truncation)]
fn years_to_months(years: f64) -> i64 {
    (years.trunc() as i64) * 12 + (years.fract() * 12.0).round() as i64
}

/// Present unmarried persons of marriageable age who want to marry this month, split
/// into men and women.
fn seekers(context: &Context, region: RegionId, month: u32) -> (Vec<PersonId>, Vec<PersonId>) {
    let parameters = &context.parameters().marriage;
    let world = context.world();
    let stats = context.statistics();
    let mut men = Vec::new();
    let mut women = Vec::new();
    for person in world.region_present_persons(region) {
        let record = world.person(person);
        let age = record.age_years();
        if record.is_married() || age < parameters.min_age_years || age > parameters.max_age_years
        {
            continue;
        }
        let probability = stats.marriage_probability(world, person, month);
        if !context.sample_bool(MarriageRng, probability) {
            continue;
        }
        match record.sex {
            Sex::Male => men.push(person),
            Sex::Female => women.push(person),
        }
    }
    (men, women)
}

/// Each man picks a wife from the women still available, weighted by how typical
/// their age gap is. Returns the couples, the men nobody suits and the women left
/// over.
fn match_couples(
    context: &Context,
    men: Vec<PersonId>,
    mut women: Vec<PersonId>,
) -> (Vec<(PersonId, PersonId)>, Vec<PersonId>, Vec<PersonId>) {
    let world = context.world();
    let stats = context.statistics();
    let mut couples = Vec::new();
    let mut single_men = Vec::new();
    for man in men {
        let weights: Vec<f64> = women
            .iter()
            .map(|&woman| stats.spouse_weight(world, man, woman))
            .collect();
        if weights.iter().sum::<f64>() <= 0.0 {
            single_men.push(man);
            continue;
        }
        let chosen = context.sample_weighted(MarriageRng, &weights);
        couples.push((man, women.remove(chosen)));
    }
    (couples, single_men, women)
}

/// Creates an unplaced in-migrant spouse for `person` with an age gap drawn from the
/// observed distribution.
fn inmigrant_spouse(context: &mut Context, person: PersonId, timestep: i64) -> PersonId {
    let min_age_months = years_to_months(context.parameters().marriage.min_age_years);
    let diff = {
        let stats = context.statistics();
        context.sample(MarriageRng, |rng| stats.draw_spouse_age_diff(rng))
    };
    let record = context.world().person(person);
    let spouse_age_years = match record.sex {
        Sex::Male => record.age_years() - diff,
        Sex::Female => record.age_years() + diff,
    };
    let sex = record.sex.opposite();
    let ethnicity = record.ethnicity;
    let age_months = years_to_months(spouse_age_years).max(min_age_months);
    new_inmigrant(context, timestep, age_months, sex, ethnicity)
}

/// Marries `groom` and `bride` and settles them. Returns the couple's neighborhood.
fn wed(
    context: &mut Context,
    region: RegionId,
    groom: PersonId,
    bride: PersonId,
    timestep: i64,
) -> Result<NeighborhoodId, AbmError> {
    let moveout_probability = context.parameters().marriage.moveout_probability;
    let (desired, first_birth_timing, moveout) = {
        let stats = context.statistics();
        let (desired, timing) = context.sample(MarriageRng, |rng| {
            (
                stats.draw_desired_children(rng),
                stats.draw_first_birth_timing(rng),
            )
        });
        (desired, timing, context.sample_bool(MarriageRng, moveout_probability))
    };

    let world = context.world_mut();
    world.marry(groom, bride, timestep, desired);
    world.person_mut(bride).first_birth_timing = first_birth_timing;

    let groom_household = world.person(groom).household;
    let groom_neighborhood = world.person_neighborhood(groom);
    let bride_neighborhood = world.person_neighborhood(bride);
    if world.person(bride).household.is_some() {
        world.remove_person_from_household(bride);
    }

    let neighborhood = match groom_household {
        Some(household) if !moveout => {
            world.add_person_to_household(bride, household);
            world
                .household(household)
                .neighborhood
                .ok_or_else(|| AbmError::AbmError(format!("Household {household} is unplaced")))?
        }
        _ => {
            if groom_household.is_some() {
                world.remove_person_from_household(groom);
            }
            let preferred = match groom_neighborhood.or(bride_neighborhood) {
                Some(nid) => nid,
                None => random_neighborhood(context, region),
            };
            let household = found_household(context);
            let neighborhood = place_household(context, household, preferred)?;
            let world = context.world_mut();
            world.add_person_to_household(groom, household);
            world.add_person_to_household(bride, household);
            trace!("couple {groom} and {bride} founded household {household}");
            neighborhood
        }
    };

    record_person_event(context, PersonEvent::Marriage, groom, timestep);
    record_person_event(context, PersonEvent::Marriage, bride, timestep);
    Ok(neighborhood)
}

/// Forms the marriages of one timestep in `region`. Persons who find no partner in
/// the region marry an in-migrant.
///
/// # Errors
///
/// `AbmError::NoLandAvailable` when a new couple's household fits nowhere.
pub fn marriages(
    context: &mut Context,
    region: RegionId,
    clock: &Clock,
) -> Result<NeighborhoodCounts, AbmError> {
    let timestep = clock.timestep();
    let (men, women) = seekers(context, region, clock.month());
    let (mut couples, single_men, single_women) = match_couples(context, men, women);
    for man in single_men {
        let wife = inmigrant_spouse(context, man, timestep);
        couples.push((man, wife));
    }
    for woman in single_women {
        let husband = inmigrant_spouse(context, woman, timestep);
        couples.push((husband, woman));
    }

    let mut counts = NeighborhoodCounts::new();
    for (groom, bride) in couples {
        let neighborhood = wed(context, region, groom, bride, timestep)?;
        tally(&mut counts, Some(neighborhood));
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::Ethnicity;
    use crate::parameters::{MarriageModel, ParametersValues};
    use crate::test_utils::{add_household, add_person, test_context_with, test_parameters};

    fn everyone_marries(moveout: f64) -> ParametersValues {
        let mut parameters = test_parameters();
        if let MarriageModel::Simple(tables) = &mut parameters.marriage.probability {
            for table in [&mut tables.male, &mut tables.female] {
                table.probs = vec![1.0; table.probs.len()];
            }
        }
        parameters.marriage.moveout_probability = moveout;
        parameters
    }

    fn clock(context: &Context) -> Clock {
        let model = &context.parameters().model;
        Clock::new(model.start, model.end, model.timestep_months)
    }

    #[test]
    fn age_gap_conversion_rounds_months() {
        assert_eq!(years_to_months(25.0), 300);
        assert_eq!(years_to_months(2.5), 30);
        assert_eq!(years_to_months(-2.5), -30);
    }

    #[test]
    fn bride_joins_grooms_household() {
        let (mut context, nid, rid) = test_context_with(everyone_marries(0.0), 3);
        let man = add_person(context.world_mut(), 26.0, Sex::Male, Ethnicity::Newar);
        let woman = add_person(context.world_mut(), 23.0, Sex::Female, Ethnicity::Newar);
        let his = add_household(context.world_mut(), nid, &[man]);
        let hers = add_household(context.world_mut(), nid, &[woman]);
        let clock = clock(&context);

        let counts = marriages(&mut context, rid, &clock).unwrap();
        assert_eq!(counts.get(&nid), Some(&1));
        let world = context.world();
        assert_eq!(world.person(man).spouse, Some(woman));
        assert_eq!(world.person(woman).spouse, Some(man));
        assert_eq!(world.person(woman).household, Some(his));
        assert_eq!(world.person(woman).marriage_timestep, Some(0));
        assert!(world.get_household(hers).is_none());
    }

    #[test]
    fn moveout_founds_a_household_near_the_groom() {
        let (mut context, nid, rid) = test_context_with(everyone_marries(1.0), 3);
        let man = add_person(context.world_mut(), 26.0, Sex::Male, Ethnicity::Newar);
        let brother = add_person(context.world_mut(), 10.0, Sex::Male, Ethnicity::Newar);
        let woman = add_person(context.world_mut(), 23.0, Sex::Female, Ethnicity::Newar);
        let his = add_household(context.world_mut(), nid, &[man, brother]);
        let other = context.world().neighborhood(nid).neighborhoods_by_distance[0];
        add_household(context.world_mut(), other, &[woman]);
        let clock = clock(&context);

        marriages(&mut context, rid, &clock).unwrap();
        let world = context.world();
        let household = world.person(man).household.unwrap();
        assert_ne!(household, his);
        assert_eq!(world.person(woman).household, Some(household));
        assert_eq!(world.household(household).neighborhood, Some(nid));
        assert!(world.neighborhood(nid).land_is_conserved());
    }

    #[test]
    fn unmatched_persons_marry_inmigrants() {
        let (mut context, nid, rid) = test_context_with(everyone_marries(0.0), 3);
        let woman = add_person(context.world_mut(), 18.0, Sex::Female, Ethnicity::LowHindu);
        let man = add_person(context.world_mut(), 30.0, Sex::Male, Ethnicity::Newar);
        add_household(context.world_mut(), nid, &[woman]);
        add_household(context.world_mut(), nid, &[man]);
        let clock = clock(&context);

        let counts = marriages(&mut context, rid, &clock).unwrap();
        assert_eq!(counts.values().sum::<u32>(), 2);
        let world = context.world();
        let husband = world.person(woman).spouse.unwrap();
        let wife = world.person(man).spouse.unwrap();
        for (spouse, partner) in [(husband, woman), (wife, man)] {
            let record = world.person(spouse);
            assert!(record.in_migrant);
            assert_eq!(record.ethnicity, world.person(partner).ethnicity);
            assert!(record.age_years() >= 15.0);
            assert_eq!(record.household, world.person(partner).household);
        }
        // The in-migrant groom has no household, so the couple founds one.
        assert!(world.person(husband).household.is_some());
    }

    #[test]
    fn children_and_married_persons_do_not_seek() {
        let (mut context, nid, rid) = test_context_with(everyone_marries(0.0), 3);
        let child = add_person(context.world_mut(), 10.0, Sex::Male, Ethnicity::Newar);
        let husband = add_person(context.world_mut(), 30.0, Sex::Male, Ethnicity::Newar);
        let wife = add_person(context.world_mut(), 28.0, Sex::Female, Ethnicity::Newar);
        context
            .world_mut()
            .marry(husband, wife, -50, crate::agents::DesiredChildren::Count(2));
        add_household(context.world_mut(), nid, &[child, husband, wife]);
        let clock = clock(&context);

        assert!(marriages(&mut context, rid, &clock).unwrap().is_empty());
        assert!(context.world().person(child).spouse.is_none());
        assert_eq!(context.world().person(husband).spouse, Some(wife));
    }
}
