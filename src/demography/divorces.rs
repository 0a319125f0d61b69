use crate::agents::ContextWorldExt;
use crate::context::Context;
use crate::define_rng;
use crate::demographics_report::{record_person_event, PersonEvent};
use crate::demography::placement::{found_household, place_household, random_neighborhood};
use crate::demography::{tally, NeighborhoodCounts};
use crate::error::AbmError;
use crate::ids::{HouseholdId, PersonId, RegionId};
use crate::log::trace;
use crate::random::ContextRandomExt;
use crate::statistics::ContextStatisticsExt;

define_rng!(DivorceRng);

/// Where a divorced woman goes.
enum Rehousing {
    /// Already gone for good.
    Gone,
    Outmigrate,
    MothersHousehold(HouseholdId),
    NewHousehold,
}

fn rehousing(context: &Context, wife: PersonId) -> Rehousing {
    let world = context.world();
    let record = world.person(wife);
    if record.permanently_away || !record.alive {
        return Rehousing::Gone;
    }
    if record.away {
        return Rehousing::Outmigrate;
    }
    record
        .mother
        .and_then(|mother| world.get_person(mother))
        .filter(|mother| mother.is_present())
        .and_then(|mother| mother.household)
        .map_or(Rehousing::NewHousehold, Rehousing::MothersHousehold)
}

/// Checks every married person of `region` once, present or away, and divorces couples
/// that draw a divorce. The divorce is counted in the husband's neighborhood.
///
/// # Errors
///
/// `AbmError::NoLandAvailable` when a divorced woman's new household fits nowhere.
pub fn divorces(
    context: &mut Context,
    region: RegionId,
    timestep: i64,
) -> Result<NeighborhoodCounts, AbmError> {
    let probability = context.statistics().divorce_probability();
    let mut counts = NeighborhoodCounts::new();
    for person in context.world().region_all_persons(region) {
        let record = context.world().person(person);
        let Some(spouse) = record.spouse else {
            continue;
        };
        if !record.alive || record.permanently_away || record.last_divorce_check == Some(timestep)
        {
            continue;
        }
        let female = record.is_female();
        for id in [person, spouse] {
            context.world_mut().person_mut(id).last_divorce_check = Some(timestep);
        }
        if !context.sample_bool(DivorceRng, probability) {
            continue;
        }

        let (husband, wife) = if female {
            (spouse, person)
        } else {
            (person, spouse)
        };
        let world = context.world();
        let neighborhood = world
            .person(husband)
            .home_household()
            .and_then(|hid| world.get_household(hid))
            .and_then(|household| household.neighborhood);
        record_person_event(context, PersonEvent::Divorce, husband, timestep);
        record_person_event(context, PersonEvent::Divorce, wife, timestep);
        context.world_mut().divorce(husband);
        tally(&mut counts, neighborhood);

        match rehousing(context, wife) {
            Rehousing::Gone => {}
            Rehousing::Outmigrate => {
                record_person_event(context, PersonEvent::PermanentOutmigration, wife, timestep);
                context.world_mut().make_permanent_outmigration(wife);
            }
            Rehousing::MothersHousehold(household) => {
                let world = context.world_mut();
                world.remove_person_from_household(wife);
                world.add_person_to_household(wife, household);
                trace!("divorced {wife} moved to her mother's household {household}");
            }
            Rehousing::NewHousehold => {
                context.world_mut().remove_person_from_household(wife);
                let household = found_household(context);
                let preferred = random_neighborhood(context, region);
                place_household(context, household, preferred)?;
                context.world_mut().add_person_to_household(wife, household);
                trace!("divorced {wife} founded household {household}");
            }
        }
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{DesiredChildren, Ethnicity, Sex};
    use crate::test_utils::{add_household, add_person, test_context_with, test_parameters};

    fn certain_divorce() -> (Context, crate::ids::NeighborhoodId, RegionId) {
        let mut parameters = test_parameters();
        parameters.marriage.divorce_probability = 1.0;
        test_context_with(parameters, 4)
    }

    fn married_couple(context: &mut Context, nid: crate::ids::NeighborhoodId) -> (PersonId, PersonId, HouseholdId) {
        let world = context.world_mut();
        let husband = add_person(world, 30.0, Sex::Male, Ethnicity::TeraiTibeto);
        let wife = add_person(world, 27.0, Sex::Female, Ethnicity::TeraiTibeto);
        world.marry(husband, wife, -40, DesiredChildren::Count(2));
        let hid = add_household(world, nid, &[husband, wife]);
        (husband, wife, hid)
    }

    #[test]
    fn divorced_wife_returns_to_her_mother() {
        let (mut context, nid, rid) = certain_divorce();
        let (husband, wife, hid) = married_couple(&mut context, nid);
        let mother = add_person(context.world_mut(), 55.0, Sex::Female, Ethnicity::TeraiTibeto);
        let other = context.world().neighborhood(nid).neighborhoods_by_distance[0];
        let mothers = add_household(context.world_mut(), other, &[mother]);
        context.world_mut().person_mut(wife).mother = Some(mother);

        let counts = divorces(&mut context, rid, 5).unwrap();
        assert_eq!(counts.get(&nid), Some(&1));
        let world = context.world();
        assert!(world.person(husband).spouse.is_none());
        assert!(world.person(wife).ever_divorced);
        assert_eq!(world.person(wife).household, Some(mothers));
        assert_eq!(world.person(husband).household, Some(hid));
        assert_eq!(world.person(husband).last_divorce_check, Some(5));
    }

    #[test]
    fn divorced_wife_without_mother_founds_a_household() {
        let (mut context, nid, rid) = certain_divorce();
        let (_, wife, hid) = married_couple(&mut context, nid);

        divorces(&mut context, rid, 5).unwrap();
        let world = context.world();
        let household = world.person(wife).household.unwrap();
        assert_ne!(household, hid);
        assert!(world.household(household).area > 0.0);
    }

    #[test]
    fn away_wife_outmigrates_and_husband_is_credited() {
        let (mut context, nid, rid) = certain_divorce();
        let (husband, wife, hid) = married_couple(&mut context, nid);
        context
            .world_mut()
            .make_individual_long_distance_migration(husband, rid, 0, 12);
        context
            .world_mut()
            .make_individual_long_distance_migration(wife, rid, 0, 12);

        let counts = divorces(&mut context, rid, 2).unwrap();
        assert_eq!(counts.get(&nid), Some(&1));
        let world = context.world();
        assert!(world.person(wife).permanently_away);
        assert!(!world.region(rid).long_distance_store.contains(wife));
        assert!(world.household(hid).away_members.contains(husband));
    }

    #[test]
    fn couples_are_checked_once_per_timestep() {
        let (mut context, nid, rid) = certain_divorce();
        let (husband, wife, _) = married_couple(&mut context, nid);
        context.world_mut().person_mut(husband).last_divorce_check = Some(7);
        context.world_mut().person_mut(wife).last_divorce_check = Some(7);
        assert!(divorces(&mut context, rid, 7).unwrap().is_empty());
        assert_eq!(context.world().person(wife).spouse, Some(husband));
    }
}
