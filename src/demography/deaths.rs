use crate::agents::ContextWorldExt;
use crate::context::Context;
use crate::define_rng;
use crate::demographics_report::{record_person_event, PersonEvent};
use crate::demography::{tally, NeighborhoodCounts};
use crate::ids::RegionId;
use crate::log::trace;
use crate::random::ContextRandomExt;
use crate::statistics::ContextStatisticsExt;

define_rng!(DeathRng);

/// Every present and stored person of `region` draws against the death table, except
/// children born this timestep. Deaths of persons away on a migration are not counted
/// against a neighborhood.
pub fn deaths(context: &mut Context, region: RegionId, timestep: i64) -> NeighborhoodCounts {
    let mut counts = NeighborhoodCounts::new();
    for person in context.world().region_all_persons(region) {
        let record = context.world().person(person);
        if !record.alive || record.permanently_away {
            continue;
        }
        if record.birth_timestep == timestep && !record.initial_agent {
            continue;
        }
        let probability = context.statistics().death_probability(record);
        let present = record.is_present();
        if !context.sample_bool(DeathRng, probability) {
            continue;
        }
        let neighborhood = if present {
            context.world().person_neighborhood(person)
        } else {
            None
        };
        record_person_event(context, PersonEvent::Death, person, timestep);
        context.world_mut().kill(person, timestep);
        trace!("person {person} died");
        tally(&mut counts, neighborhood);
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{DesiredChildren, Ethnicity, Sex};
    use crate::demography::births::births;
    use crate::test_utils::{add_household, add_person, test_context_with, test_parameters};

    fn certain_death() -> crate::parameters::ParametersValues {
        let mut parameters = test_parameters();
        for table in [&mut parameters.death.male, &mut parameters.death.female] {
            table.probs = vec![1.0; table.probs.len()];
        }
        parameters
    }

    #[test]
    fn everyone_dies_when_death_is_certain() {
        let (mut context, nid, rid) = test_context_with(certain_death(), 1);
        let husband = add_person(context.world_mut(), 50.0, Sex::Male, Ethnicity::Newar);
        let wife = add_person(context.world_mut(), 45.0, Sex::Female, Ethnicity::Newar);
        let son = add_person(context.world_mut(), 20.0, Sex::Male, Ethnicity::Newar);
        context
            .world_mut()
            .marry(husband, wife, -100, DesiredChildren::Count(2));
        let hid = add_household(context.world_mut(), nid, &[husband, wife, son]);
        context
            .world_mut()
            .make_individual_long_distance_migration(son, rid, 0, 12);

        let counts = deaths(&mut context, rid, 3);
        // The migrant's death is not counted against the neighborhood.
        assert_eq!(counts.get(&nid), Some(&2));
        let world = context.world();
        assert!(world.get_household(hid).is_none());
        for pid in [husband, wife, son] {
            assert!(!world.person(pid).alive);
            assert_eq!(world.person(pid).death_timestep, Some(3));
        }
        assert_eq!(world.region(rid).cemetery.len(), 3);
        assert!(world.region(rid).long_distance_store.is_empty());
    }

    #[test]
    fn newborns_survive_their_birth_timestep() {
        let mut parameters = test_parameters();
        for table in [&mut parameters.death.male, &mut parameters.death.female] {
            table.probs = vec![0.0; table.probs.len()];
            table.probs[0] = 1.0;
        }
        let (mut context, nid, rid) = test_context_with(parameters, 1);
        let husband = add_person(context.world_mut(), 26.0, Sex::Male, Ethnicity::Newar);
        let wife = add_person(context.world_mut(), 22.0, Sex::Female, Ethnicity::Newar);
        context
            .world_mut()
            .marry(husband, wife, 0, DesiredChildren::Count(3));
        add_household(context.world_mut(), nid, &[husband, wife]);
        context.world_mut().person_mut(wife).first_birth_timing = 9;

        births(&mut context, rid, 10, false);
        let child = context.world().person(wife).children[0];
        assert!(deaths(&mut context, rid, 10).is_empty());
        assert!(context.world().person(child).alive);

        // Still an infant in the next timestep, now exposed.
        deaths(&mut context, rid, 11);
        assert_eq!(context.world().person(child).death_timestep, Some(11));
        assert!(context.world().person(wife).alive);
    }

    #[test]
    fn nobody_dies_at_zero_risk() {
        let mut parameters = test_parameters();
        for table in [&mut parameters.death.male, &mut parameters.death.female] {
            table.probs = vec![0.0; table.probs.len()];
        }
        let (mut context, nid, rid) = test_context_with(parameters, 1);
        let pid = add_person(context.world_mut(), 80.0, Sex::Female, Ethnicity::Newar);
        add_household(context.world_mut(), nid, &[pid]);
        assert!(deaths(&mut context, rid, 0).is_empty());
        assert!(context.world().person(pid).alive);
    }
}
