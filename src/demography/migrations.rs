use crate::agents::ContextWorldExt;
use crate::context::Context;
use crate::define_rng;
use crate::demographics_report::{record_person_event, PersonEvent};
use crate::demography::{tally, NeighborhoodCounts};
use crate::ids::RegionId;
use crate::log::trace;
use crate::random::ContextRandomExt;
use crate::statistics::ContextStatisticsExt;

define_rng!(MigrationRng);

/// Sends present persons of `region` who draw a migration away for a drawn number of
/// months, then brings back everyone whose time away is up. Returns departures and
/// returns, counted by the household's neighborhood.
///
/// During burn-in no migration is permanent and no events are recorded.
pub fn individual_migrations(
    context: &mut Context,
    region: RegionId,
    timestep: i64,
    burn_in: bool,
) -> (NeighborhoodCounts, NeighborhoodCounts) {
    let mut departures = NeighborhoodCounts::new();
    for person in context.world().region_present_persons(region) {
        if !context.world().person(person).is_present() {
            continue;
        }
        let probability = context
            .statistics()
            .migration_probability(context.world(), person);
        if !context.sample_bool(MigrationRng, probability) {
            continue;
        }
        let months = {
            let stats = context.statistics();
            context.sample(MigrationRng, |rng| stats.draw_migration_length(rng, burn_in))
        };
        let neighborhood = context.world().person_neighborhood(person);
        context
            .world_mut()
            .make_individual_long_distance_migration(person, region, timestep, months);
        trace!("person {person} left for {months} months");
        if !burn_in {
            record_person_event(context, PersonEvent::LdMigration, person, timestep);
        }
        tally(&mut departures, neighborhood);
    }

    let mut returns = NeighborhoodCounts::new();
    for person in context.world_mut().release_migrants(region, timestep) {
        if !burn_in {
            record_person_event(context, PersonEvent::LdReturn, person, timestep);
        }
        tally(&mut returns, context.world().person_neighborhood(person));
    }
    (departures, returns)
}
