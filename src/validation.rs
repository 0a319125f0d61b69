//! Consistency checks over the whole `World`.
//!
//! The model loop runs these every `output.validation_interval` timesteps and logs each
//! problem with `warn!`. Tests treat any problem as a failure.
use strum::IntoEnumIterator;

use crate::agents::{StoreKind, World};

/// Every structural problem found, as a readable message. Empty when the world is
/// consistent.
#[must_use]
pub fn validate_world(world: &World) -> Vec<String> {
    let mut problems = Vec::new();
    check_households(world, &mut problems);
    check_persons(world, &mut problems);
    check_stores(world, &mut problems);
    check_land(world, &mut problems);
    problems
}

fn check_households(world: &World, problems: &mut Vec<String>) {
    for household in world.households() {
        let hid = household.id;
        if household.is_defunct() {
            problems.push(format!("household {hid} has no members"));
        }
        match household.neighborhood {
            Some(nid) if !world.neighborhood(nid).households.contains(hid) => {
                problems.push(format!("household {hid} is missing from neighborhood {nid}"));
            }
            None => problems.push(format!("household {hid} is not placed")),
            Some(_) => {}
        }
        for pid in household.members.iter() {
            let Some(person) = world.get_person(pid) else {
                problems.push(format!("household {hid} lists unknown person {pid}"));
                continue;
            };
            if !person.alive {
                problems.push(format!("dead person {pid} is in household {hid}"));
            }
            if person.household != Some(hid) {
                problems.push(format!("person {pid} is listed in household {hid} but lives elsewhere"));
            }
        }
        for pid in household.away_members.iter() {
            if !world.get_person(pid).is_some_and(|p| p.away && p.last_household == Some(hid)) {
                problems.push(format!("household {hid} lists {pid} as away but they are not"));
            }
        }
    }
}

fn check_persons(world: &World, problems: &mut Vec<String>) {
    for person in world.persons() {
        let pid = person.id;
        if !person.alive || person.permanently_away {
            if person.household.is_some() || !person.stores.is_empty() {
                problems.push(format!("departed person {pid} is still in a container"));
            }
            continue;
        }
        let containers = usize::from(person.household.is_some()) + person.stores.len();
        if containers != 1 {
            problems.push(format!("person {pid} is in {containers} containers"));
        }
        if person.away && person.household.is_some() {
            problems.push(format!("person {pid} is away but present in a household"));
        }
        if let Some(spouse) = person.spouse {
            match world.get_person(spouse) {
                Some(record) if !record.alive => {
                    problems.push(format!("person {pid} is married to dead person {spouse}"));
                }
                Some(record) if record.spouse != Some(pid) => {
                    problems.push(format!("spouse link {pid} -> {spouse} is not mutual"));
                }
                None => problems.push(format!("person {pid} is married to unknown {spouse}")),
                Some(_) => {}
            }
        }
    }
}

fn check_stores(world: &World, problems: &mut Vec<String>) {
    for region in world.regions() {
        for kind in StoreKind::iter() {
            for pid in region.store(kind).iter() {
                let stored = world
                    .get_person(pid)
                    .is_some_and(|p| p.alive && p.stores.contains(&(region.id, kind)));
                if !stored {
                    problems.push(format!(
                        "store of region {} holds {pid} who does not belong there",
                        region.id
                    ));
                }
            }
        }
    }
}

fn check_land(world: &World, problems: &mut Vec<String>) {
    for neighborhood in world.neighborhoods() {
        if !neighborhood.land_is_conserved() {
            problems.push(format!(
                "land in neighborhood {} no longer sums to its total area",
                neighborhood.id
            ));
        }
    }
}
