//! The arena that owns every person, household, neighborhood and region.
//!
//! Relationships between records are IDs, so every operation that moves a person
//! between containers lives here and keeps both sides of each link in step. The
//! operations are deterministic: any random quantity they need (a plot area, a birth
//! interval, a migration length) is drawn by the caller and passed in.
//!
//! Person records are never removed. Dead and departed persons stay in the table so IDs
//! held by relatives keep resolving.
use std::collections::BTreeMap;

use crate::agents::agent_store::StoreKind;
use crate::agents::household::{Household, HouseholdFlags};
use crate::agents::neighborhood::Neighborhood;
use crate::agents::person::{DesiredChildren, Ethnicity, MigrationRecord, Person, Sex};
use crate::agents::region::Region;
use crate::hashing::{HashMap, HashSet};
use crate::ids::{HouseholdId, IdGenerator, NeighborhoodId, PersonId, RegionId};
use crate::log::trace;

/// One generator per entity type.
#[derive(Debug, Default)]
pub struct WorldIds {
    pub persons: IdGenerator,
    pub households: IdGenerator,
    pub neighborhoods: IdGenerator,
    pub regions: IdGenerator,
}

/// Values drawn for a birth before `World::give_birth` applies it.
#[derive(Copy, Clone, Debug)]
pub struct BirthDraws {
    /// Months the mother must wait before her next birth.
    pub mother_interval: i64,
    pub child_sex: Sex,
    /// Only used for daughters.
    pub child_interval: i64,
    pub child_first_birth_timing: i64,
}

#[derive(Debug, Default)]
pub struct World {
    pub ids: WorldIds,
    persons: HashMap<PersonId, Person>,
    households: HashMap<HouseholdId, Household>,
    neighborhoods: BTreeMap<NeighborhoodId, Neighborhood>,
    regions: BTreeMap<RegionId, Region>,
}

impl World {
    #[must_use]
    pub fn new() -> World {
        World::default()
    }

    // Tables

    pub fn add_region(&mut self, region: Region) {
        self.regions.insert(region.id, region);
    }

    /// Adds `neighborhood` to the table and to its region.
    ///
    /// # Panics
    ///
    /// Panics if the region does not exist.
    pub fn add_neighborhood(&mut self, neighborhood: Neighborhood) {
        self.region_mut(neighborhood.region)
            .neighborhoods
            .add(neighborhood.id);
        self.neighborhoods.insert(neighborhood.id, neighborhood);
    }

    pub fn insert_person(&mut self, person: Person) {
        self.persons.insert(person.id, person);
    }

    /// Creates a living person with a fresh ID.
    pub fn new_person(
        &mut self,
        birth_timestep: i64,
        age_months: i64,
        sex: Sex,
        ethnicity: Ethnicity,
    ) -> PersonId {
        let id = self.ids.persons.next();
        self.insert_person(Person::new(id, birth_timestep, age_months, sex, ethnicity));
        id
    }

    pub fn insert_household(&mut self, household: Household) {
        self.households.insert(household.id, household);
    }

    /// Creates an empty, unplaced household with a fresh ID.
    pub fn new_household(&mut self, flags: HouseholdFlags) -> HouseholdId {
        let id = self.ids.households.next();
        self.insert_household(Household::new(id, flags));
        id
    }

    // Lookups

    /// # Panics
    ///
    /// Panics if no person has this ID.
    #[must_use]
    pub fn person(&self, id: PersonId) -> &Person {
        self.persons
            .get(&id)
            .unwrap_or_else(|| panic!("Unknown person {id}"))
    }

    /// # Panics
    ///
    /// Panics if no person has this ID.
    pub fn person_mut(&mut self, id: PersonId) -> &mut Person {
        self.persons
            .get_mut(&id)
            .unwrap_or_else(|| panic!("Unknown person {id}"))
    }

    #[must_use]
    pub fn get_person(&self, id: PersonId) -> Option<&Person> {
        self.persons.get(&id)
    }

    pub fn persons(&self) -> impl Iterator<Item = &Person> {
        self.persons.values()
    }

    /// # Panics
    ///
    /// Panics if the household does not exist (never created, or already removed).
    #[must_use]
    pub fn household(&self, id: HouseholdId) -> &Household {
        self.households
            .get(&id)
            .unwrap_or_else(|| panic!("Unknown household {id}"))
    }

    /// # Panics
    ///
    /// Panics if the household does not exist.
    pub fn household_mut(&mut self, id: HouseholdId) -> &mut Household {
        self.households
            .get_mut(&id)
            .unwrap_or_else(|| panic!("Unknown household {id}"))
    }

    #[must_use]
    pub fn get_household(&self, id: HouseholdId) -> Option<&Household> {
        self.households.get(&id)
    }

    pub fn households(&self) -> impl Iterator<Item = &Household> {
        self.households.values()
    }

    /// # Panics
    ///
    /// Panics if the neighborhood does not exist.
    #[must_use]
    pub fn neighborhood(&self, id: NeighborhoodId) -> &Neighborhood {
        self.neighborhoods
            .get(&id)
            .unwrap_or_else(|| panic!("Unknown neighborhood {id}"))
    }

    /// # Panics
    ///
    /// Panics if the neighborhood does not exist.
    pub fn neighborhood_mut(&mut self, id: NeighborhoodId) -> &mut Neighborhood {
        self.neighborhoods
            .get_mut(&id)
            .unwrap_or_else(|| panic!("Unknown neighborhood {id}"))
    }

    #[must_use]
    pub fn get_neighborhood(&self, id: NeighborhoodId) -> Option<&Neighborhood> {
        self.neighborhoods.get(&id)
    }

    /// All neighborhoods in ID order.
    pub fn neighborhoods(&self) -> impl Iterator<Item = &Neighborhood> {
        self.neighborhoods.values()
    }

    pub(crate) fn neighborhoods_mut(&mut self) -> impl Iterator<Item = &mut Neighborhood> {
        self.neighborhoods.values_mut()
    }

    /// # Panics
    ///
    /// Panics if the region does not exist.
    #[must_use]
    pub fn region(&self, id: RegionId) -> &Region {
        self.regions
            .get(&id)
            .unwrap_or_else(|| panic!("Unknown region {id}"))
    }

    /// # Panics
    ///
    /// Panics if the region does not exist.
    pub fn region_mut(&mut self, id: RegionId) -> &mut Region {
        self.regions
            .get_mut(&id)
            .unwrap_or_else(|| panic!("Unknown region {id}"))
    }

    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    #[must_use]
    pub fn region_ids(&self) -> Vec<RegionId> {
        self.regions.keys().copied().collect()
    }

    /// The neighborhood of the household a person belongs to, present or away.
    #[must_use]
    pub fn person_neighborhood(&self, id: PersonId) -> Option<NeighborhoodId> {
        let household = self.person(id).home_household()?;
        self.households.get(&household)?.neighborhood
    }

    /// The neighborhood a present person lives in.
    ///
    /// # Panics
    ///
    /// Panics if the person is not present in a placed household.
    #[must_use]
    pub fn present_neighborhood(&self, id: PersonId) -> &Neighborhood {
        let nid = self
            .person(id)
            .household
            .and_then(|hid| self.household(hid).neighborhood)
            .unwrap_or_else(|| panic!("Person {id} is not present in a placed household"));
        self.neighborhood(nid)
    }

    /// The region a person is stored in or lives in.
    #[must_use]
    pub fn person_region(&self, id: PersonId) -> Option<RegionId> {
        if let Some(&(region, _)) = self.person(id).stores.first() {
            return Some(region);
        }
        self.person_neighborhood(id)
            .map(|nid| self.neighborhood(nid).region)
    }

    // Region traversal. Each returns a snapshot so callers can mutate while iterating.

    #[must_use]
    pub fn region_neighborhoods(&self, rid: RegionId) -> Vec<NeighborhoodId> {
        self.region(rid).neighborhoods.snapshot()
    }

    #[must_use]
    pub fn region_households(&self, rid: RegionId) -> Vec<HouseholdId> {
        self.region(rid)
            .neighborhoods
            .iter()
            .flat_map(|nid| self.neighborhood(nid).households.iter())
            .collect()
    }

    /// Persons present in a household of the region, by neighborhood then household.
    #[must_use]
    pub fn region_present_persons(&self, rid: RegionId) -> Vec<PersonId> {
        self.region_households(rid)
            .into_iter()
            .flat_map(|hid| self.household(hid).members.iter())
            .collect()
    }

    /// Present persons followed by everyone in the region's stores.
    #[must_use]
    pub fn region_all_persons(&self, rid: RegionId) -> Vec<PersonId> {
        let mut persons = self.region_present_persons(rid);
        persons.extend(self.region(rid).stored_persons());
        persons
    }

    /// Present plus stored persons across all regions.
    #[must_use]
    pub fn total_population(&self) -> usize {
        self.regions
            .keys()
            .map(|&rid| self.region_all_persons(rid).len())
            .sum()
    }

    // Household membership

    /// Makes `person` a present member of `household`.
    ///
    /// # Panics
    ///
    /// Panics if the person is dead or already present in a household.
    pub fn add_person_to_household(&mut self, person: PersonId, household: HouseholdId) {
        let record = self.person_mut(person);
        assert!(record.alive, "Person {person} is dead");
        assert!(
            record.household.is_none(),
            "Person {person} is already in household {}",
            record.household.map_or(0, |h| h.0)
        );
        record.household = Some(household);
        record.last_household = Some(household);
        self.household_mut(household).members.add(person);
    }

    /// Takes `person` out of their present household and removes the household if
    /// that leaves it defunct. Returns the household left.
    ///
    /// # Panics
    ///
    /// Panics if the person is not present in a household.
    pub fn remove_person_from_household(&mut self, person: PersonId) -> HouseholdId {
        let household = self
            .person_mut(person)
            .household
            .take()
            .unwrap_or_else(|| panic!("Person {person} is not in a household"));
        self.household_mut(household).members.remove(person);
        self.destroy_household_if_empty(household);
        household
    }

    /// Removes a household with no present and no away members from its neighborhood
    /// and the table, giving its plot back to agriculture.
    pub fn destroy_household_if_empty(&mut self, household: HouseholdId) -> bool {
        if !self.household(household).is_defunct() {
            return false;
        }
        let Some(removed) = self.households.remove(&household) else {
            return false;
        };
        if let Some(nid) = removed.neighborhood {
            let neighborhood = self.neighborhood_mut(nid);
            neighborhood.households.remove(household);
            neighborhood.release_plot(removed.area);
        }
        trace!("household {household} removed");
        true
    }

    /// Places an unplaced household in `neighborhood`.
    ///
    /// With `area = None` (loading the initial population) no land changes hands.
    /// Otherwise the plot is claimed from the neighborhood's vegetation; when there is no
    /// room the call returns false and nothing changes.
    ///
    /// # Panics
    ///
    /// Panics if the household is already placed.
    pub fn add_household_to_neighborhood(
        &mut self,
        household: HouseholdId,
        neighborhood: NeighborhoodId,
        area: Option<f64>,
    ) -> bool {
        assert!(
            self.household(household).neighborhood.is_none(),
            "Household {household} is already placed"
        );
        if let Some(area) = area {
            if !self.neighborhood_mut(neighborhood).claim_plot(area) {
                return false;
            }
            self.household_mut(household).area = area;
        }
        self.neighborhood_mut(neighborhood).households.add(household);
        self.household_mut(household).neighborhood = Some(neighborhood);
        true
    }

    /// The oldest present member.
    #[must_use]
    pub fn household_head(&self, household: HouseholdId) -> Option<PersonId> {
        self.household(household)
            .members
            .iter()
            .max_by_key(|&pid| (self.person(pid).age_months, std::cmp::Reverse(pid)))
    }

    /// Share of present members who are female; zero for an empty household.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn household_mean_gender(&self, household: HouseholdId) -> f64 {
        let members = &self.household(household).members;
        if members.is_empty() {
            return 0.0;
        }
        let females = members
            .iter()
            .filter(|&pid| self.person(pid).is_female())
            .count();
        females as f64 / members.len() as f64
    }

    // Life events

    /// Records a birth to `mother` and `father`, redrawing the mother's interval.
    ///
    /// With `simulate` set only the mother's birth history changes; no child is
    /// created. The child is not placed in a household.
    ///
    /// # Panics
    ///
    /// Panics if the mother is not a married woman or `father` is not her spouse.
    pub fn give_birth(
        &mut self,
        mother: PersonId,
        father: PersonId,
        timestep: i64,
        draws: &BirthDraws,
        simulate: bool,
    ) -> Option<PersonId> {
        let mother_record = self.person(mother);
        assert!(mother_record.is_female(), "Person {mother} cannot give birth");
        assert_eq!(
            mother_record.spouse,
            Some(father),
            "Father {father} is not the spouse of mother {mother}"
        );
        let ethnicity = mother_record.ethnicity;
        let household = mother_record.household;

        let mother_record = self.person_mut(mother);
        mother_record.last_birth_timestep = Some(timestep);
        mother_record.birth_interval = Some(draws.mother_interval);
        if simulate {
            return None;
        }

        let child = self.new_person(timestep, 0, draws.child_sex, ethnicity);
        let neighborhood = household.and_then(|hid| self.household(hid).neighborhood);
        let childhood_context = neighborhood.map(|nid| self.neighborhood(nid).community_context());
        {
            let record = self.person_mut(child);
            record.mother = Some(mother);
            record.father = Some(father);
            record.birth_household = household;
            record.birth_neighborhood = neighborhood;
            record.childhood_context = childhood_context.unwrap_or_default();
            record.first_birth_timing = draws.child_first_birth_timing;
            if record.is_female() {
                record.birth_interval = Some(draws.child_interval);
            }
        }
        for parent in [mother, father] {
            let record = self.person_mut(parent);
            record.children.push(child);
            record.num_children += 1;
        }
        Some(child)
    }

    /// Marries a man and a woman. The bride takes `bride_desired` as her desired family
    /// size unless she already has one.
    ///
    /// # Panics
    ///
    /// Panics if either is married, they are the same sex, or their ethnicities differ.
    pub fn marry(
        &mut self,
        first: PersonId,
        second: PersonId,
        timestep: i64,
        bride_desired: DesiredChildren,
    ) {
        let (a, b) = (self.person(first), self.person(second));
        assert!(
            !a.is_married() && !b.is_married(),
            "Persons {first} and {second} must both be unmarried"
        );
        assert_ne!(a.sex, b.sex, "Persons {first} and {second} are the same sex");
        assert_eq!(
            a.ethnicity, b.ethnicity,
            "Persons {first} and {second} differ in ethnicity"
        );
        let bride = if a.is_female() { first } else { second };
        for (person, spouse) in [(first, second), (second, first)] {
            let record = self.person_mut(person);
            record.spouse = Some(spouse);
            record.marriage_timestep = Some(timestep);
        }
        let bride = self.person_mut(bride);
        if bride.desired_children == DesiredChildren::Unset {
            bride.desired_children = bride_desired;
        }
    }

    /// # Panics
    ///
    /// Panics if `person` is not married.
    pub fn divorce(&mut self, person: PersonId) {
        let spouse = self
            .person(person)
            .spouse
            .unwrap_or_else(|| panic!("Person {person} is not married"));
        for id in [person, spouse] {
            let record = self.person_mut(id);
            record.spouse = None;
            record.marriage_timestep = None;
            record.ever_divorced = true;
        }
    }

    /// Records a death: widows the spouse, takes the person out of their household or
    /// store, and adds them to the cemetery of their region.
    ///
    /// # Panics
    ///
    /// Panics if the person is already dead.
    pub fn kill(&mut self, person: PersonId, timestep: i64) {
        assert!(self.person(person).alive, "Person {person} is already dead");
        let region = self.person_region(person);
        self.leave_containers(person);

        let record = self.person_mut(person);
        record.alive = false;
        record.death_timestep = Some(timestep);
        record.marriage_timestep = None;
        if let Some(spouse) = record.spouse.take() {
            let spouse = self.person_mut(spouse);
            spouse.spouse = None;
            spouse.marriage_timestep = None;
            spouse.ever_widowed = true;
        }
        if let Some(region) = region {
            self.region_mut(region).cemetery.push(person);
        }
    }

    /// Moves a present person to the away list of their household and into the
    /// region's long-distance store until `timestep + months_away`.
    ///
    /// # Panics
    ///
    /// Panics if the person is not present in a household.
    pub fn make_individual_long_distance_migration(
        &mut self,
        person: PersonId,
        region: RegionId,
        timestep: i64,
        months_away: i64,
    ) {
        let household = self
            .person(person)
            .household
            .unwrap_or_else(|| panic!("Person {person} is not in a household"));
        {
            let record = self.household_mut(household);
            record.last_migrant_timestep = Some(timestep);
            // Joining the away list first keeps the household alive.
            record.away_members.add(person);
        }
        self.remove_person_from_household(person);

        let release = timestep.saturating_add(months_away);
        self.region_mut(region)
            .store_mut(StoreKind::LongDistance)
            .add(person, release);
        let record = self.person_mut(person);
        record.away = true;
        record.stores.push((region, StoreKind::LongDistance));
        record.return_timestep = Some(release);
        record.last_migration = Some(MigrationRecord {
            kind: StoreKind::LongDistance,
            timestep,
            duration_months: months_away,
        });
    }

    /// Removes a present or away person from the model for good.
    pub fn make_permanent_outmigration(&mut self, person: PersonId) {
        assert!(self.person(person).alive, "Person {person} is dead");
        self.leave_containers(person);
        let record = self.person_mut(person);
        record.permanently_away = true;
        record.return_timestep = None;
    }

    /// Returns every long-distance migrant of `region` due by `timestep` to their last
    /// household. Persons released are not released again.
    pub fn release_migrants(&mut self, region: RegionId, timestep: i64) -> Vec<PersonId> {
        let released = self
            .region_mut(region)
            .store_mut(StoreKind::LongDistance)
            .release(timestep);
        for &person in &released {
            let record = self.person_mut(person);
            record
                .stores
                .retain(|&stored| stored != (region, StoreKind::LongDistance));
            record.away = false;
            record.return_timestep = None;
            let household = record
                .last_household
                .unwrap_or_else(|| panic!("Migrant {person} has no household to return to"));
            self.household_mut(household).away_members.remove(person);
            self.add_person_to_household(person, household);
        }
        released
    }

    /// Permanently out-migrates every present member. Away members keep the household.
    pub fn out_migrate_household(&mut self, household: HouseholdId) -> Vec<PersonId> {
        let members = self.household(household).members.snapshot();
        for &person in &members {
            self.make_permanent_outmigration(person);
        }
        members
    }

    /// Ages every present and stored person of `region` by `months`.
    ///
    /// # Panics
    ///
    /// Panics if the traversal reaches a person twice.
    pub fn increment_age(&mut self, region: RegionId, months: i64) {
        let mut seen = HashSet::default();
        for person in self.region_all_persons(region) {
            assert!(
                seen.insert(person),
                "Person {person} was aged twice in one timestep"
            );
            self.person_mut(person).age_months += months;
        }
    }

    /// Whether `mate`'s mother counts `person` among her children.
    #[must_use]
    pub fn is_sibling(&self, person: PersonId, mate: PersonId) -> bool {
        let mate_record = self.person(mate);
        if mate_record.in_migrant {
            return false;
        }
        mate_record
            .mother
            .and_then(|mother| self.get_person(mother))
            .is_some_and(|mother| mother.children.contains(&person))
    }

    fn leave_containers(&mut self, person: PersonId) {
        let record = self.person(person);
        if record.away {
            if let Some(household) = record.last_household {
                if self.households.contains_key(&household) {
                    self.household_mut(household).away_members.remove(person);
                    self.destroy_household_if_empty(household);
                }
            }
        } else if record.household.is_some() {
            self.remove_person_from_household(person);
        }
        let stores = std::mem::take(&mut self.person_mut(person).stores);
        for (region, kind) in stores {
            self.region_mut(region).store_mut(kind).remove(person);
        }
        let record = self.person_mut(person);
        record.away = false;
        record.household = None;
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;
    use crate::agents::neighborhood::LandUse;

    const DRAWS: BirthDraws = BirthDraws {
        mother_interval: 20,
        child_sex: Sex::Female,
        child_interval: 15,
        child_first_birth_timing: 9,
    };

    fn world() -> (World, RegionId, NeighborhoodId) {
        let mut world = World::new();
        let rid: RegionId = world.ids.regions.next();
        world.add_region(Region::new(rid));
        let nid: NeighborhoodId = world.ids.neighborhoods.next();
        let land = LandUse {
            agveg: 1000.0,
            nonagveg: 500.0,
            privbldg: 100.0,
            pubbldg: 50.0,
            other: 50.0,
        };
        world.add_neighborhood(Neighborhood::new(nid, rid, land, 0.0, 0.0));
        (world, rid, nid)
    }

    fn household_with(world: &mut World, nid: NeighborhoodId, people: &[PersonId]) -> HouseholdId {
        let hid = world.new_household(HouseholdFlags::default());
        assert!(world.add_household_to_neighborhood(hid, nid, Some(40.0)));
        for &pid in people {
            world.add_person_to_household(pid, hid);
        }
        hid
    }

    fn couple(world: &mut World) -> (PersonId, PersonId) {
        let wife = world.new_person(-300, 300, Sex::Female, Ethnicity::Newar);
        let husband = world.new_person(-330, 330, Sex::Male, Ethnicity::Newar);
        world.marry(husband, wife, -12, DesiredChildren::Count(3));
        (wife, husband)
    }

    #[test]
    fn last_member_leaving_destroys_household() {
        let (mut world, _, nid) = world();
        let pid = world.new_person(-400, 400, Sex::Male, Ethnicity::HighHindu);
        let hid = household_with(&mut world, nid, &[pid]);
        assert_approx_eq!(world.neighborhood(nid).land.agveg, 960.0);

        world.kill(pid, 3);

        assert!(world.get_household(hid).is_none());
        assert!(!world.neighborhood(nid).households.contains(hid));
        assert_approx_eq!(world.neighborhood(nid).land.agveg, 1000.0);
        assert_approx_eq!(world.neighborhood(nid).land.privbldg, 100.0);
        assert!(world.neighborhood(nid).land_is_conserved());
    }

    #[test]
    fn migrant_is_released_when_due() {
        let (mut world, rid, nid) = world();
        let (wife, husband) = couple(&mut world);
        let hid = household_with(&mut world, nid, &[wife, husband]);

        world.make_individual_long_distance_migration(husband, rid, 50, 12);
        assert!(world.person(husband).away);
        assert!(world.household(hid).away_members.contains(husband));
        assert!(!world.household(hid).members.contains(husband));
        assert_eq!(world.household(hid).last_migrant_timestep, Some(50));

        assert!(world.release_migrants(rid, 61).is_empty());
        assert_eq!(world.release_migrants(rid, 62), vec![husband]);
        assert!(world.release_migrants(rid, 62).is_empty());

        let record = world.person(husband);
        assert!(!record.away);
        assert!(record.stores.is_empty());
        assert_eq!(record.household, Some(hid));
        assert!(world.household(hid).away_members.is_empty());
    }

    #[test]
    fn household_survives_while_member_is_away() {
        let (mut world, rid, nid) = world();
        let pid = world.new_person(-300, 300, Sex::Male, Ethnicity::Newar);
        let hid = household_with(&mut world, nid, &[pid]);
        world.make_individual_long_distance_migration(pid, rid, 0, 6);
        assert!(world.get_household(hid).is_some());
        assert_eq!(world.household(hid).num_members(), 0);
        assert_eq!(world.region_all_persons(rid), vec![pid]);
    }

    #[test]
    fn death_while_away_clears_store_and_household() {
        let (mut world, rid, nid) = world();
        let pid = world.new_person(-300, 300, Sex::Male, Ethnicity::Newar);
        let hid = household_with(&mut world, nid, &[pid]);
        world.make_individual_long_distance_migration(pid, rid, 0, 6);

        world.kill(pid, 2);

        assert!(world.region(rid).long_distance_store.is_empty());
        assert!(world.get_household(hid).is_none());
        assert_eq!(world.region(rid).cemetery, vec![pid]);
        assert!(world.release_migrants(rid, 6).is_empty());
    }

    #[test]
    fn death_widows_spouse() {
        let (mut world, _, nid) = world();
        let (wife, husband) = couple(&mut world);
        household_with(&mut world, nid, &[wife, husband]);
        world.kill(husband, 0);
        let widow = world.person(wife);
        assert!(widow.spouse.is_none());
        assert!(widow.ever_widowed);
        assert!(!world.person(husband).alive);
        assert_eq!(world.person(husband).death_timestep, Some(0));
    }

    #[test]
    fn simulated_birth_creates_no_one() {
        let (mut world, rid, nid) = world();
        let (wife, husband) = couple(&mut world);
        household_with(&mut world, nid, &[wife, husband]);
        let before = world.persons().count();

        let child = world.give_birth(wife, husband, -5, &DRAWS, true);

        assert!(child.is_none());
        assert_eq!(world.persons().count(), before);
        assert_eq!(world.region_all_persons(rid).len(), 2);
        let mother = world.person(wife);
        assert_eq!(mother.last_birth_timestep, Some(-5));
        assert_eq!(mother.birth_interval, Some(20));
        assert_eq!(mother.num_children, 0);
    }

    #[test]
    fn birth_links_child_to_parents() {
        let (mut world, _, nid) = world();
        let (wife, husband) = couple(&mut world);
        let hid = household_with(&mut world, nid, &[wife, husband]);

        let child = world.give_birth(wife, husband, 4, &DRAWS, false).unwrap();

        let record = world.person(child);
        assert_eq!(record.mother, Some(wife));
        assert_eq!(record.father, Some(husband));
        assert_eq!(record.ethnicity, Ethnicity::Newar);
        assert_eq!(record.age_months, 0);
        assert_eq!(record.birth_household, Some(hid));
        assert_eq!(record.birth_interval, Some(15));
        assert_eq!(world.person(wife).children, vec![child]);
        assert_eq!(world.person(husband).num_children, 1);
        assert!(world.is_sibling(child, child));
    }

    #[test]
    #[should_panic(expected = "is not the spouse of mother")]
    fn birth_requires_spouse_as_father() {
        let (mut world, _, _) = world();
        let (wife, _) = couple(&mut world);
        let stranger = world.new_person(-300, 300, Sex::Male, Ethnicity::Newar);
        world.give_birth(wife, stranger, 0, &DRAWS, false);
    }

    #[test]
    #[should_panic(expected = "must both be unmarried")]
    fn marrying_twice_panics() {
        let (mut world, _, _) = world();
        let (wife, _) = couple(&mut world);
        let other = world.new_person(-300, 300, Sex::Male, Ethnicity::Newar);
        world.marry(wife, other, 0, DesiredChildren::NoPreference);
    }

    #[test]
    #[should_panic(expected = "differ in ethnicity")]
    fn marriage_across_ethnicity_panics() {
        let (mut world, _, _) = world();
        let a = world.new_person(-300, 300, Sex::Female, Ethnicity::Newar);
        let b = world.new_person(-300, 300, Sex::Male, Ethnicity::LowHindu);
        world.marry(a, b, 0, DesiredChildren::NoPreference);
    }

    #[test]
    fn marriage_sets_bride_preferences_once() {
        let (mut world, _, _) = world();
        let (wife, husband) = couple(&mut world);
        assert_eq!(world.person(wife).desired_children, DesiredChildren::Count(3));
        assert_eq!(world.person(husband).desired_children, DesiredChildren::Unset);
        world.divorce(husband);
        world.marry(wife, husband, 0, DesiredChildren::Count(5));
        assert_eq!(world.person(wife).desired_children, DesiredChildren::Count(3));
    }

    #[test]
    fn divorce_clears_both_sides() {
        let (mut world, _, _) = world();
        let (wife, husband) = couple(&mut world);
        world.divorce(wife);
        for pid in [wife, husband] {
            let record = world.person(pid);
            assert!(record.spouse.is_none());
            assert!(record.marriage_timestep.is_none());
            assert!(record.ever_divorced);
        }
    }

    #[test]
    #[should_panic(expected = "is not married")]
    fn divorcing_single_person_panics() {
        let (mut world, _, _) = world();
        let pid = world.new_person(-300, 300, Sex::Male, Ethnicity::Newar);
        world.divorce(pid);
    }

    #[test]
    fn permanent_outmigration_of_away_member() {
        let (mut world, rid, nid) = world();
        let (wife, husband) = couple(&mut world);
        let hid = household_with(&mut world, nid, &[wife, husband]);
        world.make_individual_long_distance_migration(husband, rid, 0, 99_999_999);
        world.make_permanent_outmigration(husband);
        let record = world.person(husband);
        assert!(record.permanently_away);
        assert!(!record.away);
        assert!(record.stores.is_empty());
        assert!(world.household(hid).away_members.is_empty());
        assert_eq!(world.region_all_persons(rid), vec![wife]);
    }

    #[test]
    fn household_outmigration_keeps_away_members_linked() {
        let (mut world, rid, nid) = world();
        let (wife, husband) = couple(&mut world);
        let hid = household_with(&mut world, nid, &[wife, husband]);
        world.make_individual_long_distance_migration(wife, rid, 0, 3);
        assert_eq!(world.out_migrate_household(hid), vec![husband]);
        assert!(world.get_household(hid).is_some());
        assert_eq!(world.release_migrants(rid, 3), vec![wife]);
        assert_eq!(world.person(wife).household, Some(hid));
    }

    #[test]
    fn full_neighborhood_rejects_household() {
        let (mut world, _, nid) = world();
        let hid = world.new_household(HouseholdFlags::default());
        assert!(!world.add_household_to_neighborhood(hid, nid, Some(5000.0)));
        assert!(world.household(hid).neighborhood.is_none());
        assert!(world.add_household_to_neighborhood(hid, nid, None));
        assert_approx_eq!(world.neighborhood(nid).land.privbldg, 100.0);
    }

    #[test]
    fn aging_covers_present_and_stored() {
        let (mut world, rid, nid) = world();
        let (wife, husband) = couple(&mut world);
        household_with(&mut world, nid, &[wife, husband]);
        world.make_individual_long_distance_migration(husband, rid, 0, 10);
        world.increment_age(rid, 1);
        assert_eq!(world.person(wife).age_months, 301);
        assert_eq!(world.person(husband).age_months, 331);
    }

    #[test]
    #[should_panic(expected = "aged twice in one timestep")]
    fn aging_detects_double_membership() {
        let (mut world, rid, nid) = world();
        let pid = world.new_person(-300, 300, Sex::Male, Ethnicity::Newar);
        household_with(&mut world, nid, &[pid]);
        // Corrupt the tables on purpose.
        world.region_mut(rid).long_distance_store.add(pid, 10);
        world.increment_age(rid, 1);
    }

    #[test]
    fn head_is_oldest_present_member() {
        let (mut world, _, nid) = world();
        let (wife, husband) = couple(&mut world);
        let hid = household_with(&mut world, nid, &[wife, husband]);
        assert_eq!(world.household_head(hid), Some(husband));
        assert_approx_eq!(world.household_mean_gender(hid), 0.5);
    }
}
