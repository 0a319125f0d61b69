//! Builds the initial `World` from the CVFS survey extracts in `model.input_data_dir`:
//! `neigh.csv`, `neigh_coords.csv`, `hhag.csv` and `hhrel.csv`.
//!
//! Survey IDs are kept as model IDs. Relationships in `hhrel.csv` are subject numbers
//! within a household; references that do not resolve are dropped with a warning.
use std::path::Path;

use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::agents::{
    CommunityContext, ContextWorldExt, DesiredChildren, Ethnicity, ForestType, Household,
    HouseholdFlags, LandUse, Neighborhood, ParentalBackground, Person, Region, SchoolStatus,
    Sex, ServiceTimes,
};
use crate::context::Context;
use crate::define_rng;
use crate::error::AbmError;
use crate::hashing::{HashMap, HashSet};
use crate::ids::{HouseholdId, NeighborhoodId, PersonId, RegionId};
use crate::log::{info, warn};
use crate::parameters::ContextParametersExt;
use crate::random::ContextRandomExt;
use crate::statistics::ContextStatisticsExt;

define_rng!(LoaderRng);

/// Share of households with a long-distance migrant in the year before the start.
const RECENT_MIGRANT_SHARE: f64 = 0.4;
/// Persons older than this have finished school.
const SCHOOL_LEAVING_AGE_YEARS: f64 = 22.0;
/// Bounds, in years, of a synthesized age at marriage.
const MIN_MARRIAGE_AGE_YEARS: i64 = 15;
const MAX_MARRIAGE_AGE_YEARS: i64 = 27;

#[derive(Debug, Deserialize)]
struct NeighborhoodRow {
    #[serde(rename = "NEIGHID")]
    id: u64,
    avg_yrs_services_lt15: f64,
    avg_yrs_services_lt30: f64,
    #[serde(rename = "ELEC_AVAIL")]
    elec_available: u8,
    #[serde(rename = "land.agveg")]
    agveg: f64,
    #[serde(rename = "land.nonagveg")]
    nonagveg: f64,
    #[serde(rename = "land.privbldg")]
    privbldg: f64,
    #[serde(rename = "land.pubbldg")]
    pubbldg: f64,
    #[serde(rename = "land.other")]
    other: f64,
    #[serde(rename = "BZ_meters")]
    buffer_zone_m: f64,
    #[serde(rename = "CNP_meters")]
    national_park_m: f64,
    #[serde(rename = "closest_meters")]
    closest_m: f64,
    closest_type: ForestType,
    #[serde(rename = "SCHLFT52")]
    school: f64,
    #[serde(rename = "HLTHFT52")]
    health: f64,
    #[serde(rename = "BUSFT52")]
    bus: f64,
    #[serde(rename = "MARFT52")]
    market: f64,
    #[serde(rename = "EMPFT52")]
    employer: f64,
    dist_nara: f64,
}

#[derive(Debug, Deserialize)]
struct CoordinatesRow {
    #[serde(rename = "NEIGHID")]
    id: u64,
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct HouseholdRow {
    HHID: u64,
    NEIGHID: u64,
    /// Owns the plot the house stands on.
    BAA43: u8,
    /// Rents out land.
    BAA44: u8,
    /// Owns bari land.
    BAA10A: u8,
    /// Owns khet land.
    BAA18A: u8,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct PersonRow {
    RESPID: u64,
    HHID: u64,
    SUBJECT: u32,
    AGEMNTHS: i64,
    CENGENDR: u8,
    ETHNIC: i64,
    PARENT1: u32,
    PARENT2: u32,
    SPOUSE1: u32,
    SPOUSE2: u32,
    SPOUSE3: u32,
    desnumchild: i64,
    schooling: f64,
    child_school_1hr: u8,
    child_health_1hr: u8,
    child_bus_1hr: u8,
    child_emp_1hr: u8,
    child_market_1hr: u8,
    parents_contracep_ever: u8,
    father_work: u8,
    father_school: f64,
    mother_work: u8,
    mother_school: f64,
    mother_num_children: u32,
    /// Decimal year; `NA` when unknown.
    #[serde(deserialize_with = "csv::invalid_option")]
    marr_date: Option<f64>,
    recent_birth: u8,
    n_children: u32,
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, AbmError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| AbmError::LoadError(format!("{}: {e}", path.display())))?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| AbmError::LoadError(format!("{}: {e}", path.display())))
}

fn flag(value: u8) -> bool {
    value != 0
}

/// Time conversions relative to the start of the run.
#[derive(Copy, Clone)]
struct Calendar {
    start_year: f64,
    timestep_months: i64,
}

impl Calendar {
    fn months_ago(self, months: i64) -> i64 {
        -(months / self.timestep_months)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn timestep_of(self, decimal_year: f64) -> i64 {
        #[allow(clippy::cast_precision_loss)]
        let timestep_months = self.timestep_months as f64;
        ((decimal_year - self.start_year) * 12.0 / timestep_months).round() as i64
    }
}

/// Loads the survey population into a new region of the context's world and returns
/// the region.
///
/// # Errors
///
/// `AbmError::LoadError` for unreadable files, malformed rows, unknown codes or a
/// household in an unknown neighborhood. `AbmError::DuplicateId` if a survey ID
/// appears twice.
pub fn load_population(context: &mut Context) -> Result<RegionId, AbmError> {
    let model = context.parameters().model.clone();
    let directory = model.input_data_dir.as_path();
    let calendar = Calendar {
        start_year: model.start.as_float(),
        timestep_months: i64::from(model.timestep_months),
    };

    let region: RegionId = context.world_mut().ids.regions.next();
    context.world_mut().add_region(Region::new(region));
    load_neighborhoods(context, directory, region)?;
    load_households(context, directory, calendar)?;
    load_persons(context, directory, calendar)?;
    remove_empty_households(context);

    let world = context.world();
    info!(
        "loaded {} persons in {} households across {} neighborhoods",
        world.total_population(),
        world.region_households(region).len(),
        world.region_neighborhoods(region).len()
    );
    Ok(region)
}

fn load_neighborhoods(context: &mut Context, directory: &Path, region: RegionId) -> Result<(), AbmError> {
    let coordinates: HashMap<u64, (f64, f64)> =
        read_rows::<CoordinatesRow>(&directory.join("neigh_coords.csv"))?
            .into_iter()
            .map(|row| (row.id, (row.x, row.y)))
            .collect();

    let mut neighborhoods = Vec::new();
    for row in read_rows::<NeighborhoodRow>(&directory.join("neigh.csv"))? {
        let &(x, y) = coordinates
            .get(&row.id)
            .ok_or_else(|| AbmError::LoadError(format!("neighborhood {} has no coordinates", row.id)))?;
        context.world_mut().ids.neighborhoods.use_id(row.id)?;
        let land = LandUse {
            agveg: row.agveg,
            nonagveg: row.nonagveg,
            privbldg: row.privbldg,
            pubbldg: row.pubbldg,
            other: row.other,
        };
        let mut neighborhood = Neighborhood::new(NeighborhoodId(row.id), region, land, x, y);
        neighborhood.elec_available = flag(row.elec_available);
        neighborhood.avg_yrs_services_lt15 = row.avg_yrs_services_lt15;
        neighborhood.avg_yrs_services_lt30 = row.avg_yrs_services_lt30;
        neighborhood.dist_nara_km = row.dist_nara;
        neighborhood.services = ServiceTimes {
            school: row.school,
            health: row.health,
            bus: row.bus,
            market: row.market,
            employer: row.employer,
        };
        neighborhood.forest.buffer_zone_km = row.buffer_zone_m / 1000.0;
        neighborhood.forest.national_park_km = row.national_park_m / 1000.0;
        neighborhood.forest.closest_km = row.closest_m / 1000.0;
        neighborhood.forest.closest_type = row.closest_type;
        neighborhoods.push(neighborhood);
    }

    let positions: Vec<Neighborhood> = neighborhoods.clone();
    for neighborhood in &mut neighborhoods {
        let mut others: Vec<&Neighborhood> = positions
            .iter()
            .filter(|other| other.id != neighborhood.id)
            .collect();
        others.sort_by(|a, b| {
            neighborhood
                .distance_to(a)
                .total_cmp(&neighborhood.distance_to(b))
        });
        neighborhood.neighborhoods_by_distance = others.iter().map(|other| other.id).collect();
    }
    for neighborhood in neighborhoods {
        context.world_mut().add_neighborhood(neighborhood);
    }
    Ok(())
}

fn load_households(context: &mut Context, directory: &Path, calendar: Calendar) -> Result<(), AbmError> {
    for row in read_rows::<HouseholdRow>(&directory.join("hhag.csv"))? {
        let neighborhood = NeighborhoodId(row.NEIGHID);
        if context.world().get_neighborhood(neighborhood).is_none() {
            return Err(AbmError::LoadError(format!(
                "household {} is in unknown neighborhood {neighborhood}",
                row.HHID
            )));
        }
        context.world_mut().ids.households.use_id(row.HHID)?;

        let (any_non_wood_fuel, last_migrant_months) = {
            let stats = context.statistics();
            context.sample(LoaderRng, |rng| {
                let fuel = stats.draw_household_flags(rng).any_non_wood_fuel;
                let migrant = rng
                    .random_bool(RECENT_MIGRANT_SHARE)
                    .then(|| rng.random_range(1..=12_i64));
                (fuel, migrant)
            })
        };
        let flags = HouseholdFlags {
            any_non_wood_fuel,
            own_house_plot: flag(row.BAA43),
            own_land: flag(row.BAA10A) || flag(row.BAA18A) || flag(row.BAA43),
            rented_out_land: flag(row.BAA44),
        };
        let mut household = Household::new(HouseholdId(row.HHID), flags);
        household.initial_agent = true;
        household.last_migrant_timestep = last_migrant_months.map(|months| calendar.months_ago(months));

        let world = context.world_mut();
        world.insert_household(household);
        world.add_household_to_neighborhood(HouseholdId(row.HHID), neighborhood, None);
    }
    Ok(())
}

fn parse_person(row: &PersonRow) -> Result<Person, AbmError> {
    let sex = match row.CENGENDR {
        1 => Sex::Male,
        2 => Sex::Female,
        code => {
            return Err(AbmError::LoadError(format!(
                "person {} has unknown sex code {code}",
                row.RESPID
            )))
        }
    };
    let ethnicity = Ethnicity::from_code(row.ETHNIC).ok_or_else(|| {
        AbmError::LoadError(format!(
            "person {} has unknown ethnicity code {}",
            row.RESPID, row.ETHNIC
        ))
    })?;
    let mut person = Person::new(PersonId(row.RESPID), -row.AGEMNTHS, row.AGEMNTHS, sex, ethnicity);
    person.initial_agent = true;
    person.desired_children = match u32::try_from(row.desnumchild) {
        Ok(count) => DesiredChildren::Count(count),
        Err(_) => DesiredChildren::NoPreference,
    };
    person.schooling = row.schooling;
    person.num_children = row.n_children;
    person.parents_contracep_ever = flag(row.parents_contracep_ever);
    person.parental_background = Some(ParentalBackground {
        mother_work: flag(row.mother_work),
        father_work: flag(row.father_work),
        mother_years_schooling: row.mother_school,
        father_years_schooling: row.father_school,
        mother_num_children: row.mother_num_children,
    });
    person.childhood_context = CommunityContext {
        school_lt_1hr: flag(row.child_school_1hr),
        health_lt_1hr: flag(row.child_health_1hr),
        bus_lt_1hr: flag(row.child_bus_1hr),
        market_lt_1hr: flag(row.child_market_1hr),
        employer_lt_1hr: flag(row.child_emp_1hr),
    };
    Ok(person)
}

/// Resolves a subject number within `household` to a person ID, warning when it
/// points at nobody.
fn resolve(
    subjects: &HashMap<(u64, u32), PersonId>,
    household: u64,
    subject: u32,
    person: u64,
    role: &str,
) -> Option<PersonId> {
    if subject == 0 {
        return None;
    }
    let resolved = subjects.get(&(household, subject)).copied();
    if resolved.is_none() {
        warn!("{role} of person {person} is not in the data; {role} set to none");
    }
    resolved
}

struct Links {
    mother: Option<PersonId>,
    father: Option<PersonId>,
    spouse: Option<PersonId>,
    marriage_date: Option<f64>,
    recent_birth: bool,
}

fn load_persons(context: &mut Context, directory: &Path, calendar: Calendar) -> Result<(), AbmError> {
    let rows = read_rows::<PersonRow>(&directory.join("hhrel.csv"))?;
    let subjects: HashMap<(u64, u32), PersonId> = rows
        .iter()
        .map(|row| ((row.HHID, row.SUBJECT), PersonId(row.RESPID)))
        .collect();

    let mut links: HashMap<PersonId, Links> = HashMap::default();
    let mut extra_spouses: HashSet<PersonId> = HashSet::default();
    let mut homes: Vec<(PersonId, HouseholdId)> = Vec::new();
    for row in &rows {
        let household = HouseholdId(row.HHID);
        if context.world().get_household(household).is_none() {
            warn!("person {} skipped because household {household} is not in the data", row.RESPID);
            continue;
        }
        let person = parse_person(row)?;
        context.world_mut().ids.persons.use_id(row.RESPID)?;
        for (subject, role) in [(row.SPOUSE2, "second spouse"), (row.SPOUSE3, "third spouse")] {
            extra_spouses.extend(resolve(&subjects, row.HHID, subject, row.RESPID, role));
        }
        links.insert(
            person.id,
            Links {
                mother: resolve(&subjects, row.HHID, row.PARENT1, row.RESPID, "mother"),
                father: resolve(&subjects, row.HHID, row.PARENT2, row.RESPID, "father"),
                spouse: resolve(&subjects, row.HHID, row.SPOUSE1, row.RESPID, "spouse"),
                marriage_date: row.marr_date,
                recent_birth: flag(row.recent_birth),
            },
        );
        homes.push((person.id, household));
        context.world_mut().insert_person(person);
    }

    link_persons(context, &mut links, &extra_spouses, calendar);
    for (person, household) in homes {
        context.world_mut().add_person_to_household(person, household);
    }
    draw_person_attributes(context, &links, calendar);
    Ok(())
}

/// Sets parent, child and spouse links. Self-references and references to skipped
/// persons are dropped; only mutual spouse pairs are married.
fn link_persons(
    context: &mut Context,
    links: &mut HashMap<PersonId, Links>,
    extra_spouses: &HashSet<PersonId>,
    calendar: Calendar,
) {
    let known: HashSet<PersonId> = links.keys().copied().collect();
    let mut ids: Vec<PersonId> = known.iter().copied().collect();
    ids.sort_unstable();

    for (&id, link) in links.iter_mut() {
        for (target, role) in [
            (&mut link.mother, "mother"),
            (&mut link.father, "father"),
            (&mut link.spouse, "spouse"),
        ] {
            match *target {
                Some(other) if other == id => {
                    warn!("person {id} is their own {role}; {role} set to none");
                    *target = None;
                }
                Some(other) if !known.contains(&other) => {
                    warn!("{role} {other} of person {id} was skipped; {role} set to none");
                    *target = None;
                }
                _ => {}
            }
        }
        if extra_spouses.contains(&id) {
            link.spouse = None;
        }
    }

    for &id in &ids {
        let (mother, father) = (links[&id].mother, links[&id].father);
        let world = context.world_mut();
        world.person_mut(id).mother = mother;
        world.person_mut(id).father = father;
        for parent in [mother, father].into_iter().flatten() {
            world.person_mut(parent).children.push(id);
        }
    }

    for &id in &ids {
        let Some(spouse) = links[&id].spouse else {
            continue;
        };
        if links[&spouse].spouse != Some(id) {
            warn!("spouse {spouse} of person {id} does not list them back; spouse set to none");
            continue;
        }
        if spouse < id {
            continue;
        }
        let date = links[&id].marriage_date.or(links[&spouse].marriage_date);
        let marriage_timestep = match date {
            Some(year) => calendar.timestep_of(year),
            None => synthesized_marriage(context, id, spouse, calendar),
        };
        let world = context.world_mut();
        for (person, other) in [(id, spouse), (spouse, id)] {
            let record = world.person_mut(person);
            record.spouse = Some(other);
            record.marriage_timestep = Some(marriage_timestep);
        }
    }
}

/// A marriage timestep from the younger spouse's age: at a random age between 15 and
/// the smaller of their age and 27, or at the start for spouses under 15.
fn synthesized_marriage(context: &Context, a: PersonId, b: PersonId, calendar: Calendar) -> i64 {
    let world = context.world();
    let youngest_months = world.person(a).age_months.min(world.person(b).age_months);
    let youngest_years = youngest_months / 12;
    if youngest_years < MIN_MARRIAGE_AGE_YEARS {
        return 0;
    }
    let oldest_marriage_age = youngest_years.min(MAX_MARRIAGE_AGE_YEARS);
    let marriage_age_years = if oldest_marriage_age > MIN_MARRIAGE_AGE_YEARS {
        context.sample_range(LoaderRng, MIN_MARRIAGE_AGE_YEARS..oldest_marriage_age)
    } else {
        MIN_MARRIAGE_AGE_YEARS
    };
    calendar.months_ago(youngest_months - marriage_age_years * 12)
}

/// Birth histories, birth timing and school enrollment, drawn once everyone is linked
/// and housed.
fn draw_person_attributes(context: &mut Context, links: &HashMap<PersonId, Links>, calendar: Calendar) {
    let start_school_age = context.parameters().education.start_school_age_years;
    let mut ids: Vec<PersonId> = links.keys().copied().collect();
    ids.sort_unstable();
    for id in ids {
        let (female, age) = {
            let record = context.world().person(id);
            (record.is_female(), record.age_years())
        };
        let (interval, timing, months_since_birth) = {
            let stats = context.statistics();
            context.sample(LoaderRng, |rng| {
                (
                    stats.draw_birth_interval(rng),
                    stats.draw_first_birth_timing(rng),
                    rng.random_range(1..=24_i64),
                )
            })
        };
        let school = if age < start_school_age {
            None
        } else if age <= SCHOOL_LEAVING_AGE_YEARS {
            let stats = context.statistics();
            let cutoffs = stats.education_cutoffs(context.world(), id);
            Some(context.sample(LoaderRng, |rng| stats.draw_education_level(rng, &cutoffs)))
        } else {
            Some(f64::NAN)
        };

        let record = context.world_mut().person_mut(id);
        record.first_birth_timing = timing;
        if female {
            record.birth_interval = Some(interval);
            record.last_birth_timestep = Some(if links[&id].recent_birth {
                0
            } else {
                calendar.months_ago(months_since_birth)
            });
        } else {
            record.desired_children = DesiredChildren::Unset;
        }
        match school {
            None => {}
            Some(level) if level.is_nan() => record.school_status = SchoolStatus::OutOfSchool,
            Some(level) if level > record.schooling => {
                record.school_status = SchoolStatus::InSchool;
                record.final_schooling = Some(level);
            }
            Some(_) => {
                record.school_status = SchoolStatus::OutOfSchool;
                record.final_schooling = Some(record.schooling);
            }
        }
    }
}

fn remove_empty_households(context: &mut Context) {
    let world = context.world_mut();
    let empty: Vec<HouseholdId> = world
        .households()
        .filter(|household| household.is_defunct())
        .map(|household| household.id)
        .collect();
    for household in empty {
        warn!("household {household} has no members and was removed");
        world.destroy_household_if_empty(household);
    }
}
