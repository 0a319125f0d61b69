//! CSV output of a run.
//!
//! Three streaming reports are registered at startup: `person_events` (one row per life
//! event), `run_results` (one row per neighborhood per timestep) and `time` (one row
//! per timestep). Snapshots of every person and neighborhood are whole files written
//! with `write_snapshot`.
use serde::Serialize;
use strum::Display;

use crate::agents::{ContextWorldExt, Ethnicity, SchoolStatus, Sex, World};
use crate::clock::Clock;
use crate::context::Context;
use crate::define_report;
use crate::define_rng;
use crate::demography::RegionCounts;
use crate::error::AbmError;
use crate::ids::{HouseholdId, NeighborhoodId, PersonId, RegionId};
use crate::log::debug;
use crate::parameters::ContextParametersExt;
use crate::random::ContextRandomExt;
use crate::report::ContextReportExt;
use crate::statistics::ContextStatisticsExt;

define_rng!(FuelwoodRng);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PersonEvent {
    Birth,
    Death,
    Marriage,
    Divorce,
    LdMigration,
    LdReturn,
    PermanentOutmigration,
    InMigration,
}

#[derive(Serialize)]
pub struct PersonEventRow {
    pub time: i64,
    pub event: PersonEvent,
    pub pid: PersonId,
    pub hid: Option<HouseholdId>,
    pub nid: Option<NeighborhoodId>,
    pub rid: Option<RegionId>,
    pub gender: Sex,
    pub age: f64,
    pub ethnicity: Ethnicity,
    pub mother_id: Option<PersonId>,
    pub father_id: Option<PersonId>,
    pub spouseid: Option<PersonId>,
    pub marrtime: Option<i64>,
    pub schooling: f64,
    pub num_children: u32,
    pub alive: bool,
    pub is_away: bool,
    pub is_initial_agent: bool,
    pub is_in_migrant: bool,
}

define_report!(PersonEventRow);

#[derive(Serialize)]
pub struct RunResultsRow {
    pub time: i64,
    pub year: i32,
    pub month: u32,
    pub rid: RegionId,
    pub nid: NeighborhoodId,
    pub population: usize,
    pub households: usize,
    pub births: u32,
    pub deaths: u32,
    pub marriages: u32,
    pub divorces: u32,
    pub ld_migrations: u32,
    pub ld_returns: u32,
    pub in_migrant_households: u32,
    pub out_migrant_households: u32,
    pub nfos: u32,
    pub agveg: f64,
    pub nonagveg: f64,
    pub privbldg: f64,
    pub pubbldg: f64,
    pub other: f64,
    /// Expected monthly fuelwood use in kilograms.
    pub fuelwood: f64,
    pub school_minutes: f64,
    pub health_minutes: f64,
    pub bus_minutes: f64,
    pub market_minutes: f64,
    pub employer_minutes: f64,
}

define_report!(RunResultsRow);

#[derive(Serialize)]
pub struct TimeRow {
    pub timestep: i64,
    pub year: i32,
    pub month: u32,
    pub time_float: f64,
}

define_report!(TimeRow);

#[derive(Serialize)]
pub struct PersonSnapshotRow {
    pub pid: PersonId,
    pub hid: Option<HouseholdId>,
    pub nid: Option<NeighborhoodId>,
    pub rid: Option<RegionId>,
    pub gender: Sex,
    pub age_months: i64,
    pub ethnicity: Ethnicity,
    pub mother_id: Option<PersonId>,
    pub father_id: Option<PersonId>,
    pub spouseid: Option<PersonId>,
    pub marrtime: Option<i64>,
    pub schooling: f64,
    pub school_status: SchoolStatus,
    pub num_children: u32,
    pub last_birth: Option<i64>,
    pub is_away: bool,
    pub return_time: Option<i64>,
    pub is_initial_agent: bool,
    pub is_in_migrant: bool,
}

#[derive(Serialize)]
pub struct NeighborhoodSnapshotRow {
    pub nid: NeighborhoodId,
    pub rid: RegionId,
    pub x: f64,
    pub y: f64,
    pub numpsns: usize,
    pub numhs: usize,
    pub agveg: f64,
    pub nonagveg: f64,
    pub pubbldg: f64,
    pub privbldg: f64,
    pub other: f64,
    pub total_area: f64,
    pub perc_agveg: f64,
    pub perc_veg: f64,
    pub perc_bldg: f64,
}

/// Registers the streaming reports under the current report options.
///
/// # Errors
///
/// Fails if a report file exists and overwriting is off, or cannot be created.
pub fn init_reports(context: &mut Context) -> Result<(), AbmError> {
    if context.parameters().output.person_events {
        context.add_report::<PersonEventRow>("person_events")?;
    }
    context.add_report::<RunResultsRow>("run_results")?;
    context.add_report::<TimeRow>("time")?;
    Ok(())
}

fn person_event_row(world: &World, event: PersonEvent, person: PersonId, time: i64) -> PersonEventRow {
    let record = world.person(person);
    let hid = record.home_household();
    PersonEventRow {
        time,
        event,
        pid: person,
        hid,
        nid: world.person_neighborhood(person),
        rid: world.person_region(person),
        gender: record.sex,
        age: record.age_years(),
        ethnicity: record.ethnicity,
        mother_id: record.mother,
        father_id: record.father,
        spouseid: record.spouse,
        marrtime: record.marriage_timestep,
        schooling: record.schooling,
        num_children: record.num_children,
        alive: record.alive,
        is_away: record.away,
        is_initial_agent: record.initial_agent,
        is_in_migrant: record.in_migrant,
    }
}

/// Logs `event` for `person` when the person event report is enabled.
pub fn record_person_event(context: &Context, event: PersonEvent, person: PersonId, time: i64) {
    if !context.is_report_registered::<PersonEventRow>() {
        return;
    }
    let row = person_event_row(context.world(), event, person, time);
    context.send_report(row);
}

fn count(counts: &crate::demography::NeighborhoodCounts, nid: NeighborhoodId) -> u32 {
    counts.get(&nid).copied().unwrap_or(0)
}

/// Expected monthly fuelwood use of a neighborhood: each household's drawn demand
/// times its chance of using wood at all.
fn neighborhood_fuelwood(context: &Context, nid: NeighborhoodId, timestep: i64) -> f64 {
    let world = context.world();
    let stats = context.statistics();
    world
        .neighborhood(nid)
        .households
        .iter()
        .map(|hid| {
            let residual = context.sample(FuelwoodRng, |rng| stats.draw_fuelwood_residual(rng));
            stats.monthly_fuelwood_demand(world, hid, timestep, residual)
                * stats.fuelwood_usage_probability(world, hid)
        })
        .sum()
}

/// Sends one `run_results` row per neighborhood of `region`.
pub fn send_run_results(context: &Context, clock: &Clock, region: RegionId, counts: &RegionCounts) {
    let world = context.world();
    let timestep = clock.timestep();
    for nid in world.region_neighborhoods(region) {
        let neighborhood = world.neighborhood(nid);
        let population = neighborhood
            .households
            .iter()
            .map(|hid| world.household(hid).num_members())
            .sum();
        let services = &neighborhood.services;
        let row = RunResultsRow {
            time: timestep,
            year: clock.year(),
            month: clock.month(),
            rid: region,
            nid,
            population,
            households: neighborhood.households.len(),
            births: count(&counts.births, nid),
            deaths: count(&counts.deaths, nid),
            marriages: count(&counts.marriages, nid),
            divorces: count(&counts.divorces, nid),
            ld_migrations: count(&counts.departures, nid),
            ld_returns: count(&counts.returns, nid),
            in_migrant_households: count(&counts.inmigrant_households, nid),
            out_migrant_households: count(&counts.outmigrant_households, nid),
            nfos: count(&counts.nfos, nid),
            agveg: neighborhood.land.agveg,
            nonagveg: neighborhood.land.nonagveg,
            privbldg: neighborhood.land.privbldg,
            pubbldg: neighborhood.land.pubbldg,
            other: neighborhood.land.other,
            fuelwood: neighborhood_fuelwood(context, nid, timestep),
            school_minutes: services.school,
            health_minutes: services.health,
            bus_minutes: services.bus,
            market_minutes: services.market,
            employer_minutes: services.employer,
        };
        context.send_report(row);
    }
}

pub fn send_time_row(context: &Context, clock: &Clock) {
    context.send_report(TimeRow {
        timestep: clock.timestep(),
        year: clock.year(),
        month: clock.month(),
        time_float: clock.time_float(),
    });
}

fn person_snapshot(world: &World) -> Vec<PersonSnapshotRow> {
    let mut rows = Vec::new();
    for rid in world.region_ids() {
        for pid in world.region_all_persons(rid) {
            let record = world.person(pid);
            rows.push(PersonSnapshotRow {
                pid,
                hid: record.home_household(),
                nid: world.person_neighborhood(pid),
                rid: Some(rid),
                gender: record.sex,
                age_months: record.age_months,
                ethnicity: record.ethnicity,
                mother_id: record.mother,
                father_id: record.father,
                spouseid: record.spouse,
                marrtime: record.marriage_timestep,
                schooling: record.schooling,
                school_status: record.school_status,
                num_children: record.num_children,
                last_birth: record.last_birth_timestep,
                is_away: record.away,
                return_time: record.return_timestep,
                is_initial_agent: record.initial_agent,
                is_in_migrant: record.in_migrant,
            });
        }
    }
    rows
}

fn neighborhood_snapshot(world: &World) -> Vec<NeighborhoodSnapshotRow> {
    world
        .neighborhoods()
        .map(|neighborhood| {
            let land = &neighborhood.land;
            let total = neighborhood.total_area;
            let share = |area: f64| if total > 0.0 { area / total } else { 0.0 };
            NeighborhoodSnapshotRow {
                nid: neighborhood.id,
                rid: neighborhood.region,
                x: neighborhood.x,
                y: neighborhood.y,
                numpsns: neighborhood
                    .households
                    .iter()
                    .map(|hid| world.household(hid).num_members())
                    .sum(),
                numhs: neighborhood.households.len(),
                agveg: land.agveg,
                nonagveg: land.nonagveg,
                pubbldg: land.pubbldg,
                privbldg: land.privbldg,
                other: land.other,
                total_area: total,
                perc_agveg: share(land.agveg),
                perc_veg: share(land.agveg + land.nonagveg),
                perc_bldg: share(land.privbldg + land.pubbldg),
            }
        })
        .collect()
}

/// Writes `psns_time_<label>.csv` and `NBHs_time_<label>.csv`.
///
/// # Errors
///
/// Fails on any I/O or CSV error, or if a file exists and overwriting is off.
pub fn write_snapshots(context: &mut Context, label: &str) -> Result<(), AbmError> {
    let persons = person_snapshot(context.world());
    let neighborhoods = neighborhood_snapshot(context.world());
    debug!(
        "snapshot {label}: {} persons, {} neighborhoods",
        persons.len(),
        neighborhoods.len()
    );
    context.write_snapshot(&format!("psns_time_{label}"), persons)?;
    context.write_snapshot(&format!("NBHs_time_{label}"), neighborhoods)?;
    Ok(())
}
