//! Region event processors.
//!
//! Each processor takes the region it runs over, snapshots the persons or households
//! it iterates, and skips anyone who died or left earlier in the same call. Counts are
//! returned per neighborhood. Every process draws from its own named RNG stream, so
//! changing one process does not shift the draws of the others.
//!
//! A regular timestep runs, in order:
//!
//! births, deaths, marriages, divorces, individual migrations, household migrations,
//! education, non-family organizations (when enabled), and aging.
//!
//! Burn-in timesteps only run simulated births and individual migrations.
mod births;
mod deaths;
mod divorces;
mod education;
mod household_migrations;
mod inmigrants;
mod marriages;
mod migrations;
mod nfos;
mod placement;

use std::collections::BTreeMap;

pub use births::{births, is_eligible_for_birth};
pub use deaths::deaths;
pub use divorces::divorces;
pub use education::education;
pub use household_migrations::household_migrations;
pub use inmigrants::new_inmigrant;
pub use marriages::marriages;
pub use migrations::individual_migrations;
pub use nfos::establish_nfos;
pub use placement::{found_household, place_household, random_neighborhood};

use crate::agents::ContextWorldExt;
use crate::clock::Clock;
use crate::context::Context;
use crate::error::AbmError;
use crate::ids::{NeighborhoodId, RegionId};
use crate::log::debug;
use crate::parameters::ContextParametersExt;

pub type NeighborhoodCounts = BTreeMap<NeighborhoodId, u32>;

pub(crate) fn tally(counts: &mut NeighborhoodCounts, neighborhood: Option<NeighborhoodId>) {
    if let Some(nid) = neighborhood {
        *counts.entry(nid).or_insert(0) += 1;
    }
}

fn total(counts: &NeighborhoodCounts) -> u32 {
    counts.values().sum()
}

/// Everything the processors counted in one region over one timestep.
#[derive(Clone, Debug, Default)]
pub struct RegionCounts {
    pub births: NeighborhoodCounts,
    pub deaths: NeighborhoodCounts,
    pub marriages: NeighborhoodCounts,
    pub divorces: NeighborhoodCounts,
    pub departures: NeighborhoodCounts,
    pub returns: NeighborhoodCounts,
    pub inmigrant_households: NeighborhoodCounts,
    pub outmigrant_households: NeighborhoodCounts,
    pub school_starts: NeighborhoodCounts,
    pub nfos: NeighborhoodCounts,
}

/// Ages every present and stored person of `region` by one timestep.
///
/// # Panics
///
/// Panics if a person is reached twice.
pub fn increment_age(context: &mut Context, region: RegionId) {
    let months = i64::from(context.parameters().model.timestep_months);
    context.world_mut().increment_age(region, months);
}

/// Runs every processor for `region` at the clock's timestep.
///
/// # Errors
///
/// `AbmError::NoLandAvailable` when a new household finds no room anywhere.
pub fn run_region_timestep(
    context: &mut Context,
    region: RegionId,
    clock: &Clock,
) -> Result<RegionCounts, AbmError> {
    let timestep = clock.timestep();
    let births = births(context, region, timestep, false);
    let deaths = deaths(context, region, timestep);
    let marriages = marriages(context, region, clock)?;
    let divorces = divorces(context, region, timestep)?;
    let (departures, returns) = individual_migrations(context, region, timestep, false);
    let (inmigrant_households, outmigrant_households) =
        household_migrations(context, region, timestep)?;
    let school_starts = education(context, region);
    let nfos = establish_nfos(context, region);
    increment_age(context, region);

    debug!(
        "region {region} timestep {timestep}: {} births, {} deaths, {} marriages, {} divorces, {} departures, {} returns",
        total(&births),
        total(&deaths),
        total(&marriages),
        total(&divorces),
        total(&departures),
        total(&returns)
    );
    Ok(RegionCounts {
        births,
        deaths,
        marriages,
        divorces,
        departures,
        returns,
        inmigrant_households,
        outmigrant_households,
        school_starts,
        nfos,
    })
}

/// A burn-in timestep: births only update birth histories and migrations never become
/// permanent. Nobody ages.
pub fn run_burn_in_timestep(context: &mut Context, region: RegionId, timestep: i64) {
    let births = births(context, region, timestep, true);
    let (departures, returns) = individual_migrations(context, region, timestep, true);
    debug!(
        "burn-in region {region} timestep {timestep}: {} simulated births, {} departures, {} returns",
        total(&births),
        total(&departures),
        total(&returns)
    );
}
