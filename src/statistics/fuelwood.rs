//! Household fuelwood use, from the 2009 valley fuelwood survey.
//!
//! Expected use is the chance a household burns any wood times the quantity it burns
//! when it does.
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use super::{logistic, EthnicCoefficients, Statistics};
use crate::agents::{Ethnicity, ForestType, World};
use crate::ids::HouseholdId;

/// Days per model month for converting daily demand.
const DAYS_PER_MONTH: f64 = 30.0;

/// Household size at which the demand regression is held constant.
const MAX_DEMAND_HOUSEHOLD_SIZE: usize = 6;

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct FuelwoodUsageCoefficients {
    pub intercept: f64,
    pub household_size: f64,
    /// By the ethnicity of the household head.
    pub ethnic: EthnicCoefficients,
    pub mean_gender: f64,
    pub elec_available: f64,
    pub dist_nara_km: f64,
    /// The buffer zone is the reference level.
    pub closest_type_cnp: f64,
}

/// Per-person daily demand in kilograms.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct FuelwoodDemandCoefficients {
    pub intercept: f64,
    pub household_size: f64,
    pub household_size_squared: f64,
    pub upper_caste_hindu: f64,
    pub own_non_wood_stove: f64,
    pub resid_variance: f64,
    /// Only used by the migration feedback model.
    #[serde(default)]
    pub any_ld_migrant: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "lowercase")]
pub enum FuelwoodDemandModel {
    Simple(FuelwoodDemandCoefficients),
    /// Adds `any_ld_migrant` when a member left on a migration this timestep.
    MigrationFeedback(FuelwoodDemandCoefficients),
}

impl FuelwoodDemandModel {
    fn coefficients(&self) -> &FuelwoodDemandCoefficients {
        match self {
            FuelwoodDemandModel::Simple(coefficients)
            | FuelwoodDemandModel::MigrationFeedback(coefficients) => coefficients,
        }
    }
}

fn bool_term(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

impl Statistics {
    /// Probability that a household uses any fuelwood. Zero with no one present.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fuelwood_usage_probability(&self, world: &World, household: HouseholdId) -> f64 {
        let Some(head) = world.household_head(household) else {
            return 0.0;
        };
        let record = world.household(household);
        let Some(nid) = record.neighborhood else {
            return 0.0;
        };
        let neighborhood = world.neighborhood(nid);
        let c = &self.fuelwood_usage;

        let mut inner = c.intercept + c.household_size * record.num_members() as f64;
        inner += c.ethnic.get(world.person(head).ethnicity);
        inner += c.mean_gender * world.household_mean_gender(household);
        inner += c.elec_available * bool_term(neighborhood.elec_available);
        inner += c.dist_nara_km * neighborhood.dist_nara_km;
        if neighborhood.forest.closest_type == ForestType::NationalPark {
            inner += c.closest_type_cnp;
        }
        logistic(inner)
    }

    /// Unexplained variation in per-person demand.
    pub fn draw_fuelwood_residual<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let variance = self.fuelwood_demand.coefficients().resid_variance;
        Normal::new(0.0, variance.max(0.0).sqrt()).map_or(0.0, |normal| normal.sample(rng))
    }

    /// Household demand in kilograms per day for a drawn `residual`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn daily_fuelwood_demand(
        &self,
        world: &World,
        household: HouseholdId,
        timestep: i64,
        residual: f64,
    ) -> f64 {
        let Some(head) = world.household_head(household) else {
            return 0.0;
        };
        let record = world.household(household);
        let size = record.num_members();
        let c = self.fuelwood_demand.coefficients();
        let capped = size.min(MAX_DEMAND_HOUSEHOLD_SIZE) as f64;

        let mut per_person = c.intercept + (c.household_size + c.household_size_squared) * capped;
        if world.person(head).ethnicity == Ethnicity::HighHindu {
            per_person += c.upper_caste_hindu;
        }
        per_person += c.own_non_wood_stove * bool_term(record.flags.any_non_wood_fuel);
        per_person += residual;
        if matches!(self.fuelwood_demand, FuelwoodDemandModel::MigrationFeedback(_))
            && record
                .last_migrant_timestep
                .is_some_and(|last| last > timestep - 1)
        {
            per_person += c.any_ld_migrant;
        }
        per_person.max(0.0) * size as f64
    }

    /// Household demand in kilograms per month.
    #[must_use]
    pub fn monthly_fuelwood_demand(
        &self,
        world: &World,
        household: HouseholdId,
        timestep: i64,
        residual: f64,
    ) -> f64 {
        self.daily_fuelwood_demand(world, household, timestep, residual) * DAYS_PER_MONTH
    }
}
