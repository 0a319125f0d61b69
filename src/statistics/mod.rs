//! Probability providers for every demographic process.
//!
//! `Statistics` is built once from the parameters and stored in a data plugin. Age
//! tables are converted to per-timestep probabilities at that point and the strategy of
//! each process is fixed. Probability methods are pure functions of the world; draws
//! take the RNG of the calling process:
//!
//! ```ignore
//! let months = context.sample(MigrationRng, |rng| stats.draw_migration_length(rng, false));
//! ```
mod education;
mod fertility;
mod fuelwood;
mod marriage;
mod migration;

use rand::distr::Distribution;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub use education::EducationCoefficients;
pub use fertility::FirstBirthCoefficients;
pub use fuelwood::{FuelwoodDemandCoefficients, FuelwoodDemandModel, FuelwoodUsageCoefficients};
pub use marriage::MarriageCoefficients;
pub use migration::MigrationCoefficients;

use crate::agents::{DesiredChildren, Ethnicity, HouseholdFlags, Person, Sex};
use crate::context::Context;
use crate::define_data_plugin;
use crate::parameters::{
    AgeTable, ContextParametersExt, FirstBirthModel, InmigrantParameters, MarriageModel,
    MigrationModel, ParametersValues, SexAgeTables, TimeUnits,
};
use crate::prob_dist::ProbDist;

/// Months away for a migration that never returns.
pub const PERMANENT_MIGRATION_MONTHS: i64 = 99_999_999;

// Shares of new households with each flag, from the 1996 survey.
const NON_WOOD_FUEL_SHARE: f64 = 0.93;
const HOUSE_PLOT_SHARE: f64 = 0.829;
const OWN_LAND_SHARE: f64 = 0.61;
const RENTED_OUT_SHARE: f64 = 0.11;

pub(crate) fn logistic(inner: f64) -> f64 {
    1.0 / (1.0 + (-inner).exp())
}

/// Regression coefficients by ethnicity. `HighHindu` is the reference level.
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize)]
pub struct EthnicCoefficients {
    pub hill_tibeto: f64,
    pub low_hindu: f64,
    pub newar: f64,
    pub terai_tibeto: f64,
}

impl EthnicCoefficients {
    #[must_use]
    pub fn get(&self, ethnicity: Ethnicity) -> f64 {
        match ethnicity {
            Ethnicity::HighHindu => 0.0,
            Ethnicity::HillTibeto => self.hill_tibeto,
            Ethnicity::LowHindu => self.low_hindu,
            Ethnicity::Newar => self.newar,
            Ethnicity::TeraiTibeto => self.terai_tibeto,
        }
    }
}

/// An age table converted to probabilities per model timestep.
#[derive(Clone, Debug)]
pub struct RateTable {
    edges_months: Vec<f64>,
    probs: Vec<f64>,
}

impl RateTable {
    #[must_use]
    pub fn new(table: &AgeTable, units: TimeUnits, timestep_months: u32) -> RateTable {
        let exponent = f64::from(timestep_months) / f64::from(units.months());
        RateTable {
            edges_months: table.edges.iter().map(|years| years * 12.0).collect(),
            probs: table
                .probs
                .iter()
                .map(|p| 1.0 - (1.0 - p).powf(exponent))
                .collect(),
        }
    }

    /// Probability for a person aged `age_months`. Ages outside the table use the
    /// nearest bin.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn probability(&self, age_months: i64) -> f64 {
        let age = age_months as f64;
        let bin = self
            .edges_months
            .windows(2)
            .position(|edges| age < edges[1])
            .unwrap_or(self.probs.len() - 1);
        self.probs[bin]
    }
}

#[derive(Clone, Debug)]
pub struct SexRates {
    male: RateTable,
    female: RateTable,
}

impl SexRates {
    fn new(tables: &SexAgeTables, units: TimeUnits, timestep_months: u32) -> SexRates {
        SexRates {
            male: RateTable::new(&tables.male, units, timestep_months),
            female: RateTable::new(&tables.female, units, timestep_months),
        }
    }

    #[must_use]
    pub fn probability(&self, person: &Person) -> f64 {
        match person.sex {
            Sex::Male => self.male.probability(person.age_months),
            Sex::Female => self.female.probability(person.age_months),
        }
    }
}

#[derive(Clone, Debug)]
enum MarriageStrategy {
    Simple(SexRates),
    Zvoleff(MarriageCoefficients),
}

#[derive(Clone, Debug)]
enum MigrationStrategy {
    Simple(SexRates),
    Zvoleff(MigrationCoefficients),
}

#[derive(Clone, Debug)]
enum FirstBirthStrategy {
    Simple(ProbDist),
    Zvoleff(FirstBirthCoefficients),
}

#[derive(Clone, Debug)]
pub struct Statistics {
    timestep_months: u32,
    death: SexRates,
    marriage: MarriageStrategy,
    migration: MigrationStrategy,
    first_birth: FirstBirthStrategy,
    divorce_probability: f64,
    fuelwood_usage: FuelwoodUsageCoefficients,
    fuelwood_demand: FuelwoodDemandModel,
    education: EducationCoefficients,
    birth_intervals: ProbDist,
    desired_children: ProbDist,
    spouse_age_diff: ProbDist,
    migration_lengths: ProbDist,
    permanent_migration_probability: f64,
    household_area: ProbDist,
    inmigrant: InmigrantParameters,
}

impl Statistics {
    #[must_use]
    pub fn new(parameters: &ParametersValues) -> Statistics {
        let units = parameters.probability_time_units;
        let timestep_months = parameters.model.timestep_months;
        let marriage = match &parameters.marriage.probability {
            MarriageModel::Simple(tables) => {
                MarriageStrategy::Simple(SexRates::new(tables, units, timestep_months))
            }
            MarriageModel::Zvoleff(coefficients) => MarriageStrategy::Zvoleff(coefficients.clone()),
        };
        let migration = match &parameters.migration.probability {
            MigrationModel::Simple(tables) => {
                MigrationStrategy::Simple(SexRates::new(tables, units, timestep_months))
            }
            MigrationModel::Zvoleff(coefficients) => MigrationStrategy::Zvoleff(*coefficients),
        };
        let first_birth = match &parameters.birth.first_birth {
            FirstBirthModel::Simple { times } => FirstBirthStrategy::Simple(times.clone()),
            FirstBirthModel::Zvoleff(coefficients) => {
                FirstBirthStrategy::Zvoleff(coefficients.clone())
            }
        };
        Statistics {
            timestep_months,
            death: SexRates::new(&parameters.death, units, timestep_months),
            marriage,
            migration,
            first_birth,
            divorce_probability: parameters.marriage.divorce_probability,
            fuelwood_usage: parameters.fuelwood.usage,
            fuelwood_demand: parameters.fuelwood.demand.clone(),
            education: parameters.education.level.clone(),
            birth_intervals: parameters.birth.intervals.clone(),
            desired_children: parameters.birth.desired_children.clone(),
            spouse_age_diff: parameters.marriage.spouse_age_diff.clone(),
            migration_lengths: parameters.migration.lengths.clone(),
            permanent_migration_probability: parameters.migration.permanent_probability,
            household_area: parameters.household.area.clone(),
            inmigrant: parameters.household.inmigrant.clone(),
        }
    }

    #[must_use]
    pub fn timestep_months(&self) -> u32 {
        self.timestep_months
    }

    #[must_use]
    pub fn death_probability(&self, person: &Person) -> f64 {
        self.death.probability(person)
    }

    #[must_use]
    pub fn divorce_probability(&self) -> f64 {
        self.divorce_probability
    }

    /// Whether first births follow drawn timings rather than a monthly hazard.
    #[must_use]
    pub fn uses_first_birth_timing(&self) -> bool {
        matches!(self.first_birth, FirstBirthStrategy::Simple(_))
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn draw_birth_interval<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        self.birth_intervals.sample(rng).floor() as i64
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn draw_desired_children<R: Rng + ?Sized>(&self, rng: &mut R) -> DesiredChildren {
        let drawn = self.desired_children.sample(rng).floor();
        if drawn < 0.0 {
            DesiredChildren::NoPreference
        } else {
            DesiredChildren::Count(drawn as u32)
        }
    }

    /// Months from marriage to first birth. Zero when first births follow the hazard
    /// model instead.
    #[allow(clippy::cast_possible_truncation)]
    pub fn draw_first_birth_timing<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        match &self.first_birth {
            FirstBirthStrategy::Simple(times) => times.sample(rng) as i64,
            FirstBirthStrategy::Zvoleff(_) => 0,
        }
    }

    /// Husband's age minus wife's age in years.
    pub fn draw_spouse_age_diff<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.spouse_age_diff.sample(rng)
    }

    /// Months a migrant stays away; `PERMANENT_MIGRATION_MONTHS` for a migration that
    /// never returns, which burn-in never produces.
    #[allow(clippy::cast_possible_truncation)]
    pub fn draw_migration_length<R: Rng + ?Sized>(&self, rng: &mut R, burn_in: bool) -> i64 {
        if !burn_in && rng.random::<f64>() < self.permanent_migration_probability {
            return PERMANENT_MIGRATION_MONTHS;
        }
        self.migration_lengths.sample(rng).ceil() as i64
    }

    pub fn draw_household_area<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.household_area.sample(rng)
    }

    pub fn draw_household_flags<R: Rng + ?Sized>(&self, rng: &mut R) -> HouseholdFlags {
        HouseholdFlags {
            any_non_wood_fuel: rng.random_bool(NON_WOOD_FUEL_SHARE),
            own_house_plot: rng.random_bool(HOUSE_PLOT_SHARE),
            own_land: rng.random_bool(OWN_LAND_SHARE),
            rented_out_land: rng.random_bool(RENTED_OUT_SHARE),
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn draw_inmigrant_household_count<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.inmigrant.num_households.sample(rng).max(0.0) as usize
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn draw_inmigrant_household_size<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.inmigrant.household_size.sample(rng).max(0.0) as usize
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn draw_inmigrant_ethnicity<R: Rng + ?Sized>(&self, rng: &mut R) -> Ethnicity {
        let code = self.inmigrant.ethnicity.sample(rng) as i64;
        Ethnicity::from_code(code.clamp(1, 5)).unwrap_or(Ethnicity::HighHindu)
    }
}

define_data_plugin!(StatisticsPlugin, Option<Statistics>, None);

pub trait ContextStatisticsExt {
    /// Builds the providers from the `Parameters` global property.
    fn init_statistics(&mut self);

    /// # Panics
    ///
    /// Panics if `init_statistics` has not run.
    fn statistics(&self) -> &Statistics;
}

impl ContextStatisticsExt for Context {
    fn init_statistics(&mut self) {
        let statistics = Statistics::new(self.parameters());
        *self.get_data_container_mut(StatisticsPlugin) = Some(statistics);
    }

    fn statistics(&self) -> &Statistics {
        self.get_data_container(StatisticsPlugin)
            .and_then(Option::as_ref)
            .expect("Statistics not initialized")
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;
    use crate::ids::PersonId;
    use crate::test_utils::test_parameters;

    fn table() -> AgeTable {
        AgeTable {
            edges: vec![0.0, 10.0, 50.0],
            probs: vec![0.1, 0.5],
        }
    }

    #[test]
    fn yearly_rates_become_monthly() {
        let rates = RateTable::new(&table(), TimeUnits::Years, 1);
        assert_approx_eq!(rates.probability(0), 1.0 - 0.9_f64.powf(1.0 / 12.0));
        assert_approx_eq!(rates.probability(120), 1.0 - 0.5_f64.powf(1.0 / 12.0));
    }

    #[test]
    fn monthly_rates_scale_with_timestep() {
        let rates = RateTable::new(&table(), TimeUnits::Months, 3);
        assert_approx_eq!(rates.probability(60), 1.0 - 0.9_f64.powi(3));
    }

    #[test]
    fn ages_past_the_table_use_last_bin() {
        let rates = RateTable::new(&table(), TimeUnits::Months, 1);
        assert_approx_eq!(rates.probability(119), 0.1);
        assert_approx_eq!(rates.probability(12 * 90), 0.5);
    }

    #[test]
    fn death_rates_depend_on_sex() {
        let mut parameters = test_parameters();
        parameters.death.male.probs = vec![0.0; parameters.death.male.probs.len()];
        let stats = Statistics::new(&parameters);
        let man = Person::new(PersonId(0), -600, 600, Sex::Male, Ethnicity::Newar);
        let woman = Person::new(PersonId(1), -600, 600, Sex::Female, Ethnicity::Newar);
        assert_approx_eq!(stats.death_probability(&man), 0.0);
        assert!(stats.death_probability(&woman) > 0.0);
    }

    #[test]
    fn burn_in_migrations_always_return() {
        let mut parameters = test_parameters();
        parameters.migration.permanent_probability = 1.0;
        let stats = Statistics::new(&parameters);
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..50 {
            let months = stats.draw_migration_length(&mut rng, true);
            assert!(months >= 1 && months < PERMANENT_MIGRATION_MONTHS);
        }
        assert_eq!(
            stats.draw_migration_length(&mut rng, false),
            PERMANENT_MIGRATION_MONTHS
        );
    }

    #[test]
    fn negative_desired_children_means_no_preference() {
        let mut parameters = test_parameters();
        parameters.birth.desired_children = ProbDist::new(vec![-1.0, -0.5], vec![1.0]).unwrap();
        let stats = Statistics::new(&parameters);
        let mut rng = SmallRng::seed_from_u64(3);
        assert_eq!(
            stats.draw_desired_children(&mut rng),
            DesiredChildren::NoPreference
        );
    }

    #[test]
    fn ethnic_reference_level_is_zero() {
        let coefficients = EthnicCoefficients {
            hill_tibeto: 1.0,
            low_hindu: 2.0,
            newar: 3.0,
            terai_tibeto: 4.0,
        };
        assert_approx_eq!(coefficients.get(Ethnicity::HighHindu), 0.0);
        assert_approx_eq!(coefficients.get(Ethnicity::TeraiTibeto), 4.0);
    }

    #[test]
    fn logistic_midpoint() {
        assert_approx_eq!(logistic(0.0), 0.5);
        assert!(logistic(10.0) > 0.99);
    }

    #[test]
    #[should_panic(expected = "Statistics not initialized")]
    fn statistics_before_init_panics() {
        let context = Context::new();
        let _ = context.statistics();
    }
}
