//! Model parameters, read from one JSON file and stored as the `Parameters` global
//! property.
//!
//! Strategy choices (`"model": "simple"` / `"zvoleff"` and so on) are tagged enums, so
//! an unknown strategy name fails while the file is parsed. Everything else is checked
//! by `validate_parameters` when the property is set, before any simulation state
//! exists.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::agents::ServiceKind;
use crate::clock::YearMonth;
use crate::context::Context;
use crate::define_global_property;
use crate::error::AbmError;
use crate::global_properties::ContextGlobalPropertiesExt;
use crate::log::info;
use crate::prob_dist::ProbDist;
use crate::statistics::{
    EducationCoefficients, FirstBirthCoefficients, FuelwoodDemandModel,
    FuelwoodUsageCoefficients, MarriageCoefficients, MigrationCoefficients,
};

/// The unit the probabilities of an age table are given in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnits {
    Months,
    Years,
}

impl TimeUnits {
    #[must_use]
    pub fn months(self) -> u32 {
        match self {
            TimeUnits::Months => 1,
            TimeUnits::Years => 12,
        }
    }
}

/// Probabilities by age bin. Edges are ages in years; ages past the last edge use the
/// last bin.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgeTable {
    pub edges: Vec<f64>,
    pub probs: Vec<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SexAgeTables {
    pub male: AgeTable,
    pub female: AgeTable,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelParameters {
    pub start: YearMonth,
    pub end: YearMonth,
    pub timestep_months: u32,
    /// Timesteps run before the start date, indexed `-burn_in_timesteps..0`.
    #[serde(default)]
    pub burn_in_timesteps: u32,
    /// Directory holding the population CSVs. Relative paths are resolved against the
    /// directory of the parameter file.
    pub input_data_dir: PathBuf,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "lowercase")]
pub enum FirstBirthModel {
    /// Months from marriage to first birth drawn from `times` at marriage.
    Simple { times: ProbDist },
    Zvoleff(FirstBirthCoefficients),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BirthParameters {
    pub min_age_years: f64,
    pub max_age_years: f64,
    /// Months between births.
    pub intervals: ProbDist,
    /// Desired family size; negative draws mean no preference.
    pub desired_children: ProbDist,
    /// A childless couple married this long stops being eligible for a first birth.
    #[serde(default = "default_first_birth_window")]
    pub first_birth_window_months: i64,
    pub first_birth: FirstBirthModel,
}

fn default_first_birth_window() -> i64 {
    72
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "lowercase")]
pub enum MarriageModel {
    Simple(SexAgeTables),
    Zvoleff(MarriageCoefficients),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarriageParameters {
    pub min_age_years: f64,
    pub max_age_years: f64,
    pub probability: MarriageModel,
    /// Probability a new couple founds its own household.
    pub moveout_probability: f64,
    pub divorce_probability: f64,
    /// Husband's age minus wife's age, in years.
    pub spouse_age_diff: ProbDist,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "lowercase")]
pub enum MigrationModel {
    Simple(SexAgeTables),
    Zvoleff(MigrationCoefficients),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MigrationParameters {
    pub probability: MigrationModel,
    /// Chance that a migration never returns. Not applied during burn-in.
    pub permanent_probability: f64,
    /// Months away.
    pub lengths: ProbDist,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InmigrantParameters {
    /// Households arriving per timestep.
    pub num_households: ProbDist,
    /// Members per arriving household.
    pub household_size: ProbDist,
    /// Survey ethnicity code, 1 to 5.
    pub ethnicity: ProbDist,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HouseholdParameters {
    /// House plot area in square meters.
    pub area: ProbDist,
    pub outmigration_probability: f64,
    pub inmigrant: InmigrantParameters,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EducationParameters {
    pub start_school_age_years: f64,
    pub level: EducationCoefficients,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FuelwoodParameters {
    pub usage: FuelwoodUsageCoefficients,
    pub demand: FuelwoodDemandModel,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FeedbackParameters {
    /// Convert non-agricultural vegetation to other land for every birth.
    #[serde(default)]
    pub birth_nonagveg: bool,
    #[serde(default)]
    pub birth_nonagveg_area: f64,
}

/// How neighborhoods are chosen for new non-family organizations.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborhoodWeighting {
    Random,
    InvDistForestClosestKm,
    InvDistCnpKm,
    InvDistBzKm,
    InvDistNarayangarKm,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NfoType {
    pub service: ServiceKind,
    /// Number opening per timestep; truncated to an integer.
    pub count: ProbDist,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NfoParameters {
    #[serde(default)]
    pub enabled: bool,
    pub weighting: NeighborhoodWeighting,
    #[serde(default)]
    pub types: Vec<NfoType>,
}

impl Default for NfoParameters {
    fn default() -> Self {
        NfoParameters {
            enabled: false,
            weighting: NeighborhoodWeighting::Random,
            types: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputParameters {
    /// Write person and neighborhood snapshots every this many timesteps.
    #[serde(default)]
    pub snapshot_interval: Option<u32>,
    /// Run the consistency checks every this many timesteps; zero disables them.
    #[serde(default)]
    pub validation_interval: u32,
    #[serde(default = "default_true")]
    pub person_events: bool,
    #[serde(default)]
    pub file_prefix: String,
}

fn default_true() -> bool {
    true
}

impl Default for OutputParameters {
    fn default() -> Self {
        OutputParameters {
            snapshot_interval: None,
            validation_interval: 0,
            person_events: true,
            file_prefix: String::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParametersValues {
    pub model: ModelParameters,
    pub probability_time_units: TimeUnits,
    pub death: SexAgeTables,
    pub birth: BirthParameters,
    pub marriage: MarriageParameters,
    pub migration: MigrationParameters,
    pub household: HouseholdParameters,
    pub education: EducationParameters,
    pub fuelwood: FuelwoodParameters,
    #[serde(default)]
    pub feedback: FeedbackParameters,
    #[serde(default)]
    pub nfos: NfoParameters,
    #[serde(default)]
    pub output: OutputParameters,
}

fn config_error(message: String) -> AbmError {
    AbmError::ConfigError(message)
}

fn check_probability(name: &str, p: f64) -> Result<(), AbmError> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(config_error(format!("{name} must be in [0, 1], got {p}")))
    }
}

fn check_age_range(name: &str, min: f64, max: f64) -> Result<(), AbmError> {
    if min < 0.0 || min > max {
        return Err(config_error(format!(
            "{name} age range [{min}, {max}] is not valid"
        )));
    }
    Ok(())
}

fn check_age_table(name: &str, table: &AgeTable) -> Result<(), AbmError> {
    if table.probs.is_empty() || table.edges.len() != table.probs.len() + 1 {
        return Err(config_error(format!(
            "{name} needs one more edge than probabilities"
        )));
    }
    if table.edges.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(config_error(format!("{name} edges must increase strictly")));
    }
    for &p in &table.probs {
        check_probability(name, p)?;
    }
    Ok(())
}

fn check_sex_tables(name: &str, tables: &SexAgeTables) -> Result<(), AbmError> {
    check_age_table(&format!("{name}.male"), &tables.male)?;
    check_age_table(&format!("{name}.female"), &tables.female)
}

/// # Errors
///
/// `AbmError::ConfigError` naming the first unusable value.
pub fn validate_parameters(parameters: &ParametersValues) -> Result<(), AbmError> {
    let model = &parameters.model;
    if model.timestep_months == 0 {
        return Err(config_error("model.timestep_months must be positive".to_string()));
    }
    if !(1..=12).contains(&model.start.month) || !(1..=12).contains(&model.end.month) {
        return Err(config_error("months must be between 1 and 12".to_string()));
    }
    if model.start >= model.end {
        return Err(config_error("model.start must be before model.end".to_string()));
    }

    check_sex_tables("death", &parameters.death)?;
    check_age_range(
        "birth",
        parameters.birth.min_age_years,
        parameters.birth.max_age_years,
    )?;
    check_age_range(
        "marriage",
        parameters.marriage.min_age_years,
        parameters.marriage.max_age_years,
    )?;
    if let MarriageModel::Simple(tables) = &parameters.marriage.probability {
        check_sex_tables("marriage.probability", tables)?;
    }
    if let MigrationModel::Simple(tables) = &parameters.migration.probability {
        check_sex_tables("migration.probability", tables)?;
    }
    check_probability(
        "marriage.moveout_probability",
        parameters.marriage.moveout_probability,
    )?;
    check_probability(
        "marriage.divorce_probability",
        parameters.marriage.divorce_probability,
    )?;
    check_probability(
        "migration.permanent_probability",
        parameters.migration.permanent_probability,
    )?;
    check_probability(
        "household.outmigration_probability",
        parameters.household.outmigration_probability,
    )?;
    if parameters.household.area.min() < 0.0 {
        return Err(config_error("household.area must not be negative".to_string()));
    }
    if parameters.migration.lengths.min() < 0.0 {
        return Err(config_error("migration.lengths must not be negative".to_string()));
    }
    let ethnicity = &parameters.household.inmigrant.ethnicity;
    if ethnicity.min() < 1.0 || ethnicity.max() > 6.0 {
        return Err(config_error(
            "household.inmigrant.ethnicity must cover codes 1 to 5".to_string(),
        ));
    }

    let level = &parameters.education.level;
    if level.levels.len() < 2 || level.intercepts.len() + 1 != level.levels.len() {
        return Err(config_error(
            "education.level needs one fewer intercept than levels".to_string(),
        ));
    }

    if parameters.feedback.birth_nonagveg_area < 0.0 {
        return Err(config_error(
            "feedback.birth_nonagveg_area must not be negative".to_string(),
        ));
    }
    Ok(())
}

define_global_property!(Parameters, ParametersValues, validate_parameters);

/// Reads `file_path`, resolves the input directory against it, and sets the
/// `Parameters` global property.
///
/// # Errors
///
/// Fails if the file cannot be read or parsed, or the values do not validate.
pub fn init_parameters(context: &mut Context, file_path: &Path) -> Result<(), AbmError> {
    let mut parameters = context.load_parameters_from_json::<ParametersValues>(file_path)?;
    if parameters.model.input_data_dir.is_relative() {
        if let Some(parent) = file_path.parent() {
            parameters.model.input_data_dir = parent.join(&parameters.model.input_data_dir);
        }
    }
    info!(
        "parameters loaded from {} ({}-{:02} to {}-{:02}, {} month steps)",
        file_path.display(),
        parameters.model.start.year,
        parameters.model.start.month,
        parameters.model.end.year,
        parameters.model.end.month,
        parameters.model.timestep_months
    );
    context.set_global_property_value(Parameters, parameters)
}

pub trait ContextParametersExt {
    /// # Panics
    ///
    /// Panics if `init_parameters` has not run.
    fn parameters(&self) -> &ParametersValues;
}

impl ContextParametersExt for Context {
    fn parameters(&self) -> &ParametersValues {
        self.get_global_property_value(Parameters)
            .expect("Parameters not initialized")
    }
}
