use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::agents::agent_store::StoreKind;
use crate::ids::{HouseholdId, NeighborhoodId, PersonId, RegionId};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    #[must_use]
    pub fn opposite(self) -> Sex {
        match self {
            Sex::Male => Sex::Female,
            Sex::Female => Sex::Male,
        }
    }
}

/// CVFS ethnic groups. `HighHindu` is the reference level of every regression.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumIter,
)]
pub enum Ethnicity {
    HighHindu,
    HillTibeto,
    LowHindu,
    Newar,
    TeraiTibeto,
}

impl Ethnicity {
    /// The survey coding, 1 to 5.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Ethnicity> {
        match code {
            1 => Some(Ethnicity::HighHindu),
            2 => Some(Ethnicity::HillTibeto),
            3 => Some(Ethnicity::LowHindu),
            4 => Some(Ethnicity::Newar),
            5 => Some(Ethnicity::TeraiTibeto),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SchoolStatus {
    Undetermined,
    InSchool,
    OutOfSchool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum DesiredChildren {
    Unset,
    /// Family size is left to chance; never limits births.
    NoPreference,
    Count(u32),
}

impl DesiredChildren {
    /// Whether a woman with `num_children` has reached her desired family size.
    #[must_use]
    pub fn is_reached(self, num_children: u32) -> bool {
        match self {
            DesiredChildren::Count(count) => num_children >= count,
            DesiredChildren::Unset | DesiredChildren::NoPreference => false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MigrationRecord {
    pub kind: StoreKind,
    pub timestep: i64,
    pub duration_months: i64,
}

/// Whether each service was within an hour's walk of the neighborhood a person grew
/// up in. Set once and never updated.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CommunityContext {
    pub school_lt_1hr: bool,
    pub health_lt_1hr: bool,
    pub bus_lt_1hr: bool,
    pub market_lt_1hr: bool,
    pub employer_lt_1hr: bool,
}

/// Parents' characteristics as reported in the survey. Only initial agents and
/// in-migrants carry these; everyone else looks at their actual parents.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct ParentalBackground {
    pub mother_work: bool,
    pub father_work: bool,
    pub mother_years_schooling: f64,
    pub father_years_schooling: f64,
    pub mother_num_children: u32,
}

/// A person record in the `World` arena. Relationships are IDs, resolved through the
/// arena when used.
#[derive(Clone, Debug)]
pub struct Person {
    pub id: PersonId,
    /// Negative for persons born before the start of the run.
    pub birth_timestep: i64,
    pub age_months: i64,
    pub sex: Sex,
    pub ethnicity: Ethnicity,
    pub alive: bool,
    pub death_timestep: Option<i64>,
    pub initial_agent: bool,
    pub in_migrant: bool,

    pub mother: Option<PersonId>,
    pub father: Option<PersonId>,
    pub spouse: Option<PersonId>,
    pub children: Vec<PersonId>,
    pub num_children: u32,

    /// The household the person is present in, if any.
    pub household: Option<HouseholdId>,
    /// The household the person last lived in; an away person returns here.
    pub last_household: Option<HouseholdId>,
    pub away: bool,
    pub permanently_away: bool,
    /// Stores the person is currently held in.
    pub stores: Vec<(RegionId, StoreKind)>,
    pub return_timestep: Option<i64>,
    pub last_migration: Option<MigrationRecord>,

    pub marriage_timestep: Option<i64>,
    pub ever_divorced: bool,
    pub ever_widowed: bool,
    pub last_divorce_check: Option<i64>,

    pub desired_children: DesiredChildren,
    pub last_birth_timestep: Option<i64>,
    /// Months that must pass after a birth before the next one; women only.
    pub birth_interval: Option<i64>,
    /// Months from marriage to first birth under the simple timing model.
    pub first_birth_timing: i64,

    pub schooling: f64,
    pub final_schooling: Option<f64>,
    pub school_status: SchoolStatus,
    pub work: bool,
    pub parents_contracep_ever: bool,
    pub parental_background: Option<ParentalBackground>,
    pub childhood_context: CommunityContext,
    pub birth_household: Option<HouseholdId>,
    pub birth_neighborhood: Option<NeighborhoodId>,
}

impl Person {
    /// A living, unattached person with every optional attribute empty.
    #[must_use]
    pub fn new(
        id: PersonId,
        birth_timestep: i64,
        age_months: i64,
        sex: Sex,
        ethnicity: Ethnicity,
    ) -> Person {
        Person {
            id,
            birth_timestep,
            age_months,
            sex,
            ethnicity,
            alive: true,
            death_timestep: None,
            initial_agent: false,
            in_migrant: false,
            mother: None,
            father: None,
            spouse: None,
            children: Vec::new(),
            num_children: 0,
            household: None,
            last_household: None,
            away: false,
            permanently_away: false,
            stores: Vec::new(),
            return_timestep: None,
            last_migration: None,
            marriage_timestep: None,
            ever_divorced: false,
            ever_widowed: false,
            last_divorce_check: None,
            desired_children: DesiredChildren::Unset,
            last_birth_timestep: None,
            birth_interval: None,
            first_birth_timing: 0,
            schooling: 0.0,
            final_schooling: None,
            school_status: SchoolStatus::Undetermined,
            work: false,
            parents_contracep_ever: false,
            parental_background: None,
            childhood_context: CommunityContext::default(),
            birth_household: None,
            birth_neighborhood: None,
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn age_years(&self) -> f64 {
        self.age_months as f64 / 12.0
    }

    #[must_use]
    pub fn is_married(&self) -> bool {
        self.spouse.is_some()
    }

    #[must_use]
    pub fn is_female(&self) -> bool {
        self.sex == Sex::Female
    }

    #[must_use]
    pub fn is_in_school(&self) -> bool {
        self.school_status == SchoolStatus::InSchool
    }

    /// Present in a household (not away, not departed, not dead).
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.alive && self.household.is_some()
    }

    /// The household a person belongs to, whether present or away.
    #[must_use]
    pub fn home_household(&self) -> Option<HouseholdId> {
        if self.away {
            self.last_household
        } else {
            self.household
        }
    }

    /// Months since marriage at `timestep`.
    #[must_use]
    pub fn months_married(&self, timestep: i64) -> Option<i64> {
        self.marriage_timestep.map(|married| timestep - married)
    }

    /// Age in years at marriage.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn marriage_age_years(&self, timestep: i64) -> Option<f64> {
        self.months_married(timestep)
            .map(|months| (self.age_months - months) as f64 / 12.0)
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn new_person_is_alive_and_unattached() {
        let person = Person::new(PersonId(4), -240, 240, Sex::Female, Ethnicity::Newar);
        assert!(person.alive);
        assert!(!person.is_married());
        assert!(!person.is_present());
        assert_eq!(person.school_status, SchoolStatus::Undetermined);
        assert!((person.age_years() - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn desired_children() {
        assert!(DesiredChildren::Count(2).is_reached(2));
        assert!(!DesiredChildren::Count(2).is_reached(1));
        assert!(!DesiredChildren::NoPreference.is_reached(12));
        assert!(!DesiredChildren::Unset.is_reached(12));
    }

    #[test]
    fn ethnicity_codes() {
        assert_eq!(Ethnicity::from_code(1), Some(Ethnicity::HighHindu));
        assert_eq!(Ethnicity::from_code(5), Some(Ethnicity::TeraiTibeto));
        assert_eq!(Ethnicity::from_code(6), None);
    }

    #[test]
    fn marriage_age() {
        let mut person = Person::new(PersonId(1), -300, 300, Sex::Male, Ethnicity::Newar);
        person.marriage_timestep = Some(-60);
        assert_eq!(person.months_married(0), Some(60));
        assert_eq!(person.marriage_age_years(0), Some(20.0));
    }
}
