use serde::{Deserialize, Serialize};

use super::{logistic, EthnicCoefficients, MigrationStrategy, Statistics};
use crate::agents::World;
use crate::ids::PersonId;

/// Logistic long-distance migration hazard. Ages above 55 are the reference level.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct MigrationCoefficients {
    pub intercept: f64,
    pub in_school: f64,
    pub years_schooling: f64,
    pub own_farmland: f64,
    pub log_market_minutes: f64,
    pub female: f64,
    pub ethnic: EthnicCoefficients,
    pub age_15_24: f64,
    pub age_24_34: f64,
    pub age_34_44: f64,
    pub age_45_55: f64,
}

impl MigrationCoefficients {
    fn age_term(&self, age: f64) -> f64 {
        if (15.0..=24.0).contains(&age) {
            self.age_15_24
        } else if age > 24.0 && age <= 34.0 {
            self.age_24_34
        } else if age > 34.0 && age <= 44.0 {
            self.age_34_44
        } else if age > 44.0 && age <= 55.0 {
            self.age_45_55
        } else {
            0.0
        }
    }

    fn probability(&self, world: &World, id: PersonId) -> f64 {
        let person = world.person(id);
        let neighborhood = world.present_neighborhood(id);
        let own_land = person
            .household
            .is_some_and(|hid| world.household(hid).flags.own_land);

        let mut inner = self.intercept;
        if person.is_in_school() {
            inner += self.in_school;
        }
        inner += self.years_schooling * person.schooling;
        if own_land {
            inner += self.own_farmland;
        }
        inner += self.log_market_minutes * (neighborhood.services.market + 1.0).ln();
        if person.is_female() {
            inner += self.female;
        }
        inner += self.ethnic.get(person.ethnicity);
        inner += self.age_term(person.age_years());
        logistic(inner)
    }
}

impl Statistics {
    /// Probability that a present person leaves on a long-distance migration this
    /// timestep.
    #[must_use]
    pub fn migration_probability(&self, world: &World, person: PersonId) -> f64 {
        match &self.migration {
            MigrationStrategy::Simple(rates) => rates.probability(world.person(person)),
            MigrationStrategy::Zvoleff(coefficients) => coefficients.probability(world, person),
        }
    }
}
