use serde::{Deserialize, Serialize};

use super::{logistic, EthnicCoefficients, MarriageStrategy, Statistics};
use crate::agents::{Sex, World};
use crate::ids::PersonId;

/// Logistic marriage hazard fitted to the CVFS panel.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarriageCoefficients {
    pub intercept: f64,
    pub ethnic: EthnicCoefficients,
    pub female: f64,
    pub age: f64,
    pub age_squared: f64,
    pub log_percent_agveg: f64,
    pub school_minutes: f64,
    pub health_minutes: f64,
    pub bus_minutes: f64,
    pub market_minutes: f64,
    pub employer_minutes: f64,
    pub schooling_years: f64,
    pub in_school: f64,
    /// By calendar month, January first. January is the reference level.
    pub month: [f64; 12],
}

impl MarriageCoefficients {
    fn probability(&self, world: &World, id: PersonId, month: u32) -> f64 {
        let person = world.person(id);
        let neighborhood = world.present_neighborhood(id);
        let age = person.age_years();

        let mut inner = self.intercept + self.ethnic.get(person.ethnicity);
        if person.is_female() {
            inner += self.female;
        }
        inner += self.age * age + self.age_squared * age * age;
        inner += self.log_percent_agveg * (neighborhood.percent_agveg() + 1.0).ln();

        let services = &neighborhood.services;
        inner += self.school_minutes * services.school
            + self.health_minutes * services.health
            + self.bus_minutes * services.bus
            + self.market_minutes * services.market
            + self.employer_minutes * services.employer;

        inner += self.schooling_years * person.schooling;
        if person.is_in_school() {
            inner += self.in_school;
        }
        inner += self.month[(month.clamp(1, 12) - 1) as usize];
        logistic(inner)
    }
}

impl Statistics {
    /// Probability that an unmarried present person wants to marry this timestep.
    #[must_use]
    pub fn marriage_probability(&self, world: &World, person: PersonId, month: u32) -> f64 {
        match &self.marriage {
            MarriageStrategy::Simple(rates) => rates.probability(world.person(person)),
            MarriageStrategy::Zvoleff(coefficients) => {
                coefficients.probability(world, person, month)
            }
        }
    }

    /// Relative weight of `mate` as a spouse for `person`: the mass of the observed age
    /// difference distribution at their age gap. Zero for the same sex, different
    /// ethnicities or siblings.
    #[must_use]
    pub fn spouse_weight(&self, world: &World, person: PersonId, mate: PersonId) -> f64 {
        let (a, b) = (world.person(person), world.person(mate));
        if a.sex == b.sex || a.ethnicity != b.ethnicity || world.is_sibling(person, mate) {
            return 0.0;
        }
        let (husband, wife) = if a.sex == Sex::Male { (a, b) } else { (b, a) };
        self.spouse_age_diff
            .prob_of_value(husband.age_years() - wife.age_years())
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;
    use crate::agents::{DesiredChildren, Ethnicity};
    use crate::parameters::MarriageModel;
    use crate::test_utils::{add_household, add_person, test_parameters, test_world};

    fn zvoleff_coefficients() -> MarriageCoefficients {
        MarriageCoefficients {
            intercept: -2.0,
            ethnic: EthnicCoefficients {
                newar: 0.5,
                ..EthnicCoefficients::default()
            },
            female: 0.25,
            age: 0.1,
            age_squared: -0.001,
            log_percent_agveg: 0.0,
            school_minutes: 0.01,
            health_minutes: 0.0,
            bus_minutes: 0.0,
            market_minutes: 0.0,
            employer_minutes: 0.0,
            schooling_years: -0.05,
            in_school: -1.0,
            month: [0.0, 0.3, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        }
    }

    #[test]
    fn zvoleff_marriage_hazard() {
        let mut parameters = test_parameters();
        parameters.marriage.probability = MarriageModel::Zvoleff(zvoleff_coefficients());
        let stats = Statistics::new(&parameters);
        let (mut world, nid, _) = test_world();
        world.neighborhood_mut(nid).services.school = 20.0;
        let person = add_person(&mut world, 20.0, Sex::Female, Ethnicity::Newar);
        world.person_mut(person).schooling = 4.0;
        add_household(&mut world, nid, &[person]);

        let inner = -2.0 + 0.5 + 0.25 + 0.1 * 20.0 - 0.001 * 400.0 + 0.01 * 20.0 - 0.05 * 4.0;
        assert_approx_eq!(
            stats.marriage_probability(&world, person, 1),
            logistic(inner)
        );
        assert_approx_eq!(
            stats.marriage_probability(&world, person, 2),
            logistic(inner + 0.3)
        );
    }

    #[test]
    fn spouse_weight_is_positive_for_a_plausible_match() {
        let stats = Statistics::new(&test_parameters());
        let (mut world, _, _) = test_world();
        let woman = add_person(&mut world, 25.0, Sex::Female, Ethnicity::HillTibeto);
        let man = add_person(&mut world, 27.0, Sex::Male, Ethnicity::HillTibeto);
        assert!(stats.spouse_weight(&world, man, woman) > 0.0);
        assert!(stats.spouse_weight(&world, woman, man) > 0.0);
    }

    #[test]
    fn spouse_weight_is_zero_across_ethnicities() {
        let stats = Statistics::new(&test_parameters());
        let (mut world, _, _) = test_world();
        let woman = add_person(&mut world, 25.0, Sex::Female, Ethnicity::HillTibeto);
        for age in [20.0, 27.0, 40.0] {
            let man = add_person(&mut world, age, Sex::Male, Ethnicity::Newar);
            assert_approx_eq!(stats.spouse_weight(&world, man, woman), 0.0);
        }
    }

    #[test]
    fn spouse_weight_is_zero_for_siblings_and_same_sex() {
        let stats = Statistics::new(&test_parameters());
        let (mut world, nid, _) = test_world();
        let mother = add_person(&mut world, 45.0, Sex::Female, Ethnicity::Newar);
        let father = add_person(&mut world, 47.0, Sex::Male, Ethnicity::Newar);
        world.marry(father, mother, -300, DesiredChildren::NoPreference);
        add_household(&mut world, nid, &[mother, father]);
        let brother = add_person(&mut world, 23.0, Sex::Male, Ethnicity::Newar);
        let sister = add_person(&mut world, 21.0, Sex::Female, Ethnicity::Newar);
        for child in [brother, sister] {
            world.person_mut(child).mother = Some(mother);
            world.person_mut(mother).children.push(child);
        }
        assert_approx_eq!(stats.spouse_weight(&world, brother, sister), 0.0);
        let other = add_person(&mut world, 22.0, Sex::Male, Ethnicity::Newar);
        assert_approx_eq!(stats.spouse_weight(&world, brother, other), 0.0);
    }
}
