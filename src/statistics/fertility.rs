use serde::{Deserialize, Serialize};

use super::{logistic, EthnicCoefficients, FirstBirthStrategy, Statistics};
use crate::agents::{ParentalBackground, World};
use crate::ids::PersonId;

/// Logistic first-birth hazard fitted to the CVFS panel.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FirstBirthCoefficients {
    pub intercept: f64,
    pub neighborhood_area_km2: f64,
    pub percent_agveg: f64,
    pub dist_nara_km: f64,
    pub elec_available: f64,
    pub avg_yrs_services_lt15: f64,
    pub mother_num_children: f64,
    pub mother_years_schooling: f64,
    pub mother_work: f64,
    pub father_years_schooling: f64,
    pub father_work: f64,
    pub parents_contracep_ever: f64,
    pub ethnic: EthnicCoefficients,
    pub age_at_marriage: f64,
    /// By months married: up to 6, 12, 18, 24, 30, 36, and longer.
    pub marriage_duration: [f64; 7],
    /// Schooling below 4 years is the reference level.
    pub schooling_4_7: f64,
    pub schooling_7_11: f64,
    pub schooling_11_plus: f64,
}

fn bool_term(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Survey-reported parents for initial agents and in-migrants, the actual parents for
/// everyone born in the model.
fn parental_background(world: &World, id: PersonId) -> ParentalBackground {
    let person = world.person(id);
    if let Some(background) = person.parental_background {
        return background;
    }
    let mother = person.mother.and_then(|mid| world.get_person(mid));
    let father = person.father.and_then(|fid| world.get_person(fid));
    ParentalBackground {
        mother_work: mother.is_some_and(|m| m.work),
        father_work: father.is_some_and(|f| f.work),
        mother_years_schooling: mother.map_or(0.0, |m| m.schooling),
        father_years_schooling: father.map_or(0.0, |f| f.schooling),
        mother_num_children: mother.map_or(0, |m| m.num_children),
    }
}

fn duration_bin(months_married: i64) -> usize {
    let bin = ((months_married - 1).max(0) / 6).min(6);
    usize::try_from(bin).unwrap_or(0)
}

impl FirstBirthCoefficients {
    fn probability(&self, world: &World, id: PersonId, timestep: i64) -> f64 {
        let person = world.person(id);
        let neighborhood = world.present_neighborhood(id);
        let parents = parental_background(world, id);

        let mut inner = self.intercept;
        inner += self.neighborhood_area_km2 * neighborhood.total_area / 1_000_000.0;
        inner += self.percent_agveg * neighborhood.percent_agveg();
        inner += self.dist_nara_km * neighborhood.dist_nara_km;
        inner += self.elec_available * bool_term(neighborhood.elec_available);
        inner += self.avg_yrs_services_lt15 * neighborhood.avg_yrs_services_lt15;

        inner += self.mother_num_children * f64::from(parents.mother_num_children);
        inner += self.mother_years_schooling * parents.mother_years_schooling;
        inner += self.mother_work * bool_term(parents.mother_work);
        inner += self.father_years_schooling * parents.father_years_schooling;
        inner += self.father_work * bool_term(parents.father_work);
        inner += self.parents_contracep_ever * bool_term(person.parents_contracep_ever);

        inner += self.ethnic.get(person.ethnicity);
        inner += self.age_at_marriage * person.marriage_age_years(timestep).unwrap_or(0.0);
        let months_married = person.months_married(timestep).unwrap_or(0);
        inner += self.marriage_duration[duration_bin(months_married)];

        inner += if person.schooling < 4.0 {
            0.0
        } else if person.schooling < 8.0 {
            self.schooling_4_7
        } else if person.schooling < 11.0 {
            self.schooling_7_11
        } else {
            self.schooling_11_plus
        };
        logistic(inner)
    }
}

impl Statistics {
    /// Probability of a first birth this timestep under the hazard model, or `None`
    /// when first births follow drawn timings.
    #[must_use]
    pub fn first_birth_probability(
        &self,
        world: &World,
        person: PersonId,
        timestep: i64,
    ) -> Option<f64> {
        match &self.first_birth {
            FirstBirthStrategy::Simple(_) => None,
            FirstBirthStrategy::Zvoleff(coefficients) => {
                Some(coefficients.probability(world, person, timestep))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;
    use crate::agents::{DesiredChildren, Ethnicity, Sex};
    use crate::parameters::FirstBirthModel;
    use crate::test_utils::{add_household, add_person, test_parameters, test_world};

    #[test]
    fn duration_bins() {
        assert_eq!(duration_bin(0), 0);
        assert_eq!(duration_bin(6), 0);
        assert_eq!(duration_bin(7), 1);
        assert_eq!(duration_bin(36), 5);
        assert_eq!(duration_bin(37), 6);
        assert_eq!(duration_bin(400), 6);
    }

    #[test]
    fn parents_in_model_stand_in_for_survey_background() {
        let (mut world, _, _) = test_world();
        let mother = add_person(&mut world, 45.0, Sex::Female, Ethnicity::Newar);
        world.person_mut(mother).schooling = 5.0;
        world.person_mut(mother).num_children = 3;
        world.person_mut(mother).work = true;
        let child = add_person(&mut world, 20.0, Sex::Female, Ethnicity::Newar);
        world.person_mut(child).mother = Some(mother);

        let background = parental_background(&world, child);
        assert!(background.mother_work);
        assert!(!background.father_work);
        assert_approx_eq!(background.mother_years_schooling, 5.0);
        assert_eq!(background.mother_num_children, 3);
    }

    #[test]
    fn simple_timing_has_no_hazard() {
        let stats = Statistics::new(&test_parameters());
        let (world, _, _) = test_world();
        assert!(stats.uses_first_birth_timing());
        assert!(stats
            .first_birth_probability(&world, PersonId(0), 0)
            .is_none());
    }

    #[test]
    fn zvoleff_hazard_uses_marriage_duration() {
        let mut coefficients = FirstBirthCoefficients {
            intercept: -1.0,
            neighborhood_area_km2: 0.0,
            percent_agveg: 0.0,
            dist_nara_km: 0.0,
            elec_available: 0.0,
            avg_yrs_services_lt15: 0.0,
            mother_num_children: 0.0,
            mother_years_schooling: 0.0,
            mother_work: 0.0,
            father_years_schooling: 0.0,
            father_work: 0.0,
            parents_contracep_ever: 0.0,
            ethnic: EthnicCoefficients::default(),
            age_at_marriage: 0.0,
            marriage_duration: [0.0; 7],
            schooling_4_7: 0.0,
            schooling_7_11: 0.0,
            schooling_11_plus: 0.0,
        };
        coefficients.marriage_duration[1] = 1.0;
        let mut parameters = test_parameters();
        parameters.birth.first_birth = FirstBirthModel::Zvoleff(coefficients);
        let stats = Statistics::new(&parameters);

        let (mut world, nid, _) = test_world();
        let wife = add_person(&mut world, 20.0, Sex::Female, Ethnicity::Newar);
        let husband = add_person(&mut world, 24.0, Sex::Male, Ethnicity::Newar);
        world.marry(husband, wife, 0, DesiredChildren::NoPreference);
        add_household(&mut world, nid, &[wife, husband]);

        assert_approx_eq!(
            stats.first_birth_probability(&world, wife, 3).unwrap(),
            logistic(-1.0)
        );
        assert_approx_eq!(
            stats.first_birth_probability(&world, wife, 9).unwrap(),
            logistic(0.0)
        );
    }
}
