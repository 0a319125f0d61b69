use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{logistic, EthnicCoefficients, Statistics};
use crate::agents::World;
use crate::ids::PersonId;

/// Ordered logit over final schooling levels.
///
/// `intercepts[j]` is the intercept of the probability that the final level is above
/// `levels[j]`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EducationCoefficients {
    /// Final years of schooling, lowest first.
    pub levels: Vec<f64>,
    pub intercepts: Vec<f64>,
    pub female: f64,
    pub ethnic: EthnicCoefficients,
    pub avg_yrs_services_lt15: f64,
}

impl Statistics {
    /// Cumulative probabilities of each final level for `person`; the last is 1.
    #[must_use]
    pub fn education_cutoffs(&self, world: &World, person: PersonId) -> Vec<f64> {
        let c = &self.education;
        let record = world.person(person);
        let mut xb = c.ethnic.get(record.ethnicity);
        if record.is_female() {
            xb += c.female;
        }
        if let Some(nid) = world.person_neighborhood(person) {
            xb += c.avg_yrs_services_lt15 * world.neighborhood(nid).avg_yrs_services_lt15;
        }

        let prob_gte: Vec<f64> = c
            .intercepts
            .iter()
            .map(|intercept| logistic(intercept + xb))
            .collect();
        let mut prob_eq = vec![0.0; c.levels.len()];
        if let Some(first) = prob_gte.first() {
            prob_eq[0] = 1.0 - first;
        }
        for j in 1..prob_gte.len() {
            let below: f64 = prob_eq[..j].iter().sum();
            prob_eq[j] = 1.0 - prob_gte[j] - below;
        }

        let mut cutoffs: Vec<f64> = prob_eq
            .iter()
            .scan(0.0, |total, p| {
                *total += p;
                Some(*total)
            })
            .collect();
        if let Some(last) = cutoffs.last_mut() {
            *last = 1.0;
        }
        cutoffs
    }

    /// Final years of schooling for a uniform draw against `cutoffs`.
    pub fn draw_education_level<R: Rng + ?Sized>(&self, rng: &mut R, cutoffs: &[f64]) -> f64 {
        let draw: f64 = rng.random();
        let index = cutoffs
            .iter()
            .position(|&cutoff| draw <= cutoff)
            .unwrap_or(cutoffs.len().saturating_sub(1));
        self.education.levels[index]
    }
}
