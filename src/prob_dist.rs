//! Piecewise-uniform distributions given as bin edges plus bin probabilities.
//!
//! The parameter file writes them as
//!
//! ```json
//! { "edges": [0, 12, 24, 36], "probs": [0.5, 0.3, 0.2] }
//! ```
//!
//! A draw picks a bin with probability proportional to its weight and then a uniform
//! value inside it.
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::AbmError;

#[derive(Deserialize, Serialize)]
struct RawProbDist {
    edges: Vec<f64>,
    probs: Vec<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "RawProbDist", into = "RawProbDist")]
pub struct ProbDist {
    edges: Vec<f64>,
    probs: Vec<f64>,
    #[serde(skip)]
    index: WeightedIndex<f64>,
}

impl ProbDist {
    /// # Errors
    ///
    /// `AbmError::ConfigError` unless there is one more edge than probabilities, the
    /// edges increase strictly, and the probabilities are non-negative with a
    /// positive sum.
    pub fn new(edges: Vec<f64>, probs: Vec<f64>) -> Result<ProbDist, AbmError> {
        if probs.is_empty() || edges.len() != probs.len() + 1 {
            return Err(AbmError::ConfigError(format!(
                "distribution needs one more edge than probabilities ({} edges, {} probs)",
                edges.len(),
                probs.len()
            )));
        }
        if edges.windows(2).any(|pair| !(pair[0] < pair[1])) {
            return Err(AbmError::ConfigError(
                "distribution edges must increase strictly".to_string(),
            ));
        }
        let index = WeightedIndex::new(&probs)
            .map_err(|e| AbmError::ConfigError(format!("invalid distribution weights: {e}")))?;
        Ok(ProbDist {
            edges,
            probs,
            index,
        })
    }

    /// Share of the total mass in the bin containing `value`; zero outside the edges.
    /// The last bin includes its upper edge.
    #[must_use]
    pub fn prob_of_value(&self, value: f64) -> f64 {
        let last = self.probs.len() - 1;
        let total: f64 = self.probs.iter().sum();
        (0..self.probs.len())
            .find(|&i| {
                let (lo, hi) = (self.edges[i], self.edges[i + 1]);
                value >= lo && (value < hi || (i == last && value <= hi))
            })
            .map_or(0.0, |i| self.probs[i] / total)
    }

    #[must_use]
    pub fn min(&self) -> f64 {
        self.edges[0]
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        self.edges[self.edges.len() - 1]
    }
}

impl Distribution<f64> for ProbDist {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let bin = self.index.sample(rng);
        rng.random_range(self.edges[bin]..self.edges[bin + 1])
    }
}

impl TryFrom<RawProbDist> for ProbDist {
    type Error = AbmError;

    fn try_from(raw: RawProbDist) -> Result<Self, Self::Error> {
        ProbDist::new(raw.edges, raw.probs)
    }
}

impl From<ProbDist> for RawProbDist {
    fn from(dist: ProbDist) -> Self {
        RawProbDist {
            edges: dist.edges,
            probs: dist.probs,
        }
    }
}
