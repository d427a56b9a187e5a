//! Weight vector shared by the linear learners

use crate::error::{CreditScoreError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::check_width;

/// `score = x . w + b`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearWeights {
    pub weights: Array1<f64>,
    pub bias: f64,
}

impl LinearWeights {
    pub fn zeros(n_features: usize) -> Self {
        Self {
            weights: Array1::zeros(n_features),
            bias: 0.0,
        }
    }

    pub fn score(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_width(x, self.weights.len())?;
        Ok(x.dot(&self.weights) + self.bias)
    }

    pub fn abs_weights(&self) -> Array1<f64> {
        self.weights.mapv(f64::abs)
    }
}

/// Score with fitted weights, or fail if there are none
pub(crate) fn score_fitted(
    fitted: &Option<LinearWeights>,
    x: &Array2<f64>,
) -> Result<Array1<f64>> {
    fitted
        .as_ref()
        .ok_or(CreditScoreError::ModelNotFitted)?
        .score(x)
}
