//! Averaged perceptron with hinge-loss updates

use crate::error::Result;
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::linear::{score_fitted, LinearWeights};
use super::{check_fit_input, signed_labels, BinaryClassifier};

/// Updates on every example with margin below 1 and returns the average of
/// the weight vectors seen after each example.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AveragedPerceptron {
    pub learning_rate: f64,
    pub iterations: usize,
    pub random_state: u64,
    fitted: Option<LinearWeights>,
}

impl AveragedPerceptron {
    pub fn new(iterations: usize) -> Self {
        Self {
            learning_rate: 1.0,
            iterations: iterations.max(1),
            random_state: 42,
            fitted: None,
        }
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }
}

impl Default for AveragedPerceptron {
    fn default() -> Self {
        Self::new(10)
    }
}

impl BinaryClassifier for AveragedPerceptron {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let n = x.nrows();
        let y_signed = signed_labels(y);

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.random_state);
        let mut current = LinearWeights::zeros(x.ncols());
        let mut total = LinearWeights::zeros(x.ncols());
        let mut steps = 0usize;
        let mut indices: Vec<usize> = (0..n).collect();

        for _ in 0..self.iterations {
            indices.shuffle(&mut rng);
            for &i in &indices {
                let xi = x.row(i);
                let yi = y_signed[i];
                let margin = yi * (xi.dot(&current.weights) + current.bias);

                if margin < 1.0 {
                    current.weights.scaled_add(self.learning_rate * yi, &xi);
                    current.bias += self.learning_rate * yi;
                }

                total.weights += &current.weights;
                total.bias += current.bias;
                steps += 1;
            }
        }

        let denom = steps.max(1) as f64;
        self.fitted = Some(LinearWeights {
            weights: total.weights / denom,
            bias: total.bias / denom,
        });
        Ok(())
    }

    fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        score_fitted(&self.fitted, x)
    }

    fn feature_weights(&self) -> Option<Array1<f64>> {
        self.fitted.as_ref().map(LinearWeights::abs_weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::test_data::{accuracy, separable};

    #[test]
    fn test_perceptron_separates() {
        let (x, y) = separable(40);
        let mut model = AveragedPerceptron::default();
        model.fit(&x, &y).unwrap();
        assert!(accuracy(&model.decision_function(&x).unwrap(), &y) > 0.9);
    }

    #[test]
    fn test_unfitted_errors() {
        let (x, _) = separable(4);
        assert!(AveragedPerceptron::default().decision_function(&x).is_err());
    }
}
