//! Linear SVM trained with Pegasos sub-gradient steps
//!
//! The bias is folded in as a weight on a constant feature, so it is
//! shrunk and projected together with the other weights.

use crate::error::Result;
use ndarray::{s, Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::linear::{score_fitted, LinearWeights};
use super::{check_fit_input, signed_labels, BinaryClassifier};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PegasosConfig {
    /// Regularization strength
    pub lambda: f64,
    /// Passes over the data
    pub iterations: usize,
    /// Project onto the ball of radius 1/sqrt(lambda) after each step
    pub projection: bool,
    pub random_state: u64,
}

impl Default for PegasosConfig {
    fn default() -> Self {
        Self {
            lambda: 0.001,
            iterations: 20,
            projection: true,
            random_state: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSvm {
    pub config: PegasosConfig,
    fitted: Option<LinearWeights>,
}

impl LinearSvm {
    pub fn new(config: PegasosConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }
}

impl Default for LinearSvm {
    fn default() -> Self {
        Self::new(PegasosConfig::default())
    }
}

impl BinaryClassifier for LinearSvm {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let (n, p) = x.dim();
        let y_signed = signed_labels(y);
        let lambda = self.config.lambda;
        let radius = 1.0 / lambda.sqrt();

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        // Last slot is the bias
        let mut w: Array1<f64> = Array1::zeros(p + 1);
        let mut indices: Vec<usize> = (0..n).collect();
        let mut t = 1usize;

        for _ in 0..self.config.iterations {
            indices.shuffle(&mut rng);
            for &i in &indices {
                let xi = x.row(i);
                let yi = y_signed[i];
                let eta = 1.0 / (lambda * t as f64);
                let margin = yi * (xi.dot(&w.slice(s![..p])) + w[p]);

                w *= 1.0 - eta * lambda;
                if margin < 1.0 {
                    w.slice_mut(s![..p]).scaled_add(eta * yi, &xi);
                    w[p] += eta * yi;
                }

                if self.config.projection {
                    let norm = w.dot(&w).sqrt();
                    if norm > radius {
                        w *= radius / norm;
                    }
                }
                t += 1;
            }
        }

        self.fitted = Some(LinearWeights {
            weights: w.slice(s![..p]).to_owned(),
            bias: w[p],
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
    fn test_pegasos_separates() {
        let (x, y) = separable(40);
        let mut svm = LinearSvm::default();
        svm.fit(&x, &y).unwrap();

        assert!(accuracy(&svm.decision_function(&x).unwrap(), &y) > 0.9);
        assert!(svm.predict_proba(&x).unwrap().is_none());
    }

    #[test]
    fn test_weights_within_ball() {
        let (x, y) = separable(40);
        let mut svm = LinearSvm::default();
        svm.fit(&x, &y).unwrap();

        let w = svm.feature_weights().unwrap();
        assert!(w.dot(&w).sqrt() <= 1.0 / 0.001f64.sqrt() + 1e-9);
    }

    #[test]
    fn test_single_class() {
        let (x, _) = separable(10);
        let y = Array1::zeros(10);
        let mut svm = LinearSvm::default();
        svm.fit(&x, &y).unwrap();
        assert!(svm.decision_function(&x).unwrap().iter().all(|&s| s < 0.0));
    }
}
