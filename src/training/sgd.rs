//! Stochastic Gradient Descent (SGD) binary classifier
//!
//! Log loss gives a calibrated learner whose probability is the sigmoid of
//! the margin; hinge loss gives a plain margin classifier.

use crate::error::Result;
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::linear::{score_fitted, LinearWeights};
use super::{check_fit_input, sigmoid, signed_labels, BinaryClassifier};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SgdLoss {
    /// Logistic regression
    Log,
    /// SVM-like
    Hinge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SgdConfig {
    pub loss: SgdLoss,
    pub eta0: f64,
    /// L2 regularization
    pub alpha: f64,
    pub epochs: usize,
    pub tol: f64,
    pub power_t: f64,
    pub random_state: u64,
}

impl Default for SgdConfig {
    fn default() -> Self {
        Self {
            loss: SgdLoss::Log,
            eta0: 0.1,
            alpha: 1e-4,
            epochs: 20,
            tol: 1e-6,
            power_t: 0.25,
            random_state: 42,
        }
    }
}

impl SgdConfig {
    pub fn with_loss(mut self, loss: SgdLoss) -> Self {
        self.loss = loss;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SgdClassifier {
    pub config: SgdConfig,
    fitted: Option<LinearWeights>,
}

impl SgdClassifier {
    pub fn new(config: SgdConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.config.loss == SgdLoss::Log
    }

    fn learning_rate(&self, t: usize) -> f64 {
        self.config.eta0 / (t as f64).powf(self.config.power_t)
    }
}

impl BinaryClassifier for SgdClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let n = x.nrows();
        let y_signed = signed_labels(y);

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        let mut lw = LinearWeights::zeros(x.ncols());
        let mut indices: Vec<usize> = (0..n).collect();
        let mut prev_loss = f64::MAX;
        let mut t = 1usize;

        for epoch in 0..self.config.epochs {
            indices.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for &i in &indices {
                let xi = x.row(i);
                let yi = y_signed[i];
                let margin = xi.dot(&lw.weights) + lw.bias;
                let lr = self.learning_rate(t);

                let dloss = match self.config.loss {
                    SgdLoss::Hinge => {
                        if yi * margin < 1.0 {
                            epoch_loss += 1.0 - yi * margin;
                            -yi
                        } else {
                            0.0
                        }
                    }
                    SgdLoss::Log => {
                        let p = sigmoid(margin);
                        let y01 = if yi > 0.0 { 1.0 } else { 0.0 };
                        epoch_loss += -(y01 * p.max(1e-15).ln()
                            + (1.0 - y01) * (1.0 - p).max(1e-15).ln());
                        p - y01
                    }
                };

                lw.weights *= 1.0 - lr * self.config.alpha;
                if dloss != 0.0 {
                    lw.weights.scaled_add(-lr * dloss, &xi);
                    lw.bias -= lr * dloss;
                }
                t += 1;
            }

            epoch_loss /= n as f64;
            if epoch > 0 && (prev_loss - epoch_loss).abs() < self.config.tol {
                break;
            }
            prev_loss = epoch_loss;
        }

        self.fitted = Some(lw);
        Ok(())
    }

    fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        score_fitted(&self.fitted, x)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Option<Array1<f64>>> {
        let margins = self.decision_function(x)?;
        Ok(self.is_calibrated().then(|| margins.mapv(sigmoid)))
    }

    fn feature_weights(&self) -> Option<Array1<f64>> {
        self.fitted.as_ref().map(LinearWeights::abs_weights)
    }
}
