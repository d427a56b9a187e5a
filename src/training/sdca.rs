//! Stochastic dual coordinate ascent for L2-regularized linear models
//!
//! Each coordinate step maximizes the dual in one example's variable
//! `beta_i = alpha_i * y_i`, kept in `[0, 1]`, and updates the primal
//! weights `w = sum(alpha_i * x_i) / (lambda * n)` in place. The bias is a
//! weight on a constant feature.

use crate::error::Result;
use ndarray::{s, Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::linear::{score_fitted, LinearWeights};
use super::{check_fit_input, sigmoid, signed_labels, BinaryClassifier};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SdcaLoss {
    /// Log loss; calibrated through the sigmoid
    Logistic,
    /// Hinge loss; raw margins only
    Hinge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdcaConfig {
    pub loss: SdcaLoss,
    /// Regularization; `1 / n` when unset
    pub lambda: Option<f64>,
    pub epochs: usize,
    /// Stop once an epoch's largest dual step falls below this
    pub tol: f64,
    pub random_state: u64,
}

impl Default for SdcaConfig {
    fn default() -> Self {
        Self {
            loss: SdcaLoss::Logistic,
            lambda: None,
            epochs: 20,
            tol: 1e-6,
            random_state: 42,
        }
    }
}

impl SdcaConfig {
    pub fn with_loss(mut self, loss: SdcaLoss) -> Self {
        self.loss = loss;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdcaClassifier {
    pub config: SdcaConfig,
    fitted: Option<LinearWeights>,
}

impl SdcaClassifier {
    pub fn new(config: SdcaConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.config.loss == SdcaLoss::Logistic
    }
}

const BETA_EPS: f64 = 1e-12;

/// Dual step for the logistic loss: a few Newton iterations on
/// `ln((1 - b) / b) - margin - q * d = 0`
fn logistic_step(beta: f64, margin: f64, q: f64) -> f64 {
    let mut d = 0.0;
    for _ in 0..8 {
        let b = (beta + d).clamp(BETA_EPS, 1.0 - BETA_EPS);
        let g = ((1.0 - b) / b).ln() - margin - q * d;
        let h = -1.0 / (b * (1.0 - b)) - q;
        let next = d - g / h;
        d = (beta + next).clamp(BETA_EPS, 1.0 - BETA_EPS) - beta;
        if g.abs() < 1e-10 {
            break;
        }
    }
    d
}

/// Closed-form dual step for the hinge loss
fn hinge_step(beta: f64, margin: f64, q: f64) -> f64 {
    let target = if q > 0.0 { beta + (1.0 - margin) / q } else { 1.0 };
    target.clamp(0.0, 1.0) - beta
}

impl BinaryClassifier for SdcaClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let (n, p) = x.dim();
        let y_signed = signed_labels(y);
        let lambda = self.config.lambda.unwrap_or(1.0 / n as f64).max(1e-12);
        let scale = 1.0 / (lambda * n as f64);

        let start = match self.config.loss {
            SdcaLoss::Logistic => 0.5,
            SdcaLoss::Hinge => 0.0,
        };
        let mut beta = vec![start; n];

        // Last slot is the bias
        let mut w: Array1<f64> = Array1::zeros(p + 1);
        for i in 0..n {
            let coef = start * y_signed[i] * scale;
            w.slice_mut(s![..p]).scaled_add(coef, &x.row(i));
            w[p] += coef;
        }

        let sq_norms: Vec<f64> = x.rows().into_iter().map(|r| r.dot(&r) + 1.0).collect();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        let mut indices: Vec<usize> = (0..n).collect();

        for _ in 0..self.config.epochs {
            indices.shuffle(&mut rng);
            let mut max_step = 0.0f64;

            for &i in &indices {
                let xi = x.row(i);
                let yi = y_signed[i];
                let margin = yi * (xi.dot(&w.slice(s![..p])) + w[p]);
                let q = sq_norms[i] * scale;

                let d = match self.config.loss {
                    SdcaLoss::Logistic => logistic_step(beta[i], margin, q),
                    SdcaLoss::Hinge => hinge_step(beta[i], margin, q),
                };
                if d == 0.0 {
                    continue;
                }

                beta[i] += d;
                let coef = d * yi * scale;
                w.slice_mut(s![..p]).scaled_add(coef, &xi);
                w[p] += coef;
                max_step = max_step.max(d.abs());
            }

            if max_step < self.config.tol {
                break;
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

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Option<Array1<f64>>> {
        let margins = self.decision_function(x)?;
        Ok(self.is_calibrated().then(|| margins.mapv(sigmoid)))
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
    fn test_hinge_step_clamps() {
        assert_eq!(hinge_step(0.0, 5.0, 1.0), 0.0);
        assert_eq!(hinge_step(0.0, -5.0, 1.0), 1.0);
    }

    #[test]
    fn test_logistic_step_solves_stationarity() {
        let (beta, margin, q) = (0.5, 0.3, 2.0);
        let d = logistic_step(beta, margin, q);
        let b = beta + d;
        let g = ((1.0 - b) / b).ln() - margin - q * d;
        assert!(g.abs() < 1e-8);
    }

    #[test]
    fn test_sdca_logistic() {
        let (x, y) = separable(40);
        let mut model = SdcaClassifier::new(SdcaConfig::default());
        model.fit(&x, &y).unwrap();

        assert!(accuracy(&model.decision_function(&x).unwrap(), &y) > 0.9);
        assert!(model.predict_proba(&x).unwrap().is_some());
    }

    #[test]
    fn test_sdca_hinge() {
        let (x, y) = separable(40);
        let mut model = SdcaClassifier::new(SdcaConfig::default().with_loss(SdcaLoss::Hinge));
        model.fit(&x, &y).unwrap();

        assert!(accuracy(&model.decision_function(&x).unwrap(), &y) > 0.9);
        assert!(model.predict_proba(&x).unwrap().is_none());
    }
}
