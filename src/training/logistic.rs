//! L2-regularized logistic regression solved with L-BFGS

use crate::error::Result;
use ndarray::{s, Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::trace;

use super::linear::{score_fitted, LinearWeights};
use super::{check_fit_input, sigmoid, BinaryClassifier};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LbfgsConfig {
    /// History length
    pub memory: usize,
    /// L2 weight on the summed loss; the bias is not penalized
    pub l2: f64,
    pub tol: f64,
    pub max_iter: usize,
}

impl Default for LbfgsConfig {
    fn default() -> Self {
        Self {
            memory: 20,
            l2: 1.0,
            tol: 1e-7,
            max_iter: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LbfgsLogisticRegression {
    pub config: LbfgsConfig,
    fitted: Option<LinearWeights>,
}

impl LbfgsLogisticRegression {
    pub fn new(config: LbfgsConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }
}

impl Default for LbfgsLogisticRegression {
    fn default() -> Self {
        Self::new(LbfgsConfig::default())
    }
}

/// `ln(1 + e^z)` without overflow
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

/// Loss and gradient over `theta = [w; b]`
fn objective(x: &Array2<f64>, y: &Array1<f64>, theta: &Array1<f64>, l2: f64) -> (f64, Array1<f64>) {
    let p = x.ncols();
    let w = theta.slice(s![..p]);
    let b = theta[p];
    let margins = x.dot(&w) + b;

    let mut loss = 0.5 * l2 * w.dot(&w);
    let mut residual: Array1<f64> = Array1::zeros(x.nrows());
    for (i, (&m, &yi)) in margins.iter().zip(y.iter()).enumerate() {
        // -log P(y|x) = softplus(m) - y*m
        loss += softplus(m) - yi * m;
        residual[i] = sigmoid(m) - yi;
    }

    let mut grad: Array1<f64> = Array1::zeros(p + 1);
    grad.slice_mut(s![..p]).assign(&(x.t().dot(&residual) + &(&w * l2)));
    grad[p] = residual.sum();
    (loss, grad)
}

impl BinaryClassifier for LbfgsLogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let p = x.ncols();
        let l2 = self.config.l2;

        let mut theta: Array1<f64> = Array1::zeros(p + 1);
        let (mut loss, mut grad) = objective(x, y, &theta, l2);
        let mut history: VecDeque<(Array1<f64>, Array1<f64>, f64)> = VecDeque::new();

        for iter in 0..self.config.max_iter {
            if grad.dot(&grad).sqrt() < self.config.tol {
                break;
            }

            // Two-loop recursion
            let mut q = grad.clone();
            let mut alphas = Vec::with_capacity(history.len());
            for (s_k, y_k, rho) in history.iter().rev() {
                let alpha = rho * s_k.dot(&q);
                q.scaled_add(-alpha, y_k);
                alphas.push(alpha);
            }
            if let Some((s_k, y_k, _)) = history.back() {
                q *= s_k.dot(y_k) / y_k.dot(y_k);
            }
            for ((s_k, y_k, rho), alpha) in history.iter().zip(alphas.iter().rev()) {
                let beta = rho * y_k.dot(&q);
                q.scaled_add(alpha - beta, s_k);
            }
            let mut direction = -q;
            if direction.dot(&grad) >= 0.0 {
                direction = -grad.clone();
                history.clear();
            }

            // Backtracking line search (Armijo)
            let slope = direction.dot(&grad);
            let mut step = 1.0;
            let mut accepted = None;
            for _ in 0..40 {
                let candidate = &theta + &(&direction * step);
                let (c_loss, c_grad) = objective(x, y, &candidate, l2);
                if c_loss.is_finite() && c_loss <= loss + 1e-4 * step * slope {
                    accepted = Some((candidate, c_loss, c_grad));
                    break;
                }
                step *= 0.5;
            }
            let Some((next, next_loss, next_grad)) = accepted else {
                break;
            };

            let s_k = &next - &theta;
            let y_k = &next_grad - &grad;
            let sy = s_k.dot(&y_k);
            if sy > 1e-12 {
                if history.len() == self.config.memory {
                    history.pop_front();
                }
                history.push_back((s_k, y_k, 1.0 / sy));
            }

            let improvement = (loss - next_loss).abs() / loss.abs().max(1.0);
            theta = next;
            loss = next_loss;
            grad = next_grad;
            trace!(iter, loss, "lbfgs step");

            if improvement < self.config.tol {
                break;
            }
        }

        self.fitted = Some(LinearWeights {
            weights: theta.slice(s![..p]).to_owned(),
            bias: theta[p],
        });
        Ok(())
    }

    fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        score_fitted(&self.fitted, x)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Option<Array1<f64>>> {
        Ok(Some(self.decision_function(x)?.mapv(sigmoid)))
    }

    fn feature_weights(&self) -> Option<Array1<f64>> {
        self.fitted.as_ref().map(LinearWeights::abs_weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::test_data::{accuracy, separable};
    use ndarray::array;

    #[test]
    fn test_softplus() {
        assert!((softplus(0.0) - 2f64.ln()).abs() < 1e-12);
        assert!((softplus(800.0) - 800.0).abs() < 1e-9);
        assert!(softplus(-800.0) >= 0.0);
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let x = array![[0.2, 1.0], [0.7, -0.3], [0.5, 0.5]];
        let y = array![0.0, 1.0, 1.0];
        let theta = array![0.3, -0.2, 0.1];
        let (_, grad) = objective(&x, &y, &theta, 1.0);

        let h = 1e-6;
        for k in 0..3 {
            let mut up = theta.clone();
            let mut down = theta.clone();
            up[k] += h;
            down[k] -= h;
            let numeric = (objective(&x, &y, &up, 1.0).0 - objective(&x, &y, &down, 1.0).0) / (2.0 * h);
            assert!((numeric - grad[k]).abs() < 1e-5, "slot {}", k);
        }
    }

    #[test]
    fn test_lbfgs_fits() {
        let (x, y) = separable(40);
        let mut model = LbfgsLogisticRegression::default();
        model.fit(&x, &y).unwrap();

        assert!(accuracy(&model.decision_function(&x).unwrap(), &y) > 0.9);
        let probs = model.predict_proba(&x).unwrap().unwrap();
        assert!(probs.iter().all(|&p| p > 0.0 && p < 1.0));
    }

    #[test]
    fn test_single_class_is_finite() {
        let (x, _) = separable(10);
        let y = Array1::ones(10);
        let mut model = LbfgsLogisticRegression::default();
        model.fit(&x, &y).unwrap();
        assert!(model.decision_function(&x).unwrap().iter().all(|s| s.is_finite()));
    }
}
