//! Platt scaling of raw scores

use crate::error::{CreditScoreError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::sigmoid;

/// Trait for score-to-probability calibrators
pub trait Calibrator: Send + Sync {
    /// Fit the calibrator on raw scores and true labels
    fn fit(&mut self, scores: &Array1<f64>, labels: &Array1<f64>) -> Result<()>;

    /// Map raw scores to probabilities
    fn calibrate(&self, scores: &Array1<f64>) -> Result<Array1<f64>>;
}

/// Platt scaling calibrator
///
/// Fits `P(y=1|f) = sigmoid(a*f + b)` by Newton's method against Platt's
/// smoothed targets, so a single-class partition still has a finite fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlattScaling {
    a: Option<f64>,
    b: Option<f64>,
    max_iter: usize,
    tol: f64,
}

impl PlattScaling {
    pub fn new() -> Self {
        Self {
            a: None,
            b: None,
            max_iter: 100,
            tol: 1e-7,
        }
    }

    /// Fitted `(a, b)`
    pub fn parameters(&self) -> Option<(f64, f64)> {
        match (self.a, self.b) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        }
    }
}

impl Default for PlattScaling {
    fn default() -> Self {
        Self::new()
    }
}

impl Calibrator for PlattScaling {
    fn fit(&mut self, scores: &Array1<f64>, labels: &Array1<f64>) -> Result<()> {
        let n = scores.len();
        if n != labels.len() {
            return Err(CreditScoreError::SchemaMismatch {
                expected: format!("{} labels", n),
                actual: format!("{} labels", labels.len()),
            });
        }
        if n == 0 {
            return Err(CreditScoreError::FitError(
                "cannot calibrate on zero scores".to_string(),
            ));
        }

        let n_pos = labels.iter().filter(|&&y| y > 0.5).count() as f64;
        let n_neg = n as f64 - n_pos;
        let target_pos = (n_pos + 1.0) / (n_pos + 2.0);
        let target_neg = 1.0 / (n_neg + 2.0);
        let targets: Vec<f64> = labels
            .iter()
            .map(|&y| if y > 0.5 { target_pos } else { target_neg })
            .collect();

        let mut a = 1.0;
        let mut b = 0.0;

        for _ in 0..self.max_iter {
            let mut grad_a = 0.0;
            let mut grad_b = 0.0;
            let mut hess_aa = 1e-6;
            let mut hess_ab = 0.0;
            let mut hess_bb = 1e-6;

            for (&f, &t) in scores.iter().zip(&targets) {
                let p = sigmoid(a * f + b);
                let d1 = p - t;
                let d2 = p * (1.0 - p);

                grad_a += f * d1;
                grad_b += d1;
                hess_aa += f * f * d2;
                hess_ab += f * d2;
                hess_bb += d2;
            }

            let det = hess_aa * hess_bb - hess_ab * hess_ab;
            if det.abs() < 1e-12 {
                break;
            }

            let delta_a = (hess_bb * grad_a - hess_ab * grad_b) / det;
            let delta_b = (hess_aa * grad_b - hess_ab * grad_a) / det;
            if !delta_a.is_finite() || !delta_b.is_finite() {
                break;
            }

            a -= delta_a;
            b -= delta_b;

            if delta_a.abs() < self.tol && delta_b.abs() < self.tol {
                break;
            }
        }

        if !a.is_finite() || !b.is_finite() {
            a = 1.0;
            b = 0.0;
        }

        self.a = Some(a);
        self.b = Some(b);
        Ok(())
    }

    fn calibrate(&self, scores: &Array1<f64>) -> Result<Array1<f64>> {
        let (a, b) = self.parameters().ok_or(CreditScoreError::ModelNotFitted)?;
        Ok(scores.mapv(|f| sigmoid(a * f + b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_platt_scaling_basic() {
        let scores = array![-2.0, -0.5, -0.8, 1.5, 2.2, -1.4, 0.9, 0.3];
        let labels = array![0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0];

        let mut calibrator = PlattScaling::new();
        calibrator.fit(&scores, &labels).unwrap();
        let probs = calibrator.calibrate(&scores).unwrap();

        assert!(probs.iter().all(|&p| (0.0..=1.0).contains(&p)));
        assert!(probs[4] > probs[0], "monotone in the score");
        let (a, _) = calibrator.parameters().unwrap();
        assert!(a > 0.0);
    }

    #[test]
    fn test_single_class_stays_finite() {
        let scores = array![0.1, 0.2, 0.3];
        let labels = array![1.0, 1.0, 1.0];

        let mut calibrator = PlattScaling::new();
        calibrator.fit(&scores, &labels).unwrap();
        let probs = calibrator.calibrate(&scores).unwrap();
        assert!(probs.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_calibrate_before_fit() {
        assert!(PlattScaling::new().calibrate(&array![0.0]).is_err());
    }
}
