//! Gaussian naive Bayes over 0/1 labels

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::{check_fit_input, check_width, BinaryClassifier};
use crate::error::{CreditScoreError, Result};

/// Per-class statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClassStats {
    prior: f64,
    means: Array1<f64>,
    variances: Array1<f64>,
}

/// Gaussian Naive Bayes Classifier
///
/// The binary score is `P(positive) - 0.5`, so a class absent from the
/// training data simply never wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianNaiveBayes {
    /// Index 0 is the negative class, 1 the positive
    classes: [Option<ClassStats>; 2],
    /// Fraction of the largest feature variance added to every variance
    var_smoothing: f64,
    n_features: usize,
}

impl Default for GaussianNaiveBayes {
    fn default() -> Self {
        Self::new()
    }
}

impl GaussianNaiveBayes {
    pub fn new() -> Self {
        Self {
            classes: [None, None],
            var_smoothing: 1e-9,
            n_features: 0,
        }
    }

    pub fn with_var_smoothing(mut self, smoothing: f64) -> Self {
        self.var_smoothing = smoothing;
        self
    }

    fn is_fitted(&self) -> bool {
        self.classes.iter().any(Option::is_some)
    }

    /// `n x 2` matrix of `[P(negative), P(positive)]`
    pub fn predict_class_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted() {
            return Err(CreditScoreError::ModelNotFitted);
        }
        check_width(x, self.n_features)?;

        let mut probs = Array2::zeros((x.nrows(), 2));
        for (i, row) in x.rows().into_iter().enumerate() {
            let joint: Vec<f64> = self
                .classes
                .iter()
                .map(|c| match c {
                    Some(stats) => stats.prior.ln() + log_likelihood(&row.to_owned(), stats),
                    None => f64::NEG_INFINITY,
                })
                .collect();

            // log-sum-exp
            let max = joint.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let sum: f64 = joint.iter().map(|&v| (v - max).exp()).sum();
            for (k, &v) in joint.iter().enumerate() {
                probs[[i, k]] = (v - max).exp() / sum;
            }
        }
        Ok(probs)
    }
}

fn log_likelihood(x: &Array1<f64>, stats: &ClassStats) -> f64 {
    x.iter()
        .zip(stats.means.iter())
        .zip(stats.variances.iter())
        .map(|((&xi, &mean), &var)| -0.5 * ((xi - mean).powi(2) / var + var.ln() + (2.0 * PI).ln()))
        .sum()
}

impl BinaryClassifier for GaussianNaiveBayes {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let n_samples = x.nrows();
        self.n_features = x.ncols();

        let max_var = x
            .var_axis(Axis(0), 0.0)
            .iter()
            .cloned()
            .fold(0.0, f64::max);
        let epsilon = if max_var > 0.0 {
            self.var_smoothing * max_var
        } else {
            self.var_smoothing
        };

        for (k, slot) in self.classes.iter_mut().enumerate() {
            let rows: Vec<usize> = (0..n_samples)
                .filter(|&i| (y[i] > 0.5) == (k == 1))
                .collect();
            *slot = if rows.is_empty() {
                None
            } else {
                let members = x.select(Axis(0), &rows);
                let means = members
                    .mean_axis(Axis(0))
                    .ok_or_else(|| CreditScoreError::FitError("empty class".to_string()))?;
                let variances = members.var_axis(Axis(0), 0.0) + epsilon;
                Some(ClassStats {
                    prior: rows.len() as f64 / n_samples as f64,
                    means,
                    variances,
                })
            };
        }

        Ok(())
    }

    fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let probs = self.predict_class_proba(x)?;
        Ok(probs.column(1).mapv(|p| p - 0.5))
    }
}
