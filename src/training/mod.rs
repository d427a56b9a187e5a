//! Learner substrate
//!
//! Binary classifiers the trainer strategy dispatches to:
//! - Decision trees, random forests and gradient-boosted trees
//! - Linear learners: SGD, Pegasos SVM, averaged perceptron, L-BFGS and SDCA
//! - Gaussian naive Bayes
//! - A class-prior baseline
//!
//! Labels are `0.0` / `1.0`. Every learner fits on single-class data without
//! panicking; an empty matrix is a fit error.

pub mod calibration;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod linear;
pub mod logistic;
pub mod naive_bayes;
pub mod perceptron;
pub mod prior;
pub mod random_forest;
pub mod sdca;
pub mod sgd;
pub mod svm;

pub use calibration::{Calibrator, PlattScaling};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
pub use linear::LinearWeights;
pub use logistic::{LbfgsConfig, LbfgsLogisticRegression};
pub use naive_bayes::GaussianNaiveBayes;
pub use perceptron::AveragedPerceptron;
pub use prior::PriorClassifier;
pub use random_forest::{MaxFeatures, RandomForest};
pub use sdca::{SdcaClassifier, SdcaConfig, SdcaLoss};
pub use sgd::{SgdClassifier, SgdConfig, SgdLoss};
pub use svm::{LinearSvm, PegasosConfig};

use crate::error::{CreditScoreError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Trait for binary learners
pub trait BinaryClassifier: Send + Sync {
    /// Fit to a feature matrix and 0/1 labels
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Raw score; positive leans towards the positive class
    fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Positive-class probability, for calibrated learners only
    fn predict_proba(&self, _x: &Array2<f64>) -> Result<Option<Array1<f64>>> {
        Ok(None)
    }

    /// Per-slot weight magnitude (linear weights or split gain)
    fn feature_weights(&self) -> Option<Array1<f64>> {
        None
    }
}

/// Any learner, in a form that can be persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Predictor {
    FastTree(GradientBoostingClassifier),
    FastForest(RandomForest),
    Sgd(SgdClassifier),
    LinearSvm(LinearSvm),
    AveragedPerceptron(AveragedPerceptron),
    Lbfgs(LbfgsLogisticRegression),
    Sdca(SdcaClassifier),
    NaiveBayes(GaussianNaiveBayes),
    Prior(PriorClassifier),
}

impl Predictor {
    fn inner(&self) -> &dyn BinaryClassifier {
        match self {
            Predictor::FastTree(m) => m,
            Predictor::FastForest(m) => m,
            Predictor::Sgd(m) => m,
            Predictor::LinearSvm(m) => m,
            Predictor::AveragedPerceptron(m) => m,
            Predictor::Lbfgs(m) => m,
            Predictor::Sdca(m) => m,
            Predictor::NaiveBayes(m) => m,
            Predictor::Prior(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn BinaryClassifier {
        match self {
            Predictor::FastTree(m) => m,
            Predictor::FastForest(m) => m,
            Predictor::Sgd(m) => m,
            Predictor::LinearSvm(m) => m,
            Predictor::AveragedPerceptron(m) => m,
            Predictor::Lbfgs(m) => m,
            Predictor::Sdca(m) => m,
            Predictor::NaiveBayes(m) => m,
            Predictor::Prior(m) => m,
        }
    }

    /// Per-class probabilities `[P(0), P(1)]` for learners that model them
    pub fn class_probabilities(&self, x: &Array2<f64>) -> Result<Option<Array2<f64>>> {
        match self {
            Predictor::NaiveBayes(nb) => nb.predict_class_proba(x).map(Some),
            _ => Ok(None),
        }
    }
}

impl BinaryClassifier for Predictor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner().decision_function(x)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Option<Array1<f64>>> {
        self.inner().predict_proba(x)
    }

    fn feature_weights(&self) -> Option<Array1<f64>> {
        self.inner().feature_weights()
    }
}

/// Reject empty or misaligned training input
pub(crate) fn check_fit_input(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() == 0 {
        return Err(CreditScoreError::FitError(
            "cannot fit on an empty matrix".to_string(),
        ));
    }
    if x.nrows() != y.len() {
        return Err(CreditScoreError::SchemaMismatch {
            expected: format!("{} labels", x.nrows()),
            actual: format!("{} labels", y.len()),
        });
    }
    Ok(())
}

/// Reject a scoring matrix whose width differs from the fit width
pub(crate) fn check_width(x: &Array2<f64>, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(CreditScoreError::SchemaMismatch {
            expected: format!("{} features", n_features),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}

#[inline]
pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// 0/1 labels as -1/+1
pub(crate) fn signed_labels(y: &Array1<f64>) -> Vec<f64> {
    y.iter().map(|&v| if v > 0.5 { 1.0 } else { -1.0 }).collect()
}

#[cfg(test)]
pub(crate) mod test_data {
    use ndarray::{Array1, Array2};

    /// Two separable clusters along the first feature
    pub fn separable(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 3), |(i, j)| {
            let base = if i < n / 2 { 0.1 } else { 0.9 };
            match j {
                0 => base + (i % 5) as f64 * 0.01,
                1 => (i % 7) as f64 / 7.0,
                _ => 0.5,
            }
        });
        let y = Array1::from_shape_fn(n, |i| if i < n / 2 { 0.0 } else { 1.0 });
        (x, y)
    }

    pub fn accuracy(scores: &Array1<f64>, y: &Array1<f64>) -> f64 {
        let correct = scores
            .iter()
            .zip(y.iter())
            .filter(|(&s, &t)| (s > 0.0) == (t > 0.5))
            .count();
        correct as f64 / y.len() as f64
    }
}
