//! Class-prior baseline

use crate::error::{CreditScoreError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::{check_fit_input, BinaryClassifier};

/// Ignores the features and predicts the training positive rate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriorClassifier {
    positive_rate: Option<f64>,
}

impl PriorClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positive_rate(&self) -> Option<f64> {
        self.positive_rate
    }

    fn rate(&self) -> Result<f64> {
        self.positive_rate.ok_or(CreditScoreError::ModelNotFitted)
    }
}

impl BinaryClassifier for PriorClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let positives = y.iter().filter(|&&v| v > 0.5).count();
        self.positive_rate = Some(positives as f64 / y.len() as f64);
        Ok(())
    }

    /// Log-odds of the prior
    fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let p = self.rate()?.clamp(1e-15, 1.0 - 1e-15);
        Ok(Array1::from_elem(x.nrows(), (p / (1.0 - p)).ln()))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Option<Array1<f64>>> {
        Ok(Some(Array1::from_elem(x.nrows(), self.rate()?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_prior() {
        let x = Array2::zeros((4, 2));
        let y = array![1.0, 0.0, 0.0, 0.0];
        let mut prior = PriorClassifier::new();
        prior.fit(&x, &y).unwrap();

        assert_eq!(prior.positive_rate(), Some(0.25));
        let probs = prior.predict_proba(&x).unwrap().unwrap();
        assert!(probs.iter().all(|&p| p == 0.25));
        let scores = prior.decision_function(&x).unwrap();
        assert!((scores[0] - (1.0f64 / 3.0).ln()).abs() < 1e-12);
    }

    #[test]
    fn test_single_class_score_is_finite() {
        let x = Array2::zeros((3, 1));
        let mut prior = PriorClassifier::new();
        prior.fit(&x, &Array1::ones(3)).unwrap();
        assert!(prior.decision_function(&x).unwrap()[0].is_finite());
    }
}
