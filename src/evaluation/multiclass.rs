//! Multiclass view of a probabilistic classifier
//!
//! Only learners that model a full class distribution (naive Bayes) report
//! these; the binary report stays the primary one.

use super::metrics::PROBABILITY_EPSILON;
use crate::error::{CreditScoreError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MulticlassMetrics {
    /// Fraction of rows whose argmax class is the true class
    pub micro_accuracy: f64,
    /// Mean per-class recall over classes present in the truth
    pub macro_accuracy: f64,
    pub log_loss: f64,
    /// `(prior entropy - log_loss) / prior entropy`; NaN for a single class
    pub log_loss_reduction: f64,
    /// Mean log-loss of the rows of each class; NaN for an absent class
    pub per_class_log_loss: Vec<f64>,
}

impl MulticlassMetrics {
    /// Evaluate an `n x k` probability matrix against class indices
    pub fn evaluate(probabilities: &Array2<f64>, labels: &[usize]) -> Result<Self> {
        let (n, k) = probabilities.dim();
        if n == 0 || n != labels.len() {
            return Err(CreditScoreError::SchemaMismatch {
                expected: format!("{} labels", n),
                actual: format!("{} labels", labels.len()),
            });
        }
        if let Some(&bad) = labels.iter().find(|&&c| c >= k) {
            return Err(CreditScoreError::InvalidParameter {
                name: "label".to_string(),
                value: bad.to_string(),
                reason: format!("only {} classes", k),
            });
        }

        let mut correct = 0usize;
        let mut class_count = vec![0usize; k];
        let mut class_correct = vec![0usize; k];
        let mut class_loss = vec![0.0; k];
        let mut total_loss = 0.0;

        for (row, &truth) in probabilities.rows().into_iter().zip(labels.iter()) {
            // First maximum wins ties
            let mut predicted = 0;
            for c in 1..k {
                if row[c] > row[predicted] {
                    predicted = c;
                }
            }
            let p = row[truth].clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON);
            let loss = -p.ln();

            class_count[truth] += 1;
            class_loss[truth] += loss;
            total_loss += loss;
            if predicted == truth {
                correct += 1;
                class_correct[truth] += 1;
            }
        }

        let recalls: Vec<f64> = class_count
            .iter()
            .zip(class_correct.iter())
            .filter(|(&count, _)| count > 0)
            .map(|(&count, &hit)| hit as f64 / count as f64)
            .collect();
        let macro_accuracy = recalls.iter().sum::<f64>() / recalls.len() as f64;

        let log_loss = total_loss / n as f64;
        let entropy: f64 = class_count
            .iter()
            .filter(|&&c| c > 0)
            .map(|&c| {
                let q = c as f64 / n as f64;
                -q * q.ln()
            })
            .sum();
        let log_loss_reduction = if entropy > 0.0 {
            (entropy - log_loss) / entropy
        } else {
            f64::NAN
        };

        let per_class_log_loss = class_loss
            .iter()
            .zip(class_count.iter())
            .map(|(&loss, &count)| if count > 0 { loss / count as f64 } else { f64::NAN })
            .collect();

        Ok(Self {
            micro_accuracy: correct as f64 / n as f64,
            macro_accuracy,
            log_loss,
            log_loss_reduction,
            per_class_log_loss,
        })
    }

    /// Field-wise mean over folds; NaN entries are skipped
    pub fn average(folds: &[MulticlassMetrics]) -> Option<Self> {
        let first = folds.first()?;
        let mean = |f: &dyn Fn(&MulticlassMetrics) -> f64| -> f64 {
            let values: Vec<f64> = folds.iter().map(f).filter(|v| v.is_finite()).collect();
            if values.is_empty() {
                f64::NAN
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            }
        };

        let per_class_log_loss = (0..first.per_class_log_loss.len())
            .map(|c| mean(&|m| m.per_class_log_loss.get(c).copied().unwrap_or(f64::NAN)))
            .collect();

        Some(Self {
            micro_accuracy: mean(&|m| m.micro_accuracy),
            macro_accuracy: mean(&|m| m.macro_accuracy),
            log_loss: mean(&|m| m.log_loss),
            log_loss_reduction: mean(&|m| m.log_loss_reduction),
            per_class_log_loss,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_accuracies() {
        let probs = array![[0.9, 0.1], [0.8, 0.2], [0.3, 0.7], [0.6, 0.4]];
        let labels = [0, 0, 1, 1];
        let m = MulticlassMetrics::evaluate(&probs, &labels).unwrap();

        assert!((m.micro_accuracy - 0.75).abs() < 1e-12);
        // class 0 recall 1.0, class 1 recall 0.5
        assert!((m.macro_accuracy - 0.75).abs() < 1e-12);
        assert_eq!(m.per_class_log_loss.len(), 2);
        let class0 = -(0.9f64.ln() + 0.8f64.ln()) / 2.0;
        assert!((m.per_class_log_loss[0] - class0).abs() < 1e-12);
        assert!(m.log_loss_reduction.is_finite());
    }

    #[test]
    fn test_absent_class() {
        let probs = array![[0.9, 0.1], [0.7, 0.3]];
        let m = MulticlassMetrics::evaluate(&probs, &[0, 0]).unwrap();
        assert!(m.per_class_log_loss[1].is_nan());
        assert!(m.log_loss_reduction.is_nan());
        assert_eq!(m.macro_accuracy, 1.0);
    }

    #[test]
    fn test_rejects_bad_labels() {
        let probs = array![[0.5, 0.5]];
        assert!(MulticlassMetrics::evaluate(&probs, &[2]).is_err());
        assert!(MulticlassMetrics::evaluate(&probs, &[0, 1]).is_err());
    }

    #[test]
    fn test_average() {
        let a = MulticlassMetrics::evaluate(&array![[0.9, 0.1], [0.2, 0.8]], &[0, 1]).unwrap();
        let b = MulticlassMetrics::evaluate(&array![[0.4, 0.6], [0.2, 0.8]], &[0, 1]).unwrap();
        let avg = MulticlassMetrics::average(&[a, b]).unwrap();
        assert!((avg.micro_accuracy - 0.75).abs() < 1e-12);
        assert!(MulticlassMetrics::average(&[]).is_none());
    }
}
