//! Binary classification metrics

use crate::error::{CreditScoreError, Result};
use crate::trainers::Prediction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Probability clamp used by log-loss
pub const PROBABILITY_EPSILON: f64 = 1e-15;

/// Scalar metrics a report can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Metric {
    Accuracy,
    Auc,
    Auprc,
    F1Score,
    PositivePrecision,
    PositiveRecall,
    NegativePrecision,
    NegativeRecall,
    LogLoss,
    LogLossReduction,
    Entropy,
}

impl Metric {
    /// Metrics present in every report
    pub const BINARY: [Metric; 8] = [
        Metric::Accuracy,
        Metric::Auc,
        Metric::Auprc,
        Metric::F1Score,
        Metric::PositivePrecision,
        Metric::PositiveRecall,
        Metric::NegativePrecision,
        Metric::NegativeRecall,
    ];

    /// Extra metrics of a calibrated report
    pub const CALIBRATED: [Metric; 3] = [Metric::LogLoss, Metric::LogLossReduction, Metric::Entropy];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Accuracy => "Accuracy",
            Metric::Auc => "AUC",
            Metric::Auprc => "AUPRC",
            Metric::F1Score => "F1Score",
            Metric::PositivePrecision => "PositivePrecision",
            Metric::PositiveRecall => "PositiveRecall",
            Metric::NegativePrecision => "NegativePrecision",
            Metric::NegativeRecall => "NegativeRecall",
            Metric::LogLoss => "LogLoss",
            Metric::LogLossReduction => "LogLossReduction",
            Metric::Entropy => "Entropy",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Counts of predicted vs. true labels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positive: usize,
    pub false_negative: usize,
    pub false_positive: usize,
    pub true_negative: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(predicted: impl Iterator<Item = bool>, truth: &[bool]) -> Self {
        let mut cm = Self::default();
        for (p, &t) in predicted.zip(truth.iter()) {
            match (t, p) {
                (true, true) => cm.true_positive += 1,
                (true, false) => cm.false_negative += 1,
                (false, true) => cm.false_positive += 1,
                (false, false) => cm.true_negative += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.false_negative + self.false_positive + self.true_negative
    }

    pub fn positives(&self) -> usize {
        self.true_positive + self.false_negative
    }

    pub fn negatives(&self) -> usize {
        self.false_positive + self.true_negative
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positive + self.true_negative, self.total())
    }

    pub fn positive_precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    pub fn positive_recall(&self) -> f64 {
        ratio(self.true_positive, self.positives())
    }

    pub fn negative_precision(&self) -> f64 {
        ratio(self.true_negative, self.true_negative + self.false_negative)
    }

    pub fn negative_recall(&self) -> f64 {
        ratio(self.true_negative, self.negatives())
    }

    pub fn f1_score(&self) -> f64 {
        let p = self.positive_precision();
        let r = self.positive_recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    /// Positive ratio, a truth x predicted grid and per-class precision
    /// and recall
    pub fn format_table(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "TEST POSITIVE RATIO:\t{:.4} ({}/({}+{}))\n",
            ratio(self.positives(), self.total()),
            self.positives(),
            self.positives(),
            self.negatives()
        ));
        out.push_str("Confusion table\n");
        out.push_str("          ||======================\n");
        out.push_str("PREDICTED || positive | negative | Recall\n");
        out.push_str("TRUTH     ||======================\n");
        out.push_str(&format!(
            " positive || {:>8} | {:>8} | {:.4}\n",
            self.true_positive,
            self.false_negative,
            self.positive_recall()
        ));
        out.push_str(&format!(
            " negative || {:>8} | {:>8} | {:.4}\n",
            self.false_positive,
            self.true_negative,
            self.negative_recall()
        ));
        out.push_str("          ||======================\n");
        out.push_str(&format!(
            "Precision || {:>8.4} | {:>8.4} |\n",
            self.positive_precision(),
            self.negative_precision()
        ));
        out
    }
}

/// Non-calibrated report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryMetrics {
    pub accuracy: f64,
    pub auc: f64,
    pub auprc: f64,
    pub f1_score: f64,
    pub positive_precision: f64,
    pub positive_recall: f64,
    pub negative_precision: f64,
    pub negative_recall: f64,
    pub confusion_matrix: ConfusionMatrix,
}

impl BinaryMetrics {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Accuracy => Some(self.accuracy),
            Metric::Auc => Some(self.auc),
            Metric::Auprc => Some(self.auprc),
            Metric::F1Score => Some(self.f1_score),
            Metric::PositivePrecision => Some(self.positive_precision),
            Metric::PositiveRecall => Some(self.positive_recall),
            Metric::NegativePrecision => Some(self.negative_precision),
            Metric::NegativeRecall => Some(self.negative_recall),
            _ => None,
        }
    }
}

/// Binary report plus the probability-based metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratedBinaryMetrics {
    pub binary: BinaryMetrics,
    pub log_loss: f64,
    /// `(entropy - log_loss) / entropy`; NaN when the labels are all one class
    pub log_loss_reduction: f64,
    /// Entropy of the label prior
    pub entropy: f64,
}

impl CalibratedBinaryMetrics {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::LogLoss => Some(self.log_loss),
            Metric::LogLossReduction => Some(self.log_loss_reduction),
            Metric::Entropy => Some(self.entropy),
            other => self.binary.get(other),
        }
    }
}

/// Report for one evaluation partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetricsReport {
    NonCalibrated(BinaryMetrics),
    Calibrated(CalibratedBinaryMetrics),
}

impl MetricsReport {
    pub fn is_calibrated(&self) -> bool {
        matches!(self, MetricsReport::Calibrated(_))
    }

    pub fn binary(&self) -> &BinaryMetrics {
        match self {
            MetricsReport::NonCalibrated(m) => m,
            MetricsReport::Calibrated(m) => &m.binary,
        }
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        match self {
            MetricsReport::NonCalibrated(m) => m.get(metric),
            MetricsReport::Calibrated(m) => m.get(metric),
        }
    }

    /// Every metric the report carries, in display order
    pub fn values(&self) -> Vec<(Metric, f64)> {
        Metric::BINARY
            .iter()
            .chain(Metric::CALIBRATED.iter())
            .filter_map(|&m| self.get(m).map(|v| (m, v)))
            .collect()
    }
}

/// Score the predictions against the truth.
///
/// The calibrated path requires a probability on every prediction and ranks
/// by it; the non-calibrated path ranks by raw score.
pub fn evaluate_binary(predictions: &[Prediction], labels: &[bool], calibrated: bool) -> Result<MetricsReport> {
    if predictions.is_empty() {
        return Err(CreditScoreError::InvalidParameter {
            name: "predictions".to_string(),
            value: "0".to_string(),
            reason: "cannot evaluate an empty partition".to_string(),
        });
    }
    if predictions.len() != labels.len() {
        return Err(CreditScoreError::SchemaMismatch {
            expected: format!("{} labels", predictions.len()),
            actual: format!("{} labels", labels.len()),
        });
    }

    let probabilities = if calibrated {
        let probs = predictions
            .iter()
            .map(|p| p.probability)
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(|| {
                CreditScoreError::FitError("calibrated evaluation needs probabilities".to_string())
            })?;
        Some(probs)
    } else {
        None
    };

    let keys: Vec<f64> = match &probabilities {
        Some(probs) => probs.clone(),
        None => predictions.iter().map(|p| p.score).collect(),
    };

    let cm = ConfusionMatrix::from_labels(predictions.iter().map(|p| p.predicted_label), labels);
    let binary = BinaryMetrics {
        accuracy: cm.accuracy(),
        auc: auc(&keys, labels),
        auprc: average_precision(&keys, labels),
        f1_score: cm.f1_score(),
        positive_precision: cm.positive_precision(),
        positive_recall: cm.positive_recall(),
        negative_precision: cm.negative_precision(),
        negative_recall: cm.negative_recall(),
        confusion_matrix: cm,
    };

    Ok(match probabilities {
        None => MetricsReport::NonCalibrated(binary),
        Some(probs) => {
            let log_loss = log_loss(&probs, labels);
            let entropy = prior_entropy(labels);
            let log_loss_reduction = if entropy > 0.0 {
                (entropy - log_loss) / entropy
            } else {
                f64::NAN
            };
            MetricsReport::Calibrated(CalibratedBinaryMetrics {
                binary,
                log_loss,
                log_loss_reduction,
                entropy,
            })
        }
    })
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// NaN scores rank below every other score and tie with each other;
/// -0.0 folds into 0.0 so the two share a group
fn ranking_keys(keys: &[f64]) -> Vec<f64> {
    keys.iter()
        .map(|&k| if k.is_nan() { f64::NEG_INFINITY } else { k + 0.0 })
        .collect()
}

/// Area under the ROC curve via the rank statistic
///
/// AUC = (sum of positive ranks - P(P+1)/2) / (P * N), tied keys share
/// their average rank. NaN when either class is absent.
pub fn auc(keys: &[f64], labels: &[bool]) -> f64 {
    let n_pos = labels.iter().filter(|&&l| l).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return f64::NAN;
    }

    let keys = ranking_keys(keys);
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| keys[a].total_cmp(&keys[b]));

    let mut rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i + 1;
        while j < order.len() && keys[order[j]] == keys[order[i]] {
            j += 1;
        }
        // 1-based ranks i+1..=j share their mean
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        let tied_pos = order[i..j].iter().filter(|&&k| labels[k]).count();
        rank_sum += avg_rank * tied_pos as f64;
        i = j;
    }

    let p = n_pos as f64;
    (rank_sum - p * (p + 1.0) / 2.0) / (p * n_neg as f64)
}

/// Step-wise average precision over distinct thresholds
///
/// AP = sum_k (R_k - R_{k-1}) * P_k. NaN when either class is absent.
pub fn average_precision(keys: &[f64], labels: &[bool]) -> f64 {
    let n_pos = labels.iter().filter(|&&l| l).count();
    if n_pos == 0 || n_pos == labels.len() {
        return f64::NAN;
    }

    let keys = ranking_keys(keys);
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| keys[b].total_cmp(&keys[a]));

    let mut ap = 0.0;
    let mut tp = 0usize;
    let mut prev_recall = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i + 1;
        while j < order.len() && keys[order[j]] == keys[order[i]] {
            j += 1;
        }
        tp += order[i..j].iter().filter(|&&k| labels[k]).count();
        let recall = tp as f64 / n_pos as f64;
        let precision = tp as f64 / j as f64;
        ap += (recall - prev_recall) * precision;
        prev_recall = recall;
        i = j;
    }

    ap
}

/// Mean negative log-likelihood, natural log, probabilities clamped to
/// `[1e-15, 1 - 1e-15]`
pub fn log_loss(probabilities: &[f64], labels: &[bool]) -> f64 {
    let n = probabilities.len();
    if n == 0 {
        return 0.0;
    }
    let total: f64 = probabilities
        .iter()
        .zip(labels.iter())
        .map(|(&p, &y)| {
            let p = p.clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON);
            if y {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();
    total / n as f64
}

/// Entropy of the empirical label prior, in nats
pub fn prior_entropy(labels: &[bool]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let p = labels.iter().filter(|&&l| l).count() as f64 / labels.len() as f64;
    [p, 1.0 - p]
        .iter()
        .filter(|&&q| q > 0.0)
        .map(|&q| -q * q.ln())
        .sum()
}
