//! Permutation feature importance

use crate::error::{CreditScoreError, Result};
use crate::evaluation::{evaluate_binary, Metric};
use crate::trainers::predictions_from;
use crate::training::{BinaryClassifier, Predictor};
use ndarray::Array2;
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Column header of the importance table
pub const IMPORTANCE_HEADER: &str = "Feature#Model Weight#Change in AUC#Change in ACC\
#Change in areaUnderPrecisionRecallCurve#Change in f1Score#Change in negativePrecision\
#Change in positivePrecision#Change in positiveRecall#Change in negativeRecall\
#95% Confidence in the Mean Change in AUC";

/// Metric deltas in table column order
const TABLE_METRICS: [Metric; 8] = [
    Metric::Auc,
    Metric::Accuracy,
    Metric::Auprc,
    Metric::F1Score,
    Metric::NegativePrecision,
    Metric::PositivePrecision,
    Metric::PositiveRecall,
    Metric::NegativeRecall,
];

/// Spread of one metric's deltas across repetitions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricStatistics {
    pub mean: f64,
    pub std_dev: f64,
    pub std_error: f64,
}

impl MetricStatistics {
    /// Finite entries only; NaN mean if there are none
    pub fn from_values(values: &[f64]) -> Self {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let n = finite.len();
        if n == 0 {
            return Self {
                mean: f64::NAN,
                std_dev: 0.0,
                std_error: 0.0,
            };
        }
        let mean = finite.iter().sum::<f64>() / n as f64;
        if n < 2 {
            return Self {
                mean,
                std_dev: 0.0,
                std_error: 0.0,
            };
        }
        let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        let std_dev = variance.sqrt();
        Self {
            mean,
            std_dev,
            std_error: std_dev / (n as f64).sqrt(),
        }
    }
}

/// Importance of one feature slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub name: String,
    /// Position in the feature vector
    pub slot: usize,
    /// Absolute model weight, when the learner exposes one
    pub weight: Option<f64>,
    pub deltas: BTreeMap<Metric, MetricStatistics>,
}

impl FeatureImportance {
    pub fn delta(&self, metric: Metric) -> Option<&MetricStatistics> {
        self.deltas.get(&metric)
    }

    /// One `#`-separated table line
    pub fn format_line(&self) -> String {
        let mut fields = Vec::with_capacity(11);
        fields.push(self.name.clone());
        fields.push(format!("{:.2}", self.weight.unwrap_or(0.0).abs()));
        for metric in TABLE_METRICS {
            let mean = self.delta(metric).map_or(f64::NAN, |s| s.mean);
            fields.push(format_g4(mean.abs()));
        }
        let auc_se = self.delta(Metric::Auc).map_or(f64::NAN, |s| s.std_error);
        fields.push(format_g4((1.96 * auc_se).abs()));
        fields.join("#")
    }
}

/// Ranked importances for one fitted learner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceReport {
    /// Metric the rows are ordered by
    pub ranked_by: Metric,
    pub permutation_count: usize,
    /// Descending by absolute mean delta of `ranked_by`
    pub rows: Vec<FeatureImportance>,
}

impl ImportanceReport {
    pub fn header() -> &'static str {
        IMPORTANCE_HEADER
    }

    /// Header followed by one line per ranked slot
    pub fn format_table(&self) -> Vec<String> {
        std::iter::once(IMPORTANCE_HEADER.to_string())
            .chain(self.rows.iter().map(FeatureImportance::format_line))
            .collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.name == name)
    }
}

/// Shuffles one feature slot at a time and records how much every binary
/// metric moves.
pub struct PermutationImportance {
    permutation_count: usize,
    seed: u64,
}

impl PermutationImportance {
    pub fn new(permutation_count: usize, seed: u64) -> Self {
        Self {
            permutation_count: permutation_count.max(1),
            seed,
        }
    }

    /// Rank the slots of `x` by their effect on `ranked_by`.
    ///
    /// `feature_names` must follow the column order of `x`.
    pub fn compute(
        &self,
        predictor: &Predictor,
        x: &Array2<f64>,
        labels: &[bool],
        feature_names: &[String],
        calibrated: bool,
        ranked_by: Metric,
    ) -> Result<ImportanceReport> {
        let n_features = x.ncols();
        if feature_names.len() != n_features {
            return Err(CreditScoreError::SchemaMismatch {
                expected: format!("{} feature names", n_features),
                actual: format!("{} feature names", feature_names.len()),
            });
        }

        let score = |data: &Array2<f64>| -> Result<BTreeMap<Metric, f64>> {
            let predictions = predictions_from(predictor, data, calibrated)?;
            let report = evaluate_binary(&predictions, labels, calibrated)?;
            Ok(TABLE_METRICS
                .iter()
                .filter_map(|&m| report.get(m).map(|v| (m, v)))
                .collect())
        };

        let baseline = score(x)?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut raw: Vec<BTreeMap<Metric, Vec<f64>>> = vec![BTreeMap::new(); n_features];

        for _ in 0..self.permutation_count {
            for slot in 0..n_features {
                let mut permuted = x.clone();
                let mut column: Vec<f64> = x.column(slot).to_vec();
                column.shuffle(&mut rng);
                for (i, v) in column.into_iter().enumerate() {
                    permuted[[i, slot]] = v;
                }

                let scores = score(&permuted)?;
                for (metric, value) in scores {
                    let base = baseline.get(&metric).copied().unwrap_or(f64::NAN);
                    raw[slot].entry(metric).or_default().push(value - base);
                }
            }
        }

        let weights = predictor.feature_weights();
        let mut rows: Vec<FeatureImportance> = raw
            .into_iter()
            .enumerate()
            .map(|(slot, per_metric)| FeatureImportance {
                name: feature_names[slot].clone(),
                slot,
                weight: weights.as_ref().and_then(|w| w.get(slot).map(|v| v.abs())),
                deltas: per_metric
                    .into_iter()
                    .map(|(m, values)| (m, MetricStatistics::from_values(&values)))
                    .collect(),
            })
            .collect();

        let magnitude = |row: &FeatureImportance| -> f64 {
            row.delta(ranked_by)
                .map(|s| s.mean.abs())
                .filter(|v| v.is_finite())
                .unwrap_or(0.0)
        };
        rows.sort_by(|a, b| magnitude(b).total_cmp(&magnitude(a)));
        debug!(features = n_features, repeats = self.permutation_count, metric = %ranked_by, "computed permutation importance");

        Ok(ImportanceReport {
            ranked_by,
            permutation_count: self.permutation_count,
            rows,
        })
    }
}

/// Four significant digits, trailing zeros trimmed
pub fn format_g4(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let exponent = value.abs().log10().floor() as i32;
    if !(-5..4).contains(&exponent) {
        let formatted = format!("{:.3e}", value);
        return match formatted.split_once('e') {
            Some((mantissa, exp)) => format!("{}E{}", trim_zeros(mantissa), exp),
            None => formatted,
        };
    }

    let decimals = (3 - exponent).max(0) as usize;
    trim_zeros(&format!("{:.*}", decimals, value)).to_string()
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
