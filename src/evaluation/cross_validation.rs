//! K-fold partitioning and fold-level summaries

use super::metrics::{Metric, MetricsReport};
use crate::error::{CreditScoreError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Shuffled, seeded k-fold splitter. Not stratified.
#[derive(Debug, Clone)]
pub struct KFold {
    n_splits: usize,
    seed: u64,
}

impl KFold {
    pub fn new(n_splits: usize, seed: u64) -> Self {
        Self { n_splits, seed }
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Disjoint test folds whose union is `0..n_samples`. The first
    /// `n_samples % n_splits` folds take one extra row.
    pub fn split(&self, n_samples: usize) -> Result<Vec<CVSplit>> {
        if self.n_splits < 2 {
            return Err(CreditScoreError::InvalidParameter {
                name: "folds".to_string(),
                value: self.n_splits.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        if n_samples < self.n_splits {
            return Err(CreditScoreError::InvalidParameter {
                name: "folds".to_string(),
                value: self.n_splits.to_string(),
                reason: format!("dataset has only {} rows", n_samples),
            });
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        indices.shuffle(&mut rng);

        let base = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;

        let mut splits = Vec::with_capacity(self.n_splits);
        let mut current = 0;
        for fold_idx in 0..self.n_splits {
            let fold_size = if fold_idx < remainder { base + 1 } else { base };
            let test_indices = indices[current..current + fold_size].to_vec();
            let train_indices = indices[..current]
                .iter()
                .chain(indices[current + fold_size..].iter())
                .copied()
                .collect();

            splits.push(CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            });
            current += fold_size;
        }

        Ok(splits)
    }
}

/// Dispersion of one metric across folds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub mean: f64,
    /// Sample standard deviation (n - 1)
    pub std_dev: f64,
    /// `1.96 * std_dev / sqrt(n - 1)`
    pub ci95: f64,
    /// Finite values the summary was computed over
    pub count: usize,
}

impl MetricSummary {
    /// Summarize the finite entries of `values`. NaN if none are finite.
    pub fn from_values(values: &[f64]) -> Self {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let n = finite.len();
        if n == 0 {
            return Self {
                mean: f64::NAN,
                std_dev: 0.0,
                ci95: 0.0,
                count: 0,
            };
        }

        let mean = finite.iter().sum::<f64>() / n as f64;
        if n < 2 {
            return Self {
                mean,
                std_dev: 0.0,
                ci95: 0.0,
                count: n,
            };
        }

        let denom = (n - 1) as f64;
        let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / denom;
        let std_dev = variance.sqrt();
        Self {
            mean,
            std_dev,
            ci95: 1.96 * std_dev / denom.sqrt(),
            count: n,
        }
    }
}

/// Per-metric summaries over all folds of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationSummary {
    pub folds: usize,
    pub calibrated: bool,
    pub metrics: BTreeMap<Metric, MetricSummary>,
}

impl CrossValidationSummary {
    pub fn get(&self, metric: Metric) -> Option<&MetricSummary> {
        self.metrics.get(&metric)
    }
}

/// Mean, sample std and 95% half-width of every scalar metric the fold
/// reports share
pub fn summarize_folds(reports: &[MetricsReport]) -> Result<CrossValidationSummary> {
    if reports.is_empty() {
        return Err(CreditScoreError::InvalidParameter {
            name: "reports".to_string(),
            value: "0".to_string(),
            reason: "need at least one fold".to_string(),
        });
    }

    let calibrated = reports.iter().all(MetricsReport::is_calibrated);
    let mut metrics = BTreeMap::new();
    for metric in Metric::BINARY.iter().chain(Metric::CALIBRATED.iter()) {
        let values: Vec<f64> = reports.iter().filter_map(|r| r.get(*metric)).collect();
        if values.len() == reports.len() {
            metrics.insert(*metric, MetricSummary::from_values(&values));
        }
    }

    Ok(CrossValidationSummary {
        folds: reports.len(),
        calibrated,
        metrics,
    })
}
