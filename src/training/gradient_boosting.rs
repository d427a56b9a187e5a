//! Gradient-boosted regression trees on logistic loss
//!
//! Each round fits a regression tree to the log-loss residuals and adds it,
//! shrunk by the learning rate, to the running log-odds. After boosting, a
//! Platt calibrator maps the log-odds to probabilities.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::calibration::{Calibrator, PlattScaling};
use super::decision_tree::DecisionTree;
use super::{check_fit_input, check_width, sigmoid, BinaryClassifier};
use crate::error::{CreditScoreError, Result};

/// Gradient Boosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Subsample ratio for each tree
    pub subsample: f64,
    /// Column subsample ratio
    pub colsample_bytree: f64,
    pub random_state: u64,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.2,
            max_depth: 5,
            min_samples_leaf: 2,
            subsample: 1.0,
            colsample_bytree: 1.0,
            random_state: 42,
        }
    }
}

/// Boosted trees plus Platt calibration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    config: GradientBoostingConfig,
    trees: Vec<DecisionTree>,
    col_indices_per_tree: Vec<Vec<usize>>,
    initial_log_odds: f64,
    calibrator: PlattScaling,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
}

impl GradientBoostingClassifier {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            col_indices_per_tree: Vec::new(),
            initial_log_odds: 0.0,
            calibrator: PlattScaling::new(),
            n_features: 0,
            feature_importances: None,
        }
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        &self.config
    }

    fn raw_scores(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let mut log_odds = Array1::from_elem(x.nrows(), self.initial_log_odds);
        for (tree, cols) in self.trees.iter().zip(&self.col_indices_per_tree) {
            let x_sub = x.select(Axis(1), cols);
            log_odds.scaled_add(self.config.learning_rate, &tree.predict(&x_sub)?);
        }
        Ok(log_odds)
    }

    fn sample_indices(n: usize, ratio: f64, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        let size = ((n as f64) * ratio).ceil().clamp(1.0, n as f64) as usize;
        if size == n {
            return (0..n).collect();
        }
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        indices.truncate(size);
        indices.sort_unstable();
        indices
    }
}

impl Default for GradientBoostingClassifier {
    fn default() -> Self {
        Self::new(GradientBoostingConfig::default())
    }
}

impl BinaryClassifier for GradientBoostingClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let n_samples = x.nrows();
        let n_features = x.ncols();

        let p = y.mean().unwrap_or(0.5).clamp(1e-6, 1.0 - 1e-6);
        self.initial_log_odds = (p / (1.0 - p)).ln();
        self.n_features = n_features;
        self.trees.clear();
        self.col_indices_per_tree.clear();

        let mut log_odds = Array1::from_elem(n_samples, self.initial_log_odds);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        let mut importances = Array1::zeros(n_features);

        for round in 0..self.config.n_estimators {
            let residuals: Array1<f64> = y
                .iter()
                .zip(log_odds.iter())
                .map(|(&yi, &lo)| yi - sigmoid(lo))
                .collect();

            let rows = Self::sample_indices(n_samples, self.config.subsample, &mut rng);
            let cols = Self::sample_indices(n_features, self.config.colsample_bytree, &mut rng);

            let x_sub = x.select(Axis(0), &rows).select(Axis(1), &cols);
            let r_sub = residuals.select(Axis(0), &rows);

            let mut tree = DecisionTree::new_regressor()
                .with_max_depth(self.config.max_depth)
                .with_min_samples_leaf(self.config.min_samples_leaf)
                .with_random_state(self.config.random_state.wrapping_add(round as u64));
            tree.fit(&x_sub, &r_sub)?;

            let update = tree.predict(&x.select(Axis(1), &cols))?;
            log_odds.scaled_add(self.config.learning_rate, &update);

            if let Some(tree_imp) = tree.feature_importances() {
                for (j, &col) in cols.iter().enumerate() {
                    importances[col] += tree_imp[j];
                }
            }

            self.trees.push(tree);
            self.col_indices_per_tree.push(cols);
        }

        let total: f64 = importances.sum();
        if total > 0.0 {
            importances /= total;
        }
        self.feature_importances = Some(importances);

        self.calibrator.fit(&log_odds, y)?;
        Ok(())
    }

    fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.feature_importances.is_none() {
            return Err(CreditScoreError::ModelNotFitted);
        }
        check_width(x, self.n_features)?;
        self.raw_scores(x)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Option<Array1<f64>>> {
        let scores = self.decision_function(x)?;
        Ok(Some(self.calibrator.calibrate(&scores)?))
    }

    fn feature_weights(&self) -> Option<Array1<f64>> {
        self.feature_importances.clone()
    }
}
