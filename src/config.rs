//! Harness configuration

use crate::data::Schema;
use crate::error::{CreditScoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// How a trainer's model is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EvaluationMode {
    /// Single seeded train/test split
    Holdout { test_fraction: f64 },
    /// k-fold cross-validation, shuffled and seeded
    CrossValidation { folds: usize },
    /// Train on the full dataset and score a separate validation file
    Validation,
}

impl Default for EvaluationMode {
    fn default() -> Self {
        EvaluationMode::CrossValidation { folds: 10 }
    }
}

impl EvaluationMode {
    pub fn holdout() -> Self {
        EvaluationMode::Holdout { test_fraction: 0.2 }
    }
}

/// Configuration for an experiment run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Seed for splits, folds, permutations and learners
    pub seed: u64,

    /// Numeric ratio columns, in file order
    pub numeric_columns: Vec<String>,

    /// Industry code column, featurized as text
    pub categorical_column: String,

    /// Boolean outcome column
    pub label_column: String,

    pub evaluation: EvaluationMode,

    /// Repetitions per feature for permutation importance
    pub permutation_count: usize,

    pub compute_importance: bool,

    /// Re-fit on the full dataset and save under `{base}/MLModels`
    pub persist_models: bool,

    pub base_path: PathBuf,

    /// Report log; `{base}/Logs/Log.txt` when unset
    pub log_file: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            numeric_columns: (1..=13).map(|i| format!("V{}", i)).collect(),
            categorical_column: "CNAE".to_string(),
            label_column: "Label".to_string(),
            evaluation: EvaluationMode::default(),
            permutation_count: 30,
            compute_importance: true,
            persist_models: false,
            base_path: PathBuf::from("."),
            log_file: None,
        }
    }
}

impl HarnessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON config; missing keys take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: HarnessConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_evaluation(mut self, evaluation: EvaluationMode) -> Self {
        self.evaluation = evaluation;
        self
    }

    pub fn with_permutation_count(mut self, count: usize) -> Self {
        self.permutation_count = count;
        self
    }

    pub fn with_importance(mut self, enabled: bool) -> Self {
        self.compute_importance = enabled;
        self
    }

    pub fn with_persistence(mut self, enabled: bool) -> Self {
        self.persist_models = enabled;
        self
    }

    pub fn with_base_path(mut self, base: impl Into<PathBuf>) -> Self {
        self.base_path = base.into();
        self
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn with_columns(
        mut self,
        numeric: Vec<String>,
        categorical: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        self.numeric_columns = numeric;
        self.categorical_column = categorical.into();
        self.label_column = label.into();
        self
    }

    /// Reject settings no run could honour
    pub fn validate(&self) -> Result<()> {
        match self.evaluation {
            EvaluationMode::CrossValidation { folds } if folds < 2 => {
                return Err(CreditScoreError::InvalidParameter {
                    name: "folds".to_string(),
                    value: folds.to_string(),
                    reason: "need at least 2 folds".to_string(),
                });
            }
            EvaluationMode::Holdout { test_fraction }
                if !(test_fraction > 0.0 && test_fraction < 1.0) =>
            {
                return Err(CreditScoreError::InvalidParameter {
                    name: "test_fraction".to_string(),
                    value: test_fraction.to_string(),
                    reason: "must be in (0, 1)".to_string(),
                });
            }
            _ => {}
        }

        if self.permutation_count == 0 {
            return Err(CreditScoreError::InvalidParameter {
                name: "permutation_count".to_string(),
                value: "0".to_string(),
                reason: "need at least one permutation".to_string(),
            });
        }

        self.schema().map(|_| ())
    }

    /// Positional schema derived from the column settings
    pub fn schema(&self) -> Result<Schema> {
        Schema::new(
            &self.numeric_columns,
            &self.categorical_column,
            &self.label_column,
        )
    }

    pub fn log_file_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.base_path.join("Logs").join("Log.txt"))
    }

    pub fn model_dir(&self) -> PathBuf {
        self.base_path.join("MLModels")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.seed, 1);
        assert_eq!(config.numeric_columns.len(), 13);
        assert_eq!(config.permutation_count, 30);
        assert_eq!(
            config.evaluation,
            EvaluationMode::CrossValidation { folds: 10 }
        );
        assert!(config.validate().is_ok());
        assert_eq!(config.schema().unwrap(), Schema::credit_scoring());
    }

    #[test]
    fn test_builder_pattern() {
        let config = HarnessConfig::new()
            .with_seed(42)
            .with_evaluation(EvaluationMode::holdout())
            .with_base_path("/tmp/run")
            .with_persistence(true);

        assert_eq!(config.seed, 42);
        assert!(config.persist_models);
        assert_eq!(
            config.log_file_path(),
            PathBuf::from("/tmp/run/Logs/Log.txt")
        );
        assert_eq!(config.model_dir(), PathBuf::from("/tmp/run/MLModels"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let one_fold =
            HarnessConfig::new().with_evaluation(EvaluationMode::CrossValidation { folds: 1 });
        assert!(matches!(
            one_fold.validate(),
            Err(CreditScoreError::InvalidParameter { .. })
        ));

        let bad_split =
            HarnessConfig::new().with_evaluation(EvaluationMode::Holdout { test_fraction: 1.5 });
        assert!(bad_split.validate().is_err());

        let no_perms = HarnessConfig::new().with_permutation_count(0);
        assert!(no_perms.validate().is_err());
    }

    #[test]
    fn test_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"seed": 9, "evaluation": {"Holdout": {"test_fraction": 0.3}}}"#)
            .unwrap();

        let config = HarnessConfig::from_json_file(&path).unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.evaluation, EvaluationMode::Holdout { test_fraction: 0.3 });
        assert_eq!(config.label_column, "Label");
    }
}
