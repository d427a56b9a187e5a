//! Credit Score ML - bankruptcy prediction harness
//!
//! Trains and compares a catalogue of binary classifiers on company
//! financial ratios plus an industry code, then reports how each one
//! generalizes and which features drive it.
//!
//! # Modules
//!
//! ## Data
//! - [`data`] - Schema, observations and CSV loading
//! - [`config`] - Harness configuration
//!
//! ## Modeling
//! - [`pipeline`] - Imputation, text featurization and scaling stages
//! - [`training`] - Learner implementations
//! - [`trainers`] - Trainer catalogue and the per-trainer run
//!
//! ## Results
//! - [`evaluation`] - Binary and multiclass metrics, k-fold splits
//! - [`explainability`] - Permutation feature importance
//! - [`export`] - Model artifacts
//! - [`reporting`] - Console and log report output
//!
//! ## Services
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod config;

// Data and modeling
pub mod data;
pub mod pipeline;
pub mod training;
pub mod trainers;

// Results
pub mod evaluation;
pub mod explainability;
pub mod export;
pub mod reporting;

// Services
pub mod cli;

pub use error::{CreditScoreError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{CreditScoreError, Result};

    // Configuration
    pub use crate::config::{EvaluationMode, HarnessConfig};

    // Data
    pub use crate::data::{Dataset, Delimiter, Observation, Schema};

    // Pipeline
    pub use crate::pipeline::{FittedPipeline, Pipeline, Stage};

    // Training
    pub use crate::training::{BinaryClassifier, Predictor};
    pub use crate::trainers::{run_batch, FittedModel, Prediction, ProcessOutcome, TrainerKind, TrainerStrategy};

    // Evaluation
    pub use crate::evaluation::{evaluate_binary, CrossValidationSummary, KFold, Metric, MetricsReport};

    // Explainability
    pub use crate::explainability::{ImportanceReport, PermutationImportance};

    // Export
    pub use crate::export::{load_model, save_model, score_file, ModelMetadata};

    // Reporting
    pub use crate::reporting::Reporter;
}
