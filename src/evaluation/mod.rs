//! Evaluation
//!
//! Provides:
//! - Binary metrics along a calibrated and a non-calibrated path
//! - Seeded k-fold partitioning and fold summaries
//! - Multiclass metrics for learners with class probabilities

pub mod cross_validation;
pub mod metrics;
pub mod multiclass;

pub use cross_validation::{summarize_folds, CVSplit, CrossValidationSummary, KFold, MetricSummary};
pub use metrics::{
    auc, average_precision, evaluate_binary, log_loss, prior_entropy, BinaryMetrics,
    CalibratedBinaryMetrics, ConfusionMatrix, Metric, MetricsReport,
};
pub use multiclass::MulticlassMetrics;
