//! Model explainability
//!
//! Permutation feature importance over the fitted feature vector, ranked
//! by the metric each trainer is judged on.

mod importance;

pub use importance::{
    format_g4, FeatureImportance, ImportanceReport, MetricStatistics, PermutationImportance,
    IMPORTANCE_HEADER,
};
