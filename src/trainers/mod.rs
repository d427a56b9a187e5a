//! Trainer strategies
//!
//! A [`TrainerKind`] names one learner together with its calibration
//! capability and the metric its importance ranking sorts by. One generic
//! [`TrainerStrategy`] runs any kind through fit, evaluation, persistence
//! and importance.

mod model;
mod strategy;

pub use model::{predictions_from, FittedModel, Prediction};
pub use strategy::{run_batch, EvaluationOutcome, ProcessOutcome, ProcessStage, TrainerStrategy};

use crate::error::{CreditScoreError, Result};
use crate::evaluation::Metric;
use crate::training::{
    AveragedPerceptron, GaussianNaiveBayes, GradientBoostingClassifier, GradientBoostingConfig,
    LbfgsLogisticRegression, LinearSvm, PegasosConfig, Predictor, PriorClassifier, RandomForest,
    SdcaClassifier, SdcaConfig, SdcaLoss, SgdClassifier, SgdConfig, SgdLoss,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every learner the harness can dispatch to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrainerKind {
    FastTree,
    FastForest,
    SgdCalibrated,
    SgdNonCalibrated,
    LinearSvm,
    AveragedPerceptron,
    LbfgsLogisticRegression,
    SdcaLogisticRegression,
    SdcaNonCalibrated,
    NaiveBayes,
    Prior,
}

impl TrainerKind {
    pub const ALL: [TrainerKind; 11] = [
        TrainerKind::FastTree,
        TrainerKind::FastForest,
        TrainerKind::SgdCalibrated,
        TrainerKind::SgdNonCalibrated,
        TrainerKind::LinearSvm,
        TrainerKind::AveragedPerceptron,
        TrainerKind::LbfgsLogisticRegression,
        TrainerKind::SdcaLogisticRegression,
        TrainerKind::SdcaNonCalibrated,
        TrainerKind::NaiveBayes,
        TrainerKind::Prior,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TrainerKind::FastTree => "FastTree",
            TrainerKind::FastForest => "FastForest",
            TrainerKind::SgdCalibrated => "SgdCalibrated",
            TrainerKind::SgdNonCalibrated => "SgdNonCalibrated",
            TrainerKind::LinearSvm => "LinearSvm",
            TrainerKind::AveragedPerceptron => "AveragedPerceptron",
            TrainerKind::LbfgsLogisticRegression => "LbfgsLogisticRegression",
            TrainerKind::SdcaLogisticRegression => "SdcaLogisticRegression",
            TrainerKind::SdcaNonCalibrated => "SdcaNonCalibrated",
            TrainerKind::NaiveBayes => "NaiveBayes",
            TrainerKind::Prior => "Prior",
        }
    }

    /// Whether the learner emits a probability. Selects the evaluation path.
    pub fn calibrated(&self) -> bool {
        matches!(
            self,
            TrainerKind::FastTree
                | TrainerKind::SgdCalibrated
                | TrainerKind::LbfgsLogisticRegression
                | TrainerKind::SdcaLogisticRegression
                | TrainerKind::Prior
        )
    }

    /// Metric the importance ranking is ordered by
    pub fn importance_metric(&self) -> Metric {
        match self {
            TrainerKind::FastTree | TrainerKind::SdcaLogisticRegression => Metric::Auc,
            _ => Metric::Accuracy,
        }
    }

    /// Unfitted learner with its default hyperparameters, seeded
    pub fn build_predictor(&self, seed: u64) -> Predictor {
        match self {
            TrainerKind::FastTree => Predictor::FastTree(GradientBoostingClassifier::new(
                GradientBoostingConfig {
                    random_state: seed,
                    ..GradientBoostingConfig::default()
                },
            )),
            TrainerKind::FastForest => {
                Predictor::FastForest(RandomForest::new(100).with_random_state(seed))
            }
            TrainerKind::SgdCalibrated => {
                Predictor::Sgd(SgdClassifier::new(SgdConfig::default().with_random_state(seed)))
            }
            TrainerKind::SgdNonCalibrated => Predictor::Sgd(SgdClassifier::new(
                SgdConfig::default()
                    .with_loss(SgdLoss::Hinge)
                    .with_random_state(seed),
            )),
            TrainerKind::LinearSvm => Predictor::LinearSvm(LinearSvm::new(PegasosConfig {
                random_state: seed,
                ..PegasosConfig::default()
            })),
            TrainerKind::AveragedPerceptron => {
                Predictor::AveragedPerceptron(AveragedPerceptron::new(10).with_random_state(seed))
            }
            TrainerKind::LbfgsLogisticRegression => {
                Predictor::Lbfgs(LbfgsLogisticRegression::default())
            }
            TrainerKind::SdcaLogisticRegression => {
                Predictor::Sdca(SdcaClassifier::new(SdcaConfig::default().with_random_state(seed)))
            }
            TrainerKind::SdcaNonCalibrated => Predictor::Sdca(SdcaClassifier::new(
                SdcaConfig::default()
                    .with_loss(SdcaLoss::Hinge)
                    .with_random_state(seed),
            )),
            TrainerKind::NaiveBayes => Predictor::NaiveBayes(GaussianNaiveBayes::new()),
            TrainerKind::Prior => Predictor::Prior(PriorClassifier::new()),
        }
    }
}

impl fmt::Display for TrainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TrainerKind {
    type Err = CreditScoreError;

    /// Exact, case-insensitive match on the trainer name
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        TrainerKind::ALL
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CreditScoreError::UnknownTrainer(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibration_table() {
        let table = [
            ("FastTree", true, Metric::Auc),
            ("FastForest", false, Metric::Accuracy),
            ("SgdCalibrated", true, Metric::Accuracy),
            ("SgdNonCalibrated", false, Metric::Accuracy),
            ("LinearSvm", false, Metric::Accuracy),
            ("AveragedPerceptron", false, Metric::Accuracy),
            ("LbfgsLogisticRegression", true, Metric::Accuracy),
            ("SdcaLogisticRegression", true, Metric::Auc),
            ("SdcaNonCalibrated", false, Metric::Accuracy),
            ("NaiveBayes", false, Metric::Accuracy),
            ("Prior", true, Metric::Accuracy),
        ];
        assert_eq!(table.len(), TrainerKind::ALL.len());

        for (kind, (name, calibrated, metric)) in TrainerKind::ALL.iter().zip(table.iter()) {
            assert_eq!(kind.name(), *name);
            assert_eq!(kind.calibrated(), *calibrated, "{}", name);
            assert_eq!(kind.importance_metric(), *metric, "{}", name);
        }
    }

    #[test]
    fn test_names_round_trip() {
        for kind in TrainerKind::ALL {
            assert_eq!(kind.to_string().parse::<TrainerKind>().unwrap(), kind);
        }
        assert_eq!("fasttree".parse::<TrainerKind>().unwrap(), TrainerKind::FastTree);
    }

    #[test]
    fn test_unknown_trainer_is_an_error() {
        let err = "GradientDescentMagic".parse::<TrainerKind>().unwrap_err();
        assert!(matches!(err, CreditScoreError::UnknownTrainer(name) if name == "GradientDescentMagic"));
    }

    #[test]
    fn test_prior_builds_prior_learner() {
        assert!(matches!(
            TrainerKind::Prior.build_predictor(1),
            Predictor::Prior(_)
        ));
    }
}
