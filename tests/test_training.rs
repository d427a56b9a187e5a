//! Integration test: trainer runs end-to-end

mod common;

use credit_score_ml::config::{EvaluationMode, HarnessConfig};
use credit_score_ml::evaluation::Metric;
use credit_score_ml::reporting::Reporter;
use credit_score_ml::trainers::{run_batch, EvaluationOutcome, ProcessStage, TrainerKind, TrainerStrategy};
use credit_score_ml::CreditScoreError;

fn quiet_config() -> HarnessConfig {
    HarnessConfig::default().with_importance(false)
}

#[test]
fn test_fast_forest_ten_fold_cross_validation() {
    let data = common::random_balanced(20, 11);
    assert_eq!(data.label_counts(), (10, 10));
    let config = quiet_config().with_evaluation(EvaluationMode::CrossValidation { folds: 10 });
    let mut reporter = Reporter::capturing();

    let outcome = TrainerStrategy::new(TrainerKind::FastForest, &config)
        .process(&data, None, &mut reporter)
        .unwrap();

    match &outcome.evaluation {
        EvaluationOutcome::CrossValidation { folds, summary, .. } => {
            assert_eq!(folds.len(), 10);
            assert_eq!(summary.folds, 10);
            let accuracy = summary.get(Metric::Accuracy).unwrap();
            assert!((0.0..=1.0).contains(&accuracy.mean), "accuracy {}", accuracy.mean);
            assert!(accuracy.std_dev >= 0.0);
            assert!(summary.get(Metric::LogLoss).is_none());
        }
        other => panic!("expected cross-validation outcome, got {:?}", other),
    }
    assert!(reporter
        .lines()
        .iter()
        .any(|l| l.contains("Cross validation FastForest trainer")));
}

#[test]
fn test_every_trainer_runs_holdout() {
    let data = common::separable(40);
    let config = quiet_config().with_evaluation(EvaluationMode::Holdout { test_fraction: 0.25 });
    let mut reporter = Reporter::capturing();

    let outcomes = run_batch(&TrainerKind::ALL, &data, None, &config, &mut reporter).unwrap();
    assert_eq!(outcomes.len(), TrainerKind::ALL.len());

    for outcome in &outcomes {
        let report = outcome.evaluation.primary().unwrap();
        assert_eq!(report.is_calibrated(), outcome.kind.calibrated(), "{}", outcome.kind);
        let accuracy = report.binary().accuracy;
        assert!((0.0..=1.0).contains(&accuracy), "{}: {}", outcome.kind, accuracy);
        assert_eq!(outcome.stages.last(), Some(&ProcessStage::Idle));
        assert!(outcome.importance.is_none());
    }
}

#[test]
fn test_logistic_regression_learns_the_signal() {
    let data = common::separable(40);
    let config = quiet_config().with_evaluation(EvaluationMode::Holdout { test_fraction: 0.25 });
    let mut reporter = Reporter::capturing();

    let outcome = TrainerStrategy::new(TrainerKind::LbfgsLogisticRegression, &config)
        .process(&data, None, &mut reporter)
        .unwrap();

    let report = outcome.evaluation.primary().unwrap();
    assert!(report.binary().accuracy >= 0.7, "accuracy {}", report.binary().accuracy);
    assert!(report.get(Metric::LogLoss).is_some());
}

#[test]
fn test_same_seed_same_summary() {
    let data = common::separable(30);
    let config = quiet_config()
        .with_seed(7)
        .with_evaluation(EvaluationMode::CrossValidation { folds: 5 });

    let run = || {
        let mut reporter = Reporter::capturing();
        let outcome = TrainerStrategy::new(TrainerKind::FastTree, &config)
            .process(&data, None, &mut reporter)
            .unwrap();
        match outcome.evaluation {
            EvaluationOutcome::CrossValidation { summary, .. } => summary,
            other => panic!("expected cross-validation outcome, got {:?}", other),
        }
    };

    let first = run();
    let second = run();
    for metric in Metric::BINARY {
        let a = first.get(metric).map(|s| s.mean.to_bits());
        let b = second.get(metric).map(|s| s.mean.to_bits());
        assert_eq!(a, b, "{}", metric);
    }
}

#[test]
fn test_validation_mode_scores_second_file() {
    let data = common::separable(30);
    let validation = common::separable(10);
    let config = quiet_config().with_evaluation(EvaluationMode::Validation);
    let mut reporter = Reporter::capturing();

    let outcome = TrainerStrategy::new(TrainerKind::NaiveBayes, &config)
        .process(&data, Some(&validation), &mut reporter)
        .unwrap();
    let report = outcome.evaluation.primary().unwrap();
    assert_eq!(report.binary().confusion_matrix.total(), 10);
}

#[test]
fn test_unknown_trainer_name() {
    let result = "Gam".parse::<TrainerKind>();
    assert!(matches!(result, Err(CreditScoreError::UnknownTrainer(_))));
}

#[test]
fn test_every_trainer_survives_extreme_ratios() {
    let data = common::with_extreme_ratios(32);
    let config = HarnessConfig::default()
        .with_evaluation(EvaluationMode::Holdout { test_fraction: 0.25 })
        .with_permutation_count(2);
    let mut reporter = Reporter::capturing();

    let outcomes = run_batch(&TrainerKind::ALL, &data, None, &config, &mut reporter).unwrap();
    for outcome in &outcomes {
        let accuracy = outcome.evaluation.primary().unwrap().binary().accuracy;
        assert!((0.0..=1.0).contains(&accuracy), "{}: {}", outcome.kind, accuracy);
        assert!(outcome.importance.is_some(), "{}", outcome.kind);
    }
}

#[test]
fn test_random_data_cross_validation_for_every_trainer() {
    let data = common::random_balanced(40, 3);
    let config = quiet_config().with_evaluation(EvaluationMode::CrossValidation { folds: 5 });
    let mut reporter = Reporter::capturing();

    let outcomes = run_batch(&TrainerKind::ALL, &data, None, &config, &mut reporter).unwrap();
    for outcome in &outcomes {
        match &outcome.evaluation {
            EvaluationOutcome::CrossValidation { summary, .. } => {
                let accuracy = summary.get(Metric::Accuracy).unwrap();
                assert_eq!(accuracy.count, 5, "{}", outcome.kind);
                assert!((0.0..=1.0).contains(&accuracy.mean), "{}", outcome.kind);
            }
            other => panic!("expected cross-validation outcome, got {:?}", other),
        }
    }
}
