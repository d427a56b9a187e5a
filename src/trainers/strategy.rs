//! The single, generic trainer strategy

use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

use super::{FittedModel, Prediction, TrainerKind};
use crate::config::{EvaluationMode, HarnessConfig};
use crate::data::Dataset;
use crate::error::{CreditScoreError, Result};
use crate::evaluation::{
    evaluate_binary, summarize_folds, CrossValidationSummary, KFold, MetricsReport,
    MulticlassMetrics,
};
use crate::explainability::{ImportanceReport, PermutationImportance};
use crate::export::{model_path, save_model, ModelMetadata};
use crate::pipeline::{Pipeline, Stage};
use crate::reporting::Reporter;

/// Where a `process` call currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStage {
    Idle,
    Loaded,
    PipelineBuilt,
    Fit,
    Evaluated,
    Persisted,
    Reported,
}

impl fmt::Display for ProcessStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Metrics of one evaluation run
#[derive(Debug, Clone)]
pub enum EvaluationOutcome {
    /// Holdout split or separate validation set
    Single {
        report: MetricsReport,
        multiclass: Option<MulticlassMetrics>,
    },
    CrossValidation {
        folds: Vec<MetricsReport>,
        summary: CrossValidationSummary,
        /// Fold-averaged
        multiclass: Option<MulticlassMetrics>,
    },
}

impl EvaluationOutcome {
    /// The single report, or the first fold's
    pub fn primary(&self) -> Option<&MetricsReport> {
        match self {
            EvaluationOutcome::Single { report, .. } => Some(report),
            EvaluationOutcome::CrossValidation { folds, .. } => folds.first(),
        }
    }
}

/// Everything a `process` call produced
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub kind: TrainerKind,
    pub evaluation: EvaluationOutcome,
    pub importance: Option<ImportanceReport>,
    pub model_path: Option<PathBuf>,
    pub stages: Vec<ProcessStage>,
}

/// Fit, evaluate, optionally persist and rank features for one trainer kind
pub struct TrainerStrategy<'a> {
    kind: TrainerKind,
    config: &'a HarnessConfig,
    stages: Vec<ProcessStage>,
}

impl<'a> TrainerStrategy<'a> {
    pub fn new(kind: TrainerKind, config: &'a HarnessConfig) -> Self {
        Self {
            kind,
            config,
            stages: vec![ProcessStage::Idle],
        }
    }

    pub fn kind(&self) -> TrainerKind {
        self.kind
    }

    fn advance(&mut self, stage: ProcessStage) {
        debug!(trainer = %self.kind, stage = %stage, "trainer stage");
        self.stages.push(stage);
    }

    /// Base pipeline with this kind's learner as the terminal stage
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::base(self.config).append(Stage::Train {
            trainer: self.kind.name().to_string(),
        })
    }

    /// Run every stage; the first error aborts the rest
    pub fn process(
        mut self,
        data: &Dataset,
        validation: Option<&Dataset>,
        reporter: &mut Reporter,
    ) -> Result<ProcessOutcome> {
        if data.is_empty() {
            return Err(CreditScoreError::FitError(format!(
                "{}: training data is empty",
                self.kind
            )));
        }
        self.advance(ProcessStage::Loaded);

        let pipeline = self.pipeline();
        self.advance(ProcessStage::PipelineBuilt);

        info!(trainer = %self.kind, rows = data.len(), mode = ?self.config.evaluation, "processing trainer");
        let evaluation = match self.config.evaluation {
            EvaluationMode::Holdout { test_fraction } => {
                reporter.header(format!("Training the {} model", self.kind))?;
                let (train, test) = data.train_test_split(test_fraction, self.config.seed)?;
                let model = FittedModel::train(self.kind, &pipeline, &train, self.config.seed)?;
                self.advance(ProcessStage::Fit);
                reporter.header(format!("Evaluating {} model's accuracy with test data", self.kind))?;
                self.evaluate_single(&model, &test)?
            }
            EvaluationMode::Validation => {
                let validation = validation.ok_or_else(|| {
                    CreditScoreError::ConfigError(
                        "validation mode needs a validation dataset".to_string(),
                    )
                })?;
                reporter.header(format!("Training the {} model", self.kind))?;
                let model = FittedModel::train(self.kind, &pipeline, data, self.config.seed)?;
                self.advance(ProcessStage::Fit);
                reporter.header(format!("Evaluating {} model with validation data", self.kind))?;
                self.evaluate_single(&model, validation)?
            }
            EvaluationMode::CrossValidation { folds } => {
                reporter.header(format!("Cross validation {} trainer", self.kind))?;
                self.cross_validate(&pipeline, data, folds)?
            }
        };
        self.advance(ProcessStage::Evaluated);

        match &evaluation {
            EvaluationOutcome::Single { report, multiclass } => {
                reporter.report_metrics(self.kind, report)?;
                if let Some(m) = multiclass {
                    reporter.report_multiclass(self.kind, m)?;
                }
            }
            EvaluationOutcome::CrossValidation {
                summary, multiclass, ..
            } => {
                reporter.report_summary(self.kind, summary)?;
                if let Some(m) = multiclass {
                    reporter.report_multiclass(self.kind, m)?;
                }
            }
        }

        // Persistence and importance both use a model fit on all of `data`
        let mut full_model: Option<FittedModel> = None;

        let mut saved_path = None;
        if self.config.persist_models {
            let model = FittedModel::train(self.kind, &pipeline, data, self.config.seed)?;
            let path = model_path(&self.config.base_path, self.kind);
            let metadata = ModelMetadata::new(&model, data.len(), self.config.seed);
            save_model(&model, data.schema(), metadata, &path)?;
            reporter.line(format!("The model is saved to {}", path.display()))?;
            self.advance(ProcessStage::Persisted);
            saved_path = Some(path);
            full_model = Some(model);
        }

        let importance = if self.config.compute_importance {
            let model = match full_model {
                Some(model) => model,
                None => FittedModel::train(self.kind, &pipeline, data, self.config.seed)?,
            };
            let report = self.importance(&model, data)?;
            reporter.report_importance(self.kind, &report)?;
            Some(report)
        } else {
            None
        };

        self.advance(ProcessStage::Reported);
        self.advance(ProcessStage::Idle);

        Ok(ProcessOutcome {
            kind: self.kind,
            evaluation,
            importance,
            model_path: saved_path,
            stages: self.stages,
        })
    }

    fn evaluate_single(&self, model: &FittedModel, test: &Dataset) -> Result<EvaluationOutcome> {
        let (report, multiclass) = evaluate_partition(model, test)?;
        Ok(EvaluationOutcome::Single { report, multiclass })
    }

    fn cross_validate(&mut self, pipeline: &Pipeline, data: &Dataset, folds: usize) -> Result<EvaluationOutcome> {
        let splits = KFold::new(folds, self.config.seed).split(data.len())?;

        let mut reports = Vec::with_capacity(splits.len());
        let mut multiclass = Vec::new();
        for split in &splits {
            let train = data.subset(&split.train_indices);
            let test = data.subset(&split.test_indices);
            let model = FittedModel::train(self.kind, pipeline, &train, self.config.seed)?;
            if split.fold_idx == 0 {
                self.advance(ProcessStage::Fit);
            }

            let (report, fold_multiclass) = evaluate_partition(&model, &test)?;
            debug!(
                trainer = %self.kind,
                fold = split.fold_idx,
                accuracy = report.binary().accuracy,
                "fold evaluated"
            );
            reports.push(report);
            multiclass.extend(fold_multiclass);
        }

        let summary = summarize_folds(&reports)?;
        Ok(EvaluationOutcome::CrossValidation {
            folds: reports,
            summary,
            multiclass: MulticlassMetrics::average(&multiclass),
        })
    }

    /// Permutation importance against the data the model was fit on
    fn importance(&self, model: &FittedModel, data: &Dataset) -> Result<ImportanceReport> {
        let x = model.transform(data.observations())?;
        let labels = observed_labels(data);
        PermutationImportance::new(self.config.permutation_count, self.config.seed).compute(
            &model.predictor,
            &x,
            &labels,
            &model.feature_names(),
            self.kind.calibrated(),
            self.kind.importance_metric(),
        )
    }
}

fn observed_labels(data: &Dataset) -> Vec<bool> {
    data.observations().iter().map(|o| o.label).collect()
}

fn evaluate_partition(model: &FittedModel, test: &Dataset) -> Result<(MetricsReport, Option<MulticlassMetrics>)> {
    let labels = observed_labels(test);
    let predictions: Vec<Prediction> = model.predict(test.observations())?;
    let report = evaluate_binary(&predictions, &labels, model.calibrated())?;

    let multiclass = match model.class_probabilities(test.observations())? {
        Some(probs) => {
            let classes: Vec<usize> = labels.iter().map(|&l| usize::from(l)).collect();
            Some(MulticlassMetrics::evaluate(&probs, &classes)?)
        }
        None => None,
    };
    Ok((report, multiclass))
}

/// Process `kinds` in order. The first failing trainer aborts the batch.
pub fn run_batch(
    kinds: &[TrainerKind],
    data: &Dataset,
    validation: Option<&Dataset>,
    config: &HarnessConfig,
    reporter: &mut Reporter,
) -> Result<Vec<ProcessOutcome>> {
    config.validate()?;
    let mut outcomes = Vec::with_capacity(kinds.len());
    for &kind in kinds {
        let outcome = TrainerStrategy::new(kind, config).process(data, validation, reporter)?;
        outcomes.push(outcome);
    }
    info!(trainers = outcomes.len(), "batch complete");
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Observation, Schema};
    use crate::evaluation::Metric;
    use tempfile::tempdir;

    fn toy(n: usize) -> Dataset {
        let rows = (0..n)
            .map(|i| {
                let label = i % 2 == 0;
                let shift = if label { 0.5 } else { 0.0 };
                let ratios = (0..13)
                    .map(|j| shift + ((i * 31 + j * 17) % 10) as f64 / 20.0)
                    .collect();
                Observation::new(ratios, if i % 3 == 0 { "A" } else { "B" }, label)
            })
            .collect();
        Dataset::new(Schema::credit_scoring(), rows)
    }

    #[test]
    fn test_holdout_process() {
        let config = HarnessConfig::default()
            .with_evaluation(EvaluationMode::holdout())
            .with_importance(false);
        let mut reporter = Reporter::capturing();

        let outcome = TrainerStrategy::new(TrainerKind::SgdCalibrated, &config)
            .process(&toy(30), None, &mut reporter)
            .unwrap();

        let report = outcome.evaluation.primary().unwrap();
        assert!(report.is_calibrated());
        assert_eq!(report.binary().confusion_matrix.total(), 6);
        assert_eq!(
            outcome.stages,
            vec![
                ProcessStage::Idle,
                ProcessStage::Loaded,
                ProcessStage::PipelineBuilt,
                ProcessStage::Fit,
                ProcessStage::Evaluated,
                ProcessStage::Reported,
                ProcessStage::Idle,
            ]
        );
    }

    #[test]
    fn test_validation_mode_needs_dataset() {
        let config = HarnessConfig::default().with_evaluation(EvaluationMode::Validation);
        let mut reporter = Reporter::capturing();
        let result = TrainerStrategy::new(TrainerKind::Prior, &config).process(&toy(10), None, &mut reporter);
        assert!(matches!(result, Err(CreditScoreError::ConfigError(_))));
    }

    #[test]
    fn test_cross_validation_with_persistence_and_importance() {
        let dir = tempdir().unwrap();
        let config = HarnessConfig::default()
            .with_evaluation(EvaluationMode::CrossValidation { folds: 5 })
            .with_permutation_count(2)
            .with_persistence(true)
            .with_base_path(dir.path());
        let mut reporter = Reporter::capturing();

        let outcome = TrainerStrategy::new(TrainerKind::NaiveBayes, &config)
            .process(&toy(25), None, &mut reporter)
            .unwrap();

        match &outcome.evaluation {
            EvaluationOutcome::CrossValidation {
                folds,
                summary,
                multiclass,
            } => {
                assert_eq!(folds.len(), 5);
                assert!(!summary.calibrated);
                assert!(summary.get(Metric::Accuracy).is_some());
                assert!(multiclass.is_some());
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        let path = outcome.model_path.unwrap();
        assert!(path.ends_with("MLModels/NaiveBayesModel.zip"));
        assert!(path.exists());
        assert!(outcome.stages.contains(&ProcessStage::Persisted));

        let importance = outcome.importance.unwrap();
        assert_eq!(importance.ranked_by, Metric::Accuracy);
        assert!(reporter.lines().iter().any(|l| l.starts_with("Feature#Model Weight")));
    }

    #[test]
    fn test_batch_stops_at_first_error() {
        let config = HarnessConfig::default()
            .with_evaluation(EvaluationMode::CrossValidation { folds: 10 })
            .with_importance(false);
        let mut reporter = Reporter::capturing();

        // Fewer rows than folds: every trainer fails, the batch fails at the first
        let result = run_batch(
            &[TrainerKind::Prior, TrainerKind::FastTree],
            &toy(5),
            None,
            &config,
            &mut reporter,
        );
        assert!(result.is_err());
    }
}
