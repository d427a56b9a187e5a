//! Fitted pipeline plus learner, and the predictions it makes

use super::TrainerKind;
use crate::data::{Dataset, Observation};
use crate::error::{CreditScoreError, Result};
use crate::pipeline::{FittedPipeline, Pipeline};
use crate::training::{BinaryClassifier, Predictor};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One scored observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Raw learner score; positive leans bankrupt
    pub score: f64,
    /// Calibrated positive-class probability
    pub probability: Option<f64>,
    pub predicted_label: bool,
}

/// Score a transformed matrix.
///
/// Calibrated learners label by `probability >= 0.5`, the others by
/// `score > 0`.
pub fn predictions_from(predictor: &Predictor, x: &Array2<f64>, calibrated: bool) -> Result<Vec<Prediction>> {
    let scores = predictor.decision_function(x)?;

    if !calibrated {
        return Ok(scores
            .iter()
            .map(|&score| Prediction {
                score,
                probability: None,
                predicted_label: score > 0.0,
            })
            .collect());
    }

    let probabilities = predictor.predict_proba(x)?.ok_or_else(|| {
        CreditScoreError::FitError("calibrated learner produced no probabilities".to_string())
    })?;
    Ok(scores
        .iter()
        .zip(probabilities.iter())
        .map(|(&score, &p)| Prediction {
            score,
            probability: Some(p),
            predicted_label: p >= 0.5,
        })
        .collect())
}

/// A trainer kind with its fitted pipeline and learner. Stateless after
/// fitting: a pure function from observations to predictions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedModel {
    pub kind: TrainerKind,
    pub pipeline: FittedPipeline,
    pub predictor: Predictor,
}

impl FittedModel {
    /// Fit the pipeline and a fresh learner of `kind` on `data`
    pub fn train(kind: TrainerKind, pipeline: &Pipeline, data: &Dataset, seed: u64) -> Result<Self> {
        let fitted = pipeline.fit(data)?;
        let x = fitted.transform(data.observations())?;
        let y = data.labels();

        let mut predictor = kind.build_predictor(seed);
        predictor.fit(&x, &y)?;
        debug!(trainer = %kind, rows = x.nrows(), features = x.ncols(), "fitted learner");

        Ok(Self {
            kind,
            pipeline: fitted,
            predictor,
        })
    }

    pub fn calibrated(&self) -> bool {
        self.kind.calibrated()
    }

    pub fn transform(&self, observations: &[Observation]) -> Result<Array2<f64>> {
        self.pipeline.transform(observations)
    }

    pub fn predict(&self, observations: &[Observation]) -> Result<Vec<Prediction>> {
        let x = self.transform(observations)?;
        predictions_from(&self.predictor, &x, self.calibrated())
    }

    /// `[P(0), P(1)]` per row, for learners that model both classes
    pub fn class_probabilities(&self, observations: &[Observation]) -> Result<Option<Array2<f64>>> {
        let x = self.transform(observations)?;
        self.predictor.class_probabilities(&x)
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.pipeline.feature_names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use crate::data::Schema;

    fn toy(n: usize) -> Dataset {
        let rows = (0..n)
            .map(|i| {
                let label = i % 2 == 0;
                let base = if label { 0.8 } else { 0.2 };
                let ratios = (0..13).map(|j| base + (i * j % 7) as f64 * 0.01).collect();
                Observation::new(ratios, if label { "A" } else { "B" }, label)
            })
            .collect();
        Dataset::new(Schema::credit_scoring(), rows)
    }

    #[test]
    fn test_every_kind_fits_and_predicts() {
        let data = toy(24);
        let pipeline = Pipeline::base(&HarnessConfig::default());

        for kind in TrainerKind::ALL {
            let model = FittedModel::train(kind, &pipeline, &data, 1).unwrap();
            let preds = model.predict(data.observations()).unwrap();
            assert_eq!(preds.len(), 24, "{}", kind);
            assert_eq!(
                preds.iter().all(|p| p.probability.is_some()),
                kind.calibrated(),
                "{}",
                kind
            );
        }
    }

    #[test]
    fn test_labels_follow_threshold_rule() {
        let data = toy(20);
        let pipeline = Pipeline::base(&HarnessConfig::default());

        let model = FittedModel::train(TrainerKind::LinearSvm, &pipeline, &data, 1).unwrap();
        for p in model.predict(data.observations()).unwrap() {
            assert_eq!(p.predicted_label, p.score > 0.0);
        }

        let model = FittedModel::train(TrainerKind::SgdCalibrated, &pipeline, &data, 1).unwrap();
        for p in model.predict(data.observations()).unwrap() {
            assert_eq!(p.predicted_label, p.probability.unwrap() >= 0.5);
        }
    }

    #[test]
    fn test_naive_bayes_class_probabilities() {
        let data = toy(10);
        let pipeline = Pipeline::base(&HarnessConfig::default());
        let model = FittedModel::train(TrainerKind::NaiveBayes, &pipeline, &data, 1).unwrap();

        let probs = model.class_probabilities(data.observations()).unwrap().unwrap();
        assert_eq!(probs.dim(), (10, 2));
    }
}
