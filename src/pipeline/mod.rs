//! Feature pipeline
//!
//! A [`Pipeline`] is an ordered list of stages. Fitting it on a dataset binds
//! the training statistics and yields a [`FittedPipeline`], which is then a
//! pure function from observations to a feature matrix.

mod impute;
mod scaler;
mod text;

pub use impute::{is_missing, Imputer, MeanImputer};
pub use scaler::MinMaxScaler;
pub use text::{TextFeaturizer, TextTokenizer};

use crate::config::HarnessConfig;
use crate::data::{Dataset, Observation};
use crate::error::{CreditScoreError, Result};
use ndarray::{concatenate, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Name of the concatenated feature vector
pub const FEATURES: &str = "Features";

/// One transform step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// Mean-impute NaN in one numeric column
    ReplaceMissing { column: String },
    /// Word and char-trigram counts of a text column
    FeaturizeText { column: String },
    /// Join numeric columns and text slots into one vector
    Concatenate { output: String },
    /// Min-max scale every slot of a vector
    NormalizeMinMax { column: String },
    /// Terminal learner; fit by the trainer strategy, not the pipeline
    Train { trainer: String },
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::ReplaceMissing { column } => write!(f, "ReplaceMissing({}, mean)", column),
            Stage::FeaturizeText { column } => write!(f, "FeaturizeText({})", column),
            Stage::Concatenate { output } => write!(f, "Concatenate({})", output),
            Stage::NormalizeMinMax { column } => write!(f, "NormalizeMinMax({})", column),
            Stage::Train { trainer } => write!(f, "Train({})", trainer),
        }
    }
}

/// Unfitted stage list plus the column layout it runs over
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    numeric_columns: Vec<String>,
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Standard preprocessing: impute each ratio, featurize the code,
    /// concatenate, then normalize.
    pub fn base(config: &HarnessConfig) -> Self {
        let mut stages: Vec<Stage> = config
            .numeric_columns
            .iter()
            .map(|c| Stage::ReplaceMissing { column: c.clone() })
            .collect();
        stages.push(Stage::FeaturizeText {
            column: config.categorical_column.clone(),
        });
        stages.push(Stage::Concatenate {
            output: FEATURES.to_string(),
        });
        stages.push(Stage::NormalizeMinMax {
            column: FEATURES.to_string(),
        });

        Self {
            numeric_columns: config.numeric_columns.clone(),
            stages,
        }
    }

    /// New pipeline with `stage` at the end
    pub fn append(&self, stage: Stage) -> Self {
        let mut next = self.clone();
        next.stages.push(stage);
        next
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Bind training statistics for every stage
    pub fn fit(&self, data: &Dataset) -> Result<FittedPipeline> {
        if data.is_empty() {
            return Err(CreditScoreError::FitError(
                "cannot fit a pipeline on an empty dataset".to_string(),
            ));
        }

        let numeric = numeric_matrix(data.observations(), self.numeric_columns.len())?;

        let mut fitted = FittedPipeline {
            numeric_columns: self.numeric_columns.clone(),
            stages: self.stages.clone(),
            imputer: None,
            featurizer: None,
            scaler: None,
        };

        let impute_columns: Vec<usize> = self
            .stages
            .iter()
            .filter_map(|s| match s {
                Stage::ReplaceMissing { column } => {
                    self.numeric_columns.iter().position(|c| c == column)
                }
                _ => None,
            })
            .collect();

        let mut current = numeric;
        let mut text_block: Option<Array2<f64>> = None;

        for stage in &self.stages {
            match stage {
                Stage::ReplaceMissing { column } => {
                    if !self.numeric_columns.contains(column) {
                        return Err(CreditScoreError::SchemaMismatch {
                            expected: "a numeric column".to_string(),
                            actual: column.clone(),
                        });
                    }
                    if fitted.imputer.is_none() {
                        let mut imputer = MeanImputer::new(impute_columns.clone());
                        current = imputer.fit_transform(&current)?;
                        fitted.imputer = Some(imputer);
                    }
                }
                Stage::FeaturizeText { column } => {
                    let docs: Vec<&str> =
                        data.observations().iter().map(|o| o.cnae.as_str()).collect();
                    let mut featurizer = TextFeaturizer::new(column.clone());
                    featurizer.fit(&docs)?;
                    text_block = Some(featurizer.transform(&docs)?);
                    fitted.featurizer = Some(featurizer);
                }
                Stage::Concatenate { .. } => {
                    if let Some(block) = text_block.take() {
                        current = concatenate(Axis(1), &[current.view(), block.view()])?;
                    }
                }
                Stage::NormalizeMinMax { .. } => {
                    let mut scaler = MinMaxScaler::new();
                    scaler.fit(&current)?;
                    fitted.scaler = Some(scaler);
                }
                Stage::Train { .. } => {}
            }
            debug!(stage = %stage, "fitted pipeline stage");
        }

        Ok(fitted)
    }
}

/// Pipeline with training statistics bound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    numeric_columns: Vec<String>,
    stages: Vec<Stage>,
    imputer: Option<MeanImputer>,
    featurizer: Option<TextFeaturizer>,
    scaler: Option<MinMaxScaler>,
}

impl FittedPipeline {
    /// Map observations to the feature matrix the learner was fit on
    pub fn transform(&self, observations: &[Observation]) -> Result<Array2<f64>> {
        let mut x = numeric_matrix(observations, self.numeric_columns.len())?;

        if let Some(imputer) = &self.imputer {
            x = imputer.transform(&x)?;
        }
        if let Some(featurizer) = &self.featurizer {
            let docs: Vec<&str> = observations.iter().map(|o| o.cnae.as_str()).collect();
            let block = featurizer.transform(&docs)?;
            x = concatenate(Axis(1), &[x.view(), block.view()])?;
        }
        if let Some(scaler) = &self.scaler {
            x = scaler.transform(&x)?;
        }

        Ok(x)
    }

    /// Slot names in column order
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = self.numeric_columns.clone();
        if let Some(featurizer) = &self.featurizer {
            names.extend(featurizer.feature_names());
        }
        names
    }

    pub fn n_features(&self) -> usize {
        self.numeric_columns.len()
            + self.featurizer.as_ref().map_or(0, |f| f.n_features())
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}

fn numeric_matrix(observations: &[Observation], width: usize) -> Result<Array2<f64>> {
    let mut flat = Vec::with_capacity(observations.len() * width);
    for (i, obs) in observations.iter().enumerate() {
        if obs.ratios.len() != width {
            return Err(CreditScoreError::SchemaMismatch {
                expected: format!("{} ratios", width),
                actual: format!("{} ratios in row {}", obs.ratios.len(), i),
            });
        }
        flat.extend_from_slice(&obs.ratios);
    }
    Ok(Array2::from_shape_vec((observations.len(), width), flat)?)
}
