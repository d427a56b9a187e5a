//! Model artifact persistence
//!
//! An artifact is one bincode blob: magic bytes, a format version, metadata,
//! the input schema and the serialized [`FittedModel`].

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::data::{read_sample, Delimiter, Observation, Schema};
use crate::error::{CreditScoreError, Result};
use crate::trainers::{FittedModel, Prediction, TrainerKind};

/// Directory under the base path that holds artifacts
pub const MODEL_DIR: &str = "MLModels";

/// Descriptive fields stored next to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub trainer: TrainerKind,
    /// RFC 3339 timestamp
    pub trained_at: String,
    pub feature_names: Vec<String>,
    pub n_rows: usize,
    pub seed: u64,
}

impl ModelMetadata {
    pub fn new(model: &FittedModel, n_rows: usize, seed: u64) -> Self {
        Self {
            trainer: model.kind,
            trained_at: chrono::Utc::now().to_rfc3339(),
            feature_names: model.feature_names(),
            n_rows,
            seed,
        }
    }
}

/// On-disk artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub magic: [u8; 4],
    pub format_version: u32,
    pub metadata: ModelMetadata,
    pub schema: Schema,
    /// bincode-encoded [`FittedModel`]
    pub model_data: Vec<u8>,
    pub checksum: u64,
}

impl ModelArtifact {
    pub const MAGIC: [u8; 4] = *b"CSML";
    pub const VERSION: u32 = 1;

    pub fn new(model: &FittedModel, schema: &Schema, metadata: ModelMetadata) -> Result<Self> {
        let model_data = bincode::serialize(model)?;
        let checksum = Self::compute_checksum(&model_data);
        Ok(Self {
            magic: Self::MAGIC,
            format_version: Self::VERSION,
            metadata,
            schema: schema.clone(),
            model_data,
            checksum,
        })
    }

    /// FNV-1a over the model bytes
    fn compute_checksum(data: &[u8]) -> u64 {
        const FNV_OFFSET: u64 = 14695981039346656037;
        const FNV_PRIME: u64 = 1099511628211;

        data.iter().fold(FNV_OFFSET, |hash, &byte| {
            (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
        })
    }

    pub fn verify_checksum(&self) -> bool {
        Self::compute_checksum(&self.model_data) == self.checksum
    }

    /// Check the header fields and decode the model
    pub fn into_model(self) -> Result<(FittedModel, Schema, ModelMetadata)> {
        if self.magic != Self::MAGIC {
            return Err(CreditScoreError::SerializationError(
                "not a model artifact (bad magic bytes)".to_string(),
            ));
        }
        if self.format_version != Self::VERSION {
            return Err(CreditScoreError::SerializationError(format!(
                "unsupported artifact version {} (expected {})",
                self.format_version,
                Self::VERSION
            )));
        }
        if !self.verify_checksum() {
            return Err(CreditScoreError::SerializationError(
                "checksum verification failed".to_string(),
            ));
        }

        let model: FittedModel = bincode::deserialize(&self.model_data)?;
        Ok((model, self.schema, self.metadata))
    }
}

/// `{base}/MLModels/{TrainerName}Model.zip`
pub fn model_path(base: impl AsRef<Path>, kind: TrainerKind) -> PathBuf {
    base.as_ref()
        .join(MODEL_DIR)
        .join(format!("{}Model.zip", kind.name()))
}

/// Write `model` and its input schema to `path`, replacing any existing
/// file. Parent directories are created.
pub fn save_model(model: &FittedModel, schema: &Schema, metadata: ModelMetadata, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let artifact = ModelArtifact::new(model, schema, metadata)?;
    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut writer, &artifact)?;
    writer.flush()?;

    info!(trainer = %model.kind, path = %path.display(), "saved model");
    Ok(())
}

/// Read an artifact back into a model and the schema it was trained with
pub fn load_model(path: impl AsRef<Path>) -> Result<(FittedModel, Schema)> {
    let (model, schema, _) = load_artifact(path)?;
    Ok((model, schema))
}

/// Like [`load_model`], keeping the metadata
pub fn load_artifact(path: impl AsRef<Path>) -> Result<(FittedModel, Schema, ModelMetadata)> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let artifact: ModelArtifact = bincode::deserialize_from(reader)?;
    artifact.into_model()
}

/// Observations of a sample file with the predictions a saved model makes
#[derive(Debug, Clone)]
pub struct ScoredSample {
    pub trainer: TrainerKind,
    pub rows: Vec<(Observation, Prediction)>,
}

/// Load a saved model and score up to `limit` rows (0 = all) of a CSV read
/// with the model's own schema
pub fn score_file(
    model_path: impl AsRef<Path>,
    data_path: impl AsRef<Path>,
    delimiter: Delimiter,
    limit: usize,
) -> Result<ScoredSample> {
    let (model, schema) = load_model(model_path)?;
    let observations = read_sample(data_path, delimiter, &schema, limit)?;
    let predictions = model.predict(&observations)?;

    Ok(ScoredSample {
        trainer: model.kind,
        rows: observations.into_iter().zip(predictions).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use crate::data::Dataset;
    use crate::pipeline::Pipeline;
    use tempfile::tempdir;

    fn toy() -> Dataset {
        let rows = (0..12)
            .map(|i| {
                let label = i % 3 == 0;
                let ratios = (0..13).map(|j| (i * 13 + j) as f64 / 100.0).collect();
                Observation::new(ratios, if label { "A" } else { "B" }, label)
            })
            .collect();
        Dataset::new(Schema::credit_scoring(), rows)
    }

    fn fitted(kind: TrainerKind) -> (FittedModel, Dataset) {
        let data = toy();
        let pipeline = Pipeline::base(&HarnessConfig::default());
        (FittedModel::train(kind, &pipeline, &data, 1).unwrap(), data)
    }

    #[test]
    fn test_model_path() {
        let path = model_path("/tmp/base", TrainerKind::FastTree);
        assert_eq!(path, PathBuf::from("/tmp/base/MLModels/FastTreeModel.zip"));
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let (model, data) = fitted(TrainerKind::Prior);
        let metadata = ModelMetadata::new(&model, data.len(), 1);
        let mut artifact = ModelArtifact::new(&model, data.schema(), metadata).unwrap();
        assert!(artifact.verify_checksum());

        artifact.model_data[0] ^= 0xFF;
        assert!(artifact.into_model().is_err());
    }

    #[test]
    fn test_bad_magic() {
        let (model, data) = fitted(TrainerKind::Prior);
        let metadata = ModelMetadata::new(&model, data.len(), 1);
        let mut artifact = ModelArtifact::new(&model, data.schema(), metadata).unwrap();
        artifact.magic = *b"ZIP!";
        assert!(matches!(
            artifact.into_model(),
            Err(CreditScoreError::SerializationError(_))
        ));
    }

    #[test]
    fn test_save_creates_directories_and_overwrites() {
        let dir = tempdir().unwrap();
        let path = model_path(dir.path(), TrainerKind::AveragedPerceptron);
        let (model, data) = fitted(TrainerKind::AveragedPerceptron);

        for _ in 0..2 {
            let metadata = ModelMetadata::new(&model, data.len(), 1);
            save_model(&model, data.schema(), metadata, &path).unwrap();
        }
        let (_, _, metadata) = load_artifact(&path).unwrap();
        assert_eq!(metadata.trainer, TrainerKind::AveragedPerceptron);
        assert_eq!(metadata.n_rows, 12);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let result = load_model(dir.path().join("nope.zip"));
        assert!(matches!(result, Err(CreditScoreError::IoError(_))));
    }
}
