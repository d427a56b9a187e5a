//! Model persistence
//!
//! Saves a fitted model with its input schema to a single binary artifact
//! and loads it back for scoring.

mod serializer;

pub use serializer::{
    load_artifact, load_model, model_path, save_model, score_file, ModelArtifact, ModelMetadata,
    ScoredSample, MODEL_DIR,
};
