//! scorecast - artifact-based training and inference for student math scores
//!
//! This crate turns a table of student records into a persisted preprocessor
//! and model pair, and serves predictions that reapply exactly the fitted
//! transformation.
//!
//! # Modules
//!
//! ## Training path
//! - [`data`] - CSV ingestion, schema checks and the seeded train/test split
//! - [`preprocessing`] - Imputation, scaling and one-hot encoding behind one transformer
//! - [`training`] - Regression candidates and test-set model selection
//! - [`pipeline`] - Runs the stages in order and persists their artifacts
//!
//! ## Serving path
//! - [`inference`] - Loads the artifacts and scores prediction requests
//!
//! ## Infrastructure
//! - [`store`] - Versioned, checksummed artifact files
//! - [`error`] - Error taxonomy shared by every stage
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Persistence
pub mod store;

// Training path
pub mod data;
pub mod preprocessing;
pub mod training;
pub mod pipeline;

// Serving path
pub mod inference;

// Services
pub mod cli;

pub use error::{ErrorKind, PipelineError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{ErrorKind, PipelineError, Result};

    // Data
    pub use crate::data::{DatasetSplitter, FeatureSpec, SplitConfig};

    // Preprocessing
    pub use crate::preprocessing::{CompositeTransformer, FeatureTransformer, TransformConfig, UnknownCategoryPolicy};

    // Training
    pub use crate::training::{CandidateModel, ModelArtifact, ModelSelector, Regressor, SelectionConfig, Verdict};

    // Pipeline
    pub use crate::pipeline::{PipelineConfig, TrainingPipeline, TrainingReport};

    // Inference
    pub use crate::inference::{Confidence, InferenceService, Prediction, PredictionReport, PredictionRequest, Predictor};

    // Persistence
    pub use crate::store::{Artifact, ArtifactConfig, ArtifactStore};
}
