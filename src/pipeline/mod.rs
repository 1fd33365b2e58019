//! End-to-end training pipeline
//!
//! Chains ingestion, feature transformation and model selection, writing
//! every intermediate artifact through the configured [`ArtifactConfig`].
//!
//! [`ArtifactConfig`]: crate::store::ArtifactConfig

mod config;
mod trainer;

pub use config::PipelineConfig;
pub use trainer::{TrainingPipeline, TrainingReport};
