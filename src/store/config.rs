//! Artifact layout configuration

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the pipeline reads and writes its artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Directory holding every artifact
    pub root: PathBuf,
    /// Audit copy of the source dataset
    pub raw_file: String,
    pub train_file: String,
    pub test_file: String,
    /// Fitted feature transformer
    pub preprocessor_file: String,
    /// Selected model
    pub model_file: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("artifacts"),
            raw_file: "raw.csv".to_string(),
            train_file: "train.csv".to_string(),
            test_file: "test.csv".to_string(),
            preprocessor_file: "preprocessor.bin".to_string(),
            model_file: "model.bin".to_string(),
        }
    }
}

impl ArtifactConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the artifact directory
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw_path(&self) -> PathBuf {
        self.root.join(&self.raw_file)
    }

    pub fn train_path(&self) -> PathBuf {
        self.root.join(&self.train_file)
    }

    pub fn test_path(&self) -> PathBuf {
        self.root.join(&self.test_file)
    }

    pub fn preprocessor_path(&self) -> PathBuf {
        self.root.join(&self.preprocessor_file)
    }

    pub fn model_path(&self) -> PathBuf {
        self.root.join(&self.model_file)
    }

    pub fn validate(&self) -> Result<()> {
        let names = [
            &self.raw_file,
            &self.train_file,
            &self.test_file,
            &self.preprocessor_file,
            &self.model_file,
        ];
        if names.iter().any(|n| n.trim().is_empty()) {
            return Err(PipelineError::config(
                "config.artifacts",
                "artifact file names must not be empty",
            ));
        }

        let mut sorted: Vec<&String> = names.to_vec();
        sorted.sort();
        sorted.dedup();
        if sorted.len() != names.len() {
            return Err(PipelineError::config(
                "config.artifacts",
                "artifact file names must be distinct",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = ArtifactConfig::default();
        assert_eq!(config.model_path(), PathBuf::from("artifacts/model.bin"));
        assert_eq!(config.preprocessor_path(), PathBuf::from("artifacts/preprocessor.bin"));
        assert_eq!(config.raw_path(), PathBuf::from("artifacts/raw.csv"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut config = ArtifactConfig::new().with_root("/tmp/x");
        config.test_file = config.train_file.clone();
        assert!(config.validate().is_err());
    }
}
