//! Pipeline configuration

use crate::data::SplitConfig;
use crate::error::{ErrorKind, Result, ResultExt};
use crate::preprocessing::TransformConfig;
use crate::store::ArtifactConfig;
use crate::training::SelectionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything a training run needs, grouped by stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub artifacts: ArtifactConfig,
    pub split: SplitConfig,
    pub transform: TransformConfig,
    pub selection: SelectionConfig,
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON file; absent fields keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).wrap_err_with(ErrorKind::Config, "config.read", || {
            format!("cannot read {}", path.display())
        })?;
        let config: Self = serde_json::from_str(&text).wrap_err_with(ErrorKind::Config, "config.parse", || {
            format!("invalid configuration in {}", path.display())
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_artifacts(mut self, artifacts: ArtifactConfig) -> Self {
        self.artifacts = artifacts;
        self
    }

    pub fn with_split(mut self, split: SplitConfig) -> Self {
        self.split = split;
        self
    }

    pub fn with_transform(mut self, transform: TransformConfig) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_selection(mut self, selection: SelectionConfig) -> Self {
        self.selection = selection;
        self
    }

    /// Use one seed for the split and every randomized candidate
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.split.seed = seed;
        self.selection.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.artifacts.validate()?;
        self.split.validate()?;
        self.selection.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::UnknownCategoryPolicy;
    use tempfile::tempdir;

    #[test]
    fn test_json_overrides() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(
            &path,
            r#"{
                "artifacts": {"root": "out"},
                "split": {"test_ratio": 0.25},
                "transform": {"unknown_category": "ZeroVector"},
                "selection": {"acceptance_threshold": 0.5}
            }"#,
        )
        .unwrap();

        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.artifacts.root(), Path::new("out"));
        assert_eq!(config.artifacts.model_file, "model.bin");
        assert_eq!(config.split.test_ratio, 0.25);
        assert_eq!(config.split.seed, 42);
        assert_eq!(config.transform.unknown_category, UnknownCategoryPolicy::ZeroVector);
        assert_eq!(config.selection.acceptance_threshold, 0.5);
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"split": {"test_ratio": 1.5}}"#).unwrap();
        assert!(PipelineConfig::from_json_file(&path).unwrap_err().is(ErrorKind::Config));

        std::fs::write(&path, "not json").unwrap();
        assert!(PipelineConfig::from_json_file(&path).unwrap_err().is(ErrorKind::Config));

        let missing = dir.path().join("missing.json");
        assert!(PipelineConfig::from_json_file(&missing).is_err());
    }

    #[test]
    fn test_seed_applies_everywhere() {
        let config = PipelineConfig::new().with_seed(7);
        assert_eq!(config.split.seed, 7);
        assert_eq!(config.selection.seed, 7);
    }
}
