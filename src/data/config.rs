//! Split configuration

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the train/test split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of rows held out for evaluation
    pub test_ratio: f64,

    /// Seed for the row shuffle
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            seed: 42,
        }
    }
}

impl SplitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the held-out fraction
    pub fn with_test_ratio(mut self, ratio: f64) -> Self {
        self.test_ratio = ratio;
        self
    }

    /// Builder method to set the shuffle seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return Err(PipelineError::config(
                "config.split",
                format!("test_ratio must be in (0, 1), got {}", self.test_ratio),
            ));
        }
        Ok(())
    }
}
