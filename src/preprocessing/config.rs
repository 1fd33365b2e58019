//! Preprocessing configuration

use serde::{Deserialize, Serialize};

/// What to do with a category that was not observed during fit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnknownCategoryPolicy {
    /// Fail with an unknown-category error naming the column and value
    #[default]
    Reject,
    /// Emit all-zero indicators for the column
    ZeroVector,
}

/// Configuration for the feature transformer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Handling of categories unseen during fit
    pub unknown_category: UnknownCategoryPolicy,
}

impl TransformConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the unseen-category policy
    pub fn with_unknown_category(mut self, policy: UnknownCategoryPolicy) -> Self {
        self.unknown_category = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TransformConfig::default();
        assert_eq!(config.unknown_category, UnknownCategoryPolicy::Reject);
    }

    #[test]
    fn test_policy_from_json() {
        let config: TransformConfig =
            serde_json::from_str(r#"{"unknown_category": "ZeroVector"}"#).unwrap();
        assert_eq!(config.unknown_category, UnknownCategoryPolicy::ZeroVector);

        let config: TransformConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.unknown_category, UnknownCategoryPolicy::Reject);
    }
}
