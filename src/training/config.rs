//! Model selection configuration

use super::gradient_boosting::GradientBoostingConfig;
use super::knn::KnnConfig;
use super::random_forest::MaxFeatures;
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Candidate regressors known to the selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandidateModel {
    LinearRegression,
    Ridge,
    Lasso,
    KNeighbors,
    DecisionTree,
    RandomForest,
    GradientBoosting,
}

impl CandidateModel {
    /// Default roster, in tie-break order
    pub const ALL: [CandidateModel; 7] = [
        CandidateModel::LinearRegression,
        CandidateModel::Ridge,
        CandidateModel::Lasso,
        CandidateModel::KNeighbors,
        CandidateModel::DecisionTree,
        CandidateModel::RandomForest,
        CandidateModel::GradientBoosting,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CandidateModel::LinearRegression => "LinearRegression",
            CandidateModel::Ridge => "Ridge",
            CandidateModel::Lasso => "Lasso",
            CandidateModel::KNeighbors => "KNeighbors",
            CandidateModel::DecisionTree => "DecisionTree",
            CandidateModel::RandomForest => "RandomForest",
            CandidateModel::GradientBoosting => "GradientBoosting",
        }
    }

    /// Whether the candidate draws from the selection seed
    pub fn is_randomized(&self) -> bool {
        matches!(
            self,
            CandidateModel::DecisionTree | CandidateModel::RandomForest | CandidateModel::GradientBoosting
        )
    }
}

impl fmt::Display for CandidateModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Hyperparameters for every candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    pub ridge_alpha: f64,
    pub lasso_alpha: f64,
    pub lasso_max_iter: usize,
    pub knn: KnnConfig,
    pub tree_max_depth: Option<usize>,
    pub tree_min_samples_leaf: usize,
    pub forest_n_estimators: usize,
    pub forest_max_depth: Option<usize>,
    pub forest_max_features: MaxFeatures,
    /// The boosting seed is replaced by the selection seed
    pub boosting: GradientBoostingConfig,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            ridge_alpha: 1.0,
            lasso_alpha: 1.0,
            lasso_max_iter: 1000,
            knn: KnnConfig::default(),
            tree_max_depth: None,
            tree_min_samples_leaf: 1,
            forest_n_estimators: 100,
            forest_max_depth: None,
            forest_max_features: MaxFeatures::All,
            boosting: GradientBoostingConfig::default(),
        }
    }
}

impl ModelParams {
    fn validate(&self) -> Result<()> {
        const STEP: &str = "config.selection";
        let positive = |name: &str, v: f64| {
            if v > 0.0 && v.is_finite() {
                Ok(())
            } else {
                Err(PipelineError::config(STEP, format!("{} must be positive, got {}", name, v)))
            }
        };
        positive("ridge_alpha", self.ridge_alpha)?;
        positive("lasso_alpha", self.lasso_alpha)?;
        positive("boosting.learning_rate", self.boosting.learning_rate)?;

        if self.lasso_max_iter == 0
            || self.knn.n_neighbors == 0
            || self.forest_n_estimators == 0
            || self.boosting.n_estimators == 0
            || self.tree_min_samples_leaf == 0
        {
            return Err(PipelineError::config(
                STEP,
                "iteration counts, neighbor counts and leaf sizes must be positive",
            ));
        }
        if !(self.boosting.subsample > 0.0 && self.boosting.subsample <= 1.0) {
            return Err(PipelineError::config(STEP, "boosting.subsample must be in (0, 1]"));
        }
        if let MaxFeatures::Fraction(f) = self.forest_max_features {
            if !(f > 0.0 && f <= 1.0) {
                return Err(PipelineError::config(STEP, "forest_max_features fraction must be in (0, 1]"));
            }
        }
        Ok(())
    }
}

/// Configuration for choosing the best candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Candidates to fit, in tie-break order
    pub candidates: Vec<CandidateModel>,
    /// Best R² below this is reported as below threshold
    pub acceptance_threshold: f64,
    /// Seed for every randomized candidate
    pub seed: u64,
    /// Fit candidates on the rayon pool
    pub parallel: bool,
    pub params: ModelParams,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            candidates: CandidateModel::ALL.to_vec(),
            acceptance_threshold: 0.6,
            seed: 42,
            parallel: true,
            params: ModelParams::default(),
        }
    }
}

impl SelectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candidates(mut self, candidates: Vec<CandidateModel>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn with_acceptance_threshold(mut self, threshold: f64) -> Self {
        self.acceptance_threshold = threshold;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_params(mut self, params: ModelParams) -> Self {
        self.params = params;
        self
    }

    pub fn validate(&self) -> Result<()> {
        const STEP: &str = "config.selection";
        if self.candidates.is_empty() {
            return Err(PipelineError::config(STEP, "candidate roster is empty"));
        }
        let mut seen = HashSet::new();
        for candidate in &self.candidates {
            if !seen.insert(*candidate) {
                return Err(PipelineError::config(
                    STEP,
                    format!("candidate {} listed more than once", candidate),
                ));
            }
        }
        if !self.acceptance_threshold.is_finite() {
            return Err(PipelineError::config(STEP, "acceptance_threshold must be finite"));
        }
        self.params.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_default_roster_order() {
        let config = SelectionConfig::default();
        assert_eq!(config.candidates.first(), Some(&CandidateModel::LinearRegression));
        assert_eq!(config.candidates.last(), Some(&CandidateModel::GradientBoosting));
        assert_eq!(config.acceptance_threshold, 0.6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        let dup = SelectionConfig::new().with_candidates(vec![CandidateModel::Ridge, CandidateModel::Ridge]);
        assert!(dup.validate().unwrap_err().is(ErrorKind::Config));

        let empty = SelectionConfig::new().with_candidates(vec![]);
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_params() {
        let params = ModelParams {
            ridge_alpha: 0.0,
            ..Default::default()
        };
        assert!(SelectionConfig::new().with_params(params).validate().is_err());

        let params = ModelParams {
            forest_max_features: MaxFeatures::Fraction(1.5),
            ..Default::default()
        };
        assert!(SelectionConfig::new().with_params(params).validate().is_err());
    }

    #[test]
    fn test_partial_json() {
        let config: SelectionConfig =
            serde_json::from_str(r#"{"candidates": ["Ridge", "KNeighbors"], "params": {"ridge_alpha": 2.5}}"#)
                .unwrap();
        assert_eq!(config.candidates, vec![CandidateModel::Ridge, CandidateModel::KNeighbors]);
        assert_eq!(config.params.ridge_alpha, 2.5);
        assert_eq!(config.params.lasso_alpha, 1.0);
        assert_eq!(config.seed, 42);
    }
}
