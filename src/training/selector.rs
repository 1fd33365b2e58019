//! Candidate fitting, scoring and selection

use super::config::{CandidateModel, ModelParams, SelectionConfig};
use super::decision_tree::DecisionTreeRegressor;
use super::gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
use super::knn::KNeighborsRegressor;
use super::linear_models::{LassoRegression, LinearRegression, RidgeRegression};
use super::models::{RegressionMetrics, Regressor};
use super::random_forest::RandomForestRegressor;
use crate::error::{PipelineError, Result};
use crate::store::Artifact;
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A fitted candidate, tagged by model family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedRegressor {
    LinearRegression(LinearRegression),
    Ridge(RidgeRegression),
    Lasso(LassoRegression),
    KNeighbors(KNeighborsRegressor),
    DecisionTree(DecisionTreeRegressor),
    RandomForest(RandomForestRegressor),
    GradientBoosting(GradientBoostingRegressor),
}

impl TrainedRegressor {
    /// Unfitted model for a candidate, seeded from `seed` when randomized
    pub fn build(candidate: CandidateModel, params: &ModelParams, seed: u64) -> Self {
        match candidate {
            CandidateModel::LinearRegression => Self::LinearRegression(LinearRegression::new()),
            CandidateModel::Ridge => Self::Ridge(RidgeRegression::new(params.ridge_alpha)),
            CandidateModel::Lasso => {
                Self::Lasso(LassoRegression::new(params.lasso_alpha).with_max_iter(params.lasso_max_iter))
            }
            CandidateModel::KNeighbors => Self::KNeighbors(KNeighborsRegressor::new(params.knn.clone())),
            CandidateModel::DecisionTree => Self::DecisionTree(
                DecisionTreeRegressor::new()
                    .with_max_depth(params.tree_max_depth)
                    .with_min_samples_leaf(params.tree_min_samples_leaf)
                    .with_random_state(seed),
            ),
            CandidateModel::RandomForest => Self::RandomForest(
                RandomForestRegressor::new()
                    .with_n_estimators(params.forest_n_estimators)
                    .with_max_depth(params.forest_max_depth)
                    .with_max_features(params.forest_max_features)
                    .with_random_state(seed),
            ),
            CandidateModel::GradientBoosting => Self::GradientBoosting(GradientBoostingRegressor::new(
                GradientBoostingConfig {
                    random_state: seed,
                    ..params.boosting.clone()
                },
            )),
        }
    }

    pub fn candidate(&self) -> CandidateModel {
        match self {
            Self::LinearRegression(_) => CandidateModel::LinearRegression,
            Self::Ridge(_) => CandidateModel::Ridge,
            Self::Lasso(_) => CandidateModel::Lasso,
            Self::KNeighbors(_) => CandidateModel::KNeighbors,
            Self::DecisionTree(_) => CandidateModel::DecisionTree,
            Self::RandomForest(_) => CandidateModel::RandomForest,
            Self::GradientBoosting(_) => CandidateModel::GradientBoosting,
        }
    }

    fn as_regressor(&self) -> &dyn Regressor {
        match self {
            Self::LinearRegression(m) => m,
            Self::Ridge(m) => m,
            Self::Lasso(m) => m,
            Self::KNeighbors(m) => m,
            Self::DecisionTree(m) => m,
            Self::RandomForest(m) => m,
            Self::GradientBoosting(m) => m,
        }
    }

    fn as_regressor_mut(&mut self) -> &mut dyn Regressor {
        match self {
            Self::LinearRegression(m) => m,
            Self::Ridge(m) => m,
            Self::Lasso(m) => m,
            Self::KNeighbors(m) => m,
            Self::DecisionTree(m) => m,
            Self::RandomForest(m) => m,
            Self::GradientBoosting(m) => m,
        }
    }
}

impl Regressor for TrainedRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.as_regressor_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.as_regressor().predict(x)
    }

    fn is_fitted(&self) -> bool {
        self.as_regressor().is_fitted()
    }

    fn n_features(&self) -> usize {
        self.as_regressor().n_features()
    }
}

/// One row of the selection leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub candidate: CandidateModel,
    /// Test-set metrics, absent when the candidate failed
    pub metrics: Option<RegressionMetrics>,
    /// Failure cause
    pub error: Option<String>,
    pub fit_seconds: f64,
}

impl LeaderboardEntry {
    pub fn succeeded(&self) -> bool {
        self.metrics.is_some()
    }

    /// Test R², when the candidate succeeded
    pub fn score(&self) -> Option<f64> {
        self.metrics.map(|m| m.r2)
    }
}

/// Whether the selected model met the acceptance threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Accepted,
    BelowThreshold,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Accepted => f.write_str("accepted"),
            Verdict::BelowThreshold => f.write_str("below_threshold"),
        }
    }
}

/// Result of a selection run
#[derive(Debug, Clone)]
pub struct SelectionOutcome {
    pub model: TrainedRegressor,
    pub candidate: CandidateModel,
    /// Test R² of the selected model
    pub score: f64,
    pub metrics: RegressionMetrics,
    pub verdict: Verdict,
    /// Every candidate in roster order
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Fits a roster of regressors and keeps the best by test R²
#[derive(Debug, Clone, Default)]
pub struct ModelSelector {
    config: SelectionConfig,
}

impl ModelSelector {
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Fit every candidate on the training matrix and score it on the test matrix.
    ///
    /// Candidates run on the rayon pool when `parallel` is set; results are
    /// compared in roster order and the first-listed candidate wins a tie.
    pub fn select(
        &self,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_test: &Array2<f64>,
        y_test: &Array1<f64>,
    ) -> Result<SelectionOutcome> {
        self.config.validate()?;
        if x_train.ncols() != x_test.ncols() {
            return Err(PipelineError::schema_mismatch(
                "training.select",
                format!("train has {} features, test has {}", x_train.ncols(), x_test.ncols()),
            ));
        }
        if x_test.nrows() != y_test.len() || x_test.nrows() == 0 {
            return Err(PipelineError::training(
                "training.select",
                format!("test set has {} rows and {} targets", x_test.nrows(), y_test.len()),
            ));
        }

        let run = |candidate: &CandidateModel| self.evaluate(*candidate, x_train, y_train, x_test, y_test);
        let results: Vec<(LeaderboardEntry, Option<TrainedRegressor>)> = if self.config.parallel {
            self.config.candidates.par_iter().map(run).collect()
        } else {
            self.config.candidates.iter().map(run).collect()
        };

        let mut leaderboard = Vec::with_capacity(results.len());
        let mut best: Option<(TrainedRegressor, RegressionMetrics)> = None;
        for (entry, model) in results {
            if let (Some(metrics), Some(model)) = (entry.metrics, model) {
                if best.as_ref().map_or(true, |(_, m)| metrics.r2 > m.r2) {
                    best = Some((model, metrics));
                }
            }
            leaderboard.push(entry);
        }

        let (model, metrics) = match best {
            Some(best) => best,
            None => {
                let causes: Vec<String> = leaderboard
                    .iter()
                    .map(|e| format!("{}: {}", e.candidate, e.error.as_deref().unwrap_or("unknown")))
                    .collect();
                return Err(PipelineError::training(
                    "training.select",
                    format!("every candidate failed ({})", causes.join("; ")),
                ));
            }
        };

        let candidate = model.candidate();
        let verdict = if metrics.r2 >= self.config.acceptance_threshold {
            info!(candidate = %candidate, r2 = metrics.r2, "Selected model");
            Verdict::Accepted
        } else {
            warn!(
                candidate = %candidate,
                r2 = metrics.r2,
                threshold = self.config.acceptance_threshold,
                "Best model is below the acceptance threshold"
            );
            Verdict::BelowThreshold
        };

        Ok(SelectionOutcome {
            model,
            candidate,
            score: metrics.r2,
            metrics,
            verdict,
            leaderboard,
        })
    }

    fn evaluate(
        &self,
        candidate: CandidateModel,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_test: &Array2<f64>,
        y_test: &Array1<f64>,
    ) -> (LeaderboardEntry, Option<TrainedRegressor>) {
        let start = Instant::now();
        let mut model = TrainedRegressor::build(candidate, &self.config.params, self.config.seed);

        let scored = model
            .fit(x_train, y_train)
            .and_then(|_| model.predict(x_test))
            .and_then(|pred| {
                let metrics = RegressionMetrics::compute(y_test, &pred);
                if metrics.is_finite() {
                    Ok(metrics)
                } else {
                    Err(PipelineError::training("training.score", "score is not finite"))
                }
            });
        let fit_seconds = start.elapsed().as_secs_f64();

        match scored {
            Ok(metrics) => {
                debug!(candidate = %candidate, r2 = metrics.r2, rmse = metrics.rmse, fit_seconds, "Candidate scored");
                (
                    LeaderboardEntry {
                        candidate,
                        metrics: Some(metrics),
                        error: None,
                        fit_seconds,
                    },
                    Some(model),
                )
            }
            Err(e) => {
                warn!(candidate = %candidate, error = %e, "Candidate failed");
                (
                    LeaderboardEntry {
                        candidate,
                        metrics: None,
                        error: Some(e.to_string()),
                        fit_seconds,
                    },
                    None,
                )
            }
        }
    }
}

/// The persisted winner of a selection run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model: TrainedRegressor,
    pub candidate: CandidateModel,
    /// Name of the selection metric
    pub metric: String,
    pub score: f64,
    pub verdict: Verdict,
    /// Width of the feature matrix the model was fit on
    pub n_features: usize,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub trained_at: DateTime<Utc>,
}

impl ModelArtifact {
    pub fn from_outcome(outcome: SelectionOutcome) -> Self {
        let n_features = outcome.model.n_features();
        Self {
            model: outcome.model,
            candidate: outcome.candidate,
            metric: "r2".to_string(),
            score: outcome.score,
            verdict: outcome.verdict,
            n_features,
            leaderboard: outcome.leaderboard,
            trained_at: Utc::now(),
        }
    }
}

impl Artifact for ModelArtifact {
    const KIND: &'static str = "model";
    const SCHEMA_VERSION: u32 = 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use ndarray::array;

    fn linear_data() -> (Array2<f64>, Array1<f64>, Array2<f64>, Array1<f64>) {
        let x_train = Array2::from_shape_fn((30, 2), |(i, j)| ((i * (j + 2)) % 7) as f64 + i as f64 * 0.1);
        let y_train = x_train.column(0).mapv(|v| 3.0 * v) + &x_train.column(1) + 2.0;
        let x_test = array![[1.5, 2.0], [4.0, 0.5], [2.2, 3.3]];
        let y_test = x_test.column(0).mapv(|v| 3.0 * v) + &x_test.column(1) + 2.0;
        (x_train, y_train, x_test, y_test)
    }

    #[test]
    fn test_selects_best_candidate() {
        let (x_train, y_train, x_test, y_test) = linear_data();
        let selector = ModelSelector::new(SelectionConfig::default());

        let outcome = selector.select(&x_train, &y_train, &x_test, &y_test).unwrap();

        assert_eq!(outcome.candidate, CandidateModel::LinearRegression);
        assert!(outcome.score > 0.999);
        assert_eq!(outcome.verdict, Verdict::Accepted);
        assert_eq!(outcome.leaderboard.len(), CandidateModel::ALL.len());
        let order: Vec<CandidateModel> = outcome.leaderboard.iter().map(|e| e.candidate).collect();
        assert_eq!(order, CandidateModel::ALL.to_vec());
    }

    #[test]
    fn test_ties_go_to_first_listed() {
        let x_train = array![[0.0], [1.0], [2.0], [3.0]];
        let y_train = array![0.0, 1.0, 4.0, 9.0];
        let x_test = array![[1.0], [3.0]];
        let y_test = array![1.0, 9.0];

        let mut params = ModelParams::default();
        params.knn.n_neighbors = 1;
        let pick = |roster: Vec<CandidateModel>| {
            let config = SelectionConfig::new()
                .with_candidates(roster)
                .with_params(params.clone());
            ModelSelector::new(config)
                .select(&x_train, &y_train, &x_test, &y_test)
                .unwrap()
                .candidate
        };

        assert_eq!(
            pick(vec![CandidateModel::DecisionTree, CandidateModel::KNeighbors]),
            CandidateModel::DecisionTree
        );
        assert_eq!(
            pick(vec![CandidateModel::KNeighbors, CandidateModel::DecisionTree]),
            CandidateModel::KNeighbors
        );
    }

    #[test]
    fn test_below_threshold_is_not_an_error() {
        let (x_train, y_train, x_test, y_test) = linear_data();
        let config = SelectionConfig::new()
            .with_candidates(vec![CandidateModel::Ridge])
            .with_acceptance_threshold(1.5);

        let outcome = ModelSelector::new(config)
            .select(&x_train, &y_train, &x_test, &y_test)
            .unwrap();
        assert_eq!(outcome.verdict, Verdict::BelowThreshold);
    }

    #[test]
    fn test_all_candidates_failing() {
        let x_train = array![[f64::NAN], [1.0]];
        let y_train = array![1.0, 2.0];
        let config = SelectionConfig::new().with_candidates(vec![CandidateModel::LinearRegression, CandidateModel::KNeighbors]);

        let err = ModelSelector::new(config)
            .select(&x_train, &y_train, &array![[1.0]], &array![2.0])
            .unwrap_err();
        assert!(err.is(ErrorKind::Training));
        assert!(err.message().contains("KNeighbors"));
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let (x_train, y_train, x_test, y_test) = linear_data();
        let roster = vec![CandidateModel::RandomForest, CandidateModel::GradientBoosting];
        let params = ModelParams {
            forest_n_estimators: 10,
            ..Default::default()
        };
        let run = |parallel| {
            let config = SelectionConfig::new()
                .with_candidates(roster.clone())
                .with_params(params.clone())
                .with_parallel(parallel);
            ModelSelector::new(config)
                .select(&x_train, &y_train, &x_test, &y_test)
                .unwrap()
        };

        let a = run(true);
        let b = run(false);
        assert_eq!(a.candidate, b.candidate);
        assert_eq!(a.score, b.score);
    }

    #[test]
    fn test_artifact_records_width() {
        let (x_train, y_train, x_test, y_test) = linear_data();
        let config = SelectionConfig::new().with_candidates(vec![CandidateModel::Lasso]);
        let outcome = ModelSelector::new(config)
            .select(&x_train, &y_train, &x_test, &y_test)
            .unwrap();

        let artifact = ModelArtifact::from_outcome(outcome);
        assert_eq!(artifact.n_features, 2);
        assert_eq!(artifact.metric, "r2");
        assert_eq!(artifact.candidate, CandidateModel::Lasso);
    }
}
