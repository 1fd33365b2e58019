//! Model training and selection
//!
//! Regression candidates share the [`Regressor`] trait:
//! - Linear models (OLS, Ridge, Lasso)
//! - K-nearest neighbors
//! - Decision trees and random forests
//! - Gradient boosting
//!
//! [`ModelSelector`] fits a roster of them, scores each on the held-out
//! matrix with R² and returns the winner as a [`ModelArtifact`].

mod config;
mod models;
mod selector;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod knn;
pub mod linear_models;
pub mod random_forest;

pub use config::{CandidateModel, ModelParams, SelectionConfig};
pub use decision_tree::{DecisionTreeRegressor, TreeNode};
pub use gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
pub use knn::{KNeighborsRegressor, KnnConfig, WeightScheme};
pub use linear_models::{LassoRegression, LinearRegression, RidgeRegression};
pub use models::{RegressionMetrics, Regressor};
pub use random_forest::{MaxFeatures, RandomForestRegressor};
pub use selector::{LeaderboardEntry, ModelArtifact, ModelSelector, SelectionOutcome, TrainedRegressor, Verdict};
