//! Gradient boosted regression trees with squared error loss

use super::decision_tree::DecisionTreeRegressor;
use super::models::{check_prediction_input, check_training_data, Regressor};
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

/// Gradient boosting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Shrinkage applied to every tree
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Fraction of rows each tree is fit on
    pub subsample: f64,
    /// Random seed
    pub random_state: u64,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 1.0,
            random_state: 42,
        }
    }
}

/// Gradient boosting regressor.
///
/// Starts from the target mean and adds shrunken trees fit on the residuals.
/// Every round updates the running prediction on all rows, including rows
/// left out of that round's subsample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    config: GradientBoostingConfig,
    trees: Vec<DecisionTreeRegressor>,
    initial_prediction: f64,
    n_features: usize,
}

impl Default for GradientBoostingRegressor {
    fn default() -> Self {
        Self::new(GradientBoostingConfig::default())
    }
}

impl GradientBoostingRegressor {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            initial_prediction: 0.0,
            n_features: 0,
        }
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        &self.config
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn validate(&self) -> Result<()> {
        let c = &self.config;
        if c.n_estimators == 0 {
            return Err(PipelineError::training("training.fit", "n_estimators must be positive"));
        }
        if !(c.learning_rate > 0.0 && c.learning_rate.is_finite()) {
            return Err(PipelineError::training("training.fit", "learning_rate must be positive"));
        }
        if !(c.subsample > 0.0 && c.subsample <= 1.0) {
            return Err(PipelineError::training("training.fit", "subsample must be in (0, 1]"));
        }
        Ok(())
    }
}

impl Regressor for GradientBoostingRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        self.validate()?;

        let n_samples = x.nrows();
        let sample_size = ((n_samples as f64 * self.config.subsample).ceil() as usize).clamp(1, n_samples);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);

        self.initial_prediction = y.mean().unwrap_or(0.0);
        let mut predictions = Array1::from_elem(n_samples, self.initial_prediction);
        let mut trees = Vec::with_capacity(self.config.n_estimators);

        for round in 0..self.config.n_estimators {
            let residuals = y - &predictions;

            let mut tree = DecisionTreeRegressor::new()
                .with_max_depth(Some(self.config.max_depth))
                .with_min_samples_leaf(self.config.min_samples_leaf)
                .with_random_state(self.config.random_state.wrapping_add(round as u64));

            if sample_size < n_samples {
                let mut indices: Vec<usize> = (0..n_samples).collect();
                indices.shuffle(&mut rng);
                indices.truncate(sample_size);
                indices.sort_unstable();

                tree.fit(&x.select(Axis(0), &indices), &residuals.select(Axis(0), &indices))?;
            } else {
                tree.fit(x, &residuals)?;
            }

            let update = tree.predict(x)?;
            predictions.scaled_add(self.config.learning_rate, &update);
            trees.push(tree);
        }

        self.trees = trees;
        self.n_features = x.ncols();
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_prediction_input(x, self.is_fitted(), self.n_features)?;

        let mut predictions = Array1::from_elem(x.nrows(), self.initial_prediction);
        for tree in &self.trees {
            predictions.scaled_add(self.config.learning_rate, &tree.predict(x)?);
        }
        Ok(predictions)
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::models::RegressionMetrics;
    use ndarray::array;

    fn data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((60, 2), |(i, j)| ((i * (2 * j + 5)) % 13) as f64);
        let y = x.column(0).mapv(|v| v * v) + &x.column(1);
        (x, y)
    }

    #[test]
    fn test_boosting_reduces_error() {
        let (x, y) = data();

        let mut short = GradientBoostingRegressor::new(GradientBoostingConfig {
            n_estimators: 5,
            ..Default::default()
        });
        short.fit(&x, &y).unwrap();
        let mut long = GradientBoostingRegressor::default();
        long.fit(&x, &y).unwrap();

        let short_mse = RegressionMetrics::compute(&y, &short.predict(&x).unwrap()).mse;
        let long_mse = RegressionMetrics::compute(&y, &long.predict(&x).unwrap()).mse;
        assert!(long_mse < short_mse);
        assert_eq!(long.n_trees(), 100);
    }

    #[test]
    fn test_subsample_is_seeded() {
        let (x, y) = data();
        let config = GradientBoostingConfig {
            n_estimators: 20,
            subsample: 0.5,
            ..Default::default()
        };

        let mut a = GradientBoostingRegressor::new(config.clone());
        let mut b = GradientBoostingRegressor::new(config);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_single_round_without_shrinkage() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0.0, 0.0, 10.0, 10.0];
        let mut model = GradientBoostingRegressor::new(GradientBoostingConfig {
            n_estimators: 1,
            learning_rate: 1.0,
            subsample: 1.0,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_invalid_config() {
        let mut model = GradientBoostingRegressor::new(GradientBoostingConfig {
            subsample: 0.0,
            ..Default::default()
        });
        let err = model.fit(&array![[1.0]], &array![1.0]).unwrap_err();
        assert!(err.is(crate::error::ErrorKind::Training));
    }
}
