//! Random forest regression

use super::decision_tree::DecisionTreeRegressor;
use super::models::{check_prediction_input, check_training_data, Regressor};
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Number of features considered at each split
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// Every feature
    #[default]
    All,
    /// Square root of the feature count
    Sqrt,
    /// Log2 of the feature count
    Log2,
    /// Fixed count
    Count(usize),
    /// Fraction of the feature count
    Fraction(f64),
}

impl MaxFeatures {
    /// Resolve against a feature count, always at least one
    pub fn resolve(&self, n_features: usize) -> usize {
        let k = match *self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil() as usize,
            MaxFeatures::Count(k) => k,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
        };
        k.clamp(1, n_features.max(1))
    }
}

/// Bagged ensemble of regression trees.
///
/// Tree `i` draws its bootstrap sample and split features from a ChaCha8
/// stream seeded with `random_state + i`, so a fit is reproducible no
/// matter how rayon schedules the trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    trees: Vec<DecisionTreeRegressor>,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub random_state: u64,
    n_features: usize,
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomForestRegressor {
    pub fn new() -> Self {
        Self {
            trees: Vec::new(),
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            bootstrap: true,
            random_state: 42,
            n_features: 0,
        }
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn fit_tree(&self, x: &Array2<f64>, y: &Array1<f64>, tree_idx: usize) -> Result<DecisionTreeRegressor> {
        let seed = self.random_state.wrapping_add(tree_idx as u64);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let n_samples = x.nrows();

        let max_features = match self.max_features {
            MaxFeatures::All => None,
            other => Some(other.resolve(x.ncols())),
        };
        let mut tree = DecisionTreeRegressor::new()
            .with_max_depth(self.max_depth)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_max_features(max_features)
            .with_random_state(rng.gen());

        if self.bootstrap {
            let indices: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
            let x_boot = x.select(Axis(0), &indices);
            let y_boot = y.select(Axis(0), &indices);
            tree.fit(&x_boot, &y_boot)?;
        } else {
            tree.fit(x, y)?;
        }
        Ok(tree)
    }
}

impl Regressor for RandomForestRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        if self.n_estimators == 0 {
            return Err(PipelineError::training("training.fit", "n_estimators must be positive"));
        }

        let trees = (0..self.n_estimators)
            .into_par_iter()
            .map(|idx| self.fit_tree(x, y, idx))
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        self.n_features = x.ncols();
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_prediction_input(x, self.is_fitted(), self.n_features)?;

        let per_tree = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let mut sum = Array1::<f64>::zeros(x.nrows());
        for pred in &per_tree {
            sum += pred;
        }
        Ok(sum / self.trees.len() as f64)
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}
