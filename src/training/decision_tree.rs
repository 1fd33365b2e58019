//! Regression tree

use super::models::{check_prediction_input, check_training_data, Regressor};
use crate::error::Result;
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Splits that improve impurity by less than this are ignored
const MIN_GAIN: f64 = 1e-12;

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf { value: f64, n_samples: usize },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// CART regression tree with squared error impurity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features drawn at each split, all when unset
    pub max_features: Option<usize>,
    /// Seed for the per-split feature draw
    pub random_state: u64,
    n_features: usize,
}

impl Default for DecisionTreeRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTreeRegressor {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            random_state: 0,
            n_features: 0,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Draw this many candidate features at each split
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let value = indices.iter().map(|&i| y[i]).sum::<f64>() / n_samples.max(1) as f64;

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || is_pure(y, indices);

        if should_stop {
            return TreeNode::Leaf { value, n_samples };
        }

        let features = self.candidate_features(x.ncols(), rng);
        match self.find_best_split(x, y, indices, &features) {
            Some((feature_idx, threshold)) => {
                let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| x[[i, feature_idx]] <= threshold);

                let left = Box::new(self.build_tree(x, y, &left_idx, depth + 1, rng));
                let right = Box::new(self.build_tree(x, y, &right_idx, depth + 1, rng));

                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    n_samples,
                }
            }
            None => TreeNode::Leaf { value, n_samples },
        }
    }

    fn candidate_features(&self, n_features: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
        let mut features: Vec<usize> = (0..n_features).collect();
        if let Some(k) = self.max_features.filter(|&k| k > 0 && k < n_features) {
            features.shuffle(rng);
            features.truncate(k);
            features.sort_unstable();
        }
        features
    }

    /// Best (feature, threshold) by squared error reduction.
    ///
    /// Each feature is scanned in sorted order with running sums; features are
    /// searched in parallel and the earliest feature wins ties.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        features: &[usize],
    ) -> Option<(usize, f64)> {
        let n = indices.len();
        let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
        let parent_sse = total_sq - total_sum * total_sum / n as f64;
        let min_leaf = self.min_samples_leaf;

        let per_feature: Vec<Option<(usize, f64, f64)>> = features
            .par_iter()
            .map(|&feature_idx| {
                let mut pairs: Vec<(f64, f64)> = indices.iter().map(|&i| (x[[i, feature_idx]], y[i])).collect();
                pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

                let mut best: Option<(f64, f64)> = None;
                let mut left_sum = 0.0;
                let mut left_sq = 0.0;

                for k in 0..n - 1 {
                    let (xv, yv) = pairs[k];
                    left_sum += yv;
                    left_sq += yv * yv;

                    let next = pairs[k + 1].0;
                    if xv == next {
                        continue;
                    }
                    let n_left = k + 1;
                    let n_right = n - n_left;
                    if n_left < min_leaf || n_right < min_leaf {
                        continue;
                    }

                    let right_sum = total_sum - left_sum;
                    let right_sq = total_sq - left_sq;
                    let sse = (left_sq - left_sum * left_sum / n_left as f64)
                        + (right_sq - right_sum * right_sum / n_right as f64);
                    let gain = (parent_sse - sse) / n as f64;

                    if gain > MIN_GAIN && best.map_or(true, |(g, _)| gain > g) {
                        let mut threshold = (xv + next) / 2.0;
                        if threshold >= next {
                            threshold = xv;
                        }
                        best = Some((gain, threshold));
                    }
                }

                best.map(|(gain, threshold)| (feature_idx, threshold, gain))
            })
            .collect();

        let mut best: Option<(usize, f64, f64)> = None;
        for candidate in per_feature.into_iter().flatten() {
            if best.map_or(true, |(_, _, g)| candidate.2 > g) {
                best = Some(candidate);
            }
        }
        best.map(|(feature_idx, threshold, _)| (feature_idx, threshold))
    }

    fn predict_row(node: &TreeNode, x: &Array2<f64>, row: usize) -> f64 {
        let mut node = node;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if x[[row, *feature_idx]] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Get tree depth
    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map_or(0, node_depth)
    }

    /// Get number of leaves
    pub fn n_leaves(&self) -> usize {
        fn count(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => count(left) + count(right),
            }
        }
        self.root.as_ref().map_or(0, count)
    }
}

fn is_pure(y: &Array1<f64>, indices: &[usize]) -> bool {
    match indices.first() {
        None => true,
        Some(&first) => indices.iter().all(|&i| (y[i] - y[first]).abs() < 1e-10),
    }
}

impl Regressor for DecisionTreeRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        self.n_features = x.ncols();

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0, &mut rng));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_prediction_input(x, self.is_fitted(), self.n_features)?;
        let root = match self.root.as_ref() {
            Some(root) => root,
            None => return Err(crate::error::PipelineError::not_fitted("training.predict")),
        };
        Ok((0..x.nrows()).map(|row| Self::predict_row(root, x, row)).collect())
    }

    fn is_fitted(&self) -> bool {
        self.root.is_some()
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}
