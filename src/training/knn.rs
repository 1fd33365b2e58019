//! K-nearest neighbors regression

use super::models::{check_prediction_input, check_training_data, Regressor};
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Weighting scheme for neighbors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightScheme {
    /// All neighbors have equal weight
    #[default]
    Uniform,
    /// Closer neighbors have more weight (inverse distance)
    Distance,
}

/// KNN configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnnConfig {
    /// Number of neighbors
    pub n_neighbors: usize,
    /// Weighting scheme
    pub weights: WeightScheme,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            weights: WeightScheme::Uniform,
        }
    }
}

/// K-nearest neighbors regressor over Euclidean distance.
///
/// Equidistant neighbors are ordered by training row, so predictions do not
/// depend on thread scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNeighborsRegressor {
    config: KnnConfig,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
}

impl Default for KNeighborsRegressor {
    fn default() -> Self {
        Self::new(KnnConfig::default())
    }
}

impl KNeighborsRegressor {
    pub fn new(config: KnnConfig) -> Self {
        Self {
            config,
            x_train: None,
            y_train: None,
        }
    }

    /// Create with default config and specified k
    pub fn with_k(k: usize) -> Self {
        Self::new(KnnConfig {
            n_neighbors: k,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &KnnConfig {
        &self.config
    }
}

impl Regressor for KNeighborsRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        if self.config.n_neighbors == 0 {
            return Err(PipelineError::training("training.fit", "n_neighbors must be positive"));
        }
        self.x_train = Some(x.clone());
        self.y_train = Some(y.clone());
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_prediction_input(x, self.is_fitted(), self.n_features())?;
        let (x_train, y_train) = match (self.x_train.as_ref(), self.y_train.as_ref()) {
            (Some(x_train), Some(y_train)) => (x_train, y_train),
            _ => return Err(PipelineError::not_fitted("training.predict")),
        };
        let k = self.config.n_neighbors;
        let weights = self.config.weights;

        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let neighbors = find_k_nearest(x.row(i), x_train, k);
                weighted_mean(&neighbors, y_train, weights)
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    fn is_fitted(&self) -> bool {
        self.x_train.is_some()
    }

    fn n_features(&self) -> usize {
        self.x_train.as_ref().map_or(0, |x| x.ncols())
    }
}

/// Neighbor candidate ordered by distance, then by training row
#[derive(Debug, Clone, Copy)]
struct Neighbor {
    distance: f64,
    index: usize,
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.index.cmp(&other.index))
    }
}

fn euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// k nearest training rows, closest first
fn find_k_nearest(query: ArrayView1<f64>, x_train: &Array2<f64>, k: usize) -> Vec<Neighbor> {
    // max-heap holding the current k best; the root is the worst kept
    let mut heap: BinaryHeap<Neighbor> = BinaryHeap::with_capacity(k + 1);

    for (index, row) in x_train.rows().into_iter().enumerate() {
        let candidate = Neighbor {
            distance: euclidean(query, row),
            index,
        };
        if heap.len() < k {
            heap.push(candidate);
        } else if heap.peek().map_or(false, |worst| candidate < *worst) {
            heap.pop();
            heap.push(candidate);
        }
    }

    heap.into_sorted_vec()
}

fn weighted_mean(neighbors: &[Neighbor], y_train: &Array1<f64>, weights: WeightScheme) -> f64 {
    match weights {
        WeightScheme::Uniform => {
            neighbors.iter().map(|n| y_train[n.index]).sum::<f64>() / neighbors.len().max(1) as f64
        }
        WeightScheme::Distance => {
            // an exact match takes the mean of the exact matches
            let exact: Vec<f64> = neighbors
                .iter()
                .filter(|n| n.distance == 0.0)
                .map(|n| y_train[n.index])
                .collect();
            if !exact.is_empty() {
                return exact.iter().sum::<f64>() / exact.len() as f64;
            }
            let (num, den) = neighbors.iter().fold((0.0, 0.0), |(num, den), n| {
                let w = 1.0 / n.distance;
                (num + w * y_train[n.index], den + w)
            });
            num / den
        }
    }
}
