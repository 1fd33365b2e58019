//! Regressor trait and evaluation metrics

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Metrics for regression evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean squared error
    pub mse: f64,
    /// Root mean squared error
    pub rmse: f64,
    /// Mean absolute error
    pub mae: f64,
    /// Coefficient of determination
    pub r2: f64,
}

impl RegressionMetrics {
    /// Compute regression metrics.
    ///
    /// A constant target gives an R² of 1 for a perfect prediction and 0
    /// otherwise.
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let n = y_true.len().max(1) as f64;
        let errors: Vec<f64> = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| t - p)
            .collect();

        let ss_res: f64 = errors.iter().map(|e| e * e).sum();
        let mse = ss_res / n;
        let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

        let y_mean = y_true.mean().unwrap_or(0.0);
        let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
        let r2 = if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else if ss_res == 0.0 {
            1.0
        } else {
            0.0
        };

        Self {
            mse,
            rmse: mse.sqrt(),
            mae,
            r2,
        }
    }

    /// True when every metric is a finite number
    pub fn is_finite(&self) -> bool {
        self.mse.is_finite() && self.mae.is_finite() && self.r2.is_finite()
    }
}

/// A regression model that can be fit on a dense matrix
pub trait Regressor: Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict one value per row
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    fn is_fitted(&self) -> bool;

    /// Number of input features seen during fit
    fn n_features(&self) -> usize;
}

/// Validate a training set before fitting
pub(crate) fn check_training_data(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(PipelineError::training(
            "training.fit",
            format!("x has {} rows but y has {} values", x.nrows(), y.len()),
        ));
    }
    if x.nrows() == 0 {
        return Err(PipelineError::training("training.fit", "no training rows"));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(PipelineError::training(
            "training.fit",
            "training data contains non-finite values",
        ));
    }
    Ok(())
}

/// Validate an input matrix before predicting
pub(crate) fn check_prediction_input(x: &Array2<f64>, is_fitted: bool, n_features: usize) -> Result<()> {
    if !is_fitted {
        return Err(PipelineError::not_fitted("training.predict"));
    }
    if x.ncols() != n_features {
        return Err(PipelineError::schema_mismatch(
            "training.predict",
            format!("model expects {} features, got {}", n_features, x.ncols()),
        ));
    }
    Ok(())
}
