//! Linear model implementations

use super::models::{check_prediction_input, check_training_data, Regressor};
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Pivots below this fraction of the largest diagonal entry count as singular
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Solve the symmetric positive semi-definite system `A x = b`.
///
/// One-hot blocks make the normal equations rank deficient, so when a pivot
/// collapses the system is retried with a small ridge on the diagonal.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }
    if n == 0 {
        return Some(Array1::zeros(0));
    }

    let max_diag = a.diag().iter().fold(0.0f64, |m, v| m.max(v.abs())).max(1.0);
    if let Some(x) = cholesky_factor_solve(a, b, PIVOT_TOLERANCE * max_diag) {
        return Some(x);
    }

    let mut a_reg = a.clone();
    let ridge = 1e-8 * max_diag;
    for k in 0..n {
        a_reg[[k, k]] += ridge;
    }
    cholesky_factor_solve(&a_reg, b, 0.0)
}

fn cholesky_factor_solve(a: &Array2<f64>, b: &Array1<f64>, tolerance: f64) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    // A = L * L^T
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= tolerance {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L * y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T * x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Center `x` and `y` on their means
fn center(x: &Array2<f64>, y: &Array1<f64>) -> (Array2<f64>, Array1<f64>, Array1<f64>, f64) {
    let x_mean = x
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(x.ncols()));
    let y_mean = y.mean().unwrap_or(0.0);
    let x_centered = x - &x_mean.view().insert_axis(Axis(0));
    let y_centered = y - y_mean;
    (x_centered, y_centered, x_mean, y_mean)
}

/// Solve `(X^T X + alpha I) w = X^T y` on centered data and recover the intercept
fn fit_normal_equations(x: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> Result<(Array1<f64>, f64)> {
    let (x_c, y_c, x_mean, y_mean) = center(x, y);

    let mut xtx = x_c.t().dot(&x_c);
    for i in 0..x.ncols() {
        xtx[[i, i]] += alpha;
    }
    let xty = x_c.t().dot(&y_c);

    let coefficients = cholesky_solve(&xtx, &xty)
        .ok_or_else(|| PipelineError::training("training.fit", "normal equations are singular"))?;
    let intercept = y_mean - coefficients.dot(&x_mean);
    Ok((coefficients, intercept))
}

/// Ordinary least squares
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Fitted coefficients (weights)
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept (bias)
    pub intercept: f64,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        let (coefficients, intercept) = fit_normal_equations(x, y, 0.0)?;
        self.coefficients = Some(coefficients);
        self.intercept = intercept;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_prediction_input(x, self.is_fitted(), self.n_features())?;
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or_else(|| PipelineError::not_fitted("training.predict"))?;
        Ok(x.dot(coefficients) + self.intercept)
    }

    fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    fn n_features(&self) -> usize {
        self.coefficients.as_ref().map_or(0, |c| c.len())
    }
}

/// Ridge Regression (L2-regularized linear regression)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeRegression {
    pub coefficients: Option<Array1<f64>>,
    pub intercept: f64,
    /// L2 regularization strength
    pub alpha: f64,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
            alpha,
        }
    }
}

impl Regressor for RidgeRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        let (coefficients, intercept) = fit_normal_equations(x, y, self.alpha)?;
        self.coefficients = Some(coefficients);
        self.intercept = intercept;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_prediction_input(x, self.is_fitted(), self.n_features())?;
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or_else(|| PipelineError::not_fitted("training.predict"))?;
        Ok(x.dot(coefficients) + self.intercept)
    }

    fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    fn n_features(&self) -> usize {
        self.coefficients.as_ref().map_or(0, |c| c.len())
    }
}

/// Lasso Regression (L1-regularized via coordinate descent)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LassoRegression {
    pub coefficients: Option<Array1<f64>>,
    pub intercept: f64,
    /// L1 regularization strength
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for LassoRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl LassoRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
            alpha,
            max_iter: 1000,
            tol: 1e-6,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Soft-threshold operator for the L1 proximal step
    fn soft_threshold(val: f64, threshold: f64) -> f64 {
        if val > threshold {
            val - threshold
        } else if val < -threshold {
            val + threshold
        } else {
            0.0
        }
    }
}

impl Regressor for LassoRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        let n_samples = x.nrows();
        let n_features = x.ncols();
        let (x_c, y_c, x_mean, y_mean) = center(x, y);

        let col_norms: Vec<f64> = (0..n_features)
            .map(|j| x_c.column(j).mapv(|v| v * v).sum())
            .collect();

        let mut w = Array1::<f64>::zeros(n_features);
        let mut r = y_c.clone();
        let lambda = self.alpha * n_samples as f64;

        for _ in 0..self.max_iter {
            let mut max_delta = 0.0f64;

            for j in 0..n_features {
                if col_norms[j] < 1e-15 {
                    continue;
                }
                let rho = x_c.column(j).dot(&r) + col_norms[j] * w[j];
                let old = w[j];
                w[j] = Self::soft_threshold(rho, lambda) / col_norms[j];

                let delta = old - w[j];
                if delta != 0.0 {
                    r.scaled_add(delta, &x_c.column(j));
                    max_delta = max_delta.max(delta.abs());
                }
            }

            if max_delta < self.tol {
                break;
            }
        }

        self.intercept = y_mean - w.dot(&x_mean);
        self.coefficients = Some(w);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_prediction_input(x, self.is_fitted(), self.n_features())?;
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or_else(|| PipelineError::not_fitted("training.predict"))?;
        Ok(x.dot(coefficients) + self.intercept)
    }

    fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    fn n_features(&self) -> usize {
        self.coefficients.as_ref().map_or(0, |c| c.len())
    }
}
