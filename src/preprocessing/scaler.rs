//! Feature scaling

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Deviations below this are treated as constant columns
const ZERO_SCALE_TOLERANCE: f64 = 10.0 * f64::EPSILON;

/// Standard scaler over a dense matrix: `(x - mean) / std`.
///
/// The deviation is the population deviation. With `with_mean` off the data
/// is only divided, which keeps sparse indicator columns non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    with_mean: bool,
    mean: Array1<f64>,
    scale: Array1<f64>,
    is_fitted: bool,
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardScaler {
    /// Create a centering scaler
    pub fn new() -> Self {
        Self {
            with_mean: true,
            mean: Array1::zeros(0),
            scale: Array1::zeros(0),
            is_fitted: false,
        }
    }

    /// Create a scaler that divides without centering
    pub fn without_mean() -> Self {
        Self {
            with_mean: false,
            ..Self::new()
        }
    }

    /// Fit column statistics
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(PipelineError::schema_mismatch(
                "transform.fit",
                "cannot fit a scaler on zero rows",
            ));
        }

        let mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(x.ncols()));
        let scale = x.std_axis(Axis(0), 0.0).mapv(|s| {
            if s.is_finite() && s > ZERO_SCALE_TOLERANCE {
                s
            } else {
                1.0
            }
        });

        self.mean = mean;
        self.scale = scale;
        self.is_fitted = true;
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PipelineError::not_fitted("transform.scale"));
        }
        if x.ncols() != self.scale.len() {
            return Err(PipelineError::schema_mismatch(
                "transform.scale",
                format!("expected {} columns, got {}", self.scale.len(), x.ncols()),
            ));
        }

        let mut out = x.to_owned();
        if self.with_mean {
            out -= &self.mean;
        }
        out /= &self.scale;
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standard_scaler() {
        let x = array![[1.0, 10.0], [2.0, 10.0], [3.0, 10.0]];
        let mut scaler = StandardScaler::new();
        let out = scaler.fit_transform(&x).unwrap();

        let pop_std = (2.0f64 / 3.0).sqrt();
        assert!((scaler.scale()[0] - pop_std).abs() < 1e-12);
        assert!((out[[0, 0]] + 1.0 / pop_std).abs() < 1e-12);
        assert!(out[[1, 0]].abs() < 1e-12);
        // constant column scales by one
        assert_eq!(scaler.scale()[1], 1.0);
        assert!(out.column(1).iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_without_mean_keeps_sign() {
        let x = array![[0.0], [1.0], [1.0], [0.0]];
        let mut scaler = StandardScaler::without_mean();
        let out = scaler.fit_transform(&x).unwrap();

        assert_eq!(out[[0, 0]], 0.0);
        assert!((out[[1, 0]] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_width_mismatch() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&array![[1.0, 2.0]]).unwrap();
        assert!(scaler.transform(&array![[1.0]]).is_err());
    }

    #[test]
    fn test_not_fitted() {
        let err = StandardScaler::new().transform(&array![[1.0]]).unwrap_err();
        assert!(err.is(crate::error::ErrorKind::NotFitted));
    }
}
