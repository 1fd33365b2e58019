//! Feature preprocessing
//!
//! Turns the student records into a dense feature matrix:
//! - Numeric columns: median imputation, then standard scaling
//! - Categorical columns: most-frequent imputation, one-hot expansion, then
//!   scaling of the indicators without centering
//!
//! Both sub-pipelines implement [`FeatureTransformer`] and are combined by the
//! [`CompositeTransformer`], which is what gets persisted.

mod config;
mod encoder;
mod imputer;
mod pipeline;
mod scaler;

pub use config::{TransformConfig, UnknownCategoryPolicy};
pub use encoder::OneHotEncoder;
pub use imputer::{ImputeStrategy, Imputer};
pub use pipeline::{CategoricalPipeline, ColumnGroup, CompositeTransformer, NumericPipeline};
pub use scaler::StandardScaler;

use crate::error::{ErrorKind, PipelineError, Result, ResultExt};
use ndarray::Array2;
use polars::prelude::*;

/// Fit-then-apply transformation from a data frame to a feature matrix.
///
/// `fit` learns every statistic from the frame it is given; `transform`
/// applies those statistics unchanged and fails with a not-fitted error
/// when called first.
pub trait FeatureTransformer {
    fn fit(&mut self, df: &DataFrame) -> Result<()>;

    fn transform(&self, df: &DataFrame) -> Result<Array2<f64>>;

    fn fit_transform(&mut self, df: &DataFrame) -> Result<Array2<f64>> {
        self.fit(df)?;
        self.transform(df)
    }

    fn is_fitted(&self) -> bool;

    /// Names of the output columns, in output order
    fn feature_names_out(&self) -> Vec<String>;

    fn n_features_out(&self) -> usize {
        self.feature_names_out().len()
    }
}

/// Select columns and coerce them to `Float64`.
///
/// Integer columns are widened; text columns must parse completely.
pub(crate) fn select_numeric(df: &DataFrame, columns: &[&str], step: &'static str) -> Result<DataFrame> {
    let mut out = Vec::with_capacity(columns.len());
    for &name in columns {
        let column = df.column(name).map_err(|_| missing_column(name, step))?;
        let cast = match column.dtype() {
            DataType::Float64 => column.clone(),
            dt if dt.is_primitive_numeric() || dt == &DataType::Null => column
                .cast(&DataType::Float64)
                .wrap_err(ErrorKind::SchemaMismatch, step)?,
            DataType::String => column.strict_cast(&DataType::Float64).map_err(|e| {
                PipelineError::schema_mismatch(step, format!("column '{}' holds non-numeric values", name))
                    .with_source(e)
            })?,
            other => {
                return Err(PipelineError::schema_mismatch(
                    step,
                    format!("column '{}' has type {}, expected a number", name, other),
                ))
            }
        };
        out.push(cast);
    }
    DataFrame::new(out).wrap_err(ErrorKind::SchemaMismatch, step)
}

/// Select columns and coerce them to `String`
pub(crate) fn select_categorical(df: &DataFrame, columns: &[&str], step: &'static str) -> Result<DataFrame> {
    let mut out = Vec::with_capacity(columns.len());
    for &name in columns {
        let column = df.column(name).map_err(|_| missing_column(name, step))?;
        let cast = if column.dtype() == &DataType::String {
            column.clone()
        } else {
            column
                .cast(&DataType::String)
                .wrap_err(ErrorKind::SchemaMismatch, step)?
        };
        out.push(cast);
    }
    DataFrame::new(out).wrap_err(ErrorKind::SchemaMismatch, step)
}

/// Dense matrix from `Float64` columns without nulls
pub(crate) fn to_matrix(df: &DataFrame, step: &'static str) -> Result<Array2<f64>> {
    let mut x = Array2::zeros((df.height(), df.width()));
    for (j, column) in df.get_columns().iter().enumerate() {
        let ca = column.f64().wrap_err(ErrorKind::SchemaMismatch, step)?;
        for (i, value) in ca.into_iter().enumerate() {
            x[[i, j]] = value.ok_or_else(|| {
                PipelineError::schema_mismatch(step, format!("column '{}' has a missing value", column.name()))
            })?;
        }
    }
    Ok(x)
}

fn missing_column(name: &str, step: &'static str) -> PipelineError {
    PipelineError::schema_mismatch(step, format!("missing column '{}'", name))
}
