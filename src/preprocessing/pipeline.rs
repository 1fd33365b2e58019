//! Column-routed preprocessing pipeline

use super::{
    config::{TransformConfig, UnknownCategoryPolicy},
    encoder::OneHotEncoder,
    imputer::{ImputeStrategy, Imputer},
    scaler::StandardScaler,
    to_matrix, FeatureTransformer,
};
use crate::data::FeatureSpec;
use crate::error::{PipelineError, Result};
use crate::store::Artifact;
use ndarray::{concatenate, Array2, ArrayView2, Axis};
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Median imputation followed by standard scaling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericPipeline {
    columns: Vec<String>,
    imputer: Imputer,
    scaler: StandardScaler,
}

impl NumericPipeline {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            imputer: Imputer::new(ImputeStrategy::Median),
            scaler: StandardScaler::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn imputer(&self) -> &Imputer {
        &self.imputer
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }
}

impl FeatureTransformer for NumericPipeline {
    fn fit(&mut self, df: &DataFrame) -> Result<()> {
        let columns: Vec<&str> = self.columns.iter().map(|c| c.as_str()).collect();
        let imputed = self.imputer.fit_transform(df, &columns)?;
        self.scaler.fit(&to_matrix(&imputed, "transform.fit")?)?;
        Ok(())
    }

    fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted() {
            return Err(PipelineError::not_fitted("transform.numeric"));
        }
        let imputed = self.imputer.transform(df)?;
        self.scaler.transform(&to_matrix(&imputed, "transform.numeric")?)
    }

    fn is_fitted(&self) -> bool {
        self.imputer.is_fitted() && self.scaler.is_fitted()
    }

    fn feature_names_out(&self) -> Vec<String> {
        self.columns.clone()
    }
}

/// Most-frequent imputation, one-hot expansion, then scaling without centering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalPipeline {
    columns: Vec<String>,
    imputer: Imputer,
    encoder: OneHotEncoder,
    scaler: StandardScaler,
}

impl CategoricalPipeline {
    pub fn new(columns: Vec<String>, unknown: UnknownCategoryPolicy) -> Self {
        Self {
            columns,
            imputer: Imputer::new(ImputeStrategy::MostFrequent),
            encoder: OneHotEncoder::new(unknown),
            scaler: StandardScaler::without_mean(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn imputer(&self) -> &Imputer {
        &self.imputer
    }

    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }
}

impl FeatureTransformer for CategoricalPipeline {
    fn fit(&mut self, df: &DataFrame) -> Result<()> {
        let columns: Vec<&str> = self.columns.iter().map(|c| c.as_str()).collect();
        let imputed = self.imputer.fit_transform(df, &columns)?;
        let encoded = self.encoder.fit_transform(&imputed, &columns)?;
        self.scaler.fit(&encoded)?;
        Ok(())
    }

    fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted() {
            return Err(PipelineError::not_fitted("transform.categorical"));
        }
        let imputed = self.imputer.transform(df)?;
        let encoded = self.encoder.transform(&imputed)?;
        self.scaler.transform(&encoded)
    }

    fn is_fitted(&self) -> bool {
        self.imputer.is_fitted() && self.encoder.is_fitted() && self.scaler.is_fitted()
    }

    fn feature_names_out(&self) -> Vec<String> {
        self.encoder.feature_names()
    }
}

/// One routed group of columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnGroup {
    Numeric(NumericPipeline),
    Categorical(CategoricalPipeline),
}

impl FeatureTransformer for ColumnGroup {
    fn fit(&mut self, df: &DataFrame) -> Result<()> {
        match self {
            ColumnGroup::Numeric(p) => p.fit(df),
            ColumnGroup::Categorical(p) => p.fit(df),
        }
    }

    fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        match self {
            ColumnGroup::Numeric(p) => p.transform(df),
            ColumnGroup::Categorical(p) => p.transform(df),
        }
    }

    fn is_fitted(&self) -> bool {
        match self {
            ColumnGroup::Numeric(p) => p.is_fitted(),
            ColumnGroup::Categorical(p) => p.is_fitted(),
        }
    }

    fn feature_names_out(&self) -> Vec<String> {
        match self {
            ColumnGroup::Numeric(p) => p.feature_names_out(),
            ColumnGroup::Categorical(p) => p.feature_names_out(),
        }
    }
}

/// The fitted preprocessor persisted next to the model.
///
/// Routes the numeric and categorical columns of a [`FeatureSpec`] to their
/// sub-pipelines and concatenates the outputs column-wise, numeric first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeTransformer {
    spec: FeatureSpec,
    config: TransformConfig,
    groups: Vec<ColumnGroup>,
    n_samples_seen: usize,
    is_fitted: bool,
}

impl Artifact for CompositeTransformer {
    const KIND: &'static str = "preprocessor";
    const SCHEMA_VERSION: u32 = 1;
}

impl CompositeTransformer {
    pub fn new(spec: FeatureSpec, config: TransformConfig) -> Self {
        let mut groups = Vec::with_capacity(2);
        if !spec.numeric.is_empty() {
            groups.push(ColumnGroup::Numeric(NumericPipeline::new(spec.numeric.clone())));
        }
        if !spec.categorical.is_empty() {
            groups.push(ColumnGroup::Categorical(CategoricalPipeline::new(
                spec.categorical.clone(),
                config.unknown_category,
            )));
        }

        Self {
            spec,
            config,
            groups,
            n_samples_seen: 0,
            is_fitted: false,
        }
    }

    pub fn spec(&self) -> &FeatureSpec {
        &self.spec
    }

    pub fn unknown_policy(&self) -> UnknownCategoryPolicy {
        self.config.unknown_category
    }

    pub fn groups(&self) -> &[ColumnGroup] {
        &self.groups
    }

    /// Rows seen by the last fit
    pub fn n_samples_seen(&self) -> usize {
        self.n_samples_seen
    }

    /// Vocabulary learned for a categorical column
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.groups.iter().find_map(|g| match g {
            ColumnGroup::Categorical(p) => p.encoder().categories(column),
            ColumnGroup::Numeric(_) => None,
        })
    }
}

impl FeatureTransformer for CompositeTransformer {
    fn fit(&mut self, df: &DataFrame) -> Result<()> {
        if self.groups.is_empty() {
            return Err(PipelineError::config("transform.fit", "feature spec declares no columns"));
        }
        self.spec.require_columns(df, false, "transform.fit")?;
        if df.height() == 0 {
            return Err(PipelineError::schema_mismatch("transform.fit", "cannot fit on an empty frame"));
        }

        self.is_fitted = false;
        self.groups.par_iter_mut().try_for_each(|group| group.fit(df))?;
        self.n_samples_seen = df.height();
        self.is_fitted = true;

        debug!(
            rows = df.height(),
            features_out = self.n_features_out(),
            "fitted feature transformer"
        );
        Ok(())
    }

    fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PipelineError::not_fitted("transform.apply"));
        }
        self.spec.require_columns(df, false, "transform.apply")?;

        let parts = self
            .groups
            .par_iter()
            .map(|group| group.transform(df))
            .collect::<Result<Vec<_>>>()?;

        let views: Vec<ArrayView2<f64>> = parts.iter().map(|p| p.view()).collect();
        concatenate(Axis(1), &views).map_err(|e| {
            PipelineError::schema_mismatch("transform.apply", "sub-pipeline outputs disagree on row count")
                .with_source(e)
        })
    }

    fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    fn feature_names_out(&self) -> Vec<String> {
        self.groups.iter().flat_map(|g| g.feature_names_out()).collect()
    }
}
