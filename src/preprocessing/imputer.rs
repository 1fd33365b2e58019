//! Missing value imputation

use super::{select_categorical, select_numeric};
use crate::error::{ErrorKind, PipelineError, Result, ResultExt};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Strategy for imputing missing values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with the median (numeric only)
    Median,
    /// Replace with the most frequent value, ties going to the smallest
    MostFrequent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum ImputeValue {
    Numeric(f64),
    String(String),
}

/// Imputer for handling missing values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    columns: Vec<String>,
    fill_values: Vec<ImputeValue>,
    is_fitted: bool,
}

impl Imputer {
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            columns: Vec::new(),
            fill_values: Vec::new(),
            is_fitted: false,
        }
    }

    /// Learn one fill value per column
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        let selected = self.select(df, columns, "transform.fit")?;

        let mut fill_values = Vec::with_capacity(columns.len());
        for column in selected.get_columns() {
            let value = match self.strategy {
                ImputeStrategy::Median => median(column)?,
                ImputeStrategy::MostFrequent => most_frequent(column)?,
            };
            fill_values.push(value);
        }

        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self.fill_values = fill_values;
        self.is_fitted = true;
        Ok(self)
    }

    /// Select the fitted columns and fill their nulls
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(PipelineError::not_fitted("transform.impute"));
        }

        let columns: Vec<&str> = self.columns.iter().map(|c| c.as_str()).collect();
        let selected = self.select(df, &columns, "transform.impute")?;

        let filled = selected
            .get_columns()
            .iter()
            .zip(&self.fill_values)
            .map(|(column, value)| fill_column(column, value))
            .collect::<Result<Vec<_>>>()?;

        DataFrame::new(filled).wrap_err(ErrorKind::SchemaMismatch, "transform.impute")
    }

    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Learned fill value for a numeric column
    pub fn numeric_fill(&self, column: &str) -> Option<f64> {
        self.position(column).and_then(|i| match &self.fill_values[i] {
            ImputeValue::Numeric(v) => Some(*v),
            ImputeValue::String(_) => None,
        })
    }

    /// Learned fill value for a categorical column
    pub fn categorical_fill(&self, column: &str) -> Option<&str> {
        self.position(column).and_then(|i| match &self.fill_values[i] {
            ImputeValue::String(v) => Some(v.as_str()),
            ImputeValue::Numeric(_) => None,
        })
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    fn select(&self, df: &DataFrame, columns: &[&str], step: &'static str) -> Result<DataFrame> {
        match self.strategy {
            ImputeStrategy::Median => select_numeric(df, columns, step),
            ImputeStrategy::MostFrequent => select_categorical(df, columns, step),
        }
    }
}

fn median(column: &Column) -> Result<ImputeValue> {
    let ca = column.f64().wrap_err(ErrorKind::SchemaMismatch, "transform.fit")?;
    ca.median()
        .map(ImputeValue::Numeric)
        .ok_or_else(|| no_observed_values(column))
}

fn most_frequent(column: &Column) -> Result<ImputeValue> {
    let ca = column.str().wrap_err(ErrorKind::SchemaMismatch, "transform.fit")?;

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in ca.into_iter().flatten() {
        *counts.entry(value).or_insert(0) += 1;
    }

    // BTreeMap iterates in sorted order, so the first maximum is the smallest
    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }

    best.map(|(value, _)| ImputeValue::String(value.to_string()))
        .ok_or_else(|| no_observed_values(column))
}

fn no_observed_values(column: &Column) -> PipelineError {
    PipelineError::schema_mismatch(
        "transform.fit",
        format!("column '{}' has no observed values to learn from", column.name()),
    )
}

fn fill_column(column: &Column, value: &ImputeValue) -> Result<Column> {
    let name = column.name().clone();
    match value {
        ImputeValue::Numeric(fill) => {
            let ca = column.f64().wrap_err(ErrorKind::SchemaMismatch, "transform.impute")?;
            let filled: Float64Chunked = ca
                .into_iter()
                .map(|opt| Some(opt.unwrap_or(*fill)))
                .collect();
            Ok(filled.with_name(name).into_series().into())
        }
        ImputeValue::String(fill) => {
            let ca = column.str().wrap_err(ErrorKind::SchemaMismatch, "transform.impute")?;
            let filled: StringChunked = ca
                .into_iter()
                .map(|opt| Some(opt.unwrap_or(fill.as_str())))
                .collect();
            Ok(filled.with_name(name).into_series().into())
        }
    }
}
