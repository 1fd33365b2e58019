//! One-hot encoding of categorical columns

use super::config::UnknownCategoryPolicy;
use super::select_categorical;
use crate::error::{ErrorKind, PipelineError, Result, ResultExt};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One-hot encoder over a sorted per-column vocabulary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    columns: Vec<String>,
    /// Sorted vocabulary per column
    categories: Vec<Vec<String>>,
    unknown: UnknownCategoryPolicy,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new(unknown: UnknownCategoryPolicy) -> Self {
        Self {
            columns: Vec::new(),
            categories: Vec::new(),
            unknown,
            is_fitted: false,
        }
    }

    /// Learn the vocabulary of each column
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        let selected = select_categorical(df, columns, "transform.fit")?;

        let mut categories: Vec<Vec<String>> = Vec::with_capacity(columns.len());
        for column in selected.get_columns() {
            let ca = column.str().wrap_err(ErrorKind::SchemaMismatch, "transform.fit")?;
            let vocab: BTreeSet<&str> = ca.into_iter().flatten().collect();
            if vocab.is_empty() {
                return Err(PipelineError::schema_mismatch(
                    "transform.fit",
                    format!("column '{}' has no categories to learn", column.name()),
                ));
            }
            categories.push(vocab.into_iter().map(String::from).collect());
        }

        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self.categories = categories;
        self.is_fitted = true;
        Ok(self)
    }

    /// Expand every column into indicator columns, in column then vocabulary order
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        const STEP: &str = "transform.encode";
        if !self.is_fitted {
            return Err(PipelineError::not_fitted(STEP));
        }

        let columns: Vec<&str> = self.columns.iter().map(|c| c.as_str()).collect();
        let selected = select_categorical(df, &columns, STEP)?;

        let mut out = Array2::zeros((df.height(), self.n_output_features()));
        let mut offset = 0;
        for ((name, vocab), column) in self
            .columns
            .iter()
            .zip(&self.categories)
            .zip(selected.get_columns())
        {
            let ca = column.str().wrap_err(ErrorKind::SchemaMismatch, STEP)?;
            for (row, value) in ca.into_iter().enumerate() {
                match value.and_then(|v| vocab.binary_search_by(|c| c.as_str().cmp(v)).ok()) {
                    Some(idx) => out[[row, offset + idx]] = 1.0,
                    None => match self.unknown {
                        UnknownCategoryPolicy::Reject => {
                            return Err(PipelineError::unknown_category(
                                STEP,
                                name,
                                value.unwrap_or("<null>"),
                            ));
                        }
                        UnknownCategoryPolicy::ZeroVector => {}
                    },
                }
            }
            offset += vocab.len();
        }

        Ok(out)
    }

    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<Array2<f64>> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Learned vocabulary of a column
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.categories[i].as_slice())
    }

    pub fn unknown_policy(&self) -> UnknownCategoryPolicy {
        self.unknown
    }

    pub fn n_output_features(&self) -> usize {
        self.categories.iter().map(|c| c.len()).sum()
    }

    /// `<column>_<category>` for every indicator
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .zip(&self.categories)
            .flat_map(|(col, vocab)| vocab.iter().map(move |cat| format!("{}_{}", col, cat)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        df!(
            "lunch" => &["standard", "free/reduced", "standard"],
            "gender" => &["male", "female", "female"],
        )
        .unwrap()
    }

    #[test]
    fn test_sorted_vocabulary() {
        let mut encoder = OneHotEncoder::new(UnknownCategoryPolicy::Reject);
        let out = encoder.fit_transform(&frame(), &["lunch", "gender"]).unwrap();

        assert_eq!(
            encoder.feature_names(),
            vec!["lunch_free/reduced", "lunch_standard", "gender_female", "gender_male"]
        );
        assert_eq!(out.shape(), &[3, 4]);
        assert_eq!(out.row(0).to_vec(), vec![0.0, 1.0, 0.0, 1.0]);
        assert_eq!(out.row(1).to_vec(), vec![1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_unknown_rejected() {
        let mut encoder = OneHotEncoder::new(UnknownCategoryPolicy::Reject);
        encoder.fit(&frame(), &["lunch"]).unwrap();

        let unseen = df!("lunch" => &["deluxe"]).unwrap();
        let err = encoder.transform(&unseen).unwrap_err();
        assert!(err.is(ErrorKind::UnknownCategory));
        assert!(err.message().contains("deluxe"));
        assert!(err.message().contains("lunch"));
    }

    #[test]
    fn test_unknown_zero_vector() {
        let mut encoder = OneHotEncoder::new(UnknownCategoryPolicy::ZeroVector);
        encoder.fit(&frame(), &["lunch", "gender"]).unwrap();

        let unseen = df!("lunch" => &["deluxe"], "gender" => &["male"]).unwrap();
        let out = encoder.transform(&unseen).unwrap();
        assert_eq!(out.row(0).to_vec(), vec![0.0, 0.0, 0.0, 1.0]);
    }
}
