//! Column schema shared by the training and inference paths

use crate::error::{PipelineError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Numeric feature columns, in canonical order
pub const NUMERIC_COLUMNS: [&str; 2] = ["writing_score", "reading_score"];

/// Categorical feature columns, in canonical order
pub const CATEGORICAL_COLUMNS: [&str; 5] = [
    "gender",
    "race_ethnicity",
    "parental_level_of_education",
    "lunch",
    "test_preparation_course",
];

/// Regression target
pub const TARGET_COLUMN: &str = "math_score";

/// Declaration of which columns are numeric and which are categorical.
///
/// The canonical feature order is numeric columns followed by categorical
/// columns, each in declared order. Both the fitted transformer and the
/// inference request builder use this order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
    pub target: String,
}

impl Default for FeatureSpec {
    fn default() -> Self {
        Self::student_performance()
    }
}

impl FeatureSpec {
    /// The student performance schema
    pub fn student_performance() -> Self {
        Self {
            numeric: NUMERIC_COLUMNS.iter().map(|s| s.to_string()).collect(),
            categorical: CATEGORICAL_COLUMNS.iter().map(|s| s.to_string()).collect(),
            target: TARGET_COLUMN.to_string(),
        }
    }

    /// Feature columns in canonical order
    pub fn feature_columns(&self) -> Vec<&str> {
        self.numeric
            .iter()
            .chain(self.categorical.iter())
            .map(|s| s.as_str())
            .collect()
    }

    /// Feature columns followed by the target
    pub fn labeled_columns(&self) -> Vec<&str> {
        let mut cols = self.feature_columns();
        cols.push(self.target.as_str());
        cols
    }

    pub fn n_features_in(&self) -> usize {
        self.numeric.len() + self.categorical.len()
    }

    pub fn is_numeric(&self, column: &str) -> bool {
        self.numeric.iter().any(|c| c == column)
    }

    /// Check that every feature column (and the target if requested) is present
    pub fn require_columns(
        &self,
        df: &DataFrame,
        with_target: bool,
        step: &'static str,
    ) -> Result<()> {
        let present: Vec<&str> = df.get_column_names().into_iter().map(|n| n.as_str()).collect();
        let required = if with_target {
            self.labeled_columns()
        } else {
            self.feature_columns()
        };

        let missing: Vec<&str> = required
            .into_iter()
            .filter(|c| !present.contains(c))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::schema_mismatch(
                step,
                format!("missing columns: {}", missing.join(", ")),
            ))
        }
    }

    /// Check that the frame holds exactly the feature columns, in canonical order
    pub fn require_exact_features(&self, df: &DataFrame, step: &'static str) -> Result<()> {
        let present: Vec<&str> = df.get_column_names().into_iter().map(|n| n.as_str()).collect();
        let expected = self.feature_columns();
        if present != expected {
            return Err(PipelineError::schema_mismatch(
                step,
                format!(
                    "expected columns [{}], got [{}]",
                    expected.join(", "),
                    present.join(", ")
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order() {
        let spec = FeatureSpec::student_performance();
        assert_eq!(
            spec.feature_columns(),
            vec![
                "writing_score",
                "reading_score",
                "gender",
                "race_ethnicity",
                "parental_level_of_education",
                "lunch",
                "test_preparation_course",
            ]
        );
        assert_eq!(spec.n_features_in(), 7);
        assert_eq!(spec.labeled_columns().last(), Some(&"math_score"));
    }

    #[test]
    fn test_require_columns_reports_missing() {
        let df = df!(
            "writing_score" => &[70.0],
            "gender" => &["female"],
        )
        .unwrap();

        let err = FeatureSpec::default()
            .require_columns(&df, false, "test")
            .unwrap_err();
        assert!(err.is(crate::error::ErrorKind::SchemaMismatch));
        assert!(err.message().contains("reading_score"));
        assert!(!err.message().contains("writing_score"));
    }

    #[test]
    fn test_exact_features_rejects_reordering() {
        let spec = FeatureSpec {
            numeric: vec!["a".into(), "b".into()],
            categorical: vec![],
            target: "y".into(),
        };
        let ordered = df!("a" => &[1.0], "b" => &[2.0]).unwrap();
        let swapped = df!("b" => &[2.0], "a" => &[1.0]).unwrap();

        assert!(spec.require_exact_features(&ordered, "test").is_ok());
        assert!(spec.require_exact_features(&swapped, "test").is_err());
    }
}
