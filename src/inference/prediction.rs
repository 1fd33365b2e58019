//! Prediction requests and responses

use crate::data::FeatureSpec;
use crate::error::{ErrorKind, PipelineError, Result, ResultExt};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest and highest valid score
pub const SCORE_RANGE: (f64, f64) = (0.0, 100.0);

/// One student's attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub gender: String,
    pub race_ethnicity: String,
    pub parental_level_of_education: String,
    pub lunch: String,
    pub test_preparation_course: String,
    pub reading_score: f64,
    pub writing_score: f64,
}

impl PredictionRequest {
    /// Reject scores that are not finite or fall outside [0, 100]
    pub fn validate(&self) -> Result<()> {
        let (lo, hi) = SCORE_RANGE;
        for (name, value) in [("reading_score", self.reading_score), ("writing_score", self.writing_score)] {
            if !value.is_finite() || value < lo || value > hi {
                return Err(PipelineError::invalid_input(
                    "inference.validate",
                    format!("{} must be within [{}, {}], got {}", name, lo, hi, value),
                ));
            }
        }
        Ok(())
    }

    fn numeric(&self, column: &str) -> Option<f64> {
        match column {
            "reading_score" => Some(self.reading_score),
            "writing_score" => Some(self.writing_score),
            _ => None,
        }
    }

    fn categorical(&self, column: &str) -> Option<&str> {
        match column {
            "gender" => Some(self.gender.as_str()),
            "race_ethnicity" => Some(self.race_ethnicity.as_str()),
            "parental_level_of_education" => Some(self.parental_level_of_education.as_str()),
            "lunch" => Some(self.lunch.as_str()),
            "test_preparation_course" => Some(self.test_preparation_course.as_str()),
            _ => None,
        }
    }

    /// One-row frame with the spec's feature columns in spec order
    pub fn to_frame(&self, spec: &FeatureSpec) -> Result<DataFrame> {
        const STEP: &str = "inference.to_frame";
        let mut columns = Vec::with_capacity(spec.n_features_in());

        for name in spec.feature_columns() {
            let column: Column = if spec.is_numeric(name) {
                let value = self
                    .numeric(name)
                    .ok_or_else(|| unsupported_column(STEP, name))?;
                Series::new(name.into(), &[value]).into()
            } else {
                let value = self
                    .categorical(name)
                    .ok_or_else(|| unsupported_column(STEP, name))?;
                Series::new(name.into(), &[value]).into()
            };
            columns.push(column);
        }

        DataFrame::new(columns).wrap_err(ErrorKind::SchemaMismatch, STEP)
    }
}

fn unsupported_column(step: &'static str, name: &str) -> PipelineError {
    PipelineError::schema_mismatch(step, format!("request has no field for column '{}'", name))
}

/// Confidence band of a predicted score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// 80 and above is high, 60 and above is medium, anything else low
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Confidence::High
        } else if score >= 60.0 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "High",
            Confidence::Medium => "Medium",
            Confidence::Low => "Low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw model output with its band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub score: f64,
    pub confidence: Confidence,
}

impl Prediction {
    pub fn new(score: f64) -> Self {
        Self {
            score,
            confidence: Confidence::from_score(score),
        }
    }
}

/// Response handed back to a serving shell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionReport {
    /// Score rounded to two decimals
    pub predicted_math_score: f64,
    pub confidence_level: Confidence,
    pub input_data: PredictionRequest,
    pub status: String,
}

impl PredictionReport {
    pub fn new(request: PredictionRequest, prediction: Prediction) -> Self {
        Self {
            predicted_math_score: (prediction.score * 100.0).round() / 100.0,
            confidence_level: prediction.confidence,
            input_data: request,
            status: "success".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PredictionRequest {
        PredictionRequest {
            gender: "female".into(),
            race_ethnicity: "group C".into(),
            parental_level_of_education: "bachelor's degree".into(),
            lunch: "standard".into(),
            test_preparation_course: "completed".into(),
            reading_score: 85.0,
            writing_score: 88.0,
        }
    }

    #[test]
    fn test_confidence_bands() {
        assert_eq!(Confidence::from_score(80.0), Confidence::High);
        assert_eq!(Confidence::from_score(79.999), Confidence::Medium);
        assert_eq!(Confidence::from_score(60.0), Confidence::Medium);
        assert_eq!(Confidence::from_score(59.999), Confidence::Low);
        assert_eq!(Confidence::from_score(-3.0), Confidence::Low);
    }

    #[test]
    fn test_validate_range() {
        assert!(request().validate().is_ok());

        let mut bad = request();
        bad.reading_score = 100.5;
        assert!(bad.validate().unwrap_err().is(ErrorKind::InvalidInput));

        bad.reading_score = f64::NAN;
        assert!(bad.validate().is_err());

        let mut edge = request();
        edge.writing_score = 0.0;
        edge.reading_score = 100.0;
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_frame_follows_spec_order() {
        let spec = FeatureSpec::student_performance();
        let df = request().to_frame(&spec).unwrap();

        let names: Vec<&str> = df.get_column_names().into_iter().map(|n| n.as_str()).collect();
        assert_eq!(names, spec.feature_columns());
        assert_eq!(df.height(), 1);
        assert!(spec.require_exact_features(&df, "test").is_ok());
    }

    #[test]
    fn test_unknown_spec_column() {
        let mut spec = FeatureSpec::student_performance();
        spec.numeric.push("art_score".into());
        let err = request().to_frame(&spec).unwrap_err();
        assert!(err.is(ErrorKind::SchemaMismatch));
    }

    #[test]
    fn test_report_rounding() {
        let report = PredictionReport::new(request(), Prediction::new(81.23456));
        assert_eq!(report.predicted_math_score, 81.23);
        assert_eq!(report.confidence_level, Confidence::High);
        assert_eq!(report.status, "success");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["confidence_level"], "High");
        assert_eq!(json["input_data"]["lunch"], "standard");
    }
}
