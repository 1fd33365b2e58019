//! Error types for the scorecast pipeline
//!
//! Every failure carries the kind from the pipeline taxonomy, the dotted name of
//! the step that produced it, a human readable message and, when there is one,
//! the low-level cause it wraps.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Boxed low-level cause
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error taxonomy shared by every component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Source dataset unreadable or malformed
    Ingestion,
    /// Transformer or model used before fitting
    NotFitted,
    /// Input columns do not match the feature spec
    SchemaMismatch,
    /// Category not seen while fitting, under the reject policy
    UnknownCategory,
    /// No candidate model could be fit
    Training,
    /// Artifact storage could not be read or written
    Persistence,
    /// Artifact bytes could not be decoded
    CorruptArtifact,
    /// Artifacts missing at inference time
    ModelNotReady,
    /// Request values out of range
    InvalidInput,
    /// Invalid configuration
    Config,
}

impl ErrorKind {
    /// Stable identifier for logs and JSON output
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Ingestion => "ingestion",
            ErrorKind::NotFitted => "not_fitted",
            ErrorKind::SchemaMismatch => "schema_mismatch",
            ErrorKind::UnknownCategory => "unknown_category",
            ErrorKind::Training => "training",
            ErrorKind::Persistence => "persistence",
            ErrorKind::CorruptArtifact => "corrupt_artifact",
            ErrorKind::ModelNotReady => "model_not_ready",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for the pipeline
#[derive(Error, Debug)]
#[error("{kind} error in {step}: {message}")]
pub struct PipelineError {
    kind: ErrorKind,
    step: &'static str,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl PipelineError {
    /// Create a new error without an underlying cause
    pub fn new(kind: ErrorKind, step: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            step,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the underlying cause
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn ingestion(step: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Ingestion, step, message)
    }

    pub fn not_fitted(step: &'static str) -> Self {
        Self::new(ErrorKind::NotFitted, step, "called before fit")
    }

    pub fn schema_mismatch(step: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchemaMismatch, step, message)
    }

    pub fn unknown_category(step: &'static str, column: &str, value: &str) -> Self {
        Self::new(
            ErrorKind::UnknownCategory,
            step,
            format!("category '{}' in column '{}' was not seen during fit", value, column),
        )
    }

    pub fn training(step: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Training, step, message)
    }

    pub fn persistence(step: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Persistence, step, message)
    }

    pub fn corrupt_artifact(step: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CorruptArtifact, step, message)
    }

    pub fn model_not_ready(step: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ModelNotReady, step, message)
    }

    pub fn invalid_input(step: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, step, message)
    }

    pub fn config(step: &'static str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, step, message)
    }

    /// Taxonomy kind of this error
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Dotted name of the originating step
    pub fn step(&self) -> &'static str {
        self.step
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Check the taxonomy kind
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// Re-tag the error with another kind, keeping step, message and cause
    pub(crate) fn into_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Wrap low-level errors into the pipeline taxonomy at the point they occur
pub trait ResultExt<T> {
    /// Wrap the error, using its own message
    fn wrap_err(self, kind: ErrorKind, step: &'static str) -> Result<T>;

    /// Wrap the error with a message built lazily
    fn wrap_err_with<F>(self, kind: ErrorKind, step: &'static str, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn wrap_err(self, kind: ErrorKind, step: &'static str) -> Result<T> {
        self.map_err(|e| PipelineError::new(kind, step, e.to_string()).with_source(e))
    }

    fn wrap_err_with<F>(self, kind: ErrorKind, step: &'static str, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| PipelineError::new(kind, step, f()).with_source(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err = PipelineError::ingestion("ingestion.read_source", "file not found");
        assert_eq!(
            err.to_string(),
            "ingestion error in ingestion.read_source: file not found"
        );
    }

    #[test]
    fn test_wrap_keeps_cause_and_step() {
        let io: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = io
            .wrap_err_with(ErrorKind::Persistence, "store.write", || {
                "cannot write artifacts/model.bin".to_string()
            })
            .unwrap_err();

        assert!(err.is(ErrorKind::Persistence));
        assert_eq!(err.step(), "store.write");
        assert_eq!(err.source().unwrap().to_string(), "denied");
    }

    #[test]
    fn test_kind_serialize() {
        let json = serde_json::to_string(&ErrorKind::ModelNotReady).unwrap();
        assert_eq!(json, "\"ModelNotReady\"");
        assert_eq!(ErrorKind::ModelNotReady.as_str(), "model_not_ready");
    }
}
