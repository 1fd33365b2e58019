//! Inference over persisted artifacts
//!
//! [`InferenceService`] is stateless: each call reads the preprocessor and
//! model from disk, builds a one-row frame from the request in canonical
//! feature order and applies the fitted transformer before the model. Callers
//! that predict many times can [`InferenceService::load`] once and share the
//! resulting [`Predictor`].

mod prediction;
mod service;

pub use prediction::{Confidence, Prediction, PredictionReport, PredictionRequest, SCORE_RANGE};
pub use service::{InferenceService, Predictor, Readiness};
