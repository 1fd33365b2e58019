//! Loading persisted artifacts and predicting

use super::prediction::{Prediction, PredictionRequest};
use crate::error::{ErrorKind, PipelineError, Result};
use crate::preprocessing::{CompositeTransformer, FeatureTransformer};
use crate::store::{Artifact, ArtifactConfig, ArtifactStore};
use crate::training::{CandidateModel, ModelArtifact, Regressor};
use ndarray::Array1;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// A loaded transformer and model pair.
///
/// Immutable after loading; wrap it in an `Arc` to share it between threads.
#[derive(Debug, Clone)]
pub struct Predictor {
    transformer: CompositeTransformer,
    model: ModelArtifact,
}

impl Predictor {
    /// Pair a fitted transformer with a model fit on its output
    pub fn new(transformer: CompositeTransformer, model: ModelArtifact) -> Result<Self> {
        const STEP: &str = "inference.load";
        if !transformer.is_fitted() {
            return Err(PipelineError::not_fitted(STEP));
        }
        if !model.model.is_fitted() {
            return Err(PipelineError::corrupt_artifact(STEP, "model artifact holds an unfitted model"));
        }
        let width = transformer.n_features_out();
        if model.n_features != width || model.model.n_features() != width {
            return Err(PipelineError::schema_mismatch(
                STEP,
                format!(
                    "model expects {} features but the preprocessor produces {}",
                    model.n_features, width
                ),
            ));
        }
        Ok(Self { transformer, model })
    }

    /// Validate, transform and score one request
    pub fn predict(&self, request: &PredictionRequest) -> Result<Prediction> {
        request.validate()?;
        let frame = request.to_frame(self.transformer.spec())?;
        let scores = self.predict_frame(&frame)?;
        match scores.first() {
            Some(&score) => Ok(Prediction::new(score)),
            None => Err(PipelineError::schema_mismatch("inference.predict", "model returned no prediction")),
        }
    }

    /// Score every row of a frame whose columns match the feature spec exactly
    pub fn predict_frame(&self, df: &DataFrame) -> Result<Array1<f64>> {
        self.transformer.spec().require_exact_features(df, "inference.schema")?;
        let x = self.transformer.transform(df)?;
        self.model.model.predict(&x)
    }

    pub fn transformer(&self) -> &CompositeTransformer {
        &self.transformer
    }

    pub fn model(&self) -> &ModelArtifact {
        &self.model
    }
}

/// Whether the artifacts needed for inference can be loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Readiness {
    pub ready: bool,
    pub preprocessor_path: String,
    pub model_path: String,
    /// Selected candidate, when ready
    pub model: Option<CandidateModel>,
    /// Why the service is not ready
    pub reason: Option<String>,
}

/// Stateless prediction over the artifacts under an [`ArtifactConfig`]
#[derive(Debug, Clone, Default)]
pub struct InferenceService {
    artifacts: ArtifactConfig,
    store: ArtifactStore,
}

impl InferenceService {
    pub fn new(artifacts: ArtifactConfig) -> Self {
        Self {
            artifacts,
            store: ArtifactStore::new(),
        }
    }

    pub fn artifacts(&self) -> &ArtifactConfig {
        &self.artifacts
    }

    /// Load both artifacts.
    ///
    /// A missing or unreadable file is `ModelNotReady`; a file that reads but
    /// does not decode is `CorruptArtifact`.
    pub fn load(&self) -> Result<Predictor> {
        let transformer: CompositeTransformer = self.load_artifact(&self.artifacts.preprocessor_path())?;
        let model: ModelArtifact = self.load_artifact(&self.artifacts.model_path())?;
        debug!(model = %model.candidate, score = model.score, "loaded inference artifacts");
        Predictor::new(transformer, model)
    }

    fn load_artifact<A: Artifact>(&self, path: &Path) -> Result<A> {
        if !self.store.exists(path) {
            return Err(PipelineError::model_not_ready(
                "inference.load",
                format!("{} artifact not found at {}", A::KIND, path.display()),
            ));
        }
        self.store.load(path).map_err(|e| {
            if e.is(ErrorKind::Persistence) {
                e.into_kind(ErrorKind::ModelNotReady)
            } else {
                e
            }
        })
    }

    /// Load the artifacts and predict one request
    pub fn predict(&self, request: &PredictionRequest) -> Result<Prediction> {
        request.validate()?;
        let prediction = self.load()?.predict(request)?;
        info!(
            score = prediction.score,
            confidence = %prediction.confidence,
            "Prediction served"
        );
        Ok(prediction)
    }

    /// Report whether both artifacts load, without predicting
    pub fn readiness(&self) -> Readiness {
        let (ready, model, reason) = match self.load() {
            Ok(predictor) => (true, Some(predictor.model().candidate), None),
            Err(e) => (false, None, Some(e.to_string())),
        };
        Readiness {
            ready,
            preprocessor_path: self.artifacts.preprocessor_path().display().to_string(),
            model_path: self.artifacts.model_path().display().to_string(),
            model,
            reason,
        }
    }
}
