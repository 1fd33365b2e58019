//! Offline training path: split, fit the transformer, select a model, persist

use super::config::PipelineConfig;
use crate::data::{normalize_frame, DataLoader, DatasetSplitter, FeatureSpec, SplitPaths};
use crate::error::{ErrorKind, PipelineError, Result, ResultExt};
use crate::preprocessing::{CompositeTransformer, FeatureTransformer};
use crate::store::ArtifactStore;
use crate::training::{CandidateModel, LeaderboardEntry, ModelArtifact, ModelSelector, Verdict};
use ndarray::Array1;
use polars::prelude::DataFrame;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, info_span};

/// Summary of a finished training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub splits: SplitPaths,
    pub preprocessor_path: PathBuf,
    pub model_path: PathBuf,
    pub n_train: usize,
    pub n_test: usize,
    pub feature_names: Vec<String>,
    pub selected: CandidateModel,
    /// Test R² of the selected model
    pub score: f64,
    pub verdict: Verdict,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub elapsed_seconds: f64,
}

/// Runs the training stages in order against one [`PipelineConfig`]
#[derive(Debug, Clone)]
pub struct TrainingPipeline {
    config: PipelineConfig,
    spec: FeatureSpec,
    loader: DataLoader,
    store: ArtifactStore,
}

impl TrainingPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            spec: FeatureSpec::default(),
            loader: DataLoader::new(),
            store: ArtifactStore::new(),
        }
    }

    /// Use a different column schema
    pub fn with_spec(mut self, spec: FeatureSpec) -> Self {
        self.spec = spec;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Split `source`, then train from the written splits
    pub fn run(&self, source: &Path) -> Result<TrainingReport> {
        let start = Instant::now();
        self.config.validate()?;

        let splits = DatasetSplitter::new(self.config.artifacts.clone(), self.config.split.clone())
            .with_spec(self.spec.clone())
            .run(source)?;

        let mut report = self.train_from_splits(&splits)?;
        report.elapsed_seconds = start.elapsed().as_secs_f64();

        info!(
            model = %report.selected,
            r2 = report.score,
            verdict = %report.verdict,
            elapsed_seconds = report.elapsed_seconds,
            "Training run finished"
        );
        Ok(report)
    }

    /// Fit the transformer on the train split, select a model and persist both.
    ///
    /// Nothing is written unless selection succeeds, so a failed run leaves the
    /// previous preprocessor and model in place.
    pub fn train_from_splits(&self, splits: &SplitPaths) -> Result<TrainingReport> {
        let start = Instant::now();
        let train = self.loader.load_labeled(&splits.train, &self.spec)?;
        let test = self.loader.load_labeled(&splits.test, &self.spec)?;

        let (transformer, x_train, x_test) = {
            let _span = info_span!("transformation").entered();
            let train_features = normalize_frame(&train, &self.spec, false)?;
            let test_features = normalize_frame(&test, &self.spec, false)?;

            let mut transformer = CompositeTransformer::new(self.spec.clone(), self.config.transform.clone());
            let x_train = transformer.fit_transform(&train_features)?;
            let x_test = transformer.transform(&test_features)?;

            info!(
                train_rows = x_train.nrows(),
                test_rows = x_test.nrows(),
                features = x_train.ncols(),
                "Fitted preprocessor"
            );
            (transformer, x_train, x_test)
        };

        let y_train = target(&train, &self.spec)?;
        let y_test = target(&test, &self.spec)?;

        let artifact = {
            let _span = info_span!("selection").entered();
            let outcome = ModelSelector::new(self.config.selection.clone()).select(&x_train, &y_train, &x_test, &y_test)?;
            ModelArtifact::from_outcome(outcome)
        };

        // Both halves replace the previous pair together
        {
            let _span = info_span!("persistence").entered();
            let preprocessor = self.store.stage(&self.config.artifacts.preprocessor_path(), &transformer)?;
            let model = self.store.stage(&self.config.artifacts.model_path(), &artifact)?;
            self.store.commit(vec![preprocessor, model])?;
            info!(model = %artifact.candidate, r2 = artifact.score, "Saved preprocessor and model");
        }

        Ok(TrainingReport {
            splits: splits.clone(),
            preprocessor_path: self.config.artifacts.preprocessor_path(),
            model_path: self.config.artifacts.model_path(),
            n_train: x_train.nrows(),
            n_test: x_test.nrows(),
            feature_names: transformer.feature_names_out(),
            selected: artifact.candidate,
            score: artifact.score,
            verdict: artifact.verdict,
            leaderboard: artifact.leaderboard,
            elapsed_seconds: start.elapsed().as_secs_f64(),
        })
    }
}

/// Target column as a dense vector; missing targets are rejected
fn target(df: &DataFrame, spec: &FeatureSpec) -> Result<Array1<f64>> {
    const STEP: &str = "training.target";
    let column = df
        .column(&spec.target)
        .wrap_err(ErrorKind::SchemaMismatch, STEP)?;
    let ca = column.f64().wrap_err(ErrorKind::SchemaMismatch, STEP)?;

    ca.into_iter()
        .map(|v| {
            v.ok_or_else(|| {
                PipelineError::schema_mismatch(STEP, format!("column '{}' has missing values", spec.target))
            })
        })
        .collect::<Result<Vec<f64>>>()
        .map(Array1::from_vec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn test_target_rejects_nulls() {
        let spec = FeatureSpec::default();
        let ok = df!("math_score" => &[Some(70.0), Some(55.0)]).unwrap();
        assert_eq!(target(&ok, &spec).unwrap().to_vec(), vec![70.0, 55.0]);

        let missing = df!("math_score" => &[Some(70.0), None]).unwrap();
        assert!(target(&missing, &spec).unwrap_err().is(ErrorKind::SchemaMismatch));
    }
}
