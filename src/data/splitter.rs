//! Deterministic train/test splitting

use super::config::SplitConfig;
use super::loader::{require_rows, DataLoader, DataSaver};
use super::schema::FeatureSpec;
use crate::error::{ErrorKind, Result, ResultExt};
use crate::store::ArtifactConfig;
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, info_span};

/// Row indices of a train/test partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Frames of a train/test partition
#[derive(Debug, Clone)]
pub struct Split {
    pub train: DataFrame,
    pub test: DataFrame,
}

/// Files written by a splitter run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitPaths {
    pub raw: PathBuf,
    pub train: PathBuf,
    pub test: PathBuf,
}

/// Shuffle `0..n_samples` and hold out the first `ceil(n * test_ratio)` rows.
///
/// The held-out count is clamped so that both sides get at least one row.
pub fn split_indices(n_samples: usize, test_ratio: f64, seed: u64) -> Result<SplitIndices> {
    const STEP: &str = "ingestion.split";
    if n_samples < 2 {
        return Err(crate::error::PipelineError::ingestion(
            STEP,
            format!("dataset has {} rows, need at least 2", n_samples),
        ));
    }

    let n_test = ((n_samples as f64) * test_ratio).ceil() as usize;
    let n_test = n_test.clamp(1, n_samples - 1);

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok(SplitIndices {
        train,
        test: indices,
    })
}

/// Loads the raw dataset, keeps an audit copy and writes both splits
#[derive(Debug, Clone)]
pub struct DatasetSplitter {
    artifacts: ArtifactConfig,
    config: SplitConfig,
    spec: FeatureSpec,
    loader: DataLoader,
}

impl DatasetSplitter {
    pub fn new(artifacts: ArtifactConfig, config: SplitConfig) -> Self {
        Self {
            artifacts,
            config,
            spec: FeatureSpec::default(),
            loader: DataLoader::new(),
        }
    }

    /// Use a different column schema
    pub fn with_spec(mut self, spec: FeatureSpec) -> Self {
        self.spec = spec;
        self
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// Read the source and check it carries every schema column
    pub fn load_source(&self, source: &Path) -> Result<DataFrame> {
        let df = self.loader.load_csv(source)?;
        self.spec.require_columns(&df, true, "ingestion.validate_source")?;
        require_rows(&df, 2, "ingestion.validate_source")?;
        Ok(df)
    }

    /// Partition a frame by the configured seed and ratio
    pub fn split(&self, df: &DataFrame) -> Result<Split> {
        let indices = split_indices(df.height(), self.config.test_ratio, self.config.seed)?;
        Ok(Split {
            train: take_rows(df, &indices.train)?,
            test: take_rows(df, &indices.test)?,
        })
    }

    /// Run the whole ingestion step and return the written paths
    pub fn run(&self, source: &Path) -> Result<SplitPaths> {
        let _span = info_span!("ingestion", source = %source.display()).entered();
        self.config.validate()?;

        let df = self.load_source(source)?;
        let paths = SplitPaths {
            raw: self.artifacts.raw_path(),
            train: self.artifacts.train_path(),
            test: self.artifacts.test_path(),
        };

        let saver = DataSaver::new();
        saver.save_csv(&df, &paths.raw)?;

        let split = self.split(&df)?;
        saver.save_csv(&split.train, &paths.train)?;
        saver.save_csv(&split.test, &paths.test)?;

        info!(
            rows = df.height(),
            train_rows = split.train.height(),
            test_rows = split.test.height(),
            seed = self.config.seed,
            "split dataset"
        );
        Ok(paths)
    }
}

fn take_rows(df: &DataFrame, rows: &[usize]) -> Result<DataFrame> {
    let idx: Vec<IdxSize> = rows.iter().map(|&i| i as IdxSize).collect();
    let idx = IdxCa::from_vec("idx".into(), idx);
    df.take(&idx).wrap_err(ErrorKind::Ingestion, "ingestion.split")
}
