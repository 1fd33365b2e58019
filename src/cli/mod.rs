//! scorecast CLI module
//!
//! Thin command-line shell over the training pipeline and inference service.

use clap::{Parser, Subcommand};
use colored::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::data::DataLoader;
use crate::inference::{InferenceService, PredictionReport, PredictionRequest};
use crate::pipeline::{PipelineConfig, TrainingPipeline, TrainingReport};
use crate::preprocessing::FeatureTransformer;
use crate::training::{CandidateModel, LeaderboardEntry, Verdict};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn muted(s: &str) -> ColoredString { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "scorecast")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train and serve a student math score predictor")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Split the data, fit the preprocessor, select and save a model
    Train {
        /// Raw CSV dataset
        #[arg(short, long)]
        data: PathBuf,

        /// Artifact directory (overrides the config file)
        #[arg(short, long)]
        artifacts: Option<PathBuf>,

        /// JSON pipeline configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Seed for the split and every randomized candidate
        #[arg(long)]
        seed: Option<u64>,

        /// Fail when the best model is below the acceptance threshold
        #[arg(long)]
        strict: bool,
    },

    /// Predict the math score of one student
    Predict {
        #[arg(long)]
        gender: String,

        #[arg(long = "race-ethnicity")]
        race_ethnicity: String,

        #[arg(long = "parental-education")]
        parental_education: String,

        #[arg(long)]
        lunch: String,

        #[arg(long = "test-prep")]
        test_prep: String,

        /// Reading score in [0, 100]
        #[arg(long)]
        reading: f64,

        /// Writing score in [0, 100]
        #[arg(long)]
        writing: f64,

        /// Artifact directory (overrides the config file)
        #[arg(short, long)]
        artifacts: Option<PathBuf>,

        /// JSON pipeline configuration used at training time
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Check that the saved artifacts can be loaded
    Health {
        #[arg(short, long)]
        artifacts: Option<PathBuf>,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show row, column and null counts of a dataset
    Info {
        #[arg(short, long)]
        data: PathBuf,
    },

    /// Show metadata of the saved model
    ModelInfo {
        #[arg(short, long)]
        artifacts: Option<PathBuf>,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

/// Load the pipeline configuration shared by every command.
///
/// `--artifacts` wins over the root in the file, so all commands resolve the
/// same artifact file names.
pub fn load_config(config_path: Option<&Path>, artifacts: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let mut config = match config_path {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(root) = artifacts {
        config.artifacts = config.artifacts.with_root(root);
    }
    Ok(config)
}

pub fn cmd_train(
    data_path: &Path,
    artifacts: Option<&Path>,
    config_path: Option<&Path>,
    seed: Option<u64>,
    strict: bool,
) -> anyhow::Result<TrainingReport> {
    let mut config = load_config(config_path, artifacts)?;
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }

    let report = TrainingPipeline::new(config).run(data_path)?;
    print_training_report(&report);

    if strict && report.verdict == Verdict::BelowThreshold {
        anyhow::bail!(
            "best model {} scored r2 {:.4}, below the acceptance threshold",
            report.selected,
            report.score
        );
    }
    Ok(report)
}

fn print_training_report(report: &TrainingReport) {
    section("Train");

    println!("  {:<16} {}", muted("Train rows"), report.n_train);
    println!("  {:<16} {}", muted("Test rows"), report.n_test);
    println!("  {:<16} {}", muted("Features"), report.feature_names.len());
    println!();

    print_leaderboard(&report.leaderboard, report.selected);

    let verdict = match report.verdict {
        Verdict::Accepted => ok("accepted"),
        Verdict::BelowThreshold => "below threshold".yellow(),
    };
    println!();
    println!(
        "  {} {} {} {:.4} {}",
        ok("best"),
        report.selected.name().white().bold(),
        muted("R²:"),
        report.score,
        verdict
    );
    println!("  {:<16} {}", muted("Preprocessor"), report.preprocessor_path.display());
    println!("  {:<16} {}", muted("Model"), report.model_path.display());
    println!("  {:<16} {:.3}s", muted("Time"), report.elapsed_seconds);
    println!();
}

fn print_leaderboard(leaderboard: &[LeaderboardEntry], selected: CandidateModel) {
    println!(
        "  {:<20} {:>10} {:>10} {:>10} {:>9}",
        muted("Model"),
        muted("R²"),
        muted("RMSE"),
        muted("MAE"),
        muted("Time")
    );
    println!("  {}", dim(&"─".repeat(63)));

    for entry in leaderboard {
        let marker = if entry.candidate == selected { ok("›") } else { dim(" ") };
        match (&entry.metrics, &entry.error) {
            (Some(m), _) => println!(
                "{} {:<20} {:>10.4} {:>10.4} {:>10.4} {:>8.2}s",
                marker,
                entry.candidate.name(),
                m.r2,
                m.rmse,
                m.mae,
                entry.fit_seconds
            ),
            (None, error) => println!(
                "{} {:<20} {}",
                marker,
                entry.candidate.name(),
                format!("err: {}", error.as_deref().unwrap_or("unknown")).red()
            ),
        }
    }
}

/// Build the request from CLI flags
pub fn build_request(
    gender: &str,
    race_ethnicity: &str,
    parental_education: &str,
    lunch: &str,
    test_prep: &str,
    reading: f64,
    writing: f64,
) -> PredictionRequest {
    PredictionRequest {
        gender: gender.to_string(),
        race_ethnicity: race_ethnicity.to_string(),
        parental_level_of_education: parental_education.to_string(),
        lunch: lunch.to_string(),
        test_preparation_course: test_prep.to_string(),
        reading_score: reading,
        writing_score: writing,
    }
}

pub fn cmd_predict(
    request: PredictionRequest,
    artifacts: Option<&Path>,
    config_path: Option<&Path>,
) -> anyhow::Result<PredictionReport> {
    let service = InferenceService::new(load_config(config_path, artifacts)?.artifacts);
    let prediction = service.predict(&request)?;
    let report = PredictionReport::new(request, prediction);
    print_json(&report)?;
    Ok(report)
}

/// Print readiness and return whether the artifacts are usable
pub fn cmd_health(artifacts: Option<&Path>, config_path: Option<&Path>) -> anyhow::Result<bool> {
    let service = InferenceService::new(load_config(config_path, artifacts)?.artifacts);
    let readiness = service.readiness();
    print_json(&readiness)?;
    Ok(readiness.ready)
}

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Data Info");

    let info = DataLoader::new().describe(data_path)?;

    println!("  {:<12} {}", muted("File"), info.path);
    println!("  {:<12} {}", muted("Rows"), info.n_rows);
    println!("  {:<12} {}", muted("Columns"), info.n_cols);
    println!();

    println!("  {:<32} {:<12} {:>6}", muted("Column"), muted("Type"), muted("Nulls"));
    println!("  {}", dim(&"─".repeat(52)));

    for col in &info.columns {
        println!(
            "  {:<32} {:<12} {:>6}",
            col.name,
            col.dtype.as_str().truecolor(140, 140, 140),
            col.null_count
        );
    }

    println!();
    for line in info.preview.lines() {
        println!("  {}", line);
    }
    println!();
    Ok(())
}

#[derive(Serialize)]
struct ModelInfo<'a> {
    candidate: CandidateModel,
    metric: &'a str,
    score: f64,
    verdict: Verdict,
    n_features: usize,
    trained_at: String,
    feature_names: Vec<String>,
    leaderboard: &'a [LeaderboardEntry],
}

pub fn cmd_model_info(artifacts: Option<&Path>, config_path: Option<&Path>) -> anyhow::Result<()> {
    let service = InferenceService::new(load_config(config_path, artifacts)?.artifacts);
    let predictor = service.load()?;
    let model = predictor.model();

    print_json(&ModelInfo {
        candidate: model.candidate,
        metric: &model.metric,
        score: model.score,
        verdict: model.verdict,
        n_features: model.n_features,
        trained_at: model.trained_at.to_rfc3339(),
        feature_names: predictor.transformer().feature_names_out(),
        leaderboard: &model.leaderboard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ArtifactConfig;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_predict() {
        let cli = Cli::try_parse_from([
            "scorecast",
            "predict",
            "--gender",
            "female",
            "--race-ethnicity",
            "group C",
            "--parental-education",
            "bachelor's degree",
            "--lunch",
            "standard",
            "--test-prep",
            "completed",
            "--reading",
            "85",
            "--writing",
            "88",
        ])
        .unwrap();

        match cli.command {
            Commands::Predict { reading, writing, artifacts, .. } => {
                assert_eq!(reading, 85.0);
                assert_eq!(writing, 88.0);
                assert_eq!(artifacts, None);
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn test_health_on_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!cmd_health(Some(dir.path()), None).unwrap());
    }

    #[test]
    fn test_load_config_keeps_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(&path, r#"{"artifacts": {"root": "out", "model_file": "best.bin"}}"#).unwrap();

        let config = load_config(Some(path.as_path()), None).unwrap();
        assert_eq!(config.artifacts.model_path(), PathBuf::from("out/best.bin"));

        let config = load_config(Some(path.as_path()), Some(Path::new("elsewhere"))).unwrap();
        assert_eq!(config.artifacts.model_path(), PathBuf::from("elsewhere/best.bin"));

        let config = load_config(None, None).unwrap();
        assert_eq!(config.artifacts, ArtifactConfig::default());
    }
}
