//! Shared fixtures for the integration tests

#![allow(dead_code)]

use scorecast::inference::PredictionRequest;
use scorecast::pipeline::PipelineConfig;
use scorecast::store::ArtifactConfig;
use scorecast::training::{GradientBoostingConfig, ModelParams, SelectionConfig};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const N_ROWS: usize = 200;

pub const GENDERS: [&str; 2] = ["female", "male"];
pub const GROUPS: [&str; 5] = ["group A", "group B", "group C", "group D", "group E"];
pub const EDUCATION: [&str; 6] = [
    "associate's degree",
    "bachelor's degree",
    "high school",
    "master's degree",
    "some college",
    "some high school",
];
pub const LUNCH: [&str; 2] = ["free/reduced", "standard"];
pub const PREP: [&str; 2] = ["completed", "none"];

/// One synthetic student record
#[derive(Debug, Clone)]
pub struct Row {
    pub gender: &'static str,
    pub race_ethnicity: &'static str,
    pub education: &'static str,
    pub lunch: &'static str,
    pub prep: &'static str,
    pub math: f64,
    pub reading: f64,
    pub writing: f64,
}

/// Deterministic records where math tracks reading and writing plus a few
/// categorical offsets
pub fn rows() -> Vec<Row> {
    (0..N_ROWS)
        .map(|i| {
            let reading = 30.0 + ((i * 37) % 70) as f64;
            let writing = (reading + ((i * 13) % 11) as f64 - 5.0).clamp(0.0, 100.0);
            let gender = GENDERS[i % 2];
            let lunch = LUNCH[(i / 2) % 2];
            let prep = PREP[(i / 3) % 2];
            let mut math = 0.55 * reading + 0.35 * writing + ((i * 7) % 5) as f64 - 2.0;
            if gender == "male" {
                math += 4.0;
            }
            if lunch == "standard" {
                math += 5.0;
            }
            if prep == "completed" {
                math += 2.0;
            }
            Row {
                gender,
                race_ethnicity: GROUPS[(i * 3) % 5],
                education: EDUCATION[(i * 5) % 6],
                lunch,
                prep,
                math: math.clamp(0.0, 100.0).round(),
                reading,
                writing,
            }
        })
        .collect()
}

/// Render records as CSV in the column order of the source dataset
pub fn to_csv(rows: &[Row]) -> String {
    let mut out = String::from(
        "gender,race_ethnicity,parental_level_of_education,lunch,test_preparation_course,math_score,reading_score,writing_score\n",
    );
    for r in rows {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{}",
            r.gender, r.race_ethnicity, r.education, r.lunch, r.prep, r.math, r.reading, r.writing
        )
        .unwrap();
    }
    out
}

pub fn write_csv(dir: &Path, name: &str, rows: &[Row]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, to_csv(rows)).unwrap();
    path
}

/// Pipeline configuration with smaller ensembles to keep test runs short
pub fn fast_config(artifacts: &Path) -> PipelineConfig {
    let params = ModelParams {
        forest_n_estimators: 15,
        boosting: GradientBoostingConfig {
            n_estimators: 30,
            ..Default::default()
        },
        ..Default::default()
    };
    PipelineConfig::new()
        .with_artifacts(ArtifactConfig::default().with_root(artifacts))
        .with_selection(SelectionConfig::default().with_params(params))
}

pub fn reference_request() -> PredictionRequest {
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
