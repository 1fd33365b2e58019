//! CSV loading and saving

use super::schema::FeatureSpec;
use crate::error::{ErrorKind, PipelineError, Result, ResultExt};
use polars::prelude::*;
use serde::Serialize;
use std::fs::{self, File};
use std::path::Path;
use tracing::debug;

/// Rows shown by [`DataLoader::describe`]
const PREVIEW_ROWS: usize = 5;

/// Reads tabular sources into data frames
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows scanned for schema inference; `None` scans the whole file
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Loader that infers column types from every row, so a decimal score
    /// deep in the file still makes its column `Float64`
    pub fn new() -> Self {
        Self {
            infer_schema_length: None,
        }
    }

    /// Limit schema inference to the first `rows` rows
    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = Some(rows.max(1));
        self
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: &Path) -> Result<DataFrame> {
        let file = File::open(path).wrap_err_with(ErrorKind::Ingestion, "ingestion.read_source", || {
            format!("cannot open {}", path.display())
        })?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .into_reader_with_file_handle(file)
            .finish()
            .wrap_err_with(ErrorKind::Ingestion, "ingestion.parse_source", || {
                format!("cannot parse {}", path.display())
            })?;

        debug!(path = %path.display(), rows = df.height(), cols = df.width(), "loaded csv");
        Ok(df)
    }

    /// Load a CSV file and coerce it to the feature schema
    pub fn load_labeled(&self, path: &Path, spec: &FeatureSpec) -> Result<DataFrame> {
        let df = self.load_csv(path)?;
        normalize_frame(&df, spec, true)
    }

    /// Summarize a CSV file
    pub fn describe(&self, path: &Path) -> Result<DatasetInfo> {
        let df = self.load_csv(path)?;
        let columns = df
            .get_columns()
            .iter()
            .map(|c| ColumnInfo {
                name: c.name().to_string(),
                dtype: c.dtype().to_string(),
                null_count: c.null_count(),
            })
            .collect();

        Ok(DatasetInfo {
            path: path.display().to_string(),
            n_rows: df.height(),
            n_cols: df.width(),
            columns,
            preview: df.head(Some(PREVIEW_ROWS)).to_string(),
        })
    }
}

/// Writes data frames as CSV
#[derive(Debug, Clone, Default)]
pub struct DataSaver;

impl DataSaver {
    pub fn new() -> Self {
        Self
    }

    /// Save a frame as CSV with a header row, creating parent directories
    pub fn save_csv(&self, df: &DataFrame, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).wrap_err_with(ErrorKind::Persistence, "ingestion.create_dir", || {
                format!("cannot create {}", parent.display())
            })?;
        }

        let mut file = File::create(path).wrap_err_with(ErrorKind::Persistence, "ingestion.write_csv", || {
            format!("cannot create {}", path.display())
        })?;

        let mut df = df.clone();
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)
            .wrap_err_with(ErrorKind::Persistence, "ingestion.write_csv", || {
                format!("cannot write {}", path.display())
            })?;

        debug!(path = %path.display(), rows = df.height(), "wrote csv");
        Ok(())
    }
}

/// Summary of a tabular source
#[derive(Debug, Clone, Serialize)]
pub struct DatasetInfo {
    pub path: String,
    pub n_rows: usize,
    pub n_cols: usize,
    pub columns: Vec<ColumnInfo>,
    /// Table rendering of the first rows
    pub preview: String,
}

/// Per-column summary
#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub dtype: String,
    pub null_count: usize,
}

/// Select the schema columns and coerce their types.
///
/// Numeric columns (and the target) become `Float64` through a strict cast,
/// so a value that cannot be read as a number is a schema mismatch rather
/// than a silent null. Categorical columns become `String`.
pub fn normalize_frame(df: &DataFrame, spec: &FeatureSpec, with_target: bool) -> Result<DataFrame> {
    const STEP: &str = "ingestion.normalize";
    spec.require_columns(df, with_target, STEP)?;

    let mut names = spec.feature_columns();
    if with_target {
        names.push(spec.target.as_str());
    }

    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        let column = df
            .column(name)
            .wrap_err(ErrorKind::SchemaMismatch, STEP)?;

        let numeric = name == spec.target || spec.is_numeric(name);
        let target_type = if numeric { DataType::Float64 } else { DataType::String };

        let cast = if numeric && column.dtype() == &DataType::String {
            // Strings that do not parse as numbers must surface as an error
            column.strict_cast(&target_type)
        } else {
            column.cast(&target_type)
        }
        .wrap_err_with(ErrorKind::SchemaMismatch, STEP, || {
            format!("column '{}' cannot be read as {}", name, target_type)
        })?;

        columns.push(cast);
    }

    DataFrame::new(columns).wrap_err(ErrorKind::SchemaMismatch, STEP)
}

/// Ensure a frame has at least one row
pub(crate) fn require_rows(df: &DataFrame, min: usize, step: &'static str) -> Result<()> {
    if df.height() < min {
        return Err(PipelineError::ingestion(
            step,
            format!("dataset has {} rows, need at least {}", df.height(), min),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_frame() -> DataFrame {
        df!(
            "gender" => &["female", "male"],
            "race_ethnicity" => &["group B", "group C"],
            "parental_level_of_education" => &["bachelor's degree", "some college"],
            "lunch" => &["standard", "free/reduced"],
            "test_preparation_course" => &["none", "completed"],
            "math_score" => &[72i64, 69],
            "reading_score" => &[72i64, 90],
            "writing_score" => &[74i64, 88],
        )
        .unwrap()
    }

    #[test]
    fn test_save_and_load_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("raw.csv");

        DataSaver::new().save_csv(&sample_frame(), &path).unwrap();
        let loaded = DataLoader::new().load_csv(&path).unwrap();

        assert_eq!(loaded.height(), 2);
        assert_eq!(loaded.width(), 8);
    }

    #[test]
    fn test_missing_file_is_ingestion_error() {
        let err = DataLoader::new()
            .load_csv(Path::new("/nonexistent/path/data.csv"))
            .unwrap_err();
        assert!(err.is(ErrorKind::Ingestion));
        assert_eq!(err.step(), "ingestion.read_source");
    }

    #[test]
    fn test_normalize_orders_and_casts() {
        let spec = FeatureSpec::student_performance();
        let df = normalize_frame(&sample_frame(), &spec, true).unwrap();

        let names: Vec<&str> = df.get_column_names().into_iter().map(|n| n.as_str()).collect();
        assert_eq!(names, spec.labeled_columns());
        assert_eq!(df.column("writing_score").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("math_score").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("gender").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_normalize_rejects_non_numeric_scores() {
        let mut df = sample_frame();
        df.replace("reading_score", Series::new("reading_score".into(), &["72", "ninety"]))
            .unwrap();

        let err = normalize_frame(&df, &FeatureSpec::default(), true).unwrap_err();
        assert!(err.is(ErrorKind::SchemaMismatch));
    }

    #[test]
    fn test_describe_counts_nulls() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "a,b\n1,x\n,y\n3,\n").unwrap();

        let info = DataLoader::new().describe(&path).unwrap();
        assert_eq!(info.n_rows, 3);
        assert_eq!(info.n_cols, 2);
        assert_eq!(info.columns[0].null_count, 1);
        assert!(info.preview.contains('a'));
        assert!(info.preview.contains('y'));
    }

    #[test]
    fn test_late_decimal_score_is_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("late.csv");

        let mut text = String::from(
            "gender,race_ethnicity,parental_level_of_education,lunch,test_preparation_course,math_score,reading_score,writing_score\n",
        );
        for i in 0..200 {
            text.push_str(&format!("female,group B,some college,standard,none,{},{},{}\n", 50 + i % 40, 60 + i % 30, 55 + i % 35));
        }
        text.push_str("male,group C,high school,standard,none,61,72.5,70\n");
        std::fs::write(&path, text).unwrap();

        let df = DataLoader::new().load_labeled(&path, &FeatureSpec::default()).unwrap();
        assert_eq!(df.height(), 201);
        let reading = df.column("reading_score").unwrap().f64().unwrap();
        assert_eq!(reading.get(200), Some(72.5));
    }
}
