use footprint::{FootprintError, PredictorConfig};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    Footprint(#[from] FootprintError),
    #[error("Either --job or all of --weights, --images and --output are required")]
    IncompleteJob,
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

fn default_image_extension() -> String {
    "jpg".to_string()
}

/// Batch annotation job: every numbered image below `images_dir` becomes
/// records in `output`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct AnnotateJob {
    /// Engine weights file
    pub weights: PathBuf,
    pub images_dir: PathBuf,
    /// JSON file the annotation records are written to
    pub output: PathBuf,
    #[serde(default = "default_image_extension")]
    pub image_extension: String,
    #[serde(default)]
    pub predictor: PredictorConfig,
}

impl AnnotateJob {
    pub fn new(weights: impl Into<PathBuf>, images_dir: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            weights: weights.into(),
            images_dir: images_dir.into(),
            output: output.into(),
            image_extension: default_image_extension(),
            predictor: PredictorConfig::default(),
        }
    }

    /// Load AnnotateJob configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load AnnotateJob configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        let job: AnnotateJob = toml::from_str(content)?;
        job.predictor.validate()?;
        Ok(job)
    }

    /// Load AnnotateJob configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load AnnotateJob configuration from JSON string
    pub fn from_json(content: &str) -> Result<Self, CliError> {
        let job: AnnotateJob = serde_json::from_str(content)?;
        job.predictor.validate()?;
        Ok(job)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(CliError::UnsupportedFileFormat),
        }
    }

    /// Convert AnnotateJob to TOML string
    pub fn to_toml(&self) -> Result<String, CliError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    /// Convert AnnotateJob to JSON string
    pub fn to_json(&self) -> Result<String, CliError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }

    /// Get the JSON schema of job files
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AnnotateJob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_job() {
        let job = AnnotateJob::from_toml(
            r#"
weights = "model/engine.toml"
images_dir = "data/test"
output = "predictions.json"
"#,
        )
        .unwrap();
        assert_eq!(job, AnnotateJob::new("model/engine.toml", "data/test", "predictions.json"));
        assert_eq!(job.image_extension, "jpg");
        assert_eq!(job.predictor.category_id, 100);
    }

    #[test]
    fn test_predictor_overrides() {
        let job = AnnotateJob::from_toml(
            r#"
weights = "w.toml"
images_dir = "imgs"
output = "out.json"
image_extension = "png"

[predictor]
category_id = 7

[predictor.rectangularization]
min_edge_length = 4.0
"#,
        )
        .unwrap();
        assert_eq!(job.image_extension, "png");
        assert_eq!(job.predictor.category_id, 7);
        assert_eq!(job.predictor.rectangularization.min_edge_length, 4.0);
        assert_eq!(job.predictor.tile_size, 256);
    }

    #[test]
    fn test_invalid_predictor_is_rejected() {
        let result = AnnotateJob::from_json(
            r#"{"weights": "w", "images_dir": "i", "output": "o", "predictor": {"tile_size": 0}}"#,
        );
        assert!(matches!(result, Err(CliError::Footprint(FootprintError::InvalidConfig(_)))));
    }

    #[test]
    fn test_toml_and_json_agree() {
        let job = AnnotateJob::new("w.toml", "imgs", "out.json");
        assert_eq!(AnnotateJob::from_toml(&job.to_toml().unwrap()).unwrap(), job);
        assert_eq!(AnnotateJob::from_json(&job.to_json().unwrap()).unwrap(), job);
    }

    #[test]
    fn test_unknown_extension() {
        assert!(matches!(
            AnnotateJob::from_file("job.yaml"),
            Err(CliError::UnsupportedFileFormat)
        ));
    }
}
