use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FootprintError {
    #[error("Weights cannot be found at: {}", .0.display())]
    WeightsNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load detection engine: {0}")]
    EngineLoad(String),

    #[error("Detection failed: {0}")]
    Detection(String),

    #[error("Cannot derive an image id from {}", .0.display())]
    InvalidImageId(PathBuf),

    #[error("Invalid extent: {0}")]
    InvalidExtent(String),

    #[error("Invalid tile index: {0}")]
    InvalidTile(String),

    #[error("Invalid GeoJSON: {0}")]
    InvalidGeoJson(String),

    #[error("Mask data has {actual} cells, expected {expected}")]
    MaskSize { expected: usize, actual: usize },

    #[error("Failed to load image: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),
}

pub type Result<T> = std::result::Result<T, FootprintError>;
