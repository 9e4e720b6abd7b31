//! Configuration values for the detection engine and the geometry pipeline.
//!
//! Every struct deserializes with defaults for missing fields, so a TOML file
//! only needs to name what it overrides:
//!
//! ```toml
//! image_width = 512
//!
//! [inference]
//! image_min_dim = 512
//! image_max_dim = 512
//! ```

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{FootprintError, Result};

/// Side length, in pixels, of the square images the georeferencer assumes.
pub const DEFAULT_IMAGE_WIDTH: u32 = 320;
/// Pixel size of one mosaic tile.
pub const DEFAULT_TILE_SIZE: u32 = 256;
/// Category attached to every annotation record.
pub const DEFAULT_CATEGORY_ID: u32 = 100;

/// Fixed inference parameters handed to the detection engine once, at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct InferenceConfig {
    /// Number of accelerators the engine may use
    #[schemars(range(min = 1))]
    pub gpu_count: u32,
    /// Images processed per accelerator in one call
    #[schemars(range(min = 1))]
    pub images_per_gpu: u32,
    /// Smallest image side the engine is tuned for
    pub image_min_dim: u32,
    /// Largest image side the engine is tuned for
    pub image_max_dim: u32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            gpu_count: 1,
            images_per_gpu: 1,
            image_min_dim: 320,
            image_max_dim: 320,
        }
    }
}

impl InferenceConfig {
    /// Images per engine invocation, `None` when the product overflows.
    pub fn batch_size(&self) -> Option<u32> {
        self.gpu_count.checked_mul(self.images_per_gpu)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size() != Some(1) {
            return Err(FootprintError::InvalidConfig(format!(
                "detection runs one image per call, got {} gpus x {} images",
                self.gpu_count, self.images_per_gpu
            )));
        }
        if self.image_min_dim == 0 || self.image_min_dim > self.image_max_dim {
            return Err(FootprintError::InvalidConfig(format!(
                "image_min_dim {} must be positive and not exceed image_max_dim {}",
                self.image_min_dim, self.image_max_dim
            )));
        }
        Ok(())
    }
}

/// Tolerances for the rectilinear simplification stage, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RectangularizeConfig {
    /// Douglas-Peucker tolerance used to collapse stair-stepped edges
    #[schemars(range(min = 0.0, max = 50.0))]
    pub simplify_tolerance: f64,
    /// Axis-aligned runs shorter than this are folded into their neighbours
    #[schemars(range(min = 0.0, max = 50.0))]
    pub min_edge_length: f64,
    /// Largest relative area change accepted from axis snapping; beyond it the
    /// simplified ring is kept as is
    #[schemars(range(min = 0.0, max = 1.0))]
    pub max_area_change: f64,
}

impl Default for RectangularizeConfig {
    fn default() -> Self {
        Self {
            simplify_tolerance: 1.5,
            min_edge_length: 2.0,
            max_area_change: 0.1,
        }
    }
}

impl RectangularizeConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("simplify_tolerance", self.simplify_tolerance),
            ("min_edge_length", self.min_edge_length),
            ("max_area_change", self.max_area_change),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(FootprintError::InvalidConfig(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Everything the predictor needs besides the engine itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PredictorConfig {
    /// Square pixel side the extent of a prediction corresponds to
    pub image_width: u32,
    /// Pixel size of one mosaic tile
    pub tile_size: u32,
    /// Category id written into annotation records
    pub category_id: u32,
    pub inference: InferenceConfig,
    pub rectangularization: RectangularizeConfig,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            image_width: DEFAULT_IMAGE_WIDTH,
            tile_size: DEFAULT_TILE_SIZE,
            category_id: DEFAULT_CATEGORY_ID,
            inference: InferenceConfig::default(),
            rectangularization: RectangularizeConfig::default(),
        }
    }
}

impl PredictorConfig {
    pub fn validate(&self) -> Result<()> {
        self.inference.validate()?;
        self.rectangularization.validate()?;
        if self.image_width == 0 {
            return Err(FootprintError::InvalidConfig(
                "image_width must be positive".to_string(),
            ));
        }
        if self.tile_size == 0 {
            return Err(FootprintError::InvalidConfig(
                "tile_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the JSON schema of the configuration file
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(PredictorConfig)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load from a `.toml` or `.json` file, chosen by extension
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&content),
            Some("json") => Self::from_json(&content),
            _ => Err(FootprintError::InvalidConfig(format!(
                "unsupported config format for {}, use .toml or .json",
                path.display()
            ))),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
