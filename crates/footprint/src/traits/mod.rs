use std::path::Path;

use image::DynamicImage;

use crate::{
    config::InferenceConfig,
    error::Result,
    types::{Detection, Mask, Outline},
};

/// Trait for contour extraction algorithms
pub trait ContourExtractor: Send + Sync {
    /// Trace the outer boundary of a mask's foreground, empty for an empty mask
    fn extract_contour(&self, mask: &Mask) -> Result<Outline>;
}

/// Trait for outline simplification algorithms
pub trait OutlineSimplifier: Send + Sync {
    /// Simplify an outline without ever adding vertices
    fn simplify(&self, outline: &Outline) -> Result<Outline>;
}

/// Instance segmentation backend: one image in, per-object masks and scores out.
pub trait DetectionEngine: Send + Sync {
    /// Detections in the engine's own emission order
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>>;
}

/// Builds a detection engine from a weights file.
///
/// Loading may be expensive, so the predictor calls it at most once.
pub trait EngineLoader: Send + Sync {
    type Engine: DetectionEngine;

    fn load(&self, weights_path: &Path, config: InferenceConfig) -> Result<Self::Engine>;
}
