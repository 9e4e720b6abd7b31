use std::path::Path;

use image::{DynamicImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    config::InferenceConfig,
    error::{FootprintError, Result},
    traits::{DetectionEngine, EngineLoader},
    types::{Detection, Mask},
};

/// Parameters of the component engine, read from its "weights" file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ComponentEngineParams {
    /// Intensities strictly above this value are foreground
    pub threshold: u8,
    /// Components with fewer pixels are not reported
    pub min_area: u32,
}

impl Default for ComponentEngineParams {
    fn default() -> Self {
        Self {
            threshold: 127,
            min_area: 16,
        }
    }
}

/// Detection engine for pre-rendered segmentation rasters.
///
/// Treats the input as a per-pixel building probability map: every
/// 8-connected component above the threshold becomes one instance, scored by
/// its mean intensity. Instances come out in label order, i.e. raster order
/// of each component's first pixel.
#[derive(Debug, Clone)]
pub struct ComponentEngine {
    params: ComponentEngineParams,
    config: InferenceConfig,
}

impl ComponentEngine {
    pub fn new(params: ComponentEngineParams, config: InferenceConfig) -> Self {
        Self { params, config }
    }

    pub fn params(&self) -> &ComponentEngineParams {
        &self.params
    }

    fn check_dimensions(&self, width: u32, height: u32) {
        let (short, long) = (width.min(height), width.max(height));
        if short < self.config.image_min_dim || long > self.config.image_max_dim {
            warn!(
                width,
                height,
                min_dim = self.config.image_min_dim,
                max_dim = self.config.image_max_dim,
                "image size is outside the configured inference range"
            );
        }
    }
}

impl DetectionEngine for ComponentEngine {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let gray = image.to_luma8();
        let (width, height) = gray.dimensions();
        self.check_dimensions(width, height);

        let binary = imageproc::contrast::threshold(&gray, self.params.threshold);
        let labels = connected_components(&binary, Connectivity::Eight, Luma([0u8]));
        let count = labels.pixels().map(|p| p[0]).max().unwrap_or(0) as usize;

        let mut areas = vec![0u64; count + 1];
        let mut intensities = vec![0u64; count + 1];
        for (x, y, label) in labels.enumerate_pixels() {
            let label = label[0] as usize;
            if label == 0 {
                continue;
            }
            areas[label] += 1;
            intensities[label] += u64::from(gray.get_pixel(x, y)[0]);
        }

        let detections: Vec<Detection> = (1..=count)
            .filter(|&label| areas[label] >= u64::from(self.params.min_area))
            .map(|label| {
                let mask = Mask::from_fn(width, height, |x, y| {
                    labels.get_pixel(x, y)[0] as usize == label
                });
                let score = intensities[label] as f64 / (areas[label] as f64 * 255.0);
                Detection::new(mask, score as f32)
            })
            .collect();

        debug!(components = count, detections = detections.len(), "component detection done");
        Ok(detections)
    }
}

/// Loads [`ComponentEngineParams`] from a TOML file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentEngineLoader;

impl EngineLoader for ComponentEngineLoader {
    type Engine = ComponentEngine;

    fn load(&self, weights_path: &Path, config: InferenceConfig) -> Result<ComponentEngine> {
        let content = std::fs::read_to_string(weights_path).map_err(|e| {
            FootprintError::EngineLoad(format!("{}: {e}", weights_path.display()))
        })?;
        let params: ComponentEngineParams = toml::from_str(&content).map_err(|e| {
            FootprintError::EngineLoad(format!("{}: {e}", weights_path.display()))
        })?;
        Ok(ComponentEngine::new(params, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    fn raster() -> DynamicImage {
        let image = GrayImage::from_fn(40, 40, |x, y| {
            if (2..=9).contains(&x) && (2..=9).contains(&y) {
                Luma([255])
            } else if (20..=35).contains(&x) && (20..=30).contains(&y) {
                Luma([204])
            } else if x == 38 && y == 38 {
                Luma([255])
            } else {
                Luma([10])
            }
        });
        DynamicImage::ImageLuma8(image)
    }

    #[test]
    fn test_components_become_detections() {
        let engine = ComponentEngine::new(ComponentEngineParams::default(), InferenceConfig::default());
        let detections = engine.detect(&raster()).unwrap();

        assert_eq!(detections.len(), 2, "the single bright pixel is below min_area");
        assert_eq!(detections[0].mask.foreground_count(), 64);
        assert_eq!(detections[1].mask.foreground_count(), 16 * 11);
        assert!((detections[0].score - 1.0).abs() < 1e-6);
        assert!((detections[1].score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_blank_raster_has_no_detections() {
        let engine = ComponentEngine::new(ComponentEngineParams::default(), InferenceConfig::default());
        let blank = DynamicImage::ImageLuma8(GrayImage::new(32, 32));
        assert!(engine.detect(&blank).unwrap().is_empty());
    }

    #[test]
    fn test_loader_reads_params() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "threshold = 200\nmin_area = 1\n").unwrap();

        let engine = ComponentEngineLoader.load(&path, InferenceConfig::default()).unwrap();
        assert_eq!(
            engine.params(),
            &ComponentEngineParams {
                threshold: 200,
                min_area: 1
            }
        );
        // 204 > 200, so the dimmer component still counts; the lone pixel now does too.
        assert_eq!(engine.detect(&raster()).unwrap().len(), 3);
    }

    #[test]
    fn test_loader_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "threshold = \"high\"").unwrap();
        assert!(matches!(
            ComponentEngineLoader.load(&path, InferenceConfig::default()),
            Err(FootprintError::EngineLoad(_))
        ));
    }
}
