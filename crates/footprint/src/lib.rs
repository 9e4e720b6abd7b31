//! # Building Footprint Extraction Library
//!
//! Turns per-instance segmentation masks from a detection engine into
//! polygon outlines of buildings, optionally snapped to right angles and
//! placed in a geographic coordinate system.
//!
//! ## Core Features
//!
//! - **Trait-based Architecture**: swap the detection engine, contour tracer or simplifier
//! - **Lazy Engine Loading**: model weights are loaded once, on the first prediction
//! - **Rectangularization**: axis-aligned outlines with few vertices
//! - **Tile Remapping & Georeferencing**: pixel outlines to mosaic or world coordinates
//! - **Batch Annotations**: scored records for a directory of numbered images
//! - **GeoJSON Support**: export/import of predicted footprints
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use footprint::{ComponentEngineLoader, Extent, PredictOptions, Predictor, PredictorConfig};
//!
//! let predictor = Predictor::new("weights.toml", ComponentEngineLoader, PredictorConfig::default())?;
//!
//! let options = PredictOptions::default()
//!     .with_extent(Extent::new(0.0, 0.0, 10.0, 10.0)?);
//! let footprints = predictor.predict_path("tile.png", &options)?;
//!
//! footprint::FootprintCollection::new(footprints, true)
//!     .save_geojson("footprints.geojson".as_ref())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod config;
pub mod traits;
pub mod algorithms;
pub mod engine;
pub mod pipeline;
pub mod annotations;
pub mod io;
pub mod typed_geojson;

// Re-exports for convenience
pub use error::{FootprintError, Result};
pub use types::{Detection, Extent, Mask, Outline, Point, ScoredOutline, TileIndex};
pub use config::{InferenceConfig, PredictorConfig, RectangularizeConfig};
pub use traits::*;
pub use algorithms::*;
pub use engine::{ComponentEngine, ComponentEngineLoader, ComponentEngineParams};
pub use pipeline::{PredictOptions, Predictor, builder::PredictorBuilder};
pub use annotations::{AnnotationRecord, build_annotations, image_id_from_path};
pub use io::*;
pub use typed_geojson::{FootprintGeoJson, FootprintProperties};

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, Luma};
    use std::io::Write;

    fn create_test_image() -> DynamicImage {
        let mut img = GrayImage::new(320, 320);
        for y in 40..120 {
            for x in 40..200 {
                img.put_pixel(x, y, Luma([255u8]));
            }
        }
        DynamicImage::ImageLuma8(img)
    }

    fn weights() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "threshold = 100\nmin_area = 16").unwrap();
        file
    }

    #[test]
    fn test_component_engine_end_to_end() {
        let weights = weights();
        let predictor = Predictor::new(weights.path(), ComponentEngineLoader, PredictorConfig::default()).unwrap();

        let footprints = predictor.predict(&create_test_image(), &PredictOptions::default()).unwrap();
        assert_eq!(footprints.len(), 1);
        assert_eq!(footprints[0].outline.len(), 4);
        assert_eq!(footprints[0].outline.bbox_xywh(), vec![40.0, 40.0, 159.0, 79.0]);
        assert!(footprints[0].score > 0.99);
    }

    #[test]
    fn test_georeferenced_geojson_export() {
        let weights = weights();
        let predictor = Predictor::new(weights.path(), ComponentEngineLoader, PredictorConfig::default()).unwrap();
        let options = PredictOptions::default().with_extent(Extent::new(0.0, 0.0, 32.0, 32.0).unwrap());

        let collection = FootprintCollection::new(predictor.predict(&create_test_image(), &options).unwrap(), true);
        assert_eq!(collection.to_geojson().unwrap().features.len(), 1);

        let typed = collection.to_typed_geojson();
        let props = typed.largest_feature().and_then(|f| f.properties()).unwrap();
        assert!((props.area - 15.9 * 7.9).abs() < 1e-6);
        assert_eq!(typed.is_georeferenced(), Some(true));
    }
}
