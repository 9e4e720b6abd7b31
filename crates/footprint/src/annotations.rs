//! Batch assembly of scored annotation records.
//!
//! This is the pixel-space benchmark path: every image is predicted without
//! extent or tile, and each surviving outline becomes one record keyed by the
//! numeric image id taken from the file name.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::{FootprintError, Result},
    pipeline::{PredictOptions, Predictor},
    traits::EngineLoader,
    types::{Outline, ScoredOutline},
};

/// One scored footprint in the annotation output file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub image_id: u64,
    pub category_id: u32,
    /// Always a single ring
    pub segmentation: Vec<Outline>,
    /// `[x, y, width, height]`, empty for an empty outline
    pub bbox: Vec<f64>,
    pub score: f32,
}

impl AnnotationRecord {
    pub fn new(image_id: u64, category_id: u32, scored: ScoredOutline) -> Self {
        let bbox = scored.outline.bbox_xywh();
        Self {
            image_id,
            category_id,
            segmentation: vec![scored.outline],
            bbox,
            score: scored.score,
        }
    }
}

/// `"0042.jpg"` has image id 42.
pub fn image_id_from_path(path: &Path) -> Result<u64> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.parse().ok())
        .ok_or_else(|| FootprintError::InvalidImageId(path.to_path_buf()))
}

/// Records for all images, in image order then detection order.
pub fn build_annotations<L, P>(predictor: &Predictor<L>, images: &[P]) -> Result<Vec<AnnotationRecord>>
where
    L: EngineLoader,
    P: AsRef<Path>,
{
    let category_id = predictor.config().category_id;
    let options = PredictOptions::default();
    let total = images.len();
    let mut annotations = Vec::new();
    let mut progress = 0.0_f64;

    for (index, path) in images.iter().enumerate() {
        let path = path.as_ref();
        let image_id = image_id_from_path(path)?;
        let outlines = predictor.predict_path(path, &options)?;
        annotations.extend(
            outlines
                .into_iter()
                .map(|scored| AnnotationRecord::new(image_id, category_id, scored)),
        );

        let current = 100.0 * (index + 1) as f64 / total as f64;
        if current > progress {
            progress = current;
            info!("Progress: {progress:.1}%");
        }
    }

    Ok(annotations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::PredictorConfig,
        pipeline::tests::weights_file,
        traits::DetectionEngine,
        types::{Detection, Mask},
    };
    use image::{DynamicImage, GrayImage, Luma};
    use std::path::PathBuf;

    /// Emits one square mask per non-black band in the image, scored by the band's gray value.
    struct BandEngine;

    impl DetectionEngine for BandEngine {
        fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
            let gray = image.to_luma8();
            let mut detections = Vec::new();
            for band in 0..4u32 {
                let value = gray.get_pixel(band * 80 + 40, 40)[0];
                if value == 0 {
                    continue;
                }
                let (from, to) = (band * 80 + 10, band * 80 + 60);
                let mask = Mask::from_fn(gray.width(), gray.height(), |x, y| {
                    (from..=to).contains(&x) && (10..=60).contains(&y)
                });
                detections.push(Detection::new(mask, f32::from(value) / 255.0));
            }
            Ok(detections)
        }
    }

    struct BandLoader;

    impl EngineLoader for BandLoader {
        type Engine = BandEngine;

        fn load(&self, _weights_path: &Path, _config: crate::config::InferenceConfig) -> Result<BandEngine> {
            Ok(BandEngine)
        }
    }

    fn write_image(dir: &Path, name: &str, bands: &[(u32, u8)]) -> PathBuf {
        let mut image = GrayImage::new(320, 320);
        for &(band, value) in bands {
            for y in 0..80 {
                for x in band * 80..band * 80 + 80 {
                    image.put_pixel(x, y, Luma([value]));
                }
            }
        }
        let path = dir.join(name);
        image.save(&path).unwrap();
        path
    }

    #[test]
    fn test_image_id_parsing() {
        assert_eq!(image_id_from_path(Path::new("/data/test/0042.jpg")).unwrap(), 42);
        assert_eq!(image_id_from_path(Path::new("7.png")).unwrap(), 7);
        assert!(matches!(
            image_id_from_path(Path::new("/data/tile_a.jpg")),
            Err(FootprintError::InvalidImageId(_))
        ));
    }

    #[test]
    fn test_record_shape() {
        let outline = Outline::new(vec![[1.0, 1.0], [1.0, 5.0], [5.0, 5.0], [5.0, 1.0]]);
        let record = AnnotationRecord::new(3, 100, ScoredOutline::new(outline, 0.5));
        assert_eq!(record.bbox, vec![1.0, 1.0, 4.0, 4.0]);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["image_id"], 3);
        assert_eq!(json["category_id"], 100);
        assert_eq!(json["segmentation"][0][2][0], 5.0);
        assert_eq!(json["score"], 0.5);
    }

    #[test]
    fn test_empty_outline_has_empty_bbox() {
        let record = AnnotationRecord::new(1, 100, ScoredOutline::new(Outline::empty(), 0.1));
        assert!(record.bbox.is_empty());
    }

    #[test]
    fn test_records_follow_image_then_detection_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_image(dir.path(), "20.png", &[(0, 51), (2, 102)]);
        let second = write_image(dir.path(), "10.png", &[(1, 204)]);

        let weights = weights_file();
        let predictor = Predictor::new(weights.path(), BandLoader, PredictorConfig::default()).unwrap();
        let records = build_annotations(&predictor, &[first, second]).unwrap();

        let keys: Vec<(u64, f32)> = records.iter().map(|r| (r.image_id, r.score)).collect();
        assert_eq!(keys, vec![(20, 0.2), (20, 0.4), (10, 0.8)]);
        for record in &records {
            assert_eq!(record.category_id, 100);
            assert_eq!(record.segmentation.len(), 1);
            assert!(record.bbox[2] > 0.0 && record.bbox[3] > 0.0);
        }
    }

    #[test]
    fn test_end_to_end_square_record() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_image(dir.path(), "1.png", &[(0, 255)]);
        let weights = weights_file();
        let predictor = Predictor::new(weights.path(), BandLoader, PredictorConfig::default()).unwrap();

        let records = build_annotations(&predictor, &[image]).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].bbox, vec![10.0, 10.0, 50.0, 50.0]);
    }

    #[test]
    fn test_bad_file_name_fails_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_image(dir.path(), "1.png", &[(0, 255)]);
        let bad = write_image(dir.path(), "scene.png", &[(0, 255)]);
        let weights = weights_file();
        let predictor = Predictor::new(weights.path(), BandLoader, PredictorConfig::default()).unwrap();

        let result = build_annotations(&predictor, &[good, bad]);
        assert!(matches!(result, Err(FootprintError::InvalidImageId(_))));
    }
}
