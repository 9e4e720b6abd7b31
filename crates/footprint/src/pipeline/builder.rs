use std::path::PathBuf;

use crate::{
    algorithms::{LargestComponentTracer, Rectangularizer},
    config::PredictorConfig,
    error::{FootprintError, Result},
    pipeline::Predictor,
    traits::{ContourExtractor, EngineLoader, OutlineSimplifier},
};

/// Builder for creating predictors with a fluent API
pub struct PredictorBuilder<L: EngineLoader> {
    weights_path: PathBuf,
    loader: L,
    config: PredictorConfig,
    contour_extractor: Option<Box<dyn ContourExtractor>>,
    simplifier: Option<Box<dyn OutlineSimplifier>>,
}

impl<L: EngineLoader> PredictorBuilder<L> {
    pub fn new(weights_path: impl Into<PathBuf>, loader: L) -> Self {
        Self {
            weights_path: weights_path.into(),
            loader,
            config: PredictorConfig::default(),
            contour_extractor: None,
            simplifier: None,
        }
    }

    pub fn with_config(mut self, config: PredictorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the contour extractor (replaces the default tracer)
    pub fn set_contour_extractor<E>(mut self, extractor: E) -> Self
    where
        E: ContourExtractor + 'static,
    {
        self.contour_extractor = Some(Box::new(extractor));
        self
    }

    /// Set the simplifier used when rectangularization is requested
    pub fn set_simplifier<S>(mut self, simplifier: S) -> Self
    where
        S: OutlineSimplifier + 'static,
    {
        self.simplifier = Some(Box::new(simplifier));
        self
    }

    /// Validate the configuration and the weights path, filling in defaults.
    pub fn build(self) -> Result<Predictor<L>> {
        self.config.validate()?;
        if !self.weights_path.is_file() {
            return Err(FootprintError::WeightsNotFound(self.weights_path));
        }

        let contour_extractor = self
            .contour_extractor
            .unwrap_or_else(|| Box::new(LargestComponentTracer));
        let simplifier = self
            .simplifier
            .unwrap_or_else(|| Box::new(Rectangularizer::from(self.config.rectangularization)));

        Ok(Predictor::from_parts(
            self.weights_path,
            self.loader,
            self.config,
            contour_extractor,
            simplifier,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pipeline::{tests::{square_mask, weights_file, FakeLoader}, PredictOptions},
        types::{Detection, Mask, Outline},
    };

    /// Replaces any outline with a triangle spanning its bounding box.
    struct BoundingTriangle;

    impl OutlineSimplifier for BoundingTriangle {
        fn simplify(&self, outline: &Outline) -> Result<Outline> {
            Ok(match outline.bounding_box() {
                Some((min, max)) => Outline::new(vec![min, [max[0], min[1]], max]),
                None => Outline::empty(),
            })
        }
    }

    /// Reports a fixed triangle for every mask.
    struct FixedTriangle;

    impl ContourExtractor for FixedTriangle {
        fn extract_contour(&self, _mask: &Mask) -> Result<Outline> {
            Ok(Outline::new(vec![[0.0, 0.0], [8.0, 0.0], [0.0, 8.0]]))
        }
    }

    fn loader() -> FakeLoader {
        FakeLoader {
            detections: vec![Detection::new(square_mask(10, 30), 0.9)],
            ..FakeLoader::default()
        }
    }

    #[test]
    fn test_invalid_config_is_rejected_before_weights() {
        let mut config = PredictorConfig::default();
        config.tile_size = 0;
        let result = PredictorBuilder::new("/missing/weights", loader()).with_config(config).build();
        assert!(matches!(result, Err(FootprintError::InvalidConfig(_))));
    }

    #[test]
    fn test_directory_is_not_a_weights_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = PredictorBuilder::new(dir.path(), loader()).build();
        assert!(matches!(result, Err(FootprintError::WeightsNotFound(_))));
    }

    #[test]
    fn test_custom_simplifier() {
        let weights = weights_file();
        let predictor = PredictorBuilder::new(weights.path(), loader())
            .set_simplifier(BoundingTriangle)
            .build()
            .unwrap();
        let outlines = predictor
            .process_detections(vec![Detection::new(square_mask(10, 30), 0.9)], &PredictOptions::default())
            .unwrap();
        assert_eq!(outlines[0].outline.len(), 3);
    }

    #[test]
    fn test_custom_contour_extractor() {
        let weights = weights_file();
        let predictor = PredictorBuilder::new(weights.path(), loader())
            .set_contour_extractor(FixedTriangle)
            .build()
            .unwrap();
        let outlines = predictor
            .process_detections(vec![Detection::new(Mask::new(4, 4), 0.4)], &PredictOptions::default())
            .unwrap();
        assert_eq!(outlines.len(), 1);
        assert_eq!(outlines[0].outline.bbox_xywh(), vec![0.0, 0.0, 8.0, 8.0]);
    }
}
