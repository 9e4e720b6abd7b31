pub mod builder;

use std::path::{Path, PathBuf};

use image::DynamicImage;
use once_cell::sync::OnceCell;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    algorithms::{remap, Georeferencer},
    config::PredictorConfig,
    error::Result,
    traits::{ContourExtractor, DetectionEngine, EngineLoader, OutlineSimplifier},
    types::{Detection, Extent, ScoredOutline, TileIndex},
};

/// Per-call knobs of [`Predictor::predict`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PredictOptions {
    /// World extent of the image; pixel coordinates are kept when absent
    pub extent: Option<Extent>,
    /// Position of the image in a mosaic
    pub tile: TileIndex,
    pub rectangularize: bool,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self {
            extent: None,
            tile: TileIndex::default(),
            rectangularize: true,
        }
    }
}

impl PredictOptions {
    pub fn with_extent(mut self, extent: Extent) -> Self {
        self.extent = Some(extent);
        self
    }

    pub fn with_tile(mut self, tile: TileIndex) -> Self {
        self.tile = tile;
        self
    }

    pub fn with_rectangularization(mut self, enabled: bool) -> Self {
        self.rectangularize = enabled;
        self
    }
}

/// Turns images into scored footprint outlines.
///
/// Owns the detection engine, which is loaded on first use and reused for
/// every later call.
pub struct Predictor<L: EngineLoader> {
    weights_path: PathBuf,
    loader: L,
    engine: OnceCell<L::Engine>,
    config: PredictorConfig,
    contour_extractor: Box<dyn ContourExtractor>,
    simplifier: Box<dyn OutlineSimplifier>,
}

impl<L: EngineLoader> Predictor<L> {
    /// Create a new predictor builder
    pub fn builder(weights_path: impl Into<PathBuf>, loader: L) -> builder::PredictorBuilder<L> {
        builder::PredictorBuilder::new(weights_path, loader)
    }

    /// Predictor with the default tracer and rectangularizer.
    ///
    /// Fails when `weights_path` is not an existing file or `config` is invalid.
    pub fn new(weights_path: impl Into<PathBuf>, loader: L, config: PredictorConfig) -> Result<Self> {
        Self::builder(weights_path, loader).with_config(config).build()
    }

    pub(crate) fn from_parts(
        weights_path: PathBuf,
        loader: L,
        config: PredictorConfig,
        contour_extractor: Box<dyn ContourExtractor>,
        simplifier: Box<dyn OutlineSimplifier>,
    ) -> Self {
        Self {
            weights_path,
            loader,
            engine: OnceCell::new(),
            config,
            contour_extractor,
            simplifier,
        }
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub fn weights_path(&self) -> &Path {
        &self.weights_path
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.get().is_some()
    }

    /// The detection engine, loading it on the first call.
    pub fn engine(&self) -> Result<&L::Engine> {
        self.engine.get_or_try_init(|| {
            info!(weights = %self.weights_path.display(), "Loading detection engine");
            self.loader.load(&self.weights_path, self.config.inference)
        })
    }

    pub fn predict(&self, image: &DynamicImage, options: &PredictOptions) -> Result<Vec<ScoredOutline>> {
        let engine = self.engine()?;
        info!(width = image.width(), height = image.height(), "Predicting");
        let detections = engine.detect(image)?;
        info!(detections = detections.len(), "Prediction done");
        self.process_detections(detections, options)
    }

    pub fn predict_path(&self, path: impl AsRef<Path>, options: &PredictOptions) -> Result<Vec<ScoredOutline>> {
        let image = image::open(path.as_ref())?;
        self.predict(&image, options)
    }

    /// Run detections through trace, rectangularize, remap and georeference.
    ///
    /// Objects whose geometry degenerates along the way are dropped; the
    /// survivors keep the engine's order.
    pub fn process_detections(
        &self,
        detections: Vec<Detection>,
        options: &PredictOptions,
    ) -> Result<Vec<ScoredOutline>> {
        let georeferencer = options
            .extent
            .map(|extent| Georeferencer::new(extent, self.config.image_width));

        let mut outlines = Vec::with_capacity(detections.len());
        for (index, Detection { mask, score }) in detections.into_iter().enumerate() {
            let mut outline = self.contour_extractor.extract_contour(&mask)?;
            if options.rectangularize {
                outline = self.simplifier.simplify(&outline)?;
            }
            let outline = remap(&outline, options.tile, self.config.tile_size);
            if outline.is_degenerate() {
                debug!(index, "dropping degenerate outline");
                continue;
            }

            let outline = match &georeferencer {
                Some(georeferencer) => match georeferencer.georeference(&outline) {
                    Some(outline) => outline,
                    None => {
                        debug!(index, "dropping outline that georeferences to nothing");
                        continue;
                    }
                },
                None => outline,
            };
            outlines.push(ScoredOutline::new(outline, score));
        }
        Ok(outlines)
    }
}
