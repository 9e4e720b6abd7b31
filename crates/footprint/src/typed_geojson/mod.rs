use std::marker::PhantomData;

use geojson::{Geometry, JsonObject};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Properties for footprint features
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS, JsonSchema)]
#[ts(export)]
#[schemars(description = "Properties for building footprint features")]
pub struct FootprintProperties {
    #[schemars(description = "Position of the footprint in detection order")]
    pub id: u32,
    #[schemars(description = "Detection confidence in [0, 1]")]
    pub score: f32,
    #[schemars(description = "Area in squared units of the outline's coordinate system")]
    pub area: f64,
    #[schemars(description = "Number of distinct ring vertices")]
    pub vertex_count: usize,
}

/// Type alias for footprint GeoJSON
pub type FootprintGeoJson = TypedFeatureCollection<FootprintProperties>;

/// A typed GeoJSON Feature that is generic over its properties.
#[derive(Serialize, Deserialize, Debug)]
pub struct TypedFeature<P> {
    #[serde(flatten)]
    pub feature: geojson::Feature,
    #[serde(skip)]
    _properties: PhantomData<P>,
}

impl<P> TypedFeature<P>
where
    for<'de> P: Serialize + Deserialize<'de>,
{
    pub fn new(geometry: Option<Geometry>, properties: P) -> Self {
        let feature = geojson::Feature {
            bbox: None,
            geometry,
            id: None,
            properties: serde_json::to_value(properties)
                .ok()
                .and_then(|v| v.as_object().cloned()),
            foreign_members: None,
        };
        Self {
            feature,
            _properties: PhantomData,
        }
    }

    /// Tries to access the typed properties of the feature.
    pub fn properties(&self) -> Option<P> {
        self.feature
            .properties
            .as_ref()
            .and_then(|p| serde_json::from_value(serde_json::Value::Object(p.clone())).ok())
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TypedFeatureCollection<P> {
    pub bbox: Option<Vec<f64>>,
    pub features: Vec<TypedFeature<P>>,
    pub foreign_members: Option<JsonObject>,
}

impl<P> TypedFeatureCollection<P> {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl FootprintGeoJson {
    /// Features whose score is at least `min_score`
    pub fn features_above_score(&self, min_score: f32) -> Vec<&TypedFeature<FootprintProperties>> {
        self.features
            .iter()
            .filter(|feature| {
                feature
                    .properties()
                    .is_some_and(|props| props.score >= min_score)
            })
            .collect()
    }

    /// Get the largest feature by area
    pub fn largest_feature(&self) -> Option<&TypedFeature<FootprintProperties>> {
        self.features.iter().max_by(|a, b| {
            let area_a = a.properties().map(|p| p.area).unwrap_or(0.0);
            let area_b = b.properties().map(|p| p.area).unwrap_or(0.0);
            area_a.total_cmp(&area_b)
        })
    }

    /// Whether the coordinates are in a world coordinate system rather than pixels
    pub fn is_georeferenced(&self) -> Option<bool> {
        self.foreign_members.as_ref()?.get("georeferenced")?.as_bool()
    }

    pub fn footprint_count(&self) -> Option<usize> {
        self.foreign_members
            .as_ref()?
            .get("footprint_count")?
            .as_u64()
            .map(|v| v as usize)
    }
}
