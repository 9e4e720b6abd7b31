use std::path::Path;

use geojson::{Feature, FeatureCollection, Geometry, Value};

use crate::{
    error::{FootprintError, Result},
    typed_geojson::{FootprintGeoJson, FootprintProperties, TypedFeature, TypedFeatureCollection},
    types::{Outline, ScoredOutline},
};

/// Predicted footprints of one image, ready for export.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FootprintCollection {
    pub footprints: Vec<ScoredOutline>,
    /// World coordinates when true, pixel coordinates otherwise
    pub georeferenced: bool,
}

impl FootprintCollection {
    pub fn new(footprints: Vec<ScoredOutline>, georeferenced: bool) -> Self {
        Self {
            footprints,
            georeferenced,
        }
    }

    fn properties(&self, id: usize, footprint: &ScoredOutline) -> FootprintProperties {
        FootprintProperties {
            id: id as u32,
            score: footprint.score,
            area: footprint.outline.area(),
            vertex_count: footprint.outline.len(),
        }
    }

    fn foreign_members(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut foreign_members = serde_json::Map::new();
        foreign_members.insert("georeferenced".to_string(), serde_json::Value::Bool(self.georeferenced));
        foreign_members.insert(
            "footprint_count".to_string(),
            serde_json::Value::Number(serde_json::Number::from(self.footprints.len())),
        );
        foreign_members
    }

    /// Export to typed GeoJSON format
    pub fn to_typed_geojson(&self) -> FootprintGeoJson {
        let features = self
            .footprints
            .iter()
            .enumerate()
            .map(|(i, footprint)| {
                TypedFeature::new(Some(polygon_geometry(&footprint.outline)), self.properties(i, footprint))
            })
            .collect();

        TypedFeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(self.foreign_members()),
        }
    }

    pub fn to_geojson(&self) -> Result<FeatureCollection> {
        let mut features = Vec::with_capacity(self.footprints.len());
        for (i, footprint) in self.footprints.iter().enumerate() {
            let properties = match serde_json::to_value(self.properties(i, footprint))? {
                serde_json::Value::Object(map) => Some(map),
                _ => None,
            };
            features.push(Feature {
                bbox: None,
                geometry: Some(polygon_geometry(&footprint.outline)),
                id: Some(geojson::feature::Id::Number(serde_json::Number::from(i))),
                properties,
                foreign_members: None,
            });
        }

        Ok(FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(self.foreign_members()),
        })
    }

    pub fn to_geojson_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_geojson()?)?)
    }

    pub fn save_geojson(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_geojson_string()?)?;
        Ok(())
    }

    pub fn from_geojson_file(path: &Path) -> Result<Self> {
        Self::from_geojson_string(&std::fs::read_to_string(path)?)
    }

    /// Load footprints back from a GeoJSON string written by [`Self::to_geojson_string`]
    pub fn from_geojson_string(geojson_str: &str) -> Result<Self> {
        let collection: FeatureCollection = geojson_str.parse()?;
        let georeferenced = collection
            .foreign_members
            .as_ref()
            .and_then(|members| members.get("georeferenced"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let mut footprints = Vec::with_capacity(collection.features.len());
        for feature in collection.features {
            let score = feature
                .property("score")
                .and_then(|v| v.as_f64())
                .ok_or_else(|| FootprintError::InvalidGeoJson("feature without a score".to_string()))?;
            let Some(Value::Polygon(rings)) = feature.geometry.map(|g| g.value) else {
                continue;
            };
            let Some(exterior) = rings.first() else {
                continue;
            };
            let mut points: Vec<[f64; 2]> = exterior.iter().map(|p| [p[0], p[1]]).collect();
            if points.len() > 1 && points.first() == points.last() {
                points.pop();
            }
            footprints.push(ScoredOutline::new(Outline::new(points), score as f32));
        }

        Ok(Self {
            footprints,
            georeferenced,
        })
    }
}

impl From<Vec<ScoredOutline>> for FootprintCollection {
    fn from(footprints: Vec<ScoredOutline>) -> Self {
        Self::new(footprints, false)
    }
}

/// GeoJSON rings repeat their first position at the end.
fn polygon_geometry(outline: &Outline) -> Geometry {
    let mut ring: Vec<Vec<f64>> = outline.points().iter().map(|&[x, y]| vec![x, y]).collect();
    if let Some(first) = ring.first().cloned() {
        ring.push(first);
    }
    Geometry::new(Value::Polygon(vec![ring]))
}
