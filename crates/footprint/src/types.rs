use std::str::FromStr;

use geo_types::{Coord, LineString, Polygon};
use image::{GrayImage, Luma};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{FootprintError, Result};

/// A point in pixel space (integral values) or in a target coordinate system.
pub type Point = [f64; 2];

const FOREGROUND: u8 = 255;

/// Binary per-object mask as produced by a detection engine.
///
/// Stored as a `GrayImage` with foreground pixels at 255 so it can be fed
/// straight into `imageproc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    image: GrayImage,
}

impl Mask {
    /// An all-background mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::new(width, height),
        }
    }

    pub fn from_fn<F>(width: u32, height: u32, f: F) -> Self
    where
        F: Fn(u32, u32) -> bool,
    {
        let image = GrayImage::from_fn(width, height, |x, y| {
            Luma([if f(x, y) { FOREGROUND } else { 0 }])
        });
        Self { image }
    }

    /// Build a mask from row-major booleans.
    pub fn from_bools(width: u32, height: u32, data: &[bool]) -> Result<Self> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(FootprintError::MaskSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self::from_fn(width, height, |x, y| {
            data[y as usize * width as usize + x as usize]
        }))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.image.get_pixel(x, y)[0] != 0
    }

    pub fn foreground_count(&self) -> usize {
        self.image.pixels().filter(|p| p[0] != 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.image.pixels().all(|p| p[0] == 0)
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.image
    }
}

/// Closed ring of points; the closing point is not repeated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Outline {
    points: Vec<Point>,
}

impl Outline {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Convert to a geo-types polygon for geometric operations
    pub fn to_geo_polygon(&self) -> Polygon<f64> {
        let coords: Vec<Coord<f64>> = self.points.iter().map(|&[x, y]| Coord { x, y }).collect();
        Polygon::new(LineString::new(coords), vec![])
    }

    /// Shoelace area, positive when the ring turns counter-clockwise in its own frame.
    pub fn signed_area(&self) -> f64 {
        use geo::Area;
        self.to_geo_polygon().signed_area()
    }

    pub fn area(&self) -> f64 {
        use geo::Area;
        self.to_geo_polygon().unsigned_area()
    }

    /// Empty, collinear, zero-area or non-finite rings carry no footprint.
    pub fn is_degenerate(&self) -> bool {
        if self.points.len() < 3 {
            return true;
        }
        if !self.points.iter().flatten().all(|v| v.is_finite()) {
            return true;
        }
        self.area() <= 0.0
    }

    /// Same ring traversed the other way round.
    pub fn reversed(&self) -> Self {
        let mut points = self.points.clone();
        points.reverse();
        Self { points }
    }

    pub fn map_points<F>(&self, f: F) -> Self
    where
        F: Fn(Point) -> Point,
    {
        Self {
            points: self.points.iter().copied().map(f).collect(),
        }
    }

    /// `(min, max)` corners, `None` for an empty outline.
    pub fn bounding_box(&self) -> Option<(Point, Point)> {
        use geo::BoundingRect;
        let coords: Vec<Coord<f64>> = self.points.iter().map(|&[x, y]| Coord { x, y }).collect();
        LineString::new(coords)
            .bounding_rect()
            .map(|rect| ([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]))
    }

    /// `[x, y, width, height]`, or an empty list for an empty outline.
    pub fn bbox_xywh(&self) -> Vec<f64> {
        match self.bounding_box() {
            Some((min, max)) => vec![min[0], min[1], max[0] - min[0], max[1] - min[1]],
            None => Vec::new(),
        }
    }
}

impl From<Vec<Point>> for Outline {
    fn from(points: Vec<Point>) -> Self {
        Self::new(points)
    }
}

/// One detected footprint with its engine confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredOutline {
    pub outline: Outline,
    pub score: f32,
}

impl ScoredOutline {
    pub fn new(outline: Outline, score: f32) -> Self {
        Self { outline, score }
    }
}

/// A single engine output: one instance mask and its confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub mask: Mask,
    pub score: f32,
}

impl Detection {
    pub fn new(mask: Mask, score: f32) -> Self {
        Self { mask, score }
    }
}

/// Bounding rectangle of an image in the target coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema, TS)]
#[ts(export)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self> {
        if ![min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite()) {
            return Err(FootprintError::InvalidExtent(
                "bounds must be finite".to_string(),
            ));
        }
        if max_x <= min_x || max_y <= min_y {
            return Err(FootprintError::InvalidExtent(format!(
                "({min_x}, {min_y}, {max_x}, {max_y}) has an empty or inverted range"
            )));
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

impl FromStr for Extent {
    type Err = FootprintError;

    /// Parses `min_x,min_y,max_x,max_y`.
    fn from_str(s: &str) -> Result<Self> {
        let values = s
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| FootprintError::InvalidExtent(format!("{s:?}: {e}")))?;
        match values.as_slice() {
            &[min_x, min_y, max_x, max_y] => Self::new(min_x, min_y, max_x, max_y),
            _ => Err(FootprintError::InvalidExtent(format!(
                "{s:?}: expected four comma separated bounds"
            ))),
        }
    }
}

/// Position of a tile inside a larger mosaic.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, TS,
)]
#[ts(export)]
pub struct TileIndex {
    pub column: i32,
    pub row: i32,
}

impl TileIndex {
    pub fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }

    /// Pixel offset this tile contributes to every point.
    pub fn offset(&self, tile_size: u32) -> (f64, f64) {
        let size = f64::from(tile_size);
        (f64::from(self.column) * size, f64::from(self.row) * size)
    }
}

impl FromStr for TileIndex {
    type Err = FootprintError;

    /// Parses `column,row`.
    fn from_str(s: &str) -> Result<Self> {
        let (column, row) = s
            .split_once(',')
            .ok_or_else(|| FootprintError::InvalidTile(format!("{s:?}: expected column,row")))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<i32>()
                .map_err(|e| FootprintError::InvalidTile(format!("{s:?}: {e}")))
        };
        Ok(Self::new(parse(column)?, parse(row)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_mask_from_bools_checks_length() {
        let err = Mask::from_bools(3, 3, &[true; 8]).unwrap_err();
        assert!(matches!(err, FootprintError::MaskSize { expected: 9, actual: 8 }));

        let mask = Mask::from_bools(2, 2, &[false, true, false, false]).unwrap();
        assert!(mask.get(1, 0));
        assert!(!mask.get(0, 1));
        assert_eq!(mask.foreground_count(), 1);
    }

    #[test]
    fn test_empty_mask() {
        assert!(Mask::new(16, 16).is_empty());
        assert!(!Mask::from_fn(16, 16, |x, y| x == 3 && y == 4).is_empty());
    }

    #[test]
    fn test_bbox_of_square() {
        let outline = Outline::new(vec![[1.0, 1.0], [1.0, 5.0], [5.0, 5.0], [5.0, 1.0]]);
        assert_eq!(outline.bbox_xywh(), vec![1.0, 1.0, 4.0, 4.0]);
        assert!(Outline::empty().bbox_xywh().is_empty());
    }

    #[test]
    fn test_degenerate_outlines() {
        assert!(Outline::empty().is_degenerate());
        assert!(Outline::new(vec![[0.0, 0.0], [1.0, 1.0]]).is_degenerate());
        assert!(Outline::new(vec![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]).is_degenerate());
        assert!(Outline::new(vec![[0.0, 0.0], [f64::NAN, 1.0], [2.0, 0.0]]).is_degenerate());
        assert!(!Outline::new(vec![[0.0, 0.0], [2.0, 0.0], [2.0, 2.0]]).is_degenerate());
    }

    #[test]
    fn test_signed_area_follows_orientation() {
        let ccw = Outline::new(vec![[0.0, 0.0], [4.0, 0.0], [4.0, 3.0], [0.0, 3.0]]);
        assert_abs_diff_eq!(ccw.signed_area(), 12.0);
        assert_abs_diff_eq!(ccw.reversed().signed_area(), -12.0);
        assert_abs_diff_eq!(ccw.reversed().area(), 12.0);
    }

    #[test]
    fn test_extent_parsing() {
        let extent: Extent = "0, 0, 10.5, 20".parse().unwrap();
        assert_eq!(extent, Extent::new(0.0, 0.0, 10.5, 20.0).unwrap());
        assert_abs_diff_eq!(extent.width(), 10.5);

        assert!("1,2,3".parse::<Extent>().is_err());
        assert!("0,0,a,1".parse::<Extent>().is_err());
        assert!(Extent::new(5.0, 0.0, 1.0, 1.0).is_err());
        assert!(Extent::new(0.0, 0.0, f64::INFINITY, 1.0).is_err());
    }

    #[test]
    fn test_tile_parsing_and_offset() {
        let tile: TileIndex = "3,-1".parse().unwrap();
        assert_eq!(tile, TileIndex::new(3, -1));
        assert_eq!(tile.offset(256), (768.0, -256.0));
        assert_eq!(TileIndex::default().offset(256), (0.0, 0.0));
        assert!("3".parse::<TileIndex>().is_err());
    }

    #[test]
    fn test_outline_serializes_as_point_list() {
        let outline = Outline::new(vec![[1.0, 2.0], [3.0, 4.0]]);
        let json = serde_json::to_string(&outline).unwrap();
        assert_eq!(json, "[[1.0,2.0],[3.0,4.0]]");
    }
}
