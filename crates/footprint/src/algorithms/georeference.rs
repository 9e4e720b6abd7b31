use crate::types::{Extent, Outline, Point};

/// Affine pixel-to-world transform for a square image covering `extent`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Georeferencer {
    extent: Extent,
    scale_x: f64,
    scale_y: f64,
}

impl Georeferencer {
    pub fn new(extent: Extent, image_width: u32) -> Self {
        let width = f64::from(image_width);
        Self {
            extent,
            scale_x: extent.width() / width,
            scale_y: extent.height() / width,
        }
    }

    /// Pixel row 0 is the top of the image, while world y grows upwards.
    pub fn map_point(&self, [px, py]: Point) -> Point {
        [
            self.extent.min_x + px * self.scale_x,
            self.extent.max_y - py * self.scale_y,
        ]
    }

    /// `None` when the mapped outline is degenerate.
    pub fn georeference(&self, outline: &Outline) -> Option<Outline> {
        // The y flip mirrors the ring; reversing keeps its orientation.
        let mapped = outline.map_points(|p| self.map_point(p)).reversed();
        if mapped.is_degenerate() {
            None
        } else {
            Some(mapped)
        }
    }
}

pub fn georeference(outline: &Outline, extent: Extent, image_width: u32) -> Option<Outline> {
    Georeferencer::new(extent, image_width).georeference(outline)
}
