use image::Luma;
use imageproc::{
    contours::{find_contours, BorderType},
    region_labelling::{connected_components, Connectivity},
};

use crate::{
    error::Result,
    traits::ContourExtractor,
    types::{Mask, Outline},
};

/// Outer-border tracer keeping only the largest foreground component.
///
/// Components are 8-connected and ranked by pixel count; the border of the
/// winner is followed with imageproc's Suzuki-Abe implementation. Hole borders
/// are ignored and the result is oriented with non-negative signed area.
#[derive(Debug, Clone, Default)]
pub struct LargestComponentTracer;

impl ContourExtractor for LargestComponentTracer {
    fn extract_contour(&self, mask: &Mask) -> Result<Outline> {
        Ok(trace(mask))
    }
}

/// The component with the most pixels; ties go to the lowest label, i.e. the
/// component reached first in raster order.
fn largest_component(mask: &Mask) -> Option<Mask> {
    let labels = connected_components(mask.as_gray(), Connectivity::Eight, Luma([0u8]));
    let count = labels.pixels().map(|p| p[0]).max().unwrap_or(0) as usize;
    if count == 0 {
        return None;
    }

    let mut sizes = vec![0usize; count + 1];
    for label in labels.pixels() {
        sizes[label[0] as usize] += 1;
    }
    let best = (1..=count).fold(1, |best, label| if sizes[label] > sizes[best] { label } else { best }) as u32;

    Some(Mask::from_fn(mask.width(), mask.height(), |x, y| {
        labels.get_pixel(x, y)[0] == best
    }))
}

/// Trace the outer boundary of the largest component of `mask`.
pub fn trace(mask: &Mask) -> Outline {
    let Some(component) = largest_component(mask) else {
        return Outline::empty();
    };

    let outline = find_contours::<i32>(component.as_gray())
        .into_iter()
        .find(|contour| matches!(contour.border_type, BorderType::Outer))
        .map(|contour| {
            Outline::new(
                contour
                    .points
                    .iter()
                    .map(|p| [f64::from(p.x), f64::from(p.y)])
                    .collect(),
            )
        })
        .unwrap_or_default();

    if outline.signed_area() < 0.0 {
        outline.reversed()
    } else {
        outline
    }
}
