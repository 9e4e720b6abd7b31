//! Rectilinear simplification of traced building outlines.
//!
//! Pixel-traced borders approximate straight walls with stair steps. The
//! rectangularizer first collapses those steps with Douglas-Peucker, then
//! groups the remaining edges into alternating horizontal and vertical runs.
//! Each run is snapped to a single level (the length-weighted mean of its
//! edges) and the output vertices are the intersections of consecutive runs,
//! so every corner is an exact right angle.
//!
//! Snapping only suits outlines whose walls roughly follow the image axes.
//! When too few runs survive, or the snapped ring's area drifts too far from
//! the simplified ring's, the simplified ring itself is returned, so
//! triangles and rotated buildings keep their shape.
//!
//! Outlines that are already rectilinear pass through untouched, and the
//! simplification is run to a fixed point, which makes the stage idempotent.

use geo_types::{Coord, LineString};

use crate::{
    config::RectangularizeConfig,
    error::Result,
    traits::OutlineSimplifier,
    types::{Outline, Point},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

/// A maximal sequence of consecutive edges sharing one axis.
#[derive(Debug, Clone, Copy)]
struct Run {
    axis: Axis,
    weighted_level: f64,
    length: f64,
}

impl Run {
    fn from_edge(a: Point, b: Point) -> Option<Self> {
        let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
        let length = dx.hypot(dy);
        if length == 0.0 {
            return None;
        }
        let (axis, level) = if dx.abs() >= dy.abs() {
            (Axis::Horizontal, (a[1] + b[1]) / 2.0)
        } else {
            (Axis::Vertical, (a[0] + b[0]) / 2.0)
        };
        Some(Self {
            axis,
            weighted_level: level * length,
            length,
        })
    }

    /// y for horizontal runs, x for vertical ones.
    fn level(&self) -> f64 {
        self.weighted_level / self.length
    }

    fn absorb(&mut self, other: &Run) {
        self.weighted_level += other.weighted_level;
        self.length += other.length;
    }
}

/// Douglas-Peucker plus axis snapping.
#[derive(Debug, Clone, Copy)]
pub struct Rectangularizer {
    pub simplify_tolerance: f64,
    pub min_edge_length: f64,
    pub max_area_change: f64,
}

impl Default for Rectangularizer {
    fn default() -> Self {
        RectangularizeConfig::default().into()
    }
}

impl From<RectangularizeConfig> for Rectangularizer {
    fn from(config: RectangularizeConfig) -> Self {
        Self {
            simplify_tolerance: config.simplify_tolerance,
            min_edge_length: config.min_edge_length,
            max_area_change: config.max_area_change,
        }
    }
}

impl OutlineSimplifier for Rectangularizer {
    fn simplify(&self, outline: &Outline) -> Result<Outline> {
        Ok(self.rectangularize(outline))
    }
}

impl Rectangularizer {
    pub fn rectangularize(&self, outline: &Outline) -> Outline {
        let points = outline.points();
        if points.len() < 4 || is_rectilinear(points) {
            return outline.clone();
        }

        let simplified = Outline::new(simplify_ring(points, self.simplify_tolerance));
        if let Some(snapped) = self.snap(&simplified) {
            return snapped;
        }
        if simplified.is_degenerate() {
            outline.clone()
        } else {
            simplified
        }
    }

    /// Right-angled version of `ring`, if its walls allow one.
    fn snap(&self, ring: &Outline) -> Option<Outline> {
        let mut runs = collect_runs(ring.points());
        self.fold_short_runs(&mut runs);
        fold_flat_runs(&mut runs);
        if runs.len() < 4 || (0..runs.len()).any(|i| is_flat(&runs, i)) {
            return None;
        }

        // Signed areas, so a snap that flips the ring inside out never passes.
        let snapped = Outline::new(corners(&runs));
        let reference = ring.signed_area();
        let change = (snapped.signed_area() - reference).abs();
        (reference != 0.0 && change <= self.max_area_change * reference.abs()).then_some(snapped)
    }

    fn fold_short_runs(&self, runs: &mut Vec<Run>) {
        while runs.len() > 4 {
            let shortest = runs
                .iter()
                .enumerate()
                .filter(|(_, run)| run.length < self.min_edge_length)
                .min_by(|a, b| a.1.length.total_cmp(&b.1.length))
                .map(|(index, _)| index);
            match shortest {
                Some(index) => remove_run(runs, index),
                None => break,
            }
        }
    }
}

/// Rectangularize with the default tolerances.
pub fn rectangularize(outline: &Outline) -> Outline {
    Rectangularizer::default().rectangularize(outline)
}

/// True when every edge is axis-aligned, non-empty, and edges alternate
/// between horizontal and vertical.
pub fn is_rectilinear(points: &[Point]) -> bool {
    let n = points.len();
    if n < 4 || n % 2 != 0 {
        return false;
    }
    let axis_of = |i: usize| {
        let (a, b) = (points[i], points[(i + 1) % n]);
        match (a[0] == b[0], a[1] == b[1]) {
            (true, false) => Some(Axis::Vertical),
            (false, true) => Some(Axis::Horizontal),
            _ => None,
        }
    };
    (0..n).all(|i| match (axis_of(i), axis_of((i + 1) % n)) {
        (Some(a), Some(b)) => a != b,
        _ => false,
    })
}

/// Douglas-Peucker over the closed ring, repeated until no more points go.
fn simplify_ring(points: &[Point], tolerance: f64) -> Vec<Point> {
    let mut ring = points.to_vec();
    loop {
        let next = simplify_once(&ring, tolerance);
        if next.len() == ring.len() {
            return ring;
        }
        ring = next;
    }
}

/// One Douglas-Peucker pass; the closing point is dropped again.
fn simplify_once(points: &[Point], tolerance: f64) -> Vec<Point> {
    use geo::Simplify;

    let mut coords: Vec<Coord<f64>> = points.iter().map(|&[x, y]| Coord { x, y }).collect();
    if let Some(&first) = coords.first() {
        coords.push(first);
    }
    let mut ring: Vec<Point> = LineString::new(coords)
        .simplify(&tolerance)
        .coords()
        .map(|c| [c.x, c.y])
        .collect();
    ring.pop();
    ring
}

fn collect_runs(ring: &[Point]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for (i, &a) in ring.iter().enumerate() {
        let Some(edge) = Run::from_edge(a, ring[(i + 1) % ring.len()]) else {
            continue;
        };
        match runs.last_mut() {
            Some(last) if last.axis == edge.axis => last.absorb(&edge),
            _ => runs.push(edge),
        }
    }
    // The ring wraps, so the last run may continue the first.
    if runs.len() > 1 && runs.first().map(|r| r.axis) == runs.last().map(|r| r.axis) {
        if let Some(last) = runs.pop() {
            runs[0].absorb(&last);
        }
    }
    runs
}

/// Drop run `index` and merge its two neighbours, which share an axis.
fn remove_run(runs: &mut Vec<Run>, index: usize) {
    let len = runs.len();
    let prev = (index + len - 1) % len;
    let next = (index + 1) % len;
    let absorbed = runs[next];
    runs[prev].absorb(&absorbed);
    let (high, low) = if index > next { (index, next) } else { (next, index) };
    runs.remove(high);
    runs.remove(low);
}

/// A run whose neighbours sit on the same level would become a zero-length edge.
fn is_flat(runs: &[Run], index: usize) -> bool {
    let len = runs.len();
    runs[(index + len - 1) % len].level() == runs[(index + 1) % len].level()
}

fn fold_flat_runs(runs: &mut Vec<Run>) {
    while runs.len() > 4 {
        match (0..runs.len()).find(|&i| is_flat(runs, i)) {
            Some(index) => remove_run(runs, index),
            None => break,
        }
    }
}

/// Vertex `i` joins run `i` and run `i + 1`.
fn corners(runs: &[Run]) -> Vec<Point> {
    (0..runs.len())
        .map(|i| {
            let (a, b) = (runs[i], runs[(i + 1) % runs.len()]);
            match a.axis {
                Axis::Horizontal => [b.level(), a.level()],
                Axis::Vertical => [a.level(), b.level()],
            }
        })
        .collect()
}
