use crate::types::{Point, Value, Vector};

/// Axis-aligned region the grid scan covers for one frame.
///
/// Recomputed fresh every frame from the current ball positions, since the
/// balls move and the scan should only cover space where the surface can
/// plausibly exist.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanBounds {
    pub min: Point,
    pub max: Point,
}

impl ScanBounds {
    /// Encloses every point expanded by `margin` in every direction.
    ///
    /// Returns `None` for an empty slice: with no balls there is nothing to
    /// scan, and folding min/max over nothing would produce inverted bounds.
    pub fn around_points(points: &[Point], margin: Value) -> Option<Self> {
        let first = points.first()?;
        let mut min = *first;
        let mut max = *first;
        for p in &points[1..] {
            min = Point::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
            max = Point::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
        }
        let pad = Vector::new(margin, margin, margin);
        Some(Self {
            min: min - pad,
            max: max + pad,
        })
    }

    /// Per-axis extent of the region.
    pub fn extent(&self) -> Vector {
        self.max - self.min
    }
}
