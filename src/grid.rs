use crate::bounds::ScanBounds;
use crate::tables::CORNER_OFFSETS;
use crate::types::{Point, Value};

/// Tolerance subtracted from the upper bound of each axis so the scan never
/// emits a trailing degenerate cell flush against the boundary.
pub const BOUNDARY_EPS: Value = 0.01;

/// Lazy x-major (then y, then z) enumeration of the lattice cells inside a
/// [`ScanBounds`] at a fixed step.
///
/// A cell is emitted iff its origin (minimum corner) lies within
/// `[min, max - BOUNDARY_EPS)` per axis. Origins are computed as
/// `min + i * step` rather than by accumulating `+= step`, so the cell at
/// index `i + 1` reuses bit-identical corner coordinates with its neighbour —
/// adjacent cells agree exactly on their shared face.
#[derive(Debug, Clone)]
pub struct GridCells {
    min: Point,
    step: Value,
    counts: [usize; 3],
    cursor: [usize; 3],
}

impl GridCells {
    pub fn new(bounds: &ScanBounds, step: Value) -> Self {
        let extent = bounds.extent();
        Self {
            min: bounds.min,
            step,
            counts: [
                axis_cells(extent.x, step),
                axis_cells(extent.y, step),
                axis_cells(extent.z, step),
            ],
            cursor: [0, 0, 0],
        }
    }

    /// Cell counts along x, y, z.
    pub fn counts(&self) -> [usize; 3] {
        self.counts
    }

    /// Total number of cells the iterator will yield.
    pub fn len(&self) -> usize {
        self.counts.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Origin of the cell at lattice index `(ix, iy, iz)`.
    pub fn origin(&self, ix: usize, iy: usize, iz: usize) -> Point {
        Point::new(
            self.min.x + ix as Value * self.step,
            self.min.y + iy as Value * self.step,
            self.min.z + iz as Value * self.step,
        )
    }

    /// Origins of every cell in the x-slab `ix`, in y-major then z order.
    ///
    /// Iterating slabs 0..counts()[0] in order visits exactly the cells this
    /// iterator yields, in the same order — the parallel scan relies on that.
    pub fn slab_origins(&self, ix: usize) -> impl Iterator<Item = Point> + '_ {
        let [_, ny, nz] = self.counts;
        (0..ny).flat_map(move |iy| (0..nz).map(move |iz| self.origin(ix, iy, iz)))
    }
}

impl Iterator for GridCells {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        let [ix, iy, iz] = self.cursor;
        let [nx, ny, nz] = self.counts;
        if ix >= nx || ny == 0 || nz == 0 {
            return None;
        }
        let origin = self.origin(ix, iy, iz);

        // Innermost axis is z, outermost x.
        self.cursor = if iz + 1 < nz {
            [ix, iy, iz + 1]
        } else if iy + 1 < ny {
            [ix, iy + 1, 0]
        } else {
            [ix + 1, 0, 0]
        };
        Some(origin)
    }
}

/// Number of cells along one axis: lattice points `i` with
/// `i * step < extent - BOUNDARY_EPS`.
fn axis_cells(extent: Value, step: Value) -> usize {
    let span = extent - BOUNDARY_EPS;
    if span <= 0.0 {
        0
    } else {
        (span / step).ceil() as usize
    }
}

/// The 8 corner points of the cell with the given origin, in the order the
/// lookup tables expect (see [`crate::tables`] for the corner diagram).
#[inline]
pub fn cell_corners(origin: Point, step: Value) -> [Point; 8] {
    CORNER_OFFSETS.map(|[dx, dy, dz]| {
        Point::new(
            origin.x + dx as Value * step,
            origin.y + dy as Value * step,
            origin.z + dz as Value * step,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(min: [Value; 3], max: [Value; 3]) -> ScanBounds {
        ScanBounds {
            min: Point::new(min[0], min[1], min[2]),
            max: Point::new(max[0], max[1], max[2]),
        }
    }

    #[test]
    fn counts_cover_the_span() {
        let grid = GridCells::new(&bounds([0.0; 3], [1.0; 3]), 0.25);
        // 1.0 - 0.01 spans four 0.25 cells (the last one truncated).
        assert_eq!(grid.counts(), [4, 4, 4]);
        assert_eq!(grid.len(), 64);
    }

    #[test]
    fn boundary_tolerance_drops_trailing_cell() {
        // The origin at exactly max - step would leave a full cell, but one
        // at max - BOUNDARY_EPS or beyond must not be emitted.
        let grid = GridCells::new(&bounds([0.0; 3], [0.505, 1.0, 1.0]), 0.5);
        assert_eq!(grid.counts()[0], 1);
        let grid = GridCells::new(&bounds([0.0; 3], [0.52, 1.0, 1.0]), 0.5);
        assert_eq!(grid.counts()[0], 2);
    }

    #[test]
    fn iteration_is_x_major() {
        let grid = GridCells::new(&bounds([0.0; 3], [0.6; 3]), 0.3);
        let origins: Vec<Point> = grid.clone().collect();
        assert_eq!(origins.len(), grid.len());
        assert_eq!(origins[0], Point::new(0.0, 0.0, 0.0));
        assert_eq!(origins[1], Point::new(0.0, 0.0, 0.3));
        assert_eq!(origins[2], Point::new(0.0, 0.3, 0.0));
        assert_eq!(origins[4], Point::new(0.3, 0.0, 0.0));
    }

    #[test]
    fn slabs_visit_cells_in_iterator_order() {
        let grid = GridCells::new(&bounds([-1.0; 3], [1.0; 3]), 0.4);
        let from_slabs: Vec<Point> = (0..grid.counts()[0])
            .flat_map(|ix| grid.slab_origins(ix).collect::<Vec<_>>())
            .collect();
        let from_iter: Vec<Point> = grid.collect();
        assert_eq!(from_slabs, from_iter);
    }

    #[test]
    fn adjacent_cells_share_exact_corners() {
        let grid = GridCells::new(&bounds([-0.3; 3], [1.0; 3]), 0.08);
        let a = cell_corners(grid.origin(3, 2, 5), 0.08);
        let b = cell_corners(grid.origin(4, 2, 5), 0.08);
        // Corner 1 of cell a is corner 0 of its +x neighbour, bit for bit.
        assert_eq!(a[1], b[0]);
        assert_eq!(a[2], b[3]);
        assert_eq!(a[5], b[4]);
        assert_eq!(a[6], b[7]);
    }

    #[test]
    fn degenerate_bounds_yield_no_cells() {
        let grid = GridCells::new(&bounds([0.0; 3], [0.0, 1.0, 1.0]), 0.1);
        assert!(grid.is_empty());
        assert_eq!(grid.collect::<Vec<_>>(), vec![]);
    }
}
