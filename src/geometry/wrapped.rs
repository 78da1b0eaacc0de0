use crate::math::{Point2, Rect, Vector2};
use crate::projection::GeoCoordinate;

/// A seam-free run of projected points.
///
/// Consecutive points are never more than half a world width apart in x.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WrappedSubpath {
    /// Points in the continuous map-projection plane.
    pub points: Vec<Point2>,
    /// Whether the last point connects back to the first.
    pub closed: bool,
    /// World widths added to the first point's raw projection.
    pub wrap_offset: i32,
}

impl WrappedSubpath {
    /// Creates a subpath.
    #[must_use]
    pub fn new(points: Vec<Point2>, closed: bool, wrap_offset: i32) -> Self {
        Self {
            points,
            closed,
            wrap_offset,
        }
    }

    /// Number of segments, counting the closing segment of closed subpaths.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        let n = self.points.len();
        if n < 2 {
            0
        } else if self.closed {
            n
        } else {
            n - 1
        }
    }

    /// Returns `true` if the subpath has too few points to be drawn.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.points.len() < if self.closed { 3 } else { 2 }
    }

    /// Returns a copy moved by `shift` whole world widths.
    #[must_use]
    pub fn shifted(&self, shift: i32) -> Self {
        let offset = Vector2::new(f64::from(shift), 0.0);
        Self {
            points: self.points.iter().map(|p| p + offset).collect(),
            closed: self.closed,
            wrap_offset: self.wrap_offset + shift,
        }
    }
}

/// Output of the path wrapper: all seam-free subpaths of one geographic path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WrappedPath {
    pub subpaths: Vec<WrappedSubpath>,
    /// Bounding box of all points, `None` when nothing could be projected.
    pub bounds: Option<Rect>,
    /// Geographic coordinate of the bounding box's top-left corner.
    pub left_bound: Option<GeoCoordinate>,
}

impl WrappedPath {
    /// Total number of points over all subpaths.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.subpaths.iter().map(|s| s.points.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subpaths.is_empty()
    }
}
