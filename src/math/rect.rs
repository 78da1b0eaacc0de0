use super::{Point2, Vector2};

/// An axis-aligned rectangle.
///
/// `min` is the top-left corner in screen and map-projection space (y grows
/// downward / southward), `max` the bottom-right corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Minimum corner.
    pub min: Point2,
    /// Maximum corner.
    pub max: Point2,
}

impl Default for Rect {
    fn default() -> Self {
        Self {
            min: Point2::origin(),
            max: Point2::origin(),
        }
    }
}

impl Rect {
    /// Creates a rectangle from two opposite corners in any order.
    #[must_use]
    pub fn new(a: Point2, b: Point2) -> Self {
        Self {
            min: Point2::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Creates a rectangle from its top-left corner and size.
    #[must_use]
    pub fn from_origin_size(origin: Point2, width: f64, height: f64) -> Self {
        Self::new(origin, Point2::new(origin.x + width, origin.y + height))
    }

    /// Returns the bounding rectangle of `points`, ignoring non-finite ones.
    ///
    /// Returns `None` when no finite point is present.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point2>) -> Option<Self> {
        let mut bounds: Option<Self> = None;
        for p in points {
            if !super::is_finite(p) {
                continue;
            }
            bounds = Some(match bounds {
                None => Self { min: *p, max: *p },
                Some(b) => b.including(p),
            });
        }
        bounds
    }

    /// Returns this rectangle grown to include `p`.
    #[must_use]
    pub fn including(&self, p: &Point2) -> Self {
        Self {
            min: Point2::new(self.min.x.min(p.x), self.min.y.min(p.y)),
            max: Point2::new(self.max.x.max(p.x), self.max.y.max(p.y)),
        }
    }

    /// Returns the smallest rectangle containing both rectangles.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        self.including(&other.min).including(&other.max)
    }

    /// Returns this rectangle expanded by `margin` on every side.
    #[must_use]
    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            min: Point2::new(self.min.x - margin, self.min.y - margin),
            max: Point2::new(self.max.x + margin, self.max.y + margin),
        }
    }

    /// Returns this rectangle moved by `offset`.
    #[must_use]
    pub fn translated(&self, offset: Vector2) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    #[must_use]
    pub fn center(&self) -> Point2 {
        nalgebra::center(&self.min, &self.max)
    }

    /// Returns `true` if the rectangle has no area.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Returns `true` if `p` lies inside or on the border.
    #[must_use]
    pub fn contains(&self, p: &Point2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Returns `true` if the two rectangles overlap or touch.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }
}
