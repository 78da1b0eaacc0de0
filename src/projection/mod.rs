mod coordinate;
mod web_mercator;

pub use coordinate::{normalize_longitude, GeoCoordinate, EARTH_MEAN_RADIUS_M};
pub use web_mercator::{WebMercatorProjector, DEFAULT_TILE_SIZE};

use crate::math::{Point2, Rect};

/// Width of one world copy in the map-projection plane.
pub const WORLD_WIDTH: f64 = 1.0;

/// Converts between geographic coordinates, the continuous map-projection
/// plane and item (screen) positions for the current camera.
///
/// The map-projection plane is normalized so that one world copy spans
/// `[0, 1)` in x. It is unbounded: x values outside that range denote the
/// neighbouring world copies east and west of the antimeridian.
pub trait Projector {
    /// Projects a coordinate. Returns a non-finite point when the coordinate
    /// is outside the projection's domain.
    fn geo_to_map_projection(&self, coord: &GeoCoordinate) -> Point2;

    /// Inverse of [`Projector::geo_to_map_projection`]. The longitude is
    /// normalized into `[-180, 180)`.
    fn map_projection_to_geo(&self, point: &Point2) -> GeoCoordinate;

    /// Camera center in the map-projection plane, x in `[0, 1)`.
    fn camera_center(&self) -> Point2;

    /// Current (fractional) zoom level.
    fn zoom_level(&self) -> f64;

    /// Number of screen pixels spanned by one world width at the current zoom.
    fn pixels_per_world(&self) -> f64;

    /// Viewport size in pixels as `(width, height)`.
    fn viewport_size(&self) -> (f64, f64);

    /// Visible rectangle in map-projection coordinates of the world copy that
    /// contains the camera center.
    fn visible_region(&self) -> Rect {
        let (w, h) = self.viewport_size();
        let scale = self.pixels_per_world();
        let half_w = w * 0.5 / scale;
        let half_h = h * 0.5 / scale;
        let c = self.camera_center();
        Rect::new(
            Point2::new(c.x - half_w, c.y - half_h),
            Point2::new(c.x + half_w, c.y + half_h),
        )
    }

    /// Converts a map-projection point, already shifted to the camera's world
    /// copy, to an item (screen) position in pixels.
    fn map_projection_to_item_position(&self, point: &Point2) -> Point2 {
        let (w, h) = self.viewport_size();
        let scale = self.pixels_per_world();
        let c = self.camera_center();
        Point2::new(
            (point.x - c.x) * scale + w * 0.5,
            (point.y - c.y) * scale + h * 0.5,
        )
    }

    /// Inverse of [`Projector::map_projection_to_item_position`].
    fn item_position_to_map_projection(&self, position: &Point2) -> Point2 {
        let (w, h) = self.viewport_size();
        let scale = self.pixels_per_world();
        let c = self.camera_center();
        Point2::new(
            (position.x - w * 0.5) / scale + c.x,
            (position.y - h * 0.5) / scale + c.y,
        )
    }
}

/// Returns the whole number of world widths that moves the x-interval
/// `[min_x, max_x]` closest to `center_x`.
///
/// Zero when the interval already contains the center.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn wrap_shift_towards(min_x: f64, max_x: f64, center_x: f64) -> i32 {
    if !min_x.is_finite() || !max_x.is_finite() || !center_x.is_finite() {
        return 0;
    }
    let distance = |shift: f64| {
        let lo = min_x + shift;
        let hi = max_x + shift;
        if center_x < lo {
            lo - center_x
        } else if center_x > hi {
            center_x - hi
        } else {
            0.0
        }
    };
    let base = (center_x - (min_x + max_x) * 0.5).round();
    let mut best = base;
    for candidate in [base - 1.0, base + 1.0] {
        if distance(candidate) < distance(best) {
            best = candidate;
        }
    }
    best as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_zero_when_containing_center() {
        assert_eq!(wrap_shift_towards(0.2, 0.9, 0.85), 0);
    }

    #[test]
    fn shift_moves_to_next_world() {
        // Path near the east edge, camera near the west edge.
        assert_eq!(wrap_shift_towards(0.95, 0.99, 0.02), -1);
        assert_eq!(wrap_shift_towards(1.01, 1.05, 0.98), 0);
        assert_eq!(wrap_shift_towards(2.1, 2.2, 0.15), -2);
    }

    #[test]
    fn shift_ignores_non_finite() {
        assert_eq!(wrap_shift_towards(f64::NAN, 1.0, 0.5), 0);
    }
}
