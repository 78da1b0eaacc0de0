use std::f64::consts::PI;

use crate::error::{ProjectionError, Result};
use crate::math::Point2;

use super::{normalize_longitude, GeoCoordinate, Projector};

/// Default size of one map tile in pixels.
pub const DEFAULT_TILE_SIZE: f64 = 256.0;

/// Spherical Web Mercator projection with a simple camera.
///
/// One world width spans `tile_size * 2^zoom` pixels. The camera center is
/// kept inside the `[0, 1)` world copy; items are shifted by whole world widths
/// next to it.
#[derive(Debug, Clone)]
pub struct WebMercatorProjector {
    center: Point2,
    zoom: f64,
    width: f64,
    height: f64,
    tile_size: f64,
}

impl WebMercatorProjector {
    /// Creates a projector for a viewport of `width` × `height` pixels,
    /// centered on (0, 0) at zoom 0.
    ///
    /// # Errors
    ///
    /// Returns `ProjectionError::InvalidViewport` if either dimension is not a
    /// positive finite number.
    pub fn new(width: f64, height: f64) -> Result<Self> {
        validate_size(width, height)?;
        Ok(Self {
            center: Point2::new(0.5, 0.5),
            zoom: 0.0,
            width,
            height,
            tile_size: super::DEFAULT_TILE_SIZE,
        })
    }

    /// Returns a copy using `tile_size` pixels per tile.
    ///
    /// # Errors
    ///
    /// Returns `ProjectionError::InvalidViewport` if `tile_size` is not
    /// positive and finite.
    pub fn with_tile_size(mut self, tile_size: f64) -> Result<Self> {
        if !tile_size.is_finite() || tile_size <= 0.0 {
            return Err(ProjectionError::InvalidViewport(format!(
                "tile size {tile_size} must be positive"
            ))
            .into());
        }
        self.tile_size = tile_size;
        Ok(self)
    }

    /// Moves the camera.
    ///
    /// # Errors
    ///
    /// Returns `ProjectionError::InvalidZoom` for a negative or non-finite
    /// zoom, and `ProjectionError::InvalidViewport` when the center cannot be
    /// projected.
    pub fn set_camera(&mut self, center: &GeoCoordinate, zoom: f64) -> Result<()> {
        if !zoom.is_finite() || zoom < 0.0 {
            return Err(ProjectionError::InvalidZoom(zoom).into());
        }
        let projected = self.geo_to_map_projection(center);
        if !crate::math::is_finite(&projected) {
            return Err(ProjectionError::InvalidViewport(format!(
                "camera center ({}, {}) cannot be projected",
                center.latitude, center.longitude
            ))
            .into());
        }
        self.center = clamp_center(projected);
        self.zoom = zoom;
        Ok(())
    }

    /// Resizes the viewport.
    ///
    /// # Errors
    ///
    /// Returns `ProjectionError::InvalidViewport` if either dimension is not a
    /// positive finite number.
    pub fn set_viewport_size(&mut self, width: f64, height: f64) -> Result<()> {
        validate_size(width, height)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Pans the camera by a screen-space offset in pixels.
    pub fn pan_by_pixels(&mut self, dx: f64, dy: f64) {
        let scale = self.pixels_per_world();
        let moved = Point2::new(self.center.x + dx / scale, self.center.y + dy / scale);
        if crate::math::is_finite(&moved) {
            self.center = clamp_center(moved);
        }
    }

    /// Camera center as a geographic coordinate.
    #[must_use]
    pub fn center(&self) -> GeoCoordinate {
        self.map_projection_to_geo(&self.center)
    }

    #[must_use]
    pub fn tile_size(&self) -> f64 {
        self.tile_size
    }
}

impl Projector for WebMercatorProjector {
    fn geo_to_map_projection(&self, coord: &GeoCoordinate) -> Point2 {
        if !coord.latitude.is_finite()
            || !coord.longitude.is_finite()
            || coord.latitude.abs() > 90.0
        {
            return Point2::new(f64::NAN, f64::NAN);
        }
        let x = (coord.longitude + 180.0) / 360.0;
        let sin_lat = coord.latitude.to_radians().sin();
        // Infinite at the poles, which lie outside the projection's domain.
        let y = 0.5 - ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / (4.0 * PI);
        Point2::new(x, y)
    }

    fn map_projection_to_geo(&self, point: &Point2) -> GeoCoordinate {
        let longitude = normalize_longitude(point.x * 360.0 - 180.0);
        let latitude = (PI * (1.0 - 2.0 * point.y)).sinh().atan().to_degrees();
        GeoCoordinate::new(latitude, longitude)
    }

    fn camera_center(&self) -> Point2 {
        self.center
    }

    fn zoom_level(&self) -> f64 {
        self.zoom
    }

    fn pixels_per_world(&self) -> f64 {
        self.tile_size * self.zoom.exp2()
    }

    fn viewport_size(&self) -> (f64, f64) {
        (self.width, self.height)
    }
}

fn validate_size(width: f64, height: f64) -> Result<()> {
    if !width.is_finite() || !height.is_finite() || width <= 0.0 || height <= 0.0 {
        return Err(ProjectionError::InvalidViewport(format!(
            "viewport size {width}x{height} must be positive"
        ))
        .into());
    }
    Ok(())
}

fn clamp_center(p: Point2) -> Point2 {
    Point2::new(p.x.rem_euclid(1.0), p.y.clamp(0.0, 1.0))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn projector() -> WebMercatorProjector {
        WebMercatorProjector::new(800.0, 600.0).unwrap()
    }

    #[test]
    fn projects_origin_to_world_center() {
        let p = projector().geo_to_map_projection(&GeoCoordinate::new(0.0, 0.0));
        assert_abs_diff_eq!(p.x, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn antimeridian_maps_to_world_edges() {
        let proj = projector();
        let west = proj.geo_to_map_projection(&GeoCoordinate::new(0.0, -180.0));
        let east = proj.geo_to_map_projection(&GeoCoordinate::new(0.0, 180.0));
        assert_abs_diff_eq!(west.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(east.x, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn poles_are_not_projectable() {
        let proj = projector();
        assert!(!crate::math::is_finite(
            &proj.geo_to_map_projection(&GeoCoordinate::new(90.0, 0.0))
        ));
        assert!(!crate::math::is_finite(
            &proj.geo_to_map_projection(&GeoCoordinate::new(-90.0, 10.0))
        ));
        assert!(!crate::math::is_finite(
            &proj.geo_to_map_projection(&GeoCoordinate::new(f64::NAN, 10.0))
        ));
    }

    #[test]
    fn round_trip() {
        let proj = projector();
        let c = GeoCoordinate::new(48.8566, 2.3522);
        let back = proj.map_projection_to_geo(&proj.geo_to_map_projection(&c));
        assert_abs_diff_eq!(back.latitude, c.latitude, epsilon = 1e-9);
        assert_abs_diff_eq!(back.longitude, c.longitude, epsilon = 1e-9);
    }

    #[test]
    fn camera_center_maps_to_viewport_center() {
        let mut proj = projector();
        proj.set_camera(&GeoCoordinate::new(10.0, 20.0), 3.0).unwrap();
        let center = proj.camera_center();
        let pos = proj.map_projection_to_item_position(&center);
        assert_abs_diff_eq!(pos.x, 400.0, epsilon = 1e-9);
        assert_abs_diff_eq!(pos.y, 300.0, epsilon = 1e-9);
        let back = proj.item_position_to_map_projection(&pos);
        assert_abs_diff_eq!(back.x, center.x, epsilon = 1e-12);
    }

    #[test]
    fn visible_region_scales_with_zoom() {
        let mut proj = projector();
        proj.set_camera(&GeoCoordinate::new(0.0, 0.0), 2.0).unwrap();
        let region = proj.visible_region();
        // 800 px at 1024 px per world.
        assert_abs_diff_eq!(region.width(), 800.0 / 1024.0, epsilon = 1e-12);
        assert_abs_diff_eq!(region.center().x, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn pan_wraps_center() {
        let mut proj = projector();
        proj.set_camera(&GeoCoordinate::new(0.0, 179.0), 0.0).unwrap();
        proj.pan_by_pixels(64.0, 0.0);
        assert!(proj.camera_center().x < 0.5);
        assert!(proj.center().longitude < 0.0);
    }

    #[test]
    fn rejects_invalid_setup() {
        assert!(WebMercatorProjector::new(0.0, 10.0).is_err());
        assert!(projector().with_tile_size(-1.0).is_err());
        let mut proj = projector();
        assert!(proj.set_camera(&GeoCoordinate::new(0.0, 0.0), -1.0).is_err());
        assert!(proj.set_camera(&GeoCoordinate::new(90.0, 0.0), 1.0).is_err());
        assert!(proj.set_viewport_size(10.0, f64::NAN).is_err());
    }
}
