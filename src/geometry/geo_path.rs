use crate::error::{GeometryError, Result};
use crate::projection::GeoCoordinate;

/// Number of outline points used for circles when no count is given.
pub const DEFAULT_CIRCLE_SEGMENTS: usize = 128;

/// A geographic path: an open polyline or a closed outline.
///
/// Closed paths (polygons, rectangles, circles) connect the last coordinate back
/// to the first and may carry interior holes. The path is immutable once built;
/// editing an overlay replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoPath {
    coordinates: Vec<GeoCoordinate>,
    closed: bool,
    holes: Vec<Vec<GeoCoordinate>>,
}

impl GeoPath {
    /// Creates an open polyline.
    #[must_use]
    pub fn open(coordinates: Vec<GeoCoordinate>) -> Self {
        Self {
            coordinates,
            closed: false,
            holes: Vec::new(),
        }
    }

    /// Creates a closed outline. A trailing coordinate equal to the first one
    /// is dropped, the closing segment is implicit.
    #[must_use]
    pub fn closed(coordinates: Vec<GeoCoordinate>) -> Self {
        Self {
            coordinates: strip_closing_duplicate(coordinates),
            closed: true,
            holes: Vec::new(),
        }
    }

    /// Creates the closed outline of a latitude/longitude rectangle.
    ///
    /// A rectangle whose `bottom_right` longitude is west of `top_left` spans
    /// the antimeridian.
    #[must_use]
    pub fn rectangle(top_left: GeoCoordinate, bottom_right: GeoCoordinate) -> Self {
        Self::closed(vec![
            GeoCoordinate::new(top_left.latitude, top_left.longitude),
            GeoCoordinate::new(top_left.latitude, bottom_right.longitude),
            GeoCoordinate::new(bottom_right.latitude, bottom_right.longitude),
            GeoCoordinate::new(bottom_right.latitude, top_left.longitude),
        ])
    }

    /// Creates the closed outline of a geodesic circle with `segments` points.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::ParameterOutOfRange` if the radius is not a
    /// positive finite number or fewer than 3 segments are requested, and
    /// `GeometryError::InvalidCoordinate` for an invalid center.
    #[allow(clippy::cast_precision_loss)]
    pub fn circle(center: GeoCoordinate, radius_m: f64, segments: usize) -> Result<Self> {
        if !center.is_valid() {
            return Err(GeometryError::InvalidCoordinate(format!(
                "circle center ({}, {})",
                center.latitude, center.longitude
            ))
            .into());
        }
        if !radius_m.is_finite() || radius_m <= 0.0 {
            return Err(GeometryError::ParameterOutOfRange {
                parameter: "radius",
                value: radius_m,
                min: f64::MIN_POSITIVE,
                max: f64::MAX,
            }
            .into());
        }
        if segments < 3 {
            return Err(GeometryError::ParameterOutOfRange {
                parameter: "segments",
                value: segments as f64,
                min: 3.0,
                max: f64::MAX,
            }
            .into());
        }
        let step = 360.0 / segments as f64;
        let points = (0..segments)
            .map(|i| center.at_distance_and_azimuth(radius_m, step * i as f64))
            .collect();
        Ok(Self::closed(points))
    }

    /// Adds an interior hole to a closed path.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::HolesOnOpenPath` if the path is open.
    pub fn with_hole(mut self, hole: Vec<GeoCoordinate>) -> Result<Self> {
        if !self.closed {
            return Err(GeometryError::HolesOnOpenPath.into());
        }
        self.holes.push(strip_closing_duplicate(hole));
        Ok(self)
    }

    /// Returns the outer ring (or polyline) coordinates.
    #[must_use]
    pub fn coordinates(&self) -> &[GeoCoordinate] {
        &self.coordinates
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[must_use]
    pub fn holes(&self) -> &[Vec<GeoCoordinate>] {
        &self.holes
    }

    /// Iterates over the outer ring followed by the holes.
    pub fn rings(&self) -> impl Iterator<Item = &[GeoCoordinate]> {
        std::iter::once(self.coordinates.as_slice()).chain(self.holes.iter().map(Vec::as_slice))
    }

    /// Total number of coordinates over all rings.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.rings().map(<[GeoCoordinate]>::len).sum()
    }

    /// Returns `true` if the outer ring has no coordinates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }
}

#[allow(clippy::float_cmp)]
fn strip_closing_duplicate(mut coordinates: Vec<GeoCoordinate>) -> Vec<GeoCoordinate> {
    if coordinates.len() > 1 {
        let first = coordinates[0];
        if let Some(last) = coordinates.last() {
            if last.latitude == first.latitude && last.longitude == first.longitude {
                coordinates.pop();
            }
        }
    }
    coordinates
}
