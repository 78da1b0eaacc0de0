use crate::error::{GeometryError, Result};

/// Mean earth radius used for spherical distance computations, in meters.
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_007.2;

/// A geographic coordinate in degrees.
///
/// Altitude is carried for callers but ignored by every projection.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
}

impl GeoCoordinate {
    /// Creates a coordinate without altitude.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
        }
    }

    /// Creates a coordinate, rejecting values outside the valid ranges.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::ParameterOutOfRange` if the latitude is outside
    /// `[-90, 90]` or the longitude outside `[-180, 180]`, and
    /// `GeometryError::InvalidCoordinate` for non-finite input.
    pub fn checked(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(GeometryError::InvalidCoordinate(format!(
                "({latitude}, {longitude}) is not finite"
            ))
            .into());
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(GeometryError::ParameterOutOfRange {
                parameter: "latitude",
                value: latitude,
                min: -90.0,
                max: 90.0,
            }
            .into());
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(GeometryError::ParameterOutOfRange {
                parameter: "longitude",
                value: longitude,
                min: -180.0,
                max: 180.0,
            }
            .into());
        }
        Ok(Self::new(latitude, longitude))
    }

    /// Returns a copy with the given altitude.
    #[must_use]
    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    /// Returns `true` if the coordinate is finite and within the valid ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Returns the coordinate reached by travelling `distance_m` meters along
    /// the great circle starting at `azimuth_deg` (clockwise from north).
    #[must_use]
    pub fn at_distance_and_azimuth(&self, distance_m: f64, azimuth_deg: f64) -> Self {
        let lat1 = self.latitude.to_radians();
        let lon1 = self.longitude.to_radians();
        let azimuth = azimuth_deg.to_radians();
        let delta = distance_m / EARTH_MEAN_RADIUS_M;

        let sin_lat2 = lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * azimuth.cos();
        let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();
        let lon2 = lon1
            + (azimuth.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * sin_lat2);

        Self {
            latitude: lat2.to_degrees(),
            longitude: normalize_longitude(lon2.to_degrees()),
            altitude: self.altitude,
        }
    }

    /// Great-circle distance to `other` in meters (haversine).
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();
        let h = (dlat * 0.5).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon * 0.5).sin().powi(2);
        2.0 * EARTH_MEAN_RADIUS_M * h.sqrt().min(1.0).asin()
    }
}

/// Wraps a longitude into `[-180, 180)`.
#[must_use]
pub fn normalize_longitude(longitude: f64) -> f64 {
    (longitude + 180.0).rem_euclid(360.0) - 180.0
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn checked_rejects_out_of_range() {
        assert!(GeoCoordinate::checked(91.0, 0.0).is_err());
        assert!(GeoCoordinate::checked(0.0, -181.0).is_err());
        assert!(GeoCoordinate::checked(f64::NAN, 0.0).is_err());
        assert!(GeoCoordinate::checked(45.0, 179.0).is_ok());
    }

    #[test]
    fn normalize_longitude_wraps() {
        assert_abs_diff_eq!(normalize_longitude(190.0), -170.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_longitude(-190.0), 170.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_longitude(180.0), -180.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_longitude(12.5), 12.5, epsilon = 1e-12);
    }

    #[test]
    fn destination_round_trips_distance() {
        let origin = GeoCoordinate::new(52.5, 13.4);
        let dest = origin.at_distance_and_azimuth(10_000.0, 45.0);
        assert_abs_diff_eq!(origin.distance_to(&dest), 10_000.0, epsilon = 1e-3);
    }

    #[test]
    fn destination_due_north() {
        let origin = GeoCoordinate::new(0.0, 0.0);
        // One degree of arc along a meridian.
        let one_degree = EARTH_MEAN_RADIUS_M * 1.0_f64.to_radians();
        let dest = origin.at_distance_and_azimuth(one_degree, 0.0);
        assert_abs_diff_eq!(dest.latitude, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(dest.longitude, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn destination_crosses_antimeridian() {
        let origin = GeoCoordinate::new(0.0, 179.5);
        let one_degree = EARTH_MEAN_RADIUS_M * 1.0_f64.to_radians();
        let dest = origin.at_distance_and_azimuth(one_degree, 90.0);
        assert_abs_diff_eq!(dest.longitude, -179.5, epsilon = 1e-9);
    }

    #[test]
    fn altitude_is_carried() {
        let c = GeoCoordinate::new(1.0, 2.0).with_altitude(30.0);
        assert_eq!(c.altitude, Some(30.0));
        assert!(c.is_valid());
    }
}
