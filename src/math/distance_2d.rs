use super::Point2;

/// Returns the minimum distance from `p` to the segment `a`–`b`.
///
/// The projection of `p` onto the segment's line is clamped to the segment, so
/// points beyond either end measure to that endpoint.
#[must_use]
pub fn point_to_segment_dist(p: &Point2, a: &Point2, b: &Point2) -> f64 {
    let d = b - a;
    let len_sq = d.norm_squared();

    if len_sq < 1e-20 {
        // Degenerate segment (zero length).
        return (p - a).norm();
    }

    // Project point onto the infinite line, clamp to [0, 1].
    let t = ((p - a).dot(&d) / len_sq).clamp(0.0, 1.0);
    let closest = a + d * t;

    (p - closest).norm()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-10;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    // ── point_to_segment_dist ──

    #[test]
    fn segment_dist_perpendicular_projection() {
        // Point (1, 1) to segment (0,0)→(2,0). Closest at (1,0), dist = 1.
        let d = point_to_segment_dist(&p(1.0, 1.0), &p(0.0, 0.0), &p(2.0, 0.0));
        assert!((d - 1.0).abs() < TOL, "d={d}");
    }

    #[test]
    fn segment_dist_endpoint_closest() {
        let d = point_to_segment_dist(&p(-1.0, 0.0), &p(0.0, 0.0), &p(2.0, 0.0));
        assert!((d - 1.0).abs() < TOL, "d={d}");
    }

    #[test]
    fn segment_dist_on_segment() {
        let d = point_to_segment_dist(&p(1.0, 0.0), &p(0.0, 0.0), &p(2.0, 0.0));
        assert!(d.abs() < TOL, "d={d}");
    }

    #[test]
    fn segment_dist_degenerate() {
        let d = point_to_segment_dist(&p(3.0, 4.0), &p(0.0, 0.0), &p(0.0, 0.0));
        assert!((d - 5.0).abs() < TOL, "d={d}");
    }
}
