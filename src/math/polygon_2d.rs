use super::{Point2, Vector2};

/// Computes the signed area of a polygon (shoelace formula).
///
/// Positive for counter-clockwise in a y-up frame, negative for clockwise.
#[must_use]
pub fn signed_area_2d(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    sum * 0.5
}

/// Even-odd point-in-polygon test for an implicitly closed ring.
///
/// Points exactly on an edge may report either side.
#[must_use]
pub fn point_in_ring(p: &Point2, ring: &[Point2]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = &ring[i];
        let b = &ring[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// 2D cross product (z component of the 3D cross product).
#[must_use]
pub fn cross_2d(a: &Vector2, b: &Vector2) -> f64 {
    a.x * b.y - a.y * b.x
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::TOLERANCE;

    fn square() -> Vec<Point2> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ]
    }

    #[test]
    fn signed_area_ccw_square() {
        assert!((signed_area_2d(&square()) - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn signed_area_cw_square() {
        let mut pts = square();
        pts.reverse();
        assert!((signed_area_2d(&pts) + 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn signed_area_degenerate() {
        assert!(signed_area_2d(&[Point2::new(0.0, 0.0)]).abs() < TOLERANCE);
        assert!(signed_area_2d(&[]).abs() < TOLERANCE);
    }

    #[test]
    fn point_in_ring_inside_outside() {
        let sq = square();
        assert!(point_in_ring(&Point2::new(0.5, 0.5), &sq));
        assert!(!point_in_ring(&Point2::new(1.5, 0.5), &sq));
        assert!(!point_in_ring(&Point2::new(0.5, -0.1), &sq));
    }

    #[test]
    fn point_in_ring_concave() {
        // U shape: the notch between the arms is outside.
        let u = vec![
            Point2::new(0.0, 0.0),
            Point2::new(3.0, 0.0),
            Point2::new(3.0, 3.0),
            Point2::new(2.0, 3.0),
            Point2::new(2.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 3.0),
            Point2::new(0.0, 3.0),
        ];
        assert!(point_in_ring(&Point2::new(0.5, 2.0), &u));
        assert!(!point_in_ring(&Point2::new(1.5, 2.0), &u));
    }
}
