use tracing::trace;

use crate::geometry::{GeoPath, WrappedPath, WrappedSubpath};
use crate::math::{is_finite, Point2, Rect, Vector2};
use crate::projection::{GeoCoordinate, Projector, WORLD_WIDTH};

/// A run of wrapped points plus the wrap offset of its first point.
type Run = (Vec<Point2>, i32);

/// Projects a geographic path and removes antimeridian seams.
///
/// # Algorithm
///
/// 1. Each ring is walked with a running wrap offset. Every projected point is
///    moved by whole world widths until it lies within half a world width of the
///    previous point, so no segment jumps across the whole plane.
/// 2. Vertices outside the projection's domain are skipped and break the ring
///    into separate open runs. For closed rings the runs on both sides of the
///    start are rejoined through the closing segment.
/// 3. An unbroken closed ring whose closing segment crosses the seam (a ring
///    around a pole) gets its first point re-appended next to the last one and
///    becomes an explicit open outline.
/// 4. The whole result is shifted by one integer number of worlds: without an
///    anchor the bounding box's left edge lands in `[0, 1)`; with an anchor the
///    left edge lands as close as possible to the anchor's projection, keeping
///    repeated recomputation stable.
#[derive(Debug)]
pub struct PathWrapper<'a, P: Projector + ?Sized> {
    path: &'a GeoPath,
    projector: &'a P,
    anchor: Option<GeoCoordinate>,
}

impl<'a, P: Projector + ?Sized> PathWrapper<'a, P> {
    /// Creates a new wrap operation.
    #[must_use]
    pub fn new(path: &'a GeoPath, projector: &'a P) -> Self {
        Self {
            path,
            projector,
            anchor: None,
        }
    }

    /// Anchors the output next to a previously computed left bound.
    #[must_use]
    pub fn with_anchor(mut self, anchor: Option<GeoCoordinate>) -> Self {
        self.anchor = anchor;
        self
    }

    /// Executes the wrap. Paths with nothing projectable yield an empty result.
    #[must_use]
    pub fn execute(&self) -> WrappedPath {
        let mut subpaths = Vec::new();
        let mut skipped = 0usize;
        let mut outer_center: Option<f64> = None;

        for ring in self.path.rings() {
            let start = subpaths.len();
            self.wrap_ring(ring, &mut subpaths, &mut skipped);
            let Some(ring_bounds) =
                Rect::from_points(subpaths[start..].iter().flat_map(|s| s.points.iter()))
            else {
                continue;
            };
            match outer_center {
                None => outer_center = Some(ring_bounds.center().x),
                Some(center) => {
                    // Holes are wrapped on their own, then moved onto the
                    // outer ring's world copy.
                    let shift = world_steps(center - ring_bounds.center().x);
                    if shift != 0 {
                        for sub in &mut subpaths[start..] {
                            *sub = sub.shifted(shift);
                        }
                    }
                }
            }
        }

        if skipped > 0 {
            trace!(skipped, "skipped vertices outside the projection domain");
        }

        let Some(bounds) = Rect::from_points(subpaths.iter().flat_map(|s| s.points.iter())) else {
            return WrappedPath::default();
        };

        let shift = self.normalization_shift(&bounds);
        let (subpaths, bounds) = if shift == 0 {
            (subpaths, bounds)
        } else {
            (
                subpaths.iter().map(|s| s.shifted(shift)).collect(),
                bounds.translated(Vector2::new(f64::from(shift), 0.0)),
            )
        };

        let left_bound = self.projector.map_projection_to_geo(&bounds.min);
        WrappedPath {
            subpaths,
            bounds: Some(bounds),
            left_bound: Some(left_bound),
        }
    }

    /// Wraps one ring, appending its subpaths to `out`.
    fn wrap_ring(&self, ring: &[GeoCoordinate], out: &mut Vec<WrappedSubpath>, skipped: &mut usize) {
        let closed = self.path.is_closed();
        let mut offset = 0i32;
        let mut prev: Option<Point2> = None;
        let mut runs: Vec<Run> = Vec::new();
        let mut run: Vec<Point2> = Vec::new();
        let mut run_offset = 0i32;
        let mut broken = false;

        for coord in ring {
            let raw = self.projector.geo_to_map_projection(coord);
            if !is_finite(&raw) {
                *skipped += 1;
                broken = true;
                if !run.is_empty() {
                    runs.push((std::mem::take(&mut run), run_offset));
                }
                continue;
            }

            let mut p = Point2::new(raw.x + f64::from(offset), raw.y);
            if let Some(prev) = prev {
                let steps = world_steps(p.x - prev.x);
                if steps != 0 {
                    offset -= steps;
                    p.x -= f64::from(steps) * WORLD_WIDTH;
                }
            }
            if run.is_empty() {
                run_offset = offset;
            }
            run.push(p);
            prev = Some(p);
        }
        if !run.is_empty() {
            runs.push((run, run_offset));
        }

        if closed && !broken {
            if let Some((points, wrap_offset)) = runs.pop() {
                out.push(close_ring(points, wrap_offset));
            }
            return;
        }

        if closed && runs.len() >= 2 {
            let starts_valid = ring.first().is_some_and(|c| self.is_projectable(c));
            let ends_valid = ring.last().is_some_and(|c| self.is_projectable(c));
            if starts_valid && ends_valid {
                rejoin_through_start(&mut runs);
            }
        }

        out.extend(
            runs.into_iter()
                .filter(|(points, _)| points.len() >= 2)
                .map(|(points, wrap_offset)| WrappedSubpath::new(points, false, wrap_offset)),
        );
    }

    fn is_projectable(&self, coord: &GeoCoordinate) -> bool {
        is_finite(&self.projector.geo_to_map_projection(coord))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn normalization_shift(&self, bounds: &Rect) -> i32 {
        let anchor_x = self
            .anchor
            .map(|c| self.projector.geo_to_map_projection(&c).x)
            .filter(|x| x.is_finite());
        let shift = match anchor_x {
            Some(ax) => (ax - bounds.min.x).round(),
            None => -bounds.min.x.floor(),
        };
        shift as i32
    }
}

/// Whole world widths separating two x values by more than half a world.
#[allow(clippy::cast_possible_truncation)]
fn world_steps(dx: f64) -> i32 {
    (dx / WORLD_WIDTH).round() as i32
}

/// Builds the subpath of an unbroken closed ring.
fn close_ring(mut points: Vec<Point2>, wrap_offset: i32) -> WrappedSubpath {
    if points.len() >= 2 {
        let first = points[0];
        let last = points[points.len() - 1];
        let steps = world_steps(first.x - last.x);
        if steps != 0 {
            points.push(Point2::new(first.x - f64::from(steps) * WORLD_WIDTH, first.y));
            return WrappedSubpath::new(points, false, wrap_offset);
        }
    }
    WrappedSubpath::new(points, true, wrap_offset)
}

/// Joins the last run of a broken closed ring with its first run, since the
/// closing segment connects them.
fn rejoin_through_start(runs: &mut Vec<Run>) {
    let (head, _) = runs.remove(0);
    if let Some((tail, _)) = runs.last_mut() {
        let Some(last) = tail.last().copied() else {
            return;
        };
        let steps = f64::from(world_steps(head[0].x - last.x)) * WORLD_WIDTH;
        tail.extend(head.iter().map(|p| Point2::new(p.x - steps, p.y)));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::projection::WebMercatorProjector;

    fn projector() -> WebMercatorProjector {
        WebMercatorProjector::new(512.0, 512.0).unwrap()
    }

    fn c(lat: f64, lon: f64) -> GeoCoordinate {
        GeoCoordinate::new(lat, lon)
    }

    fn assert_seam_free(wrapped: &WrappedPath) {
        for sub in &wrapped.subpaths {
            for pair in sub.points.windows(2) {
                assert!(
                    (pair[1].x - pair[0].x).abs() <= 0.5 + 1e-12,
                    "seam between {:?} and {:?}",
                    pair[0],
                    pair[1]
                );
            }
        }
    }

    #[test]
    fn antimeridian_crossing_stays_adjacent() {
        let proj = projector();
        let path = GeoPath::open(vec![c(0.0, -179.0), c(0.0, 179.0), c(0.0, 0.0)]);
        let wrapped = PathWrapper::new(&path, &proj).execute();

        assert_eq!(wrapped.subpaths.len(), 1);
        let pts = &wrapped.subpaths[0].points;
        // The -179° vertex lands just past the east edge of the world.
        assert_abs_diff_eq!(pts[0].x, 1.0 + 1.0 / 360.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pts[1].x, 1.0 - 1.0 / 360.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pts[2].x, 0.5, epsilon = 1e-12);
        // Two degrees of longitude, not 358.
        assert_abs_diff_eq!((pts[0] - pts[1]).norm(), 2.0 / 360.0, epsilon = 1e-12);
        assert_seam_free(&wrapped);
    }

    #[test]
    fn bounds_and_left_bound() {
        let proj = projector();
        let path = GeoPath::open(vec![c(0.0, -179.0), c(0.0, 179.0), c(0.0, 0.0)]);
        let wrapped = PathWrapper::new(&path, &proj).execute();

        let bounds = wrapped.bounds.unwrap();
        assert!(bounds.min.x >= 0.0 && bounds.min.x < 1.0);
        let left = wrapped.left_bound.unwrap();
        assert_abs_diff_eq!(left.longitude, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(left.latitude, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn wrap_offset_counts_worlds() {
        let proj = projector();
        let path = GeoPath::open(vec![c(0.0, 170.0), c(0.0, -170.0), c(0.0, -160.0)]);
        let wrapped = PathWrapper::new(&path, &proj).execute();
        let sub = &wrapped.subpaths[0];
        // First point needs no shift; the later points were moved one world east.
        assert_eq!(sub.wrap_offset, 0);
        assert_abs_diff_eq!(sub.points[1].x, 1.0 + 10.0 / 360.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sub.points[2].x, 1.0 + 20.0 / 360.0, epsilon = 1e-12);
    }

    #[test]
    fn unprojectable_vertex_breaks_open_path() {
        let proj = projector();
        let path = GeoPath::open(vec![
            c(10.0, 0.0),
            c(20.0, 0.0),
            c(90.0, 0.0),
            c(20.0, 10.0),
            c(10.0, 10.0),
        ]);
        let wrapped = PathWrapper::new(&path, &proj).execute();
        assert_eq!(wrapped.subpaths.len(), 2);
        assert!(wrapped.subpaths.iter().all(|s| !s.closed && s.points.len() == 2));
    }

    #[test]
    fn isolated_vertex_between_breaks_is_dropped() {
        let proj = projector();
        let path = GeoPath::open(vec![c(90.0, 0.0), c(10.0, 0.0), c(-90.0, 0.0)]);
        let wrapped = PathWrapper::new(&path, &proj).execute();
        assert!(wrapped.is_empty());
        assert!(wrapped.bounds.is_none());
        assert!(wrapped.left_bound.is_none());
    }

    #[test]
    fn broken_closed_ring_rejoins_through_start() {
        let proj = projector();
        let path = GeoPath::closed(vec![
            c(0.0, 0.0),
            c(0.0, 10.0),
            c(90.0, 10.0),
            c(10.0, 10.0),
            c(10.0, 0.0),
        ]);
        let wrapped = PathWrapper::new(&path, &proj).execute();
        assert_eq!(wrapped.subpaths.len(), 1);
        let sub = &wrapped.subpaths[0];
        assert!(!sub.closed);
        assert_eq!(sub.points.len(), 4);
        // Run after the break comes first, then the run from the start.
        let first = proj.geo_to_map_projection(&c(10.0, 10.0));
        assert_abs_diff_eq!(sub.points[0].y, first.y, epsilon = 1e-12);
    }

    #[test]
    fn ring_around_pole_is_closed_explicitly() {
        let proj = projector();
        let path = GeoPath::closed(vec![
            c(80.0, -135.0),
            c(80.0, -45.0),
            c(80.0, 45.0),
            c(80.0, 135.0),
        ]);
        let wrapped = PathWrapper::new(&path, &proj).execute();
        let sub = &wrapped.subpaths[0];
        assert!(!sub.closed);
        assert_eq!(sub.points.len(), 5);
        assert_abs_diff_eq!(sub.points[4].x - sub.points[0].x, 1.0, epsilon = 1e-12);
        assert_seam_free(&wrapped);
    }

    #[test]
    fn ordinary_ring_stays_closed() {
        let proj = projector();
        let path = GeoPath::rectangle(c(10.0, 170.0), c(-10.0, -170.0));
        let wrapped = PathWrapper::new(&path, &proj).execute();
        let sub = &wrapped.subpaths[0];
        assert!(sub.closed);
        assert_eq!(sub.points.len(), 4);
        let bounds = wrapped.bounds.unwrap();
        assert_abs_diff_eq!(bounds.width(), 20.0 / 360.0, epsilon = 1e-12);
    }

    #[test]
    fn hole_follows_outer_ring_across_seam() {
        let proj = projector();
        let path = GeoPath::closed(vec![c(10.0, 170.0), c(10.0, -170.0), c(-10.0, -170.0), c(-10.0, 170.0)])
            .with_hole(vec![c(5.0, -175.0), c(5.0, -172.0), c(-5.0, -172.0)])
            .unwrap();
        let wrapped = PathWrapper::new(&path, &proj).execute();
        assert_eq!(wrapped.subpaths.len(), 2);
        let outer = Rect::from_points(&wrapped.subpaths[0].points).unwrap();
        let hole = Rect::from_points(&wrapped.subpaths[1].points).unwrap();
        assert!(outer.contains(&hole.min) && outer.contains(&hole.max));
    }

    #[test]
    fn hole_far_from_first_vertex_of_wide_ring() {
        let proj = projector();
        let path = GeoPath::closed(vec![
            c(10.0, -170.0),
            c(10.0, -40.0),
            c(10.0, 100.0),
            c(-10.0, 100.0),
            c(-10.0, -40.0),
            c(-10.0, -170.0),
        ])
        .with_hole(vec![c(5.0, 85.0), c(5.0, 95.0), c(-5.0, 95.0), c(-5.0, 85.0)])
        .unwrap();
        let wrapped = PathWrapper::new(&path, &proj).execute();
        assert_eq!(wrapped.subpaths.len(), 2);
        let outer = &wrapped.subpaths[0].points;
        let hole = Rect::from_points(&wrapped.subpaths[1].points).unwrap();
        assert!(crate::math::polygon_2d::point_in_ring(&hole.center(), outer));
        let outer_bounds = Rect::from_points(outer).unwrap();
        assert!(outer_bounds.contains(&hole.min) && outer_bounds.contains(&hole.max));
    }

    #[test]
    fn anchor_keeps_previous_world_copy() {
        let proj = projector();
        let path = GeoPath::open(vec![c(0.0, 170.0), c(0.0, -170.0)]);

        let free = PathWrapper::new(&path, &proj).execute();
        assert_abs_diff_eq!(free.bounds.unwrap().min.x, 170.0 / 360.0 + 0.5, epsilon = 1e-12);

        // An anchor just east of the antimeridian pulls the path one world west.
        let anchored = PathWrapper::new(&path, &proj)
            .with_anchor(Some(c(0.0, -179.0)))
            .execute();
        let min_x = anchored.bounds.unwrap().min.x;
        assert_abs_diff_eq!(min_x, 170.0 / 360.0 - 0.5, epsilon = 1e-12);

        // Re-anchoring to its own left bound is stable.
        let again = PathWrapper::new(&path, &proj)
            .with_anchor(free.left_bound)
            .execute();
        assert_eq!(again, free);
    }

    proptest! {
        #[test]
        fn neighbours_within_half_a_world(
            coords in prop::collection::vec((-80.0f64..80.0, -180.0f64..=180.0), 2..40)
        ) {
            let proj = projector();
            let path = GeoPath::open(coords.iter().map(|&(lat, lon)| c(lat, lon)).collect());
            let wrapped = PathWrapper::new(&path, &proj).execute();
            prop_assert_eq!(wrapped.vertex_count(), coords.len());
            for sub in &wrapped.subpaths {
                for pair in sub.points.windows(2) {
                    prop_assert!((pair[1].x - pair[0].x).abs() <= 0.5 + 1e-12);
                }
            }
            let bounds = wrapped.bounds.unwrap();
            prop_assert!(bounds.min.x >= -1e-12 && bounds.min.x < 1.0);
        }
    }
}
