use crate::math::distance_2d::point_to_segment_dist;
use crate::math::Point2;

/// Number of cached LOD levels.
pub const LOD_LEVEL_COUNT: usize = 7;

/// Zoom level at and above which the unsimplified geometry is used.
pub const MAX_SIMPLIFIED_ZOOM: f64 = 20.0;

/// Simplifies a polyline or ring with the Douglas–Peucker algorithm.
///
/// Only removes points, never moves them. The first and last point of an open
/// polyline are always kept. A closed ring is split at its first point and the
/// point farthest from it, and both halves are simplified separately.
///
/// Results are nested: simplifying with a larger tolerance yields a
/// subsequence of the result for a smaller tolerance.
#[must_use]
pub fn douglas_peucker(points: &[Point2], tolerance: f64, closed: bool) -> Vec<Point2> {
    let n = points.len();
    if n < 3 || tolerance.is_nan() || tolerance <= 0.0 {
        return points.to_vec();
    }

    let mut keep = vec![false; n];
    keep[0] = true;

    if closed {
        let anchor = points[0];
        let far = (1..n)
            .fold((0, 0.0_f64), |(best, best_d), i| {
                let d = (points[i] - anchor).norm();
                if d > best_d {
                    (i, d)
                } else {
                    (best, best_d)
                }
            })
            .0;
        if far == 0 {
            // Every point coincides with the first.
            return vec![anchor];
        }
        keep[far] = true;
        mark_range(points, &mut keep, 0, far, tolerance);
        // Second half runs from the far point back around to the first.
        let mut tail: Vec<Point2> = points[far..].to_vec();
        tail.push(anchor);
        let mut tail_keep = vec![false; tail.len()];
        let last = tail.len() - 1;
        mark_range(&tail, &mut tail_keep, 0, last, tolerance);
        for (i, k) in tail_keep.iter().enumerate().take(last).skip(1) {
            if *k {
                keep[far + i] = true;
            }
        }
    } else {
        keep[n - 1] = true;
        mark_range(points, &mut keep, 0, n - 1, tolerance);
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Marks the points between `first` and `last` that must be kept.
fn mark_range(points: &[Point2], keep: &mut [bool], first: usize, last: usize, tolerance: f64) {
    let mut stack = vec![(first, last)];
    while let Some((lo, hi)) = stack.pop() {
        if hi <= lo + 1 {
            continue;
        }
        let (a, b) = (points[lo], points[hi]);
        let mut split = lo;
        let mut max_dist = 0.0_f64;
        for (i, p) in points.iter().enumerate().take(hi).skip(lo + 1) {
            let d = point_to_segment_dist(p, &a, &b);
            if d > max_dist {
                max_dist = d;
                split = i;
            }
        }
        if max_dist > tolerance {
            keep[split] = true;
            stack.push((split, hi));
            stack.push((lo, split));
        }
    }
}

/// Maps a zoom level to its LOD bracket. Higher brackets are coarser.
///
/// Zoom 20 and above use bracket 0; every three zoom levels below that move
/// one bracket coarser, up to bracket 6. The mapping never increases with zoom.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn bracket_for_zoom(zoom: f64) -> usize {
    let last = LOD_LEVEL_COUNT - 1;
    if zoom >= MAX_SIMPLIFIED_ZOOM {
        return 0;
    }
    if !zoom.is_finite() {
        // NaN and -inf fall back to the coarsest level.
        return last;
    }
    let bracket = ((MAX_SIMPLIFIED_ZOOM - zoom + 2.0) / 3.0).floor();
    (bracket as usize).min(last)
}

/// Finest zoom level served by `bracket`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn zoom_for_bracket(bracket: usize) -> f64 {
    22.0 - 3.0 * bracket.min(LOD_LEVEL_COUNT - 1) as f64
}

/// Simplification tolerance for `bracket` in map-projection units.
///
/// `tolerance_px` is the allowed deviation in screen pixels at the bracket's
/// finest zoom. Bracket 0 is never simplified.
#[must_use]
pub fn tolerance_for_bracket(bracket: usize, tolerance_px: f64, tile_size: f64) -> f64 {
    if bracket == 0 {
        return 0.0;
    }
    tolerance_px / (tile_size * zoom_for_bracket(bracket).exp2())
}
