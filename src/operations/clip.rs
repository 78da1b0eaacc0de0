use tracing::trace;

use crate::geometry::WrappedSubpath;
use crate::math::{lerp, Point2, Rect, TOLERANCE};

/// Clips wrapped subpaths against a margin-expanded viewport rectangle.
///
/// Closed rings are clipped with Sutherland–Hodgman and stay closed. Open
/// polylines are clipped segment by segment with Liang–Barsky; each stretch
/// that stays inside becomes its own run. Pieces too small to draw are dropped.
#[derive(Debug, Clone, Copy)]
pub struct ViewportClipper {
    rect: Rect,
}

impl ViewportClipper {
    /// Creates a clipper for `viewport` grown by `margin` on every side.
    #[must_use]
    pub fn new(viewport: Rect, margin: f64) -> Self {
        Self {
            rect: viewport.expanded(margin.max(0.0)),
        }
    }

    /// The effective clip rectangle.
    #[must_use]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Clips every subpath, preserving order.
    #[must_use]
    pub fn clip(&self, subpaths: &[WrappedSubpath]) -> Vec<WrappedSubpath> {
        let mut out = Vec::with_capacity(subpaths.len());
        let mut dropped = 0usize;
        for sub in subpaths {
            let before = out.len();
            if sub.closed {
                self.clip_ring(sub, &mut out);
            } else {
                self.clip_polyline(sub, &mut out);
            }
            if out.len() == before {
                dropped += 1;
            }
        }
        if dropped > 0 {
            trace!(dropped, "subpaths fully outside the clip rectangle");
        }
        out
    }

    fn clip_ring(&self, sub: &WrappedSubpath, out: &mut Vec<WrappedSubpath>) {
        if sub.points.len() < 3 {
            return;
        }
        let r = &self.rect;
        let mut ring = sub.points.clone();
        for edge in [Edge::Left(r.min.x), Edge::Right(r.max.x), Edge::Top(r.min.y), Edge::Bottom(r.max.y)] {
            ring = clip_ring_edge(&ring, edge);
            if ring.is_empty() {
                return;
            }
        }
        ring.dedup_by(|a, b| (*a - *b).norm_squared() <= TOLERANCE * TOLERANCE);
        if ring.len() > 1 && (ring[0] - ring[ring.len() - 1]).norm_squared() <= TOLERANCE * TOLERANCE {
            ring.pop();
        }
        if ring.len() >= 3 {
            out.push(WrappedSubpath::new(ring, true, sub.wrap_offset));
        }
    }

    fn clip_polyline(&self, sub: &WrappedSubpath, out: &mut Vec<WrappedSubpath>) {
        let mut run: Vec<Point2> = Vec::new();
        for pair in sub.points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            match self.clip_segment(a, b) {
                Some((ca, cb)) => {
                    let continues = run
                        .last()
                        .is_some_and(|last| (*last - ca).norm_squared() <= TOLERANCE * TOLERANCE);
                    if !continues {
                        flush_run(&mut run, sub.wrap_offset, out);
                        run.push(ca);
                    }
                    run.push(cb);
                }
                None => flush_run(&mut run, sub.wrap_offset, out),
            }
        }
        flush_run(&mut run, sub.wrap_offset, out);
    }

    /// Liang–Barsky: returns the part of segment `a`-`b` inside the rectangle.
    fn clip_segment(&self, a: Point2, b: Point2) -> Option<(Point2, Point2)> {
        let d = b - a;
        let r = &self.rect;
        let mut t0 = 0.0_f64;
        let mut t1 = 1.0_f64;
        let checks = [
            (-d.x, a.x - r.min.x),
            (d.x, r.max.x - a.x),
            (-d.y, a.y - r.min.y),
            (d.y, r.max.y - a.y),
        ];
        for (p, q) in checks {
            if p.abs() <= f64::EPSILON {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let t = q / p;
            if p < 0.0 {
                if t > t1 {
                    return None;
                }
                t0 = t0.max(t);
            } else {
                if t < t0 {
                    return None;
                }
                t1 = t1.min(t);
            }
        }
        let start = if t0 > 0.0 { lerp(&a, &b, t0) } else { a };
        let end = if t1 < 1.0 { lerp(&a, &b, t1) } else { b };
        Some((start, end))
    }
}

fn flush_run(run: &mut Vec<Point2>, wrap_offset: i32, out: &mut Vec<WrappedSubpath>) {
    if run.len() >= 2 {
        out.push(WrappedSubpath::new(std::mem::take(run), false, wrap_offset));
    } else {
        run.clear();
    }
}

#[derive(Debug, Clone, Copy)]
enum Edge {
    Left(f64),
    Right(f64),
    Top(f64),
    Bottom(f64),
}

impl Edge {
    fn inside(self, p: &Point2) -> bool {
        match self {
            Self::Left(x) => p.x >= x,
            Self::Right(x) => p.x <= x,
            Self::Top(y) => p.y >= y,
            Self::Bottom(y) => p.y <= y,
        }
    }

    fn intersect(self, a: &Point2, b: &Point2) -> Point2 {
        let t = match self {
            Self::Left(x) | Self::Right(x) => (x - a.x) / (b.x - a.x),
            Self::Top(y) | Self::Bottom(y) => (y - a.y) / (b.y - a.y),
        };
        let mut p = lerp(a, b, t);
        // Snap onto the edge to absorb rounding.
        match self {
            Self::Left(x) | Self::Right(x) => p.x = x,
            Self::Top(y) | Self::Bottom(y) => p.y = y,
        }
        p
    }
}

/// One Sutherland–Hodgman pass.
fn clip_ring_edge(ring: &[Point2], edge: Edge) -> Vec<Point2> {
    let mut out = Vec::with_capacity(ring.len() + 4);
    let Some(mut prev) = ring.last() else {
        return out;
    };
    for cur in ring {
        let cur_in = edge.inside(cur);
        let prev_in = edge.inside(prev);
        if cur_in {
            if !prev_in {
                out.push(edge.intersect(prev, cur));
            }
            out.push(*cur);
        } else if prev_in {
            out.push(edge.intersect(prev, cur));
        }
        prev = cur;
    }
    out
}
