use std::f64::consts::PI;

use crate::math::polygon_2d::cross_2d;
use crate::math::{Point2, Vector2};

use super::stroke_style::{CapStyle, LineJoin, StrokeStyle};

/// Default number of triangles in a round cap.
pub const DEFAULT_ROUND_CAP_SEGMENTS: usize = 8;

/// Points closer than this are merged before stroking.
const MIN_SEGMENT_LENGTH: f64 = 1e-9;

/// How a polyline vertex maps to mesh vertices at the join.
enum JoinKind {
    /// Miter join or endpoint: 2 mesh vertices (left, right).
    Miter { dir: Vector2, scale: f64 },
    /// Bevel join: 3 mesh vertices (1 shared inside + 2 split outside).
    Bevel {
        inside_dir: Vector2,
        inside_scale: f64,
        /// `true` when the inside of the bend is the right (−offset) side.
        inside_is_right: bool,
        outside_in_dir: Vector2,
        outside_out_dir: Vector2,
    },
}

/// Mesh vertex indices associated with a single polyline vertex.
struct VertexSlot {
    /// Left index for connecting to the *incoming* segment.
    in_left: u32,
    /// Right index for connecting to the *incoming* segment.
    in_right: u32,
    /// Left index for connecting to the *outgoing* segment.
    out_left: u32,
    /// Right index for connecting to the *outgoing* segment.
    out_right: u32,
}

/// Triangle mesh of a stroked polyline.
///
/// `indices.len() == 6 * segments + 3 * (join_triangles + cap_triangles)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrokeMesh {
    pub vertices: Vec<Point2>,
    /// Triangle list indices.
    pub indices: Vec<u32>,
    /// Number of stroked segments, two triangles each.
    pub segments: usize,
    /// Bevel triangles at joins.
    pub join_triangles: usize,
    /// Triangles added by square or round caps.
    pub cap_triangles: usize,
}

impl StrokeMesh {
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Appends `other`, rebasing its indices.
    #[allow(clippy::cast_possible_truncation)]
    pub fn append(&mut self, other: Self) {
        let base = self.vertices.len() as u32;
        self.vertices.extend(other.vertices);
        self.indices.extend(other.indices.iter().map(|i| i + base));
        self.segments += other.segments;
        self.join_triangles += other.join_triangles;
        self.cap_triangles += other.cap_triangles;
    }
}

/// Extrudes a screen-space polyline into a triangulated stroke.
///
/// Each segment becomes a quad of two triangles. Interior vertices get a
/// miter join, or a bevel when the miter would be longer than the style's
/// miter limit. Closed polylines join their last segment back to the first.
/// Open polylines get the style's caps. Repeated points are merged, so
/// zero-length segments never reach the mesh.
#[derive(Debug)]
pub struct TessellateStroke<'a> {
    points: &'a [Point2],
    style: StrokeStyle,
    closed: bool,
    round_cap_segments: usize,
}

impl<'a> TessellateStroke<'a> {
    /// Creates a new stroke tessellation operation.
    #[must_use]
    pub fn new(points: &'a [Point2], style: StrokeStyle, closed: bool) -> Self {
        Self {
            points,
            style,
            closed,
            round_cap_segments: DEFAULT_ROUND_CAP_SEGMENTS,
        }
    }

    /// Sets the number of triangles per round cap (at least 1).
    #[must_use]
    pub fn with_round_cap_segments(mut self, segments: usize) -> Self {
        self.round_cap_segments = segments.max(1);
        self
    }

    /// Executes the tessellation. Polylines with fewer than two distinct
    /// points produce an empty mesh.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn execute(&self) -> StrokeMesh {
        let points = dedup_points(self.points, self.closed);
        let n = points.len();
        if n < 2 {
            return StrokeMesh::default();
        }
        // A two-point ring is drawn as a plain line.
        let closed = self.closed && n >= 3;

        let half_w = self.style.half_width();
        let joins = self.compute_joins(&points, closed);

        let mut mesh = StrokeMesh::default();
        let mut slots = Vec::with_capacity(n);
        let mut bevel_tris: Vec<[u32; 3]> = Vec::new();

        for (p, join) in points.iter().zip(&joins) {
            let idx = mesh.vertices.len() as u32;
            match join {
                JoinKind::Miter { dir, scale } => {
                    let off = *dir * half_w * *scale;
                    mesh.vertices.extend_from_slice(&[p + off, p - off]);
                    slots.push(VertexSlot {
                        in_left: idx,
                        in_right: idx + 1,
                        out_left: idx,
                        out_right: idx + 1,
                    });
                }
                JoinKind::Bevel {
                    inside_dir,
                    inside_scale,
                    inside_is_right,
                    outside_in_dir,
                    outside_out_dir,
                } => {
                    let in_off = *inside_dir * half_w * *inside_scale;
                    let off_in = *outside_in_dir * half_w;
                    let off_out = *outside_out_dir * half_w;

                    if *inside_is_right {
                        // Inside = right (−offset), outside = left (+offset).
                        mesh.vertices.extend_from_slice(&[p + off_in, p - in_off, p + off_out]);
                        slots.push(VertexSlot {
                            in_left: idx,
                            in_right: idx + 1,
                            out_left: idx + 2,
                            out_right: idx + 1,
                        });
                        bevel_tris.push([idx + 1, idx, idx + 2]);
                    } else {
                        // Inside = left (+offset), outside = right (−offset).
                        mesh.vertices.extend_from_slice(&[p + in_off, p - off_in, p - off_out]);
                        slots.push(VertexSlot {
                            in_left: idx,
                            in_right: idx + 1,
                            out_left: idx,
                            out_right: idx + 2,
                        });
                        bevel_tris.push([idx, idx + 2, idx + 1]);
                    }
                }
            }
        }

        let segment_count = if closed { n } else { n - 1 };
        mesh.indices.reserve(segment_count * 6 + bevel_tris.len() * 3);
        for i in 0..segment_count {
            let j = (i + 1) % n;
            let si = &slots[i];
            let sj = &slots[j];
            mesh.indices.extend_from_slice(&[si.out_left, sj.in_left, si.out_right]);
            mesh.indices.extend_from_slice(&[si.out_right, sj.in_left, sj.in_right]);
        }
        mesh.segments = segment_count;
        mesh.join_triangles = bevel_tris.len();
        mesh.indices.extend(bevel_tris.iter().flatten());

        if !closed {
            let start_dir = direction(&points[0], &points[1]);
            let end_dir = direction(&points[n - 2], &points[n - 1]);
            self.add_cap(&mut mesh, &points[0], -start_dir, &slots[0]);
            self.add_cap(&mut mesh, &points[n - 1], end_dir, &slots[n - 1]);
        }

        mesh
    }

    /// Adds a cap at `p`, extending along `outward`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn add_cap(&self, mesh: &mut StrokeMesh, p: &Point2, outward: Vector2, slot: &VertexSlot) {
        let half_w = self.style.half_width();
        let (left, right) = (slot.in_left, slot.in_right);
        let base = mesh.vertices.len() as u32;
        match self.style.cap() {
            CapStyle::Flat => {}
            CapStyle::Square => {
                let ext = outward * half_w;
                let l = mesh.vertices[left as usize] + ext;
                let r = mesh.vertices[right as usize] + ext;
                mesh.vertices.extend_from_slice(&[l, r]);
                mesh.indices.extend_from_slice(&[left, base, right, right, base, base + 1]);
                mesh.cap_triangles += 2;
            }
            CapStyle::Round => {
                let k = self.round_cap_segments;
                let side = mesh.vertices[left as usize] - p;
                let side_len = side.norm();
                let side = if side_len > f64::EPSILON { side / side_len } else { perp(outward) };
                // Center, then the arc points strictly between left and right.
                mesh.vertices.push(*p);
                for step in 1..k {
                    let theta = PI * step as f64 / k as f64;
                    let dir = side * theta.cos() + outward * theta.sin();
                    mesh.vertices.push(p + dir * half_w);
                }
                let arc = |step: usize| -> u32 {
                    if step == 0 {
                        left
                    } else if step == k {
                        right
                    } else {
                        base + step as u32
                    }
                };
                for step in 0..k {
                    mesh.indices.extend_from_slice(&[base, arc(step), arc(step + 1)]);
                }
                mesh.cap_triangles += k;
            }
        }
    }

    /// Determines the join kind (miter or bevel) at each polyline vertex.
    fn compute_joins(&self, points: &[Point2], closed: bool) -> Vec<JoinKind> {
        let n = points.len();
        let limit = self.style.miter_limit();
        let mut joins = Vec::with_capacity(n);

        for i in 0..n {
            let is_interior = closed || (i > 0 && i < n - 1);

            if !is_interior {
                // Endpoint: perpendicular to the single adjacent segment.
                let seg_dir = if i == 0 {
                    direction(&points[0], &points[1])
                } else {
                    direction(&points[n - 2], &points[n - 1])
                };
                joins.push(JoinKind::Miter {
                    dir: perp(seg_dir),
                    scale: 1.0,
                });
                continue;
            }

            let prev = if i == 0 { n - 1 } else { i - 1 };
            let next = (i + 1) % n;
            let d_prev = direction(&points[prev], &points[i]);
            let d_next = direction(&points[i], &points[next]);

            let cos_angle = d_prev.dot(&d_next);
            let cos_half = f64::midpoint(1.0, cos_angle).max(0.0).sqrt();
            let miter_scale = if cos_half > f64::EPSILON {
                1.0 / cos_half
            } else {
                f64::MAX
            };

            let use_bevel = match self.style.line_join() {
                LineJoin::Miter => miter_scale > limit,
                LineJoin::Bevel => true,
            };
            let tangent = average_direction(d_prev, d_next);

            if use_bevel {
                joins.push(JoinKind::Bevel {
                    inside_dir: perp(tangent),
                    inside_scale: miter_scale.min(limit),
                    inside_is_right: cross_2d(&d_prev, &d_next) > 0.0,
                    outside_in_dir: perp(d_prev),
                    outside_out_dir: perp(d_next),
                });
            } else {
                joins.push(JoinKind::Miter {
                    dir: perp(tangent),
                    scale: miter_scale,
                });
            }
        }

        joins
    }
}

/// Drops points closer than [`MIN_SEGMENT_LENGTH`] to their predecessor, and
/// for rings a last point repeating the first.
fn dedup_points(points: &[Point2], closed: bool) -> Vec<Point2> {
    let mut out: Vec<Point2> = Vec::with_capacity(points.len());
    for p in points {
        if out.last().is_none_or(|last| (p - last).norm() >= MIN_SEGMENT_LENGTH) {
            out.push(*p);
        }
    }
    if closed && out.len() > 1 {
        if let (Some(first), Some(last)) = (out.first(), out.last()) {
            if (last - first).norm() < MIN_SEGMENT_LENGTH {
                out.pop();
            }
        }
    }
    out
}

/// Unit direction from `a` to `b`. Inputs are deduplicated, so the length is
/// non-zero.
fn direction(a: &Point2, b: &Point2) -> Vector2 {
    let d = b - a;
    let len = d.norm();
    if len < f64::EPSILON {
        Vector2::x()
    } else {
        d / len
    }
}

/// Returns the normalized average of two direction vectors.
fn average_direction(a: Vector2, b: Vector2) -> Vector2 {
    let avg = a + b;
    let len = avg.norm();
    if len < f64::EPSILON {
        // Opposite directions: fall back to the first direction.
        a
    } else {
        avg / len
    }
}

/// Right-hand perpendicular of a unit direction, `(dy, -dx)`.
fn perp(dir: Vector2) -> Vector2 {
    Vector2::new(dir.y, -dir.x)
}
