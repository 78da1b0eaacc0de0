use std::collections::{HashMap, VecDeque};

use spade::handles::{FixedFaceHandle, InnerTag};
use spade::{ConstrainedDelaunayTriangulation, InsertionError, Point2 as SpadePoint2, Triangulation};
use tracing::trace;

use crate::error::{Result, TessellationError};
use crate::math::Point2;

type Cdt = ConstrainedDelaunayTriangulation<SpadePoint2<f64>>;

/// Triangle list covering the interior of a set of rings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillMesh {
    pub vertices: Vec<Point2>,
    pub indices: Vec<u32>,
}

impl FillMesh {
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Triangulates the interior of closed rings with even-odd filling.
///
/// All rings go into one constrained Delaunay triangulation as constraint
/// loops; a triangle is inside when reaching it from the outside crosses an
/// odd number of constraints, so holes are left empty. Constraint edges that
/// would cross an existing one (self-intersecting or touching clipped rings)
/// are skipped.
#[derive(Debug)]
pub struct TessellateFill<'a> {
    rings: Vec<&'a [Point2]>,
}

impl<'a> TessellateFill<'a> {
    /// Creates a fill operation over `rings`. Rings with fewer than three
    /// points are ignored.
    #[must_use]
    pub fn new(rings: impl IntoIterator<Item = &'a [Point2]>) -> Self {
        Self {
            rings: rings.into_iter().filter(|r| r.len() >= 3).collect(),
        }
    }

    /// Executes the triangulation.
    ///
    /// # Errors
    ///
    /// Returns `TessellationError::Failed` if a point cannot be inserted,
    /// e.g. because it is not finite.
    #[allow(clippy::cast_possible_truncation)]
    pub fn execute(&self) -> Result<FillMesh> {
        if self.rings.is_empty() {
            return Ok(FillMesh::default());
        }

        let mut cdt = Cdt::new();
        let mut skipped = 0usize;
        for ring in &self.rings {
            skipped += insert_constraint_loop(&mut cdt, ring)?;
        }
        if skipped > 0 {
            trace!(skipped, "skipped conflicting fill constraints");
        }

        let interior = classify_interior_faces(&cdt);
        let vertices = cdt
            .vertices()
            .map(|v| {
                let p = v.position();
                Point2::new(p.x, p.y)
            })
            .collect();
        let mut indices = Vec::with_capacity(interior.len() * 3);
        for face in cdt.inner_faces() {
            if interior.get(&face.fix().index()).is_some_and(|depth| depth % 2 == 1) {
                indices.extend(face.vertices().iter().map(|v| v.fix().index() as u32));
            }
        }

        Ok(FillMesh { vertices, indices })
    }
}

/// Inserts a closed polygon as constraint edges into the CDT.
///
/// Returns the number of edges skipped because they would cross an existing
/// constraint.
fn insert_constraint_loop(cdt: &mut Cdt, points: &[Point2]) -> Result<usize> {
    let mut handles = Vec::with_capacity(points.len());
    for p in points {
        let h = cdt
            .insert(SpadePoint2::new(p.x, p.y))
            .map_err(|e: InsertionError| TessellationError::Failed(format!("CDT insert: {e}")))?;
        handles.push(h);
    }

    let mut skipped = 0;
    for i in 0..handles.len() {
        let from = handles[i];
        let to = handles[(i + 1) % handles.len()];
        if from == to {
            continue;
        }
        if cdt.can_add_constraint(from, to) {
            cdt.add_constraint(from, to);
        } else {
            skipped += 1;
        }
    }

    Ok(skipped)
}

/// Flood-fills the CDT from the outer face, counting crossed constraints.
///
/// Returns the crossing depth per inner face index. Odd depth = interior.
fn classify_interior_faces(cdt: &Cdt) -> HashMap<usize, u32> {
    let mut depth_map: HashMap<usize, u32> = HashMap::new();
    let mut queue: VecDeque<(FixedFaceHandle<InnerTag>, u32)> = VecDeque::new();

    let outer_fix = cdt.outer_face().fix();

    for edge in cdt.directed_edges() {
        if edge.face().fix() != outer_fix {
            continue;
        }
        if let Some(inner) = edge.rev().face().as_inner() {
            let idx = inner.fix().index();
            if depth_map.contains_key(&idx) {
                continue;
            }
            let depth = u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
            depth_map.insert(idx, depth);
            queue.push_back((inner.fix(), depth));
        }
    }

    while let Some((face_fix, depth)) = queue.pop_front() {
        let face = cdt.face(face_fix);
        for edge in face.adjacent_edges() {
            let Some(neighbor) = edge.rev().face().as_inner() else {
                continue;
            };
            let n_idx = neighbor.fix().index();
            if depth_map.contains_key(&n_idx) {
                continue;
            }
            let new_depth = depth + u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
            depth_map.insert(n_idx, new_depth);
            queue.push_back((neighbor.fix(), new_depth));
        }
    }

    depth_map
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::math::polygon_2d::signed_area_2d;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn covered_area(mesh: &FillMesh) -> f64 {
        mesh.indices
            .chunks_exact(3)
            .map(|t| {
                let tri = [
                    mesh.vertices[t[0] as usize],
                    mesh.vertices[t[1] as usize],
                    mesh.vertices[t[2] as usize],
                ];
                signed_area_2d(&tri).abs()
            })
            .sum()
    }

    #[test]
    fn triangle_produces_1_triangle() {
        let ring = [p(0.0, 0.0), p(4.0, 0.0), p(0.0, 3.0)];
        let mesh = TessellateFill::new([&ring[..]]).execute().unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        assert_abs_diff_eq!(covered_area(&mesh), 6.0, epsilon = 1e-9);
    }

    #[test]
    fn square_produces_2_triangles() {
        let ring = [p(0.0, 0.0), p(2.0, 0.0), p(2.0, 2.0), p(0.0, 2.0)];
        let mesh = TessellateFill::new([&ring[..]]).execute().unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert_abs_diff_eq!(covered_area(&mesh), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn l_shape_concave_tessellates() {
        let ring = [
            p(0.0, 0.0),
            p(2.0, 0.0),
            p(2.0, 1.0),
            p(1.0, 1.0),
            p(1.0, 2.0),
            p(0.0, 2.0),
        ];
        let mesh = TessellateFill::new([&ring[..]]).execute().unwrap();
        assert_eq!(mesh.triangle_count(), 4);
        assert_abs_diff_eq!(covered_area(&mesh), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn hole_is_excluded() {
        let outer = [p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0), p(0.0, 10.0)];
        let hole = [p(3.0, 3.0), p(7.0, 3.0), p(7.0, 7.0), p(3.0, 7.0)];
        let mesh = TessellateFill::new([&outer[..], &hole[..]]).execute().unwrap();
        assert_abs_diff_eq!(covered_area(&mesh), 84.0, epsilon = 1e-9);
    }

    #[test]
    fn degenerate_rings_are_ignored() {
        let line = [p(0.0, 0.0), p(1.0, 1.0)];
        let mesh = TessellateFill::new([&line[..]]).execute().unwrap();
        assert!(mesh.indices.is_empty());
    }

    #[test]
    fn non_finite_point_fails() {
        let ring = [p(0.0, 0.0), p(f64::NAN, 0.0), p(0.0, 1.0)];
        assert!(TessellateFill::new([&ring[..]]).execute().is_err());
    }

    #[test]
    fn self_intersecting_ring_does_not_panic() {
        let bowtie = [p(0.0, 0.0), p(2.0, 2.0), p(2.0, 0.0), p(0.0, 2.0)];
        let mesh = TessellateFill::new([&bowtie[..]]).execute().unwrap();
        assert!(mesh.indices.len() % 3 == 0);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
    }
}
