mod stroke_style;
mod tessellate_fill;
mod tessellate_line_strip;
mod tessellate_stroke;

pub use stroke_style::{CapStyle, LineJoin, StrokeStyle, DEFAULT_MITER_LIMIT};
pub use tessellate_fill::{FillMesh, TessellateFill};
pub use tessellate_line_strip::{LineStrips, TessellateLineStrip};
pub use tessellate_stroke::{StrokeMesh, TessellateStroke, DEFAULT_ROUND_CAP_SEGMENTS};

use std::ops::Range;

use bytemuck::{Pod, Zeroable};

use crate::math::{Point2, Rect};

/// How the vertex buffer of a [`ScreenGeometry`] is assembled into primitives.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Primitive {
    /// Triangle list, indexed when `indices` is present.
    #[default]
    Triangles,
    /// Each range of vertices is drawn as one line strip.
    LineStrips(Vec<Range<u32>>),
}

/// One item-local polyline of the screen outline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutlinePath {
    pub points: Vec<Point2>,
    pub closed: bool,
}

impl OutlinePath {
    /// Iterates over the segments, including the closing one of a ring.
    pub fn segments(&self) -> impl Iterator<Item = (&Point2, &Point2)> {
        let closing = if self.closed && self.points.len() > 2 {
            self.points.last().zip(self.points.first())
        } else {
            None
        };
        self.points
            .windows(2)
            .map(|w| (&w[0], &w[1]))
            .chain(closing)
    }
}

/// Clipped outline in item-local screen coordinates, used for hit testing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScreenOutline {
    pub paths: Vec<OutlinePath>,
}

impl ScreenOutline {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.iter().all(|p| p.points.is_empty())
    }

    /// Closed rings of the outline.
    pub fn rings(&self) -> impl Iterator<Item = &[Point2]> {
        self.paths
            .iter()
            .filter(|p| p.closed)
            .map(|p| p.points.as_slice())
    }
}

/// GPU-ready geometry of one map item.
///
/// Vertices are relative to `first_point_offset`, the item's position on
/// screen, so panning without re-tessellation only moves the item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScreenGeometry {
    pub vertices: Vec<Point2>,
    /// Triangle indices. `None` draws `vertices` as a flat list.
    pub indices: Option<Vec<u32>>,
    pub primitive: Primitive,
    /// Item-local bounding box of `vertices`.
    pub bounds: Rect,
    /// Screen position of the item-local origin.
    pub first_point_offset: Point2,
    pub outline: ScreenOutline,
    /// World copy the geometry was placed in.
    pub wrap_offset: i32,
}

impl ScreenGeometry {
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Number of triangles drawn, 0 for line strips.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        match (&self.primitive, &self.indices) {
            (Primitive::Triangles, Some(indices)) => indices.len() / 3,
            (Primitive::Triangles, None) => self.vertices.len() / 3,
            (Primitive::LineStrips(_), _) => 0,
        }
    }

    /// Vertices converted for upload.
    #[must_use]
    pub fn gpu_vertices(&self) -> Vec<GpuVertex> {
        self.vertices.iter().map(GpuVertex::from).collect()
    }

    /// Bounding box in screen coordinates.
    #[must_use]
    pub fn screen_bounds(&self) -> Rect {
        self.bounds.translated(self.first_point_offset.coords)
    }
}

/// Vertex as uploaded to the GPU: an item-local position.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 2],
}

impl GpuVertex {
    /// Layout of the vertex buffer.
    pub const LAYOUT: VertexLayout = VertexLayout {
        stride: std::mem::size_of::<Self>(),
        position_offset: 0,
        position_components: 2,
    };
}

impl From<&Point2> for GpuVertex {
    #[allow(clippy::cast_possible_truncation)]
    fn from(p: &Point2) -> Self {
        Self {
            position: [p.x as f32, p.y as f32],
        }
    }
}

/// Description of the vertex buffer for the render layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLayout {
    /// Bytes between consecutive vertices.
    pub stride: usize,
    /// Byte offset of the position attribute.
    pub position_offset: usize,
    /// Number of `f32` components of the position.
    pub position_components: usize,
}

/// Material parameters for the item's shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialUniforms {
    /// Linear RGBA.
    pub color: [f32; 4],
    /// Stroke width in pixels.
    pub line_width: f32,
    pub miter_limit: f32,
    pub wrap_offset: i32,
    /// [`CapStyle::code`].
    pub cap: u32,
}

impl MaterialUniforms {
    /// Uniforms for `style` in the given world copy.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(style: &StrokeStyle, wrap_offset: i32) -> Self {
        Self {
            color: style.color(),
            line_width: style.width() as f32,
            miter_limit: style.miter_limit() as f32,
            wrap_offset,
            cap: style.cap().code(),
        }
    }
}
