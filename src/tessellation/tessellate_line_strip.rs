use std::ops::Range;

use crate::math::Point2;

use super::OutlinePath;

/// Vertices of several line strips sharing one buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineStrips {
    pub vertices: Vec<Point2>,
    /// One vertex range per strip.
    pub ranges: Vec<Range<u32>>,
}

/// Emits item-local outline paths as GPU line strips.
///
/// Points are used as-is; the stroke width is applied by the material. Closed
/// paths repeat their first point to close the strip.
#[derive(Debug)]
pub struct TessellateLineStrip<'a> {
    paths: &'a [OutlinePath],
}

impl<'a> TessellateLineStrip<'a> {
    #[must_use]
    pub fn new(paths: &'a [OutlinePath]) -> Self {
        Self { paths }
    }

    /// Executes the emission. Paths with fewer than two points are skipped.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn execute(&self) -> LineStrips {
        let mut strips = LineStrips::default();
        for path in self.paths.iter().filter(|p| p.points.len() >= 2) {
            let start = strips.vertices.len() as u32;
            strips.vertices.extend_from_slice(&path.points);
            if path.closed {
                strips.vertices.push(path.points[0]);
            }
            strips.ranges.push(start..strips.vertices.len() as u32);
        }
        strips
    }
}
