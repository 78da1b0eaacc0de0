//! Geometry pipeline stages: wrapping, clipping, simplification and hit
//! testing.

pub mod clip;
pub mod lod;
pub mod simplify;
pub mod wrap;

pub use clip::ViewportClipper;
pub use hit_test::{fill_contains, stroke_contains};
pub use lod::{LodGeometry, LodLevel, SimplificationPool, DEFAULT_ASYNC_THRESHOLD};
pub use simplify::{
    bracket_for_zoom, douglas_peucker, tolerance_for_bracket, zoom_for_bracket, LOD_LEVEL_COUNT,
};
pub use wrap::PathWrapper;
