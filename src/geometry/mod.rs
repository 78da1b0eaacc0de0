pub mod geo_path;
pub mod wrapped;

pub use geo_path::{GeoPath, DEFAULT_CIRCLE_SEGMENTS};
pub use wrapped::{WrappedPath, WrappedSubpath};
