pub mod config;
pub mod error;
pub mod geometry;
pub mod item;
pub mod math;
pub mod operations;
pub mod projection;
pub mod tessellation;

pub use config::EngineConfig;
pub use error::{MapGeomError, Result};
pub use geometry::GeoPath;
pub use item::{MapItem, MapItemId, MapItemStore, RenderStrategy};
pub use projection::{GeoCoordinate, Projector, WebMercatorProjector};
