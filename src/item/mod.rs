pub mod geometry_state;
pub mod map_item;
pub mod store;
pub mod strategy;

pub use geometry_state::GeometryState;
pub use map_item::{MapItem, RenderUpdate};
pub use store::{MapItemId, MapItemStore};
pub use strategy::RenderStrategy;
