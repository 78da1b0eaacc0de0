use slotmap::SlotMap;
use tracing::trace;

use crate::error::ItemError;
use crate::math::Point2;
use crate::operations::lod::SimplificationPool;
use crate::projection::Projector;

use super::map_item::MapItem;

slotmap::new_key_type! {
    /// Unique identifier for a map item in the store.
    pub struct MapItemId;
}

/// Arena owning the items of one map, in drawing order.
///
/// Items never point back at the map; the map addresses them through
/// generational [`MapItemId`]s, so a removed item's id simply stops resolving.
#[derive(Debug, Default)]
pub struct MapItemStore {
    items: SlotMap<MapItemId, MapItem>,
    /// Bottom to top.
    z_order: Vec<MapItemId>,
    pool: Option<SimplificationPool>,
}

impl MapItemStore {
    /// Creates a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Items inserted afterwards simplify in the background on `pool`.
    #[must_use]
    pub fn with_pool(mut self, pool: SimplificationPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// The shared simplification pool, if any.
    #[must_use]
    pub fn pool(&self) -> Option<&SimplificationPool> {
        self.pool.as_ref()
    }

    /// Inserts an item on top of the others and attaches it to the map.
    pub fn insert(&mut self, mut item: MapItem) -> MapItemId {
        if let Some(pool) = &self.pool {
            item.set_pool(Some(pool.clone()));
        }
        item.on_map_set();
        let id = self.items.insert(item);
        self.z_order.push(id);
        id
    }

    /// Removes an item, returning it.
    ///
    /// # Errors
    ///
    /// Returns `ItemError::NotFound` if the id does not resolve.
    pub fn remove(&mut self, id: MapItemId) -> Result<MapItem, ItemError> {
        let item = self.items.remove(id).ok_or(ItemError::NotFound)?;
        self.z_order.retain(|&z| z != id);
        Ok(item)
    }

    /// Returns the item, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns `ItemError::NotFound` if the id does not resolve.
    pub fn get(&self, id: MapItemId) -> Result<&MapItem, ItemError> {
        self.items.get(id).ok_or(ItemError::NotFound)
    }

    /// Returns the item mutably, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns `ItemError::NotFound` if the id does not resolve.
    pub fn get_mut(&mut self, id: MapItemId) -> Result<&mut MapItem, ItemError> {
        self.items.get_mut(id).ok_or(ItemError::NotFound)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Ids from bottom to top.
    #[must_use]
    pub fn z_order(&self) -> &[MapItemId] {
        &self.z_order
    }

    /// Notifies every item that the camera or viewport changed.
    pub fn on_viewport_changed(&mut self) {
        for item in self.items.values_mut() {
            item.on_viewport_changed();
        }
    }

    /// Updates every item. Returns the ids whose geometry changed.
    pub fn update_polish(&mut self, projector: &dyn Projector) -> Vec<MapItemId> {
        let changed: Vec<MapItemId> = self
            .items
            .iter_mut()
            .filter_map(|(id, item)| item.update_polish(projector).then_some(id))
            .collect();
        trace!(changed = changed.len(), total = self.items.len(), "polished map items");
        changed
    }

    /// Returns the topmost item under `screen_point`.
    #[must_use]
    pub fn hit_test(&self, screen_point: &Point2) -> Option<MapItemId> {
        self.z_order
            .iter()
            .rev()
            .copied()
            .find(|&id| self.items.get(id).is_some_and(|item| item.contains(screen_point)))
    }
}
