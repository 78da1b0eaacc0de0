use crate::projection::GeoCoordinate;

/// Invalidation state shared between a map item and its geometry.
///
/// A source change (new path, new projection) invalidates everything. A
/// viewport change only invalidates the screen geometry, which is rebuilt
/// from the cached wrapped points. A full screen update renders the whole
/// path without viewport clipping, e.g. for a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryState {
    source_dirty: bool,
    screen_dirty: bool,
    clip_to_viewport: bool,
    preserve_geometry: bool,
    geo_left_bound: Option<GeoCoordinate>,
}

impl Default for GeometryState {
    fn default() -> Self {
        Self {
            source_dirty: true,
            screen_dirty: true,
            clip_to_viewport: true,
            preserve_geometry: false,
            geo_left_bound: None,
        }
    }
}

impl GeometryState {
    pub fn mark_source_dirty(&mut self) {
        self.source_dirty = true;
        self.screen_dirty = true;
    }

    pub fn mark_screen_dirty(&mut self) {
        self.screen_dirty = true;
        self.clip_to_viewport = true;
    }

    /// Requests a screen update that skips viewport clipping.
    pub fn mark_full_screen_dirty(&mut self) {
        self.screen_dirty = true;
        self.clip_to_viewport = false;
    }

    pub fn mark_clean(&mut self) {
        self.source_dirty = false;
        self.screen_dirty = false;
        self.clip_to_viewport = true;
    }

    /// Keeps the next wrap anchored at the remembered left bound.
    pub fn set_preserve_geometry(&mut self, preserve: bool) {
        self.preserve_geometry = preserve;
    }

    pub(crate) fn source_updated(&mut self) {
        self.source_dirty = false;
    }

    pub(crate) fn screen_updated(&mut self) {
        self.screen_dirty = false;
    }

    pub(crate) fn set_geo_left_bound(&mut self, bound: Option<GeoCoordinate>) {
        self.geo_left_bound = bound;
    }

    #[must_use]
    pub fn is_source_dirty(&self) -> bool {
        self.source_dirty
    }

    #[must_use]
    pub fn is_screen_dirty(&self) -> bool {
        self.screen_dirty
    }

    #[must_use]
    pub fn clip_to_viewport(&self) -> bool {
        self.clip_to_viewport
    }

    #[must_use]
    pub fn preserve_geometry(&self) -> bool {
        self.preserve_geometry
    }

    /// Geographic left bound of the last wrap.
    #[must_use]
    pub fn geo_left_bound(&self) -> Option<GeoCoordinate> {
        self.geo_left_bound
    }

    /// Anchor for the next wrap, if geometry is being preserved.
    #[must_use]
    pub fn wrap_anchor(&self) -> Option<GeoCoordinate> {
        self.geo_left_bound.filter(|_| self.preserve_geometry)
    }
}
