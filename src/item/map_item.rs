use tracing::{debug, trace};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::geometry::{GeoPath, WrappedPath, WrappedSubpath};
use crate::math::{Point2, Rect};
use crate::operations::hit_test::{fill_contains, stroke_contains};
use crate::operations::lod::{LodGeometry, SimplificationPool};
use crate::operations::simplify::bracket_for_zoom;
use crate::operations::{PathWrapper, ViewportClipper};
use crate::projection::{wrap_shift_towards, Projector};
use crate::tessellation::{
    MaterialUniforms, OutlinePath, Primitive, ScreenGeometry, ScreenOutline, StrokeMesh,
    StrokeStyle, TessellateFill, TessellateLineStrip, TessellateStroke,
};

use super::geometry_state::GeometryState;
use super::strategy::RenderStrategy;

/// Data handed to the render layer after an update.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderUpdate {
    pub geometry: ScreenGeometry,
    pub uniforms: MaterialUniforms,
}

/// A line-shaped map overlay: polyline, polygon, rectangle or circle.
///
/// The item keeps its geographic path and turns it into screen geometry in two
/// stages. The source stage wraps the path across the antimeridian and resets
/// the LOD cache; it runs when the path or the map changes. The screen stage
/// picks an LOD level, clips every world copy that reaches the viewport,
/// projects to item-local pixels and tessellates; it runs on every viewport
/// change.
///
/// ```text
/// set_path / on_map_set      -> source dirty -> update_polish -> take_update
/// on_viewport_changed        -> screen dirty -> update_polish -> take_update
/// ```
#[derive(Debug)]
pub struct MapItem {
    path: GeoPath,
    style: StrokeStyle,
    strategy: RenderStrategy,
    config: EngineConfig,
    state: GeometryState,
    wrapped: WrappedPath,
    lod: LodGeometry,
    geometry: ScreenGeometry,
    geometry_changed: bool,
    uniforms_changed: bool,
}

impl MapItem {
    /// Creates an item with the default engine configuration.
    #[must_use]
    pub fn new(path: GeoPath, style: StrokeStyle, strategy: RenderStrategy) -> Self {
        let config = EngineConfig::default();
        Self {
            path,
            style,
            strategy,
            lod: lod_for(&config, None),
            config,
            state: GeometryState::default(),
            wrapped: WrappedPath::default(),
            geometry: ScreenGeometry::default(),
            geometry_changed: false,
            uniforms_changed: true,
        }
    }

    /// Uses `config`, and `pool` for background simplification.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `config` does not validate.
    pub fn with_engine(
        mut self,
        config: EngineConfig,
        pool: Option<SimplificationPool>,
    ) -> Result<Self> {
        config.validate()?;
        self.lod = lod_for(&config, pool);
        self.config = config;
        self.state.mark_source_dirty();
        Ok(self)
    }

    /// Moves background simplification onto `pool`. Cached levels are
    /// dropped and rebuilt on the next update.
    pub fn set_pool(&mut self, pool: Option<SimplificationPool>) {
        self.lod = lod_for(&self.config, pool);
        self.state.mark_source_dirty();
    }

    /// Replaces the geographic path.
    pub fn set_path(&mut self, path: GeoPath) {
        self.path = path;
        self.state.mark_source_dirty();
    }

    /// Replaces the stroke style. Width and cap changes need new geometry;
    /// color and miter-limit-only changes just update the uniforms.
    #[allow(clippy::float_cmp)]
    pub fn set_style(&mut self, style: StrokeStyle) {
        let reshape = style.width() != self.style.width()
            || style.cap() != self.style.cap()
            || style.line_join() != self.style.line_join()
            || style.miter_limit() != self.style.miter_limit();
        self.style = style;
        self.uniforms_changed = true;
        if reshape {
            self.state.mark_screen_dirty();
        }
    }

    pub fn set_strategy(&mut self, strategy: RenderStrategy) {
        if strategy != self.strategy {
            self.strategy = strategy;
            self.state.mark_screen_dirty();
        }
    }

    /// The camera moved or the viewport was resized.
    pub fn on_viewport_changed(&mut self) {
        self.state.mark_screen_dirty();
    }

    /// The item was attached to a (possibly different) map.
    pub fn on_map_set(&mut self) {
        self.state.mark_source_dirty();
    }

    /// Brings the geometry up to date with `projector`.
    ///
    /// Returns `true` if new screen geometry was produced.
    pub fn update_polish(&mut self, projector: &dyn Projector) -> bool {
        if self.state.is_source_dirty() {
            self.update_source_points(projector);
        } else if self.config.lod_enabled {
            let zoom = projector.zoom_level();
            let mut lod_changed = self.lod.poll_results();
            if bracket_for_zoom(zoom) != self.lod.requested_bracket() {
                lod_changed |= self.lod.select_on_lod_mismatch(zoom);
            }
            if lod_changed {
                trace!(bracket = self.lod.displayed().bracket, "LOD level changed");
                self.state.mark_screen_dirty();
            }
        }
        self.update_screen_points(projector)
    }

    /// Re-wraps the path and resets the LOD cache.
    fn update_source_points(&mut self, projector: &dyn Projector) {
        let wrapped = PathWrapper::new(&self.path, projector)
            .with_anchor(self.state.wrap_anchor())
            .execute();
        self.state.set_geo_left_bound(wrapped.left_bound);

        let zoom = projector.zoom_level();
        let tile_size = projector.pixels_per_world() / zoom.exp2();
        self.lod.set_tile_size(tile_size);
        self.lod.reset(wrapped.subpaths.clone());
        if self.config.lod_enabled {
            self.lod.select_on_data_changed(zoom);
        }
        debug!(
            vertices = wrapped.vertex_count(),
            subpaths = wrapped.subpaths.len(),
            "updated source points"
        );
        self.wrapped = wrapped;
        self.state.source_updated();
    }

    /// Rebuilds the screen geometry from the displayed LOD level if the
    /// screen is dirty. Calling it again without an intervening change does
    /// nothing.
    ///
    /// Returns `true` if the geometry was rebuilt.
    pub fn update_screen_points(&mut self, projector: &dyn Projector) -> bool {
        if !self.state.is_screen_dirty() || self.state.is_source_dirty() {
            return false;
        }

        self.geometry = self.build_screen_geometry(projector);
        if self.geometry.is_empty() {
            debug!("screen geometry is empty");
        }
        self.geometry_changed = true;
        self.state.screen_updated();
        true
    }

    fn build_screen_geometry(&self, projector: &dyn Projector) -> ScreenGeometry {
        let Some(bounds) = self.wrapped.bounds else {
            return ScreenGeometry::default();
        };

        let center = projector.camera_center();
        let shift = wrap_shift_towards(bounds.min.x, bounds.max.x, center.x);
        let displayed = self.lod.displayed();

        let visible: Vec<WrappedSubpath> = if self.state.clip_to_viewport() {
            let margin = (self.config.clip_margin_px + self.style.half_width())
                / projector.pixels_per_world();
            let clipper = ViewportClipper::new(projector.visible_region(), margin);
            // Every world copy overlapping the viewport, e.g. both sides of
            // the antimeridian.
            world_copies(&bounds, &clipper.rect())
                .flat_map(|copy| {
                    let shifted: Vec<WrappedSubpath> =
                        displayed.subpaths.iter().map(|s| s.shifted(copy)).collect();
                    clipper.clip(&shifted)
                })
                .collect()
        } else {
            displayed
                .subpaths
                .iter()
                .filter(|s| !s.is_degenerate())
                .map(|s| s.shifted(shift))
                .collect()
        };

        let Some(origin) = visible
            .first()
            .and_then(|s| s.points.first())
            .map(|p| projector.map_projection_to_item_position(p))
        else {
            return ScreenGeometry {
                wrap_offset: shift,
                ..ScreenGeometry::default()
            };
        };

        let outline = ScreenOutline {
            paths: visible
                .iter()
                .map(|s| OutlinePath {
                    points: s
                        .points
                        .iter()
                        .map(|p| {
                            let pos = projector.map_projection_to_item_position(p);
                            Point2::from(pos - origin)
                        })
                        .collect(),
                    closed: s.closed,
                })
                .collect(),
        };

        let (vertices, indices, primitive) = self.tessellate(&outline);
        ScreenGeometry {
            bounds: Rect::from_points(&vertices).unwrap_or_default(),
            vertices,
            indices,
            primitive,
            first_point_offset: origin,
            outline,
            wrap_offset: shift,
        }
    }

    fn tessellate(&self, outline: &ScreenOutline) -> (Vec<Point2>, Option<Vec<u32>>, Primitive) {
        match self.strategy {
            RenderStrategy::LineStrip => {
                let strips = TessellateLineStrip::new(&outline.paths).execute();
                (strips.vertices, None, Primitive::LineStrips(strips.ranges))
            }
            RenderStrategy::Extruded => {
                let mut mesh = StrokeMesh::default();
                for path in &outline.paths {
                    mesh.append(
                        TessellateStroke::new(&path.points, self.style, path.closed)
                            .with_round_cap_segments(self.config.round_cap_segments)
                            .execute(),
                    );
                }
                (mesh.vertices, Some(mesh.indices), Primitive::Triangles)
            }
            RenderStrategy::Fill => match TessellateFill::new(outline.rings()).execute() {
                Ok(mesh) => (mesh.vertices, Some(mesh.indices), Primitive::Triangles),
                Err(err) => {
                    debug!(%err, "fill tessellation failed");
                    (Vec::new(), Some(Vec::new()), Primitive::Triangles)
                }
            },
        }
    }

    /// Returns the pending changes for the render layer, or `None` when
    /// nothing changed since the last call. Marks the item clean unless a
    /// source or screen change still waits for [`MapItem::update_polish`].
    pub fn take_update(&mut self) -> Option<RenderUpdate> {
        if !self.geometry_changed && !self.uniforms_changed {
            return None;
        }
        self.geometry_changed = false;
        self.uniforms_changed = false;
        if !self.state.is_source_dirty() && !self.state.is_screen_dirty() {
            self.state.mark_clean();
        }
        self.state.set_preserve_geometry(false);
        Some(RenderUpdate {
            geometry: self.geometry.clone(),
            uniforms: self.material_uniforms(),
        })
    }

    /// Returns `true` if `screen_point` hits the item.
    ///
    /// Strokes are hit within half their width; fills anywhere inside, or on
    /// their border stroke.
    #[must_use]
    pub fn contains(&self, screen_point: &Point2) -> bool {
        if self.geometry.outline.is_empty() {
            return false;
        }
        let local = Point2::from(screen_point - self.geometry.first_point_offset);
        let on_stroke = stroke_contains(&self.geometry.outline, &local, self.style.width());
        if self.strategy.hits_interior() {
            on_stroke || fill_contains(&self.geometry.outline, &local)
        } else {
            on_stroke
        }
    }

    #[must_use]
    pub fn screen_geometry(&self) -> &ScreenGeometry {
        &self.geometry
    }

    #[must_use]
    pub fn material_uniforms(&self) -> MaterialUniforms {
        MaterialUniforms::new(&self.style, self.geometry.wrap_offset)
    }

    #[must_use]
    pub fn path(&self) -> &GeoPath {
        &self.path
    }

    #[must_use]
    pub fn style(&self) -> &StrokeStyle {
        &self.style
    }

    #[must_use]
    pub fn strategy(&self) -> RenderStrategy {
        self.strategy
    }

    /// Wrapped points of the last source update.
    #[must_use]
    pub fn wrapped(&self) -> &WrappedPath {
        &self.wrapped
    }

    #[must_use]
    pub fn lod(&self) -> &LodGeometry {
        &self.lod
    }

    #[must_use]
    pub fn state(&self) -> &GeometryState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GeometryState {
        &mut self.state
    }
}

/// Integer world shifts that bring `bounds` into `region`, west to east.
#[allow(clippy::cast_possible_truncation)]
fn world_copies(bounds: &Rect, region: &Rect) -> impl Iterator<Item = i32> {
    let lo = (region.min.x - bounds.max.x).ceil() as i32;
    let hi = (region.max.x - bounds.min.x).floor() as i32;
    lo..=hi
}

fn lod_for(config: &EngineConfig, pool: Option<SimplificationPool>) -> LodGeometry {
    LodGeometry::new(config.simplification_tolerance_px)
        .with_pool(pool)
        .with_async_threshold(config.async_simplification_threshold)
}
