use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, error, trace};

use crate::error::{Result, WorkerError};
use crate::geometry::WrappedSubpath;
use crate::projection::DEFAULT_TILE_SIZE;

use super::simplify::{bracket_for_zoom, douglas_peucker, tolerance_for_bracket, LOD_LEVEL_COUNT};

/// Default number of wrapped vertices above which simplification moves to the
/// worker pool.
pub const DEFAULT_ASYNC_THRESHOLD: usize = 10_000;

/// One simplified vertex set, shared immutably with background tasks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LodLevel {
    /// LOD bracket this level serves, 0 being the unsimplified path.
    pub bracket: usize,
    pub subpaths: Vec<WrappedSubpath>,
}

impl LodLevel {
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.subpaths.iter().map(|s| s.points.len()).sum()
    }

    /// Simplifies `base` for `bracket` with a tolerance in map units.
    ///
    /// Subpaths that become degenerate are kept; the clipper drops them later.
    #[must_use]
    pub fn simplified(base: &[WrappedSubpath], bracket: usize, tolerance: f64) -> Self {
        let subpaths = base
            .iter()
            .map(|s| WrappedSubpath::new(douglas_peucker(&s.points, tolerance, s.closed), s.closed, s.wrap_offset))
            .collect();
        Self { bracket, subpaths }
    }
}

/// Thread pool shared by all items for background simplification.
#[derive(Debug, Clone)]
pub struct SimplificationPool {
    pool: Arc<ThreadPool>,
}

impl SimplificationPool {
    /// Builds a pool with `threads` workers, or rayon's default count for 0.
    ///
    /// # Errors
    ///
    /// Returns `WorkerError::PoolBuild` if the worker threads cannot be spawned.
    pub fn new(threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("mapgeom-lod-{i}"))
            .panic_handler(|_| error!("simplification task panicked"))
            .build()
            .map_err(WorkerError::from)?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Number of worker threads.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn spawn(&self, task: impl FnOnce() + Send + 'static) {
        self.pool.spawn(task);
    }
}

/// Result of a background simplification task.
#[derive(Debug)]
struct LodResult {
    generation: u64,
    level: Arc<LodLevel>,
}

/// Decrements the busy counter when a task finishes, even by panicking.
struct BusyGuard(Arc<AtomicUsize>);

impl BusyGuard {
    fn acquire(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(counter))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Level-of-detail cache for one item.
///
/// Level 0 holds the wrapped path. Coarser levels are simplified from it on
/// demand, synchronously for small paths and on the [`SimplificationPool`]
/// for large ones. While a background task runs the previously displayed level
/// stays in place, so [`LodGeometry::displayed`] always returns complete data.
///
/// Every [`LodGeometry::reset`] starts a new generation. Background results
/// carry the generation they were computed for and are discarded when stale.
#[derive(Debug)]
pub struct LodGeometry {
    levels: [Option<Arc<LodLevel>>; LOD_LEVEL_COUNT],
    displayed: Arc<LodLevel>,
    requested: usize,
    generation: u64,
    pending: [bool; LOD_LEVEL_COUNT],
    busy: Arc<AtomicUsize>,
    sender: Sender<LodResult>,
    receiver: Receiver<LodResult>,
    pool: Option<SimplificationPool>,
    async_threshold: usize,
    tolerance_px: f64,
    tile_size: f64,
}

impl Default for LodGeometry {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl LodGeometry {
    /// Creates an empty cache simplifying to `tolerance_px` screen pixels.
    #[must_use]
    pub fn new(tolerance_px: f64) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let level0 = Arc::new(LodLevel::default());
        let mut levels: [Option<Arc<LodLevel>>; LOD_LEVEL_COUNT] = Default::default();
        levels[0] = Some(Arc::clone(&level0));
        Self {
            levels,
            displayed: level0,
            requested: 0,
            generation: 0,
            pending: [false; LOD_LEVEL_COUNT],
            busy: Arc::new(AtomicUsize::new(0)),
            sender,
            receiver,
            pool: None,
            async_threshold: DEFAULT_ASYNC_THRESHOLD,
            tolerance_px,
            tile_size: DEFAULT_TILE_SIZE,
        }
    }

    /// Runs large simplifications on `pool`.
    #[must_use]
    pub fn with_pool(mut self, pool: Option<SimplificationPool>) -> Self {
        self.pool = pool;
        self
    }

    /// Paths with more vertices than `threshold` are simplified in the
    /// background when a pool is set.
    #[must_use]
    pub fn with_async_threshold(mut self, threshold: usize) -> Self {
        self.async_threshold = threshold;
        self
    }

    /// Sets the projector's tile size. A change drops the simplified levels.
    #[allow(clippy::float_cmp)]
    pub fn set_tile_size(&mut self, tile_size: f64) {
        if tile_size == self.tile_size || !tile_size.is_finite() || tile_size <= 0.0 {
            return;
        }
        self.tile_size = tile_size;
        if let Some(level0) = self.levels[0].take() {
            self.install_level0(level0);
        }
    }

    /// Replaces the source geometry: new generation, new level 0, every
    /// simplified level dropped, level 0 displayed.
    pub fn reset(&mut self, subpaths: Vec<WrappedSubpath>) {
        self.install_level0(Arc::new(LodLevel {
            bracket: 0,
            subpaths,
        }));
    }

    fn install_level0(&mut self, level0: Arc<LodLevel>) {
        self.generation += 1;
        self.levels = Default::default();
        self.levels[0] = Some(Arc::clone(&level0));
        self.displayed = level0;
        self.requested = 0;
        self.pending = [false; LOD_LEVEL_COUNT];
    }

    /// Selects the bracket for `zoom` after the source changed.
    ///
    /// Returns `true` if the displayed level changed.
    pub fn select_on_data_changed(&mut self, zoom: f64) -> bool {
        self.select_lod(zoom)
    }

    /// Reselects after the zoom moved to another bracket.
    ///
    /// Returns `false` without touching the displayed level while a background
    /// task is running. Never blocks.
    pub fn select_on_lod_mismatch(&mut self, zoom: f64) -> bool {
        if self.is_busy() {
            return false;
        }
        let polled = self.poll_results();
        self.select_lod(zoom) || polled
    }

    /// Selects the bracket for `zoom`.
    pub fn select_lod(&mut self, zoom: f64) -> bool {
        self.select_bracket(bracket_for_zoom(zoom))
    }

    /// Selects `bracket`, clamped to the coarsest level.
    ///
    /// A cached level is displayed at once. A missing one is computed in place
    /// or dispatched to the pool, in which case the current level stays
    /// displayed until [`LodGeometry::poll_results`] picks up the result.
    pub fn select_bracket(&mut self, bracket: usize) -> bool {
        let bracket = bracket.min(LOD_LEVEL_COUNT - 1);
        self.requested = bracket;
        if let Some(level) = &self.levels[bracket] {
            return self.display(Arc::clone(level));
        }

        let Some(base) = self.levels[0].clone() else {
            return false;
        };
        let tolerance = tolerance_for_bracket(bracket, self.tolerance_px, self.tile_size);

        let pool = self
            .pool
            .clone()
            .filter(|_| base.vertex_count() > self.async_threshold);
        if let Some(pool) = pool {
            if !self.pending[bracket] {
                self.pending[bracket] = true;
                self.dispatch(pool, base, bracket, tolerance);
            }
            return false;
        }

        let level = Arc::new(LodLevel::simplified(&base.subpaths, bracket, tolerance));
        trace!(
            bracket,
            before = base.vertex_count(),
            after = level.vertex_count(),
            "simplified level"
        );
        self.levels[bracket] = Some(Arc::clone(&level));
        self.display(level)
    }

    fn dispatch(&self, pool: SimplificationPool, base: Arc<LodLevel>, bracket: usize, tolerance: f64) {
        let guard = BusyGuard::acquire(&self.busy);
        let sender = self.sender.clone();
        let generation = self.generation;
        debug!(bracket, generation, vertices = base.vertex_count(), "dispatching simplification");
        pool.spawn(move || {
            let _guard = guard;
            let level = Arc::new(LodLevel::simplified(&base.subpaths, bracket, tolerance));
            if sender.send(LodResult { generation, level }).is_err() {
                trace!(bracket, "simplification result dropped, geometry gone");
            }
        });
    }

    /// Collects finished background results.
    ///
    /// Stale results are discarded. Returns `true` if the displayed level
    /// changed.
    pub fn poll_results(&mut self) -> bool {
        let mut changed = false;
        while let Ok(result) = self.receiver.try_recv() {
            if result.generation != self.generation {
                debug!(
                    generation = result.generation,
                    current = self.generation,
                    "discarding stale simplification result"
                );
                continue;
            }
            let bracket = result.level.bracket;
            self.pending[bracket] = false;
            self.levels[bracket] = Some(Arc::clone(&result.level));
            if bracket == self.requested {
                changed |= self.display(result.level);
            }
        }
        changed
    }

    fn display(&mut self, level: Arc<LodLevel>) -> bool {
        if Arc::ptr_eq(&self.displayed, &level) {
            return false;
        }
        self.displayed = level;
        true
    }

    /// The level currently used for drawing.
    #[must_use]
    pub fn displayed(&self) -> &Arc<LodLevel> {
        &self.displayed
    }

    /// A cached level, if computed.
    #[must_use]
    pub fn level(&self, bracket: usize) -> Option<&Arc<LodLevel>> {
        self.levels.get(bracket).and_then(Option::as_ref)
    }

    /// Bracket of the most recent selection.
    #[must_use]
    pub fn requested_bracket(&self) -> usize {
        self.requested
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether large simplifications run in the background.
    #[must_use]
    pub fn has_pool(&self) -> bool {
        self.pool.is_some()
    }

    /// Returns `true` while background simplification tasks are running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire) > 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::math::Point2;

    /// A zig-zag with small wiggles that simplification removes.
    fn wiggly(n: usize) -> Vec<WrappedSubpath> {
        let points = (0..n)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let x = i as f64 / n as f64;
                let y = if i % 2 == 0 { 0.5 } else { 0.5 + 1e-9 };
                Point2::new(x, y)
            })
            .collect();
        vec![WrappedSubpath::new(points, false, 0)]
    }

    fn wait_idle(lod: &LodGeometry) {
        let start = Instant::now();
        while lod.is_busy() {
            assert!(start.elapsed() < Duration::from_secs(10), "simplification stalled");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn reset_displays_level_zero() {
        let mut lod = LodGeometry::new(1.0);
        lod.reset(wiggly(100));
        assert_eq!(lod.displayed().bracket, 0);
        assert_eq!(lod.displayed().vertex_count(), 100);
        assert!(lod.level(1).is_none());
        assert_eq!(lod.generation(), 1);
    }

    #[test]
    fn synchronous_selection_simplifies() {
        let mut lod = LodGeometry::new(1.0);
        lod.reset(wiggly(100));
        assert!(lod.select_on_data_changed(2.0));
        assert_eq!(lod.displayed().bracket, 6);
        assert_eq!(lod.displayed().vertex_count(), 2);
        // Level 0 stays cached.
        assert_eq!(lod.level(0).unwrap().vertex_count(), 100);
    }

    #[test]
    fn high_zoom_keeps_full_detail() {
        let mut lod = LodGeometry::new(1.0);
        lod.reset(wiggly(50));
        assert!(!lod.select_lod(21.0));
        assert_eq!(lod.displayed().vertex_count(), 50);
    }

    #[test]
    fn out_of_range_bracket_is_clamped() {
        let mut lod = LodGeometry::new(1.0);
        lod.reset(wiggly(40));
        lod.select_bracket(6);
        let coarsest = Arc::clone(lod.displayed());
        lod.select_bracket(0);
        lod.select_bracket(9);
        assert_eq!(lod.requested_bracket(), 6);
        assert!(Arc::ptr_eq(lod.displayed(), &coarsest));
    }

    #[test]
    fn cached_level_is_reused() {
        let mut lod = LodGeometry::new(1.0);
        lod.reset(wiggly(40));
        lod.select_bracket(3);
        let first = Arc::clone(lod.displayed());
        lod.select_bracket(0);
        lod.select_bracket(3);
        assert!(Arc::ptr_eq(lod.displayed(), &first));
    }

    #[test]
    fn background_result_replaces_level_zero() {
        let pool = SimplificationPool::new(2).unwrap();
        let mut lod = LodGeometry::new(1.0)
            .with_pool(Some(pool))
            .with_async_threshold(10);
        lod.reset(wiggly(500));

        assert!(!lod.select_on_data_changed(2.0));
        // Level 0 stays displayed while the task runs.
        assert_eq!(lod.displayed().bracket, 0);

        wait_idle(&lod);
        assert!(lod.poll_results());
        assert_eq!(lod.displayed().bracket, 6);
        assert_eq!(lod.displayed().vertex_count(), 2);
        assert!(!lod.is_busy());
    }

    #[test]
    fn stale_results_are_discarded() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();

        let pool = SimplificationPool::new(1).unwrap();
        let mut lod = LodGeometry::new(1.0)
            .with_pool(Some(pool))
            .with_async_threshold(10);
        lod.reset(wiggly(500));
        lod.select_lod(2.0);
        wait_idle(&lod);

        lod.reset(wiggly(20));
        assert!(!lod.poll_results());
        assert_eq!(lod.displayed().vertex_count(), 20);
        assert!(lod.level(6).is_none());
    }

    #[test]
    fn mismatch_is_refused_while_busy() {
        let mut lod = LodGeometry::new(1.0);
        lod.reset(wiggly(40));
        let guard = BusyGuard::acquire(&lod.busy);
        assert!(lod.is_busy());
        assert!(!lod.select_on_lod_mismatch(2.0));
        assert_eq!(lod.displayed().bracket, 0);
        drop(guard);
        assert!(lod.select_on_lod_mismatch(2.0));
        assert_eq!(lod.displayed().bracket, 6);
    }

    #[test]
    fn busy_counter_survives_panicking_task() {
        let pool = SimplificationPool::new(1).unwrap();
        let busy = Arc::new(AtomicUsize::new(0));
        let guard = BusyGuard::acquire(&busy);
        pool.spawn(move || {
            let _guard = guard;
            panic!("boom");
        });
        let start = Instant::now();
        while busy.load(Ordering::Acquire) > 0 {
            assert!(start.elapsed() < Duration::from_secs(10));
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn tile_size_change_drops_simplified_levels() {
        let mut lod = LodGeometry::new(1.0);
        lod.reset(wiggly(40));
        lod.select_bracket(4);
        lod.set_tile_size(512.0);
        assert!(lod.level(4).is_none());
        assert_eq!(lod.displayed().vertex_count(), 40);
    }
}
