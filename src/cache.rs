use crate::MinimapConfig;

use orbis_core::SmallKeyHashMap;
use orbis_map::{
    BodyId, BodyIndexCache, ColorSource, DisplayRaster, MapRasterCache, MasterBuild, MasterRaster,
    Orientation, ProjectionLut, TileGrid, TileId, ZoomWindow,
};
use std::sync::Arc;

struct BodyEntry {
    grid: Option<Arc<dyn TileGrid>>,
    colors: Option<Arc<dyn ColorSource>>,
    revision: u64,
    warned_missing: bool,
}

/// Owns every derived cache of a session: the registered bodies, their LUTs and their committed master rasters.
///
/// Nothing in here is authoritative. Any of it can be thrown away with [`reset`](Self::reset) and regenerated from
/// the registered collaborators.
pub struct CacheService {
    config: MinimapConfig,
    bodies: SmallKeyHashMap<BodyId, BodyEntry>,
    luts: BodyIndexCache,
    masters: MapRasterCache,
    /// Revisions are never reused, even across unregistering and registering a body again.
    last_revision: u64,
}

impl CacheService {
    pub fn new(config: MinimapConfig) -> Self {
        log::debug!(
            "Starting cache session: master {}x{}, display {}x{}",
            config.master_width,
            config.master_height,
            config.display_width,
            config.display_height
        );
        Self {
            config,
            bodies: Default::default(),
            luts: BodyIndexCache::new(),
            masters: MapRasterCache::new(),
            last_revision: 0,
        }
    }

    /// Ends the session, dropping every cache.
    pub fn dispose(self) {
        log::debug!(
            "Disposing cache session with {} bodies, {} LUTs, {} masters",
            self.bodies.len(),
            self.luts.len(),
            self.masters.len()
        );
    }

    pub fn config(&self) -> &MinimapConfig {
        &self.config
    }

    /// Adopts `config`. Caches that depend on a changed resolution or LUT strategy are dropped.
    pub fn reconfigure(&mut self, config: MinimapConfig) {
        let old = self.config;
        self.config = config;
        if (old.master_width, old.master_height) != (config.master_width, config.master_height)
            || old.lut != config.lut
        {
            log::debug!("Master layout changed; dropping LUTs and masters");
            self.luts.clear();
            self.masters.clear();
        }
    }

    /// Registers `body`, or reconfigures it if it is already registered. Either collaborator may be missing, in which
    /// case the body's masters are degraded. Returns the body's new revision, which is unique within the session.
    ///
    /// Reconfiguring drops the body's LUTs, but its committed master stays visible until a new one is committed.
    pub fn register_body(
        &mut self,
        body: BodyId,
        grid: Option<Arc<dyn TileGrid>>,
        colors: Option<Arc<dyn ColorSource>>,
    ) -> u64 {
        self.last_revision += 1;
        let revision = self.last_revision;
        if self.bodies.contains_key(&body) {
            log::debug!("Reconfiguring {:?} (revision {})", body, revision);
            self.luts.clear_body(body);
        }
        self.bodies.insert(
            body,
            BodyEntry {
                grid,
                colors,
                revision,
                warned_missing: false,
            },
        );
        revision
    }

    /// Forgets `body` and everything cached for it.
    pub fn unregister_body(&mut self, body: BodyId) -> bool {
        self.luts.clear_body(body);
        self.masters.remove(body);
        self.bodies.remove(&body).is_some()
    }

    pub fn is_registered(&self, body: BodyId) -> bool {
        self.bodies.contains_key(&body)
    }

    pub fn body_revision(&self, body: BodyId) -> Option<u64> {
        self.bodies.get(&body).map(|b| b.revision)
    }

    /// Every registered body, in id order.
    pub fn bodies(&self) -> Vec<BodyId> {
        let mut bodies: Vec<BodyId> = self.bodies.keys().copied().collect();
        bodies.sort_unstable();
        bodies
    }

    pub fn grid(&self, body: BodyId) -> Option<Arc<dyn TileGrid>> {
        self.bodies.get(&body).and_then(|b| b.grid.clone())
    }

    /// The LUT of `body` at master resolution, built now if necessary. `None` if the body has no grid.
    pub fn get_or_build_lut(&mut self, body: BodyId) -> Option<Arc<ProjectionLut>> {
        let grid = self.grid(body)?;
        let (width, height) = (self.config.master_width, self.config.master_height);
        let strategy = self.config.lut.strategy;
        Some(self.luts.get_or_build(body, width, height, || {
            log::debug!("Building {}x{} LUT for {:?} with {:?}", width, height, body, strategy);
            ProjectionLut::build(grid, width, height, strategy)
        }))
    }

    /// The committed master of `body`, if any.
    pub fn master(&self, body: BodyId) -> Option<Arc<MasterRaster>> {
        self.masters.get(body)
    }

    /// Prepares a master build for `body` from its current collaborators. Returns the build and the body revision it
    /// was started at, or `None` if the body is not registered.
    pub fn begin_master_build(&mut self, body: BodyId) -> Option<(MasterBuild, u64)> {
        let (width, height) = (self.config.master_width, self.config.master_height);
        let cached = self.luts.get(body, width, height);
        let strategy = self.config.lut.strategy;
        let entry = self.bodies.get_mut(&body)?;

        if (entry.grid.is_none() || entry.colors.is_none()) && !entry.warned_missing {
            log::warn!(
                "{:?} is missing a {}; its minimap will be blank",
                body,
                if entry.grid.is_none() { "tile grid" } else { "color source" }
            );
            entry.warned_missing = true;
        }

        let build = MasterBuild::new(
            width,
            height,
            entry.grid.clone(),
            cached,
            entry.colors.clone(),
            strategy,
        );
        Some((build, entry.revision))
    }

    /// Finishes `build` and publishes it as the master of `body`. A LUT resolved by the build is cached only if the
    /// body has not been reconfigured since `revision`.
    ///
    /// Builds for unregistered bodies, and builds whose resolution no longer matches the configured master
    /// resolution, are dropped and `None` is returned.
    pub fn commit_master(
        &mut self,
        body: BodyId,
        build: MasterBuild,
        revision: u64,
    ) -> Option<Arc<MasterRaster>> {
        let current_revision = match self.body_revision(body) {
            Some(r) => r,
            None => {
                log::debug!("Dropping master of unregistered {:?}", body);
                return None;
            }
        };
        let (width, height) = (self.config.master_width, self.config.master_height);
        if (build.width(), build.height()) != (width, height) {
            log::debug!(
                "Dropping {}x{} master of {:?}; masters are now {}x{}",
                build.width(),
                build.height(),
                body,
                width,
                height
            );
            return None;
        }
        let (master, built_lut) = build.finish();
        if let Some(lut) = built_lut {
            if revision == current_revision {
                self.luts.insert(body, lut);
            }
        }
        let degraded = master.degraded;
        let master = self.masters.commit(body, master);
        log::info!(
            "Committed {}x{} master for {:?} (generation {}{})",
            master.width(),
            master.height(),
            body,
            master.generation,
            if degraded { ", degraded" } else { "" }
        );
        Some(master)
    }

    /// Builds and commits the master of `body` synchronously.
    pub fn build_master_now(&mut self, body: BodyId) -> Option<Arc<MasterRaster>> {
        let (build, revision) = self.begin_master_build(body)?;
        self.commit_master(body, build, revision)
    }

    /// Recolors `tile` in the committed master of `body` from the body's color source. Returns the number of pixels
    /// written.
    pub fn patch_tile(&mut self, body: BodyId, tile: TileId) -> usize {
        let (grid, colors) = match self.bodies.get(&body) {
            Some(BodyEntry {
                grid: Some(grid),
                colors: Some(colors),
                ..
            }) => (grid.clone(), colors.clone()),
            _ => return 0,
        };
        self.masters.patch(body, &*grid, tile, &*colors, &self.config.patch)
    }

    /// Resamples the committed master of `body` at display resolution.
    pub fn build_display(
        &self,
        body: BodyId,
        window: ZoomWindow,
        orientation: Orientation,
    ) -> Option<DisplayRaster> {
        let master = self.masters.get(body)?;
        Some(DisplayRaster::resample(
            &master,
            window,
            self.config.display_width,
            self.config.display_height,
            self.config.filter,
            orientation,
        ))
    }

    /// Drops the LUTs and master of `body`, keeping its registration.
    pub fn clear_body(&mut self, body: BodyId) {
        self.luts.clear_body(body);
        self.masters.remove(body);
    }

    /// Drops every cache, keeping registrations.
    pub fn reset(&mut self) {
        self.luts.clear();
        self.masters.clear();
        for entry in self.bodies.values_mut() {
            entry.warned_missing = false;
        }
    }

    pub fn num_cached_luts(&self) -> usize {
        self.luts.len()
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝

#[cfg(test)]
mod test {
    use super::*;
    use orbis_map::{Rgba8, TileSet, Uv};

    fn config() -> MinimapConfig {
        MinimapConfig {
            master_width: 64,
            master_height: 32,
            display_width: 20,
            display_height: 20,
            ..Default::default()
        }
    }

    fn colors() -> Arc<dyn ColorSource> {
        Arc::new(|tile: TileId, _uv: Uv| Some(Rgba8::opaque(tile as u8, 100, 0)))
    }

    fn grid() -> Arc<dyn TileGrid> {
        Arc::new(TileSet::fibonacci(50))
    }

    #[test]
    fn synchronous_build_is_deterministic_and_caches_lut() {
        let mut cache = CacheService::new(config());
        cache.register_body(BodyId(1), Some(grid()), Some(colors()));

        let first = cache.build_master_now(BodyId(1)).unwrap();
        assert_eq!(cache.num_cached_luts(), 1);
        let second = cache.build_master_now(BodyId(1)).unwrap();
        assert_eq!(first.raster.as_bytes(), second.raster.as_bytes());
        assert_eq!(*first.lut, *second.lut);
        assert!(second.generation > first.generation);
        assert_eq!(cache.num_cached_luts(), 1);

        let lut = cache.get_or_build_lut(BodyId(1)).unwrap();
        assert_eq!(lut.len(), 64 * 32);
    }

    #[test]
    fn unknown_bodies_are_not_errors() {
        let mut cache = CacheService::new(config());
        assert!(cache.build_master_now(BodyId(3)).is_none());
        assert!(cache.get_or_build_lut(BodyId(3)).is_none());
        assert!(cache.build_display(BodyId(3), ZoomWindow::FULL, Orientation::IDENTITY).is_none());
        assert_eq!(cache.patch_tile(BodyId(3), 0), 0);
        assert!(!cache.unregister_body(BodyId(3)));
    }

    #[test]
    fn missing_grid_degrades() {
        let mut cache = CacheService::new(config());
        cache.register_body(BodyId(1), None, Some(colors()));
        let master = cache.build_master_now(BodyId(1)).unwrap();
        assert!(master.degraded);
        assert!(master.raster.pixels().iter().all(|&p| p == Rgba8::NEUTRAL));

        let display = cache
            .build_display(BodyId(1), ZoomWindow::FULL, Orientation::IDENTITY)
            .unwrap();
        assert!(display.is_degraded());
        assert_eq!(display.raster.pixels().len(), 400);
    }

    #[test]
    fn reconfiguring_keeps_master_and_drops_luts() {
        let mut cache = CacheService::new(config());
        let first = cache.register_body(BodyId(1), Some(grid()), Some(colors()));
        cache.build_master_now(BodyId(1));
        assert!(cache.register_body(BodyId(1), Some(grid()), None) > first);
        assert_eq!(cache.num_cached_luts(), 0);
        assert!(cache.master(BodyId(1)).is_some());
    }

    #[test]
    fn stale_lut_is_not_cached_after_reconfiguration() {
        let mut cache = CacheService::new(config());
        cache.register_body(BodyId(1), Some(grid()), Some(colors()));
        let (build, revision) = cache.begin_master_build(BodyId(1)).unwrap();
        cache.register_body(BodyId(1), Some(Arc::new(TileSet::icosahedron())), Some(colors()));

        assert!(cache.commit_master(BodyId(1), build, revision).is_some());
        assert_eq!(cache.num_cached_luts(), 0);
    }

    #[test]
    fn reregistered_body_gets_fresh_revision() {
        let mut cache = CacheService::new(config());
        let first = cache.register_body(BodyId(1), Some(grid()), Some(colors()));
        let (build, revision) = cache.begin_master_build(BodyId(1)).unwrap();
        assert_eq!(revision, first);

        assert!(cache.unregister_body(BodyId(1)));
        let icosahedron: Arc<dyn TileGrid> = Arc::new(TileSet::icosahedron());
        let second = cache.register_body(BodyId(1), Some(icosahedron), Some(colors()));
        assert_ne!(second, first);
        assert_eq!(cache.body_revision(BodyId(1)), Some(second));

        // The old grid's pass still commits, but its LUT must not be reused.
        assert!(cache.commit_master(BodyId(1), build, revision).is_some());
        assert_eq!(cache.num_cached_luts(), 0);

        let rebuilt = cache.build_master_now(BodyId(1)).unwrap();
        assert!(rebuilt.lut.tiles().iter().all(|&t| (0..12).contains(&t)));
    }

    #[test]
    fn build_at_old_resolution_is_dropped() {
        let mut cache = CacheService::new(config());
        cache.register_body(BodyId(1), Some(grid()), Some(colors()));
        let (build, revision) = cache.begin_master_build(BodyId(1)).unwrap();

        cache.reconfigure(MinimapConfig {
            master_width: 32,
            master_height: 16,
            ..config()
        });
        assert!(cache.commit_master(BodyId(1), build, revision).is_none());
        assert!(cache.master(BodyId(1)).is_none());
        assert_eq!(cache.num_cached_luts(), 0);

        let master = cache.build_master_now(BodyId(1)).unwrap();
        assert_eq!((master.width(), master.height()), (32, 16));
    }

    #[test]
    fn bodies_are_listed_in_order() {
        let mut cache = CacheService::new(config());
        for id in [5, 2, 9] {
            cache.register_body(BodyId(id), None, None);
        }
        assert_eq!(cache.bodies(), vec![BodyId(2), BodyId(5), BodyId(9)]);
    }

    #[test]
    fn patch_updates_master() {
        let mut cache = CacheService::new(config());
        cache.register_body(BodyId(1), Some(grid()), Some(colors()));
        let before = cache.build_master_now(BodyId(1)).unwrap();
        let recolored: Arc<dyn ColorSource> =
            Arc::new(|tile: TileId, _uv: Uv| Some(Rgba8::opaque(tile as u8, 0, 100)));
        cache.register_body(BodyId(1), Some(grid()), Some(recolored));

        assert!(cache.patch_tile(BodyId(1), 7) > 0);
        let after = cache.master(BodyId(1)).unwrap();
        assert!(after.generation > before.generation);
        assert_ne!(after.raster, before.raster);
    }

    #[test]
    fn reset_and_reconfigure_drop_caches() {
        let mut cache = CacheService::new(config());
        cache.register_body(BodyId(1), Some(grid()), Some(colors()));
        cache.build_master_now(BodyId(1));

        cache.reconfigure(MinimapConfig {
            display_width: 40,
            ..config()
        });
        assert!(cache.master(BodyId(1)).is_some());

        cache.reconfigure(MinimapConfig {
            master_width: 128,
            master_height: 64,
            ..config()
        });
        assert!(cache.master(BodyId(1)).is_none());
        assert_eq!(cache.num_cached_luts(), 0);

        cache.build_master_now(BodyId(1));
        cache.reset();
        assert!(cache.master(BodyId(1)).is_none());
        assert!(cache.is_registered(BodyId(1)));
        cache.dispose();
    }
}
