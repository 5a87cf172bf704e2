use crate::{CacheService, ConfigError, GenerationScheduler, MinimapConfig, Poll};

use orbis_map::glam::DVec3;
use orbis_map::{
    BodyId, ClickInverseMapper, ColorSource, DisplayRaster, Orientation, SurfaceCorners, TileGrid,
    TileId, Uv, ZoomState, ZoomWindow,
};
use std::sync::Arc;
use std::time::Duration;

/// One minimap session: the caches, the background generation and the user's view of the active body.
///
/// The host calls [`tick`](Self::tick) once per frame with whatever time it can spare, then
/// [`refresh_display`](Self::refresh_display) before presenting [`display`](Self::display).
pub struct Minimap {
    cache: CacheService,
    scheduler: GenerationScheduler,
    zoom: ZoomState,
    orientation: Orientation,
    active_body: Option<BodyId>,
    display: Option<DisplayRaster>,
}

impl Minimap {
    pub fn new(config: MinimapConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            scheduler: GenerationScheduler::new(config.generation),
            zoom: ZoomState::new(config.zoom),
            cache: CacheService::new(config),
            orientation: Orientation::IDENTITY,
            active_body: None,
            display: None,
        })
    }

    pub fn from_config_file(path: &str) -> Result<Self, ConfigError> {
        Self::new(MinimapConfig::read_file(path)?)
    }

    /// Ends the session.
    pub fn dispose(self) {
        self.cache.dispose();
    }

    pub fn config(&self) -> &MinimapConfig {
        self.cache.config()
    }

    /// Applies a new configuration. Every registered body whose master was dropped by it is queued for regeneration.
    pub fn reconfigure(&mut self, config: MinimapConfig) -> Result<(), ConfigError> {
        config.validate()?;

        self.cache.reconfigure(config);
        self.scheduler.set_config(config.generation);

        let (level, center) = (self.zoom.level(), self.zoom.center());
        self.zoom = ZoomState::new(config.zoom);
        self.zoom.set_level(level);
        self.zoom.pan_to(center);

        let dropped = self
            .cache
            .bodies()
            .into_iter()
            .filter(|&body| self.cache.master(body).is_none());
        let queued = self.scheduler.request_all(dropped);
        if queued > 0 {
            log::debug!("Queued {} bodies for regeneration after reconfiguring", queued);
        }

        Ok(())
    }

    pub fn cache(&self) -> &CacheService {
        &self.cache
    }

    pub fn scheduler_mut(&mut self) -> &mut GenerationScheduler {
        &mut self.scheduler
    }

    /// Registers (or reconfigures) `body` and queues generation of its master.
    pub fn add_body(
        &mut self,
        body: BodyId,
        grid: Option<Arc<dyn TileGrid>>,
        colors: Option<Arc<dyn ColorSource>>,
    ) {
        self.cache.register_body(body, grid, colors);
        self.scheduler.request(body);
    }

    pub fn remove_body(&mut self, body: BodyId) -> bool {
        if self.active_body == Some(body) {
            self.active_body = None;
            self.display = None;
        }
        self.cache.unregister_body(body)
    }

    /// Forces a rebuild of the master of `body`.
    pub fn rebuild(&mut self, body: BodyId) -> bool {
        self.cache.is_registered(body) && self.scheduler.request(body)
    }

    pub fn active_body(&self) -> Option<BodyId> {
        self.active_body
    }

    /// Switches the view to `body`, queueing generation of its master if it has none. Unknown bodies are ignored.
    pub fn set_active_body(&mut self, body: BodyId) -> bool {
        if !self.cache.is_registered(body) {
            return false;
        }
        if self.cache.master(body).is_none() {
            self.scheduler.request(body);
        }
        if self.active_body != Some(body) {
            self.active_body = Some(body);
            self.display = None;
        }
        true
    }

    /// Spends up to `budget` on pending generation.
    pub fn tick(&mut self, budget: Duration) -> Poll {
        self.scheduler.resume(&mut self.cache, budget)
    }

    pub fn zoom(&self) -> &ZoomState {
        &self.zoom
    }

    pub fn set_zoom(&mut self, level: f64) {
        self.zoom.set_level(level);
    }

    pub fn zoom_by(&mut self, factor: f64) {
        self.zoom.zoom_by(factor);
    }

    pub fn pan_to(&mut self, center: DVec3) {
        self.zoom.pan_to(center);
    }

    pub fn window(&self) -> ZoomWindow {
        self.zoom.window()
    }

    /// Call whenever the presentation surface is laid out.
    pub fn set_surface_corners(&mut self, corners: &SurfaceCorners) {
        self.orientation = Orientation::detect(corners);
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Brings the display raster up to date with the active body's master and the current view. Returns true if the
    /// display shows a complete, non-degraded map.
    pub fn refresh_display(&mut self) -> bool {
        let body = match self.active_body {
            Some(b) => b,
            None => return false,
        };
        let master = match self.cache.master(body) {
            Some(m) => m,
            None => return false,
        };

        let window = self.zoom.window();
        let config = self.cache.config();
        let is_current = self.display.as_ref().map_or(false, |d| {
            d.is_current(
                &master,
                &window,
                config.display_width,
                config.display_height,
                config.filter,
                self.orientation,
            )
        });
        if !is_current {
            self.display = self.cache.build_display(body, window, self.orientation);
        }

        !master.degraded
    }

    pub fn display(&self) -> Option<&DisplayRaster> {
        self.display.as_ref()
    }

    /// Recolors `tile` on the active body from its color source and refreshes the display.
    pub fn patch_tile(&mut self, tile: TileId) -> usize {
        let body = match self.active_body {
            Some(b) => b,
            None => return 0,
        };
        let written = self.cache.patch_tile(body, tile);
        if written > 0 && self.display.is_some() {
            self.refresh_display();
        }
        written
    }

    fn click_mapper(&self) -> ClickInverseMapper {
        ClickInverseMapper::new(self.zoom.window(), self.orientation)
    }

    /// The direction under `click`, in normalized surface coordinates.
    pub fn click(&self, click: Uv) -> DVec3 {
        self.click_mapper().direction(click)
    }

    /// The direction and tile of the active body under `click`.
    pub fn pick(&self, click: Uv) -> Option<(DVec3, TileId)> {
        let grid = self.cache.grid(self.active_body?)?;
        Some(self.click_mapper().pick(click, &*grid))
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
    use crate::GenerationConfig;

    use orbis_core::approx::assert_relative_eq;
    use orbis_map::glam::DVec2;
    use orbis_map::{PatchConfig, ResampleFilter, Rgba8, TileSet};

    fn config() -> MinimapConfig {
        MinimapConfig {
            master_width: 64,
            master_height: 32,
            display_width: 24,
            display_height: 16,
            generation: GenerationConfig {
                pixel_budget: 1,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn colors() -> Arc<dyn ColorSource> {
        Arc::new(|tile: TileId, _uv: Uv| Some(Rgba8::opaque(tile as u8, 50, 50)))
    }

    fn ready_minimap() -> Minimap {
        let mut minimap = Minimap::new(config()).unwrap();
        minimap.add_body(BodyId(1), Some(Arc::new(TileSet::fibonacci(100))), Some(colors()));
        assert!(minimap.set_active_body(BodyId(1)));
        while minimap.tick(Duration::ZERO) == Poll::InProgress {}
        minimap
    }

    #[test]
    fn display_appears_after_generation() {
        let mut minimap = Minimap::new(config()).unwrap();
        minimap.add_body(BodyId(1), Some(Arc::new(TileSet::fibonacci(100))), Some(colors()));
        minimap.set_active_body(BodyId(1));

        assert_eq!(minimap.tick(Duration::ZERO), Poll::InProgress);
        assert!(!minimap.refresh_display());
        assert!(minimap.display().is_none());

        while minimap.tick(Duration::ZERO) == Poll::InProgress {}
        assert!(minimap.refresh_display());
        let display = minimap.display().unwrap();
        assert_eq!(display.raster.pixels().len(), 24 * 16);
        assert_eq!(display.raster.as_bytes().len(), 24 * 16 * 4);
    }

    #[test]
    fn zoom_changes_rebuild_display_at_same_size() {
        let mut minimap = ready_minimap();
        minimap.refresh_display();
        let full = minimap.display().unwrap().clone();

        minimap.pan_to(DVec3::X);
        minimap.set_zoom(2.0);
        minimap.refresh_display();
        let zoomed = minimap.display().unwrap();
        assert_relative_eq!(zoomed.window.area(), 0.25, epsilon = 1e-12);
        assert_eq!(zoomed.raster.pixels().len(), full.raster.pixels().len());
        assert_ne!(zoomed.window, full.window);

        minimap.set_zoom(1000.0);
        assert_eq!(minimap.zoom().level(), minimap.config().zoom.max_zoom);
    }

    #[test]
    fn center_click_without_zoom() {
        let minimap = ready_minimap();
        let d = minimap.click(Uv::new(0.5, 0.5));
        assert_relative_eq!(d.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(d.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(d.z, 1.0, epsilon = 1e-12);

        let (direction, tile) = minimap.pick(Uv::new(0.5, 0.5)).unwrap();
        assert_eq!(direction, d);
        assert_eq!(tile, TileSet::fibonacci(100).nearest_tile(d));
    }

    #[test]
    fn mirrored_surface_mirrors_clicks() {
        let mut minimap = ready_minimap();
        let plain = minimap.click(Uv::new(0.25, 0.4));

        minimap.set_surface_corners(&SurfaceCorners {
            bottom_left: DVec2::new(100.0, 0.0),
            top_left: DVec2::new(100.0, 50.0),
            top_right: DVec2::new(0.0, 50.0),
            bottom_right: DVec2::new(0.0, 0.0),
        });
        assert!(minimap.orientation().flip_x);
        let mirrored = minimap.click(Uv::new(0.75, 0.4));
        assert!(plain.distance(mirrored) < 1e-9);
    }

    #[test]
    fn patch_refreshes_display() {
        let mut minimap = ready_minimap();
        assert!(minimap.refresh_display());
        let before = minimap.display().unwrap().source_generation;

        let recolored: Arc<dyn ColorSource> =
            Arc::new(|tile: TileId, _uv: Uv| Some(Rgba8::opaque(tile as u8, 200, 0)));
        minimap.add_body(BodyId(1), Some(Arc::new(TileSet::fibonacci(100))), Some(recolored));

        let (_, tile) = minimap.pick(Uv::new(0.5, 0.5)).unwrap();
        assert!(minimap.patch_tile(tile) > 0);
        assert!(minimap.display().unwrap().source_generation > before);
    }

    #[test]
    fn patch_changes_only_the_tile_on_screen() {
        let config = MinimapConfig {
            display_width: 64,
            display_height: 32,
            filter: ResampleFilter::Nearest,
            patch: PatchConfig {
                radius_scale: 4.0,
                assumed_tile_count: None,
            },
            ..config()
        };
        let grid: Arc<dyn TileGrid> = Arc::new(TileSet::fibonacci(100));
        let mut minimap = Minimap::new(config).unwrap();
        minimap.add_body(BodyId(1), Some(grid.clone()), Some(colors()));
        minimap.set_active_body(BodyId(1));
        while minimap.tick(Duration::ZERO) == Poll::InProgress {}
        assert!(minimap.refresh_display());
        let before = minimap.display().unwrap().raster.clone();
        let lut = minimap.cache().master(BodyId(1)).unwrap().lut.clone();

        // A tile that owns the pixel under its own center.
        let (tile, center) = (0..100)
            .find_map(|tile| {
                let direction = grid.tile_direction(tile)?;
                let (x, y) = Uv::from_direction(direction).to_pixel(64, 32);
                (lut.get(x, y) == tile).then(|| (tile, (x, y)))
            })
            .unwrap();

        let recolored: Arc<dyn ColorSource> =
            Arc::new(|tile: TileId, _uv: Uv| Some(Rgba8::opaque(tile as u8, 200, 0)));
        minimap.add_body(BodyId(1), Some(grid), Some(recolored));
        let written = minimap.patch_tile(tile);

        let patched = Rgba8::opaque(tile as u8, 200, 0);
        let display = &minimap.display().unwrap().raster;
        assert_eq!(display.get(center.0, center.1), patched);
        let mut in_tile = 0;
        for y in 0..32 {
            for x in 0..64 {
                if lut.get(x, y) == tile {
                    assert_eq!(display.get(x, y), patched, "({}, {})", x, y);
                    in_tile += 1;
                } else {
                    assert_eq!(display.get(x, y), before.get(x, y), "({}, {})", x, y);
                }
            }
        }
        assert_eq!(written, in_tile);
    }

    #[test]
    fn missing_color_source_reports_degraded() {
        let mut minimap = Minimap::new(config()).unwrap();
        minimap.add_body(BodyId(2), Some(Arc::new(TileSet::icosahedron())), None);
        minimap.set_active_body(BodyId(2));
        while minimap.tick(Duration::ZERO) == Poll::InProgress {}
        assert!(!minimap.refresh_display());
        assert!(minimap.display().unwrap().is_degraded());
    }

    #[test]
    fn unknown_bodies_and_bad_configs() {
        let mut minimap = Minimap::new(config()).unwrap();
        assert!(!minimap.set_active_body(BodyId(5)));
        assert!(!minimap.rebuild(BodyId(5)));
        assert!(minimap.pick(Uv::new(0.5, 0.5)).is_none());
        assert_eq!(minimap.patch_tile(0), 0);

        let bad = MinimapConfig {
            display_width: 0,
            ..config()
        };
        assert!(matches!(Minimap::new(bad), Err(ConfigError::Invalid(_))));
        assert!(minimap.reconfigure(bad).is_err());
    }

    #[test]
    fn reconfiguring_resolution_regenerates_active_body() {
        let mut minimap = ready_minimap();
        minimap
            .reconfigure(MinimapConfig {
                master_width: 32,
                master_height: 16,
                ..config()
            })
            .unwrap();
        assert!(minimap.cache().master(BodyId(1)).is_none());
        while minimap.tick(Duration::ZERO) == Poll::InProgress {}
        assert_eq!(minimap.cache().master(BodyId(1)).unwrap().width(), 32);
        minimap.dispose();
    }

    #[test]
    fn reconfiguring_resolution_regenerates_inactive_bodies() {
        let mut minimap = ready_minimap();
        minimap.add_body(BodyId(2), Some(Arc::new(TileSet::icosahedron())), Some(colors()));
        while minimap.tick(Duration::ZERO) == Poll::InProgress {}
        assert!(minimap.cache().master(BodyId(2)).is_some());

        minimap
            .reconfigure(MinimapConfig {
                master_width: 32,
                master_height: 16,
                ..config()
            })
            .unwrap();
        while minimap.tick(Duration::ZERO) == Poll::InProgress {}
        for body in [BodyId(1), BodyId(2)] {
            let master = minimap.cache().master(body).unwrap();
            assert_eq!((master.width(), master.height()), (32, 16));
        }

        assert!(minimap.set_active_body(BodyId(2)));
        assert!(minimap.refresh_display());
    }

    #[test]
    fn switching_to_body_without_master_generates_it() {
        let mut minimap = ready_minimap();
        minimap.add_body(BodyId(2), Some(Arc::new(TileSet::icosahedron())), Some(colors()));
        while minimap.tick(Duration::ZERO) == Poll::InProgress {}
        minimap.cache.clear_body(BodyId(2));

        assert!(minimap.set_active_body(BodyId(2)));
        assert!(!minimap.refresh_display());
        while minimap.tick(Duration::ZERO) == Poll::InProgress {}
        assert!(minimap.refresh_display());
        assert_eq!(minimap.display().unwrap().raster.width(), 24);
    }

    #[test]
    fn mid_pass_resolution_change_publishes_new_size() {
        let mut minimap = Minimap::new(config()).unwrap();
        minimap.add_body(BodyId(1), Some(Arc::new(TileSet::fibonacci(100))), Some(colors()));
        minimap.set_active_body(BodyId(1));
        assert_eq!(minimap.tick(Duration::ZERO), Poll::InProgress);

        minimap
            .reconfigure(MinimapConfig {
                master_width: 32,
                master_height: 16,
                ..config()
            })
            .unwrap();
        while minimap.tick(Duration::ZERO) == Poll::InProgress {}
        let master = minimap.cache().master(BodyId(1)).unwrap();
        assert_eq!((master.width(), master.height()), (32, 16));
        assert!(minimap.refresh_display());
    }
}
