use crate::{
    ColorSource, LutBuilder, LutStrategy, MasterRaster, ProjectionLut, Raster, Rgba8, TileGrid,
    TileId, VOID_TILE,
};

use orbis_core::geometry::Uv;
use std::sync::Arc;

/// The color of one master pixel.
#[inline]
pub fn shade_pixel(colors: &dyn ColorSource, tile: TileId, uv: Uv) -> Rgba8 {
    if tile == VOID_TILE {
        Rgba8::VOID
    } else {
        colors.color(tile, uv).unwrap_or(Rgba8::NEUTRAL)
    }
}

enum LutSource {
    Ready(Arc<ProjectionLut>),
    Building(LutBuilder),
}

/// A resumable master raster build.
///
/// Work is measured in pixels. Each pixel is resolved to a tile (unless a cached LUT is available) and then shaded, so
/// a build can be spread over as many [`step`](Self::step)s as the caller likes and the result is the same.
pub struct MasterBuild {
    lut: LutSource,
    colors: Option<Arc<dyn ColorSource>>,
    raster: Raster,
    cursor: usize,
}

impl MasterBuild {
    /// Starts a build. A `cached` LUT with the right dimensions is reused; otherwise one is resolved from `grid`.
    ///
    /// Without a grid (and no usable cached LUT) or without `colors`, the build is degraded: every pixel is
    /// [`Rgba8::NEUTRAL`].
    pub fn new(
        width: u32,
        height: u32,
        grid: Option<Arc<dyn TileGrid>>,
        cached: Option<Arc<ProjectionLut>>,
        colors: Option<Arc<dyn ColorSource>>,
        strategy: LutStrategy,
    ) -> Self {
        let cached = cached.filter(|lut| lut.has_dimensions(width, height));
        let (lut, colors) = match (cached, grid, colors) {
            (Some(lut), _, colors) => (LutSource::Ready(lut), colors),
            (None, Some(grid), Some(colors)) => (
                LutSource::Building(LutBuilder::new(grid, width, height, strategy)),
                Some(colors),
            ),
            (None, _, _) => (LutSource::Ready(Arc::new(ProjectionLut::void(width, height))), None),
        };
        if colors.is_none() {
            log::debug!("Starting degraded {}x{} master build", width, height);
        }
        Self {
            lut,
            colors,
            raster: Raster::filled(width, height, Rgba8::NEUTRAL),
            cursor: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    pub fn is_degraded(&self) -> bool {
        self.colors.is_none()
    }

    pub fn total_pixels(&self) -> usize {
        self.raster.pixels().len()
    }

    pub fn completed_pixels(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.total_pixels() - self.cursor
    }

    pub fn is_done(&self) -> bool {
        self.cursor >= self.total_pixels()
    }

    /// Resolves and shades up to `max_pixels` more pixels (at least one). Returns true once the build is done.
    pub fn step(&mut self, max_pixels: usize) -> bool {
        let end = self.cursor.saturating_add(max_pixels.max(1)).min(self.total_pixels());
        let range = self.cursor..end;

        match self.colors.as_deref() {
            None => self.raster.pixels_mut()[range.clone()].fill(Rgba8::NEUTRAL),
            Some(colors) => {
                let (width, height) = (self.raster.width(), self.raster.height());
                let tiles: &[TileId] = match &mut self.lut {
                    LutSource::Ready(lut) => &lut.tiles()[range.clone()],
                    LutSource::Building(builder) => builder.resolve(range.clone()),
                };
                let pixels = &mut self.raster.pixels_mut()[range.clone()];
                for (offset, (&tile, pixel)) in tiles.iter().zip(pixels.iter_mut()).enumerate() {
                    let i = range.start + offset;
                    let (x, y) = ((i % width as usize) as u32, (i / width as usize) as u32);
                    *pixel = shade_pixel(colors, tile, Uv::pixel_center(x, y, width, height));
                }
            }
        }

        self.cursor = end;
        self.is_done()
    }

    pub fn run_to_completion(&mut self) {
        while !self.is_done() {
            self.step(usize::MAX);
        }
    }

    /// Completes any remaining work. Also returns the LUT if this build resolved it, so it can be cached.
    pub fn finish(mut self) -> (MasterRaster, Option<Arc<ProjectionLut>>) {
        self.run_to_completion();
        let degraded = self.is_degraded();
        let (lut, built) = match self.lut {
            LutSource::Ready(lut) => (lut, None),
            LutSource::Building(builder) => {
                let lut = Arc::new(builder.finish());
                (lut.clone(), Some(lut))
            }
        };
        let master = MasterRaster {
            raster: self.raster,
            lut,
            degraded,
            generation: 0,
        };
        (master, built)
    }
}

/// Builds a master raster in one go.
pub fn build_master(
    width: u32,
    height: u32,
    grid: Option<Arc<dyn TileGrid>>,
    cached: Option<Arc<ProjectionLut>>,
    colors: Option<Arc<dyn ColorSource>>,
    strategy: LutStrategy,
) -> (MasterRaster, Option<Arc<ProjectionLut>>) {
    MasterBuild::new(width, height, grid, cached, colors, strategy).finish()
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
