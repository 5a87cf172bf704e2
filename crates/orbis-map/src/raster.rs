use crate::{Orientation, ProjectionLut, ResampleFilter, Rgba8, ZoomWindow};

use orbis_core::geometry::{wrap_unit, Uv};
use std::sync::Arc;

/// A row-major RGBA image in projection space. Horizontally periodic; vertically clamped.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<Rgba8>,
}

impl Raster {
    pub fn filled(width: u32, height: u32, color: Rgba8) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixels(&self) -> &[Rgba8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Rgba8] {
        &mut self.pixels
    }

    /// Tightly packed RGBA8 bytes, ready for upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    #[inline]
    pub fn linearize(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Rgba8 {
        self.pixels[self.linearize(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, color: Rgba8) {
        let i = self.linearize(x, y);
        self.pixels[i] = color;
    }

    pub fn sample(&self, uv: Uv, filter: ResampleFilter) -> Rgba8 {
        match filter {
            ResampleFilter::Nearest => self.sample_nearest(uv),
            ResampleFilter::Bilinear => self.sample_bilinear(uv),
        }
    }

    pub fn sample_nearest(&self, uv: Uv) -> Rgba8 {
        if self.is_empty() {
            return Rgba8::VOID;
        }
        let (x, y) = uv.to_pixel(self.width, self.height);
        self.get(x, y)
    }

    pub fn sample_bilinear(&self, uv: Uv) -> Rgba8 {
        if self.is_empty() {
            return Rgba8::VOID;
        }
        let (w, h) = (self.width as f64, self.height as f64);
        let fx = wrap_unit(uv.u) * w - 0.5;
        let fy = (uv.v.clamp(0.0, 1.0) * h - 0.5).clamp(0.0, h - 1.0);

        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;

        let wrap_x = |x: f64| x.rem_euclid(w) as u32;
        let (xa, xb) = (wrap_x(x0), wrap_x(x0 + 1.0));
        let ya = y0 as u32;
        let yb = (ya + 1).min(self.height - 1);

        let top = self.get(xa, ya).lerp(self.get(xb, ya), tx);
        let bottom = self.get(xa, yb).lerp(self.get(xb, yb), tx);
        top.lerp(bottom, ty)
    }
}

/// The full-resolution colored map of one body, together with the LUT it was shaded from.
///
/// `generation` increases every time the pixels change (commit or patch), so dependents can tell when they are stale.
#[derive(Clone, Debug)]
pub struct MasterRaster {
    pub raster: Raster,
    pub lut: Arc<ProjectionLut>,
    /// Built without a grid or color source; every pixel is [`Rgba8::NEUTRAL`].
    pub degraded: bool,
    pub generation: u64,
}

impl MasterRaster {
    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}

/// The zoomed, orientation-corrected view of a [`MasterRaster`] actually shown to the user.
#[derive(Clone, Debug)]
pub struct DisplayRaster {
    pub raster: Raster,
    pub window: ZoomWindow,
    pub orientation: Orientation,
    pub filter: ResampleFilter,
    /// The master generation this was resampled from.
    pub source_generation: u64,
    pub degraded: bool,
}

impl DisplayRaster {
    /// Samples `master` at every display pixel center. Touches exactly `width * height` pixels regardless of the
    /// master's size.
    pub fn resample(
        master: &MasterRaster,
        window: ZoomWindow,
        width: u32,
        height: u32,
        filter: ResampleFilter,
        orientation: Orientation,
    ) -> Self {
        let mut raster = Raster::filled(width, height, Rgba8::VOID);
        for y in 0..height {
            for x in 0..width {
                let map_uv = window.to_map(Uv::pixel_center(x, y, width, height));
                let (tx, ty) = orientation.apply_pixel(x, y, width, height);
                raster.set(tx, ty, master.raster.sample(map_uv, filter));
            }
        }
        Self {
            raster,
            window,
            orientation,
            filter,
            source_generation: master.generation,
            degraded: master.degraded,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Whether this was resampled from exactly `master` with these view parameters.
    pub fn is_current(
        &self,
        master: &MasterRaster,
        window: &ZoomWindow,
        width: u32,
        height: u32,
        filter: ResampleFilter,
        orientation: Orientation,
    ) -> bool {
        self.source_generation == master.generation
            && self.window == *window
            && self.raster.width() == width
            && self.raster.height() == height
            && self.filter == filter
            && self.orientation == orientation
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
