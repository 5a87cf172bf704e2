use crate::ZoomLimits;

use orbis_core::geometry::Uv;
use orbis_core::glam::DVec3;

/// The sub-rectangle of projection space shown by the display, in normalized coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomWindow {
    pub min_u: f64,
    pub min_v: f64,
    pub size_u: f64,
    pub size_v: f64,
}

impl ZoomWindow {
    /// The whole map.
    pub const FULL: Self = Self {
        min_u: 0.0,
        min_v: 0.0,
        size_u: 1.0,
        size_v: 1.0,
    };

    /// A window of size `1 / level` on both axes, centered on `center` unless that would leave `[0, 1]`. `level` is
    /// clamped to `limits` first.
    pub fn compute(center: DVec3, level: f64, limits: &ZoomLimits) -> Self {
        let level = limits.clamp(level).max(1.0);
        let size = 1.0 / level;
        let c = Uv::from_direction(center);
        Self {
            min_u: (c.u - 0.5 * size).clamp(0.0, 1.0 - size),
            min_v: (c.v - 0.5 * size).clamp(0.0, 1.0 - size),
            size_u: size,
            size_v: size,
        }
    }

    /// Maps a normalized position inside the window to map space.
    #[inline]
    pub fn to_map(&self, window_uv: Uv) -> Uv {
        Uv::new(
            self.min_u + window_uv.u * self.size_u,
            self.min_v + window_uv.v * self.size_v,
        )
    }

    /// Maps a map position to a normalized position in the window (outside `[0, 1]` if not visible).
    #[inline]
    pub fn from_map(&self, map_uv: Uv) -> Uv {
        Uv::new(
            (map_uv.u - self.min_u) / self.size_u,
            (map_uv.v - self.min_v) / self.size_v,
        )
    }

    pub fn area(&self) -> f64 {
        self.size_u * self.size_v
    }
}

/// The user's zoom and pan. Every mutation clamps silently.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomState {
    level: f64,
    center: DVec3,
    limits: ZoomLimits,
}

impl ZoomState {
    pub fn new(limits: ZoomLimits) -> Self {
        Self {
            level: limits.min_zoom,
            center: DVec3::Z,
            limits,
        }
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn center(&self) -> DVec3 {
        self.center
    }

    pub fn limits(&self) -> &ZoomLimits {
        &self.limits
    }

    pub fn set_level(&mut self, level: f64) {
        self.level = self.limits.clamp(level);
    }

    pub fn zoom_by(&mut self, factor: f64) {
        self.set_level(self.level * factor);
    }

    /// Zero directions are ignored.
    pub fn pan_to(&mut self, center: DVec3) {
        let center = center.normalize_or_zero();
        if center != DVec3::ZERO {
            self.center = center;
        }
    }

    pub fn window(&self) -> ZoomWindow {
        ZoomWindow::compute(self.center, self.level, &self.limits)
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
