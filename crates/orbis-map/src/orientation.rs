use crate::{TileGrid, TileId, ZoomWindow};

use orbis_core::geometry::{wrap_unit, Uv};
use orbis_core::glam::{DVec2, DVec3};

/// Where the presentation surface's corners land on screen (y up). Reported by the host whenever the surface layout
/// changes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceCorners {
    pub bottom_left: DVec2,
    pub top_left: DVec2,
    pub top_right: DVec2,
    pub bottom_right: DVec2,
}

impl SurfaceCorners {
    /// An unmirrored axis-aligned rectangle.
    pub fn from_min_max(min: DVec2, max: DVec2) -> Self {
        Self {
            bottom_left: min,
            top_left: DVec2::new(min.x, max.y),
            top_right: max,
            bottom_right: DVec2::new(max.x, min.y),
        }
    }
}

/// Whether the presentation surface mirrors what is written to it.
///
/// Display rasters are written pre-mirrored so they read correctly on screen, and clicks (given in the surface's own
/// normalized coordinates, i.e. raster space) are un-mirrored with the same flags.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Orientation {
    pub flip_x: bool,
    pub flip_y: bool,
}

impl Orientation {
    pub const IDENTITY: Self = Self {
        flip_x: false,
        flip_y: false,
    };

    /// The top edge running right-to-left mirrors horizontally; the left edge running downward mirrors vertically.
    pub fn detect(corners: &SurfaceCorners) -> Self {
        let flip_x = corners.top_right.x < corners.top_left.x;
        let flip_y = corners.top_left.y < corners.bottom_left.y;
        if flip_x || flip_y {
            log::debug!("Surface is mirrored: flip_x={} flip_y={}", flip_x, flip_y);
        }
        Self { flip_x, flip_y }
    }

    /// Maps between raster space and window space. Applying it twice is the identity.
    #[inline]
    pub fn apply(&self, uv: Uv) -> Uv {
        Uv::new(
            if self.flip_x { 1.0 - uv.u } else { uv.u },
            if self.flip_y { 1.0 - uv.v } else { uv.v },
        )
    }

    /// The pixel that window pixel `(x, y)` is written to on a `width x height` raster.
    #[inline]
    pub fn apply_pixel(&self, x: u32, y: u32, width: u32, height: u32) -> (u32, u32) {
        (
            if self.flip_x { width - 1 - x } else { x },
            if self.flip_y { height - 1 - y } else { y },
        )
    }
}

/// Inverts the full display pipeline: surface click → window → map projection → direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClickInverseMapper {
    pub window: ZoomWindow,
    pub orientation: Orientation,
}

impl ClickInverseMapper {
    pub fn new(window: ZoomWindow, orientation: Orientation) -> Self {
        Self {
            window,
            orientation,
        }
    }

    /// The map coordinate under `click`, given in normalized surface coordinates.
    pub fn map_uv(&self, click: Uv) -> Uv {
        let uv = self.window.to_map(self.orientation.apply(click));
        Uv::new(wrap_unit(uv.u), uv.v.clamp(0.0, 1.0))
    }

    pub fn direction(&self, click: Uv) -> DVec3 {
        self.map_uv(click).to_direction()
    }

    /// The clicked direction and the tile the grid resolves there.
    pub fn pick(&self, click: Uv, grid: &dyn TileGrid) -> (DVec3, TileId) {
        let direction = self.direction(click);
        (direction, grid.nearest_tile(direction))
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
