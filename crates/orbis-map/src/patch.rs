use crate::{shade_pixel, ColorSource, MasterRaster, PatchConfig, TileGrid, TileId};

use orbis_core::geometry::Uv;
use std::f64::consts::PI;

/// Recolors the pixels of `tile` in `master` without touching any other tile's pixels.
///
/// Only a disc around the tile center is scanned. Its radius is `radius_scale` times the radius of a disc with the
/// area of an average tile, widened by `1 / cos(latitude)` on each row to follow the projection's stretching, and
/// wrapped across the seam. Returns the number of pixels written.
pub fn patch_tile(
    master: &mut MasterRaster,
    grid: &dyn TileGrid,
    tile: TileId,
    colors: &dyn ColorSource,
    config: &PatchConfig,
) -> usize {
    let direction = match grid.tile_direction(tile) {
        Some(d) => d,
        None => {
            log::debug!("Ignoring patch of unknown tile {}", tile);
            return 0;
        }
    };
    let (width, height) = (master.width(), master.height());
    if width == 0 || height == 0 || !master.lut.has_dimensions(width, height) {
        return 0;
    }

    let tile_count = config.assumed_tile_count.unwrap_or_else(|| grid.tile_count()).max(1);
    let average_tile_area = (width as f64 * height as f64) / (PI * tile_count as f64);
    let radius = config.radius_scale * average_tile_area.sqrt();
    let (cx, cy) = Uv::from_direction(direction).to_pixel(width, height);

    let reach = radius.ceil() as i64;
    let y_min = (cy as i64 - reach).max(0) as u32;
    let y_max = (cy as i64 + reach).min(height as i64 - 1) as u32;

    let mut written = 0;
    for y in y_min..=y_max {
        let dy = y as f64 - cy as f64;
        let half_chord = (radius * radius - dy * dy).max(0.0).sqrt();
        let cos_lat = Uv::pixel_center(0, y, width, height).latitude().cos();
        let half_span = if cos_lat > f64::EPSILON {
            (half_chord / cos_lat).ceil()
        } else {
            f64::INFINITY
        };

        let columns: Box<dyn Iterator<Item = u32>> = if 2.0 * half_span + 1.0 >= width as f64 {
            Box::new(0..width)
        } else {
            let half_span = half_span as i64;
            let w = width as i64;
            let (first, last) = (cx as i64 - half_span, cx as i64 + half_span);
            Box::new((first..=last).map(move |x| x.rem_euclid(w) as u32))
        };

        for x in columns {
            if master.lut.get(x, y) != tile {
                continue;
            }
            let color = shade_pixel(colors, tile, Uv::pixel_center(x, y, width, height));
            master.raster.set(x, y, color);
            written += 1;
        }
    }

    written
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
