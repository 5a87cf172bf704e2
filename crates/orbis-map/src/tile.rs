use float_ord::FloatOrd;
use orbis_core::glam::DVec3;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Identifies a tile of a body's grid. Valid ids are non-negative.
pub type TileId = i32;

/// "No tile resolved."
pub const VOID_TILE: TileId = -1;

/// Identifies a planet or moon. Each body owns one [`TileGrid`] and one set of caches.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct BodyId(pub u32);

/// The tile partition of a body's surface. Implemented by the host.
pub trait TileGrid {
    /// The tile nearest to `direction`. Must be a pure function of `direction`.
    fn nearest_tile(&self, direction: DVec3) -> TileId;

    /// Tiles are numbered `0..tile_count()`.
    fn tile_count(&self) -> usize;

    /// The representative (center) direction of `tile`, if it exists.
    fn tile_direction(&self, tile: TileId) -> Option<DVec3>;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileCenter {
    pub id: TileId,
    pub direction: DVec3,
}

/// Collects the centers of every tile in `grid` that has one. Directions are taken as given (unit length).
pub fn tile_centers(grid: &dyn TileGrid) -> Vec<TileCenter> {
    (0..grid.tile_count())
        .filter_map(|i| {
            let id = i as TileId;
            grid.tile_direction(id)
                .map(|direction| TileCenter { id, direction })
        })
        .collect()
}

/// Ordering key for nearest-tile searches: a larger dot product is nearer, and equidistant tiles prefer the lower id.
#[inline]
pub fn nearness(dot: f64, id: TileId) -> (FloatOrd<f64>, Reverse<TileId>) {
    (FloatOrd(dot), Reverse(id))
}

/// Scans every center. Returns [`VOID_TILE`] if `centers` is empty.
pub fn nearest_by_scan(centers: &[TileCenter], direction: DVec3) -> TileId {
    centers
        .iter()
        .max_by_key(|c| nearness(c.direction.dot(direction), c.id))
        .map_or(VOID_TILE, |c| c.id)
}

/// A [`TileGrid`] over an explicit list of tile centers, answering queries by brute force.
#[derive(Clone, Debug, Default)]
pub struct TileSet {
    centers: Vec<TileCenter>,
}

impl TileSet {
    /// Tile `i` is centered at `directions[i]` (normalized).
    pub fn new(directions: impl IntoIterator<Item = DVec3>) -> Self {
        Self {
            centers: directions
                .into_iter()
                .enumerate()
                .map(|(i, d)| TileCenter {
                    id: i as TileId,
                    direction: d.normalize_or_zero(),
                })
                .collect(),
        }
    }

    /// The 12 vertices of a regular icosahedron.
    pub fn icosahedron() -> Self {
        let phi = (1.0 + 5f64.sqrt()) / 2.0;
        let mut directions = Vec::with_capacity(12);
        for a in [-1.0, 1.0] {
            for b in [-phi, phi] {
                directions.push(DVec3::new(0.0, a, b));
                directions.push(DVec3::new(a, b, 0.0));
                directions.push(DVec3::new(b, 0.0, a));
            }
        }
        Self::new(directions)
    }

    /// `n` points on a golden-angle spiral, which covers the sphere with nearly equal spacing.
    pub fn fibonacci(n: usize) -> Self {
        let golden_angle = std::f64::consts::PI * (3.0 - 5f64.sqrt());
        Self::new((0..n).map(|i| {
            let y = 1.0 - 2.0 * (i as f64 + 0.5) / n as f64;
            let r = (1.0 - y * y).max(0.0).sqrt();
            let theta = golden_angle * i as f64;
            DVec3::new(r * theta.cos(), y, r * theta.sin())
        }))
    }

    pub fn centers(&self) -> &[TileCenter] {
        &self.centers
    }
}

impl TileGrid for TileSet {
    fn nearest_tile(&self, direction: DVec3) -> TileId {
        nearest_by_scan(&self.centers, direction)
    }

    fn tile_count(&self) -> usize {
        self.centers.len()
    }

    fn tile_direction(&self, tile: TileId) -> Option<DVec3> {
        usize::try_from(tile)
            .ok()
            .and_then(|i| self.centers.get(i))
            .map(|c| c.direction)
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
