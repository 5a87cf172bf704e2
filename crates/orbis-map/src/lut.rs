use crate::{nearest_by_scan, tile_centers, BucketGrid, TileCenter, TileGrid, TileId, VOID_TILE};

use orbis_core::geometry::{direction_from_lat_lon, Uv};
use orbis_core::glam::DVec3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::Range;
use std::sync::Arc;

/// How a [`LutBuilder`] resolves the tile under each pixel. All strategies produce identical tables for a grid whose
/// `nearest_tile` agrees with its tile centers.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum LutStrategy {
    /// Ask the grid's own nearest-tile query for every pixel.
    Query,
    /// Compare every pixel against every tile center. Slow; useful as a reference.
    BruteForce,
    /// Search a [`BucketGrid`] over the tile centers.
    Bucketed,
}

impl Default for LutStrategy {
    fn default() -> Self {
        Self::Bucketed
    }
}

/// The direction sampled for pixel `(x, y)` of a `width x height` LUT.
///
/// Interior pixels sample their center, `u = (x + 0.5) / width`. Columns `0` and `width - 1` are the exception: they
/// straddle the antimeridian, so both sample longitude `-PI` itself instead of their centers. That keeps the two edges
/// of the map resolving to the same tile on every row.
pub fn lut_pixel_direction(x: u32, y: u32, width: u32, height: u32) -> DVec3 {
    let uv = Uv::pixel_center(x, y, width, height);
    if x == 0 || x + 1 == width {
        direction_from_lat_lon(uv.latitude(), -PI)
    } else {
        uv.to_direction()
    }
}

/// A row-major table mapping each pixel of an equirectangular projection to the nearest tile. Immutable once built.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProjectionLut {
    width: u32,
    height: u32,
    tiles: Vec<TileId>,
}

impl ProjectionLut {
    pub fn build(grid: Arc<dyn TileGrid>, width: u32, height: u32, strategy: LutStrategy) -> Self {
        let mut builder = LutBuilder::new(grid, width, height, strategy);
        builder.resolve_all();
        builder.finish()
    }

    /// Every pixel is [`VOID_TILE`].
    pub fn void(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tiles: vec![VOID_TILE; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tiles(&self) -> &[TileId] {
        &self.tiles
    }

    #[inline]
    pub fn linearize(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> TileId {
        self.tiles[self.linearize(x, y)]
    }

    pub fn has_dimensions(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }
}

enum Resolver {
    Query(Arc<dyn TileGrid>),
    BruteForce(Vec<TileCenter>),
    Bucketed(BucketGrid),
}

impl Resolver {
    fn new(grid: Arc<dyn TileGrid>, strategy: LutStrategy) -> Self {
        match strategy {
            LutStrategy::Query => Self::Query(grid),
            LutStrategy::BruteForce => Self::BruteForce(tile_centers(&*grid)),
            LutStrategy::Bucketed => Self::Bucketed(BucketGrid::new(tile_centers(&*grid))),
        }
    }

    fn nearest(&self, direction: DVec3) -> TileId {
        match self {
            Self::Query(grid) => grid.nearest_tile(direction),
            Self::BruteForce(centers) => nearest_by_scan(centers, direction),
            Self::Bucketed(buckets) => buckets.nearest(direction),
        }
    }
}

/// Builds a [`ProjectionLut`] a range of pixels at a time.
pub struct LutBuilder {
    resolver: Resolver,
    width: u32,
    height: u32,
    tiles: Vec<TileId>,
}

impl LutBuilder {
    pub fn new(grid: Arc<dyn TileGrid>, width: u32, height: u32, strategy: LutStrategy) -> Self {
        Self {
            resolver: Resolver::new(grid, strategy),
            width,
            height,
            tiles: vec![VOID_TILE; width as usize * height as usize],
        }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Resolves the pixels with linear indices in `range` and returns their tiles.
    pub fn resolve(&mut self, range: Range<usize>) -> &[TileId] {
        let width = self.width as usize;
        for i in range.clone() {
            let (x, y) = ((i % width) as u32, (i / width) as u32);
            let direction = lut_pixel_direction(x, y, self.width, self.height);
            self.tiles[i] = self.resolver.nearest(direction);
        }
        &self.tiles[range]
    }

    pub fn resolve_all(&mut self) {
        self.resolve(0..self.tiles.len());
    }

    /// Pixels that were never resolved stay [`VOID_TILE`].
    pub fn finish(self) -> ProjectionLut {
        ProjectionLut {
            width: self.width,
            height: self.height,
            tiles: self.tiles,
        }
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
