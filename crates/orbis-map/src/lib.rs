//! The orbis map data model.
//!
//! # Projection
//!
//! A body's surface is partitioned into tiles by an external [`TileGrid`]. The map is an equirectangular projection of
//! that surface: every pixel of a [`ProjectionLut`] stores the id of the tile nearest to the pixel's center direction.
//! The projection convention lives in [`orbis_core::geometry`] and is shared by every module here, so that projecting
//! and un-projecting (for click picking) are exact inverses.
//!
//! # Rasters
//!
//! Colors are cached in two tiers. A [`MasterRaster`] is built once per body from a LUT and a [`ColorSource`]; it is
//! expensive, so it is built by a resumable [`MasterBuild`] that can be driven a few pixels at a time. A [`DisplayRaster`]
//! is resampled from the master through a [`ZoomWindow`] whenever the view changes; its cost only depends on the
//! display resolution.
//!
//! Single tiles can be recolored in place with [`patch_tile`], which avoids rebuilding the master.

mod bucket_grid;
mod config;
mod index_cache;
mod lut;
mod master;
mod orientation;
mod palette;
mod patch;
mod raster;
mod raster_cache;
mod tile;
mod zoom;

pub use bucket_grid::*;
pub use config::*;
pub use index_cache::*;
pub use lut::*;
pub use master::*;
pub use orientation::*;
pub use palette::*;
pub use patch::*;
pub use raster::*;
pub use raster_cache::*;
pub use tile::*;
pub use zoom::*;

pub use orbis_core::geometry::Uv;
pub use orbis_core::glam;
