use crate::LutStrategy;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct ZoomLimits {
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min_zoom: 1.0,
            max_zoom: 16.0,
        }
    }
}

impl ZoomLimits {
    /// NaN clamps to `min_zoom`.
    pub fn clamp(&self, level: f64) -> f64 {
        if level.is_nan() {
            return self.min_zoom;
        }
        level.min(self.max_zoom).max(self.min_zoom)
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct LutConfig {
    pub strategy: LutStrategy,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct PatchConfig {
    /// Multiplies the radius of a disc with the area of an average tile.
    pub radius_scale: f64,
    /// Tile count used to estimate a tile's footprint. Defaults to the grid's own tile count.
    pub assumed_tile_count: Option<usize>,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            radius_scale: 1.5,
            assumed_tile_count: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ResampleFilter {
    Nearest,
    Bilinear,
}

impl Default for ResampleFilter {
    fn default() -> Self {
        Self::Nearest
    }
}
