use crate::{ConfigError, GenerationConfig};

use orbis_map::{LutConfig, PatchConfig, ResampleFilter, ZoomLimits};
use serde::{Deserialize, Serialize};

/// Everything a [`Minimap`](crate::Minimap) session needs to know up front. Missing fields take their defaults.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct MinimapConfig {
    pub master_width: u32,
    pub master_height: u32,
    pub display_width: u32,
    pub display_height: u32,
    pub zoom: ZoomLimits,
    pub filter: ResampleFilter,
    pub lut: LutConfig,
    pub patch: PatchConfig,
    pub generation: GenerationConfig,
}

impl Default for MinimapConfig {
    fn default() -> Self {
        Self {
            master_width: 1024,
            master_height: 512,
            display_width: 256,
            display_height: 256,
            zoom: ZoomLimits::default(),
            filter: ResampleFilter::default(),
            lut: LutConfig::default(),
            patch: PatchConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

impl MinimapConfig {
    pub fn read_file(path: &str) -> Result<Self, ConfigError> {
        let reader = std::fs::File::open(path)?;
        let config: Self = ron::de::from_reader(reader)?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::de::from_str(s)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.master_width == 0 || self.master_height == 0 {
            return Err(ConfigError::invalid(format!(
                "master resolution {}x{} is empty",
                self.master_width, self.master_height
            )));
        }
        if self.display_width == 0 || self.display_height == 0 {
            return Err(ConfigError::invalid(format!(
                "display resolution {}x{} is empty",
                self.display_width, self.display_height
            )));
        }
        let ZoomLimits { min_zoom, max_zoom } = self.zoom;
        if !(min_zoom.is_finite() && max_zoom.is_finite())
            || min_zoom < 1.0
            || min_zoom > max_zoom
        {
            return Err(ConfigError::invalid(format!(
                "zoom limits [{}, {}] must satisfy 1 <= min_zoom <= max_zoom",
                min_zoom, max_zoom
            )));
        }
        if !(self.patch.radius_scale.is_finite() && self.patch.radius_scale > 0.0) {
            return Err(ConfigError::invalid(format!(
                "patch radius_scale {} must be positive",
                self.patch.radius_scale
            )));
        }
        if self.generation.target_step_count == 0 {
            return Err(ConfigError::invalid("generation target_step_count must be at least 1"));
        }

        Ok(())
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
