//! Minimaps of spherical, tile-partitioned bodies.
//!
//! A [`Minimap`] owns a [`CacheService`] with every derived artifact of a session and a [`GenerationScheduler`] that
//! builds master rasters a bounded step at a time. The map data model lives in [`orbis_map`].

mod cache;
mod config;
mod error;
mod minimap;
mod progress;
mod scheduler;

pub use cache::CacheService;
pub use config::MinimapConfig;
pub use error::ConfigError;
pub use minimap::Minimap;
pub use progress::ProgressSink;
pub use scheduler::{GenerationConfig, GenerationScheduler, Poll};

pub use orbis_core;
pub use orbis_map;
