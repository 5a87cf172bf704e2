use crate::{BodyId, ProjectionLut};

use orbis_core::SmallKeyHashMap;
use std::sync::Arc;

/// Identifies a cached LUT: one per body and horizontal resolution.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct LutKey {
    pub body: BodyId,
    pub resolution: u32,
}

impl LutKey {
    pub fn new(body: BodyId, width: u32) -> Self {
        Self {
            body,
            resolution: width,
        }
    }
}

/// Memoizes [`ProjectionLut`]s per (body, resolution).
///
/// The number of distinct keys in a session is small, so entries are never evicted; they only go away when a body is
/// reconfigured or the whole cache is cleared.
#[derive(Default)]
pub struct BodyIndexCache {
    luts: SmallKeyHashMap<LutKey, Arc<ProjectionLut>>,
}

impl BodyIndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached LUT for `body`, if one exists with exactly these dimensions.
    pub fn get(&self, body: BodyId, width: u32, height: u32) -> Option<Arc<ProjectionLut>> {
        self.luts
            .get(&LutKey::new(body, width))
            .filter(|lut| lut.has_dimensions(width, height))
            .cloned()
    }

    /// Returns the cached LUT, or builds and caches one. A cached LUT with the wrong dimensions is discarded.
    pub fn get_or_build(
        &mut self,
        body: BodyId,
        width: u32,
        height: u32,
        build: impl FnOnce() -> ProjectionLut,
    ) -> Arc<ProjectionLut> {
        if let Some(lut) = self.get(body, width, height) {
            return lut;
        }
        self.insert(body, build())
    }

    /// Stores `lut` under its own dimensions, replacing any previous LUT for the same key.
    pub fn insert(
        &mut self,
        body: BodyId,
        lut: impl Into<Arc<ProjectionLut>>,
    ) -> Arc<ProjectionLut> {
        let lut = lut.into();
        let key = LutKey::new(body, lut.width());
        if let Some(stale) = self.luts.insert(key, lut.clone()) {
            if !stale.has_dimensions(lut.width(), lut.height()) {
                log::debug!(
                    "Discarding {}x{} LUT for {:?}; rebuilt at {}x{}",
                    stale.width(),
                    stale.height(),
                    body,
                    lut.width(),
                    lut.height()
                );
            }
        }
        lut
    }

    /// Drops every LUT of `body`.
    pub fn clear_body(&mut self, body: BodyId) {
        self.luts.retain(|key, _| key.body != body);
    }

    pub fn clear(&mut self) {
        self.luts.clear();
    }

    pub fn len(&self) -> usize {
        self.luts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.luts.is_empty()
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
