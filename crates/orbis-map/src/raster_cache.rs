use crate::{patch_tile, BodyId, ColorSource, MasterRaster, PatchConfig, TileGrid, TileId};

use orbis_core::SmallKeyHashMap;
use std::sync::Arc;

/// The committed master raster of each body.
///
/// Readers get an `Arc` snapshot; a later commit or patch never changes a snapshot somebody else holds. Every change
/// stamps the master with a fresh generation from a single counter, so generations are unique across bodies.
#[derive(Default)]
pub struct MapRasterCache {
    masters: SmallKeyHashMap<BodyId, Arc<MasterRaster>>,
    next_generation: u64,
}

impl MapRasterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, body: BodyId) -> Option<Arc<MasterRaster>> {
        self.masters.get(&body).cloned()
    }

    /// The committed master of `body`, if it has exactly these dimensions.
    pub fn get_sized(&self, body: BodyId, width: u32, height: u32) -> Option<Arc<MasterRaster>> {
        self.masters
            .get(&body)
            .filter(|m| m.width() == width && m.height() == height)
            .cloned()
    }

    fn bump_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    /// Publishes `master` as the current master of `body`.
    pub fn commit(&mut self, body: BodyId, mut master: MasterRaster) -> Arc<MasterRaster> {
        master.generation = self.bump_generation();
        let master = Arc::new(master);
        if let Some(old) = self.masters.insert(body, master.clone()) {
            log::trace!(
                "Replaced master of {:?}: generation {} -> {}",
                body,
                old.generation,
                master.generation
            );
        }
        master
    }

    /// Recolors `tile` in the committed master of `body`. Returns the number of pixels written.
    pub fn patch(
        &mut self,
        body: BodyId,
        grid: &dyn TileGrid,
        tile: TileId,
        colors: &dyn ColorSource,
        config: &PatchConfig,
    ) -> usize {
        let generation = self.next_generation + 1;
        let master = match self.masters.get_mut(&body) {
            Some(m) => m,
            None => return 0,
        };
        // Copies the pixels only if a reader still holds the previous snapshot.
        let master = Arc::make_mut(master);
        let written = patch_tile(master, grid, tile, colors, config);
        if written > 0 {
            master.generation = generation;
            self.next_generation = generation;
        }
        written
    }

    pub fn remove(&mut self, body: BodyId) -> Option<Arc<MasterRaster>> {
        self.masters.remove(&body)
    }

    pub fn clear(&mut self) {
        self.masters.clear();
    }

    pub fn len(&self) -> usize {
        self.masters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masters.is_empty()
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
