pub mod entity;
pub mod region;

use channel_shared::{EntityId, RegionDb, RegionDefinition};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

pub use entity::{PlayerCreature, Prop};
pub use region::Region;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("region {0} already exists")]
    DuplicateRegion(u32),
}

/// Concurrent map of region id to region.
///
/// Mutations take the write lock for the whole insert/remove. Lookups take
/// the read lock only long enough to clone the `Arc`. Cross-region scans
/// ([`get_prop`](Self::get_prop), [`get_player`](Self::get_player)) copy the
/// region list under the read lock and scan the copy, in ascending region
/// id order, after releasing it. A region removed during a scan may still be
/// visited; a region added during a scan is not.
#[derive(Debug, Default)]
pub struct WorldManager {
    regions: RwLock<BTreeMap<u32, Arc<Region>>>,
}

impl WorldManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create one region per definition. Returns how many were added.
    pub fn initialize(&self, db: &RegionDb) -> Result<usize, WorldError> {
        let mut added = 0;
        for def in db.entries() {
            self.add_region_from(def)?;
            added += 1;
        }
        tracing::info!("World initialized with {} regions", added);
        Ok(added)
    }

    /// Add an empty region. Fails if `id` is already taken; the existing
    /// region is left untouched.
    pub fn add_region(&self, id: u32) -> Result<Arc<Region>, WorldError> {
        self.insert(Region::new(id))
    }

    pub fn add_region_from(&self, def: &RegionDefinition) -> Result<Arc<Region>, WorldError> {
        self.insert(Region::from_definition(def))
    }

    fn insert(&self, region: Region) -> Result<Arc<Region>, WorldError> {
        let id = region.id();
        let mut regions = self.regions.write();
        if regions.contains_key(&id) {
            return Err(WorldError::DuplicateRegion(id));
        }
        let region = Arc::new(region);
        regions.insert(id, Arc::clone(&region));
        Ok(region)
    }

    /// Remove a region. Removing an unknown id does nothing.
    pub fn remove_region(&self, id: u32) -> Option<Arc<Region>> {
        self.regions.write().remove(&id)
    }

    pub fn get_region(&self, id: u32) -> Option<Arc<Region>> {
        self.regions.read().get(&id).cloned()
    }

    pub fn count(&self) -> usize {
        self.regions.read().len()
    }

    pub fn region_ids(&self) -> Vec<u32> {
        self.regions.read().keys().copied().collect()
    }

    /// First prop with this id in any region.
    pub fn get_prop(&self, entity_id: EntityId) -> Option<Arc<Prop>> {
        self.snapshot()
            .iter()
            .find_map(|region| region.get_prop(entity_id))
    }

    /// Player with this name in any region.
    pub fn get_player(&self, name: &str) -> Option<Arc<PlayerCreature>> {
        self.snapshot()
            .iter()
            .find_map(|region| region.get_player(name))
    }

    fn snapshot(&self) -> Vec<Arc<Region>> {
        self.regions.read().values().cloned().collect()
    }
}
