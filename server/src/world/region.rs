use channel_shared::{EntityId, RegionDefinition};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::entity::{PlayerCreature, Prop};

/// One spatial partition of the world and the entities currently in it.
///
/// All accessors are local to this region; finding an entity without
/// knowing its region goes through [`WorldManager`](super::WorldManager).
#[derive(Debug)]
pub struct Region {
    id: u32,
    name: String,
    props: RwLock<HashMap<EntityId, Arc<Prop>>>,
    players: RwLock<HashMap<EntityId, Arc<PlayerCreature>>>,
}

impl Region {
    pub fn new(id: u32) -> Self {
        Self::named(id, format!("region_{}", id))
    }

    pub fn from_definition(def: &RegionDefinition) -> Self {
        Self::named(def.id, def.name.clone())
    }

    fn named(id: u32, name: String) -> Self {
        Self {
            id,
            name,
            props: RwLock::new(HashMap::new()),
            players: RwLock::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a prop, replacing any prop with the same entity id.
    pub fn add_prop(&self, prop: Prop) -> Arc<Prop> {
        let prop = Arc::new(prop);
        self.props.write().insert(prop.entity_id, Arc::clone(&prop));
        prop
    }

    pub fn remove_prop(&self, entity_id: EntityId) -> Option<Arc<Prop>> {
        self.props.write().remove(&entity_id)
    }

    pub fn get_prop(&self, entity_id: EntityId) -> Option<Arc<Prop>> {
        self.props.read().get(&entity_id).cloned()
    }

    pub fn prop_count(&self) -> usize {
        self.props.read().len()
    }

    pub fn add_player(&self, creature: Arc<PlayerCreature>) {
        self.players.write().insert(creature.entity_id, creature);
    }

    pub fn remove_player(&self, entity_id: EntityId) -> Option<Arc<PlayerCreature>> {
        self.players.write().remove(&entity_id)
    }

    /// Player in this region with exactly this name.
    pub fn get_player(&self, name: &str) -> Option<Arc<PlayerCreature>> {
        self.players
            .read()
            .values()
            .find(|p| p.name == name)
            .cloned()
    }

    pub fn player_count(&self) -> usize {
        self.players.read().len()
    }

    pub fn players(&self) -> Vec<Arc<PlayerCreature>> {
        self.players.read().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(entity_id: EntityId, name: &str) -> Arc<PlayerCreature> {
        Arc::new(PlayerCreature {
            entity_id,
            name: name.to_string(),
            region_id: 1,
        })
    }

    #[test]
    fn props_add_get_remove() {
        let region = Region::new(1);
        region.add_prop(Prop {
            entity_id: 42,
            class_id: 100,
            region_id: 1,
        });
        assert_eq!(region.prop_count(), 1);
        assert_eq!(region.get_prop(42).unwrap().class_id, 100);
        assert!(region.get_prop(43).is_none());

        assert!(region.remove_prop(42).is_some());
        assert!(region.remove_prop(42).is_none());
        assert_eq!(region.prop_count(), 0);
    }

    #[test]
    fn players_found_by_exact_name() {
        let region = Region::new(1);
        region.add_player(player(1, "Tarlach"));
        region.add_player(player(2, "Nao"));

        assert_eq!(region.get_player("Nao").unwrap().entity_id, 2);
        assert!(region.get_player("nao").is_none());
        assert_eq!(region.player_count(), 2);

        region.remove_player(2);
        assert!(region.get_player("Nao").is_none());
        assert_eq!(region.players().len(), 1);
    }

    #[test]
    fn name_comes_from_definition() {
        let region = Region::from_definition(&RegionDefinition {
            id: 14,
            name: "Dunbarton".to_string(),
        });
        assert_eq!(region.id(), 14);
        assert_eq!(region.name(), "Dunbarton");
        assert_eq!(Region::new(3).name(), "region_3");
    }
}
