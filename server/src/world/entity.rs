use channel_shared::EntityId;

/// A static or interactive object placed in a region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prop {
    pub entity_id: EntityId,
    pub class_id: u32,
    pub region_id: u32,
}

/// A creature controlled by a connected player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerCreature {
    pub entity_id: EntityId,
    pub name: String,
    pub region_id: u32,
}
