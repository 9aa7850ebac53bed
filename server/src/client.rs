use channel_shared::{EntityId, Packet};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::dispatch::Connection;
use crate::world::{PlayerCreature, WorldManager};

/// Per-connection state seen by packet handlers.
pub struct ChannelClient {
    id: u64,
    world: Arc<WorldManager>,
    creatures: RwLock<HashMap<EntityId, Arc<PlayerCreature>>>,
    outbound: mpsc::UnboundedSender<Packet>,
    closed: AtomicBool,
}

impl ChannelClient {
    pub fn new(id: u64, world: Arc<WorldManager>, outbound: mpsc::UnboundedSender<Packet>) -> Self {
        Self {
            id,
            world,
            creatures: RwLock::new(HashMap::new()),
            outbound,
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn world(&self) -> &Arc<WorldManager> {
        &self.world
    }

    /// Creature controlled by this connection, if `entity_id` is one of them.
    pub fn get_creature(&self, entity_id: EntityId) -> Option<Arc<PlayerCreature>> {
        self.creatures.read().get(&entity_id).cloned()
    }

    pub fn add_creature(&self, creature: Arc<PlayerCreature>) {
        self.creatures.write().insert(creature.entity_id, creature);
    }

    pub fn remove_creature(&self, entity_id: EntityId) -> Option<Arc<PlayerCreature>> {
        self.creatures.write().remove(&entity_id)
    }

    pub fn creatures(&self) -> Vec<Arc<PlayerCreature>> {
        self.creatures.read().values().cloned().collect()
    }

    /// Queue a packet for this connection. Dropped if the socket is gone.
    pub fn send(&self, packet: Packet) {
        if self.outbound.send(packet).is_err() {
            tracing::debug!(connection = self.id, "Outbound channel closed, packet dropped");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Connection for ChannelClient {
    fn connection_id(&self) -> u64 {
        self.id
    }

    fn disconnect(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
