use channel_shared::Packet;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Outcome of a handler. Errors are logged by the dispatcher and go no
/// further.
pub type HandlerResult = anyhow::Result<()>;

/// Logic bound to one or more operation codes.
///
/// A single instance serves every connection, so implementations must be
/// stateless or synchronize internally.
pub trait PacketHandler<C>: Send + Sync {
    fn handle(&self, client: &C, packet: &Packet) -> HandlerResult;
}

impl<C, F> PacketHandler<C> for F
where
    F: Fn(&C, &Packet) -> HandlerResult + Send + Sync,
{
    fn handle(&self, client: &C, packet: &Packet) -> HandlerResult {
        self(client, packet)
    }
}

/// Plain function handler.
pub type HandlerFn<C> = fn(&C, &Packet) -> HandlerResult;

/// How a table row produces its handler.
pub enum HandlerKind<C> {
    Function(HandlerFn<C>),
    /// Constructor for a handler object; called once per registry.
    Object(fn() -> Arc<dyn PacketHandler<C>>),
}

/// One row of a registration table.
pub struct HandlerDescriptor<C> {
    pub name: &'static str,
    pub ops: &'static [u32],
    pub kind: HandlerKind<C>,
}

impl<C: 'static> HandlerDescriptor<C> {
    pub fn function(name: &'static str, ops: &'static [u32], f: HandlerFn<C>) -> Self {
        Self {
            name,
            ops,
            kind: HandlerKind::Function(f),
        }
    }

    pub fn object(
        name: &'static str,
        ops: &'static [u32],
        make: fn() -> Arc<dyn PacketHandler<C>>,
    ) -> Self {
        Self {
            name,
            ops,
            kind: HandlerKind::Object(make),
        }
    }

    fn instantiate(&self) -> Arc<dyn PacketHandler<C>> {
        match &self.kind {
            HandlerKind::Function(f) => Arc::new(*f),
            HandlerKind::Object(make) => make(),
        }
    }
}

/// A registered handler and the name it was registered under.
pub struct HandlerEntry<C> {
    pub name: &'static str,
    pub handler: Arc<dyn PacketHandler<C>>,
}

impl<C> Clone for HandlerEntry<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<C> fmt::Debug for HandlerEntry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry").field("name", &self.name).finish()
    }
}

/// Operation code to handler map. At most one handler per code.
pub struct HandlerRegistry<C> {
    handlers: RwLock<HashMap<u32, HandlerEntry<C>>>,
}

impl<C: 'static> HandlerRegistry<C> {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Build a registry from a registration table. Each row is instantiated
    /// once and bound to every op it lists.
    pub fn from_table(table: &[HandlerDescriptor<C>]) -> Self {
        let registry = Self::new();
        for descriptor in table {
            let handler = descriptor.instantiate();
            for &op in descriptor.ops {
                registry.register_shared(op, descriptor.name, Arc::clone(&handler));
            }
        }
        tracing::info!(
            "Registered {} handlers for {} ops",
            table.len(),
            registry.len()
        );
        registry
    }

    /// Bind `handler` to `op`. Returns the name of the handler it replaced.
    pub fn register<H>(&self, op: u32, name: &'static str, handler: H) -> Option<&'static str>
    where
        H: PacketHandler<C> + 'static,
    {
        self.register_shared(op, name, Arc::new(handler))
    }

    /// Like [`register`](Self::register) for a handler already shared by
    /// other ops.
    pub fn register_shared(
        &self,
        op: u32,
        name: &'static str,
        handler: Arc<dyn PacketHandler<C>>,
    ) -> Option<&'static str> {
        let previous = self
            .handlers
            .write()
            .insert(op, HandlerEntry { name, handler })?;
        tracing::warn!(
            "Overwriting handler for '0x{:04X}': '{}' replaced by '{}'",
            op,
            previous.name,
            name
        );
        Some(previous.name)
    }

    /// Entry for `op`. The registry lock is released before this returns.
    pub fn get(&self, op: u32) -> Option<HandlerEntry<C>> {
        self.handlers.read().get(&op).cloned()
    }

    pub fn contains(&self, op: u32) -> bool {
        self.handlers.read().contains_key(&op)
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// Registered op codes, ascending.
    pub fn ops(&self) -> Vec<u32> {
        let mut ops: Vec<u32> = self.handlers.read().keys().copied().collect();
        ops.sort_unstable();
        ops
    }
}

impl<C: 'static> Default for HandlerRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}
