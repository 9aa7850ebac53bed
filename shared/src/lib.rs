//! Protocol values shared by the channel server and its clients.

pub mod op;
pub mod packet;
pub mod region_data;

pub use packet::{
    EntityId, FieldKind, Packet, PacketBuilder, PacketError, PacketField, PacketReader,
};
pub use region_data::{RegionDataError, RegionDb, RegionDefinition};
