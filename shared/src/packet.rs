use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a world entity (creature, prop, ...).
pub type EntityId = u64;

/// A single typed payload value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacketField {
    Byte(u8),
    Short(u16),
    Int(u32),
    Long(u64),
    Float(f32),
    String(String),
    Bin(Vec<u8>),
}

/// Type tag of a [`PacketField`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Byte,
    Short,
    Int,
    Long,
    Float,
    String,
    Bin,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Byte => "Byte",
            FieldKind::Short => "Short",
            FieldKind::Int => "Int",
            FieldKind::Long => "Long",
            FieldKind::Float => "Float",
            FieldKind::String => "String",
            FieldKind::Bin => "Bin",
        };
        f.pad(name)
    }
}

impl PacketField {
    pub fn kind(&self) -> FieldKind {
        match self {
            PacketField::Byte(_) => FieldKind::Byte,
            PacketField::Short(_) => FieldKind::Short,
            PacketField::Int(_) => FieldKind::Int,
            PacketField::Long(_) => FieldKind::Long,
            PacketField::Float(_) => FieldKind::Float,
            PacketField::String(_) => FieldKind::String,
            PacketField::Bin(_) => FieldKind::Bin,
        }
    }
}

/// Errors raised while reading fields out of a packet.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PacketError {
    /// The handler asked for more fields than the packet carries.
    #[error("packet 0x{op:04X} has no field at index {index}")]
    EndOfPacket { op: u32, index: usize },
    /// The next field is not of the requested type.
    #[error("packet 0x{op:04X} field {index}: expected {expected}, found {found}")]
    TypeMismatch {
        op: u32,
        index: usize,
        expected: FieldKind,
        found: FieldKind,
    },
}

/// One decoded protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    op: u32,
    id: EntityId,
    #[serde(default)]
    fields: Vec<PacketField>,
}

impl Packet {
    /// Packet without payload.
    pub fn new(op: u32, id: EntityId) -> Self {
        Self {
            op,
            id,
            fields: Vec::new(),
        }
    }

    pub fn with_fields(op: u32, id: EntityId, fields: Vec<PacketField>) -> Self {
        Self { op, id, fields }
    }

    pub fn builder(op: u32, id: EntityId) -> PacketBuilder {
        PacketBuilder {
            packet: Self::new(op, id),
        }
    }

    /// Operation code identifying the message type.
    pub fn op(&self) -> u32 {
        self.op
    }

    /// Entity the packet was sent for (or addressed to).
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn fields(&self) -> &[PacketField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Cursor over the payload, starting at the first field.
    pub fn reader(&self) -> PacketReader<'_> {
        PacketReader {
            packet: self,
            pos: 0,
        }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Op: {:08X}, Id: {:016X}", self.op, self.id)?;
        for (i, field) in self.fields.iter().enumerate() {
            let (hex, value) = match field {
                PacketField::Byte(v) => (format!("{:02X}", v), v.to_string()),
                PacketField::Short(v) => (format!("{:04X}", v), v.to_string()),
                PacketField::Int(v) => (format!("{:08X}", v), v.to_string()),
                PacketField::Long(v) => (format!("{:016X}", v), v.to_string()),
                PacketField::Float(v) => (String::new(), v.to_string()),
                PacketField::String(v) => (String::new(), format!("\"{}\"", v)),
                PacketField::Bin(v) => (String::new(), format!("{} bytes", v.len())),
            };
            writeln!(
                f,
                "{:03} [{:.>16}] {:<7}: {}",
                i + 1,
                hex,
                field.kind(),
                value
            )?;
        }
        Ok(())
    }
}

/// Builds outbound packets field by field.
#[derive(Debug)]
pub struct PacketBuilder {
    packet: Packet,
}

impl PacketBuilder {
    pub fn byte(mut self, v: u8) -> Self {
        self.packet.fields.push(PacketField::Byte(v));
        self
    }

    pub fn short(mut self, v: u16) -> Self {
        self.packet.fields.push(PacketField::Short(v));
        self
    }

    pub fn int(mut self, v: u32) -> Self {
        self.packet.fields.push(PacketField::Int(v));
        self
    }

    pub fn long(mut self, v: u64) -> Self {
        self.packet.fields.push(PacketField::Long(v));
        self
    }

    pub fn float(mut self, v: f32) -> Self {
        self.packet.fields.push(PacketField::Float(v));
        self
    }

    pub fn string(mut self, v: impl Into<String>) -> Self {
        self.packet.fields.push(PacketField::String(v.into()));
        self
    }

    pub fn bin(mut self, v: impl Into<Vec<u8>>) -> Self {
        self.packet.fields.push(PacketField::Bin(v.into()));
        self
    }

    pub fn build(self) -> Packet {
        self.packet
    }
}

/// Sequential, read-only view over a packet's fields.
#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    packet: &'a Packet,
    pos: usize,
}

macro_rules! read_field {
    ($name:ident, $variant:ident, $ty:ty) => {
        pub fn $name(&mut self) -> Result<$ty, PacketError> {
            match self.next_field()? {
                PacketField::$variant(v) => Ok(v.clone()),
                other => Err(self.mismatch(FieldKind::$variant, other.kind())),
            }
        }
    };
}

impl<'a> PacketReader<'a> {
    read_field!(get_byte, Byte, u8);
    read_field!(get_short, Short, u16);
    read_field!(get_int, Int, u32);
    read_field!(get_long, Long, u64);
    read_field!(get_float, Float, f32);
    read_field!(get_string, String, String);
    read_field!(get_bin, Bin, Vec<u8>);

    /// Type of the next field, if any.
    pub fn peek(&self) -> Option<FieldKind> {
        self.packet.fields.get(self.pos).map(PacketField::kind)
    }

    /// Number of fields not read yet.
    pub fn remaining(&self) -> usize {
        self.packet.fields.len().saturating_sub(self.pos)
    }

    fn next_field(&mut self) -> Result<&'a PacketField, PacketError> {
        let packet = self.packet;
        let field = packet
            .fields
            .get(self.pos)
            .ok_or(PacketError::EndOfPacket {
                op: packet.op,
                index: self.pos,
            })?;
        self.pos += 1;
        Ok(field)
    }

    // Called after `next_field` advanced, so the offending index is pos - 1.
    fn mismatch(&self, expected: FieldKind, found: FieldKind) -> PacketError {
        PacketError::TypeMismatch {
            op: self.packet.op,
            index: self.pos - 1,
            expected,
            found,
        }
    }
}
