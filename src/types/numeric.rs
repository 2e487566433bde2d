// Fixed-width and variable-length numeric types.

use crate::cursor::ByteCursor;
use crate::error::DecodeError;
use crate::handler::{HandlerKind, TypeHandler};
use crate::ident::ResourceLocation;
use crate::record::PacketRecord;
use crate::value::Value;

/// Every numeric wire encoding the engine knows. Fixed-width kinds are
/// big-endian; the var kinds are LEB128.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    VarInt,
    VarLong,
}

/// Leaf handler covering the whole numeric family. One instance per kind
/// lives in the registry; nothing about a read depends on the record.
pub struct NumericType {
    id: ResourceLocation,
    kind: NumericKind,
}

impl NumericType {
    pub fn new(id: ResourceLocation, kind: NumericKind) -> Self {
        NumericType { id, kind }
    }
}

impl TypeHandler for NumericType {
    fn type_id(&self) -> &ResourceLocation {
        &self.id
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Numeric
    }

    fn read_typed(
        &self,
        _record: &mut PacketRecord,
        _path: &str,
        cursor: &mut ByteCursor,
    ) -> Result<Value, DecodeError> {
        Ok(match self.kind {
            NumericKind::I8 => Value::I8(cursor.read_i8()?),
            NumericKind::U8 => Value::U8(cursor.read_u8()?),
            NumericKind::I16 => Value::I16(cursor.read_i16()?),
            NumericKind::U16 => Value::U16(cursor.read_u16()?),
            NumericKind::I32 => Value::I32(cursor.read_i32()?),
            NumericKind::U32 => Value::U32(cursor.read_u32()?),
            NumericKind::I64 => Value::I64(cursor.read_i64()?),
            NumericKind::U64 => Value::U64(cursor.read_u64()?),
            NumericKind::F32 => Value::F32(cursor.read_f32()?),
            NumericKind::F64 => Value::F64(cursor.read_f64()?),
            NumericKind::VarInt => Value::I32(cursor.read_varint()?),
            NumericKind::VarLong => Value::I64(cursor.read_varlong()?),
        })
    }
}
