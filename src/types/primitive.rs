// bool and void.

use crate::cursor::ByteCursor;
use crate::error::DecodeError;
use crate::handler::{HandlerKind, TypeHandler};
use crate::ident::ResourceLocation;
use crate::record::PacketRecord;
use crate::value::Value;

/// Single byte, zero is false and anything else is true.
pub struct BoolType {
    id: ResourceLocation,
}

impl BoolType {
    pub fn new(id: ResourceLocation) -> Self {
        BoolType { id }
    }
}

impl TypeHandler for BoolType {
    fn type_id(&self) -> &ResourceLocation {
        &self.id
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Primitive
    }

    fn read_typed(
        &self,
        _record: &mut PacketRecord,
        _path: &str,
        cursor: &mut ByteCursor,
    ) -> Result<Value, DecodeError> {
        Ok(Value::Bool(cursor.read_bool()?))
    }
}

/// Consumes nothing and yields nothing. Schemas use it as the empty arm of
/// a switch.
pub struct VoidType {
    id: ResourceLocation,
}

impl VoidType {
    pub fn new(id: ResourceLocation) -> Self {
        VoidType { id }
    }
}

impl TypeHandler for VoidType {
    fn type_id(&self) -> &ResourceLocation {
        &self.id
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Primitive
    }

    fn read_typed(
        &self,
        _record: &mut PacketRecord,
        _path: &str,
        _cursor: &mut ByteCursor,
    ) -> Result<Value, DecodeError> {
        Ok(Value::Absent)
    }
}
