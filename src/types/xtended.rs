// Extension types beyond the core protodef set: UUID, nbt, restBuffer and
// the loop-style arrays.

use serde_json::Value as Json;

use crate::cursor::ByteCursor;
use crate::error::{DecodeError, SchemaError};
use crate::handler::{BuildItemFn, HandlerKind, HandlerRef, TypeHandler};
use crate::ident::ResourceLocation;
use crate::nbt;
use crate::params::TypeParams;
use crate::record::PacketRecord;
use crate::types::{checked_len, CountSpec};
use crate::value::Value;

/// 16 bytes, big-endian.
pub struct UuidType {
    id: ResourceLocation,
}

impl UuidType {
    pub fn new(id: ResourceLocation) -> Self {
        UuidType { id }
    }
}

impl TypeHandler for UuidType {
    fn type_id(&self) -> &ResourceLocation {
        &self.id
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Uuid
    }

    fn read_typed(
        &self,
        _record: &mut PacketRecord,
        _path: &str,
        cursor: &mut ByteCursor,
    ) -> Result<Value, DecodeError> {
        Ok(Value::Uuid(cursor.read_uuid()?))
    }
}

/// Standard NBT blob. The anonymous variants accept a nameless (or string)
/// root, which is how network NBT has been written since 1.20.2.
pub struct NbtType {
    id: ResourceLocation,
    anonymous_root: bool,
}

impl NbtType {
    pub fn new(id: ResourceLocation, anonymous_root: bool) -> Self {
        NbtType { id, anonymous_root }
    }
}

impl TypeHandler for NbtType {
    fn type_id(&self) -> &ResourceLocation {
        &self.id
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Nbt
    }

    fn read_typed(
        &self,
        _record: &mut PacketRecord,
        _path: &str,
        cursor: &mut ByteCursor,
    ) -> Result<Value, DecodeError> {
        nbt::read_nbt(cursor, self.anonymous_root)
    }
}

/// Everything left in the packet.
pub struct RestBufferType {
    id: ResourceLocation,
}

impl RestBufferType {
    pub fn new(id: ResourceLocation) -> Self {
        RestBufferType { id }
    }
}

impl TypeHandler for RestBufferType {
    fn type_id(&self) -> &ResourceLocation {
        &self.id
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::RestBuffer
    }

    fn read_typed(
        &self,
        _record: &mut PacketRecord,
        _path: &str,
        cursor: &mut ByteCursor,
    ) -> Result<Value, DecodeError> {
        Ok(Value::Buffer(cursor.read_rest()))
    }
}

/// Array sized by a count value plus a constant offset, for protocols that
/// encode `len - k` on the wire.
pub struct ArrayWithLengthOffsetType {
    id: ResourceLocation,
    params: TypeParams,
    config: Option<OffsetArrayConfig>,
}

struct OffsetArrayConfig {
    count: CountSpec,
    offset: i64,
    element: HandlerRef,
}

impl ArrayWithLengthOffsetType {
    pub const PARAMETERS: &'static [&'static str] =
        &["countType", "count", "type", "lengthOffset"];

    pub fn new(
        id: ResourceLocation,
        supplied: &serde_json::Map<String, Json>,
        template: Option<&TypeParams>,
        build_item: &mut BuildItemFn<'_>,
    ) -> Result<Self, SchemaError> {
        let params = TypeParams::inherit(template, Self::PARAMETERS, supplied);
        let config = if params.is_fully_resolved() {
            let count = CountSpec::from_params(&id, &params, false, build_item)?;
            let offset = params
                .get("lengthOffset")
                .and_then(Json::as_i64)
                .ok_or_else(|| SchemaError::Malformed {
                    type_id: id.clone(),
                    detail: "arrayWithLengthOffset needs an integer lengthOffset".into(),
                })?;
            let element_def = params.get("type").ok_or_else(|| SchemaError::Malformed {
                type_id: id.clone(),
                detail: "arrayWithLengthOffset needs an element type".into(),
            })?;
            Some(OffsetArrayConfig {
                count,
                offset,
                element: build_item(element_def)?,
            })
        } else {
            None
        };
        Ok(ArrayWithLengthOffsetType { id, params, config })
    }
}

impl TypeHandler for ArrayWithLengthOffsetType {
    fn type_id(&self) -> &ResourceLocation {
        &self.id
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::ArrayWithLengthOffset
    }

    fn params(&self) -> Option<&TypeParams> {
        Some(&self.params)
    }

    fn read_typed(
        &self,
        record: &mut PacketRecord,
        path: &str,
        cursor: &mut ByteCursor,
    ) -> Result<Value, DecodeError> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| DecodeError::UnresolvedParameters {
                type_id: self.id.clone(),
                names: self.params.unresolved_names(),
            })?;

        let raw = config.count.resolve_raw(record, path, cursor)?;
        let count = checked_len(raw.saturating_add(config.offset))?;
        let mut items = Vec::with_capacity(count.min(4096));
        for index in 0..count {
            items.push(super::read_element(
                &config.element,
                record,
                path,
                index,
                cursor,
            )?);
        }
        Ok(Value::Array(items))
    }
}

/// Unbounded element loop terminated by a sentinel byte value. The sentinel
/// is consumed; a truncated stream without one fails when the cursor runs
/// dry.
pub struct EntityMetadataLoopType {
    id: ResourceLocation,
    params: TypeParams,
    config: Option<MetadataLoopConfig>,
}

struct MetadataLoopConfig {
    element: HandlerRef,
    end_val: u8,
}

impl EntityMetadataLoopType {
    pub const PARAMETERS: &'static [&'static str] = &["type", "endVal"];

    pub fn new(
        id: ResourceLocation,
        supplied: &serde_json::Map<String, Json>,
        template: Option<&TypeParams>,
        build_item: &mut BuildItemFn<'_>,
    ) -> Result<Self, SchemaError> {
        let params = TypeParams::inherit(template, Self::PARAMETERS, supplied);
        let config = if params.is_fully_resolved() {
            let end_val = params
                .get("endVal")
                .and_then(Json::as_u64)
                .and_then(|v| u8::try_from(v).ok())
                .ok_or_else(|| SchemaError::Malformed {
                    type_id: id.clone(),
                    detail: "entityMetadataLoop needs a byte-sized endVal".into(),
                })?;
            let element_def = params.get("type").ok_or_else(|| SchemaError::Malformed {
                type_id: id.clone(),
                detail: "entityMetadataLoop needs an element type".into(),
            })?;
            Some(MetadataLoopConfig {
                element: build_item(element_def)?,
                end_val,
            })
        } else {
            None
        };
        Ok(EntityMetadataLoopType { id, params, config })
    }
}

impl TypeHandler for EntityMetadataLoopType {
    fn type_id(&self) -> &ResourceLocation {
        &self.id
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::EntityMetadataLoop
    }

    fn params(&self) -> Option<&TypeParams> {
        Some(&self.params)
    }

    fn read_typed(
        &self,
        record: &mut PacketRecord,
        path: &str,
        cursor: &mut ByteCursor,
    ) -> Result<Value, DecodeError> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| DecodeError::UnresolvedParameters {
                type_id: self.id.clone(),
                names: self.params.unresolved_names(),
            })?;

        let mut items = Vec::new();
        loop {
            if cursor.peek_u8()? == config.end_val {
                cursor.read_u8()?;
                return Ok(Value::Array(items));
            }
            let index = items.len();
            items.push(super::read_element(
                &config.element,
                record,
                path,
                index,
                cursor,
            )?);
        }
    }
}

/// Element loop where each entry's leading byte has its top bit set; the
/// first byte without it stays in the stream and ends the array.
pub struct TopBitSetTerminatedArrayType {
    id: ResourceLocation,
    params: TypeParams,
    element: Option<HandlerRef>,
}

impl TopBitSetTerminatedArrayType {
    pub const PARAMETERS: &'static [&'static str] = &["type"];

    pub fn new(
        id: ResourceLocation,
        supplied: &serde_json::Map<String, Json>,
        template: Option<&TypeParams>,
        build_item: &mut BuildItemFn<'_>,
    ) -> Result<Self, SchemaError> {
        let params = TypeParams::inherit(template, Self::PARAMETERS, supplied);
        let element = if params.is_fully_resolved() {
            let element_def = params.get("type").ok_or_else(|| SchemaError::Malformed {
                type_id: id.clone(),
                detail: "topBitSetTerminatedArray needs an element type".into(),
            })?;
            Some(build_item(element_def)?)
        } else {
            None
        };
        Ok(TopBitSetTerminatedArrayType {
            id,
            params,
            element,
        })
    }
}

impl TypeHandler for TopBitSetTerminatedArrayType {
    fn type_id(&self) -> &ResourceLocation {
        &self.id
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::TopBitSetTerminatedArray
    }

    fn params(&self) -> Option<&TypeParams> {
        Some(&self.params)
    }

    fn read_typed(
        &self,
        record: &mut PacketRecord,
        path: &str,
        cursor: &mut ByteCursor,
    ) -> Result<Value, DecodeError> {
        let element = self
            .element
            .as_ref()
            .ok_or_else(|| DecodeError::UnresolvedParameters {
                type_id: self.id.clone(),
                names: self.params.unresolved_names(),
            })?;

        let mut items = Vec::new();
        while !cursor.is_empty() && cursor.peek_u8()? & 0x80 != 0 {
            let index = items.len();
            items.push(super::read_element(element, record, path, index, cursor)?);
        }
        Ok(Value::Array(items))
    }
}
