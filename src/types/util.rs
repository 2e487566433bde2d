// buffer, pstring, bitfield and mapper.

use serde_json::Value as Json;
use tracing::warn;

use crate::cursor::ByteCursor;
use crate::error::{DecodeError, SchemaError};
use crate::handler::{BuildItemFn, HandlerKind, HandlerRef, TypeHandler};
use crate::ident::ResourceLocation;
use crate::params::TypeParams;
use crate::record::PacketRecord;
use crate::types::CountSpec;
use crate::value::Value;

/// Raw byte run, sized by prefix, literal, field reference or "the rest".
pub struct BufferType {
    id: ResourceLocation,
    params: TypeParams,
    count: Option<CountSpec>,
}

impl BufferType {
    pub const PARAMETERS: &'static [&'static str] = &["countType", "count", "rest"];

    pub fn new(
        id: ResourceLocation,
        supplied: &serde_json::Map<String, Json>,
        template: Option<&TypeParams>,
        build_item: &mut BuildItemFn<'_>,
    ) -> Result<Self, SchemaError> {
        let params = TypeParams::inherit(template, Self::PARAMETERS, supplied);
        let count = if params.is_fully_resolved() {
            Some(CountSpec::from_params(&id, &params, true, build_item)?)
        } else {
            None
        };
        Ok(BufferType { id, params, count })
    }
}

impl TypeHandler for BufferType {
    fn type_id(&self) -> &ResourceLocation {
        &self.id
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Buffer
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
        let count = self
            .count
            .as_ref()
            .ok_or_else(|| DecodeError::UnresolvedParameters {
                type_id: self.id.clone(),
                names: self.params.unresolved_names(),
            })?;
        let len = count.resolve(record, path, cursor)?;
        Ok(Value::Buffer(cursor.read_bytes(len)?))
    }
}

/// Length-prefixed UTF-8 string. Invalid sequences are replaced, not
/// rejected; string payloads come from untrusted peers.
pub struct PstringType {
    id: ResourceLocation,
    params: TypeParams,
    count: Option<CountSpec>,
}

impl PstringType {
    pub const PARAMETERS: &'static [&'static str] = &["countType", "count"];

    pub fn new(
        id: ResourceLocation,
        supplied: &serde_json::Map<String, Json>,
        template: Option<&TypeParams>,
        build_item: &mut BuildItemFn<'_>,
    ) -> Result<Self, SchemaError> {
        let params = TypeParams::inherit(template, Self::PARAMETERS, supplied);
        let count = if params.is_fully_resolved() {
            Some(CountSpec::from_params(&id, &params, false, build_item)?)
        } else {
            None
        };
        Ok(PstringType { id, params, count })
    }
}

impl TypeHandler for PstringType {
    fn type_id(&self) -> &ResourceLocation {
        &self.id
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Pstring
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
        let count = self
            .count
            .as_ref()
            .ok_or_else(|| DecodeError::UnresolvedParameters {
                type_id: self.id.clone(),
                names: self.params.unresolved_names(),
            })?;
        let len = count.resolve(record, path, cursor)?;
        Ok(Value::Str(cursor.read_pstring(len)?))
    }
}

#[derive(Debug)]
struct BitfieldEntry {
    name: String,
    size: u32,
    signed: bool,
}

/// Packed sub-byte integers. Extraction is MSB-first across the whole span;
/// the span must be byte-aligned in total.
#[derive(Debug)]
pub struct BitfieldType {
    id: ResourceLocation,
    entries: Vec<BitfieldEntry>,
    byte_len: usize,
}

impl BitfieldType {
    pub fn new(id: ResourceLocation, fields: &[Json]) -> Result<Self, SchemaError> {
        let mut entries = Vec::with_capacity(fields.len());
        let mut total_bits: u32 = 0;
        for field in fields {
            let obj = field.as_object().ok_or_else(|| SchemaError::Malformed {
                type_id: id.clone(),
                detail: format!("bitfield entry must be an object, got {field}"),
            })?;
            let name = obj
                .get("name")
                .and_then(Json::as_str)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| SchemaError::UnnamedContainerEntry {
                    type_id: id.clone(),
                })?;
            let size = obj
                .get("size")
                .and_then(Json::as_u64)
                .filter(|s| (1..=64).contains(s))
                .ok_or_else(|| SchemaError::Malformed {
                    type_id: id.clone(),
                    detail: format!("bitfield entry {name} needs a size between 1 and 64"),
                })? as u32;
            let signed = obj.get("signed").and_then(Json::as_bool).unwrap_or(false);
            total_bits += size;
            entries.push(BitfieldEntry {
                name: name.to_string(),
                size,
                signed,
            });
        }
        if total_bits == 0 || total_bits % 8 != 0 {
            return Err(SchemaError::MisalignedBitfield {
                type_id: id,
                total_bits,
            });
        }
        Ok(BitfieldType {
            id,
            entries,
            byte_len: (total_bits / 8) as usize,
        })
    }
}

impl TypeHandler for BitfieldType {
    fn type_id(&self) -> &ResourceLocation {
        &self.id
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Bitfield
    }

    fn read_typed(
        &self,
        record: &mut PacketRecord,
        path: &str,
        cursor: &mut ByteCursor,
    ) -> Result<Value, DecodeError> {
        let bytes = cursor.read_bytes(self.byte_len)?;
        let mut fields = Vec::with_capacity(self.entries.len());
        let mut bit_offset: usize = 0;

        for entry in &self.entries {
            let mut raw: u64 = 0;
            for _ in 0..entry.size {
                let byte = bytes[bit_offset / 8];
                let bit = (byte >> (7 - (bit_offset % 8))) & 1;
                raw = (raw << 1) | u64::from(bit);
                bit_offset += 1;
            }

            let value = if entry.signed {
                let raw = if entry.size < 64 && (raw >> (entry.size - 1)) & 1 == 1 {
                    raw | (!0u64 << entry.size)
                } else {
                    raw
                };
                Value::I64(raw as i64)
            } else {
                Value::U64(raw)
            };

            record.write_entry(path, &entry.name, self.id.clone(), value.clone());
            fields.push((entry.name.clone(), value));
        }

        Ok(Value::Map(fields))
    }
}

/// Decode an input value, then translate it through a key table into a
/// string label. Unmapped inputs log and yield no value.
pub struct MapperType {
    id: ResourceLocation,
    params: TypeParams,
    config: Option<MapperConfig>,
}

struct MapperConfig {
    input: HandlerRef,
    mappings: Vec<(String, String)>,
}

/// Mapping keys are written as decimal or 0x-prefixed hex in schemas.
fn parse_int_key(key: &str) -> Option<i64> {
    let key = key.trim();
    if let Some(hex) = key.strip_prefix("0x").or_else(|| key.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()
    } else {
        key.parse::<i64>().ok()
    }
}

impl MapperType {
    pub const PARAMETERS: &'static [&'static str] = &["type", "mappings"];

    pub fn new(
        id: ResourceLocation,
        supplied: &serde_json::Map<String, Json>,
        template: Option<&TypeParams>,
        build_item: &mut BuildItemFn<'_>,
    ) -> Result<Self, SchemaError> {
        let params = TypeParams::inherit(template, Self::PARAMETERS, supplied);
        let config = if params.is_fully_resolved() {
            let input_def = params.get("type").ok_or_else(|| SchemaError::Malformed {
                type_id: id.clone(),
                detail: "mapper needs an input type".into(),
            })?;
            let input = build_item(input_def)?;
            let mappings = params
                .get("mappings")
                .and_then(Json::as_object)
                .ok_or_else(|| SchemaError::Malformed {
                    type_id: id.clone(),
                    detail: "mapper needs a mappings object".into(),
                })?
                .iter()
                .map(|(key, label)| {
                    let label = label.as_str().ok_or_else(|| SchemaError::Malformed {
                        type_id: id.clone(),
                        detail: format!("mapping for {key} is not a string"),
                    })?;
                    Ok((key.clone(), label.to_string()))
                })
                .collect::<Result<Vec<_>, SchemaError>>()?;
            Some(MapperConfig { input, mappings })
        } else {
            None
        };
        Ok(MapperType { id, params, config })
    }
}

impl TypeHandler for MapperType {
    fn type_id(&self) -> &ResourceLocation {
        &self.id
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Mapper
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

        let input = config.input.read_value(record, path, cursor)?;

        let matched = if let Some(n) = input.as_int() {
            config
                .mappings
                .iter()
                .find(|(key, _)| parse_int_key(key) == Some(n))
        } else {
            let key = input.switch_key();
            key.as_deref()
                .and_then(|k| config.mappings.iter().find(|(key, _)| key == k))
        };

        match matched {
            Some((_, label)) => Ok(Value::Str(label.clone())),
            None => {
                warn!(
                    type_id = %self.id,
                    path,
                    input = %input.kind(),
                    "mapper input has no mapping, skipping"
                );
                Ok(Value::Absent)
            }
        }
    }
}
