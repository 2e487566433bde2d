// container and array: the two composite workhorses.

use serde_json::Value as Json;

use crate::cursor::ByteCursor;
use crate::error::{DecodeError, SchemaError};
use crate::handler::{BuildItemFn, HandlerKind, HandlerRef, TypeHandler};
use crate::ident::ResourceLocation;
use crate::params::TypeParams;
use crate::record::{join_path, PacketRecord};
use crate::types::CountSpec;
use crate::value::Value;

enum ContainerEntry {
    Named { name: String, handler: HandlerRef },
    /// Decoded under a synthetic record name; if the value is itself a map
    /// its fields are flattened into the parent container.
    Anonymous(HandlerRef),
}

/// Ordered sequence of named (or anonymous) fields. Fields are decoded in
/// declaration order and each is written into the record before the next
/// one starts, so later fields can reference earlier ones.
pub struct ContainerType {
    id: ResourceLocation,
    entries: Vec<ContainerEntry>,
}

impl std::fmt::Debug for ContainerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerType").field("id", &self.id).finish_non_exhaustive()
    }
}

impl ContainerType {
    pub fn new(
        id: ResourceLocation,
        fields: &[Json],
        build_item: &mut BuildItemFn<'_>,
    ) -> Result<Self, SchemaError> {
        let mut entries = Vec::with_capacity(fields.len());
        for field in fields {
            let obj = field.as_object().ok_or_else(|| SchemaError::Malformed {
                type_id: id.clone(),
                detail: format!("container field must be an object, got {field}"),
            })?;
            let def = obj.get("type").ok_or_else(|| SchemaError::Malformed {
                type_id: id.clone(),
                detail: "container field has no type".into(),
            })?;
            let handler = build_item(def)?;

            match obj.get("name").and_then(Json::as_str) {
                Some(name) if !name.is_empty() => entries.push(ContainerEntry::Named {
                    name: name.to_string(),
                    handler,
                }),
                Some(_) => {
                    return Err(SchemaError::UnnamedContainerEntry {
                        type_id: id.clone(),
                    })
                }
                None => {
                    if obj.get("anon").and_then(Json::as_bool) == Some(true) {
                        entries.push(ContainerEntry::Anonymous(handler));
                    } else {
                        return Err(SchemaError::UnnamedContainerEntry {
                            type_id: id.clone(),
                        });
                    }
                }
            }
        }
        Ok(ContainerType { id, entries })
    }
}

impl TypeHandler for ContainerType {
    fn type_id(&self) -> &ResourceLocation {
        &self.id
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Container
    }

    fn read_typed(
        &self,
        record: &mut PacketRecord,
        path: &str,
        cursor: &mut ByteCursor,
    ) -> Result<Value, DecodeError> {
        let mut fields: Vec<(String, Value)> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            match entry {
                ContainerEntry::Named { name, handler } => {
                    let child_path = join_path(path, name);
                    let value = handler.read_value(record, &child_path, cursor)?;
                    record.write_entry(path, name, handler.type_id().clone(), value.clone());
                    fields.push((name.clone(), value));
                }
                // Anonymous entries share this container's scope, so their
                // inner fields land beside the named ones.
                ContainerEntry::Anonymous(handler) => {
                    let value = handler.read_value(record, path, cursor)?;
                    let synthetic = record.next_anonymous_name(path);
                    record.write_entry(path, &synthetic, handler.type_id().clone(), value.clone());
                    match value {
                        Value::Map(inner) => fields.extend(inner),
                        Value::Absent => {}
                        other => fields.push((synthetic, other)),
                    }
                }
            }
        }
        Ok(Value::Map(fields))
    }
}

/// Homogeneous element sequence with a configurable count source.
pub struct ArrayType {
    id: ResourceLocation,
    params: TypeParams,
    config: Option<ArrayConfig>,
}

impl std::fmt::Debug for ArrayType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayType")
            .field("id", &self.id)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

struct ArrayConfig {
    count: CountSpec,
    element: HandlerRef,
}

impl ArrayType {
    pub const PARAMETERS: &'static [&'static str] = &["countType", "count", "type"];

    pub fn new(
        id: ResourceLocation,
        supplied: &serde_json::Map<String, Json>,
        template: Option<&TypeParams>,
        build_item: &mut BuildItemFn<'_>,
    ) -> Result<Self, SchemaError> {
        let params = TypeParams::inherit(template, Self::PARAMETERS, supplied);
        let config = if params.is_fully_resolved() {
            let count = CountSpec::from_params(&id, &params, false, build_item)?;
            let element_def = params.get("type").ok_or_else(|| SchemaError::Malformed {
                type_id: id.clone(),
                detail: "array needs an element type".into(),
            })?;
            Some(ArrayConfig {
                count,
                element: build_item(element_def)?,
            })
        } else {
            None
        };
        Ok(ArrayType { id, params, config })
    }
}

impl TypeHandler for ArrayType {
    fn type_id(&self) -> &ResourceLocation {
        &self.id
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Array
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

        let count = config.count.resolve(record, path, cursor)?;
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
