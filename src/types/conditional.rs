// option and switch: presence and branching driven by decoded data.

use serde_json::Value as Json;
use tracing::warn;

use crate::cursor::ByteCursor;
use crate::error::{DecodeError, SchemaError};
use crate::handler::{BuildItemFn, HandlerKind, HandlerRef, TypeHandler};
use crate::ident::ResourceLocation;
use crate::params::TypeParams;
use crate::record::PacketRecord;
use crate::value::Value;

/// A bool prefix deciding whether the wrapped value follows.
pub struct OptionType {
    id: ResourceLocation,
    wrapped: HandlerRef,
}

impl OptionType {
    pub fn new(
        id: ResourceLocation,
        wrapped_def: &Json,
        build_item: &mut BuildItemFn<'_>,
    ) -> Result<Self, SchemaError> {
        Ok(OptionType {
            id,
            wrapped: build_item(wrapped_def)?,
        })
    }
}

impl TypeHandler for OptionType {
    fn type_id(&self) -> &ResourceLocation {
        &self.id
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Option
    }

    fn read_typed(
        &self,
        record: &mut PacketRecord,
        path: &str,
        cursor: &mut ByteCursor,
    ) -> Result<Value, DecodeError> {
        if cursor.read_bool()? {
            self.wrapped.read_value(record, path, cursor)
        } else {
            Ok(Value::Absent)
        }
    }
}

struct SwitchConfig {
    compare_to: String,
    /// Keys are unique, so iteration order is irrelevant; lookups are
    /// linear, case sets are small.
    cases: Vec<(String, HandlerRef)>,
    default: Option<HandlerRef>,
}

/// Branch on the string form of a previously decoded field. An unmatched
/// key with no default arm yields no value rather than failing the packet,
/// since schemas routinely enumerate only the cases they care about.
pub struct SwitchType {
    id: ResourceLocation,
    params: TypeParams,
    config: Option<SwitchConfig>,
}

impl SwitchType {
    pub const PARAMETERS: &'static [&'static str] = &["compareTo", "fields", "default"];

    pub fn new(
        id: ResourceLocation,
        supplied: &serde_json::Map<String, Json>,
        template: Option<&TypeParams>,
        build_item: &mut BuildItemFn<'_>,
    ) -> Result<Self, SchemaError> {
        let params = TypeParams::inherit(template, Self::PARAMETERS, supplied);
        let config = if params.is_fully_resolved() {
            Some(Self::configure(&id, &params, build_item)?)
        } else {
            None
        };
        Ok(SwitchType { id, params, config })
    }

    fn configure(
        id: &ResourceLocation,
        params: &TypeParams,
        build_item: &mut BuildItemFn<'_>,
    ) -> Result<SwitchConfig, SchemaError> {
        let compare_to = params
            .get("compareTo")
            .and_then(Json::as_str)
            .ok_or_else(|| SchemaError::Malformed {
                type_id: id.clone(),
                detail: "switch needs a compareTo field name".into(),
            })?
            .to_string();

        let fields = params
            .get("fields")
            .and_then(Json::as_object)
            .ok_or_else(|| SchemaError::Malformed {
                type_id: id.clone(),
                detail: "switch needs a fields object".into(),
            })?;

        let mut cases = Vec::with_capacity(fields.len());
        for (key, def) in fields {
            cases.push((key.clone(), build_item(def)?));
        }

        let default = match params.get("default") {
            Some(def) => Some(build_item(def)?),
            None => None,
        };

        Ok(SwitchConfig {
            compare_to,
            cases,
            default,
        })
    }
}

impl TypeHandler for SwitchType {
    fn type_id(&self) -> &ResourceLocation {
        &self.id
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Switch
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

        let compared = record.get_reference(path, &config.compare_to)?;
        let key = compared.switch_key();

        let arm = key
            .as_deref()
            .and_then(|k| {
                config
                    .cases
                    .iter()
                    .find(|(case, _)| case == k)
                    .map(|(_, handler)| handler)
            })
            .or(config.default.as_ref());

        match arm {
            Some(handler) => handler.read_value(record, path, cursor),
            None => {
                warn!(
                    type_id = %self.id,
                    path,
                    key = key.as_deref().unwrap_or("<non-scalar>"),
                    "switch matched no case and has no default, skipping"
                );
                Ok(Value::Absent)
            }
        }
    }
}
