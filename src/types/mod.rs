// Native type implementations.

pub mod conditional;
pub mod numeric;
pub mod primitive;
pub mod structure;
pub mod util;
pub mod xtended;

use serde_json::Value as Json;

use crate::cursor::ByteCursor;
use crate::error::{DecodeError, SchemaError};
use crate::handler::{BuildItemFn, HandlerRef};
use crate::ident::ResourceLocation;
use crate::params::TypeParams;
use crate::record::PacketRecord;
use crate::value::Value;

/// How a sized type (`array`, `buffer`, `pstring`, ...) learns its element
/// or byte count. Exactly one strategy is configured per handler.
#[derive(Clone)]
pub(crate) enum CountSpec {
    /// Read a count value of this type off the stream first.
    Prefixed(HandlerRef),
    /// A constant from the schema.
    Literal(usize),
    /// The value of a previously decoded field, resolved through the record.
    FieldRef(String),
    /// Whatever is left in the cursor, minus a fixed remainder (buffers only).
    Rest { remainder: usize },
}

impl CountSpec {
    /// Extract the sizing strategy from `countType` / `count` (/ `rest`)
    /// parameters. Ambiguous or absent sizing is a construction-time error.
    pub(crate) fn from_params(
        type_id: &ResourceLocation,
        params: &TypeParams,
        allow_rest: bool,
        build_item: &mut BuildItemFn<'_>,
    ) -> Result<CountSpec, SchemaError> {
        let mut found: Vec<CountSpec> = Vec::new();

        if let Some(count_type) = params.get("countType") {
            found.push(CountSpec::Prefixed(build_item(count_type)?));
        }
        if let Some(count) = params.get("count") {
            match count {
                Json::Number(n) => {
                    let literal = n
                        .as_u64()
                        .and_then(|v| usize::try_from(v).ok())
                        .ok_or_else(|| SchemaError::Malformed {
                            type_id: type_id.clone(),
                            detail: format!("literal count {n} is not a valid length"),
                        })?;
                    found.push(CountSpec::Literal(literal));
                }
                Json::String(field) => found.push(CountSpec::FieldRef(field.clone())),
                other => {
                    return Err(SchemaError::Malformed {
                        type_id: type_id.clone(),
                        detail: format!("count must be a number or field name, got {other}"),
                    })
                }
            }
        }
        if allow_rest {
            if let Some(rest) = params.get("rest") {
                let remainder = match rest {
                    Json::Bool(true) => 0,
                    Json::Number(n) => {
                        n.as_u64()
                            .and_then(|v| usize::try_from(v).ok())
                            .ok_or_else(|| SchemaError::Malformed {
                                type_id: type_id.clone(),
                                detail: format!("rest remainder {n} is not a valid length"),
                            })?
                    }
                    Json::Bool(false) => {
                        return Err(SchemaError::Malformed {
                            type_id: type_id.clone(),
                            detail: "rest: false is meaningless".into(),
                        })
                    }
                    other => {
                        return Err(SchemaError::Malformed {
                            type_id: type_id.clone(),
                            detail: format!("rest must be true or a remainder, got {other}"),
                        })
                    }
                };
                found.push(CountSpec::Rest { remainder });
            }
        }

        let detail = if allow_rest {
            "countType / count / rest"
        } else {
            "countType / count"
        };
        match found.len() {
            1 => Ok(found.remove(0)),
            _ => Err(SchemaError::AmbiguousCount {
                type_id: type_id.clone(),
                detail,
            }),
        }
    }

    /// Resolve the count for one read, as a raw signed value so callers can
    /// apply offsets before range-checking.
    pub(crate) fn resolve_raw(
        &self,
        record: &mut PacketRecord,
        path: &str,
        cursor: &mut ByteCursor,
    ) -> Result<i64, DecodeError> {
        match self {
            CountSpec::Prefixed(handler) => {
                let value = handler.read_value(record, path, cursor)?;
                value.as_int().ok_or(DecodeError::NonNumericReference {
                    path: path.to_string(),
                    field: "<count prefix>".to_string(),
                    found: value.kind(),
                })
            }
            CountSpec::Literal(n) => Ok(*n as i64),
            CountSpec::FieldRef(field) => {
                let value = record.get_reference(path, field)?;
                value.as_int().ok_or_else(|| DecodeError::NonNumericReference {
                    path: path.to_string(),
                    field: field.clone(),
                    found: value.kind(),
                })
            }
            CountSpec::Rest { remainder } => {
                let remaining = cursor.remaining() as i64;
                Ok(remaining - *remainder as i64)
            }
        }
    }

    /// Resolve the count as a length, rejecting negative or oversized values.
    pub(crate) fn resolve(
        &self,
        record: &mut PacketRecord,
        path: &str,
        cursor: &mut ByteCursor,
    ) -> Result<usize, DecodeError> {
        let raw = self.resolve_raw(record, path, cursor)?;
        checked_len(raw)
    }
}

/// A resolved count as a usable length.
pub(crate) fn checked_len(raw: i64) -> Result<usize, DecodeError> {
    usize::try_from(raw).map_err(|_| DecodeError::BadCount(raw))
}

/// Shared loop body for element sequences: decode one element at
/// `path[index]`, recording scalars but embedding sub-containers whole.
pub(crate) fn read_element(
    element: &HandlerRef,
    record: &mut PacketRecord,
    path: &str,
    index: usize,
    cursor: &mut ByteCursor,
) -> Result<Value, DecodeError> {
    let child_path = crate::record::element_path(path, index);
    let value = element.read_value(record, &child_path, cursor)?;
    if !matches!(value, Value::Map(_)) {
        record.write_element(path, index, element.type_id().clone(), value.clone());
    }
    Ok(value)
}
