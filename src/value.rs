// The generic decoded value tree handed back to callers.

use bytes::Bytes;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use uuid::Uuid;

/// One decoded field value.
///
/// Containers decode to ordered string-keyed maps, arrays to ordered
/// sequences, leaves to native scalars. `Absent` is distinct from every
/// valid decoded value; it is produced by `void`, by `option` with a false
/// prefix, by an empty NBT blob, and by the soft-failure paths of
/// `switch`/`mapper`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Absent,
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Uuid(Uuid),
    Buffer(Bytes),
    Array(Vec<Value>),
    /// Insertion-ordered map; field order is semantically load-bearing.
    Map(Vec<(String, Value)>),
}

impl Value {
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// The value as a signed 64-bit integer, if it holds any integer kind.
    /// Used to resolve counts and to normalize mapper/switch keys.
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Value::I8(v) => Some(v as i64),
            Value::U8(v) => Some(v as i64),
            Value::I16(v) => Some(v as i64),
            Value::U16(v) => Some(v as i64),
            Value::I32(v) => Some(v as i64),
            Value::U32(v) => Some(v as i64),
            Value::I64(v) => Some(v),
            Value::U64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Short kind name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Absent => "absent",
            Value::Bool(_) => "bool",
            Value::I8(_) => "i8",
            Value::U8(_) => "u8",
            Value::I16(_) => "i16",
            Value::U16(_) => "u16",
            Value::I32(_) => "i32",
            Value::U32(_) => "u32",
            Value::I64(_) => "i64",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Str(_) => "string",
            Value::Uuid(_) => "uuid",
            Value::Buffer(_) => "buffer",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }

    /// Stringified form used as a `switch` case key: booleans as
    /// `true`/`false`, integers in decimal, strings verbatim.
    pub fn switch_key(&self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(b.to_string()),
            Value::Str(s) => Some(s.clone()),
            _ => self.as_int().map(|i| i.to_string()),
        }
    }

    /// Map lookup preserving order; `None` for non-map values.
    pub fn get(&self, field: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == field).map(|(_, v)| v),
            _ => None,
        }
    }
}

fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

// Serialized for the packet-inspector dump: maps keep field order, buffers
// render as hex strings, UUIDs as hyphenated strings, Absent as null.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Absent => serializer.serialize_none(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::I8(v) => serializer.serialize_i8(*v),
            Value::U8(v) => serializer.serialize_u8(*v),
            Value::I16(v) => serializer.serialize_i16(*v),
            Value::U16(v) => serializer.serialize_u16(*v),
            Value::I32(v) => serializer.serialize_i32(*v),
            Value::U32(v) => serializer.serialize_u32(*v),
            Value::I64(v) => serializer.serialize_i64(*v),
            Value::U64(v) => serializer.serialize_u64(*v),
            Value::F32(v) => serializer.serialize_f32(*v),
            Value::F64(v) => serializer.serialize_f64(*v),
            Value::Str(v) => serializer.serialize_str(v),
            Value::Uuid(v) => serializer.serialize_str(&v.to_string()),
            Value::Buffer(v) => serializer.serialize_str(&hex_string(v)),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_int_covers_integer_kinds_only() {
        assert_eq!(Value::U8(3).as_int(), Some(3));
        assert_eq!(Value::I64(-1).as_int(), Some(-1));
        assert_eq!(Value::U64(u64::MAX).as_int(), None);
        assert_eq!(Value::Str("3".into()).as_int(), None);
        assert_eq!(Value::F32(3.0).as_int(), None);
    }

    #[test]
    fn switch_key_stringifies_scalars() {
        assert_eq!(Value::Bool(true).switch_key().as_deref(), Some("true"));
        assert_eq!(Value::I32(-7).switch_key().as_deref(), Some("-7"));
        assert_eq!(Value::Str("spawn".into()).switch_key().as_deref(), Some("spawn"));
        assert_eq!(Value::Absent.switch_key(), None);
    }

    #[test]
    fn json_dump_keeps_field_order_and_hexes_buffers() {
        let value = Value::Map(vec![
            ("zeta".into(), Value::I32(1)),
            ("alpha".into(), Value::Buffer(Bytes::from_static(&[0xde, 0xad]))),
            ("gone".into(), Value::Absent),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"zeta":1,"alpha":"0xdead","gone":null}"#);
    }
}
