// Named Binary Tag decoding: a self-describing, tag-prefixed binary tree.

use crate::cursor::ByteCursor;
use crate::error::DecodeError;
use crate::value::Value;

const TAG_END: u8 = 0;
const TAG_BYTE: u8 = 1;
const TAG_SHORT: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_LONG: u8 = 4;
const TAG_FLOAT: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_BYTE_ARRAY: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_LIST: u8 = 9;
const TAG_COMPOUND: u8 = 10;
const TAG_INT_ARRAY: u8 = 11;
const TAG_LONG_ARRAY: u8 = 12;

/// Decode one NBT blob off the cursor.
///
/// A leading TAG_End byte is the canonical "no data" marker and decodes to
/// `Absent`. With `anonymous_root` the root compound carries no name and a
/// bare TAG_String root is allowed; otherwise the root must be a named
/// compound, and a non-empty root name is kept under the empty key.
pub fn read_nbt(cursor: &mut ByteCursor, anonymous_root: bool) -> Result<Value, DecodeError> {
    let root_tag = cursor.read_u8()?;
    if root_tag == TAG_END {
        return Ok(Value::Absent);
    }

    if anonymous_root {
        match root_tag {
            TAG_COMPOUND => read_compound_body(cursor),
            TAG_STRING => {
                let s = read_name(cursor)?;
                Ok(Value::Map(vec![(String::new(), Value::Str(s))]))
            }
            other => Err(DecodeError::BadNbtRoot(other)),
        }
    } else {
        if root_tag != TAG_COMPOUND {
            return Err(DecodeError::BadNbtRoot(root_tag));
        }
        let root_name = read_name(cursor)?;
        let mut value = read_compound_body(cursor)?;
        if !root_name.is_empty() {
            if let Value::Map(entries) = &mut value {
                entries.insert(0, (String::new(), Value::Str(root_name)));
            }
        }
        Ok(value)
    }
}

fn read_name(cursor: &mut ByteCursor) -> Result<String, DecodeError> {
    let len = cursor.read_u16()? as usize;
    cursor.read_pstring(len)
}

fn read_compound_body(cursor: &mut ByteCursor) -> Result<Value, DecodeError> {
    let mut entries: Vec<(String, Value)> = Vec::new();
    loop {
        let tag = cursor.read_u8()?;
        if tag == TAG_END {
            return Ok(Value::Map(entries));
        }
        let name = read_name(cursor)?;
        let value = read_payload(cursor, tag)?;
        // Later tags with the same name win.
        if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
        } else {
            entries.push((name, value));
        }
    }
}

fn read_payload(cursor: &mut ByteCursor, tag: u8) -> Result<Value, DecodeError> {
    match tag {
        TAG_BYTE => Ok(Value::I8(cursor.read_i8()?)),
        TAG_SHORT => Ok(Value::I16(cursor.read_i16()?)),
        TAG_INT => Ok(Value::I32(cursor.read_i32()?)),
        TAG_LONG => Ok(Value::I64(cursor.read_i64()?)),
        TAG_FLOAT => Ok(Value::F32(cursor.read_f32()?)),
        TAG_DOUBLE => Ok(Value::F64(cursor.read_f64()?)),
        TAG_BYTE_ARRAY => {
            let len = read_len(cursor)?;
            Ok(Value::Buffer(cursor.read_bytes(len)?))
        }
        TAG_STRING => Ok(Value::Str(read_name(cursor)?)),
        TAG_LIST => {
            let item_tag = cursor.read_u8()?;
            let len = read_len(cursor)?;
            let mut items = Vec::with_capacity(len.min(1024));
            for _ in 0..len {
                items.push(read_payload(cursor, item_tag)?);
            }
            Ok(Value::Array(items))
        }
        TAG_COMPOUND => read_compound_body(cursor),
        TAG_INT_ARRAY => {
            let len = read_len(cursor)?;
            let mut items = Vec::with_capacity(len.min(1024));
            for _ in 0..len {
                items.push(Value::I32(cursor.read_i32()?));
            }
            Ok(Value::Array(items))
        }
        TAG_LONG_ARRAY => {
            let len = read_len(cursor)?;
            let mut items = Vec::with_capacity(len.min(1024));
            for _ in 0..len {
                items.push(Value::I64(cursor.read_i64()?));
            }
            Ok(Value::Array(items))
        }
        other => Err(DecodeError::UnknownNbtTag(other)),
    }
}

fn read_len(cursor: &mut ByteCursor) -> Result<usize, DecodeError> {
    let len = cursor.read_i32()?;
    usize::try_from(len).map_err(|_| DecodeError::BadCount(len as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str, tag: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![tag];
        out.extend_from_slice(&(name.len() as u16).to_be_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn leading_end_tag_is_absent() {
        let mut cur = ByteCursor::new(vec![0u8]);
        assert_eq!(read_nbt(&mut cur, true).unwrap(), Value::Absent);
        let mut cur = ByteCursor::new(vec![0u8]);
        assert_eq!(read_nbt(&mut cur, false).unwrap(), Value::Absent);
    }

    #[test]
    fn anonymous_compound_round() {
        // compound { health: byte 20, level: int 3 }
        let mut blob = vec![TAG_COMPOUND];
        blob.extend(named("health", TAG_BYTE, &[20]));
        blob.extend(named("level", TAG_INT, &3i32.to_be_bytes()));
        blob.push(TAG_END);
        blob.push(0xEE); // trailing payload must survive

        let mut cur = ByteCursor::new(blob);
        let value = read_nbt(&mut cur, true).unwrap();
        assert_eq!(value.get("health"), Some(&Value::I8(20)));
        assert_eq!(value.get("level"), Some(&Value::I32(3)));
        assert_eq!(cur.remaining(), 1);
    }

    #[test]
    fn named_root_keeps_root_name_under_empty_key() {
        let mut blob = vec![TAG_COMPOUND];
        blob.extend_from_slice(&4u16.to_be_bytes());
        blob.extend_from_slice(b"root");
        blob.extend(named("x", TAG_SHORT, &7i16.to_be_bytes()));
        blob.push(TAG_END);

        let mut cur = ByteCursor::new(blob);
        let value = read_nbt(&mut cur, false).unwrap();
        assert_eq!(value.get(""), Some(&Value::Str("root".into())));
        assert_eq!(value.get("x"), Some(&Value::I16(7)));
    }

    #[test]
    fn anonymous_string_root() {
        let mut blob = vec![TAG_STRING];
        blob.extend_from_slice(&2u16.to_be_bytes());
        blob.extend_from_slice(b"hi");

        let mut cur = ByteCursor::new(blob);
        let value = read_nbt(&mut cur, true).unwrap();
        assert_eq!(value.get(""), Some(&Value::Str("hi".into())));
    }

    #[test]
    fn lists_and_arrays() {
        let mut payload = vec![TAG_INT];
        payload.extend_from_slice(&2i32.to_be_bytes());
        payload.extend_from_slice(&1i32.to_be_bytes());
        payload.extend_from_slice(&2i32.to_be_bytes());

        let mut blob = vec![TAG_COMPOUND];
        blob.extend(named("ids", TAG_LIST, &payload));
        blob.push(TAG_END);

        let mut cur = ByteCursor::new(blob);
        let value = read_nbt(&mut cur, true).unwrap();
        assert_eq!(
            value.get("ids"),
            Some(&Value::Array(vec![Value::I32(1), Value::I32(2)]))
        );
    }

    #[test]
    fn bad_root_tag_is_fatal() {
        let mut cur = ByteCursor::new(vec![TAG_BYTE, 0, 0]);
        assert!(matches!(
            read_nbt(&mut cur, false),
            Err(DecodeError::BadNbtRoot(TAG_BYTE))
        ));
    }
}
