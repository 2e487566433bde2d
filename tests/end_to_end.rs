// Full-pipeline checks: load a protocol document, decode real-ish packet
// bodies, serialize the result.

use bytes::Bytes;
use serde_json::json;

use protodec::{decode_packet, DecodeError, ResourceLocation, TypeRegistry, Value};

fn registry(document: serde_json::Value) -> TypeRegistry {
    TypeRegistry::from_protocol(&document).unwrap()
}

/// The common prelude most protocol.json documents share.
fn game_protocol() -> TypeRegistry {
    registry(json!({
        "types": {
            "string": ["pstring", {"countType": "varint"}],
            "slot": ["container", [
                {"name": "present", "type": "bool"},
                {"name": "item", "type": ["switch", {
                    "compareTo": "present",
                    "fields": {
                        "true": ["container", [
                            {"name": "item_id", "type": "varint"},
                            {"name": "count", "type": "i8"},
                        ]],
                        "false": "void",
                    },
                }]},
            ]],
        },
        "play": {
            "toClient": {
                "types": {
                    "packet_chat": ["container", [
                        {"name": "message", "type": "string"},
                        {"name": "position", "type": "i8"},
                        {"name": "sender", "type": "UUID"},
                    ]],
                    "packet_window_items": ["container", [
                        {"name": "window_id", "type": "u8"},
                        {"name": "items", "type": ["array", {
                            "countType": "varint",
                            "type": "slot",
                        }]},
                    ]],
                },
            },
        },
    }))
}

fn encode_string(out: &mut Vec<u8>, s: &str) {
    out.push(s.len() as u8); // short strings only, single varint byte
    out.extend_from_slice(s.as_bytes());
}

#[test]
fn chat_packet_decodes_and_serializes() {
    let reg = game_protocol();
    let handler = reg
        .handler(&ResourceLocation::new("play/toClient", "packet_chat"))
        .unwrap();

    let mut wire = Vec::new();
    encode_string(&mut wire, "hello");
    wire.push(0x01); // position
    wire.extend_from_slice(&[0u8; 15]);
    wire.push(0x2a); // uuid tail byte

    let value = decode_packet(&handler, wire).unwrap();
    let rendered = serde_json::to_value(&value).unwrap();
    assert_eq!(
        rendered,
        json!({
            "message": "hello",
            "position": 1,
            "sender": "00000000-0000-0000-0000-00000000002a",
        })
    );
}

#[test]
fn window_items_mixes_present_and_empty_slots() {
    let reg = game_protocol();
    let handler = reg
        .handler(&ResourceLocation::new("play/toClient", "packet_window_items"))
        .unwrap();

    // window 1, two slots: 64 x item 300, then an empty one
    let wire = vec![0x01, 0x02, 0x01, 0xac, 0x02, 0x40, 0x00];
    let value = decode_packet(&handler, wire).unwrap();
    let rendered = serde_json::to_value(&value).unwrap();
    assert_eq!(
        rendered,
        json!({
            "window_id": 1,
            "items": [
                {"present": true, "item": {"item_id": 300, "count": 64}},
                {"present": false, "item": null},
            ],
        })
    );
}

#[test]
fn truncated_packet_reports_how_much_was_missing() {
    let reg = game_protocol();
    let handler = reg
        .handler(&ResourceLocation::new("play/toClient", "packet_chat"))
        .unwrap();

    let mut wire = Vec::new();
    encode_string(&mut wire, "hi");
    wire.push(0x00);
    // uuid cut short
    wire.extend_from_slice(&[0u8; 4]);

    let err = decode_packet(&handler, wire).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::InsufficientData {
            needed: 16,
            remaining: 4,
        }
    ));
}

#[test]
fn count_field_reference_reaches_across_scopes() {
    let reg = registry(json!({"types": {
        "packet": ["container", [
            {"name": "header", "type": ["container", [
                {"name": "len", "type": "u8"},
            ]]},
            {"name": "body", "type": ["container", [
                {"name": "data", "type": ["buffer", {"count": "../header/len"}]},
            ]]},
        ]],
    }}));
    // len = 2 scoped under header, referenced from inside body
    let handler = reg.handler(&ResourceLocation::global("packet")).unwrap();
    let value = decode_packet(&handler, vec![0x02, 0xaa, 0xbb]).unwrap();
    assert_eq!(
        serde_json::to_value(&value).unwrap(),
        json!({
            "header": {"len": 2},
            "body": {"data": "0xaabb"},
        })
    );
}

#[test]
fn literal_and_referenced_counts_decode_identically() {
    let reg = registry(json!({"types": {
        "fixed": ["container", [
            {"name": "items", "type": ["array", {"count": 3, "type": "u8"}]},
        ]],
        "counted": ["container", [
            {"name": "len", "type": "u8"},
            {"name": "items", "type": ["array", {"count": "len", "type": "u8"}]},
        ]],
    }}));
    let elements = [0x0a, 0x0b, 0x0c];

    let fixed = reg.handler(&ResourceLocation::global("fixed")).unwrap();
    let by_literal = decode_packet(&fixed, elements.to_vec()).unwrap();

    let counted = reg.handler(&ResourceLocation::global("counted")).unwrap();
    let mut wire = vec![0x03];
    wire.extend_from_slice(&elements);
    let by_reference = decode_packet(&counted, wire).unwrap();

    assert_eq!(by_literal.get("items"), by_reference.get("items"));
    assert_eq!(
        by_literal.get("items"),
        Some(&Value::Array(vec![
            Value::U8(0x0a),
            Value::U8(0x0b),
            Value::U8(0x0c),
        ]))
    );
}

#[test]
fn forward_reference_to_undecoded_field_is_fatal() {
    let reg = registry(json!({"types": {
        "packet": ["container", [
            {"name": "data", "type": ["buffer", {"count": "len"}]},
            {"name": "len", "type": "u8"},
        ]],
    }}));
    let handler = reg.handler(&ResourceLocation::global("packet")).unwrap();
    let err = decode_packet(&handler, vec![0x01, 0xaa]).unwrap_err();
    assert!(matches!(err, DecodeError::MissingReferenceField { .. }));
}

#[test]
fn anonymous_container_flattens_into_parent() {
    let reg = registry(json!({"types": {
        "packet": ["container", [
            {"name": "id", "type": "u8"},
            {"anon": true, "type": ["container", [
                {"name": "x", "type": "u8"},
                {"name": "y", "type": "u8"},
            ]]},
        ]],
    }}));
    let handler = reg.handler(&ResourceLocation::global("packet")).unwrap();
    let value = decode_packet(&handler, vec![0x01, 0x02, 0x03]).unwrap();
    assert_eq!(
        serde_json::to_value(&value).unwrap(),
        json!({"id": 1, "x": 2, "y": 3})
    );
}

#[test]
fn mapper_and_switch_soft_failures_keep_the_packet() {
    let reg = registry(json!({"types": {
        "packet": ["container", [
            {"name": "kind", "type": ["mapper", {
                "type": "u8",
                "mappings": {"0": "move"},
            }]},
            {"name": "mode", "type": "u8"},
            {"name": "body", "type": ["switch", {
                "compareTo": "mode",
                "fields": {"0": "u8"},
            }]},
            {"name": "trailer", "type": "u8"},
        ]],
    }}));
    let handler = reg.handler(&ResourceLocation::global("packet")).unwrap();

    // kind 9 is unmapped, mode 5 matches no case; both soft-fail and the
    // trailer still decodes
    let value = decode_packet(&handler, vec![0x09, 0x05, 0x77]).unwrap();
    assert_eq!(
        serde_json::to_value(&value).unwrap(),
        json!({"kind": null, "mode": 5, "body": null, "trailer": 0x77})
    );
}

#[test]
fn nbt_field_round_trips_into_json() {
    let reg = registry(json!({"types": {
        "packet": ["container", [
            {"name": "tag", "type": "anonymousNbt"},
            {"name": "after", "type": "u8"},
        ]],
    }}));
    let handler = reg.handler(&ResourceLocation::global("packet")).unwrap();

    // anonymous compound root { "hp": (short) 20 }
    let wire = vec![
        0x0a, // TAG_Compound, no root name in the anonymous form
        0x02, 0x00, 0x02, b'h', b'p', // TAG_Short "hp"
        0x00, 0x14, // 20
        0x00, // TAG_End
        0x63, // trailing byte
    ];
    let value = decode_packet(&handler, wire).unwrap();
    assert_eq!(
        serde_json::to_value(&value).unwrap(),
        json!({"tag": {"hp": 20}, "after": 0x63})
    );
}

#[test]
fn varint_boundaries_decode_exactly() {
    let reg = registry(json!({"types": {"v": "varint"}}));
    let handler = reg.handler(&ResourceLocation::global("v")).unwrap();

    let cases: &[(&[u8], i32)] = &[
        (&[0x00], 0),
        (&[0x7f], 127),
        (&[0x80, 0x01], 128),
        (&[0xff, 0xff, 0xff, 0xff, 0x07], i32::MAX),
        (&[0xff, 0xff, 0xff, 0xff, 0x0f], -1),
    ];
    for (wire, expected) in cases {
        let value = decode_packet(&handler, Bytes::copy_from_slice(wire)).unwrap();
        assert_eq!(value, Value::I32(*expected), "wire {wire:?}");
    }

    let err = decode_packet(&handler, vec![0x80, 0x80, 0x80, 0x80, 0x80, 0x01]).unwrap_err();
    assert!(matches!(err, DecodeError::VarIntTooBig));
}

#[test]
fn rest_buffer_consumes_to_the_end() {
    let reg = registry(json!({"types": {
        "packet": ["container", [
            {"name": "id", "type": "u8"},
            {"name": "payload", "type": "restBuffer"},
        ]],
    }}));
    let handler = reg.handler(&ResourceLocation::global("packet")).unwrap();
    let value = decode_packet(&handler, vec![0x07, 0xde, 0xad, 0xbe, 0xef]).unwrap();
    assert_eq!(
        serde_json::to_value(&value).unwrap(),
        json!({"id": 7, "payload": "0xdeadbeef"})
    );
}
