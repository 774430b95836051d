//! Codec Tests
//!
//! Tests for value serialization and packet framing.

use std::io::Cursor;

use newscache::protocol::{
    decode_packet, decode_query, deserialize, encode_query, encode_response, read_packet,
    serialize, write_packet, MetaFrame, PacketType, TypeTag, Value, MAX_NESTING_DEPTH,
    MAX_PAYLOAD_SIZE, META_FRAME_SIZE, PROTOCOL_VERSION,
};
use newscache::CacheError;

// =============================================================================
// Helper Functions
// =============================================================================

fn round_trip(value: Value) {
    let encoded = serialize(&value);
    let decoded = deserialize(&encoded).unwrap();
    assert_eq!(decoded, value);
}

fn nested_lists(depth: usize) -> Value {
    let mut value = Value::Null;
    for _ in 0..depth {
        value = Value::List(vec![value]);
    }
    value
}

/// `depth` single-element list headers around a null, built as raw bytes
fn nested_list_bytes(depth: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(depth * 5 + 1);
    for _ in 0..depth {
        bytes.extend_from_slice(&[0x20, 0, 0, 0, 1]);
    }
    bytes.push(0x00);
    bytes
}

// =============================================================================
// Value Round Trip Tests
// =============================================================================

#[test]
fn test_round_trip_scalars() {
    round_trip(Value::Null);
    round_trip(Value::Bool(true));
    round_trip(Value::Bool(false));
    round_trip(Value::UInt8(u8::MAX));
    round_trip(Value::UInt16(0xBEEF));
    round_trip(Value::UInt32(0xDEAD_BEEF));
    round_trip(Value::UInt64(u64::MAX));
    round_trip(Value::SInt8(-128));
    round_trip(Value::SInt16(-12_345));
    round_trip(Value::SInt32(i32::MIN));
    round_trip(Value::SInt64(-9_000_000_000));
    round_trip(Value::Float32(3.5));
    round_trip(Value::Float64(-0.125));
    round_trip(Value::ResponseCode(0));
}

#[test]
fn test_round_trip_length_prefixed() {
    round_trip(Value::Binary(vec![]));
    round_trip(Value::Binary(vec![0, 1, 2, 255]));
    round_trip(Value::String(String::new()));
    round_trip(Value::String("héllo wörld".to_string()));
    round_trip(Value::error(7, "something broke"));
}

#[test]
fn test_round_trip_nested_list() {
    round_trip(Value::List(vec![]));
    round_trip(Value::List(vec![
        Value::String("SET".to_string()),
        Value::List(vec![
            Value::String("key".to_string()),
            Value::Binary(b"value".to_vec()),
            Value::List(vec![Value::Null, Value::Bool(true), Value::UInt64(42)]),
        ]),
        Value::ResponseCode(3),
    ]));
}

// =============================================================================
// Encoding Layout Tests
// =============================================================================

#[test]
fn test_integers_are_big_endian() {
    let encoded = serialize(&Value::UInt32(0x0102_0304));
    assert_eq!(encoded, vec![TypeTag::UInt32 as u8, 0x01, 0x02, 0x03, 0x04]);
}

#[test]
fn test_string_layout() {
    let encoded = serialize(&Value::String("ab".to_string()));
    assert_eq!(encoded, vec![0x11, 0, 0, 0, 2, b'a', b'b']);
}

#[test]
fn test_type_tags() {
    assert_eq!(Value::Null.tag() as u8, 0x00);
    assert_eq!(Value::Float64(1.0).tag() as u8, 0x0B);
    assert_eq!(Value::Binary(vec![]).tag() as u8, 0x10);
    assert_eq!(Value::List(vec![]).tag() as u8, 0x20);
    assert_eq!(Value::ResponseCode(0).tag() as u8, 0xF0);
    assert_eq!(Value::error(1, "x").tag() as u8, 0xF1);
}

// =============================================================================
// Malformed Input Tests
// =============================================================================

#[test]
fn test_unknown_tag_rejected() {
    assert!(matches!(deserialize(&[0x7F]), Err(CacheError::Protocol(_))));
}

#[test]
fn test_truncated_value_rejected() {
    let encoded = serialize(&Value::UInt64(1));
    assert!(deserialize(&encoded[..5]).is_err());

    let encoded = serialize(&Value::String("hello".to_string()));
    assert!(deserialize(&encoded[..encoded.len() - 1]).is_err());
}

#[test]
fn test_trailing_bytes_rejected() {
    let mut encoded = serialize(&Value::Null);
    encoded.push(0);
    assert!(deserialize(&encoded).is_err());
}

#[test]
fn test_invalid_bool_rejected() {
    assert!(deserialize(&[TypeTag::Bool as u8, 2]).is_err());
}

#[test]
fn test_invalid_utf8_rejected() {
    let bytes = vec![0x11, 0, 0, 0, 2, 0xC3, 0x28];
    assert!(deserialize(&bytes).is_err());
}

#[test]
fn test_oversized_list_count_rejected() {
    let bytes = vec![0x20, 0xFF, 0xFF, 0xFF, 0xFF, 0x00];
    assert!(deserialize(&bytes).is_err());
}

#[test]
fn test_empty_input_rejected() {
    assert!(deserialize(&[]).is_err());
}

#[test]
fn test_nesting_up_to_limit_accepted() {
    round_trip(nested_lists(MAX_NESTING_DEPTH));
}

#[test]
fn test_nesting_past_limit_rejected() {
    let encoded = serialize(&nested_lists(MAX_NESTING_DEPTH + 1));
    assert!(matches!(deserialize(&encoded), Err(CacheError::Protocol(_))));
}

#[test]
fn test_deep_nesting_fails_without_recursing() {
    // Far under the payload cap, far over any stack
    let bytes = nested_list_bytes(50_000);
    assert!((bytes.len() as u32) < MAX_PAYLOAD_SIZE);
    assert!(matches!(deserialize(&bytes), Err(CacheError::Protocol(_))));
}

// =============================================================================
// Packet Tests
// =============================================================================

#[test]
fn test_query_packet_round_trip() {
    let packet = encode_query("GET", vec![Value::from("news:1")]).unwrap();
    let (frame, body) = decode_packet(&packet).unwrap();

    assert_eq!(frame.version, PROTOCOL_VERSION);
    assert_eq!(frame.packet_type, PacketType::Query);
    assert_eq!(frame.payload_length as usize, packet.len() - META_FRAME_SIZE);

    let (name, params) = decode_query(body).unwrap();
    assert_eq!(name, "GET");
    assert_eq!(params, vec![Value::String("news:1".to_string())]);
}

#[test]
fn test_response_packet_header() {
    let packet = encode_response(&Value::ResponseCode(0)).unwrap();
    assert_eq!(packet[0], PROTOCOL_VERSION);
    assert_eq!(packet[1], PacketType::Response as u8);
    assert_eq!(packet[2], 0);
    assert_eq!(&packet[3..7], &3u32.to_be_bytes());
}

#[test]
fn test_bad_version_rejected() {
    let mut packet = encode_response(&Value::Null).unwrap();
    packet[0] = 9;
    assert!(matches!(decode_packet(&packet), Err(CacheError::Protocol(_))));
}

#[test]
fn test_length_mismatch_rejected() {
    let mut packet = encode_response(&Value::Null).unwrap();
    packet.push(0);
    assert!(decode_packet(&packet).is_err());
}

#[test]
fn test_payload_cap_enforced() {
    let mut header = [0u8; META_FRAME_SIZE];
    header[0] = PROTOCOL_VERSION;
    header[1] = PacketType::Query as u8;
    header[3..7].copy_from_slice(&(MAX_PAYLOAD_SIZE + 1).to_be_bytes());
    assert!(MetaFrame::decode(&header).is_err());
}

#[test]
fn test_decode_query_shape_errors() {
    assert!(matches!(
        decode_query(Value::Null),
        Err(CacheError::InvalidQuery(_))
    ));
    assert!(matches!(
        decode_query(Value::List(vec![Value::UInt8(1), Value::List(vec![])])),
        Err(CacheError::InvalidQuery(_))
    ));
    assert!(matches!(
        decode_query(Value::List(vec![Value::from("GET"), Value::Null])),
        Err(CacheError::InvalidQuery(_))
    ));
}

#[test]
fn test_oversized_payload_not_written() {
    let mut wire = Vec::new();
    let value = Value::Binary(vec![0u8; MAX_PAYLOAD_SIZE as usize]);

    let err = write_packet(&mut wire, PacketType::Query, &value).unwrap_err();
    assert!(matches!(err, CacheError::PayloadTooLarge { .. }));
    assert!(err.is_capacity_error());
    assert!(!err.poisons_connection());
    assert!(wire.is_empty());
}

#[test]
fn test_payload_at_limit_encodes() {
    // Tag (1) + length (4) + body fills the payload exactly
    let value = Value::Binary(vec![0u8; MAX_PAYLOAD_SIZE as usize - 5]);
    let packet = encode_response(&value).unwrap();
    assert_eq!(packet.len(), META_FRAME_SIZE + MAX_PAYLOAD_SIZE as usize);
}

#[test]
fn test_stream_read_write() {
    let mut wire = Vec::new();
    write_packet(&mut wire, PacketType::Response, &Value::Binary(b"abc".to_vec())).unwrap();
    write_packet(&mut wire, PacketType::Response, &Value::Null).unwrap();

    let mut cursor = Cursor::new(wire);
    let (_, first) = read_packet(&mut cursor).unwrap();
    let (_, second) = read_packet(&mut cursor).unwrap();
    assert_eq!(first, Value::Binary(b"abc".to_vec()));
    assert_eq!(second, Value::Null);

    // Clean EOF surfaces as a network error
    assert!(matches!(read_packet(&mut cursor), Err(CacheError::Network(_))));
}
