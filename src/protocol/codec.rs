//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Packet
//! ```text
//! ┌──────────┬──────────┬──────────┬──────────┬─────────────────────┐
//! │ Ver (1)  │ Type (1) │ Flags(1) │ Len (4)  │   Value payload     │
//! └──────────┴──────────┴──────────┴──────────┴─────────────────────┘
//! ```
//!
//! ### Value
//! ```text
//! ┌──────────┬──────────────────────────────────────────────┐
//! │ Tag (1)  │ Fixed-width body, or u32 length/count + body │
//! └──────────┴──────────────────────────────────────────────┘
//! ```
//!
//! All multi-byte integers are big-endian. Floats travel as their bit
//! patterns. A query payload is `List[String(name), List(params)]`.

use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{CacheError, Result};
use super::frame::{MetaFrame, PacketType, MAX_NESTING_DEPTH, MAX_PAYLOAD_SIZE, META_FRAME_SIZE};
use super::value::{TypeTag, Value};

// =============================================================================
// Value Encoding
// =============================================================================

/// Serialize a value to bytes
pub fn serialize(value: &Value) -> Vec<u8> {
    let mut buf = BytesMut::new();
    serialize_into(value, &mut buf);
    buf.to_vec()
}

/// Serialize a value, appending to `buf`
pub fn serialize_into<B: BufMut>(value: &Value, buf: &mut B) {
    buf.put_u8(value.tag() as u8);

    match value {
        Value::Null => {}
        Value::Bool(b) => buf.put_u8(u8::from(*b)),
        Value::UInt8(v) => buf.put_u8(*v),
        Value::UInt16(v) => buf.put_u16(*v),
        Value::UInt32(v) => buf.put_u32(*v),
        Value::UInt64(v) => buf.put_u64(*v),
        Value::SInt8(v) => buf.put_i8(*v),
        Value::SInt16(v) => buf.put_i16(*v),
        Value::SInt32(v) => buf.put_i32(*v),
        Value::SInt64(v) => buf.put_i64(*v),
        Value::Float32(v) => buf.put_u32(v.to_bits()),
        Value::Float64(v) => buf.put_u64(v.to_bits()),
        Value::Binary(bytes) => {
            buf.put_u32(bytes.len() as u32);
            buf.put_slice(bytes);
        }
        Value::String(s) => {
            buf.put_u32(s.len() as u32);
            buf.put_slice(s.as_bytes());
        }
        Value::List(items) => {
            buf.put_u32(items.len() as u32);
            for item in items {
                serialize_into(item, buf);
            }
        }
        Value::ResponseCode(code) => buf.put_u16(*code),
        Value::ErrorCode { code, message } => {
            buf.put_u16(*code);
            buf.put_u32(message.len() as u32);
            buf.put_slice(message.as_bytes());
        }
    }
}

// =============================================================================
// Value Decoding
// =============================================================================

/// Deserialize exactly one value; trailing bytes are an error
pub fn deserialize(bytes: &[u8]) -> Result<Value> {
    let mut cursor = bytes;
    let value = decode_value(&mut cursor)?;

    if cursor.has_remaining() {
        return Err(CacheError::Protocol(format!(
            "{} trailing bytes after value",
            cursor.remaining()
        )));
    }

    Ok(value)
}

/// Decode one value from the front of `buf`, advancing it
///
/// Lists nested deeper than `MAX_NESTING_DEPTH` are rejected.
pub fn decode_value(buf: &mut &[u8]) -> Result<Value> {
    decode_nested(buf, 0)
}

fn decode_nested(buf: &mut &[u8], depth: usize) -> Result<Value> {
    ensure(buf, 1, "type tag")?;
    let tag_byte = buf.get_u8();
    let tag = TypeTag::from_byte(tag_byte)
        .ok_or_else(|| CacheError::Protocol(format!("Unknown type tag: 0x{:02x}", tag_byte)))?;

    let value = match tag {
        TypeTag::Null => Value::Null,
        TypeTag::Bool => {
            ensure(buf, 1, "bool")?;
            match buf.get_u8() {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                other => {
                    return Err(CacheError::Protocol(format!(
                        "Invalid bool byte: 0x{:02x}",
                        other
                    )))
                }
            }
        }
        TypeTag::UInt8 => {
            ensure(buf, 1, "u8")?;
            Value::UInt8(buf.get_u8())
        }
        TypeTag::UInt16 => {
            ensure(buf, 2, "u16")?;
            Value::UInt16(buf.get_u16())
        }
        TypeTag::UInt32 => {
            ensure(buf, 4, "u32")?;
            Value::UInt32(buf.get_u32())
        }
        TypeTag::UInt64 => {
            ensure(buf, 8, "u64")?;
            Value::UInt64(buf.get_u64())
        }
        TypeTag::SInt8 => {
            ensure(buf, 1, "i8")?;
            Value::SInt8(buf.get_i8())
        }
        TypeTag::SInt16 => {
            ensure(buf, 2, "i16")?;
            Value::SInt16(buf.get_i16())
        }
        TypeTag::SInt32 => {
            ensure(buf, 4, "i32")?;
            Value::SInt32(buf.get_i32())
        }
        TypeTag::SInt64 => {
            ensure(buf, 8, "i64")?;
            Value::SInt64(buf.get_i64())
        }
        TypeTag::Float32 => {
            ensure(buf, 4, "f32")?;
            Value::Float32(f32::from_bits(buf.get_u32()))
        }
        TypeTag::Float64 => {
            ensure(buf, 8, "f64")?;
            Value::Float64(f64::from_bits(buf.get_u64()))
        }
        TypeTag::Binary => Value::Binary(decode_length_prefixed(buf, "binary")?),
        TypeTag::String => Value::String(decode_string(buf, "string")?),
        TypeTag::List => {
            if depth >= MAX_NESTING_DEPTH {
                return Err(CacheError::Protocol(format!(
                    "List nesting exceeds {} levels",
                    MAX_NESTING_DEPTH
                )));
            }
            ensure(buf, 4, "list count")?;
            let count = buf.get_u32() as usize;

            // Every element needs at least its tag byte
            if count > buf.remaining() {
                return Err(CacheError::Protocol(format!(
                    "List count {} overruns {} remaining bytes",
                    count,
                    buf.remaining()
                )));
            }

            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(decode_nested(buf, depth + 1)?);
            }
            Value::List(items)
        }
        TypeTag::ResponseCode => {
            ensure(buf, 2, "response code")?;
            Value::ResponseCode(buf.get_u16())
        }
        TypeTag::ErrorCode => {
            ensure(buf, 2, "error code")?;
            let code = buf.get_u16();
            let message = decode_string(buf, "error message")?;
            Value::ErrorCode { code, message }
        }
    };

    Ok(value)
}

fn ensure(buf: &[u8], needed: usize, what: &str) -> Result<()> {
    if buf.remaining() < needed {
        return Err(CacheError::Protocol(format!(
            "Truncated {}: need {} bytes, got {}",
            what,
            needed,
            buf.remaining()
        )));
    }
    Ok(())
}

fn decode_length_prefixed(buf: &mut &[u8], what: &str) -> Result<Vec<u8>> {
    ensure(buf, 4, what)?;
    let len = buf.get_u32() as usize;
    ensure(buf, len, what)?;

    let bytes = buf[..len].to_vec();
    buf.advance(len);
    Ok(bytes)
}

fn decode_string(buf: &mut &[u8], what: &str) -> Result<String> {
    let bytes = decode_length_prefixed(buf, what)?;
    String::from_utf8(bytes)
        .map_err(|e| CacheError::Protocol(format!("Invalid UTF-8 in {}: {}", what, e)))
}

// =============================================================================
// Packet Encoding/Decoding
// =============================================================================

/// Encode a full packet: MetaFrame followed by the serialized value
///
/// Payloads over `MAX_PAYLOAD_SIZE` fail with `PayloadTooLarge` before
/// anything reaches the wire.
pub fn encode_packet(packet_type: PacketType, value: &Value) -> Result<Vec<u8>> {
    let mut payload = BytesMut::new();
    serialize_into(value, &mut payload);
    if payload.len() > MAX_PAYLOAD_SIZE as usize {
        return Err(CacheError::PayloadTooLarge {
            size: payload.len(),
            limit: MAX_PAYLOAD_SIZE as usize,
        });
    }

    let mut message = BytesMut::with_capacity(META_FRAME_SIZE + payload.len());
    MetaFrame::new(packet_type, payload.len() as u32).encode(&mut message);
    message.put_slice(&payload);

    Ok(message.to_vec())
}

/// Encode a query packet
pub fn encode_query(name: &str, params: Vec<Value>) -> Result<Vec<u8>> {
    let body = Value::List(vec![Value::String(name.to_string()), Value::List(params)]);
    encode_packet(PacketType::Query, &body)
}

/// Encode a response packet
pub fn encode_response(value: &Value) -> Result<Vec<u8>> {
    encode_packet(PacketType::Response, value)
}

/// Decode a complete packet held in memory
pub fn decode_packet(bytes: &[u8]) -> Result<(MetaFrame, Value)> {
    if bytes.len() < META_FRAME_SIZE {
        return Err(CacheError::Protocol(format!(
            "Incomplete header: expected {} bytes, got {}",
            META_FRAME_SIZE,
            bytes.len()
        )));
    }

    let mut header = [0u8; META_FRAME_SIZE];
    header.copy_from_slice(&bytes[..META_FRAME_SIZE]);
    let frame = MetaFrame::decode(&header)?;

    let total_len = META_FRAME_SIZE + frame.payload_length as usize;
    if bytes.len() != total_len {
        return Err(CacheError::Protocol(format!(
            "Packet length mismatch: header declares {} bytes, got {}",
            total_len,
            bytes.len()
        )));
    }

    let value = deserialize(&bytes[META_FRAME_SIZE..])?;
    Ok((frame, value))
}

/// Split a query body into its name and parameter list
pub fn decode_query(value: Value) -> Result<(String, Vec<Value>)> {
    let mut parts = match value {
        Value::List(parts) if parts.len() == 2 => parts,
        other => {
            return Err(CacheError::InvalidQuery(format!(
                "Expected [name, params], got {:?}",
                other.tag()
            )))
        }
    };

    let params = match parts.pop() {
        Some(Value::List(params)) => params,
        _ => return Err(CacheError::InvalidQuery("Query params must be a list".to_string())),
    };
    let name = match parts.pop() {
        Some(Value::String(name)) => name,
        _ => return Err(CacheError::InvalidQuery("Query name must be a string".to_string())),
    };

    Ok((name, params))
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete packet from a stream
///
/// Blocks until a complete packet is received or an error occurs
pub fn read_packet<R: Read>(reader: &mut R) -> Result<(MetaFrame, Value)> {
    // Read header first
    let mut header = [0u8; META_FRAME_SIZE];
    reader.read_exact(&mut header)?;
    let frame = MetaFrame::decode(&header)?;

    // Read payload
    let mut payload = vec![0u8; frame.payload_length as usize];
    reader.read_exact(&mut payload)?;

    let value = deserialize(&payload)?;
    Ok((frame, value))
}

/// Write a complete packet to a stream
pub fn write_packet<W: Write>(writer: &mut W, packet_type: PacketType, value: &Value) -> Result<()> {
    let bytes = encode_packet(packet_type, value)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
