//! Frame header
//!
//! Every packet starts with a fixed 7-byte MetaFrame.

use bytes::BufMut;

use crate::error::{CacheError, Result};

/// Protocol version written into every MetaFrame
pub const PROTOCOL_VERSION: u8 = 1;

/// MetaFrame size: version (1) + packet type (1) + flags (1) + length (4)
pub const META_FRAME_SIZE: usize = 7;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// Deepest list nesting accepted on decode
pub const MAX_NESTING_DEPTH: usize = 64;

/// Packet types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    Query = 0x01,
    Response = 0x02,
}

impl PacketType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(PacketType::Query),
            0x02 => Some(PacketType::Response),
            _ => None,
        }
    }
}

/// Fixed-size packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaFrame {
    pub version: u8,
    pub packet_type: PacketType,
    pub flags: u8,
    pub payload_length: u32,
}

impl MetaFrame {
    /// Header for a payload of the given length
    pub fn new(packet_type: PacketType, payload_length: u32) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            packet_type,
            flags: 0,
            payload_length,
        }
    }

    /// Append the header bytes to a buffer
    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(self.version);
        buf.put_u8(self.packet_type as u8);
        buf.put_u8(self.flags);
        buf.put_u32(self.payload_length);
    }

    /// Parse and validate a header
    pub fn decode(header: &[u8; META_FRAME_SIZE]) -> Result<Self> {
        let version = header[0];
        if version != PROTOCOL_VERSION {
            return Err(CacheError::Protocol(format!(
                "Unsupported protocol version: {}",
                version
            )));
        }

        let packet_type = PacketType::from_byte(header[1]).ok_or_else(|| {
            CacheError::Protocol(format!("Unknown packet type: 0x{:02x}", header[1]))
        })?;

        let payload_length = u32::from_be_bytes([header[3], header[4], header[5], header[6]]);
        if payload_length > MAX_PAYLOAD_SIZE {
            return Err(CacheError::Protocol(format!(
                "Payload too large: {} bytes (max {})",
                payload_length, MAX_PAYLOAD_SIZE
            )));
        }

        Ok(Self {
            version,
            packet_type,
            flags: header[2],
            payload_length,
        })
    }
}
