//! Protocol Module
//!
//! Defines the wire protocol between cache clients and the cache server.
//!
//! ## Packet Format
//! ```text
//! ┌──────────┬──────────┬──────────┬──────────┬─────────────────────┐
//! │ Ver (1)  │ Type (1) │ Flags(1) │ Len (4)  │   Value payload     │
//! └──────────┴──────────┴──────────┴──────────┴─────────────────────┘
//! ```
//!
//! ### Type Tags
//! - 0x00: NULL
//! - 0x01: BOOL
//! - 0x02-0x05: UINT8..UINT64
//! - 0x06-0x09: SINT8..SINT64
//! - 0x0A/0x0B: FLOAT32/FLOAT64
//! - 0x10: BINARY (u32 len + bytes)
//! - 0x11: STRING (u32 len + UTF-8)
//! - 0x20: LIST (u32 count + values)
//! - 0xF0: RESPONSE_CODE (u16)
//! - 0xF1: ERROR_CODE (u16 + u32 len + message)
//!
//! ### Queries
//! - SET    [key, value] -> RESPONSE_CODE(0)
//! - GET    [key]        -> BINARY | NULL
//! - DEL    [key]        -> RESPONSE_CODE(0)
//! - EXISTS [key]        -> BOOL
//! - PING   []           -> STRING("PONG")

mod codec;
mod frame;
mod value;

pub use codec::{
    decode_packet, decode_query, decode_value, deserialize, encode_packet, encode_query,
    encode_response, read_packet, serialize, serialize_into, write_packet,
};
pub use frame::{
    MetaFrame, PacketType, MAX_NESTING_DEPTH, MAX_PAYLOAD_SIZE, META_FRAME_SIZE, PROTOCOL_VERSION,
};
pub use value::{TypeTag, Value};

/// Error codes returned in ERROR_CODE replies
pub mod error_codes {
    /// Query name not recognised
    pub const UNKNOWN_QUERY: u16 = 1;
    /// Wrong number or type of parameters
    pub const BAD_PARAMS: u16 = 2;
    /// Malformed query body
    pub const MALFORMED: u16 = 3;
    /// Server refused the connection
    pub const BUSY: u16 = 4;
}
