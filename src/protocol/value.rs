//! Wire values
//!
//! The typed union carried in every request and response payload.

/// Type tag written before every value on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TypeTag {
    Null = 0x00,
    Bool = 0x01,
    UInt8 = 0x02,
    UInt16 = 0x03,
    UInt32 = 0x04,
    UInt64 = 0x05,
    SInt8 = 0x06,
    SInt16 = 0x07,
    SInt32 = 0x08,
    SInt64 = 0x09,
    Float32 = 0x0A,
    Float64 = 0x0B,
    Binary = 0x10,
    String = 0x11,
    List = 0x20,
    ResponseCode = 0xF0,
    ErrorCode = 0xF1,
}

impl TypeTag {
    /// Parse a tag byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        let tag = match byte {
            0x00 => TypeTag::Null,
            0x01 => TypeTag::Bool,
            0x02 => TypeTag::UInt8,
            0x03 => TypeTag::UInt16,
            0x04 => TypeTag::UInt32,
            0x05 => TypeTag::UInt64,
            0x06 => TypeTag::SInt8,
            0x07 => TypeTag::SInt16,
            0x08 => TypeTag::SInt32,
            0x09 => TypeTag::SInt64,
            0x0A => TypeTag::Float32,
            0x0B => TypeTag::Float64,
            0x10 => TypeTag::Binary,
            0x11 => TypeTag::String,
            0x20 => TypeTag::List,
            0xF0 => TypeTag::ResponseCode,
            0xF1 => TypeTag::ErrorCode,
            _ => return None,
        };
        Some(tag)
    }
}

/// A protocol value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    SInt8(i8),
    SInt16(i16),
    SInt32(i32),
    SInt64(i64),
    Float32(f32),
    Float64(f64),
    Binary(Vec<u8>),
    String(String),
    List(Vec<Value>),
    /// Status reply; 0 means success
    ResponseCode(u16),
    /// Server-side failure
    ErrorCode { code: u16, message: String },
}

impl Value {
    /// Get the type tag
    pub fn tag(&self) -> TypeTag {
        match self {
            Value::Null => TypeTag::Null,
            Value::Bool(_) => TypeTag::Bool,
            Value::UInt8(_) => TypeTag::UInt8,
            Value::UInt16(_) => TypeTag::UInt16,
            Value::UInt32(_) => TypeTag::UInt32,
            Value::UInt64(_) => TypeTag::UInt64,
            Value::SInt8(_) => TypeTag::SInt8,
            Value::SInt16(_) => TypeTag::SInt16,
            Value::SInt32(_) => TypeTag::SInt32,
            Value::SInt64(_) => TypeTag::SInt64,
            Value::Float32(_) => TypeTag::Float32,
            Value::Float64(_) => TypeTag::Float64,
            Value::Binary(_) => TypeTag::Binary,
            Value::String(_) => TypeTag::String,
            Value::List(_) => TypeTag::List,
            Value::ResponseCode(_) => TypeTag::ResponseCode,
            Value::ErrorCode { .. } => TypeTag::ErrorCode,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the payload of a Binary or String value
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            Value::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Build an error reply
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Value::ErrorCode {
            code,
            message: message.into(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Binary(bytes)
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Value::Binary(bytes.to_vec())
    }
}
