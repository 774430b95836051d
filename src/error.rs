//! Error types for newscache
//!
//! Provides a unified error type for all operations.

use std::io::ErrorKind;

use thiserror::Error;

/// Result type alias using CacheError
pub type Result<T> = std::result::Result<T, CacheError>;

/// Unified error type for newscache operations
#[derive(Debug, Error)]
pub enum CacheError {
    // -------------------------------------------------------------------------
    // Connection Errors
    // -------------------------------------------------------------------------
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Connection pool exhausted ({size} connections in use)")]
    PoolExhausted { size: usize },

    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(std::io::Error),

    #[error("Request timed out: {0}")]
    Timeout(String),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Query failed with code {code}: {message}")]
    Query { code: u16, message: String },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Payload too large: {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Capacity Errors
    // -------------------------------------------------------------------------
    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    #[error("String pool full: requested {requested} bytes, {available} available")]
    StringPoolFull { requested: usize, available: usize },

    #[error("Metadata pool exhausted: {kind}")]
    MetadataPoolExhausted { kind: &'static str },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            // Read/write timeouts surface as WouldBlock on unix, TimedOut on windows
            ErrorKind::TimedOut | ErrorKind::WouldBlock => CacheError::Timeout(err.to_string()),
            _ => CacheError::Network(err),
        }
    }
}

impl From<bincode::Error> for CacheError {
    fn from(err: bincode::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

impl CacheError {
    /// Capacity errors call for resizing a pool, not for retrying.
    pub fn is_capacity_error(&self) -> bool {
        matches!(
            self,
            CacheError::OutOfMemory(_)
                | CacheError::StringPoolFull { .. }
                | CacheError::MetadataPoolExhausted { .. }
                | CacheError::PoolExhausted { .. }
                | CacheError::PayloadTooLarge { .. }
        )
    }

    /// After one of these the stream state is unknown and the connection
    /// must be discarded instead of returned to the pool.
    pub fn poisons_connection(&self) -> bool {
        matches!(
            self,
            CacheError::Protocol(_)
                | CacheError::Network(_)
                | CacheError::Timeout(_)
                | CacheError::InvalidResponse(_)
        )
    }
}
