//! Configuration for newscache
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

use crate::error::{CacheError, Result};

/// Main configuration for a cache client / storage instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Connection Configuration
    // -------------------------------------------------------------------------
    /// Cache server host
    pub host: String,

    /// Cache server port
    pub port: u16,

    /// How connections authenticate
    pub mode: ConnectionMode,

    /// Per-request read/write timeout (milliseconds)
    pub timeout_ms: u64,

    /// Retry budget for callers. The pool itself never retries.
    pub max_retries: u32,

    // -------------------------------------------------------------------------
    // Pool Configuration
    // -------------------------------------------------------------------------
    /// Max live connections (checked out + available)
    pub pool_size: usize,

    /// Max age of a connection before it is destroyed (milliseconds)
    pub max_lifetime_ms: u64,

    /// Max time a connection may sit unused (milliseconds)
    pub max_idle_ms: u64,

    /// Minimum interval between expired-connection sweeps (milliseconds)
    pub cleanup_interval_ms: u64,

    // -------------------------------------------------------------------------
    // Cache Configuration
    // -------------------------------------------------------------------------
    /// Which backend the cache context should use
    pub backend: BackendKind,

    /// TTLs per kind of cached data
    pub ttl: TtlPolicy,

    // -------------------------------------------------------------------------
    // Storage / Server Configuration
    // -------------------------------------------------------------------------
    pub storage: StorageConfig,

    pub server: ServerConfig,
}

/// Authentication mode for connections
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Local cache server, no authentication step
    Embedded,

    /// Remote cache server, token required
    Remote { token: String },
}

/// Cache backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// In-process map
    Memory,

    /// Pooled connections to a cache server
    Remote,
}

/// Kind of cached data, each with its own TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Content,
    Llm,
    Search,
    Analysis,
    HotData,
    ColdData,
}

/// TTL table (seconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub content: u32,
    pub llm: u32,
    pub search: u32,
    pub analysis: u32,
    pub hot_data: u32,
    pub cold_data: u32,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            content: 259_200, // 3 days
            llm: 3_600,       // 1 hour
            search: 1_800,    // 30 minutes
            analysis: 21_600, // 6 hours
            hot_data: 7_200,  // 2 hours
            cold_data: 28_800, // 8 hours
        }
    }
}

impl TtlPolicy {
    /// TTL in seconds for a kind of data
    pub fn ttl_for(&self, kind: CacheKind) -> u32 {
        match kind {
            CacheKind::Content => self.content,
            CacheKind::Llm => self.llm,
            CacheKind::Search => self.search,
            CacheKind::Analysis => self.analysis,
            CacheKind::HotData => self.hot_data,
            CacheKind::ColdData => self.cold_data,
        }
    }
}

/// Largest record capacity `Config::validate` accepts
pub const MAX_STORAGE_CAPACITY: usize = 65_536;

/// Largest string pool `Config::validate` accepts
///
/// Together with `MAX_STORAGE_CAPACITY` this keeps a full storage's cold
/// blob under the 16 MiB wire payload limit.
pub const MAX_STRING_POOL_BYTES: usize = 8 * 1024 * 1024;

/// Capacities for hot/cold storage and its memory pools
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageConfig {
    /// Max hot/cold records per storage instance
    pub capacity: usize,

    /// String pool size in bytes
    pub string_pool_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            capacity: 4096,
            string_pool_bytes: 4 * 1024 * 1024, // 4 MB
        }
    }
}

/// Reference server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:2003".to_string(),
            max_connections: 256,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 2003,
            mode: ConnectionMode::Embedded,
            timeout_ms: 5_000,
            max_retries: 3,
            pool_size: 10,
            max_lifetime_ms: 1_800_000, // 30 minutes
            max_idle_ms: 300_000,       // 5 minutes
            cleanup_interval_ms: 30_000,
            backend: BackendKind::Remote,
            ttl: TtlPolicy::default(),
            storage: StorageConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// `host:port` of the cache server
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_millis(self.max_lifetime_ms)
    }

    pub fn max_idle(&self) -> Duration {
        Duration::from_millis(self.max_idle_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    /// Reject configurations that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(CacheError::Config("pool_size must be at least 1".to_string()));
        }
        if self.storage.capacity == 0 || self.storage.capacity > MAX_STORAGE_CAPACITY {
            return Err(CacheError::Config(format!(
                "storage capacity out of range: {}",
                self.storage.capacity
            )));
        }
        if self.storage.string_pool_bytes == 0
            || self.storage.string_pool_bytes > MAX_STRING_POOL_BYTES
        {
            return Err(CacheError::Config(format!(
                "string pool size out of range: {}",
                self.storage.string_pool_bytes
            )));
        }
        if let ConnectionMode::Remote { token } = &self.mode {
            if token.is_empty() {
                return Err(CacheError::Config("remote mode requires a token".to_string()));
            }
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the cache server host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the cache server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the authentication mode
    pub fn mode(mut self, mode: ConnectionMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Set the per-request timeout (in milliseconds)
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set the maximum number of pooled connections
    pub fn pool_size(mut self, size: usize) -> Self {
        self.config.pool_size = size;
        self
    }

    /// Set the maximum connection lifetime (in milliseconds)
    pub fn max_lifetime_ms(mut self, ms: u64) -> Self {
        self.config.max_lifetime_ms = ms;
        self
    }

    /// Set the maximum connection idle time (in milliseconds)
    pub fn max_idle_ms(mut self, ms: u64) -> Self {
        self.config.max_idle_ms = ms;
        self
    }

    pub fn cleanup_interval_ms(mut self, ms: u64) -> Self {
        self.config.cleanup_interval_ms = ms;
        self
    }

    /// Set the cache backend
    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn ttl(mut self, ttl: TtlPolicy) -> Self {
        self.config.ttl = ttl;
        self
    }

    /// Set the hot/cold record capacity
    pub fn storage_capacity(mut self, capacity: usize) -> Self {
        self.config.storage.capacity = capacity;
        self
    }

    /// Set the string pool size (in bytes)
    pub fn string_pool_bytes(mut self, bytes: usize) -> Self {
        self.config.storage.string_pool_bytes = bytes;
        self
    }

    /// Set the reference server listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.server.listen_addr = addr.into();
        self
    }

    /// Set the reference server connection limit
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.server.max_connections = count;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
