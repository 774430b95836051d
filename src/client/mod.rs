//! Client Module
//!
//! Blocking cache client built from three layers:
//! - `Connection`: one authenticated TCP session (SET/GET/DEL/EXISTS/QUERY)
//! - `ConnectionPool`: bounded, lazily filled, swept for expired sessions
//! - `CacheClient`: one pooled connection per call
//!
//! Errors are never retried here; callers decide whether to retry with a
//! fresh connection (`Config::max_retries` is their budget).

mod cache_client;
mod connection;
mod pool;

pub use cache_client::CacheClient;
pub use connection::{validate_token, Connection, Lifecycle, QueryResponse};
pub use pool::{ConnectionPool, PoolStats, PoolSweeper, PooledConnection};
