//! High-level cache client
//!
//! Each operation checks out one pooled connection, performs its round
//! trip(s) and gives the connection back before returning, on success and
//! on error alike.

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;

use super::pool::{ConnectionPool, PoolStats, PoolSweeper};

/// Pooled key/value client
pub struct CacheClient {
    pool: Arc<ConnectionPool>,
    _sweeper: PoolSweeper,
}

impl CacheClient {
    /// Build a client. No connection is opened until the first call.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let pool = Arc::new(ConnectionPool::new(config));
        let sweeper = pool.start_sweeper();

        Ok(Self {
            pool,
            _sweeper: sweeper,
        })
    }

    /// Build a client and verify the server answers a ping
    pub fn connect(config: Config) -> Result<Self> {
        let client = Self::new(config)?;
        client.ping()?;
        Ok(client)
    }

    pub fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut conn = self.pool.acquire()?;
        conn.set(key, value)
    }

    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.pool.acquire()?;
        conn.get(key)
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.pool.acquire()?;
        conn.delete(key)
    }

    pub fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.pool.acquire()?;
        conn.exists(key)
    }

    /// Store several entries over one connection, one round trip each
    ///
    /// No rollback: entries written before a failure stay written.
    pub fn batch_set<K, V>(&self, entries: &[(K, V)]) -> Result<usize>
    where
        K: AsRef<str>,
        V: AsRef<[u8]>,
    {
        let mut conn = self.pool.acquire()?;
        for (key, value) in entries {
            conn.set(key.as_ref(), value.as_ref())?;
        }
        Ok(entries.len())
    }

    pub fn ping(&self) -> Result<()> {
        let mut conn = self.pool.acquire()?;
        conn.ping()
    }

    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Close pooled connections; later calls fail
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}
