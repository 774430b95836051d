//! Connection Pool
//!
//! Bounded set of `Connection`s shared by worker threads.
//!
//! ## Concurrency
//! - One mutex guards pool membership; it is held only to pop, push or
//!   reserve a slot. Connects and queries run outside it.
//! - A condvar is signalled whenever a connection or slot is given back,
//!   so `acquire_timeout` can wait without spinning. `acquire` never waits.
//! - A checked-out connection belongs to exactly one caller until its
//!   `PooledConnection` guard is dropped.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, select, Sender};
use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::config::Config;
use crate::error::{CacheError, Result};

use super::connection::Connection;

struct PoolState {
    /// Idle connections, most recently released last
    available: Vec<Connection>,

    /// Checked out + available + slots reserved for an in-flight connect
    total: usize,

    last_cleanup: Instant,
    closed: bool,
}

enum Checkout {
    Ready(Connection),
    Reserved,
    Exhausted,
}

/// Point-in-time pool statistics, derived on demand
///
/// Age and idle averages cover available connections only; checked-out
/// connections are owned by their callers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolStats {
    pub pool_size: usize,
    pub total: usize,
    pub available: usize,
    pub in_use: usize,
    pub valid: usize,
    pub average_age: Duration,
    pub average_idle: Duration,
}

/// Bounded, thread-safe connection pool
pub struct ConnectionPool {
    config: Config,
    state: Mutex<PoolState>,
    released: Condvar,
}

impl ConnectionPool {
    /// Create an empty pool. Connections are opened lazily.
    pub fn new(config: Config) -> Self {
        Self {
            state: Mutex::new(PoolState {
                available: Vec::with_capacity(config.pool_size),
                total: 0,
                last_cleanup: Instant::now(),
                closed: false,
            }),
            released: Condvar::new(),
            config,
        }
    }

    /// Check out a connection, opening one if the pool has room
    ///
    /// Fails fast with `PoolExhausted` when every slot is taken.
    pub fn acquire(self: &Arc<Self>) -> Result<PooledConnection> {
        let mut stale = Vec::new();
        let outcome = {
            let mut state = self.state.lock();
            self.checkout_locked(&mut state, &mut stale)?
        };
        close_stale(stale);

        match outcome {
            Checkout::Ready(conn) => Ok(self.guard(conn)),
            Checkout::Reserved => self.open_reserved().map(|conn| self.guard(conn)),
            Checkout::Exhausted => Err(CacheError::PoolExhausted {
                size: self.config.pool_size,
            }),
        }
    }

    /// Like `acquire`, but waits up to `wait` for a connection to be released
    pub fn acquire_timeout(self: &Arc<Self>, wait: Duration) -> Result<PooledConnection> {
        let deadline = Instant::now() + wait;
        let mut stale = Vec::new();
        let mut state = self.state.lock();

        loop {
            let outcome = self.checkout_locked(&mut state, &mut stale);
            if !stale.is_empty() {
                MutexGuard::unlocked(&mut state, || close_stale(std::mem::take(&mut stale)));
                // A release may have landed while unlocked
                if matches!(outcome, Ok(Checkout::Exhausted)) {
                    continue;
                }
            }

            match outcome? {
                Checkout::Ready(conn) => return Ok(self.guard(conn)),
                Checkout::Reserved => {
                    drop(state);
                    return self.open_reserved().map(|conn| self.guard(conn));
                }
                Checkout::Exhausted => {
                    if self.released.wait_until(&mut state, deadline).timed_out() {
                        return Err(CacheError::PoolExhausted {
                            size: self.config.pool_size,
                        });
                    }
                }
            }
        }
    }

    /// Expired connections popped along the way are moved into `stale` so
    /// the caller closes them after the lock is released.
    fn checkout_locked(&self, state: &mut PoolState, stale: &mut Vec<Connection>) -> Result<Checkout> {
        if state.closed {
            return Err(CacheError::ConnectionFailed("pool is shut down".to_string()));
        }

        while let Some(conn) = state.available.pop() {
            if conn.is_valid() {
                tracing::trace!("Reusing connection {}", conn.id());
                return Ok(Checkout::Ready(conn));
            }
            tracing::debug!("Destroying expired connection {}", conn.id());
            state.total -= 1;
            stale.push(conn);
        }

        if state.total >= self.config.pool_size {
            return Ok(Checkout::Exhausted);
        }

        // Reserve the slot; the connect itself happens outside the lock
        state.total += 1;
        Ok(Checkout::Reserved)
    }

    fn open_reserved(&self) -> Result<Connection> {
        match Connection::open(&self.config) {
            Ok(conn) => Ok(conn),
            Err(e) => {
                self.state.lock().total -= 1;
                self.released.notify_one();
                Err(e)
            }
        }
    }

    fn guard(self: &Arc<Self>, conn: Connection) -> PooledConnection {
        PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(self),
        }
    }

    /// Return a connection. Invalid connections are destroyed.
    pub fn release(&self, conn: Connection) {
        let mut state = self.state.lock();

        let destroyed = if state.closed || !conn.is_valid() {
            tracing::debug!("Destroying connection {} on release", conn.id());
            state.total -= 1;
            Some(conn)
        } else {
            state.available.push(conn);
            None
        };

        drop(state);
        drop(destroyed);
        self.released.notify_one();
    }

    /// Remove invalid idle connections
    ///
    /// Rate-limited to once per cleanup interval; returns how many were
    /// destroyed (0 when skipped).
    pub fn cleanup_expired_connections(&self) -> usize {
        let now = Instant::now();
        let expired = {
            let mut state = self.state.lock();
            if now.saturating_duration_since(state.last_cleanup) < self.config.cleanup_interval() {
                return 0;
            }
            state.last_cleanup = now;

            let (live, expired): (Vec<_>, Vec<_>) = std::mem::take(&mut state.available)
                .into_iter()
                .partition(|conn| conn.is_valid_at(now));
            state.available = live;
            state.total -= expired.len();
            expired
        };

        let removed = expired.len();
        close_stale(expired);

        if removed > 0 {
            tracing::debug!("Pool sweep removed {} expired connections", removed);
        }
        removed
    }

    /// Compute statistics
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        let now = Instant::now();

        let available = state.available.len();
        let valid = state
            .available
            .iter()
            .filter(|conn| conn.is_valid_at(now))
            .count();
        let (age_sum, idle_sum) = state.available.iter().fold(
            (Duration::ZERO, Duration::ZERO),
            |(age, idle), conn| (age + conn.lifecycle().age(now), idle + conn.lifecycle().idle(now)),
        );

        let average = |sum: Duration| {
            if available == 0 {
                Duration::ZERO
            } else {
                sum / available as u32
            }
        };

        PoolStats {
            pool_size: self.config.pool_size,
            total: state.total,
            available,
            in_use: state.total - available,
            valid,
            average_age: average(age_sum),
            average_idle: average(idle_sum),
        }
    }

    /// Close idle connections and reject further acquires
    ///
    /// Connections still checked out are destroyed when released.
    pub fn shutdown(&self) {
        let drained = {
            let mut state = self.state.lock();
            state.closed = true;
            let drained = std::mem::take(&mut state.available);
            state.total -= drained.len();
            drained
        };

        tracing::debug!("Pool shut down, closed {} idle connections", drained.len());
        drop(drained);
        self.released.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Start a thread that sweeps expired connections every cleanup interval
    ///
    /// The thread stops when the returned `PoolSweeper` is dropped or the
    /// pool itself is dropped.
    pub fn start_sweeper(self: &Arc<Self>) -> PoolSweeper {
        let interval = self.config.cleanup_interval().max(Duration::from_millis(1));
        let pool: Weak<ConnectionPool> = Arc::downgrade(self);
        let (stop_tx, stop_rx) = channel::bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("newscache-pool-sweeper".to_string())
            .spawn(move || {
                let ticker = channel::tick(interval);
                loop {
                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => match pool.upgrade() {
                            Some(pool) => {
                                pool.cleanup_expired_connections();
                            }
                            None => break,
                        },
                    }
                }
            });

        match handle {
            Ok(handle) => PoolSweeper {
                stop: Some(stop_tx),
                handle: Some(handle),
            },
            Err(e) => {
                tracing::warn!("Could not start pool sweeper: {}", e);
                PoolSweeper {
                    stop: None,
                    handle: None,
                }
            }
        }
    }
}

/// Background sweeper handle; stops the thread on drop
pub struct PoolSweeper {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Drop for PoolSweeper {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Close connections taken out of the pool; always called without the lock held
fn close_stale(conns: Vec<Connection>) {
    drop(conns);
}

/// A checked-out connection, returned to its pool on drop
///
/// Release happens on every exit path, including early returns and panics.
pub struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<ConnectionPool>,
}

impl PooledConnection {
    /// Destroy the connection instead of returning it
    pub fn discard(mut self) {
        if let Some(conn) = self.conn.as_mut() {
            conn.mark_broken();
        }
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().expect("connection already released")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("connection already released")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}
