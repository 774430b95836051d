//! Client Connection
//!
//! One authenticated TCP session to the cache server. Strictly
//! request/response: every query blocks until its reply is read.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::config::{Config, ConnectionMode};
use crate::error::{CacheError, Result};
use crate::protocol::{read_packet, write_packet, PacketType, Value};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Creation and last-use timestamps
///
/// A connection is live while both its age and its idle time are strictly
/// below the configured limits.
#[derive(Debug, Clone, Copy)]
pub struct Lifecycle {
    created_at: Instant,
    last_used: Instant,
}

impl Lifecycle {
    pub fn new(now: Instant) -> Self {
        Self {
            created_at: now,
            last_used: now,
        }
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_used = now;
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    pub fn idle(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_used)
    }

    pub fn is_live_at(&self, now: Instant, max_lifetime: Duration, max_idle: Duration) -> bool {
        self.age(now) < max_lifetime && self.idle(now) < max_idle
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn last_used(&self) -> Instant {
        self.last_used
    }
}

/// Values returned by a successful query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    values: Vec<Value>,
}

impl QueryResponse {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn first(&self) -> Option<&Value> {
        self.values.first()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A single client session
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    id: u64,
    peer_addr: String,
    authenticated: bool,
    embedded: bool,

    /// Set after a transport/protocol failure; never reused afterwards
    broken: bool,

    lifecycle: Lifecycle,
    max_lifetime: Duration,
    max_idle: Duration,
}

impl Connection {
    /// Connect and authenticate using the given config
    pub fn open(config: &Config) -> Result<Self> {
        let address = config.address();
        let socket_addr = address
            .to_socket_addrs()
            .map_err(|e| CacheError::ConnectionFailed(format!("{}: {}", address, e)))?
            .next()
            .ok_or_else(|| CacheError::ConnectionFailed(format!("{}: no address", address)))?;

        let stream = if config.timeout_ms > 0 {
            TcpStream::connect_timeout(&socket_addr, config.timeout())
        } else {
            TcpStream::connect(socket_addr)
        }
        .map_err(|e| CacheError::ConnectionFailed(format!("{}: {}", address, e)))?;

        let mut conn = Self::from_stream(stream, config)?;
        conn.authenticate(&config.mode)?;

        tracing::debug!("Connection {} opened to {}", conn.id, conn.peer_addr);
        Ok(conn)
    }

    /// Wrap an already connected stream (not yet authenticated)
    pub fn from_stream(stream: TcpStream, config: &Config) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        if config.timeout_ms > 0 {
            stream.set_read_timeout(Some(config.timeout()))?;
            stream.set_write_timeout(Some(config.timeout()))?;
        }

        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            peer_addr,
            authenticated: false,
            embedded: false,
            broken: false,
            lifecycle: Lifecycle::new(Instant::now()),
            max_lifetime: config.max_lifetime(),
            max_idle: config.max_idle(),
        })
    }

    /// Authenticate the session
    ///
    /// Embedded mode skips authentication. Remote mode requires a token
    /// that passes `validate_token`.
    pub fn authenticate(&mut self, mode: &ConnectionMode) -> Result<()> {
        match mode {
            ConnectionMode::Embedded => {
                self.embedded = true;
                self.authenticated = true;
            }
            ConnectionMode::Remote { token } => {
                validate_token(token)?;
                self.authenticated = true;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Send a query and wait for its reply
    ///
    /// A `List` reply is returned as-is, a scalar reply is wrapped as a
    /// one-element response, and an `ErrorCode` becomes `CacheError::Query`.
    /// Transport and protocol failures mark the connection broken.
    pub fn query(&mut self, name: &str, params: Vec<Value>) -> Result<QueryResponse> {
        let result = self.round_trip(name, params);

        if let Err(e) = &result {
            if e.poisons_connection() {
                tracing::debug!("Connection {} marked broken: {}", self.id, e);
                self.broken = true;
            }
        }

        result
    }

    fn round_trip(&mut self, name: &str, params: Vec<Value>) -> Result<QueryResponse> {
        if !(self.authenticated || self.embedded) {
            return Err(CacheError::AuthenticationFailed(
                "connection is not authenticated".to_string(),
            ));
        }
        if self.broken {
            return Err(CacheError::ConnectionFailed(format!(
                "connection {} is broken",
                self.id
            )));
        }

        let body = Value::List(vec![Value::String(name.to_string()), Value::List(params)]);
        write_packet(&mut self.writer, PacketType::Query, &body)?;

        let (frame, reply) = read_packet(&mut self.reader)?;
        if frame.packet_type != PacketType::Response {
            return Err(CacheError::InvalidResponse(format!(
                "expected response packet, got {:?}",
                frame.packet_type
            )));
        }

        self.lifecycle.touch(Instant::now());
        tracing::trace!("Connection {} {} -> {:?}", self.id, name, reply.tag());

        match reply {
            Value::List(values) => Ok(QueryResponse::new(values)),
            Value::ErrorCode { code, message } => {
                tracing::warn!("Query {} failed on {}: [{}] {}", name, self.peer_addr, code, message);
                Err(CacheError::Query { code, message })
            }
            scalar => Ok(QueryResponse::new(vec![scalar])),
        }
    }

    /// Store a value
    pub fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        let response = self.query("SET", vec![Value::from(key), Value::from(value)])?;
        expect_ok(&response, "SET")
    }

    /// Fetch a value, `None` if absent
    pub fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        let response = self.query("GET", vec![Value::from(key)])?;
        match response.into_values().into_iter().next() {
            Some(Value::Binary(bytes)) => Ok(Some(bytes)),
            Some(Value::Null) | None => Ok(None),
            Some(other) => Err(self.unexpected("GET", &other)),
        }
    }

    /// Remove a value (absent keys are not an error)
    pub fn delete(&mut self, key: &str) -> Result<()> {
        let response = self.query("DEL", vec![Value::from(key)])?;
        expect_ok(&response, "DEL")
    }

    pub fn exists(&mut self, key: &str) -> Result<bool> {
        let response = self.query("EXISTS", vec![Value::from(key)])?;
        match response.first() {
            Some(Value::Bool(found)) => Ok(*found),
            Some(other) => Err(self.unexpected("EXISTS", other)),
            None => Err(self.unexpected("EXISTS", &Value::Null)),
        }
    }

    /// Health check
    pub fn ping(&mut self) -> Result<()> {
        let response = self.query("PING", Vec::new())?;
        match response.first() {
            Some(Value::String(s)) if s == "PONG" => Ok(()),
            Some(other) => Err(self.unexpected("PING", other)),
            None => Err(self.unexpected("PING", &Value::Null)),
        }
    }

    fn unexpected(&mut self, query: &str, value: &Value) -> CacheError {
        self.broken = true;
        CacheError::InvalidResponse(format!("{}: unexpected {:?} reply", query, value.tag()))
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Authenticated, not broken, and within lifetime and idle limits
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Instant::now())
    }

    pub fn is_valid_at(&self, now: Instant) -> bool {
        !self.broken
            && (self.authenticated || self.embedded)
            && self.lifecycle.is_live_at(now, self.max_lifetime, self.max_idle)
    }

    /// Force this connection to be discarded on release
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("authenticated", &self.authenticated)
            .field("broken", &self.broken)
            .finish()
    }
}

fn expect_ok(response: &QueryResponse, query: &str) -> Result<()> {
    match response.first() {
        Some(Value::ResponseCode(0)) => Ok(()),
        Some(Value::ResponseCode(code)) => Err(CacheError::Query {
            code: *code,
            message: format!("{} returned non-zero status", query),
        }),
        other => Err(CacheError::InvalidResponse(format!(
            "{}: unexpected {:?} reply",
            query,
            other.map(Value::tag)
        ))),
    }
}

/// Minimal token format check for remote mode
///
/// 8 to 512 characters of `[A-Za-z0-9._-]`.
pub fn validate_token(token: &str) -> Result<()> {
    if token.len() < 8 || token.len() > 512 {
        return Err(CacheError::AuthenticationFailed(format!(
            "token length {} outside 8..=512",
            token.len()
        )));
    }
    if !token
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
    {
        return Err(CacheError::AuthenticationFailed(
            "token contains invalid characters".to_string(),
        ));
    }
    Ok(())
}
