//! Connection Handler
//!
//! Serves queries for one client connection.

use std::collections::HashMap;
use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{CacheError, Result};
use crate::protocol::{decode_query, error_codes, read_packet, write_packet, PacketType, Value};

/// In-memory key/value map served by the reference server
#[derive(Debug, Default)]
pub struct KvStore {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl KvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Run one query against the map
    pub fn execute(&self, name: &str, params: Vec<Value>) -> Value {
        match (name.to_ascii_uppercase().as_str(), params.as_slice()) {
            ("SET", [Value::String(key), value]) => match value.as_bytes() {
                Some(bytes) => {
                    self.data.write().insert(key.clone(), bytes.to_vec());
                    Value::ResponseCode(0)
                }
                None => Value::error(error_codes::BAD_PARAMS, "SET value must be binary or string"),
            },
            ("GET", [Value::String(key)]) => match self.data.read().get(key) {
                Some(bytes) => Value::Binary(bytes.clone()),
                None => Value::Null,
            },
            ("DEL", [Value::String(key)]) => {
                self.data.write().remove(key);
                Value::ResponseCode(0)
            }
            ("EXISTS", [Value::String(key)]) => Value::Bool(self.data.read().contains_key(key)),
            ("PING", []) => Value::String("PONG".to_string()),
            ("SET" | "GET" | "DEL" | "EXISTS" | "PING", _) => Value::error(
                error_codes::BAD_PARAMS,
                format!("wrong parameters for {}", name),
            ),
            _ => Value::error(error_codes::UNKNOWN_QUERY, format!("unknown query: {}", name)),
        }
    }
}

/// Handles a single client connection
pub struct ConnectionHandler {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    store: Arc<KvStore>,

    /// Peer address for logging
    peer_addr: String,
}

impl ConnectionHandler {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, store: Arc<KvStore>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            store,
            peer_addr,
        })
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads queries in a loop and sends replies. Returns when the client
    /// disconnects or sends something unparseable.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let (frame, body) = match read_packet(&mut self.reader) {
                Ok(packet) => packet,
                Err(CacheError::Network(ref e))
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::UnexpectedEof
                            | std::io::ErrorKind::ConnectionReset
                            | std::io::ErrorKind::ConnectionAborted
                    ) =>
                {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(CacheError::Timeout(_)) => {
                    tracing::debug!("Read timeout for client {}", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    // Stream position is unknown now; reply once and close
                    let _ = self.reply(&Value::error(error_codes::MALFORMED, e.to_string()));
                    return Err(e);
                }
            };

            let reply = if frame.packet_type != PacketType::Query {
                Value::error(error_codes::MALFORMED, "expected a query packet")
            } else {
                match decode_query(body) {
                    Ok((name, params)) => {
                        tracing::trace!("{} from {}", name, self.peer_addr);
                        self.store.execute(&name, params)
                    }
                    Err(e) => Value::error(error_codes::MALFORMED, e.to_string()),
                }
            };

            if let Err(e) = self.reply(&reply) {
                if let CacheError::Network(ref io_err) = e {
                    match io_err.kind() {
                        std::io::ErrorKind::ConnectionAborted
                        | std::io::ErrorKind::ConnectionReset
                        | std::io::ErrorKind::BrokenPipe => {
                            tracing::debug!(
                                "Client {} disconnected before reply could be sent: {}",
                                self.peer_addr,
                                e
                            );
                            return Ok(());
                        }
                        _ => {}
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    fn reply(&mut self, value: &Value) -> Result<()> {
        write_packet(&mut self.writer, PacketType::Response, value)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
