//! TCP Server
//!
//! Accepts connections and serves each on its own thread.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::protocol::{error_codes, write_packet, PacketType, Value};

use super::handler::{ConnectionHandler, KvStore};

/// Poll interval of the non-blocking accept loop
const ACCEPT_POLL: Duration = Duration::from_millis(10);

/// Reference cache server
pub struct Server {
    config: ServerConfig,
    listener: TcpListener,
    store: Arc<KvStore>,
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
}

/// Cloneable handle for stopping a running server
#[derive(Debug, Clone)]
pub struct ServerHandle {
    shutdown: Arc<AtomicBool>,
}

impl ServerHandle {
    /// Signal the server to stop accepting connections
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

impl Server {
    /// Bind the listen address. Port 0 picks a free port.
    pub fn bind(config: ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            listener,
            store: Arc::new(KvStore::new()),
            shutdown: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shutdown: Arc::clone(&self.shutdown),
        }
    }

    pub fn store(&self) -> &Arc<KvStore> {
        &self.store
    }

    /// Accept connections until shut down (blocking)
    pub fn run(&self) -> Result<()> {
        tracing::info!("Listening on {}", self.local_addr()?);

        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, addr)) => self.dispatch(stream, addr),
                Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
                Err(e) => tracing::warn!("Accept failed: {}", e),
            }
        }

        tracing::info!("Server stopped accepting connections");
        Ok(())
    }

    /// Start `run` on a background thread
    pub fn spawn(self) -> Result<(SocketAddr, ServerHandle, thread::JoinHandle<Result<()>>)> {
        let addr = self.local_addr()?;
        let handle = self.handle();
        let join = thread::Builder::new()
            .name("newscache-server".to_string())
            .spawn(move || self.run())?;
        Ok((addr, handle, join))
    }

    fn dispatch(&self, mut stream: TcpStream, addr: SocketAddr) {
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!("Dropping {}: {}", addr, e);
            return;
        }

        if self.active.load(Ordering::SeqCst) >= self.config.max_connections {
            tracing::warn!("Rejecting {}: connection limit reached", addr);
            let busy = Value::error(error_codes::BUSY, "too many connections");
            let _ = write_packet(&mut stream, PacketType::Response, &busy);
            return;
        }

        let store = Arc::clone(&self.store);
        let active = Arc::clone(&self.active);
        active.fetch_add(1, Ordering::SeqCst);

        let spawned = thread::Builder::new()
            .name(format!("newscache-conn-{}", addr))
            .spawn(move || {
                match ConnectionHandler::new(stream, store) {
                    Ok(mut handler) => {
                        if let Err(e) = handler.handle() {
                            tracing::debug!("Connection {} closed with error: {}", addr, e);
                        }
                    }
                    Err(e) => tracing::warn!("Could not set up connection {}: {}", addr, e),
                }
                active.fetch_sub(1, Ordering::SeqCst);
            });

        if let Err(e) = spawned {
            tracing::warn!("Could not spawn handler for {}: {}", addr, e);
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
