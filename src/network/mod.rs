//! Network Module
//!
//! Reference cache server speaking the wire protocol.
//!
//! ## Architecture
//! - Single acceptor thread (non-blocking accept, polled shutdown flag)
//! - One thread per client connection
//! - Queries served from a shared in-memory `KvStore`

mod handler;
mod server;

pub use handler::{ConnectionHandler, KvStore};
pub use server::{Server, ServerHandle};
