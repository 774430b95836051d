//! newscache Server Binary
//!
//! Starts the reference cache server.

use clap::Parser;
use newscache::config::ServerConfig;
use newscache::network::Server;
use tracing_subscriber::{fmt, EnvFilter};

/// newscache Server
#[derive(Parser, Debug)]
#[command(name = "newscache-server")]
#[command(about = "Reference cache server for newscache clients")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:2003")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "256")]
    max_connections: usize,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,newscache=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("newscache Server v{}", newscache::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    let config = ServerConfig {
        listen_addr: args.listen,
        max_connections: args.max_connections,
    };

    let server = match Server::bind(config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
