//! newscache CLI Client
//!
//! Command-line interface for a newscache server.

use clap::{Parser, Subcommand};
use newscache::{CacheClient, Config, ConnectionMode};
use tracing_subscriber::{fmt, EnvFilter};

/// newscache CLI
#[derive(Parser, Debug)]
#[command(name = "newscache-cli")]
#[command(about = "CLI for the newscache server")]
#[command(version)]
struct Args {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value = "2003")]
    port: u16,

    /// Access token (remote mode)
    #[arg(short, long)]
    token: Option<String>,

    /// Request timeout in milliseconds
    #[arg(long, default_value = "5000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Check whether a key exists
    Exists {
        /// The key to check
        key: String,
    },

    /// Ping the server
    Ping,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args = Args::parse();

    let mode = match args.token {
        Some(token) => ConnectionMode::Remote { token },
        None => ConnectionMode::Embedded,
    };

    let config = Config::builder()
        .host(args.host)
        .port(args.port)
        .mode(mode)
        .timeout_ms(args.timeout_ms)
        .pool_size(1)
        .build();

    if let Err(e) = run(config, args.command) {
        eprintln!("(error) {}", e);
        std::process::exit(1);
    }
}

fn run(config: Config, command: Commands) -> newscache::Result<()> {
    let client = CacheClient::new(config)?;

    match command {
        Commands::Get { key } => match client.get(&key)? {
            Some(value) => println!("{}", String::from_utf8_lossy(&value)),
            None => println!("(nil)"),
        },
        Commands::Set { key, value } => {
            client.set(&key, value.as_bytes())?;
            println!("OK");
        }
        Commands::Del { key } => {
            client.delete(&key)?;
            println!("OK");
        }
        Commands::Exists { key } => {
            println!("{}", if client.exists(&key)? { 1 } else { 0 });
        }
        Commands::Ping => {
            client.ping()?;
            println!("PONG");
        }
    }

    client.shutdown();
    Ok(())
}
