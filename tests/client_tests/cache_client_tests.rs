//! Tests for CacheClient and the reference server
//!
//! These tests verify:
//! - SET/GET/DEL/EXISTS/PING round trips
//! - Batch writes over one connection
//! - Error replies surface as query errors without poisoning the pool
//! - Connection limits on the server side

use std::io::{BufReader, BufWriter, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;

use newscache::client::{CacheClient, Connection};
use newscache::config::{Config, ServerConfig};
use newscache::network::{Server, ServerHandle};
use newscache::protocol::{
    error_codes, read_packet, write_packet, PacketType, Value, MAX_PAYLOAD_SIZE, PROTOCOL_VERSION,
};
use newscache::CacheError;

// =============================================================================
// Helper Functions
// =============================================================================

fn start_server(max_connections: usize) -> (SocketAddr, ServerHandle) {
    let server = Server::bind(ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        max_connections,
    })
    .unwrap();
    let (addr, handle, _join) = server.spawn().unwrap();
    (addr, handle)
}

fn config_for(addr: SocketAddr) -> Config {
    Config::builder()
        .host(addr.ip().to_string())
        .port(addr.port())
        .pool_size(4)
        .timeout_ms(2_000)
        .build()
}

// =============================================================================
// Basic Operation Tests
// =============================================================================

#[test]
fn test_set_get_delete() {
    let (addr, server) = start_server(16);
    let client = CacheClient::connect(config_for(addr)).unwrap();

    client.set("news:1", b"payload").unwrap();
    assert_eq!(client.get("news:1").unwrap(), Some(b"payload".to_vec()));
    assert!(client.exists("news:1").unwrap());

    client.delete("news:1").unwrap();
    assert_eq!(client.get("news:1").unwrap(), None);
    assert!(!client.exists("news:1").unwrap());

    server.shutdown();
}

#[test]
fn test_overwrite_replaces_value() {
    let (addr, server) = start_server(16);
    let client = CacheClient::connect(config_for(addr)).unwrap();

    client.set("k", b"one").unwrap();
    client.set("k", b"two").unwrap();
    assert_eq!(client.get("k").unwrap(), Some(b"two".to_vec()));

    server.shutdown();
}

#[test]
fn test_delete_missing_key_is_ok() {
    let (addr, server) = start_server(16);
    let client = CacheClient::connect(config_for(addr)).unwrap();

    assert!(client.delete("never-set").is_ok());

    server.shutdown();
}

#[test]
fn test_binary_values_survive() {
    let (addr, server) = start_server(16);
    let client = CacheClient::connect(config_for(addr)).unwrap();

    let value: Vec<u8> = (0..=255u8).cycle().take(100_000).collect();
    client.set("blob", &value).unwrap();
    assert_eq!(client.get("blob").unwrap(), Some(value));

    server.shutdown();
}

#[test]
fn test_batch_set() {
    let (addr, server) = start_server(16);
    let client = CacheClient::connect(config_for(addr)).unwrap();

    let entries: Vec<(String, Vec<u8>)> = (0..20)
        .map(|i| (format!("batch:{}", i), format!("value-{}", i).into_bytes()))
        .collect();

    assert_eq!(client.batch_set(&entries).unwrap(), 20);
    for (key, value) in &entries {
        assert_eq!(client.get(key).unwrap().as_ref(), Some(value));
    }
    assert_eq!(client.pool_stats().total, 1);

    server.shutdown();
}

// =============================================================================
// Pool Interaction Tests
// =============================================================================

#[test]
fn test_operations_return_connections() {
    let (addr, server) = start_server(16);
    let client = CacheClient::connect(config_for(addr)).unwrap();

    for i in 0..50 {
        client.set(&format!("k{}", i), b"v").unwrap();
    }

    let stats = client.pool_stats();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.in_use, 0);

    server.shutdown();
}

#[test]
fn test_concurrent_clients_share_pool() {
    let (addr, server) = start_server(32);
    let client = Arc::new(CacheClient::connect(config_for(addr)).unwrap());

    let workers: Vec<_> = (0..4)
        .map(|w| {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                for i in 0..50 {
                    let key = format!("w{}:{}", w, i);
                    client.set(&key, key.as_bytes()).unwrap();
                    assert_eq!(client.get(&key).unwrap(), Some(key.clone().into_bytes()));
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
    assert!(client.pool_stats().total <= 4);

    server.shutdown();
}

#[test]
fn test_connect_fails_without_server() {
    let (addr, server) = start_server(16);
    server.shutdown();
    // Give the accept loop time to notice
    thread::sleep(std::time::Duration::from_millis(50));

    let result = CacheClient::connect(config_for(addr));
    assert!(result.is_err());
}

#[test]
fn test_client_shutdown() {
    let (addr, server) = start_server(16);
    let client = CacheClient::connect(config_for(addr)).unwrap();

    client.shutdown();
    assert!(matches!(client.get("k"), Err(CacheError::ConnectionFailed(_))));

    server.shutdown();
}

// =============================================================================
// Connection / Server Protocol Tests
// =============================================================================

#[test]
fn test_unknown_query_returns_error_code() {
    let (addr, server) = start_server(16);
    let mut conn = Connection::open(&config_for(addr)).unwrap();

    match conn.query("FLUSHALL", vec![]) {
        Err(CacheError::Query { code, .. }) => assert_eq!(code, error_codes::UNKNOWN_QUERY),
        other => panic!("Expected query error, got {:?}", other),
    }

    // A server-side error does not break the connection
    assert!(conn.is_valid());
    conn.ping().unwrap();

    server.shutdown();
}

#[test]
fn test_wrong_params_returns_error_code() {
    let (addr, server) = start_server(16);
    let mut conn = Connection::open(&config_for(addr)).unwrap();

    match conn.query("GET", vec![Value::UInt8(1)]) {
        Err(CacheError::Query { code, .. }) => assert_eq!(code, error_codes::BAD_PARAMS),
        other => panic!("Expected query error, got {:?}", other),
    }

    server.shutdown();
}

#[test]
fn test_query_returns_scalar_as_single_value() {
    let (addr, server) = start_server(16);
    let mut conn = Connection::open(&config_for(addr)).unwrap();

    let response = conn.query("PING", vec![]).unwrap();
    assert_eq!(response.len(), 1);
    assert_eq!(response.first(), Some(&Value::String("PONG".to_string())));

    server.shutdown();
}

#[test]
fn test_response_packet_as_query_is_malformed() {
    let (addr, server) = start_server(16);
    let stream = TcpStream::connect(addr).unwrap();
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut writer = BufWriter::new(stream);

    write_packet(&mut writer, PacketType::Response, &Value::Null).unwrap();
    let (frame, reply) = read_packet(&mut reader).unwrap();

    assert_eq!(frame.packet_type, PacketType::Response);
    assert!(matches!(
        reply,
        Value::ErrorCode { code, .. } if code == error_codes::MALFORMED
    ));

    server.shutdown();
}

#[test]
fn test_deeply_nested_query_is_malformed() {
    let (addr, server) = start_server(16);
    let stream = TcpStream::connect(addr).unwrap();
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut writer = stream;

    let depth = 50_000;
    let mut payload = Vec::with_capacity(depth * 5 + 1);
    for _ in 0..depth {
        payload.extend_from_slice(&[0x20, 0, 0, 0, 1]);
    }
    payload.push(0x00);

    let mut packet = vec![PROTOCOL_VERSION, PacketType::Query as u8, 0];
    packet.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    packet.extend_from_slice(&payload);
    writer.write_all(&packet).unwrap();

    let (_, reply) = read_packet(&mut reader).unwrap();
    assert!(matches!(
        reply,
        Value::ErrorCode { code, .. } if code == error_codes::MALFORMED
    ));

    // The server keeps serving other clients
    let client = CacheClient::connect(config_for(addr)).unwrap();
    client.ping().unwrap();

    server.shutdown();
}

#[test]
fn test_oversized_value_fails_before_sending() {
    let (addr, server) = start_server(16);
    let client = CacheClient::connect(config_for(addr)).unwrap();

    let value = vec![0u8; MAX_PAYLOAD_SIZE as usize];
    let err = client.set("huge", &value).unwrap_err();
    assert!(matches!(err, CacheError::PayloadTooLarge { .. }));

    // The connection was never written to, so it goes back to the pool
    client.set("small", b"ok").unwrap();
    assert_eq!(client.get("small").unwrap(), Some(b"ok".to_vec()));
    assert_eq!(client.pool_stats().total, 1);

    server.shutdown();
}

#[test]
fn test_server_rejects_over_limit() {
    let (addr, server) = start_server(1);

    let mut first = Connection::open(&config_for(addr)).unwrap();
    first.ping().unwrap();

    let stream = TcpStream::connect(addr).unwrap();
    let mut reader = BufReader::new(stream);
    let (_, reply) = read_packet(&mut reader).unwrap();
    assert!(matches!(
        reply,
        Value::ErrorCode { code, .. } if code == error_codes::BUSY
    ));

    server.shutdown();
}
