//! Engine.IO v3 client transport core.
//!
//! One [`Engine`] owns one logical connection to an Engine.IO server. It
//! handshakes over http long-polling, probes the websocket upgrade when the
//! server offers it and switches all traffic over without reordering user
//! writes, while keeping the bidirectional heartbeat that detects dead
//! connections.
//!
//! The socket.io packet layer sits above this crate and receives decoded
//! payloads through the [`EngineClient`] callbacks:
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use engineio_client::{Engine, EngineClient, EngineConfig};
//! use url::Url;
//!
//! struct Printer;
//!
//! impl EngineClient for Printer {
//!     fn parse_engine_message(&self, msg: &str) {
//!         println!("message: {msg}");
//!     }
//!     fn parse_engine_binary_data(&self, data: Bytes) {
//!         println!("binary: {} bytes", data.len());
//!     }
//!     fn engine_did_open(&self, reason: &str) {
//!         println!("open: {reason}");
//!     }
//!     fn engine_did_close(&self, reason: &str) {
//!         println!("close: {reason}");
//!     }
//!     fn engine_did_error(&self, reason: &str) {
//!         println!("error: {reason}");
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let url = Url::parse("http://localhost:8080").unwrap();
//!     let engine = Engine::new(url, EngineConfig::default(), Arc::new(Printer)).unwrap();
//!     engine.connect();
//!     engine.send("hello", vec![]);
//! }
//! ```

pub mod config;
pub mod errors;
pub mod handler;
pub mod packet;
pub mod transport;

mod engine;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use engine::{Engine, EngineState};
pub use errors::Error;
pub use handler::EngineClient;
pub use packet::{OpenPacket, Packet, PacketKind};
pub use transport::TransportType;

/// Well known reason strings passed to the [`EngineClient`] callbacks.
pub mod reason {
    /// The engine opened and holds a valid session id.
    pub const CONNECT: &str = "Connect";
    /// Plain closure, locally requested or server initiated.
    pub const DISCONNECT: &str = "Disconnect";
    /// The previous session is being replaced by a new `connect()`.
    pub const RECONNECT: &str = "reconnect";
    /// Too many heartbeats went unanswered.
    pub const PING_TIMEOUT: &str = "Ping timeout";
}
