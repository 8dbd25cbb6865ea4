//! The two client transports and their shared type tag.

use std::fmt;

pub mod polling;
pub mod ws;

/// The transport currently carrying the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportType {
    Polling,
    Websocket,
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportType::Polling => f.write_str("polling"),
            TransportType::Websocket => f.write_str("websocket"),
        }
    }
}
