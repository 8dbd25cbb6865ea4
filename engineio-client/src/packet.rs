//! Engine.IO v3 packet types and their wire codecs.
//!
//! A packet travels either as one websocket message (`<type_digit><payload>`
//! for text, a single leading type byte followed by raw bytes for binary) or
//! inside an http polling payload, where binary data is base64 encoded and
//! prefixed with the `b4` marker.

use base64::{engine::general_purpose::STANDARD as b64, Engine};
use bytes::Bytes;
use serde::Deserialize;

use crate::errors::Error;

/// The framing byte prepended to binary websocket messages.
pub const BINARY_WS_FRAMING: u8 = 0x4;

/// The marker prefixing base64 binary frames inside a polling payload.
pub const BINARY_POLLING_MARKER: &str = "b4";

/// The raw Engine.IO packet type, as used when submitting a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Open = 0,
    Close = 1,
    Ping = 2,
    Pong = 3,
    Message = 4,
    Upgrade = 5,
    Noop = 6,
}

impl PacketKind {
    /// The wire digit for this packet type.
    pub fn digit(self) -> char {
        match self {
            PacketKind::Open => '0',
            PacketKind::Close => '1',
            PacketKind::Ping => '2',
            PacketKind::Pong => '3',
            PacketKind::Message => '4',
            PacketKind::Upgrade => '5',
            PacketKind::Noop => '6',
        }
    }

    /// Encode a text frame for this kind: `<type_digit><payload>`.
    pub fn encode(self, payload: &str) -> String {
        let mut out = String::with_capacity(payload.len() + 1);
        out.push(self.digit());
        out.push_str(payload);
        out
    }
}

/// A decoded Engine.IO packet.
///
/// The probe ping/pong used by the upgrade handshake are distinct variants:
/// they carry the fixed `probe` payload and route to the upgrade state
/// machine rather than to heartbeat accounting.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(OpenPacket),
    Close,
    Ping,
    Pong,
    PingProbe,
    PongProbe,
    Message(String),
    Upgrade,
    Noop,
    Binary(Bytes),
}

impl Packet {
    /// Encode a binary blob as a websocket message, framing byte included.
    pub fn encode_ws_binary(data: &Bytes) -> Vec<u8> {
        let mut framed = Vec::with_capacity(data.len() + 1);
        framed.push(BINARY_WS_FRAMING);
        framed.extend_from_slice(data);
        framed
    }

    /// Encode a binary blob as a polling frame: `b4` + base64.
    pub fn encode_polling_binary(data: &Bytes) -> String {
        format!("{}{}", BINARY_POLLING_MARKER, b64.encode(data))
    }

    /// Decode a websocket binary message, stripping the framing byte.
    pub fn decode_ws_binary(mut data: Vec<u8>) -> Option<Bytes> {
        if data.is_empty() {
            return None;
        }
        data.remove(0);
        Some(Bytes::from(data))
    }
}

/// Encode a packet as a single text frame, usable both as a websocket text
/// message and as a polling frame body. `Binary` encodes to its `b4` form.
impl TryFrom<Packet> for String {
    type Error = Error;
    fn try_from(packet: Packet) -> Result<Self, Self::Error> {
        match packet {
            // The open packet is only ever received, never sent by a client.
            Packet::Open(_) => Err(Error::InvalidPacketType(Some('0'))),
            Packet::Close => Ok("1".into()),
            Packet::Ping => Ok("2".into()),
            Packet::Pong => Ok("3".into()),
            Packet::PingProbe => Ok("2probe".into()),
            Packet::PongProbe => Ok("3probe".into()),
            Packet::Message(msg) => Ok(PacketKind::Message.encode(&msg)),
            Packet::Upgrade => Ok("5".into()),
            Packet::Noop => Ok("6".into()),
            Packet::Binary(data) => Ok(Packet::encode_polling_binary(&data)),
        }
    }
}

impl TryFrom<&str> for Packet {
    type Error = Error;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if let Some(encoded) = value.strip_prefix(BINARY_POLLING_MARKER) {
            let data = b64.decode(encoded)?;
            return Ok(Packet::Binary(Bytes::from(data)));
        }
        let mut chars = value.chars();
        let type_digit = chars.next().ok_or(Error::InvalidPacketType(None))?;
        let payload = chars.as_str();
        match type_digit {
            '0' => Ok(Packet::Open(serde_json::from_str(payload)?)),
            '1' => Ok(Packet::Close),
            '2' if payload == "probe" => Ok(Packet::PingProbe),
            '2' => Ok(Packet::Ping),
            '3' if payload == "probe" => Ok(Packet::PongProbe),
            '3' => Ok(Packet::Pong),
            '4' => Ok(Packet::Message(payload.to_string())),
            '5' => Ok(Packet::Upgrade),
            '6' => Ok(Packet::Noop),
            c => Err(Error::InvalidPacketType(Some(c))),
        }
    }
}

impl TryFrom<String> for Packet {
    type Error = Error;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Packet::try_from(value.as_str())
    }
}

/// The handshake data carried by the server's open packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPacket {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
}

/// An error object the server may send in place of a packet.
#[derive(Debug, Deserialize)]
pub(crate) struct ServerErrorPacket {
    pub message: String,
}

/// Re-encode a text payload as if its utf-8 bytes were latin-1 characters.
///
/// Historical Engine.IO v3 servers expect polling text to be double encoded
/// this way; [`decode_double_utf8`] is the inverse applied to inbound
/// polling frames.
pub(crate) fn encode_double_utf8(s: &str) -> String {
    s.bytes().map(char::from).collect()
}

/// Undo [`encode_double_utf8`]. Frames that are not valid double encoded
/// utf-8 are passed through untouched.
pub(crate) fn decode_double_utf8(s: &str) -> String {
    let bytes: Option<Vec<u8>> = s
        .chars()
        .map(|c| u8::try_from(u32::from(c)).ok())
        .collect();
    match bytes.map(String::from_utf8) {
        Some(Ok(decoded)) => decoded,
        _ => s.to_string(),
    }
}
