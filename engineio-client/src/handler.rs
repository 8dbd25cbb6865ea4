use bytes::Bytes;

/// The contract between the engine and the socket.io layer sitting above it.
///
/// The engine holds a shared reference to the client and invokes these
/// callbacks from its internal task; implementations should hand work off
/// quickly rather than block.
pub trait EngineClient: Send + Sync + 'static {
    /// One decoded engine.io message payload, type digit already stripped.
    fn parse_engine_message(&self, msg: &str);

    /// One raw binary payload, transport framing already stripped.
    fn parse_engine_binary_data(&self, data: Bytes);

    /// The engine received its session id and is ready for traffic.
    fn engine_did_open(&self, reason: &str);

    /// The engine is closed; no further callbacks will fire for this
    /// connection.
    fn engine_did_close(&self, reason: &str);

    /// A fatal transport or protocol error; the engine disconnects right
    /// after. Recoverable by reconnecting with a fresh `connect()`.
    fn engine_did_error(&self, reason: &str);
}
