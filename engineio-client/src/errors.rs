use http::StatusCode;

/// All the errors that the engine or its transports can produce.
///
/// Fatal transport errors are surfaced to the upstream client through
/// [`EngineClient::engine_did_error`](crate::handler::EngineClient::engine_did_error);
/// frame decoding errors are logged and the offending frame discarded.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid packet type: {0:?}")]
    InvalidPacketType(Option<char>),

    #[error("invalid payload framing")]
    InvalidPayload,

    #[error("error decoding base64 binary frame: {0:?}")]
    Base64(#[from] base64::DecodeError),

    #[error("error decoding utf-8 body: {0:?}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("error decoding handshake json: {0:?}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0:?}")]
    Http(#[from] hyper::Error),

    #[error("failed to build http request: {0:?}")]
    HttpRequest(#[from] http::Error),

    #[error("invalid header value: {0:?}")]
    HeaderValue(#[from] http::header::InvalidHeaderValue),

    #[error("bad http response status: {0}")]
    BadStatus(StatusCode),

    #[error("websocket error: {0:?}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("tls error: {0:?}")]
    Tls(#[from] native_tls::Error),

    #[error("unsupported url scheme: {0}")]
    UnsupportedScheme(String),
}
