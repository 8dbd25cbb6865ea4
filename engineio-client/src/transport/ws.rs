//! The websocket transport module connects the upgrade socket and pumps its
//! inbound messages into the engine task.
//!
//! The engine owns the write half of the stream; a spawned reader task owns
//! the read half and forwards every message as a [`Command`] so all state
//! stays on the engine task.

use futures::{stream::SplitSink, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async_tls_with_config,
    tungstenite::{client::IntoClientRequest, Message},
    Connector, MaybeTlsStream, WebSocketStream,
};
use url::Url;

use crate::{
    config::EngineConfig,
    engine::Command,
    errors::Error,
    transport::polling::{cookie_header, tls_connector},
};

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub(crate) type WsSink = SplitSink<WsStream, Message>;

/// Open the websocket, sending the configured cookies and extra headers with
/// the upgrade request.
pub(crate) async fn connect(url: &Url, config: &EngineConfig) -> Result<WsStream, Error> {
    let mut request = url.as_str().into_client_request()?;
    if !config.cookies.is_empty() {
        request
            .headers_mut()
            .insert(http::header::COOKIE, cookie_header(&config.cookies)?);
    }
    for (name, value) in &config.extra_headers {
        request.headers_mut().insert(name, value.clone());
    }
    let connector = Connector::NativeTls(tls_connector(config)?);
    let (ws, _res) = connect_async_tls_with_config(request, None, false, Some(connector)).await?;
    Ok(ws)
}

/// Connect in the background and feed the engine task.
///
/// Every event carries the connection generation it belongs to so that a
/// socket outliving a disconnect cannot touch the next connection.
pub(crate) fn spawn(
    url: Url,
    config: EngineConfig,
    generation: u64,
    tx: tokio::sync::mpsc::UnboundedSender<Command>,
) {
    tokio::spawn(async move {
        let stream = match connect(&url, &config).await {
            Ok(stream) => stream,
            Err(e) => {
                let _ = tx.send(Command::WsClosed(generation, Some(e.to_string())));
                return;
            }
        };
        let (sink, mut read) = stream.split();
        if tx.send(Command::WsOpened(generation, sink)).is_err() {
            return;
        }
        let mut error = None;
        while let Some(msg) = read.next().await {
            match msg {
                Ok(msg @ (Message::Text(_) | Message::Binary(_))) => {
                    if tx.send(Command::WsMessage(generation, msg)).is_err() {
                        return;
                    }
                }
                Ok(Message::Close(_)) => break,
                // Transport level ping/pong is answered by tungstenite itself.
                Ok(_) => {}
                Err(e) => {
                    error = Some(e.to_string());
                    break;
                }
            }
        }
        let _ = tx.send(Command::WsClosed(generation, error));
    });
}
