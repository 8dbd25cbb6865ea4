//! The engine owns one logical connection to an Engine.IO v3 server.
//!
//! It starts on http long-polling, probes the websocket upgrade advertised by
//! the server's open packet and, once the `2probe`/`3probe` exchange
//! succeeds, atomically switches all traffic to the websocket while
//! preserving the order of user writes issued in the meantime.
//!
//! All mutable state lives on a single task fed by a FIFO command channel:
//! user operations and network completions are commands, so write ordering
//! and inbound delivery ordering follow from the channel itself. Spawned
//! requests and sockets are stamped with the connection generation they
//! belong to; completions from a previous generation are dropped.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, RwLock,
};
use std::time::Duration;

use bytes::Bytes;
use futures::SinkExt;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::{
    config::EngineConfig,
    errors::Error,
    handler::EngineClient,
    packet::{self, OpenPacket, Packet, PacketKind, ServerErrorPacket},
    reason,
    transport::{
        polling::{self, payload, HttpClient},
        ws::{self, WsSink},
        TransportType,
    },
};

/// Everything processed by the engine task, in FIFO order.
pub(crate) enum Command {
    Connect,
    Disconnect(String),
    Write(String, PacketKind, Vec<Bytes>),
    /// The handle was dropped; close out and stop the task.
    Shutdown,
    PingTick(u64),
    PollResult(u64, Result<String, Error>),
    PostResult(u64, Result<(), Error>),
    WsOpened(u64, WsSink),
    WsMessage(u64, Message),
    WsClosed(u64, Option<String>),
}

/// Connection state shared between the [`Engine`] handle and its task.
///
/// The flags are plain atomics so they stay observable from outside the
/// engine task, e.g. by the socket.io layer deciding whether to reconnect.
#[derive(Debug, Default)]
pub struct EngineState {
    connected: AtomicBool,
    closed: AtomicBool,
    invalidated: AtomicBool,
    polling: AtomicBool,
    websocket: AtomicBool,
    probing: AtomicBool,
    fast_upgrade: AtomicBool,
    generation: AtomicU64,
    sid: RwLock<String>,
}

macro_rules! flag {
    ($get:ident, $set:ident) => {
        pub fn $get(&self) -> bool {
            self.$get.load(Ordering::SeqCst)
        }
        pub(crate) fn $set(&self, value: bool) {
            self.$get.store(value, Ordering::SeqCst);
        }
    };
}

impl EngineState {
    flag!(connected, set_connected);
    flag!(closed, set_closed);
    flag!(invalidated, set_invalidated);
    flag!(polling, set_polling);
    flag!(websocket, set_websocket);
    flag!(probing, set_probing);
    flag!(fast_upgrade, set_fast_upgrade);

    /// The session id issued by the server, empty while disconnected.
    pub fn sid(&self) -> String {
        match self.sid.read() {
            Ok(sid) => sid.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub(crate) fn set_sid(&self, sid: &str) {
        let mut guard = match self.sid.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clear();
        guard.push_str(sid);
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn reset(&self) {
        self.set_closed(false);
        self.set_connected(false);
        self.set_fast_upgrade(false);
        self.set_polling(true);
        self.set_probing(false);
        self.set_invalidated(false);
        self.set_websocket(false);
        self.set_sid("");
    }
}

/// Handle to one logical Engine.IO connection.
///
/// Operations are posted to the engine task and return immediately; results
/// surface through the [`EngineClient`] callbacks. Dropping the handle closes
/// the connection.
pub struct Engine {
    tx: UnboundedSender<Command>,
    state: Arc<EngineState>,
}

impl Engine {
    /// Create an engine for the given base url.
    ///
    /// Must be called within a tokio runtime; the engine task is spawned
    /// immediately but does nothing until [`connect`](Engine::connect).
    pub fn new(
        url: Url,
        config: EngineConfig,
        client: Arc<dyn EngineClient>,
    ) -> Result<Self, Error> {
        match url.scheme() {
            "http" | "https" | "ws" | "wss" => {}
            other => return Err(Error::UnsupportedScheme(other.to_string())),
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(EngineState::default());
        let task = EngineTask::new(url, config, client, state.clone(), tx.clone(), rx);
        tokio::spawn(task.run());
        Ok(Self { tx, state })
    }

    /// Open the connection. When already connected this reconnects from
    /// scratch, closing the previous session with reason `reconnect`.
    pub fn connect(&self) {
        let _ = self.tx.send(Command::Connect);
    }

    /// Close the connection, sending a close packet to the server when one is
    /// established.
    pub fn disconnect(&self, reason: &str) {
        let _ = self.tx.send(Command::Disconnect(reason.to_string()));
    }

    /// Send one packet, optionally followed by binary attachments.
    ///
    /// Writes submitted in order are transmitted in that order on the current
    /// transport, including across a transport upgrade.
    pub fn write(&self, msg: impl Into<String>, kind: PacketKind, data: Vec<Bytes>) {
        let _ = self.tx.send(Command::Write(msg.into(), kind, data));
    }

    /// Send one message packet with binary attachments.
    pub fn send(&self, msg: impl Into<String>, data: Vec<Bytes>) {
        self.write(msg, PacketKind::Message, data);
    }

    /// The shared connection state.
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn connected(&self) -> bool {
        self.state.connected()
    }

    pub fn closed(&self) -> bool {
        self.state.closed()
    }

    pub fn polling(&self) -> bool {
        self.state.polling()
    }

    pub fn websocket(&self) -> bool {
        self.state.websocket()
    }

    pub fn probing(&self) -> bool {
        self.state.probing()
    }

    pub fn invalidated(&self) -> bool {
        self.state.invalidated()
    }

    pub fn sid(&self) -> String {
        self.state.sid()
    }

    /// The transport currently carrying the connection.
    pub fn transport(&self) -> TransportType {
        if self.state.websocket() {
            TransportType::Websocket
        } else {
            TransportType::Polling
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let _ = self.tx.send(Command::Shutdown);
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// A user write deferred while the upgrade probe is pending.
struct ProbeWait {
    msg: String,
    kind: PacketKind,
    data: Vec<Bytes>,
}

struct EngineTask {
    config: EngineConfig,
    client: Arc<dyn EngineClient>,
    state: Arc<EngineState>,
    tx: UnboundedSender<Command>,
    rx: UnboundedReceiver<Command>,
    url_polling: Url,
    url_websocket: Url,
    /// The http session; rebuilt on every connect, dropped on close so no
    /// new request can be issued afterwards.
    http: Option<HttpClient>,
    ws_tx: Option<WsSink>,
    post_wait: Vec<String>,
    probe_wait: Vec<ProbeWait>,
    waiting_for_poll: bool,
    waiting_for_post: bool,
    generation: u64,
    ping_interval: Duration,
    ping_timeout: Duration,
    pongs_missed: u32,
    pongs_missed_max: u32,
}

impl EngineTask {
    fn new(
        url: Url,
        config: EngineConfig,
        client: Arc<dyn EngineClient>,
        state: Arc<EngineState>,
        tx: UnboundedSender<Command>,
        rx: UnboundedReceiver<Command>,
    ) -> Self {
        let url_polling = transport_url(&url, &config, TransportType::Polling);
        let url_websocket = transport_url(&url, &config, TransportType::Websocket);
        Self {
            config,
            client,
            state,
            tx,
            rx,
            url_polling,
            url_websocket,
            http: None,
            ws_tx: None,
            post_wait: Vec::new(),
            probe_wait: Vec::new(),
            waiting_for_poll: false,
            waiting_for_post: false,
            generation: 0,
            ping_interval: Duration::from_secs(25),
            ping_timeout: Duration::from_secs(60),
            pongs_missed: 0,
            pongs_missed_max: 0,
        }
    }

    async fn run(mut self) {
        // The task holds its own sender for network completions, so the
        // channel never closes by itself; the handle's drop posts Shutdown.
        while let Some(command) = self.rx.recv().await {
            if let Command::Shutdown = command {
                if self.state.connected() {
                    self.disconnect(reason::DISCONNECT).await;
                }
                break;
            }
            self.handle_command(command).await;
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Shutdown => {}
            Command::Connect => self.connect().await,
            Command::Disconnect(reason) => self.disconnect(&reason).await,
            Command::Write(msg, kind, data) => self.write(msg, kind, data).await,
            Command::PingTick(generation) => {
                if self.is_current(generation) {
                    self.send_ping().await;
                }
            }
            Command::PollResult(generation, result) => {
                if self.is_current(generation) {
                    self.handle_poll_result(result).await;
                }
            }
            Command::PostResult(generation, result) => {
                if self.is_current(generation) {
                    self.handle_post_result(result).await;
                }
            }
            Command::WsOpened(generation, sink) => {
                if self.is_current(generation) {
                    self.websocket_did_connect(sink).await;
                } else {
                    // A socket from a previous generation; close it out.
                    tokio::spawn(async move {
                        let mut sink = sink;
                        sink.close().await.ok();
                    });
                }
            }
            Command::WsMessage(generation, message) => {
                if self.is_current(generation) {
                    self.websocket_did_receive(message).await;
                }
            }
            Command::WsClosed(generation, error) => {
                if self.is_current(generation) {
                    self.websocket_did_disconnect(error).await;
                }
            }
        }
    }

    /// Completions stamped with an older generation, or arriving after the
    /// session was invalidated, are no-ops.
    fn is_current(&self, generation: u64) -> bool {
        generation == self.generation && !self.state.invalidated()
    }

    // ===== Lifecycle =====

    async fn connect(&mut self) {
        if self.state.connected() {
            self.disconnect(reason::RECONNECT).await;
        }
        if let Err(e) = self.reset_engine() {
            self.did_error(&e.to_string()).await;
            return;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("engine connecting to {}", self.url_polling);
        if self.config.force_websockets {
            self.state.set_polling(false);
            self.state.set_websocket(true);
            self.connect_websocket();
            return;
        }
        // The handshake GET carries no sid and bypasses the do_poll guards.
        let url = self.url_polling.clone();
        self.do_long_poll(url);
    }

    fn reset_engine(&mut self) -> Result<(), Error> {
        self.state.reset();
        self.generation = self.state.bump_generation();
        self.waiting_for_poll = false;
        self.waiting_for_post = false;
        self.post_wait.clear();
        self.probe_wait.clear();
        self.pongs_missed = 0;
        self.ws_tx = None;
        self.http = Some(polling::http_client(&self.config)?);
        Ok(())
    }

    async fn disconnect(&mut self, reason: &str) {
        #[cfg(feature = "tracing")]
        tracing::debug!("engine is being closed: {reason}");
        if self.state.closed() {
            self.close_out_engine();
            self.client.engine_did_close(reason);
            return;
        }
        if !self.state.connected() {
            self.close_out_engine();
            return;
        }
        if self.state.websocket() {
            self.send_websocket_message("", PacketKind::Close, &[]).await;
        } else {
            self.disconnect_polling();
        }
        self.close_out_engine();
        self.client.engine_did_close(reason);
    }

    /// The close packet jumps the queue guard so it goes out even when a post
    /// is already in flight; its completion lands in a dead generation.
    fn disconnect_polling(&mut self) {
        self.post_wait.push(PacketKind::Close.encode(""));
        let body = payload::encode(&self.post_wait);
        self.post_wait.clear();
        self.spawn_post(body);
    }

    async fn did_error(&mut self, reason: &str) {
        #[cfg(feature = "tracing")]
        tracing::error!("engine error: {reason}");
        self.client.engine_did_error(reason);
        self.disconnect(reason).await;
    }

    fn close_out_engine(&mut self) {
        self.state.set_sid("");
        self.state.set_closed(true);
        self.state.set_invalidated(true);
        self.state.set_connected(false);
        self.generation = self.state.bump_generation();
        self.waiting_for_poll = false;
        self.waiting_for_post = false;
        if let Some(mut ws) = self.ws_tx.take() {
            tokio::spawn(async move {
                ws.close().await.ok();
            });
        }
        self.http = None;
    }

    // ===== Writes =====

    async fn write(&mut self, msg: String, kind: PacketKind, data: Vec<Bytes>) {
        if !self.state.connected() {
            return;
        }
        if self.state.websocket() {
            self.send_websocket_message(&msg, kind, &data).await;
        } else if !self.state.probing() {
            self.send_poll_message(&msg, kind, &data).await;
        } else {
            self.probe_wait.push(ProbeWait { msg, kind, data });
        }
    }

    async fn send_poll_message(&mut self, msg: &str, kind: PacketKind, data: &[Bytes]) {
        let payload = if self.config.double_encode_utf8 {
            packet::encode_double_utf8(msg)
        } else {
            msg.to_string()
        };
        self.post_wait.push(kind.encode(&payload));
        for blob in data {
            self.post_wait.push(Packet::encode_polling_binary(blob));
        }
        if !self.waiting_for_post {
            self.flush_waiting_for_post().await;
        }
    }

    async fn flush_waiting_for_post(&mut self) {
        if self.post_wait.is_empty() || !self.state.connected() {
            return;
        }
        if self.state.websocket() {
            return self.flush_waiting_for_post_to_websocket().await;
        }
        let body = payload::encode(&self.post_wait);
        self.post_wait.clear();
        self.waiting_for_post = true;
        self.spawn_post(body);
    }

    /// After the upgrade, leftover polling frames travel over the websocket
    /// as raw strings, preserving their order.
    async fn flush_waiting_for_post_to_websocket(&mut self) {
        for frame in std::mem::take(&mut self.post_wait) {
            self.send_ws_text(frame).await;
        }
    }

    async fn send_websocket_message(&mut self, msg: &str, kind: PacketKind, data: &[Bytes]) {
        self.send_ws_text(kind.encode(msg)).await;
        for blob in data {
            self.send_ws_binary(Packet::encode_ws_binary(blob)).await;
        }
    }

    // ===== Polling transport =====

    fn do_poll(&mut self) {
        if self.state.websocket()
            || self.waiting_for_poll
            || !self.state.connected()
            || self.state.closed()
        {
            return;
        }
        let url = self.polling_url_with_sid();
        self.do_long_poll(url);
    }

    fn do_long_poll(&mut self, url: Url) {
        let client = match self.http.clone() {
            Some(client) => client,
            None => return,
        };
        self.waiting_for_poll = true;
        #[cfg(feature = "tracing")]
        tracing::debug!("[sid={}] polling request", self.state.sid());
        match polling::get_request(&url, &self.config) {
            Ok(req) => {
                let tx = self.tx.clone();
                let generation = self.generation;
                tokio::spawn(async move {
                    let result = polling::send_request(client, req).await;
                    let _ = tx.send(Command::PollResult(generation, result));
                });
            }
            Err(e) => {
                let _ = self.tx.send(Command::PollResult(self.generation, Err(e)));
            }
        }
    }

    fn spawn_post(&mut self, body: String) {
        let client = match self.http.clone() {
            Some(client) => client,
            None => return,
        };
        #[cfg(feature = "tracing")]
        tracing::debug!("[sid={}] sending poll batch: {:?}", self.state.sid(), body);
        let url = self.polling_url_with_sid();
        match polling::post_request(&url, &self.config, body) {
            Ok(req) => {
                let tx = self.tx.clone();
                let generation = self.generation;
                tokio::spawn(async move {
                    let result = polling::send_request(client, req).await.map(|_| ());
                    let _ = tx.send(Command::PostResult(generation, result));
                });
            }
            Err(e) => {
                let _ = self.tx.send(Command::PostResult(self.generation, Err(e)));
            }
        }
    }

    async fn handle_poll_result(&mut self, result: Result<String, Error>) {
        self.waiting_for_poll = false;
        match result {
            Ok(body) => {
                self.parse_polling_payload(body).await;
                if self.state.fast_upgrade() {
                    self.do_fast_upgrade().await;
                } else {
                    self.do_poll();
                }
            }
            Err(e) => {
                if self.state.polling() {
                    self.handle_polling_failed(&e.to_string()).await;
                }
            }
        }
    }

    async fn handle_post_result(&mut self, result: Result<(), Error>) {
        self.waiting_for_post = false;
        match result {
            Ok(()) => {
                if !self.post_wait.is_empty() {
                    self.flush_waiting_for_post().await;
                }
                self.do_poll();
            }
            Err(e) => {
                if self.state.polling() {
                    self.handle_polling_failed(&e.to_string()).await;
                }
            }
        }
    }

    async fn handle_polling_failed(&mut self, reason: &str) {
        self.did_error(reason).await;
    }

    async fn parse_polling_payload(&mut self, body: String) {
        match payload::decode(&body) {
            Ok(frames) => {
                for frame in frames {
                    let frame = if self.config.double_encode_utf8
                        && !frame.starts_with('6')
                        && !frame.starts_with(packet::BINARY_POLLING_MARKER)
                    {
                        packet::decode_double_utf8(&frame)
                    } else {
                        frame
                    };
                    self.handle_frame(frame).await;
                }
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("discarding malformed polling payload: {_e:?}");
            }
        }
    }

    // ===== Websocket transport =====

    fn connect_websocket(&mut self) {
        let url = self.websocket_url_with_sid();
        #[cfg(feature = "tracing")]
        tracing::debug!("connecting websocket to {url}");
        ws::spawn(url, self.config.clone(), self.generation, self.tx.clone());
    }

    async fn websocket_did_connect(&mut self, sink: WsSink) {
        self.ws_tx = Some(sink);
        if !self.config.force_websockets {
            self.state.set_probing(true);
            // Probe the new transport before trusting it.
            self.send_websocket_message("probe", PacketKind::Ping, &[]).await;
        } else {
            self.state.set_connected(true);
            self.state.set_probing(false);
            self.state.set_polling(false);
        }
    }

    async fn websocket_did_receive(&mut self, message: Message) {
        match message {
            Message::Text(text) => self.handle_frame(text).await,
            Message::Binary(data) => {
                if let Some(payload) = Packet::decode_ws_binary(data) {
                    self.client.parse_engine_binary_data(payload);
                }
            }
            _ => {}
        }
    }

    async fn websocket_did_disconnect(&mut self, error: Option<String>) {
        #[cfg(feature = "tracing")]
        tracing::debug!("websocket disconnected: {error:?}");
        self.state.set_probing(false);
        self.ws_tx = None;
        if self.state.websocket() {
            self.state.set_connected(false);
            self.state.set_websocket(false);
            match error {
                Some(reason) => self.did_error(&reason).await,
                None => self.client.engine_did_close(reason::DISCONNECT),
            }
        } else {
            // The probe died before the upgrade: fall back to polling and
            // replay whatever was buffered in the meantime.
            self.flush_probe_wait().await;
        }
    }

    // ===== Upgrade =====

    async fn upgrade_transport(&mut self) {
        if !self.state.probing() || !self.state.connected() {
            return;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("[sid={}] probe acknowledged, arming fast upgrade", self.state.sid());
        self.state.set_fast_upgrade(true);
        // The noop makes the server release its pending poll promptly.
        self.send_poll_message("", PacketKind::Noop, &[]).await;
    }

    async fn do_fast_upgrade(&mut self) {
        #[cfg(feature = "tracing")]
        tracing::debug!("[sid={}] upgrading to websocket", self.state.sid());
        self.state.set_fast_upgrade(false);
        self.send_websocket_message("", PacketKind::Upgrade, &[]).await;
        self.state.set_websocket(true);
        self.state.set_polling(false);
        self.state.set_probing(false);
        self.flush_probe_wait().await;
    }

    async fn flush_probe_wait(&mut self) {
        for waiter in std::mem::take(&mut self.probe_wait) {
            self.write(waiter.msg, waiter.kind, waiter.data).await;
        }
        if self.state.websocket() && !self.post_wait.is_empty() {
            self.flush_waiting_for_post_to_websocket().await;
        }
    }

    // ===== Heartbeat =====

    async fn send_ping(&mut self) {
        if !self.state.connected() {
            return;
        }
        if self.pongs_missed > self.pongs_missed_max {
            #[cfg(feature = "tracing")]
            tracing::debug!("[sid={}] ping timeout", self.state.sid());
            self.client.engine_did_close(reason::PING_TIMEOUT);
            self.close_out_engine();
            return;
        }
        self.pongs_missed += 1;
        self.write(String::new(), PacketKind::Ping, Vec::new()).await;
    }

    fn start_heartbeat(&mut self) {
        let tx = self.tx.clone();
        let state = self.state.clone();
        let generation = self.generation;
        let interval = self.ping_interval;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if state.generation() != generation || !state.connected() {
                    break;
                }
                if tx.send(Command::PingTick(generation)).is_err() {
                    break;
                }
            }
        });
    }

    fn handle_pong(&mut self) {
        self.pongs_missed = 0;
    }

    // ===== Dispatch =====

    async fn handle_frame(&mut self, frame: String) {
        match Packet::try_from(frame.as_str()) {
            Ok(packet) => self.handle_packet(packet).await,
            Err(Error::InvalidPacketType(_)) => {
                // Not a packet; the server may have sent an error object.
                match serde_json::from_str::<ServerErrorPacket>(&frame) {
                    Ok(err) => self.did_error(&err.message).await,
                    Err(_) => {
                        #[cfg(feature = "tracing")]
                        tracing::debug!("discarding unparseable frame: {frame:?}");
                    }
                }
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("discarding bad frame: {_e:?}");
            }
        }
    }

    async fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Open(open) => self.handle_open(open).await,
            Packet::Close => self.client.engine_did_close(reason::DISCONNECT),
            Packet::Pong => self.handle_pong(),
            Packet::PongProbe => self.upgrade_transport().await,
            Packet::Message(msg) => self.client.parse_engine_message(&msg),
            Packet::Binary(data) => self.client.parse_engine_binary_data(data),
            Packet::Noop => self.do_poll(),
            // A v3 server never pings the client nor echoes upgrades.
            Packet::Ping | Packet::PingProbe | Packet::Upgrade => {}
        }
    }

    async fn handle_open(&mut self, open: OpenPacket) {
        #[cfg(feature = "tracing")]
        tracing::debug!("[sid={}] engine open, upgrades: {:?}", open.sid, open.upgrades);
        self.state.set_sid(&open.sid);
        self.state.set_connected(true);
        self.ping_interval = Duration::from_millis(open.ping_interval);
        self.ping_timeout = Duration::from_millis(open.ping_timeout);
        self.pongs_missed = 0;
        self.pongs_missed_max = pongs_missed_max(self.ping_timeout, self.ping_interval);
        let websocket_offered = open.upgrades.iter().any(|u| u == "websocket");
        if websocket_offered
            && !self.config.force_polling
            && !self.config.force_websockets
            && !self.state.websocket()
        {
            self.connect_websocket();
        }
        self.send_ping().await;
        self.start_heartbeat();
        if !self.config.force_websockets {
            self.do_poll();
        }
        self.client.engine_did_open(reason::CONNECT);
    }

    // ===== Websocket write half =====

    async fn send_ws_text(&mut self, text: String) {
        if let Some(ws) = self.ws_tx.as_mut() {
            if let Err(_e) = ws.send(Message::Text(text)).await {
                #[cfg(feature = "tracing")]
                tracing::debug!("websocket send failed: {_e}");
            }
        }
    }

    async fn send_ws_binary(&mut self, data: Vec<u8>) {
        if let Some(ws) = self.ws_tx.as_mut() {
            if let Err(_e) = ws.send(Message::Binary(data)).await {
                #[cfg(feature = "tracing")]
                tracing::debug!("websocket send failed: {_e}");
            }
        }
    }

    // ===== Urls =====

    fn polling_url_with_sid(&self) -> Url {
        url_with_sid(&self.url_polling, &self.state.sid())
    }

    fn websocket_url_with_sid(&self) -> Url {
        url_with_sid(&self.url_websocket, &self.state.sid())
    }
}

fn url_with_sid(url: &Url, sid: &str) -> Url {
    let mut url = url.clone();
    if !sid.is_empty() {
        url.query_pairs_mut().append_pair("sid", sid);
    }
    url
}

/// Derive a transport url from the base url, path and connect params.
fn transport_url(base: &Url, config: &EngineConfig, transport: TransportType) -> Url {
    let mut url = base.clone();
    let secure = config.secure || matches!(base.scheme(), "https" | "wss");
    let scheme = match (transport, secure) {
        (TransportType::Polling, false) => "http",
        (TransportType::Polling, true) => "https",
        (TransportType::Websocket, false) => "ws",
        (TransportType::Websocket, true) => "wss",
    };
    let _ = url.set_scheme(scheme);
    url.set_path(&config.path);
    url.set_query(None);
    url.set_fragment(None);
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("transport", &transport.to_string());
        if transport == TransportType::Polling {
            pairs.append_pair("b64", "1");
        }
        for (key, value) in &config.connect_params {
            pairs.append_pair(key, value);
        }
    }
    url
}

fn pongs_missed_max(ping_timeout: Duration, ping_interval: Duration) -> u32 {
    (ping_timeout.as_millis() / ping_interval.as_millis().max(1)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pongs_missed_max_floors() {
        let ms = Duration::from_millis;
        assert_eq!(pongs_missed_max(ms(60000), ms(25000)), 2);
        assert_eq!(pongs_missed_max(ms(3000), ms(1000)), 3);
        assert_eq!(pongs_missed_max(ms(500), ms(1000)), 0);
        assert_eq!(pongs_missed_max(ms(1000), ms(0)), 1000);
    }

    #[test]
    fn transport_urls() {
        let base = Url::parse("http://example.com:8087/").unwrap();
        let config = EngineConfig::builder()
            .connect_param("token", "a b")
            .build();
        let polling = transport_url(&base, &config, TransportType::Polling);
        assert_eq!(
            polling.as_str(),
            "http://example.com:8087/engine.io/?transport=polling&b64=1&token=a+b"
        );
        let websocket = transport_url(&base, &config, TransportType::Websocket);
        assert_eq!(
            websocket.as_str(),
            "ws://example.com:8087/engine.io/?transport=websocket&token=a+b"
        );
    }

    #[test]
    fn transport_urls_secure() {
        let base = Url::parse("http://example.com/").unwrap();
        let config = EngineConfig::builder().secure(true).build();
        let polling = transport_url(&base, &config, TransportType::Polling);
        assert!(polling.as_str().starts_with("https://"));
        let websocket = transport_url(&base, &config, TransportType::Websocket);
        assert!(websocket.as_str().starts_with("wss://"));
    }

    #[test]
    fn wss_base_implies_secure_polling() {
        let base = Url::parse("wss://example.com/").unwrap();
        let config = EngineConfig::default();
        let polling = transport_url(&base, &config, TransportType::Polling);
        assert!(polling.as_str().starts_with("https://"));
    }

    #[test]
    fn sid_appended_after_open() {
        let base = Url::parse("http://example.com/").unwrap();
        let config = EngineConfig::default();
        let polling = transport_url(&base, &config, TransportType::Polling);
        let with_sid = url_with_sid(&polling, "abc123");
        assert!(with_sid.as_str().ends_with("&sid=abc123"));
        let without_sid = url_with_sid(&polling, "");
        assert_eq!(without_sid, polling);
    }

    #[test]
    fn state_reset_clears_transport_flags() {
        let state = EngineState::default();
        state.set_websocket(true);
        state.set_connected(true);
        state.set_sid("abc");
        state.reset();
        assert!(!state.websocket());
        assert!(state.polling());
        assert!(!state.connected());
        assert!(!state.closed());
        assert!(!state.invalidated());
        assert_eq!(state.sid(), "");
    }
}
