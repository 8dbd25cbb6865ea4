use http::header::{HeaderMap, HeaderName, HeaderValue};
use native_tls::TlsConnector;

/// Configuration for an [`Engine`](crate::engine::Engine).
#[derive(Clone)]
pub struct EngineConfig {
    /// The engine.io path on the server, defaults to `/engine.io/`.
    pub path: String,

    /// Extra query parameters appended to both transport urls.
    ///
    /// Pairs keep their insertion order and are percent encoded when the
    /// urls are built.
    pub connect_params: Vec<(String, String)>,

    /// Cookies sent with polling requests and the websocket upgrade.
    pub cookies: Vec<String>,

    /// Additional headers sent with polling requests and the websocket
    /// upgrade.
    pub extra_headers: HeaderMap,

    /// Force `https`/`wss` schemes even for a plain `http` base url.
    pub secure: bool,

    /// Never attempt the websocket upgrade, stay on long-polling.
    pub force_polling: bool,

    /// Skip long-polling entirely and connect over websocket from the start.
    pub force_websockets: bool,

    /// Double encode outbound polling text as latin-1 of its utf-8 bytes and
    /// symmetrically decode inbound polling text. Defaults to `true` to match
    /// historical v3 servers.
    pub double_encode_utf8: bool,

    /// Accept self signed tls certificates.
    pub self_signed: bool,

    /// Custom tls connector used for both transports, e.g. to pin
    /// certificates. When unset a default connector is built honoring
    /// [`self_signed`](EngineConfig::self_signed).
    pub tls: Option<TlsConnector>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: "/engine.io/".to_string(),
            connect_params: Vec::new(),
            cookies: Vec::new(),
            extra_headers: HeaderMap::new(),
            secure: false,
            force_polling: false,
            force_websockets: false,
            double_encode_utf8: true,
            self_signed: false,
            tls: None,
        }
    }
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("path", &self.path)
            .field("connect_params", &self.connect_params)
            .field("cookies", &self.cookies)
            .field("extra_headers", &self.extra_headers)
            .field("secure", &self.secure)
            .field("force_polling", &self.force_polling)
            .field("force_websockets", &self.force_websockets)
            .field("double_encode_utf8", &self.double_encode_utf8)
            .field("self_signed", &self.self_signed)
            .field("tls", &self.tls.as_ref().map(|_| ".."))
            .finish()
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    /// The engine.io path on the server, e.g. `/engine.io/`.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Append one query parameter to both transport urls.
    pub fn connect_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.connect_params.push((key.into(), value.into()));
        self
    }

    /// Add a cookie, as a `name=value` pair.
    pub fn cookie(mut self, cookie: impl Into<String>) -> Self {
        self.config.cookies.push(cookie.into());
        self
    }

    /// Add an extra request header.
    pub fn extra_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.config.extra_headers.insert(name, value);
        self
    }

    /// Force `https`/`wss` schemes.
    pub fn secure(mut self, secure: bool) -> Self {
        self.config.secure = secure;
        self
    }

    /// Never attempt the websocket upgrade.
    pub fn force_polling(mut self, force: bool) -> Self {
        self.config.force_polling = force;
        self
    }

    /// Connect over websocket from the start, skipping long-polling.
    pub fn force_websockets(mut self, force: bool) -> Self {
        self.config.force_websockets = force;
        self
    }

    /// Toggle the latin-1 double encoding of polling text.
    pub fn double_encode_utf8(mut self, enabled: bool) -> Self {
        self.config.double_encode_utf8 = enabled;
        self
    }

    /// Accept self signed tls certificates.
    pub fn self_signed(mut self, self_signed: bool) -> Self {
        self.config.self_signed = self_signed;
        self
    }

    /// Use a custom tls connector for both transports.
    pub fn tls(mut self, tls: TlsConnector) -> Self {
        self.config.tls = Some(tls);
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}
