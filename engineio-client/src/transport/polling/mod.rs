//! The polling transport module builds and sends the long-poll GET and
//! batched POST requests.
//!
//! The engine task owns the request queue; this module only knows how to turn
//! a url + [`EngineConfig`] into hyper requests and how to run one request to
//! completion.

use http::{header, Method, Request};
use hyper::{client::HttpConnector, Body, Client};
use hyper_tls::HttpsConnector;
use url::Url;

use crate::{config::EngineConfig, errors::Error};

pub(crate) mod payload;

pub(crate) type HttpClient = Client<HttpsConnector<HttpConnector>>;

/// Build the http session used for all polling requests of one connection
/// generation.
pub(crate) fn http_client(config: &EngineConfig) -> Result<HttpClient, Error> {
    let tls = tls_connector(config)?;
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    let https = HttpsConnector::from((http, tokio_native_tls::TlsConnector::from(tls)));
    Ok(Client::builder().build(https))
}

/// The tls connector shared by both transports, honoring the custom
/// validator hook and the self signed toggle.
pub(crate) fn tls_connector(config: &EngineConfig) -> Result<native_tls::TlsConnector, Error> {
    match &config.tls {
        Some(tls) => Ok(tls.clone()),
        None => {
            let mut builder = native_tls::TlsConnector::builder();
            if config.self_signed {
                builder.danger_accept_invalid_certs(true);
                builder.danger_accept_invalid_hostnames(true);
            }
            Ok(builder.build()?)
        }
    }
}

/// A long-poll GET carrying the configured cookies and extra headers.
pub(crate) fn get_request(url: &Url, config: &EngineConfig) -> Result<Request<Body>, Error> {
    let mut req = Request::builder()
        .method(Method::GET)
        .uri(url.as_str())
        .body(Body::empty())?;
    apply_headers(req.headers_mut(), config)?;
    Ok(req)
}

/// A POST flushing one encoded payload batch.
///
/// `Content-Length` is the *byte* length of the utf-8 body, unlike the
/// per-frame character counts inside the payload itself.
pub(crate) fn post_request(
    url: &Url,
    config: &EngineConfig,
    body: String,
) -> Result<Request<Body>, Error> {
    let mut req = Request::builder()
        .method(Method::POST)
        .uri(url.as_str())
        .header(header::CONTENT_TYPE, "text/plain; charset=UTF-8")
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))?;
    apply_headers(req.headers_mut(), config)?;
    Ok(req)
}

fn apply_headers(
    headers: &mut http::HeaderMap,
    config: &EngineConfig,
) -> Result<(), Error> {
    if !config.cookies.is_empty() {
        headers.insert(header::COOKIE, cookie_header(&config.cookies)?);
    }
    for (name, value) in &config.extra_headers {
        headers.insert(name, value.clone());
    }
    Ok(())
}

pub(crate) fn cookie_header(cookies: &[String]) -> Result<http::HeaderValue, Error> {
    Ok(http::HeaderValue::from_str(&cookies.join("; "))?)
}

/// Run one request to completion and return the response body as text.
pub(crate) async fn send_request(client: HttpClient, req: Request<Body>) -> Result<String, Error> {
    let res = client.request(req).await?;
    if !res.status().is_success() {
        return Err(Error::BadStatus(res.status()));
    }
    let body = hyper::body::to_bytes(res.into_body()).await?;
    Ok(String::from_utf8(body.to_vec())?)
}
