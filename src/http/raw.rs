//! Verbatim request-targets.
//!
//! A URL parser folds `.` and `..` path segments away, so
//! `http://h/../etc/passwd` would go out as `GET /etc/passwd`. Requests whose
//! path carries such segments are written over a connection we open ourselves,
//! with the target exactly as the caller built it.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use hyper::client::conn;
use hyper::{Body, Request};
use log::debug;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::header::{HeaderMap, HOST};
use reqwest::Method;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::rustls::client::{ServerCertVerified, ServerCertVerifier};
use tokio_rustls::rustls::{self, Certificate, ClientConfig, ServerName};
use tokio_rustls::TlsConnector;
use url::Url;

use super::{FetchError, FetchResponse};

/// Bytes an HTTP/1.1 request-target can't carry as-is. Dots, slashes and
/// existing `%XX` escapes are left untouched.
const TARGET_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Where a dot-segment request goes and what its request line says.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTarget {
    pub tls: bool,
    pub host: String,
    pub port: u16,
    /// `Host` header value: host, plus the port when it isn't the default.
    pub authority: String,
    /// Path and query, percent-encoded only where the wire demands it.
    pub target: String,
}

impl RawTarget {
    /// Returns `Some` only for http(s) URLs whose path has a `.` or `..`
    /// segment; everything else is left to the regular client.
    pub fn parse(url: &str) -> Option<Self> {
        let (scheme, rest) = url.split_once("://")?;
        let tls = match scheme.to_ascii_lowercase().as_str() {
            "http" => false,
            "https" => true,
            _ => return None,
        };
        let rest = rest.split('#').next().unwrap_or(rest);
        let slash = rest.find('/')?;
        let (authority, target) = rest.split_at(slash);
        let path = target.split('?').next().unwrap_or(target);
        if !path.split('/').any(is_dot_segment) {
            return None;
        }

        let origin = Url::parse(&format!("{}://{}/", scheme, authority)).ok()?;
        let host = origin.host_str()?.to_string();
        let port = origin.port_or_known_default()?;
        let authority = match origin.port() {
            Some(p) => format!("{}:{}", host, p),
            None => host.clone(),
        };

        Some(Self {
            tls,
            host,
            port,
            authority,
            target: utf8_percent_encode(target, TARGET_SET).to_string(),
        })
    }

    /// Absolute-form target, as sent to a forwarding proxy.
    pub fn absolute(&self) -> String {
        format!("http://{}{}", self.authority, self.target)
    }
}

fn is_dot_segment(segment: &str) -> bool {
    let segment = segment.to_ascii_lowercase().replace("%2e", ".");
    segment == "." || segment == ".."
}

/// Plain-http proxy a raw request can be forwarded through.
#[derive(Debug, Clone)]
pub struct RawProxy {
    host: String,
    port: u16,
}

impl RawProxy {
    /// Only `http://` proxies can forward an absolute-form target; anything
    /// else yields `None`.
    pub fn parse(proxy: &str) -> Option<Self> {
        let url = Url::parse(proxy).ok()?;
        if url.scheme() != "http" {
            return None;
        }
        Some(Self {
            host: url.host_str()?.to_string(),
            port: url.port_or_known_default()?,
        })
    }
}

/// Sends one body-less request with its target untouched.
pub async fn send(
    method: &Method,
    target: &RawTarget,
    headers: &HeaderMap,
    proxy: Option<&RawProxy>,
    timeout: Duration,
) -> Result<FetchResponse, FetchError> {
    match tokio::time::timeout(timeout, exchange(method, target, headers, proxy)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout),
    }
}

async fn exchange(
    method: &Method,
    target: &RawTarget,
    headers: &HeaderMap,
    proxy: Option<&RawProxy>,
) -> Result<FetchResponse, FetchError> {
    let (connect_host, connect_port, request_target) = match proxy {
        Some(p) => (p.host.as_str(), p.port, target.absolute()),
        None => (target.host.as_str(), target.port, target.target.clone()),
    };

    let mut builder = Request::builder()
        .method(method.as_str())
        .uri(request_target.as_str())
        .header(HOST.as_str(), target.authority.as_str());
    for (name, value) in headers.iter() {
        builder = builder.header(name.as_str(), value.as_bytes());
    }
    let request = builder
        .body(Body::empty())
        .map_err(|e| FetchError::InvalidRequest(format!("{}: {}", request_target, e)))?;

    let connect_host = connect_host.trim_start_matches('[').trim_end_matches(']');
    let stream = TcpStream::connect((connect_host, connect_port))
        .await
        .map_err(|e| FetchError::Connect(e.to_string()))?;

    if target.tls {
        let domain = ServerName::try_from(target.host.trim_start_matches('[').trim_end_matches(']'))
            .map_err(|e| FetchError::InvalidRequest(format!("{}: {}", target.host, e)))?;
        let stream = tls_connector()
            .connect(domain, stream)
            .await
            .map_err(|e| FetchError::Connect(e.to_string()))?;
        round_trip(stream, request).await
    } else {
        round_trip(stream, request).await
    }
}

async fn round_trip<S>(stream: S, request: Request<Body>) -> Result<FetchResponse, FetchError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, connection) = conn::handshake(stream)
        .await
        .map_err(|e| FetchError::Connect(e.to_string()))?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            debug!("raw connection closed: {}", e);
        }
    });

    let response = sender
        .send_request(request)
        .await
        .map_err(|e| FetchError::Other(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    let bytes = hyper::body::to_bytes(response.into_body())
        .await
        .map_err(|e| FetchError::Other(e.to_string()))?;

    Ok(FetchResponse {
        status: status.as_u16(),
        body: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

/// Any certificate goes, same as the reqwest client.
struct AcceptAnyCert;

impl ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &Certificate,
        _intermediates: &[Certificate],
        _server_name: &ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: SystemTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }
}

fn tls_connector() -> TlsConnector {
    let config = ClientConfig::builder()
        .with_safe_defaults()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCert))
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}
