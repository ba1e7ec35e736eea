pub mod client;
pub mod raw;

pub use client::HttpClient;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use std::time::Duration;
use thiserror::Error;

/// Represents the body carried by an outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Sent as the query string on GET, as an urlencoded body otherwise.
    Form(Vec<(String, String)>),
    None,
}

/// A single request the scanner wants sent.
///
/// The URL is kept as the raw string the prober built (`<url>/<payload>`
/// concatenations are not guaranteed to parse), and is only validated when
/// the request is actually sent.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: RequestBody,
    /// Overrides the client's default timeout when set.
    pub timeout: Option<Duration>,
}

impl FetchRequest {
    /// Plain GET with no extra headers.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: HeaderMap::new(),
            body: RequestBody::None,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Adds a header, keeping non-ASCII bytes (emoji payloads) as opaque
    /// header bytes.
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Result<Self, FetchError> {
        let value = HeaderValue::from_bytes(value.as_bytes())
            .map_err(|e| FetchError::InvalidRequest(format!("header {}: {}", name, e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn form_fields(&self) -> &[(String, String)] {
        match &self.body {
            RequestBody::Form(fields) => fields,
            RequestBody::None => &[],
        }
    }
}

/// What came back from a successful (2xx) request.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

/// Why a request did not produce a usable response.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("server answered with status {0}")]
    Status(u16),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = e.status() {
            FetchError::Status(status.as_u16())
        } else if e.is_connect() {
            FetchError::Connect(e.to_string())
        } else if e.is_builder() {
            FetchError::InvalidRequest(e.to_string())
        } else {
            FetchError::Other(e.to_string())
        }
    }
}

/// Transport the scanner talks through.
///
/// Implementations must return an error for any non-success status so that
/// the "request succeeded" signal the recon checks rely on stays meaningful.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;
}
