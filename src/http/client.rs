use async_trait::async_trait;
use log::debug;
use rand::prelude::IndexedRandom;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, ClientBuilder, Method, Proxy};
use std::time::Duration;

use super::raw::{self, RawProxy, RawTarget};
use super::{FetchError, FetchRequest, FetchResponse, Fetcher, RequestBody};

pub struct HttpClient {
    inner: Client,
    user_agents: Vec<&'static str>,
    default_timeout: Duration,
    default_headers: HeaderMap,
    proxied: bool,
    raw_proxy: Option<RawProxy>,
}

impl HttpClient {
    pub fn new(
        timeout_seconds: u64,
        proxy_url: Option<&str>,
        custom_headers: &[(String, String)],
    ) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(timeout_seconds);

        let mut builder = ClientBuilder::new()
            .timeout(timeout)
            .danger_accept_invalid_certs(true);

        if let Some(proxy) = proxy_url {
            builder = builder.proxy(Proxy::all(proxy)?);
        }

        let inner = builder.build()?;

        let mut default_headers = HeaderMap::new();
        for (key, val) in custom_headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(key.as_bytes()),
                HeaderValue::from_str(val),
            ) {
                default_headers.insert(name, value);
            }
        }
        // Rotated per request so repeated probes don't share one fingerprint
        let user_agents = vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) \
             Gecko/20100101 Firefox/120.0",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_0) AppleWebKit/605.1.15 \
             (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
        ];

        Ok(Self {
            inner,
            user_agents,
            default_timeout: timeout,
            default_headers,
            proxied: proxy_url.is_some(),
            raw_proxy: proxy_url.and_then(RawProxy::parse),
        })
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub async fn send_request(&self, req: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let headers = self.request_headers(req);
        let timeout = req.timeout.unwrap_or(self.default_timeout);

        if req.body == RequestBody::None {
            if let Some(target) = RawTarget::parse(&req.url) {
                if !self.proxied || (self.raw_proxy.is_some() && !target.tls) {
                    return raw::send(&req.method, &target, &headers, self.raw_proxy.as_ref(), timeout)
                        .await;
                }
                debug!("proxy can't forward {} verbatim, sending it normalized", req.url);
            }
        }

        let url = url::Url::parse(&req.url)
            .map_err(|e| FetchError::InvalidRequest(format!("{}: {}", req.url, e)))?;

        let mut builder = self.inner.request(req.method.clone(), url).headers(headers);

        if let RequestBody::Form(fields) = &req.body {
            builder = if req.method == Method::GET {
                builder.query(fields)
            } else {
                builder.form(fields)
            };
        }

        let response = builder.timeout(timeout).send().await?.error_for_status()?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(FetchResponse { status, body })
    }

    /// Custom headers, then the request's own, then a rotated user agent
    /// unless one was set.
    fn request_headers(&self, req: &FetchRequest) -> HeaderMap {
        let mut headers = self.default_headers.clone();
        for (name, value) in req.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }
        if !headers.contains_key(USER_AGENT) {
            headers.insert(USER_AGENT, HeaderValue::from_static(self.get_random_user_agent()));
        }
        headers
    }

    fn get_random_user_agent(&self) -> &'static str {
        let mut rng = rand::rng();
        *self.user_agents.choose(&mut rng).unwrap_or(&"Mozilla/5.0")
    }
}

#[async_trait]
impl Fetcher for HttpClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        self.send_request(request).await
    }
}
