//! HTTP client collaborator.
//!
//! Sources talk to the network only through the [`HttpClient`] trait, which
//! keeps them testable without a live server. [`ReqwestClient`] is the
//! production implementation:
//! - HTTP/2 with adaptive window, TLS 1.3 via rustls
//! - Brotli, Zstd, Gzip compression (auto-negotiated)
//! - Cookie store shared across requests
//! - Connect and per-request timeouts

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::config::HttpConfig;
use crate::error::{Result, SourceError};

/// A single outgoing request.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub params: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl Request {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn headers(mut self, headers: &HashMap<String, String>) -> Self {
        self.headers
            .extend(headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn form(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub url: String,
    pub status: u16,
    pub text: String,
}

impl HttpResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into [`SourceError::Status`].
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(SourceError::Status {
                url: self.url,
                status: self.status,
            })
        }
    }

    /// Parse the body as JSON into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.text)?)
    }
}

/// Transport used by every source and extractor.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, request: Request) -> Result<HttpResponse>;

    /// POST `request.form` as `application/x-www-form-urlencoded`.
    async fn post(&self, request: Request) -> Result<HttpResponse>;

    /// Look up the size of a remote file without downloading it.
    async fn content_length(&self, url: &str, headers: &HashMap<String, String>)
        -> Result<Option<u64>>;
}

/// `reqwest`-backed [`HttpClient`].
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .http2_adaptive_window(true)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .brotli(true)
            .zstd(true)
            .gzip(true)
            .deflate(true)
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout())
            .redirect(reqwest::redirect::Policy::limited(10))
            .cookie_store(true)
            .build()?;

        Ok(Self { client })
    }

    /// Get the underlying reqwest client
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }

    fn prepare(builder: RequestBuilder, request: &Request) -> Result<RequestBuilder> {
        let mut builder = builder.headers(to_header_map(&request.headers)?);
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder)
    }

    async fn send(builder: RequestBuilder) -> Result<HttpResponse> {
        let response = builder.send().await?;

        info!(
            status = %response.status(),
            version = ?response.version(),
            "Response received"
        );

        let url = response.url().to_string();
        let status = response.status().as_u16();
        let text = response.text().await?;
        Ok(HttpResponse { url, status, text })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn get(&self, request: Request) -> Result<HttpResponse> {
        debug!("GET");
        let builder = Self::prepare(self.client.get(&request.url), &request)?;
        Self::send(builder).await
    }

    #[instrument(skip(self, request), fields(url = %request.url))]
    async fn post(&self, request: Request) -> Result<HttpResponse> {
        debug!("POST");
        let mut builder = Self::prepare(self.client.post(&request.url), &request)?;
        if !request.form.is_empty() {
            builder = builder.form(&request.form);
        }
        Self::send(builder).await
    }

    #[instrument(skip(self, headers))]
    async fn content_length(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<Option<u64>> {
        let response = self
            .client
            .head(url)
            .headers(to_header_map(headers)?)
            .send()
            .await?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "Size lookup rejected");
            return Ok(None);
        }

        Ok(response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok()))
    }
}

fn to_header_map(headers: &HashMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| SourceError::Malformed(format!("header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| SourceError::Malformed(format!("header value for {name}: {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}
