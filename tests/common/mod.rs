//! Scripted in-memory transport shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anisource::{HttpClient, HttpResponse, Request, SourceError};
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

struct Route {
    method: Method,
    prefix: String,
    status: u16,
    body: String,
}

/// Answers requests from a table of URL prefixes. The first matching route
/// wins; unmatched requests fail with a transport-style error.
#[derive(Default)]
pub struct FakeHttp {
    routes: Vec<Route>,
    sizes: HashMap<String, u64>,
    requests: Mutex<Vec<(Method, Request)>>,
    size_lookups: AtomicUsize,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(self, prefix: &str, body: &str) -> Self {
        self.route(Method::Get, prefix, 200, body)
    }

    pub fn post(self, prefix: &str, body: &str) -> Self {
        self.route(Method::Post, prefix, 200, body)
    }

    pub fn route(mut self, method: Method, prefix: &str, status: u16, body: &str) -> Self {
        self.routes.push(Route {
            method,
            prefix: prefix.to_string(),
            status,
            body: body.to_string(),
        });
        self
    }

    pub fn size(mut self, url: &str, bytes: u64) -> Self {
        self.sizes.insert(url.to_string(), bytes);
        self
    }

    /// Requests seen so far whose URL starts with `prefix`.
    pub fn requests_to(&self, prefix: &str) -> Vec<Request> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, r)| r.url.starts_with(prefix))
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub fn count(&self, method: Method, prefix: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, r)| *m == method && r.url.starts_with(prefix))
            .count()
    }

    pub fn size_lookups(&self) -> usize {
        self.size_lookups.load(Ordering::SeqCst)
    }

    fn answer(&self, method: Method, request: Request) -> anisource::Result<HttpResponse> {
        let route = self
            .routes
            .iter()
            .find(|r| r.method == method && request.url.starts_with(&r.prefix));
        let url = request.url.clone();
        self.requests.lock().unwrap().push((method, request));

        match route {
            Some(route) => Ok(HttpResponse {
                url,
                status: route.status,
                text: route.body.clone(),
            }),
            None => Err(SourceError::Malformed(format!("no route for {url}"))),
        }
    }
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn get(&self, request: Request) -> anisource::Result<HttpResponse> {
        self.answer(Method::Get, request)
    }

    async fn post(&self, request: Request) -> anisource::Result<HttpResponse> {
        self.answer(Method::Post, request)
    }

    async fn content_length(
        &self,
        url: &str,
        _headers: &HashMap<String, String>,
    ) -> anisource::Result<Option<u64>> {
        self.size_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.sizes.get(url).copied())
    }
}

pub const API: &str = "https://kamyroll.test";

pub const MALSYNC: &str = "https://malsync.test/data";

pub const TOKEN_BODY: &str = r#"{"access_token":"tok","token_type":"Bearer","expires_in":3600}"#;

/// Configuration pointing the Kamyroll source at [`API`] with credentials.
pub fn kamyroll_config() -> anisource::Config {
    let mut config = anisource::Config::default();
    config.kamyroll.api_url = API.to_string();
    config.malsync_url = MALSYNC.to_string();
    config.kamyroll.basic_auth = Some("YmFzaWM=".to_string());
    config.kamyroll.refresh_token = Some("refresh".to_string());
    config
}

pub fn param<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request
        .params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}
