use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{GenesisError, Result};

/// What the client needs to know about an HTTP answer.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub text: String,
    pub headers: Vec<(String, String)>,
}

impl HttpResponse {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            status: 200,
            text: text.into(),
            headers: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A single blocking `GET` with query parameters.
pub trait Transport {
    fn get(&self, url: &str, params: &[(String, String)]) -> Result<HttpResponse>;
}

/// The default transport, a blocking reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: HttpClient,
}

impl ReqwestTransport {
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const READ_TIMEOUT: Duration = Duration::from_secs(300);

    pub fn new() -> anyhow::Result<Self> {
        Self::with_timeouts(Self::CONNECT_TIMEOUT, Self::READ_TIMEOUT)
    }

    pub fn with_timeouts(connect: Duration, read: Duration) -> anyhow::Result<Self> {
        use anyhow::Context;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("genesisapi-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("genesisapi-rs")),
        );

        let http = HttpClient::builder()
            .default_headers(default_headers)
            .connect_timeout(connect)
            .timeout(read)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { http })
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &str, params: &[(String, String)]) -> Result<HttpResponse> {
        let resp = self
            .http
            .get(url)
            .query(params)
            .send()
            .map_err(|source| GenesisError::Connection {
                url: url.to_string(),
                source,
            })?;

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        // GENESIS answers UTF-8 but does not always say so
        let bytes = resp.bytes().map_err(|source| GenesisError::Connection {
            url: url.to_string(),
            source,
        })?;

        Ok(HttpResponse {
            status,
            text: String::from_utf8_lossy(&bytes).into_owned(),
            headers,
        })
    }
}

/// Time source for the job poll loop.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}
