//! HTTP fetcher for the registration lookup endpoint
//!
//! This module handles every outbound request, including:
//! - Building the reqwest client with static browser headers
//! - Attaching a fresh randomized identity to each request
//! - The randomized pre-fetch delay that keeps request cadence irregular
//! - Timeout enforcement and transport error classification
//!
//! The transport itself sits behind [`HttpTransport`] so the fetcher's
//! control flow can be exercised without a network.

use crate::lookup::identity::IdentityGenerator;
use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Headers sent with every lookup regardless of identity (names lowercase)
const STATIC_HEADERS: [(&str, &str); 12] = [
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
    ),
    ("accept-language", "zh-CN,zh;q=0.9,en;q=0.8"),
    ("cache-control", "no-cache"),
    ("pragma", "no-cache"),
    ("referer", "https://www.beianx.cn/search/"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "same-origin"),
    ("sec-fetch-user", "?1"),
    ("upgrade-insecure-requests", "1"),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", "\"Windows\""),
];

/// Failure to obtain a response body from the lookup site
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Request failed: {0}")]
    Request(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

/// Raw response from an [`HttpTransport`]
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Capability to perform one HTTP GET
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(
        &self,
        url: &Url,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError>;
}

/// Builds the HTTP client used for lookups
///
/// Static browser headers are installed as client defaults; identity headers
/// are added per request.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    for (name, value) in STATIC_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }

    Client::builder()
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`HttpTransport`] backed by reqwest
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client()?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &Url,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let mut request = self.client.get(url.clone()).timeout(timeout);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify_reqwest_error(e, timeout))?;
        let status = response.status().as_u16();

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(timeout)
            } else {
                TransportError::Body(e.to_string())
            }
        })?;

        Ok(HttpResponse { status, body })
    }
}

fn classify_reqwest_error(error: reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(timeout)
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Request(error.to_string())
    }
}

/// Bounds of the random delay injected before every fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreFetchDelay {
    min: Duration,
    max: Duration,
}

impl PreFetchDelay {
    /// Creates a delay range; bounds are swapped if given out of order
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// No delay at all
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    /// Picks a delay uniformly within the range
    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let min_ms = self.min.as_millis() as u64;
        let max_ms = self.max.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(min_ms..=max_ms))
    }
}

impl Default for PreFetchDelay {
    fn default() -> Self {
        Self::from_millis(1000, 3000)
    }
}

/// Issues lookups for single domains
pub struct Fetcher {
    transport: Arc<dyn HttpTransport>,
    identity: Arc<dyn IdentityGenerator>,
    base_url: Url,
    pre_fetch_delay: PreFetchDelay,
}

impl Fetcher {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        identity: Arc<dyn IdentityGenerator>,
        base_url: Url,
    ) -> Self {
        Self {
            transport,
            identity,
            base_url,
            pre_fetch_delay: PreFetchDelay::default(),
        }
    }

    pub fn with_pre_fetch_delay(mut self, delay: PreFetchDelay) -> Self {
        self.pre_fetch_delay = delay;
        self
    }

    /// The search URL for `domain`
    ///
    /// The domain becomes the last path segment of the base URL, whether or
    /// not the base URL ends with `/`.
    pub fn lookup_url(&self, domain: &str) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                TransportError::Request(format!(
                    "base URL {} cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push(domain);
        Ok(url)
    }

    /// Fetches the lookup page for `domain`
    ///
    /// # Request Flow
    ///
    /// 1. Sleep for a random pre-fetch delay
    /// 2. Generate a fresh identity (user agent, cookies, forwarded address)
    /// 3. GET `<base_url><domain>`, bounded by `timeout`
    /// 4. Map non-2xx statuses to [`TransportError::Status`]
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The response body
    /// * `Err(TransportError)` - The page could not be retrieved
    pub async fn fetch(&self, domain: &str, timeout: Duration) -> Result<String, TransportError> {
        let delay = self.pre_fetch_delay.sample();
        if !delay.is_zero() {
            tracing::debug!("Waiting {:?} before querying {}", delay, domain);
            tokio::time::sleep(delay).await;
        }

        let url = self.lookup_url(domain)?;
        let headers = self.identity.generate().headers();

        let response = tokio::time::timeout(timeout, self.transport.get(&url, &headers, timeout))
            .await
            .map_err(|_| TransportError::Timeout(timeout))??;

        if !(200..300).contains(&response.status) {
            return Err(TransportError::Status(response.status));
        }

        Ok(response.body)
    }
}
