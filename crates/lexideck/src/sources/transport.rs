//! HTTP transport seam used by the source adapters.
//!
//! Adapters only describe requests and parse responses; the transport does
//! the I/O. `HttpTransport` talks to the network through reqwest,
//! `FixtureTransport` replays recorded bodies keyed by URL.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::config::HttpSettings;

/// Maximum length of a response body echoed into logs or error messages.
const MAX_LOGGED_BODY_LENGTH: usize = 200;

/// Truncates a response body before it is logged, so scraped pages do not
/// flood the log.
pub fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_LOGGED_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_LOGGED_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated)", &body[..end])
}

/// A fully described GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A response as seen by the adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl RawResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: None,
            body: body.into(),
        }
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// True when the declared content type mentions `kind`. A response
    /// without a content type passes.
    pub fn declares(&self, kind: &str) -> bool {
        self.content_type
            .as_deref()
            .map_or(true, |ct| ct.to_ascii_lowercase().contains(kind))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request to '{url}' timed out")]
    Timeout { url: String },

    #[error("Failed to connect to '{url}': {message}")]
    Connect { url: String, message: String },

    #[error("Failed to read response body from '{url}': {message}")]
    Body { url: String, message: String },

    #[error("Invalid request URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    #[error("No recorded response for '{url}'")]
    NotRecorded { url: String },
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: &HttpRequest) -> Result<RawResponse, TransportError>;
}

/// Network transport backed by a shared reqwest client.
pub struct HttpTransport {
    client: Client,
    user_agent: String,
    referrer: Option<String>,
}

impl HttpTransport {
    pub fn new(settings: &HttpSettings) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self {
            client,
            user_agent: settings.user_agent.clone(),
            referrer: settings.referrer.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: &HttpRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self
            .client
            .get(&request.url)
            .header(reqwest::header::USER_AGENT, &self.user_agent);
        if let Some(referrer) = &self.referrer {
            builder = builder.header(reqwest::header::REFERER, referrer);
        }
        // Adapter headers are applied last so they override the defaults.
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout {
                    url: request.url.clone(),
                }
            } else if e.is_builder() {
                TransportError::InvalidUrl {
                    url: request.url.clone(),
                    message: e.to_string(),
                }
            } else {
                TransportError::Connect {
                    url: request.url.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout {
                    url: request.url.clone(),
                }
            } else {
                TransportError::Body {
                    url: request.url.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        tracing::debug!(url = %request.url, status, bytes = body.len(), "HTTP response received");

        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Replays recorded responses keyed by URL.
///
/// Unknown URLs fail with `TransportError::NotRecorded`. Failures can be
/// injected per URL or per URL prefix to simulate an unreachable source.
#[derive(Default)]
pub struct FixtureTransport {
    responses: RwLock<HashMap<String, RawResponse>>,
    failures: RwLock<Vec<(String, TransportError)>>,
    requests: RwLock<Vec<String>>,
}

impl FixtureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a response for an exact URL.
    pub fn insert(&self, url: impl Into<String>, response: RawResponse) -> &Self {
        if let Ok(mut responses) = self.responses.write() {
            responses.insert(url.into(), response);
        }
        self
    }

    /// Records a 200 response whose body is read from a fixture file.
    pub fn insert_file(&self, url: impl Into<String>, path: &Path) -> std::io::Result<&Self> {
        let body = std::fs::read_to_string(path)?;
        Ok(self.insert(url, RawResponse::ok(body)))
    }

    /// Makes every URL starting with `prefix` fail with `error`.
    pub fn fail_prefix(&self, prefix: impl Into<String>, error: TransportError) -> &Self {
        if let Ok(mut failures) = self.failures.write() {
            failures.push((prefix.into(), error));
        }
        self
    }

    /// URLs requested so far, in order.
    pub fn requested(&self) -> Vec<String> {
        self.requests
            .read()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Transport for FixtureTransport {
    async fn get(&self, request: &HttpRequest) -> Result<RawResponse, TransportError> {
        if let Ok(mut requests) = self.requests.write() {
            requests.push(request.url.clone());
        }

        if let Ok(failures) = self.failures.read() {
            if let Some((_, error)) = failures
                .iter()
                .find(|(prefix, _)| request.url.starts_with(prefix.as_str()))
            {
                return Err(error.clone());
            }
        }

        self.responses
            .read()
            .ok()
            .and_then(|responses| responses.get(&request.url).cloned())
            .ok_or_else(|| TransportError::NotRecorded {
                url: request.url.clone(),
            })
    }
}
