//! Transport seam between provider adapters and the network.
//!
//! Adapters build an [`HttpRequest`] and hand it to whatever [`HttpClient`]
//! they were constructed with. Production uses [`ReqwestHttpClient`]; tests
//! substitute scripted clients that never touch the network.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::data_source::SourceFuture;

pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

// Both vendors serve empty or blocked responses to non-browser agents.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// A GET against a vendor chart endpoint.
///
/// Path segments and query values are percent-encoded as they are appended,
/// so `url` is always ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub timeout_ms: u64,
    has_query: bool,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            has_query: url.contains('?'),
            url,
            headers: BTreeMap::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Appends one encoded path segment. Must precede any query parameter.
    pub fn segment(mut self, segment: &str) -> Self {
        debug_assert!(!self.has_query, "path segment after query");
        if !self.url.ends_with('/') {
            self.url.push('/');
        }
        self.url.push_str(&urlencoding::encode(segment));
        self
    }

    pub fn query(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.url.push(if self.has_query { '&' } else { '?' });
        self.has_query = true;
        self.url.push_str(&urlencoding::encode(key));
        self.url.push('=');
        self.url.push_str(&urlencoding::encode(value.as_ref()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok_json(body: impl Into<String>) -> Self {
        Self::with_status(200, body)
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self.status, 200..=299)
    }
}

/// Failure before a status line arrived, or while reading the body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("failed to read response body: {0}")]
    Body(String),
    #[error("request failed: {0}")]
    Other(String),
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    pub const fn timed_out(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(error: reqwest::Error) -> Self {
        let detail = error.to_string();
        if error.is_timeout() {
            Self::Timeout(detail)
        } else if error.is_connect() {
            Self::Connect(detail)
        } else if error.is_body() || error.is_decode() {
            Self::Body(detail)
        } else {
            Self::Other(detail)
        }
    }
}

pub trait HttpClient: Send + Sync {
    fn execute<'a>(&'a self, request: HttpRequest)
        -> SourceFuture<'a, Result<HttpResponse, HttpError>>;
}

/// Answers every request with `{}`; adapters treat that as malformed.
#[derive(Debug, Default)]
pub struct NoopHttpClient;

impl HttpClient for NoopHttpClient {
    fn execute<'a>(
        &'a self,
        _request: HttpRequest,
    ) -> SourceFuture<'a, Result<HttpResponse, HttpError>> {
        Box::pin(async { Ok(HttpResponse::ok_json("{}")) })
    }
}

/// reqwest-backed transport with a shared cookie jar.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .cookie_store(true)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self::with_client(client)
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> SourceFuture<'a, Result<HttpResponse, HttpError>> {
        Box::pin(async move {
            let builder = request
                .headers
                .iter()
                .fold(self.client.get(&request.url), |builder, (name, value)| {
                    builder.header(name, value)
                });

            let response = builder
                .timeout(Duration::from_millis(request.timeout_ms))
                .send()
                .await?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(|error| HttpError::Body(error.to_string()))?;

            Ok(HttpResponse { status, body })
        })
    }
}
