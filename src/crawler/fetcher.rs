//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the pipeline, including:
//! - Building the HTTP client with identification headers and timeout
//! - GET requests for page content
//! - Decoding response bodies through the encoding policy
//! - Failure classification
//!
//! Failures are returned as values. A broken page never raises; the caller
//! logs it and skips that branch. There is no retry.

use crate::config::{CrawlerConfig, HttpConfig};
use crate::encoding::EncodingPolicy;
use crate::{ConfigError, HarvestError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::time::Duration;

/// How a fetch ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    Ok,
    /// Server answered with a non-2xx status
    HttpError(u16),
    /// DNS, connection, TLS or body read failure
    NetworkError(String),
    /// Request exceeded the configured timeout
    Timeout,
}

/// Result of a fetch operation
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// The requested URL
    pub url: String,

    pub status: FetchStatus,

    /// Decoded text (successful fetches only)
    pub text: Option<String>,

    /// Name of the encoding used to decode `body`
    pub encoding: Option<&'static str>,
}

impl FetchResult {
    fn failed(url: &str, status: FetchStatus) -> Self {
        Self {
            url: url.to_string(),
            status,
            text: None,
            encoding: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == FetchStatus::Ok
    }

    /// Converts a failure into the crate error reported for the page
    pub fn into_text(self) -> Result<String, HarvestError> {
        let reason = match self.status {
            FetchStatus::Ok => {
                return self.text.ok_or_else(|| HarvestError::Parse {
                    url: self.url.clone(),
                    message: "response had no decodable body".to_string(),
                })
            }
            FetchStatus::HttpError(code) => format!("HTTP {}", code),
            FetchStatus::NetworkError(reason) => reason,
            FetchStatus::Timeout => "request timed out".to_string(),
        };

        Err(HarvestError::Network {
            url: self.url,
            reason,
        })
    }
}

/// Builds an HTTP client with identification headers
///
/// # Arguments
///
/// * `http` - Header and encoding configuration
/// * `timeout` - Per-request timeout, covering connect and body read
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(HarvestError)` - A header value is invalid or the client failed to build
pub fn build_http_client(http: &HttpConfig, timeout: Duration) -> Result<Client, HarvestError> {
    let mut headers = HeaderMap::new();
    if let Some(language) = &http.accept_language {
        let value = HeaderValue::from_str(language).map_err(|e| {
            ConfigError::Validation(format!("invalid accept-language '{}': {}", language, e))
        })?;
        headers.insert(ACCEPT_LANGUAGE, value);
    }

    let client = Client::builder()
        .user_agent(http.user_agent.as_str())
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Issues GET requests and decodes the responses
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: EncodingPolicy,
}

impl Fetcher {
    pub fn new(http: &HttpConfig, crawler: &CrawlerConfig) -> Result<Self, HarvestError> {
        Ok(Self {
            client: build_http_client(http, crawler.timeout())?,
            policy: EncodingPolicy::from_config(http)?,
        })
    }

    /// Fetches a URL
    ///
    /// Never fails: every outcome, including network errors, is described by
    /// the returned `FetchResult`.
    pub async fn fetch(&self, url: &str) -> FetchResult {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return FetchResult::failed(url, classify(&e)),
        };

        let status = response.status();
        if !status.is_success() {
            return FetchResult::failed(url, FetchStatus::HttpError(status.as_u16()));
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return FetchResult::failed(url, classify(&e)),
        };

        let (text, encoding) = self.policy.decode(&bytes);
        tracing::trace!("Decoded {} ({} bytes) as {}", url, bytes.len(), encoding.name());

        FetchResult {
            url: url.to_string(),
            status: FetchStatus::Ok,
            text: Some(text),
            encoding: Some(encoding.name()),
        }
    }
}

/// Maps a transport error to a fetch status
fn classify(error: &reqwest::Error) -> FetchStatus {
    if error.is_timeout() {
        FetchStatus::Timeout
    } else if error.is_connect() {
        FetchStatus::NetworkError(format!("connection failed: {}", error))
    } else {
        FetchStatus::NetworkError(error.to_string())
    }
}
