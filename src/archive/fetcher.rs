//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests made against the archive, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests with a per-call timeout
//! - Bounded retries with a fixed delay for transient failures
//! - Error classification

use crate::config::{RequestConfig, UserAgentConfig};
use reqwest::{redirect::Policy, Client};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Maximum redirect hops followed for a single request
const MAX_REDIRECTS: usize = 10;

/// A successfully fetched response
#[derive(Debug, Clone)]
pub struct Fetched {
    /// Final URL after redirects
    pub final_url: String,
    /// HTTP status code
    pub status: u16,
    /// Content-Type header value
    pub content_type: Option<String>,
    /// Raw body bytes
    pub body: Vec<u8>,
}

impl Fetched {
    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Returns true if the response looks like an HTML document
    ///
    /// Archived captures often carry a wrong or missing Content-Type, so the
    /// body is sniffed when the header does not say HTML.
    pub fn is_html(&self) -> bool {
        if let Some(content_type) = &self.content_type {
            if content_type.to_ascii_lowercase().contains("html") {
                return true;
            }
        }

        let head_len = self.body.len().min(2048);
        let head = String::from_utf8_lossy(&self.body[..head_len]).to_ascii_lowercase();
        head.contains("<html") || head.contains("<!doctype html")
    }
}

/// Why a request failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// The URL could not be parsed
    InvalidUrl(String),
    /// The request could not be built
    Builder(String),
    /// Non-success HTTP status
    Status(u16),
    /// The per-call timeout elapsed
    Timeout,
    /// Connection refused, DNS or TLS failure
    Connect(String),
    /// The body could not be read or decoded
    Body(String),
    /// Redirect loop or too many hops
    Redirect(String),
    /// Any other transport failure
    Transport(String),
    /// A success status with nothing in the body
    EmptyBody,
}

impl FetchFailure {
    /// Returns true if another attempt could succeed
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Timeout, connect, body read | Retry |
    /// | HTTP 408, 429, 5xx | Retry |
    /// | Other HTTP 4xx (incl. 404) | Fail immediately |
    /// | Malformed URL, request build | Fail immediately |
    /// | Redirect loop | Fail immediately |
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Connect(_) | Self::Body(_) | Self::Transport(_) => true,
            Self::Status(code) => matches!(code, 408 | 429 | 500..=599),
            Self::InvalidUrl(_) | Self::Builder(_) | Self::Redirect(_) | Self::EmptyBody => false,
        }
    }

    /// Returns true for HTTP 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status(404))
    }

    fn from_reqwest(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_connect() {
            Self::Connect(error.to_string())
        } else if error.is_builder() {
            Self::Builder(error.to_string())
        } else if error.is_redirect() {
            Self::Redirect(error.to_string())
        } else if error.is_body() || error.is_decode() {
            Self::Body(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl(msg) => write!(f, "invalid URL: {}", msg),
            Self::Builder(msg) => write!(f, "request build error: {}", msg),
            Self::Status(code) => write!(f, "HTTP {}", code),
            Self::Timeout => write!(f, "request timeout"),
            Self::Connect(msg) => write!(f, "connection failed: {}", msg),
            Self::Body(msg) => write!(f, "body read failed: {}", msg),
            Self::Redirect(msg) => write!(f, "redirect error: {}", msg),
            Self::Transport(msg) => write!(f, "transport error: {}", msg),
            Self::EmptyBody => write!(f, "empty body"),
        }
    }
}

/// A request that failed after all allowed attempts
#[derive(Debug, Clone, Error)]
#[error("GET {url} failed after {attempts} attempt(s): {reason}")]
pub struct FetchError {
    pub url: String,
    pub attempts: u32,
    pub reason: FetchFailure,
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        self.reason.is_not_found()
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use wayback_salvage::config::UserAgentConfig;
/// use wayback_salvage::archive::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "WaybackSalvage".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// GET with bounded retries and a fixed delay between attempts
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    max_attempts: u32,
    delay: Duration,
}

impl Fetcher {
    pub fn new(client: Client, max_attempts: u32, delay: Duration) -> Self {
        Self {
            client,
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Creates a fetcher from the request settings
    pub fn from_config(client: Client, config: &RequestConfig) -> Self {
        Self::new(client, config.max_retries, config.delay())
    }

    /// Fetches `url`, making at most `max_attempts` attempts
    ///
    /// Every attempt carries `timeout`. Non-retryable failures return after
    /// the first attempt.
    pub async fn fetch(&self, url: &str, timeout: Duration) -> Result<Fetched, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError {
            url: url.to_string(),
            attempts: 0,
            reason: FetchFailure::InvalidUrl(e.to_string()),
        })?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!("GET {} (attempt {}/{})", url, attempt, self.max_attempts);

            match self.attempt(parsed.clone(), timeout).await {
                Ok(fetched) => return Ok(fetched),
                Err(reason) => {
                    if !reason.is_retryable() || attempt >= self.max_attempts {
                        return Err(FetchError {
                            url: url.to_string(),
                            attempts: attempt,
                            reason,
                        });
                    }

                    warn!(
                        "GET {} failed ({}), retrying in {:?} (attempt {}/{})",
                        url, reason, self.delay, attempt, self.max_attempts
                    );
                    tokio::time::sleep(self.delay).await;
                }
            }
        }
    }

    async fn attempt(&self, url: Url, timeout: Duration) -> Result<Fetched, FetchFailure> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchFailure::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status(status.as_u16()));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response
            .bytes()
            .await
            .map_err(|e| match FetchFailure::from_reqwest(&e) {
                FetchFailure::Timeout => FetchFailure::Timeout,
                other => FetchFailure::Body(other.to_string()),
            })?;

        Ok(Fetched {
            final_url,
            status: status.as_u16(),
            content_type,
            body: body.to_vec(),
        })
    }
}
