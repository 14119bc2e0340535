use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use tracing::debug;
use url::Url;

use crate::errors::{FetchError, IngestError, IngestResult};

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Connect timeout cap; the total timeout still bounds the whole request.
const CONNECT_TIMEOUT_SECS: u64 = 10;

const FEED_ACCEPT: &str =
    "application/rss+xml, application/atom+xml, application/xml;q=0.9, text/xml;q=0.9, */*;q=0.8";

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_body_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("news-ingest/{} (RSS Feed Crawler)", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(20),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedBody {
    pub status: u16,
    pub body: String,
}

#[cfg_attr(test, mockall::automock)]
pub trait FeedFetcher: Send + Sync {
    /// Fetch a feed document. Non-2xx responses are errors; nothing is retried.
    fn fetch(&self, url: &str) -> Result<FetchedBody, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
    max_body_bytes: u64,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> IngestResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .connect_timeout(config.timeout.min(Duration::from_secs(CONNECT_TIMEOUT_SECS)))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| IngestError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(err.to_string())
    }
}

fn check_scheme(url: &str) -> Result<(), FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::Network(format!("invalid URL: {}", e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(FetchError::Network(format!("unsupported URL scheme: {}", scheme))),
    }
}

impl FeedFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedBody, FetchError> {
        check_scheme(url)?;

        let response = self
            .client
            .get(url)
            .header(ACCEPT, FEED_ACCEPT)
            .send()
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_body_bytes {
                return Err(FetchError::Network(format!(
                    "feed too large: {} bytes (max {} bytes)",
                    length, self.max_body_bytes
                )));
            }
        }

        let body = response.text().map_err(classify)?;
        if body.len() as u64 > self.max_body_bytes {
            return Err(FetchError::Network(format!(
                "feed too large: {} bytes (max {} bytes)",
                body.len(),
                self.max_body_bytes
            )));
        }

        debug!(url, status = status.as_u16(), bytes = body.len(), "fetched feed");

        Ok(FetchedBody {
            status: status.as_u16(),
            body,
        })
    }
}
