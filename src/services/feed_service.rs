use url::Url;

use crate::domain::{CrawlFrequency, FeedDescriptor, NewFeed};
use crate::errors::{IngestError, IngestResult};
use crate::storage::traits::FeedRepository;

/// Optional fields accepted when registering a feed.
#[derive(Debug, Clone, Default)]
pub struct FeedOptions {
    pub name: Option<String>,
    pub source: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub crawl_frequency: CrawlFrequency,
}

pub struct FeedService<R: FeedRepository> {
    repository: R,
}

/// Parse `raw` as an absolute http(s) URL with a host.
pub fn validate_feed_url(raw: &str) -> IngestResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| IngestError::InvalidUrl(format!("{}: {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(IngestError::InvalidUrl(format!(
            "{}: only http and https feeds are supported",
            raw
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(IngestError::InvalidUrl(format!("{}: missing host", raw)));
    }

    Ok(url)
}

/// The label used for articles when the caller gives none: the URL host
/// without a leading `www.`.
pub fn default_source_label(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Build a [`NewFeed`] from a URL and whatever optional fields were given.
pub fn new_feed(url: &str, options: FeedOptions) -> IngestResult<NewFeed> {
    let parsed = validate_feed_url(url)?;
    let source = non_blank(options.source).unwrap_or_else(|| default_source_label(&parsed));
    let name = non_blank(options.name).unwrap_or_else(|| source.clone());

    Ok(NewFeed::new(url.trim().to_string(), name, source)
        .with_category(non_blank(options.category))
        .with_description(non_blank(options.description))
        .with_crawl_frequency(options.crawl_frequency))
}

impl<R: FeedRepository> FeedService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    /// Register a feed after validating its URL.
    pub fn add(&self, url: &str, options: FeedOptions) -> IngestResult<FeedDescriptor> {
        let feed = new_feed(url, options)?;

        if self.repository.exists(&feed.url)? {
            return Err(IngestError::FeedAlreadyExists(feed.url));
        }

        let id = self.repository.add(&feed)?;
        self.repository
            .get_by_id(id)?
            .ok_or(IngestError::FeedNotFound(id))
    }

    pub fn remove(&self, id: i64) -> IngestResult<()> {
        self.repository.remove(id)
    }

    pub fn list(&self) -> IngestResult<Vec<FeedDescriptor>> {
        self.repository.get_all()
    }

    pub fn get(&self, id: i64) -> IngestResult<Option<FeedDescriptor>> {
        self.repository.get_by_id(id)
    }

    pub fn exists(&self, url: &str) -> IngestResult<bool> {
        self.repository.exists(url)
    }

    /// Enable or disable a feed for batch crawls.
    pub fn set_enabled(&self, id: i64, enabled: bool) -> IngestResult<()> {
        self.repository.set_enabled(id, enabled)
    }
}
