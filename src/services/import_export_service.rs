use opml::{Outline, OPML};
use tracing::{debug, info};

use crate::domain::FeedDescriptor;
use crate::errors::{IngestError, IngestResult};
use crate::services::feed_service::{new_feed, FeedOptions};
use crate::storage::traits::FeedRepository;

pub struct ImportResult {
    pub added: Vec<FeedDescriptor>,
    pub invalid: Vec<(String, String)>, // (url, error_message)
    pub duplicates: Vec<String>,
}

/// A feed outline found in an OPML document.
#[derive(Debug, Clone, PartialEq)]
struct OutlineFeed {
    url: String,
    name: Option<String>,
    category: Option<String>,
    description: Option<String>,
}

pub struct ImportExportService<R: FeedRepository> {
    repository: R,
}

impl<R: FeedRepository> ImportExportService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    /// Import feeds from OPML content
    pub fn import_opml(&self, content: &str) -> IngestResult<ImportResult> {
        let opml = OPML::from_str(content).map_err(|e| IngestError::OpmlParse(e.to_string()))?;

        let mut result = ImportResult {
            added: Vec::new(),
            invalid: Vec::new(),
            duplicates: Vec::new(),
        };

        for outline in collect_feeds(&opml.body.outlines, None) {
            if self.repository.exists(&outline.url)? {
                result.duplicates.push(outline.url);
                continue;
            }

            let options = FeedOptions {
                name: outline.name,
                category: outline.category,
                description: outline.description,
                ..Default::default()
            };

            let added = new_feed(&outline.url, options).and_then(|feed| {
                let id = self.repository.add(&feed)?;
                self.repository
                    .get_by_id(id)?
                    .ok_or(IngestError::FeedNotFound(id))
            });

            match added {
                Ok(feed) => {
                    debug!(url = %feed.url, id = feed.id, "imported feed");
                    result.added.push(feed);
                }
                Err(e) => result.invalid.push((outline.url, e.to_string())),
            }
        }

        info!(
            added = result.added.len(),
            duplicates = result.duplicates.len(),
            invalid = result.invalid.len(),
            "OPML import finished"
        );
        Ok(result)
    }

    /// Export feeds to OPML format
    pub fn export_opml(&self) -> IngestResult<String> {
        let feeds = self.repository.get_all()?;

        let mut opml = OPML::default();
        opml.head = Some(opml::Head {
            title: Some("News Ingest Feeds".to_string()),
            ..Default::default()
        });

        for feed in feeds {
            let outline = Outline {
                text: feed.name.clone(),
                r#type: Some("rss".to_string()),
                xml_url: Some(feed.url),
                title: Some(feed.name),
                category: feed.category,
                description: feed.description,
                ..Default::default()
            };
            opml.body.outlines.push(outline);
        }

        opml.to_string()
            .map_err(|e| IngestError::OpmlParse(e.to_string()))
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Recursively collect feed outlines. A folder outline (no `xmlUrl`) lends
/// its text as the category of the feeds inside it.
fn collect_feeds(outlines: &[Outline], folder: Option<&str>) -> Vec<OutlineFeed> {
    let mut feeds = Vec::new();

    for outline in outlines {
        match non_blank(&outline.xml_url) {
            Some(url) => {
                let text = Some(outline.text.clone());
                feeds.push(OutlineFeed {
                    url,
                    name: non_blank(&outline.title).or_else(|| non_blank(&text)),
                    category: non_blank(&outline.category).or_else(|| folder.map(str::to_string)),
                    description: non_blank(&outline.description),
                });
            }
            None => {
                let text = outline.text.trim();
                let folder = if text.is_empty() { folder } else { Some(text) };
                feeds.extend(collect_feeds(&outline.outlines, folder));
            }
        }
    }

    feeds
}
