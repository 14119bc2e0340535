use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored article. Never modified by the ingestion pipeline once inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub summary: Option<String>,
    pub source: String,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub extracted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    pub fn summary_view(&self) -> ArticleSummary {
        ArticleSummary {
            id: self.id,
            title: self.title.clone(),
            url: self.url.clone(),
            source: self.source.clone(),
            published_at: self.published_at,
            has_image: self.image_url.is_some(),
        }
    }
}

/// A normalized candidate ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub title: String,
    pub url: String,
    pub summary: Option<String>,
    pub source: String,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub extracted_at: DateTime<Utc>,
}

impl NewArticle {
    pub fn new(
        title: String,
        url: String,
        source: String,
        published_at: DateTime<Utc>,
        extracted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            title,
            url,
            summary: None,
            source,
            image_url: None,
            published_at,
            extracted_at,
        }
    }

    pub fn with_summary(mut self, summary: Option<String>) -> Self {
        self.summary = summary;
        self
    }

    pub fn with_image_url(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }
}

/// What a caller gets back for each newly stored article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub has_image: bool,
}
