use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedFormat {
    Rss,
    Atom,
    Unknown,
}

impl FeedFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedFormat::Rss => "rss",
            FeedFormat::Atom => "atom",
            FeedFormat::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FeedFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How often the feed is expected to be crawled. Informational; the
/// scheduler that acts on it lives outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlFrequency {
    Hourly,
    #[default]
    Daily,
    Weekly,
}

impl CrawlFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlFrequency::Hourly => "hourly",
            CrawlFrequency::Daily => "daily",
            CrawlFrequency::Weekly => "weekly",
        }
    }
}

impl std::str::FromStr for CrawlFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hourly" => Ok(CrawlFrequency::Hourly),
            "daily" => Ok(CrawlFrequency::Daily),
            "weekly" => Ok(CrawlFrequency::Weekly),
            _ => Err(format!("Unknown crawl frequency: {}", s)),
        }
    }
}

impl std::fmt::Display for CrawlFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registered feed as the registry stores it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedDescriptor {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub source: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub enabled: bool,
    pub crawl_frequency: CrawlFrequency,
    pub error_count: u32,
    pub last_error: Option<String>,
    pub last_crawled: Option<DateTime<Utc>>,
    pub created_at: Option<String>,
}

/// Fields needed to register a feed.
#[derive(Debug, Clone)]
pub struct NewFeed {
    pub url: String,
    pub name: String,
    pub source: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub crawl_frequency: CrawlFrequency,
}

impl NewFeed {
    pub fn new(url: String, name: String, source: String) -> Self {
        Self {
            url,
            name,
            source,
            category: None,
            description: None,
            crawl_frequency: CrawlFrequency::default(),
        }
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_crawl_frequency(mut self, crawl_frequency: CrawlFrequency) -> Self {
        self.crawl_frequency = crawl_frequency;
        self
    }
}

/// What the registry should record after a run.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthUpdate {
    pub success: bool,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl HealthUpdate {
    pub fn succeeded(timestamp: DateTime<Utc>) -> Self {
        Self {
            success: true,
            error_message: None,
            timestamp,
        }
    }

    pub fn failed(error_message: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            success: false,
            error_message: Some(error_message),
            timestamp,
        }
    }
}
