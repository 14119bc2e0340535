use crate::domain::{Article, FeedDescriptor, HealthUpdate, NewArticle, NewFeed};
use crate::errors::IngestResult;

#[cfg_attr(test, mockall::automock)]
pub trait FeedRepository: Send + Sync {
    fn add(&self, feed: &NewFeed) -> IngestResult<i64>;
    fn remove(&self, id: i64) -> IngestResult<()>;
    fn get_all(&self) -> IngestResult<Vec<FeedDescriptor>>;
    fn get_enabled(&self) -> IngestResult<Vec<FeedDescriptor>>;
    fn get_by_id(&self, id: i64) -> IngestResult<Option<FeedDescriptor>>;
    fn exists(&self, url: &str) -> IngestResult<bool>;
    fn set_enabled(&self, id: i64, enabled: bool) -> IngestResult<()>;
    /// Record a run's outcome. A failure increments the error count by one
    /// and leaves the last-crawled time alone.
    fn update_health(&self, id: i64, update: &HealthUpdate) -> IngestResult<()>;
}

#[cfg_attr(test, mockall::automock)]
pub trait ArticleRepository: Send + Sync {
    fn find_by_url(&self, url: &str) -> IngestResult<Option<Article>>;
    /// Insert a new article. Fails with `IngestError::Conflict` when the URL
    /// is already stored.
    fn insert(&self, article: &NewArticle) -> IngestResult<Article>;
    fn recent(&self, limit: usize) -> IngestResult<Vec<Article>>;
    fn count(&self) -> IngestResult<i64>;
}
