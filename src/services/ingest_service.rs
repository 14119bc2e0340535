use std::thread;

use chrono::{SubsecRound, Utc};
use tracing::{debug, info, warn};

use crate::domain::{
    FeedDescriptor, FeedIdentity, RawDocument, RunFailure, RunOutcome, RunReport, RunResult,
    RunState,
};
use crate::errors::{IngestError, IngestResult};
use crate::services::dedup::DedupGate;
use crate::services::health::HealthTracker;
use crate::sources::fetcher::FeedFetcher;
use crate::sources::{extract_items, normalize_items, require_supported, xml};
use crate::storage::traits::{ArticleRepository, FeedRepository};

pub const DEFAULT_MAX_PARALLEL: usize = 4;

/// Drives ingestion runs: one feed in, one structured result out.
pub struct IngestService<F: FeedRepository, A: ArticleRepository, H: FeedFetcher> {
    feed_repository: F,
    article_repository: A,
    fetcher: H,
    max_parallel: usize,
}

impl<F: FeedRepository, A: ArticleRepository, H: FeedFetcher> IngestService<F, A, H> {
    pub fn new(feed_repository: F, article_repository: A, fetcher: H) -> Self {
        Self {
            feed_repository,
            article_repository,
            fetcher,
            max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }

    /// Bound on concurrent runs in [`IngestService::run_enabled`]. Zero is
    /// treated as one.
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    pub fn article_repository(&self) -> &A {
        &self.article_repository
    }

    pub fn fetcher(&self) -> &H {
        &self.fetcher
    }

    /// Run the full pipeline for one feed.
    ///
    /// An unknown feed fails in `Loading` and touches nothing. Every other
    /// run ends with exactly one health update, recorded after the outcome
    /// is known; its own failure is logged and does not change the result.
    pub fn run(&self, feed_id: i64) -> RunResult {
        let feed = match self.feed_repository.get_by_id(feed_id) {
            Ok(Some(feed)) => feed,
            Ok(None) => {
                let e = IngestError::FeedNotFound(feed_id);
                warn!(feed_id, "run requested for unknown feed");
                return Err(failure(feed_id, RunState::Loading, &e));
            }
            Err(e) => {
                warn!(feed_id, error = %e, "could not load feed");
                return Err(failure(feed_id, RunState::Loading, &e));
            }
        };

        let mut stage = RunState::Loading;
        let outcome = self.execute(&feed, &mut stage);

        let tracker = HealthTracker::new(&self.feed_repository);
        let update = HealthTracker::<F>::update_for(outcome.as_ref().err(), Utc::now());
        tracker.record(feed.id, &update);

        match outcome {
            Ok(report) => {
                debug!(feed_id, state = ?RunState::Succeeded, "run state");
                info!(
                    feed_id,
                    feed = %feed.name,
                    seen = report.stats.seen,
                    saved = report.stats.saved,
                    skipped = report.stats.skipped,
                    "run succeeded"
                );
                Ok(report)
            }
            Err(e) => {
                debug!(feed_id, state = ?RunState::Failed, "run state");
                warn!(feed_id, feed = %feed.name, stage = ?stage, error = %e, "run failed");
                Err(failure(feed_id, stage, &e))
            }
        }
    }

    fn execute(&self, feed: &FeedDescriptor, stage: &mut RunState) -> IngestResult<RunReport> {
        let started = Utc::now().trunc_subsecs(3);

        advance(stage, feed.id);
        let fetched = self.fetcher.fetch(&feed.url)?;
        debug!(feed_id = feed.id, status = fetched.status, bytes = fetched.body.len(), "fetched");
        let mut document = RawDocument::new(fetched.body);

        advance(stage, feed.id);
        let tree = xml::parse_document(&document.body)?;
        document.format = require_supported(&tree)?;
        debug!(feed_id = feed.id, format = %document.format, "detected format");

        advance(stage, feed.id);
        let candidates = extract_items(&tree, document.format);
        let seen = candidates.len();

        advance(stage, feed.id);
        let articles = normalize_items(candidates, &feed.source, started)?;

        advance(stage, feed.id);
        let persisted = DedupGate::new(&self.article_repository).persist(&articles)?;

        advance(stage, feed.id);
        Ok(RunReport {
            feed: FeedIdentity::from(feed),
            stats: RunOutcome {
                seen,
                processed: articles.len(),
                saved: persisted.saved.len(),
                skipped: persisted.skipped,
            },
            saved_items: persisted.saved,
            finished_at: Utc::now(),
        })
    }

    /// Run every given feed once, at most `max_parallel` at a time. Results
    /// come back in input order.
    pub fn run_many(&self, feed_ids: &[i64]) -> Vec<RunResult> {
        let mut results = Vec::with_capacity(feed_ids.len());

        for batch in feed_ids.chunks(self.max_parallel) {
            thread::scope(|scope| {
                let handles: Vec<_> = batch
                    .iter()
                    .map(|&id| scope.spawn(move || self.run(id)))
                    .collect();

                for handle in handles {
                    match handle.join() {
                        Ok(result) => results.push(result),
                        Err(panic) => std::panic::resume_unwind(panic),
                    }
                }
            });
        }

        results
    }

    /// Run every enabled feed once. Disabled feeds are left alone.
    pub fn run_enabled(&self) -> IngestResult<Vec<RunResult>> {
        let ids: Vec<i64> = self
            .feed_repository
            .get_enabled()?
            .iter()
            .map(|feed| feed.id)
            .collect();

        info!(feeds = ids.len(), max_parallel = self.max_parallel, "crawling enabled feeds");
        Ok(self.run_many(&ids))
    }
}

fn advance(stage: &mut RunState, feed_id: i64) {
    if let Some(next) = stage.next() {
        *stage = next;
        debug!(feed_id, state = ?next, "run state");
    }
}

fn failure(feed_id: i64, stage: RunState, error: &IngestError) -> RunFailure {
    RunFailure {
        feed_id,
        class: error.class(),
        stage,
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Article, CrawlFrequency, NewFeed};
    use crate::errors::{ErrorClass, FetchError};
    use crate::sources::fetcher::{FetchedBody, MockFeedFetcher};
    use crate::storage::sqlite::{SqliteArticleRepository, SqliteFeedRepository, SqliteStorage};
    use crate::storage::traits::{MockArticleRepository, MockFeedRepository};
    use mockall::predicate::eq;

    const TWO_ITEMS: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Example</title>
    <item>
      <title>First</title>
      <link>https://n.example/1</link>
      <pubDate>Wed, 10 Jan 2024 15:30:45 -0500</pubDate>
    </item>
    <item>
      <title>Second</title>
      <link>https://n.example/2</link>
      <pubdate>Thu, 11 Jan 2024 08:00:00 GMT</pubdate>
    </item>
  </channel>
</rss>"#;

    fn descriptor(id: i64) -> FeedDescriptor {
        FeedDescriptor {
            id,
            url: "https://n.example/feed.xml".to_string(),
            name: "Example News".to_string(),
            source: "Example".to_string(),
            category: None,
            description: None,
            enabled: true,
            crawl_frequency: CrawlFrequency::Daily,
            error_count: 3,
            last_error: Some("HTTP 500".to_string()),
            last_crawled: None,
            created_at: None,
        }
    }

    fn feeds_with(id: i64) -> MockFeedRepository {
        let mut feeds = MockFeedRepository::new();
        let feed = descriptor(id);
        feeds
            .expect_get_by_id()
            .with(eq(id))
            .returning(move |_| Ok(Some(feed.clone())));
        feeds
    }

    fn serving(body: &'static str) -> MockFeedFetcher {
        let mut fetcher = MockFeedFetcher::new();
        fetcher.expect_fetch().returning(move |_| {
            Ok(FetchedBody {
                status: 200,
                body: body.to_string(),
            })
        });
        fetcher
    }

    fn stored(id: i64, url: &str) -> Article {
        let at = Utc::now();
        Article {
            id,
            title: "Stored".to_string(),
            url: url.to_string(),
            summary: None,
            source: "Example".to_string(),
            image_url: None,
            published_at: at,
            extracted_at: at,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_unknown_feed_fails_without_health_update() {
        let mut feeds = MockFeedRepository::new();
        feeds.expect_get_by_id().returning(|_| Ok(None));
        feeds.expect_update_health().times(0);
        let mut fetcher = MockFeedFetcher::new();
        fetcher.expect_fetch().times(0);

        let service = IngestService::new(feeds, MockArticleRepository::new(), fetcher);
        let failure = service.run(42).unwrap_err();

        assert_eq!(failure.class, ErrorClass::NotFound);
        assert_eq!(failure.stage, RunState::Loading);
        assert_eq!(failure.feed_id, 42);
    }

    #[test]
    fn test_timeout_records_failure_and_stores_nothing() {
        let mut feeds = feeds_with(1);
        feeds
            .expect_update_health()
            .withf(|id, update| {
                *id == 1
                    && !update.success
                    && update.error_message.as_deref() == Some("Feed fetch failed: request timed out")
            })
            .times(1)
            .returning(|_, _| Ok(()));
        let mut articles = MockArticleRepository::new();
        articles.expect_find_by_url().times(0);
        articles.expect_insert().times(0);
        let mut fetcher = MockFeedFetcher::new();
        fetcher.expect_fetch().returning(|_| Err(FetchError::Timeout));

        let service = IngestService::new(feeds, articles, fetcher);
        let failure = service.run(1).unwrap_err();

        assert_eq!(failure.class, ErrorClass::Fetch);
        assert_eq!(failure.stage, RunState::Fetching);
        assert!(failure.message.contains("timed out"));
    }

    #[test]
    fn test_all_duplicates_is_a_success() {
        let mut feeds = feeds_with(1);
        feeds
            .expect_update_health()
            .withf(|id, update| *id == 1 && update.success && update.error_message.is_none())
            .times(1)
            .returning(|_, _| Ok(()));
        let mut articles = MockArticleRepository::new();
        articles
            .expect_find_by_url()
            .times(2)
            .returning(|url| Ok(Some(stored(9, url))));
        articles.expect_insert().times(0);

        let service = IngestService::new(feeds, articles, serving(TWO_ITEMS));
        let report = service.run(1).unwrap();

        assert_eq!(report.stats.seen, 2);
        assert_eq!(report.stats.processed, 2);
        assert_eq!(report.stats.saved, 0);
        assert_eq!(report.stats.skipped, 2);
        assert!(report.saved_items.is_empty());
        assert_eq!(report.feed.name, "Example News");
    }

    #[test]
    fn test_unsupported_document() {
        let mut feeds = feeds_with(1);
        feeds
            .expect_update_health()
            .withf(|_, update| !update.success)
            .times(1)
            .returning(|_, _| Ok(()));

        let service = IngestService::new(
            feeds,
            MockArticleRepository::new(),
            serving("<html><body>Not a feed</body></html>"),
        );
        let failure = service.run(1).unwrap_err();

        assert_eq!(failure.class, ErrorClass::UnsupportedFormat);
        assert_eq!(failure.stage, RunState::Parsing);
    }

    #[test]
    fn test_no_valid_items() {
        let mut feeds = feeds_with(1);
        feeds
            .expect_update_health()
            .withf(|_, update| !update.success)
            .times(1)
            .returning(|_, _| Ok(()));
        let body = r#"<rss><channel><item><title>No link or date</title></item></channel></rss>"#;

        let service = IngestService::new(feeds, MockArticleRepository::new(), serving(body));
        let failure = service.run(1).unwrap_err();

        assert_eq!(failure.class, ErrorClass::NoValidItems);
        assert_eq!(failure.stage, RunState::Normalizing);
    }

    #[test]
    fn test_store_failure_is_persistence() {
        let mut feeds = feeds_with(1);
        feeds
            .expect_update_health()
            .withf(|_, update| !update.success)
            .times(1)
            .returning(|_, _| Ok(()));
        let mut articles = MockArticleRepository::new();
        articles.expect_find_by_url().returning(|_| Ok(None));
        articles
            .expect_insert()
            .returning(|_| Err(IngestError::Persistence("disk full".to_string())));

        let service = IngestService::new(feeds, articles, serving(TWO_ITEMS));
        let failure = service.run(1).unwrap_err();

        assert_eq!(failure.class, ErrorClass::Persistence);
        assert_eq!(failure.stage, RunState::Persisting);
    }

    #[test]
    fn test_health_update_failure_does_not_change_result() {
        let mut feeds = feeds_with(1);
        feeds
            .expect_update_health()
            .times(1)
            .returning(|_, _| Err(IngestError::Persistence("locked".to_string())));
        let mut articles = MockArticleRepository::new();
        articles
            .expect_find_by_url()
            .returning(|url| Ok(Some(stored(1, url))));

        let service = IngestService::new(feeds, articles, serving(TWO_ITEMS));
        let report = service.run(1).unwrap();

        assert_eq!(report.stats.skipped, 2);
    }

    fn sqlite_service(
        fetcher: MockFeedFetcher,
    ) -> (IngestService<SqliteFeedRepository, SqliteArticleRepository, MockFeedFetcher>, i64) {
        let storage = SqliteStorage::in_memory().unwrap();
        let feeds = SqliteFeedRepository::new(storage.clone());
        let id = feeds
            .add(&NewFeed::new(
                "https://n.example/feed.xml".to_string(),
                "Example News".to_string(),
                "Example".to_string(),
            ))
            .unwrap();
        let articles = SqliteArticleRepository::new(storage);
        (IngestService::new(feeds, articles, fetcher), id)
    }

    #[test]
    fn test_rerun_saves_nothing_new() {
        let (service, id) = sqlite_service(serving(TWO_ITEMS));

        let first = service.run(id).unwrap();
        assert_eq!(first.stats.saved, 2);
        assert_eq!(first.saved_items[0].url, "https://n.example/1");
        assert_eq!(
            first.saved_items[0].published_at.to_rfc3339(),
            "2024-01-10T20:30:45+00:00"
        );

        let second = service.run(id).unwrap();
        assert_eq!(second.stats.saved, 0);
        assert_eq!(second.stats.skipped, 2);
        assert_eq!(service.article_repository().count().unwrap(), 2);
    }

    #[test]
    fn test_run_enabled_skips_disabled_feeds() {
        let storage = SqliteStorage::in_memory().unwrap();
        let feeds = SqliteFeedRepository::new(storage.clone());
        let on = feeds
            .add(&NewFeed::new(
                "https://a.example/feed".to_string(),
                "A".to_string(),
                "A".to_string(),
            ))
            .unwrap();
        let off = feeds
            .add(&NewFeed::new(
                "https://b.example/feed".to_string(),
                "B".to_string(),
                "B".to_string(),
            ))
            .unwrap();
        feeds.set_enabled(off, false).unwrap();

        let mut fetcher = MockFeedFetcher::new();
        fetcher
            .expect_fetch()
            .times(1)
            .returning(|_| Err(FetchError::HttpStatus(503)));

        let service = IngestService::new(feeds, SqliteArticleRepository::new(storage), fetcher)
            .with_max_parallel(2);
        let results = service.run_enabled().unwrap();

        assert_eq!(results.len(), 1);
        let failure = results[0].as_ref().unwrap_err();
        assert_eq!(failure.feed_id, on);
        assert_eq!(failure.class, ErrorClass::Fetch);
    }
}
