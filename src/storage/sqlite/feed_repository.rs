use rusqlite::Row;

use crate::domain::timestamp::{format_instant, parse_instant};
use crate::domain::{CrawlFrequency, FeedDescriptor, HealthUpdate, NewFeed};
use crate::errors::{IngestError, IngestResult};
use crate::storage::sqlite::SqliteStorage;
use crate::storage::traits::FeedRepository;

const FEED_COLUMNS: &str = "id, url, name, source, category, description, enabled, crawl_frequency, \
     error_count, last_error, last_crawled, created_at";

pub struct SqliteFeedRepository {
    storage: SqliteStorage,
}

impl SqliteFeedRepository {
    pub fn new(storage: SqliteStorage) -> Self {
        Self { storage }
    }
}

fn feed_from_row(row: &Row<'_>) -> rusqlite::Result<FeedDescriptor> {
    let frequency: String = row.get(7)?;
    let error_count: i64 = row.get(8)?;
    let last_crawled: Option<String> = row.get(10)?;

    Ok(FeedDescriptor {
        id: row.get(0)?,
        url: row.get(1)?,
        name: row.get(2)?,
        source: row.get(3)?,
        category: row.get(4)?,
        description: row.get(5)?,
        enabled: row.get(6)?,
        crawl_frequency: frequency.parse().unwrap_or(CrawlFrequency::Daily),
        error_count: u32::try_from(error_count).unwrap_or(0),
        last_error: row.get(9)?,
        last_crawled: last_crawled.as_deref().and_then(parse_instant),
        created_at: row.get(11)?,
    })
}

impl FeedRepository for SqliteFeedRepository {
    fn add(&self, feed: &NewFeed) -> IngestResult<i64> {
        let conn = self.storage.connection()?;

        // Check if already exists (within the same connection to avoid deadlock)
        let mut stmt = conn.prepare("SELECT EXISTS(SELECT 1 FROM rss_feeds WHERE url = ?1)")?;
        let exists: bool = stmt.query_row([&feed.url], |row| row.get(0))?;
        drop(stmt);

        if exists {
            return Err(IngestError::FeedAlreadyExists(feed.url.clone()));
        }

        conn.execute(
            "INSERT INTO rss_feeds (url, name, source, category, description, crawl_frequency) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                &feed.url,
                &feed.name,
                &feed.source,
                &feed.category,
                &feed.description,
                feed.crawl_frequency.as_str(),
            ),
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn remove(&self, id: i64) -> IngestResult<()> {
        let conn = self.storage.connection()?;
        conn.execute("DELETE FROM rss_feeds WHERE id = ?1", [id])?;
        Ok(())
    }

    fn get_all(&self) -> IngestResult<Vec<FeedDescriptor>> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM rss_feeds ORDER BY created_at DESC, id DESC",
            FEED_COLUMNS
        ))?;

        let feeds = stmt.query_map([], feed_from_row)?;
        feeds.collect::<Result<Vec<_>, _>>().map_err(IngestError::from)
    }

    fn get_enabled(&self) -> IngestResult<Vec<FeedDescriptor>> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM rss_feeds WHERE enabled = 1 ORDER BY id",
            FEED_COLUMNS
        ))?;

        let feeds = stmt.query_map([], feed_from_row)?;
        feeds.collect::<Result<Vec<_>, _>>().map_err(IngestError::from)
    }

    fn get_by_id(&self, id: i64) -> IngestResult<Option<FeedDescriptor>> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM rss_feeds WHERE id = ?1", FEED_COLUMNS))?;

        match stmt.query_row([id], feed_from_row) {
            Ok(f) => Ok(Some(f)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(IngestError::from(e)),
        }
    }

    fn exists(&self, url: &str) -> IngestResult<bool> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare("SELECT EXISTS(SELECT 1 FROM rss_feeds WHERE url = ?1)")?;
        let exists: bool = stmt.query_row([url], |row| row.get(0))?;
        Ok(exists)
    }

    fn set_enabled(&self, id: i64, enabled: bool) -> IngestResult<()> {
        let conn = self.storage.connection()?;
        let changed = conn.execute(
            "UPDATE rss_feeds SET enabled = ?1 WHERE id = ?2",
            (enabled, id),
        )?;

        if changed == 0 {
            return Err(IngestError::FeedNotFound(id));
        }
        Ok(())
    }

    fn update_health(&self, id: i64, update: &HealthUpdate) -> IngestResult<()> {
        let conn = self.storage.connection()?;

        let changed = if update.success {
            conn.execute(
                "UPDATE rss_feeds SET last_crawled = ?1, error_count = 0, last_error = NULL WHERE id = ?2",
                (format_instant(&update.timestamp), id),
            )?
        } else {
            conn.execute(
                "UPDATE rss_feeds SET error_count = error_count + 1, last_error = ?1 WHERE id = ?2",
                (&update.error_message, id),
            )?
        };

        if changed == 0 {
            return Err(IngestError::FeedNotFound(id));
        }
        Ok(())
    }
}
