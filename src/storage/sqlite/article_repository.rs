use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{ErrorCode, Row};

use crate::domain::timestamp::{format_instant, parse_instant};
use crate::domain::{Article, NewArticle};
use crate::errors::{IngestError, IngestResult};
use crate::storage::sqlite::SqliteStorage;
use crate::storage::traits::ArticleRepository;

const ARTICLE_COLUMNS: &str =
    "id, title, url, summary, source, image_url, published_at, extracted_at, created_at, updated_at";

pub struct SqliteArticleRepository {
    storage: SqliteStorage,
}

impl SqliteArticleRepository {
    pub fn new(storage: SqliteStorage) -> Self {
        Self { storage }
    }
}

fn instant_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_instant(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("invalid timestamp: {}", raw).into(),
        )
    })
}

fn article_from_row(row: &Row<'_>) -> rusqlite::Result<Article> {
    Ok(Article {
        id: row.get(0)?,
        title: row.get(1)?,
        url: row.get(2)?,
        summary: row.get(3)?,
        source: row.get(4)?,
        image_url: row.get(5)?,
        published_at: instant_column(row, 6)?,
        extracted_at: instant_column(row, 7)?,
        created_at: instant_column(row, 8)?,
        updated_at: instant_column(row, 9)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

impl ArticleRepository for SqliteArticleRepository {
    fn find_by_url(&self, url: &str) -> IngestResult<Option<Article>> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM articles WHERE url = ?1",
            ARTICLE_COLUMNS
        ))?;

        match stmt.query_row([url], article_from_row) {
            Ok(a) => Ok(Some(a)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(IngestError::from(e)),
        }
    }

    fn insert(&self, article: &NewArticle) -> IngestResult<Article> {
        let conn = self.storage.connection()?;
        // Creation and update stamps are the extraction time of the run.
        // Instants are stored at millisecond precision.
        let published_at = article.published_at.trunc_subsecs(3);
        let extracted_at = article.extracted_at.trunc_subsecs(3);
        let stamp = format_instant(&extracted_at);

        let inserted = conn.execute(
            "INSERT INTO articles (title, url, summary, source, image_url, published_at, extracted_at, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            (
                &article.title,
                &article.url,
                &article.summary,
                &article.source,
                &article.image_url,
                format_instant(&published_at),
                &stamp,
                &stamp,
            ),
        );

        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(IngestError::Conflict(article.url.clone()));
            }
            Err(e) => return Err(IngestError::from(e)),
        }

        Ok(Article {
            id: conn.last_insert_rowid(),
            title: article.title.clone(),
            url: article.url.clone(),
            summary: article.summary.clone(),
            source: article.source.clone(),
            image_url: article.image_url.clone(),
            published_at,
            extracted_at,
            created_at: extracted_at,
            updated_at: extracted_at,
        })
    }

    fn recent(&self, limit: usize) -> IngestResult<Vec<Article>> {
        let conn = self.storage.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM articles ORDER BY published_at DESC, id DESC LIMIT ?1",
            ARTICLE_COLUMNS
        ))?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let articles = stmt.query_map([limit], article_from_row)?;
        articles.collect::<Result<Vec<_>, _>>().map_err(IngestError::from)
    }

    fn count(&self) -> IngestResult<i64> {
        let conn = self.storage.connection()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        Ok(count)
    }
}
