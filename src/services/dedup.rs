use tracing::debug;

use crate::domain::{ArticleSummary, NewArticle};
use crate::errors::{IngestError, IngestResult};
use crate::storage::traits::ArticleRepository;

/// What the gate did with one batch of normalized articles.
#[derive(Debug, Default)]
pub struct Persisted {
    pub saved: Vec<ArticleSummary>,
    pub skipped: usize,
}

/// Checks candidates against the article store by URL and inserts the new ones.
pub struct DedupGate<'a, A: ArticleRepository> {
    repository: &'a A,
}

impl<'a, A: ArticleRepository> DedupGate<'a, A> {
    pub fn new(repository: &'a A) -> Self {
        Self { repository }
    }

    /// Persist `articles` in order.
    ///
    /// A URL that is already stored, or that another writer stores between our
    /// lookup and insert, is a skip. Any other store error aborts the batch.
    pub fn persist(&self, articles: &[NewArticle]) -> IngestResult<Persisted> {
        let mut result = Persisted::default();

        for article in articles {
            let existing = self.repository.find_by_url(&article.url).map_err(|e| {
                IngestError::Persistence(format!("lookup of {} failed: {}", article.url, e))
            })?;

            if existing.is_some() {
                debug!(url = %article.url, "already stored, skipping");
                result.skipped += 1;
                continue;
            }

            match self.repository.insert(article) {
                Ok(stored) => {
                    debug!(url = %stored.url, id = stored.id, "stored");
                    result.saved.push(stored.summary_view());
                }
                Err(e) if e.is_conflict() => {
                    debug!(url = %article.url, "stored concurrently, skipping");
                    result.skipped += 1;
                }
                Err(e) => {
                    return Err(IngestError::Persistence(format!(
                        "insert of {} failed: {}",
                        article.url, e
                    )));
                }
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Article;
    use crate::storage::traits::MockArticleRepository;
    use chrono::{TimeZone, Utc};
    use mockall::predicate::eq;

    fn new_article(url: &str) -> NewArticle {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        NewArticle::new("Title".to_string(), url.to_string(), "Example".to_string(), at, at)
    }

    fn stored(id: i64, article: &NewArticle) -> Article {
        Article {
            id,
            title: article.title.clone(),
            url: article.url.clone(),
            summary: article.summary.clone(),
            source: article.source.clone(),
            image_url: article.image_url.clone(),
            published_at: article.published_at,
            extracted_at: article.extracted_at,
            created_at: article.extracted_at,
            updated_at: article.extracted_at,
        }
    }

    #[test]
    fn test_existing_url_is_skipped_without_insert() {
        let existing = stored(7, &new_article("https://n.example/a"));
        let mut repo = MockArticleRepository::new();
        repo.expect_find_by_url()
            .with(eq("https://n.example/a"))
            .returning(move |_| Ok(Some(existing.clone())));
        repo.expect_insert().times(0);

        let result = DedupGate::new(&repo)
            .persist(&[new_article("https://n.example/a")])
            .unwrap();

        assert!(result.saved.is_empty());
        assert_eq!(result.skipped, 1);
    }

    #[test]
    fn test_new_urls_are_saved_in_order() {
        let mut repo = MockArticleRepository::new();
        repo.expect_find_by_url().returning(|_| Ok(None));
        let mut next_id = 0;
        repo.expect_insert().times(2).returning(move |article| {
            next_id += 1;
            Ok(stored(next_id, article))
        });

        let result = DedupGate::new(&repo)
            .persist(&[new_article("https://n.example/1"), new_article("https://n.example/2")])
            .unwrap();

        assert_eq!(result.skipped, 0);
        let urls: Vec<_> = result.saved.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["https://n.example/1", "https://n.example/2"]);
        assert_eq!(result.saved[1].id, 2);
    }

    #[test]
    fn test_insert_conflict_counts_as_skip() {
        let mut repo = MockArticleRepository::new();
        repo.expect_find_by_url().returning(|_| Ok(None));
        repo.expect_insert()
            .returning(|article| Err(IngestError::Conflict(article.url.clone())));

        let result = DedupGate::new(&repo)
            .persist(&[new_article("https://n.example/raced")])
            .unwrap();

        assert!(result.saved.is_empty());
        assert_eq!(result.skipped, 1);
    }

    #[test]
    fn test_hard_store_failure_aborts() {
        let mut repo = MockArticleRepository::new();
        repo.expect_find_by_url().returning(|_| Ok(None));
        repo.expect_insert()
            .times(1)
            .returning(|_| Err(IngestError::Persistence("disk full".to_string())));

        let result = DedupGate::new(&repo).persist(&[
            new_article("https://n.example/1"),
            new_article("https://n.example/2"),
        ]);

        match result {
            Err(IngestError::Persistence(message)) => {
                assert!(message.contains("https://n.example/1"));
                assert!(message.contains("disk full"));
            }
            other => panic!("expected persistence failure, got {:?}", other),
        }
    }
}
