use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::domain::HealthUpdate;
use crate::errors::IngestError;
use crate::storage::traits::FeedRepository;

/// Turns the terminal outcome of a run into a feed health update.
pub struct HealthTracker<'a, F: FeedRepository> {
    repository: &'a F,
}

impl<'a, F: FeedRepository> HealthTracker<'a, F> {
    pub fn new(repository: &'a F) -> Self {
        Self { repository }
    }

    /// Success stamps the crawl time and clears the error streak. Failure
    /// bumps the streak and keeps the message.
    pub fn update_for(error: Option<&IngestError>, now: DateTime<Utc>) -> HealthUpdate {
        match error {
            None => HealthUpdate::succeeded(now),
            Some(e) => HealthUpdate::failed(e.to_string(), now),
        }
    }

    /// Best effort: a failed write is logged and never changes the run result.
    pub fn record(&self, feed_id: i64, update: &HealthUpdate) -> bool {
        match self.repository.update_health(feed_id, update) {
            Ok(()) => {
                debug!(feed_id, success = update.success, "feed health updated");
                true
            }
            Err(e) => {
                let e = IngestError::HealthUpdate(e.to_string());
                warn!(feed_id, error = %e, "could not record feed health");
                false
            }
        }
    }
}
