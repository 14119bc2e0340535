use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{ArticleSummary, FeedDescriptor};
use crate::errors::ErrorClass;

/// Stages of a single ingestion run, in the only order they may occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Loading,
    Fetching,
    Parsing,
    Extracting,
    Normalizing,
    Persisting,
    Finalizing,
    Succeeded,
    Failed,
}

impl RunState {
    /// The stage that follows this one on the happy path.
    pub fn next(&self) -> Option<RunState> {
        match self {
            RunState::Loading => Some(RunState::Fetching),
            RunState::Fetching => Some(RunState::Parsing),
            RunState::Parsing => Some(RunState::Extracting),
            RunState::Extracting => Some(RunState::Normalizing),
            RunState::Normalizing => Some(RunState::Persisting),
            RunState::Persisting => Some(RunState::Finalizing),
            RunState::Finalizing => Some(RunState::Succeeded),
            RunState::Succeeded | RunState::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Succeeded | RunState::Failed)
    }
}

/// Running tally for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub seen: usize,
    pub processed: usize,
    pub saved: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedIdentity {
    pub id: i64,
    pub name: String,
    pub source: String,
}

impl From<&FeedDescriptor> for FeedIdentity {
    fn from(feed: &FeedDescriptor) -> Self {
        Self {
            id: feed.id,
            name: feed.name.clone(),
            source: feed.source.clone(),
        }
    }
}

/// Result of a run that reached `Succeeded`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub feed: FeedIdentity,
    pub stats: RunOutcome,
    pub saved_items: Vec<ArticleSummary>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn message(&self) -> String {
        format!(
            "{} new items saved ({} processed, {} skipped)",
            self.stats.saved, self.stats.processed, self.stats.skipped
        )
    }
}

/// Result of a run that ended in `Failed`.
#[derive(Debug, Clone, Serialize)]
pub struct RunFailure {
    pub feed_id: i64,
    pub class: ErrorClass,
    pub stage: RunState,
    pub message: String,
}

impl std::fmt::Display for RunFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "feed {} failed while {:?} ({}): {}",
            self.feed_id, self.stage, self.class, self.message
        )
    }
}

pub type RunResult = Result<RunReport, RunFailure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states_progress_linearly() {
        let mut state = RunState::Loading;
        let mut visited = vec![state];
        while let Some(next) = state.next() {
            visited.push(next);
            state = next;
        }

        assert_eq!(
            visited,
            vec![
                RunState::Loading,
                RunState::Fetching,
                RunState::Parsing,
                RunState::Extracting,
                RunState::Normalizing,
                RunState::Persisting,
                RunState::Finalizing,
                RunState::Succeeded,
            ]
        );
        assert!(state.is_terminal());
        assert!(RunState::Failed.next().is_none());
    }

    #[test]
    fn test_failure_serializes_class_and_stage() {
        let failure = RunFailure {
            feed_id: 3,
            class: ErrorClass::Fetch,
            stage: RunState::Fetching,
            message: "Feed fetch failed: request timed out".to_string(),
        };

        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["class"], "fetch");
        assert_eq!(json["stage"], "fetching");
        assert_eq!(json["feed_id"], 3);
    }
}
