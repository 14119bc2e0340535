pub mod feed;
pub mod article;
pub mod candidate;
pub mod outcome;
pub mod timestamp;

pub use feed::{CrawlFrequency, FeedDescriptor, FeedFormat, HealthUpdate, NewFeed};
pub use article::{Article, ArticleSummary, NewArticle};
pub use candidate::{CandidateItem, Enclosure, MediaHints, RawDocument, TextOrNode};
pub use outcome::{FeedIdentity, RunFailure, RunOutcome, RunReport, RunResult, RunState};
