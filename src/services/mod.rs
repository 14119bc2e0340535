pub mod dedup;
pub mod health;
pub mod ingest_service;
pub mod feed_service;
pub mod import_export_service;

pub use dedup::{DedupGate, Persisted};
pub use health::HealthTracker;
pub use ingest_service::IngestService;
pub use feed_service::{FeedOptions, FeedService};
pub use import_export_service::{ImportExportService, ImportResult};
