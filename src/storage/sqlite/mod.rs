mod connection;
mod feed_repository;
mod article_repository;

pub use connection::SqliteStorage;
pub use feed_repository::SqliteFeedRepository;
pub use article_repository::SqliteArticleRepository;
