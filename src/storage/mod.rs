pub mod traits;
pub mod sqlite;

pub use traits::{ArticleRepository, FeedRepository};
pub use sqlite::{SqliteArticleRepository, SqliteFeedRepository, SqliteStorage};
