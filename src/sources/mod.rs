pub mod fetcher;
pub mod xml;
pub mod detect;
pub mod extract;
pub mod normalize;

pub use fetcher::{FeedFetcher, FetchConfig, FetchedBody, HttpFetcher};
pub use detect::{detect_format, require_supported};
pub use extract::extract_items;
pub use normalize::{normalize_items, parse_published};
