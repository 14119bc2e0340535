use serde::Serialize;
use thiserror::Error;

/// Why a fetch did not produce a usable body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {0}")]
    HttpStatus(u16),
}

#[derive(Error, Debug)]
pub enum IngestError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Feed registry errors
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(String),

    #[error("Feed not found: {0}")]
    FeedNotFound(i64),

    #[error("Feed already exists: {0}")]
    FeedAlreadyExists(String),

    // Pipeline errors
    #[error("Feed fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Unsupported feed format: {0}")]
    UnsupportedFormat(String),

    #[error("No valid items in feed")]
    NoValidItems,

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("Article already stored: {0}")]
    Conflict(String),

    #[error("Health update failed: {0}")]
    HealthUpdate(String),

    // Parsing errors
    #[error("XML parsing failed: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("OPML parsing failed: {0}")]
    OpmlParse(String),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    // Storage errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // User input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Coarse classification of a failed run, stable enough for callers to map
/// onto their own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    NotFound,
    Fetch,
    UnsupportedFormat,
    NoValidItems,
    Persistence,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::NotFound => "not_found",
            ErrorClass::Fetch => "fetch",
            ErrorClass::UnsupportedFormat => "unsupported_format",
            ErrorClass::NoValidItems => "no_valid_items",
            ErrorClass::Persistence => "persistence",
        }
    }

    /// Conventional HTTP status for an adapter that exposes runs over HTTP.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorClass::NotFound => 404,
            ErrorClass::Fetch => 502,
            _ => 500,
        }
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl IngestError {
    /// Classify an error raised somewhere below the orchestrator.
    ///
    /// Anything that is not one of the pipeline's own kinds came out of the
    /// store and counts as a persistence failure.
    pub fn class(&self) -> ErrorClass {
        match self {
            IngestError::FeedNotFound(_) => ErrorClass::NotFound,
            IngestError::Fetch(_) => ErrorClass::Fetch,
            IngestError::UnsupportedFormat(_) | IngestError::Xml(_) => {
                ErrorClass::UnsupportedFormat
            }
            IngestError::NoValidItems => ErrorClass::NoValidItems,
            _ => ErrorClass::Persistence,
        }
    }

    /// True when the store rejected an insert because the URL already exists.
    pub fn is_conflict(&self) -> bool {
        matches!(self, IngestError::Conflict(_))
    }
}

pub type IngestResult<T> = Result<T, IngestError>;
