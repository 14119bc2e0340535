use crate::domain::FeedFormat;
use crate::errors::{IngestError, IngestResult};
use crate::sources::xml::XmlElement;

/// Classify a parsed document by its root container.
///
/// An RSS channel with no items is still RSS (and later yields no valid
/// items); an Atom feed must carry at least one entry to be recognised.
pub fn detect_format(doc: &XmlElement) -> FeedFormat {
    match doc.local_name() {
        "rss" if doc.child("channel").is_some() => FeedFormat::Rss,
        "feed" if doc.child("entry").is_some() => FeedFormat::Atom,
        _ => FeedFormat::Unknown,
    }
}

/// Like [`detect_format`], but an unknown format is an error.
pub fn require_supported(doc: &XmlElement) -> IngestResult<FeedFormat> {
    match detect_format(doc) {
        FeedFormat::Unknown => Err(IngestError::UnsupportedFormat(format!(
            "root element <{}> is neither an RSS channel nor an Atom feed",
            doc.name
        ))),
        format => Ok(format),
    }
}
