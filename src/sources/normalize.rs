use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, Utc};
use tracing::debug;

use crate::domain::{CandidateItem, NewArticle};
use crate::errors::{IngestError, IngestResult};

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parse a publisher's date string into an absolute instant.
///
/// Zone-less forms are read as UTC. The result is truncated to whole
/// milliseconds, the precision instants are stored with.
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    parse_instant_any(raw).map(|instant| instant.trunc_subsecs(3))
}

fn parse_instant_any(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Turn one candidate into an insertable article, or `None` if it lacks a
/// title, a link or a usable date.
pub fn normalize_item(
    candidate: CandidateItem,
    source: &str,
    now: DateTime<Utc>,
) -> Option<NewArticle> {
    let image_url = candidate.media.image_url();

    let Some(title) = non_blank(candidate.title) else {
        debug!(guid = ?candidate.guid, "dropping item without title");
        return None;
    };
    let Some(url) = non_blank(candidate.link) else {
        debug!(title = %title, "dropping item without link");
        return None;
    };
    let Some(published_at) = candidate.published.as_deref().and_then(parse_published) else {
        debug!(url = %url, raw = ?candidate.published, "dropping item with unusable date");
        return None;
    };

    Some(
        NewArticle::new(title, url, source.to_string(), published_at, now)
            .with_summary(non_blank(candidate.summary))
            .with_image_url(image_url),
    )
}

/// Normalize every candidate, keeping extraction order.
///
/// Fails with [`IngestError::NoValidItems`] when nothing survives.
pub fn normalize_items(
    candidates: Vec<CandidateItem>,
    source: &str,
    now: DateTime<Utc>,
) -> IngestResult<Vec<NewArticle>> {
    let total = candidates.len();
    let articles: Vec<NewArticle> = candidates
        .into_iter()
        .filter_map(|candidate| normalize_item(candidate, source, now))
        .collect();

    debug!(total, valid = articles.len(), "normalized candidates");

    if articles.is_empty() {
        return Err(IngestError::NoValidItems);
    }

    Ok(articles)
}
