use tracing::debug;

use crate::domain::{CandidateItem, Enclosure, FeedFormat, MediaHints};
use crate::sources::xml::XmlElement;

const RSS_DATE_FIELDS: &[&str] = &["pubDate", "pubdate", "dc:date"];
const ATOM_DATE_FIELDS: &[&str] = &["published", "updated"];

/// Walk a detected document and pull out one candidate per item/entry.
pub fn extract_items(doc: &XmlElement, format: FeedFormat) -> Vec<CandidateItem> {
    let candidates: Vec<CandidateItem> = match format {
        FeedFormat::Rss => doc
            .child("channel")
            .map(|channel| channel.children_named("item").map(rss_item).collect())
            .unwrap_or_default(),
        FeedFormat::Atom => doc.children_named("entry").map(atom_entry).collect(),
        FeedFormat::Unknown => Vec::new(),
    };

    debug!(format = %format, count = candidates.len(), "extracted candidates");
    candidates
}

fn text_of(element: &XmlElement, name: &str) -> Option<String> {
    element.child(name).and_then(|c| c.value().into_text())
}

fn rss_item(item: &XmlElement) -> CandidateItem {
    let link = text_of(item, "link");
    let description = text_of(item, "description");
    let encoded = text_of(item, "content:encoded");

    let guid = text_of(item, "guid").or_else(|| link.clone());
    let published = item
        .first_of(RSS_DATE_FIELDS)
        .and_then(|d| d.text())
        .map(str::to_string);

    CandidateItem {
        title: text_of(item, "title"),
        link,
        media: media_hints(item, join_bodies(description.as_deref(), encoded.as_deref())),
        summary: description,
        published,
        guid,
    }
}

fn atom_entry(entry: &XmlElement) -> CandidateItem {
    let link = atom_link(entry);
    let summary = text_of(entry, "summary");
    let content = text_of(entry, "content");

    let guid = text_of(entry, "id").or_else(|| link.clone());
    let published = entry
        .first_of(ATOM_DATE_FIELDS)
        .and_then(|d| d.text())
        .map(str::to_string);

    CandidateItem {
        title: text_of(entry, "title"),
        link,
        media: media_hints(entry, join_bodies(summary.as_deref(), content.as_deref())),
        summary: summary.or(content),
        published,
        guid,
    }
}

/// Atom links are usually `<link href=".."/>`, occasionally bare text.
/// The alternate (or rel-less) link is the article itself.
fn atom_link(entry: &XmlElement) -> Option<String> {
    let links: Vec<&XmlElement> = entry.children_named("link").collect();

    let href = links
        .iter()
        .copied()
        .filter(|link| matches!(link.attr("rel"), None | Some("alternate")))
        .find_map(|link| link.attr("href"))
        .or_else(|| links.iter().find_map(|link| link.attr("href")))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string);

    href.or_else(|| links.iter().find_map(|link| link.text()).map(str::to_string))
}

fn join_bodies(first: Option<&str>, second: Option<&str>) -> Option<String> {
    match (first, second) {
        (Some(a), Some(b)) => Some(format!("{}\n{}", a, b)),
        (Some(a), None) => Some(a.to_string()),
        (None, Some(b)) => Some(b.to_string()),
        (None, None) => None,
    }
}

/// First `url` attribute on an element called `name`, looking inside
/// `media:group` as well.
fn media_url(element: &XmlElement, name: &str) -> Option<String> {
    let direct = element.children_named(name);
    let grouped = element
        .children_named("media:group")
        .flat_map(move |group| group.children_named(name));

    direct
        .chain(grouped)
        .find_map(|media| media.attr("url"))
        .map(str::to_string)
}

fn media_hints(element: &XmlElement, html_body: Option<String>) -> MediaHints {
    let enclosures: Vec<&XmlElement> = element.children_named("enclosure").collect();
    let enclosure = enclosures
        .iter()
        .find(|e| e.attr("type").is_some_and(|t| t.starts_with("image/")))
        .or_else(|| enclosures.first())
        .map(|e| Enclosure {
            url: e.attr("url").map(str::to_string),
            mime_type: e.attr("type").map(str::to_string),
        });

    MediaHints {
        media_content: media_url(element, "media:content"),
        media_thumbnail: media_url(element, "media:thumbnail"),
        enclosure,
        html_body,
    }
}
