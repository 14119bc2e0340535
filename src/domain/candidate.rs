use std::sync::OnceLock;

use regex::Regex;

use super::FeedFormat;

/// Fetched body plus the format detected for it. Lives for one run.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub body: String,
    pub format: FeedFormat,
}

impl RawDocument {
    pub fn new(body: String) -> Self {
        Self {
            body,
            format: FeedFormat::Unknown,
        }
    }
}

/// A field value as publishers actually emit it: sometimes a bare string,
/// sometimes an element carrying attributes around its text.
#[derive(Debug, Clone, PartialEq)]
pub enum TextOrNode {
    Text(String),
    Node {
        text: Option<String>,
        attributes: Vec<(String, String)>,
    },
}

impl TextOrNode {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        match self {
            TextOrNode::Text(_) => None,
            TextOrNode::Node { attributes, .. } => attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
        }
    }

    /// The text value, ignoring any wrapper attributes. Blank text is `None`.
    pub fn into_text(self) -> Option<String> {
        let text = match self {
            TextOrNode::Text(text) => Some(text),
            TextOrNode::Node { text, .. } => text,
        };
        text.filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Enclosure {
    pub url: Option<String>,
    pub mime_type: Option<String>,
}

/// Every place an item might name its picture.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaHints {
    pub media_content: Option<String>,
    pub media_thumbnail: Option<String>,
    pub enclosure: Option<Enclosure>,
    pub html_body: Option<String>,
}

fn img_src_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)<img[^>]+src\s*=\s*["']([^"'>]+)["']"#).expect("valid img pattern")
    })
}

impl MediaHints {
    /// Pick the image URL. The first source that has one wins; sources are
    /// never merged.
    pub fn image_url(&self) -> Option<String> {
        if let Some(url) = &self.media_content {
            return Some(url.clone());
        }

        if let Some(url) = &self.media_thumbnail {
            return Some(url.clone());
        }

        if let Some(Enclosure {
            url: Some(url),
            mime_type: Some(mime),
        }) = &self.enclosure
        {
            if mime.starts_with("image/") {
                return Some(url.clone());
            }
        }

        self.html_body
            .as_deref()
            .and_then(|html| img_src_pattern().captures(html))
            .map(|caps| caps[1].to_string())
    }
}

/// An extracted item before any validation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CandidateItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub summary: Option<String>,
    pub published: Option<String>,
    pub guid: Option<String>,
    pub media: MediaHints,
}
