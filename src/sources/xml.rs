//! Minimal element tree over `quick-xml` events.
//!
//! Feeds are walked as a tree so that "one child" and "many children" look
//! the same to the extractor: every element simply has a `Vec` of children.

use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::domain::TextOrNode;
use crate::errors::{IngestError, IngestResult};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    /// Qualified name as written, e.g. `media:content`.
    pub name: String,
    pub attributes: Vec<(String, String)>,
    /// Concatenated text and CDATA directly inside this element.
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn from_start(start: &BytesStart<'_>) -> Self {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let attributes = start
            .attributes()
            .with_checks(false)
            .filter_map(|attr| attr.ok())
            .map(|attr| {
                let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                let value = match attr.unescape_value_with(resolve_html5_entity) {
                    Ok(value) => value.into_owned(),
                    Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
                };
                (key, value)
            })
            .collect();

        Self {
            name,
            attributes,
            ..Default::default()
        }
    }

    /// Name without any namespace prefix.
    pub fn local_name(&self) -> &str {
        match self.name.rsplit_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// First child matching any of `names`, trying the names in order.
    pub fn first_of(&self, names: &[&str]) -> Option<&XmlElement> {
        names.iter().find_map(|name| self.child(name))
    }

    /// Trimmed text, `None` when blank.
    pub fn text(&self) -> Option<&str> {
        let text = self.text.trim();
        (!text.is_empty()).then_some(text)
    }

    pub fn value(&self) -> TextOrNode {
        if self.attributes.is_empty() && self.children.is_empty() {
            TextOrNode::Text(self.text.trim().to_string())
        } else {
            TextOrNode::Node {
                text: self.text().map(str::to_string),
                attributes: self.attributes.clone(),
            }
        }
    }
}

fn attach(stack: &mut Vec<XmlElement>, root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

/// Build a tree from a feed body.
///
/// Mismatched or missing end tags are tolerated; only input that yields no
/// root element at all is rejected.
pub fn parse_document(xml: &str) -> IngestResult<XmlElement> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = false;

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            // Keep whatever was built before the damage.
            Err(err) if !stack.is_empty() || root.is_some() => {
                debug!(error = %err, "stopping at malformed XML");
                break;
            }
            Err(err) => return Err(err.into()),
        };

        match event {
            Event::Start(e) => stack.push(XmlElement::from_start(&e)),
            Event::Empty(e) => {
                let element = XmlElement::from_start(&e);
                attach(&mut stack, &mut root, element);
            }
            Event::End(_) => {
                if let Some(element) = stack.pop() {
                    attach(&mut stack, &mut root, element);
                }
            }
            Event::Text(e) => {
                if let Some(current) = stack.last_mut() {
                    // Feeds routinely carry HTML named entities such as `&nbsp;`.
                    match e.unescape_with(resolve_html5_entity) {
                        Ok(text) => current.text.push_str(&text),
                        Err(_) => current.text.push_str(&String::from_utf8_lossy(&e)),
                    }
                }
            }
            Event::CData(e) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    // Unclosed elements at end of input still count.
    while let Some(element) = stack.pop() {
        attach(&mut stack, &mut root, element);
    }

    root.ok_or_else(|| IngestError::UnsupportedFormat("document has no root element".to_string()))
}
