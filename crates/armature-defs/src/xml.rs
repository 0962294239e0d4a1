//! Minimal element tree built from quick-xml events.
//!
//! The parser needs random access to children and parents' attributes, so the
//! event stream is folded into a small owned tree first.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// An XML element with its attributes and child elements. Text is dropped.
#[derive(Debug, Clone, Default)]
pub(crate) struct Element {
    pub name: String,
    attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn first_child(&self) -> Option<&Element> {
        self.children.first()
    }
}

/// Parse a document and return its root element.
pub(crate) fn parse_document(xml: &str) -> Result<Element, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(element_from(&e)?),
            Ok(Event::Empty(e)) => {
                let element = element_from(&e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| "unexpected closing tag".to_string())?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "error at position {}: {}",
                    reader.error_position(),
                    e
                ))
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!("unclosed element <{}>", open.name));
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

fn element_from(start: &BytesStart<'_>) -> Result<Element, String> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| format!("bad attribute on <{name}>: {e}"))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| format!("bad value for '{key}' on <{name}>: {e}"))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<(), String> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(format!("second root element <{}>", element.name)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_shape() {
        let root = parse_document(
            r#"<?xml version="1.0"?>
            <entity name="bot">
                <!-- comment -->
                <link name="a"><inertial/></link>
                <link name="b"/>
                <joint name="j"/>
            </entity>"#,
        )
        .unwrap();
        assert_eq!(root.name, "entity");
        assert_eq!(root.attribute("name"), Some("bot"));
        assert_eq!(root.children_named("link").count(), 2);
        assert!(root.child("link").unwrap().child("inertial").is_some());
        assert_eq!(root.attribute("missing"), None);
    }

    #[test]
    fn test_escaped_attribute() {
        let root = parse_document(r#"<entity name="a &amp; b"/>"#).unwrap();
        assert_eq!(root.attribute("name"), Some("a & b"));
    }

    #[test]
    fn test_malformed() {
        assert!(parse_document("<entity><link></entity>").is_err());
        assert!(parse_document("<entity>").is_err());
        assert!(parse_document("").is_err());
    }
}
