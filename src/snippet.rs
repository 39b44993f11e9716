//! Tiny element tree for the short, self-contained snippets cut out by the
//! scanner. Only what the page and revision extractors need is kept: element
//! names, attributes, direct text and child elements.

use crate::error::SnippetError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, SnippetError> {
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            attributes,
            ..Self::default()
        })
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Parses `xml` and returns its root element.
pub fn parse(xml: &str) -> Result<Element, SnippetError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(Element::from_start(&e)?),
            Event::Empty(e) => {
                let element = Element::from_start(&e)?;
                attach(&mut stack, &mut root, element);
            }
            Event::Text(t) => {
                if let Some(open) = stack.last_mut() {
                    open.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some(open) = stack.last_mut() {
                    open.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => {
                // end names are checked by the reader, so the stack cannot be empty here
                if let Some(element) = stack.pop() {
                    attach(&mut stack, &mut root, element);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(SnippetError::Unclosed(open.name));
    }
    root.ok_or(SnippetError::Empty)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_children_and_attributes() {
        let root = parse(r#"<page><title>A &amp; B</title><redirect title="C" /></page>"#).unwrap();
        assert_eq!(root.name, "page");
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].name, "title");
        assert_eq!(root.children[0].text, "A & B");
        assert_eq!(root.children[1].attribute("title"), Some("C"));
        assert_eq!(root.children[1].attribute("missing"), None);
    }

    #[test]
    fn keeps_nested_elements() {
        let root = parse("<revision><contributor><ip>1.2.3.4</ip></contributor></revision>").unwrap();
        let contributor = &root.children[0];
        assert_eq!(contributor.children[0].name, "ip");
        assert_eq!(contributor.children[0].text, "1.2.3.4");
    }

    #[test]
    fn preserves_whitespace_in_text() {
        let root = parse("<text>  line one\n line two </text>").unwrap();
        assert_eq!(root.text, "  line one\n line two ");
    }

    #[test]
    fn decodes_escaped_markup() {
        let root = parse("<text>&lt;ref&gt;x&lt;/ref&gt;</text>").unwrap();
        assert_eq!(root.text, "<ref>x</ref>");
    }

    #[test]
    fn mismatched_end_tag_is_an_error() {
        assert!(parse("<page><title>x</id></page>").is_err());
    }

    #[test]
    fn unclosed_root_is_an_error() {
        assert!(parse("<page><title>x</title>").is_err());
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(parse("   "), Err(SnippetError::Empty)));
    }
}
