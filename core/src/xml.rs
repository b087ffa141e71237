//! Minimal owned XML element tree.
//!
//! The console speaks small, flat documents: one root element carrying
//! attributes, a few nested children, occasional text. `Element` is just
//! enough tree to build requests and to query responses by tag and attribute.
//! Parsing and writing go through quick-xml; entities are never expanded
//! beyond the predefined five.

use std::borrow::Cow;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::ApiError;

/// An XML element with its attributes, text content and child elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: Option<String>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Set an attribute, replacing any existing value under the same name.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn into_children(self) -> Vec<Element> {
        self.children
    }

    /// First direct child named `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Consumes the element and returns its first direct child named `name`.
    pub fn take_child(self, name: &str) -> Option<Element> {
        self.children.into_iter().find(|c| c.name == name)
    }

    /// First element named `name` below this one, in document order.
    pub fn descendant(&self, name: &str) -> Option<&Element> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.descendant(name) {
                return Some(found);
            }
        }
        None
    }

    /// Serializes the element (no XML declaration).
    pub fn to_xml(&self) -> Result<String, ApiError> {
        let mut writer = Writer::new(Vec::new());
        self.write_into(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(|e| ApiError::SerializationError(e.to_string()))
    }

    fn write_into(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), ApiError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (k, v) in &self.attributes {
            start.push_attribute((k.as_str(), v.as_str()));
        }

        if self.children.is_empty() && self.text.is_none() {
            return write_event(writer, Event::Empty(start));
        }

        write_event(writer, Event::Start(start))?;
        if let Some(text) = &self.text {
            write_event(writer, Event::Text(BytesText::new(text)))?;
        }
        for child in &self.children {
            child.write_into(writer)?;
        }
        write_event(writer, Event::End(BytesEnd::new(self.name.as_str())))
    }
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), ApiError> {
    writer
        .write_event(event)
        .map_err(|e| ApiError::SerializationError(e.to_string()))
}

/// Parses a complete document and returns its root element.
///
/// Declarations, comments, processing instructions and DOCTYPE are skipped.
/// Whitespace-only text is dropped. An element's text is the character data
/// before its first child, kept verbatim; text after a child is discarded.
pub fn parse(bytes: &[u8]) -> Result<Element, ApiError> {
    let mut reader = Reader::from_reader(bytes);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => stack.push(start_element(e)?),
            Ok(Event::Empty(ref e)) => {
                let element = start_element(e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| malformed("closing tag without opening tag"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(ref t)) => {
                let text = t.unescape().map_err(|e| malformed(e.to_string()))?;
                append_text(&mut stack, text)?;
            }
            Ok(Event::CData(c)) => {
                let text = String::from_utf8(c.into_inner().into_owned())
                    .map_err(|e| malformed(e.to_string()))?;
                append_text(&mut stack, Cow::Owned(text))?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(malformed(e.to_string())),
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(malformed(format!("unclosed element <{}>", open.name)));
    }
    root.ok_or_else(|| malformed("document has no root element"))
}

fn malformed(msg: impl Into<String>) -> ApiError {
    ApiError::MalformedResponse(msg.into())
}

fn start_element(e: &BytesStart<'_>) -> Result<Element, ApiError> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|err| malformed(err.to_string()))?
        .to_string();
    let mut element = Element::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(|err| malformed(err.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref()).map_err(|err| malformed(err.to_string()))?;
        let value = attr.unescape_value().map_err(|err| malformed(err.to_string()))?;
        element.attributes.push((key.to_string(), value.into_owned()));
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<(), ApiError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(malformed("multiple root elements")),
    }
}

fn append_text(stack: &mut [Element], text: Cow<'_, str>) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Ok(());
    }
    let Some(current) = stack.last_mut() else {
        return Err(malformed("text outside the root element"));
    };
    // Tail text after a child element.
    if !current.children.is_empty() {
        return Ok(());
    }
    match current.text.as_mut() {
        Some(existing) => existing.push_str(&text),
        None => current.text = Some(text.into_owned()),
    }
    Ok(())
}
