//! Provider XML decoding and single-vs-list repair.
//!
//! The catalog renders a field as a bare element when it occurs once and as
//! repeated siblings when it occurs several times. [`XmlElement::field`]
//! exposes that ambiguity as a [`OneOrMany`]; [`XmlElement::all`] is the
//! normalization boundary and always yields a list.
//!
//! Attributes are discarded, text is trimmed (whitespace-only text becomes an
//! empty string) and the document's root wrapper is stripped by [`normalize`].

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{CatalogError, Result};

/// Envelope children that carry request metadata rather than domain data
const ENVELOPE_METADATA: &[&str] = &["Request"];

/// A field rendered either as a single element or as repeated siblings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Collapse into a list (possibly singleton)
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OneOrMany::One(_) => 1,
            OneOrMany::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        value.into_vec()
    }
}

/// An element of a decoded provider document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Tag name as written by the provider
    pub name: String,
    /// Trimmed concatenation of the element's text and CDATA content
    pub text: String,
    /// Child elements in document order
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Children named `name`, in the shape the provider chose
    pub fn field(&self, name: &str) -> Option<OneOrMany<&XmlElement>> {
        let mut matches: Vec<&XmlElement> = self.children.iter().filter(|c| c.name == name).collect();
        match matches.len() {
            0 => None,
            1 => matches.pop().map(OneOrMany::One),
            _ => Some(OneOrMany::Many(matches)),
        }
    }

    /// Children named `name`, always as a list
    pub fn all(&self, name: &str) -> Vec<&XmlElement> {
        self.field(name).map(OneOrMany::into_vec).unwrap_or_default()
    }

    /// First child named `name`
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// First child named `name`, ignoring ASCII case
    pub fn child_ignore_case(&self, name: &str) -> Option<&XmlElement> {
        self.children
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Follow a chain of child names
    pub fn path(&self, names: &[&str]) -> Option<&XmlElement> {
        names
            .iter()
            .try_fold(self, |node, name| node.child(name))
    }

    /// Text of the first child named `name`.
    ///
    /// `None` when the child is absent; `Some("")` when it is present but empty.
    pub fn text_of(&self, name: &str) -> Option<String> {
        self.child(name).map(|c| c.text.clone())
    }

    /// Text of the first child named `name`, or an empty string
    pub fn text_or_empty(&self, name: &str) -> String {
        self.text_of(name).unwrap_or_default()
    }
}

/// Decode a complete XML document, returning its root element.
///
/// Malformed input fails with [`CatalogError::Decode`]; a partial tree is never
/// returned.
pub fn parse(xml: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                stack.push(XmlElement::new(element_name(e.name().as_ref())));
            }
            Ok(Event::Empty(e)) => {
                let element = XmlElement::new(element_name(e.name().as_ref()));
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(e)) => {
                let mut element = stack.pop().ok_or_else(|| {
                    CatalogError::Decode(format!(
                        "unexpected closing tag </{}>",
                        element_name(e.name().as_ref())
                    ))
                })?;
                element.text = element.text.trim().to_string();
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(quick_xml::Error::from)?;
                append_text(&mut stack, &text)?;
            }
            Ok(Event::CData(e)) => {
                let raw = e.into_inner();
                append_text(&mut stack, &String::from_utf8_lossy(&raw))?;
            }
            Ok(Event::Eof) => break,
            // Declarations, comments, processing instructions and doctypes carry no data
            Ok(_) => {}
            Err(e) => {
                return Err(CatalogError::Decode(format!(
                    "XML parsing error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(CatalogError::Decode(format!(
            "unexpected end of document inside <{}>",
            open.name
        )));
    }

    root.ok_or_else(|| CatalogError::Decode("document has no root element".to_string()))
}

/// Decode a provider response and strip its envelope.
///
/// The result is the first meaningful child of the root (the `search` or
/// `book` node), skipping request metadata. A root with no meaningful child
/// is returned as-is.
pub fn normalize(xml: &str) -> Result<XmlElement> {
    let root = parse(xml)?;
    Ok(strip_envelope(root))
}

/// Like [`normalize`], but picks the envelope child named `wanted` wherever it
/// sits among its siblings. Falls back to [`normalize`]'s choice when absent.
pub fn normalize_for(xml: &str, wanted: &str) -> Result<XmlElement> {
    let mut root = parse(xml)?;
    if root.name == wanted {
        return Ok(root);
    }
    match root.children.iter().position(|child| child.name == wanted) {
        Some(idx) => Ok(root.children.swap_remove(idx)),
        None => Ok(strip_envelope(root)),
    }
}

fn strip_envelope(root: XmlElement) -> XmlElement {
    let meaningful = root.children.iter().position(|child| {
        !ENVELOPE_METADATA
            .iter()
            .any(|meta| child.name.eq_ignore_ascii_case(meta))
    });

    match meaningful {
        Some(idx) => {
            let mut children = root.children;
            children.swap_remove(idx)
        }
        None => root,
    }
}

fn element_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(CatalogError::Decode(format!(
            "multiple root elements (found <{}>)",
            element.name
        )));
    }
    *root = Some(element);
    Ok(())
}

fn append_text(stack: &mut [XmlElement], text: &str) -> Result<()> {
    match stack.last_mut() {
        Some(current) => {
            current.text.push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(CatalogError::Decode(
            "text content outside the root element".to_string(),
        )),
    }
}
