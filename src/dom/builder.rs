//! Document Builder
//!
//! Turns reader events into a `Document`, enforcing well-formedness:
//! - exactly one root element
//! - start and end tags must match, nothing left unclosed
//! - no text or CDATA outside the root element
//! - no duplicate attributes on one element
//!
//! Input bytes are converted to UTF-8 first (BOM / UTF-16 detection).

use std::io::Read;
use std::path::Path;

use super::document::{Declaration, Document};
use super::node::NodeId;
use crate::core::encoding::convert_to_utf8;
use crate::core::scanner::is_whitespace;
use crate::error::{Result, XmlError};
use crate::reader::{SliceReader, XmlEvent};
use crate::reader::events::StartElement;

/// Options applied while loading a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Keep whitespace-only text nodes between elements
    pub preserve_whitespace: bool,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preserve_whitespace(mut self, preserve: bool) -> Self {
        self.preserve_whitespace = preserve;
        self
    }
}

impl Document {
    /// Parse a document from text with default options
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with(text, &LoadOptions::default())
    }

    /// Parse a document from text
    pub fn parse_with(text: &str, options: &LoadOptions) -> Result<Self> {
        let doc = Builder::new(text, options).build()?;
        tracing::debug!(
            nodes = doc.node_count(),
            strings = doc.strings.len(),
            string_bytes = doc.strings.bytes_used(),
            "parsed document"
        );
        Ok(doc)
    }

    /// Parse raw bytes, detecting UTF-8 / UTF-16 from the BOM or first bytes
    pub fn parse_bytes(bytes: Vec<u8>, options: &LoadOptions) -> Result<Self> {
        let text = convert_to_utf8(bytes).map_err(XmlError::Encoding)?;
        Self::parse_with(&text, options)
    }

    /// Read and parse everything from a reader
    pub fn load_from_reader<R: Read>(mut reader: R, options: &LoadOptions) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::parse_bytes(bytes, options)
    }

    /// Load a document from a file path
    pub fn load(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading document");
        let bytes = std::fs::read(path)?;
        Self::parse_bytes(bytes, options)
    }
}

/// Event-driven tree construction state
struct Builder<'a> {
    input: &'a str,
    options: &'a LoadOptions,
    doc: Document,
    /// Open elements; bottom entry is the document node
    stack: Vec<NodeId>,
    seen_root: bool,
}

impl<'a> Builder<'a> {
    fn new(input: &'a str, options: &'a LoadOptions) -> Self {
        Builder {
            input,
            options,
            doc: Document::new(),
            stack: vec![Document::DOCUMENT_NODE],
            seen_root: false,
        }
    }

    fn error(&self, message: impl Into<String>, position: usize) -> XmlError {
        XmlError::parse_at(message, self.input.as_bytes(), position)
    }

    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(Document::DOCUMENT_NODE)
    }

    fn at_document_level(&self) -> bool {
        self.stack.len() == 1
    }

    fn build(mut self) -> Result<Document> {
        let mut reader = SliceReader::new(self.input);

        loop {
            let event = match reader.next_event() {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(err) => return Err(self.error(err.message, err.position)),
            };
            let position = reader.event_start();

            match event {
                XmlEvent::StartElement(elem) => {
                    let id = self.open_element(&elem, position)?;
                    self.stack.push(id);
                }
                XmlEvent::EmptyElement(elem) => {
                    self.open_element(&elem, position)?;
                }
                XmlEvent::EndElement(end) => {
                    if self.at_document_level() {
                        return Err(self.error(
                            format!("Unexpected end tag: </{}> without matching start tag", end.name),
                            position,
                        ));
                    }
                    let open = self.current();
                    let open_name = self.doc.name(open).unwrap_or_default();
                    if open_name != end.name {
                        return Err(self.error(
                            format!("Tag mismatch: <{}> closed with </{}>", open_name, end.name),
                            position,
                        ));
                    }
                    self.stack.pop();
                }
                XmlEvent::Text(text) => {
                    let blank = text.bytes().all(is_whitespace);
                    if self.at_document_level() {
                        if !blank {
                            return Err(
                                self.error("Text content not allowed at document level", position)
                            );
                        }
                        continue;
                    }
                    if blank && !self.options.preserve_whitespace {
                        continue;
                    }
                    let id = self.doc.create_text(&text);
                    self.doc.link_child(self.current(), id);
                }
                XmlEvent::CData(text) => {
                    if self.at_document_level() {
                        return Err(
                            self.error("CDATA section not allowed at document level", position)
                        );
                    }
                    let id = self.doc.create_cdata(&text);
                    self.doc.link_child(self.current(), id);
                }
                XmlEvent::Comment(text) => {
                    let id = self.doc.create_comment(text);
                    self.doc.link_child(self.current(), id);
                }
                XmlEvent::ProcessingInstruction { target, data } => {
                    let id = self
                        .doc
                        .create_processing_instruction(target, data.unwrap_or_default());
                    self.doc.link_child(self.current(), id);
                }
                XmlEvent::XmlDeclaration {
                    version,
                    encoding,
                    standalone,
                } => {
                    self.doc.declaration = Some(Declaration {
                        version: version.into_owned(),
                        encoding: encoding.map(|e| e.into_owned()),
                        standalone,
                    });
                }
                XmlEvent::DocType(_) => {
                    if self.seen_root {
                        return Err(self.error("DOCTYPE must come before root element", position));
                    }
                    tracing::trace!("skipping DOCTYPE declaration");
                }
            }
        }

        if !self.at_document_level() {
            let open = self.doc.name(self.current()).unwrap_or_default().to_string();
            return Err(self.error(format!("Unclosed tag: <{}>", open), self.input.len()));
        }
        if !self.seen_root {
            return Err(self.error("Root element is missing", self.input.len()));
        }
        Ok(self.doc)
    }

    fn open_element(&mut self, elem: &StartElement<'_>, position: usize) -> Result<NodeId> {
        if self.at_document_level() {
            if self.seen_root {
                return Err(self.error("Document has multiple root elements", position));
            }
            self.seen_root = true;
        }
        if let Some(dup) = find_duplicate_attribute(elem) {
            return Err(self.error(format!("Duplicate attribute: {}", dup), position));
        }

        let id = self
            .doc
            .create_element(elem.name)
            .map_err(|e| self.error(e.to_string(), position))?;
        for attr in &elem.attributes {
            self.doc
                .set_attribute(id, attr.name, &attr.value)
                .map_err(|e| self.error(e.to_string(), position))?;
        }
        self.doc.link_child(self.current(), id);
        Ok(id)
    }
}

fn find_duplicate_attribute<'a>(elem: &StartElement<'a>) -> Option<&'a str> {
    let attrs = &elem.attributes;
    attrs.iter().enumerate().find_map(|(i, a)| {
        attrs[..i]
            .iter()
            .any(|earlier| earlier.name == a.name)
            .then_some(a.name)
    })
}
