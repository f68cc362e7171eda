//! Slice Parser
//!
//! Pulls XML events from a UTF-8 string. Names, comments and PI data borrow
//! from the input; text only allocates when entities or carriage returns
//! have to be rewritten.

use super::events::{EndElement, StartElement, XmlEvent};
use crate::core::attributes::parse_attributes;
use crate::core::entities::decode_text;
use crate::core::scanner::{is_whitespace, Scanner};
use std::borrow::Cow;

/// Error raised while reading; `position` is a byte offset into the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        ParseError {
            message: message.into(),
            position,
        }
    }
}

/// XML reader over a string slice
pub struct SliceReader<'a> {
    input: &'a str,
    scanner: Scanner<'a>,
    /// Start offset of the most recently returned event
    event_start: usize,
    failed: bool,
}

impl<'a> SliceReader<'a> {
    pub fn new(input: &'a str) -> Self {
        SliceReader {
            input,
            scanner: Scanner::new(input),
            event_start: 0,
            failed: false,
        }
    }

    /// Byte offset where the last returned event started
    pub fn event_start(&self) -> usize {
        self.event_start
    }

    /// Get the next XML event, `Ok(None)` at end of input
    pub fn next_event(&mut self) -> Result<Option<XmlEvent<'a>>, ParseError> {
        if self.failed || self.scanner.is_eof() {
            return Ok(None);
        }
        let result = self.read_event();
        if result.is_err() {
            self.failed = true;
        }
        result.map(Some)
    }

    fn read_event(&mut self) -> Result<XmlEvent<'a>, ParseError> {
        let start = self.scanner.position();
        self.event_start = start;

        if self.scanner.peek() != Some(b'<') {
            return self.read_text(start);
        }

        if self.scanner.starts_with("<!--") {
            self.read_comment(start)
        } else if self.scanner.starts_with("<![CDATA[") {
            self.read_cdata(start)
        } else if self.scanner.starts_with("<!DOCTYPE") {
            self.read_doctype(start)
        } else if self.scanner.starts_with("<?") {
            self.read_processing_instruction(start)
        } else if self.scanner.starts_with("</") {
            self.read_end_tag(start)
        } else {
            self.read_start_tag(start)
        }
    }

    fn read_text(&mut self, start: usize) -> Result<XmlEvent<'a>, ParseError> {
        let end = self.scanner.find_tag_start().unwrap_or(self.input.len());
        let raw = self.scanner.slice(start, end);
        self.scanner.set_position(end);

        let normalized = normalize_line_ends(raw);
        let text = match normalized {
            Cow::Borrowed(b) => decode_text(b).map_err(|m| ParseError::new(m, start))?,
            Cow::Owned(o) => Cow::Owned(
                decode_text(&o)
                    .map_err(|m| ParseError::new(m, start))?
                    .into_owned(),
            ),
        };
        Ok(XmlEvent::Text(text))
    }

    fn read_comment(&mut self, start: usize) -> Result<XmlEvent<'a>, ParseError> {
        self.scanner.advance(4);
        let content_start = self.scanner.position();
        let end = self
            .scanner
            .find_str("-->")
            .ok_or_else(|| ParseError::new("Unterminated comment", start))?;
        let content = self.scanner.slice(content_start, end);
        if content.contains("--") || content.ends_with('-') {
            return Err(ParseError::new("'--' not allowed inside comment", start));
        }
        self.scanner.set_position(end + 3);
        Ok(XmlEvent::Comment(content))
    }

    fn read_cdata(&mut self, start: usize) -> Result<XmlEvent<'a>, ParseError> {
        self.scanner.advance(9);
        let content_start = self.scanner.position();
        let end = self
            .scanner
            .find_str("]]>")
            .ok_or_else(|| ParseError::new("Unterminated CDATA section", start))?;
        let content = self.scanner.slice(content_start, end);
        self.scanner.set_position(end + 3);
        Ok(XmlEvent::CData(normalize_line_ends(content)))
    }

    fn read_doctype(&mut self, start: usize) -> Result<XmlEvent<'a>, ParseError> {
        // Internal subsets may contain '>' inside brackets
        let bytes = self.input.as_bytes();
        let mut pos = start + 9;
        let mut depth = 0usize;
        while pos < bytes.len() {
            match bytes[pos] {
                b'[' => depth += 1,
                b']' => depth = depth.saturating_sub(1),
                b'>' if depth == 0 => {
                    let content = self.scanner.slice(start + 9, pos).trim();
                    self.scanner.set_position(pos + 1);
                    return Ok(XmlEvent::DocType(content));
                }
                _ => {}
            }
            pos += 1;
        }
        Err(ParseError::new("Unterminated DOCTYPE declaration", start))
    }

    fn read_processing_instruction(&mut self, start: usize) -> Result<XmlEvent<'a>, ParseError> {
        self.scanner.advance(2);
        let target = self
            .scanner
            .read_name()
            .ok_or_else(|| ParseError::new("Processing instruction target expected", start))?;
        let end = self
            .scanner
            .find_str("?>")
            .ok_or_else(|| ParseError::new("Unterminated processing instruction", start))?;
        let body = self.scanner.slice(self.scanner.position(), end);
        self.scanner.set_position(end + 2);

        if !body.is_empty() && !body.as_bytes().first().copied().is_some_and(is_whitespace) {
            return Err(ParseError::new("Malformed processing instruction target", start));
        }

        if target.eq_ignore_ascii_case("xml") {
            if target != "xml" || start != 0 {
                return Err(ParseError::new(
                    "XML declaration allowed only at the start of the document",
                    start,
                ));
            }
            return self.xml_declaration(body, start);
        }

        let data = body.trim_start();
        Ok(XmlEvent::ProcessingInstruction {
            target,
            data: if data.is_empty() { None } else { Some(data) },
        })
    }

    fn xml_declaration(&self, body: &'a str, start: usize) -> Result<XmlEvent<'a>, ParseError> {
        let attrs = parse_attributes(body).map_err(|(m, off)| ParseError::new(m, start + off))?;
        let mut version = None;
        let mut encoding = None;
        let mut standalone = None;
        for attr in attrs {
            match attr.name {
                "version" => version = Some(attr.value),
                "encoding" => encoding = Some(attr.value),
                "standalone" => standalone = Some(attr.value == "yes"),
                other => {
                    return Err(ParseError::new(
                        format!("Unexpected attribute in XML declaration: {}", other),
                        start,
                    ))
                }
            }
        }
        let version = version.ok_or_else(|| ParseError::new("XML declaration missing version", start))?;
        Ok(XmlEvent::XmlDeclaration {
            version,
            encoding,
            standalone,
        })
    }

    fn read_end_tag(&mut self, start: usize) -> Result<XmlEvent<'a>, ParseError> {
        self.scanner.advance(2);
        let name = self
            .scanner
            .read_name()
            .ok_or_else(|| ParseError::new("Malformed end tag name", start))?;
        self.scanner.skip_whitespace();
        if self.scanner.peek() != Some(b'>') {
            return Err(ParseError::new(format!("Unterminated end tag: </{}>", name), start));
        }
        self.scanner.advance(1);
        Ok(XmlEvent::EndElement(EndElement::new(name)))
    }

    fn read_start_tag(&mut self, start: usize) -> Result<XmlEvent<'a>, ParseError> {
        self.scanner.advance(1);
        let name = self
            .scanner
            .read_name()
            .ok_or_else(|| ParseError::new("Malformed element name", start))?;
        let attrs_start = self.scanner.position();
        let end = self
            .scanner
            .find_tag_end_quoted()
            .ok_or_else(|| ParseError::new(format!("Unterminated start tag: <{}", name), start))?;

        let is_empty = end > attrs_start && self.input.as_bytes()[end - 1] == b'/';
        let attrs_end = if is_empty { end - 1 } else { end };
        let attr_text = self.scanner.slice(attrs_start, attrs_end);
        if !attr_text.is_empty() && !attr_text.as_bytes().first().copied().is_some_and(is_whitespace) {
            return Err(ParseError::new("Malformed element name", start));
        }
        let attributes =
            parse_attributes(attr_text).map_err(|(m, off)| ParseError::new(m, attrs_start + off))?;
        self.scanner.set_position(end + 1);

        let elem = StartElement::new(name, attributes);
        Ok(if is_empty {
            XmlEvent::EmptyElement(elem)
        } else {
            XmlEvent::StartElement(elem)
        })
    }
}

impl<'a> Iterator for SliceReader<'a> {
    type Item = Result<XmlEvent<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}

/// End-of-line handling: CRLF and lone CR become LF
fn normalize_line_ends(text: &str) -> Cow<'_, str> {
    if memchr::memchr(b'\r', text.as_bytes()).is_none() {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
}
