//! Serialization
//!
//! `Document::write_events` walks a subtree and drives any `XmlSink`.
//! `TextSink` is the markup serializer behind every text, stream and file
//! output path. Layout whitespace for indented output is sent through
//! `XmlSink::whitespace`, which event consumers are free to ignore.

use std::fmt;
use std::io;
use std::path::Path;

use super::document::Document;
use super::node::{NodeId, NodeKind};
use crate::core::encoding::TextEncoding;
use crate::core::entities::{escape_attribute, escape_text};
use crate::error::Result;

/// How element structure is laid out on output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Formatting {
    /// Write the tree exactly as stored, adding no whitespace
    #[default]
    Preserve,
    /// One element per line, nested by `SaveOptions::indent`.
    /// Elements holding text are written inline.
    Indented,
}

/// Options for saving a document or subtree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOptions {
    pub formatting: Formatting,
    /// Emit `<?xml version="1.0" encoding="..."?>` first
    pub declaration: bool,
    pub encoding: TextEncoding,
    pub indent: String,
}

impl Default for SaveOptions {
    fn default() -> Self {
        SaveOptions {
            formatting: Formatting::Preserve,
            declaration: true,
            encoding: TextEncoding::Utf8,
            indent: "  ".to_string(),
        }
    }
}

impl SaveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_formatting(mut self, formatting: Formatting) -> Self {
        self.formatting = formatting;
        self
    }

    pub fn with_declaration(mut self, declaration: bool) -> Self {
        self.declaration = declaration;
        self
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    /// Options for fragment output: no declaration, structure preserved
    pub fn fragment() -> Self {
        Self::default().with_declaration(false)
    }
}

/// Receiver of serialization events
pub trait XmlSink {
    fn start_element(&mut self, name: &str, attributes: &[(&str, &str)]) -> fmt::Result;

    /// Close the most recently started element. `empty` is set when the
    /// element had no children.
    fn end_element(&mut self, name: &str, empty: bool) -> fmt::Result;

    fn text(&mut self, text: &str) -> fmt::Result;

    fn cdata(&mut self, text: &str) -> fmt::Result;

    fn comment(&mut self, text: &str) -> fmt::Result;

    fn processing_instruction(&mut self, target: &str, data: &str) -> fmt::Result;

    /// Layout whitespace added by indented output
    fn whitespace(&mut self, _text: &str) -> fmt::Result {
        Ok(())
    }
}

/// Serializes events as XML markup into any `fmt::Write`
pub struct TextSink<W: fmt::Write> {
    out: W,
    /// Start tag still open (`<name attrs` written, `>` pending)
    pending_close: bool,
}

impl<W: fmt::Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        TextSink {
            out,
            pending_close: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn close_start_tag(&mut self) -> fmt::Result {
        if self.pending_close {
            self.pending_close = false;
            self.out.write_char('>')?;
        }
        Ok(())
    }

    /// Write the `<?xml ...?>` declaration
    pub fn declaration(&mut self, encoding: TextEncoding) -> fmt::Result {
        write!(
            self.out,
            "<?xml version=\"1.0\" encoding=\"{}\"?>",
            encoding.label()
        )
    }
}

impl<W: fmt::Write> XmlSink for TextSink<W> {
    fn start_element(&mut self, name: &str, attributes: &[(&str, &str)]) -> fmt::Result {
        self.close_start_tag()?;
        write!(self.out, "<{}", name)?;
        for (attr_name, value) in attributes {
            write!(self.out, " {}=\"{}\"", attr_name, escape_attribute(value))?;
        }
        self.pending_close = true;
        Ok(())
    }

    fn end_element(&mut self, name: &str, empty: bool) -> fmt::Result {
        if empty && self.pending_close {
            self.pending_close = false;
            return self.out.write_str("/>");
        }
        self.close_start_tag()?;
        write!(self.out, "</{}>", name)
    }

    fn text(&mut self, text: &str) -> fmt::Result {
        self.close_start_tag()?;
        self.out.write_str(&escape_text(text))
    }

    fn cdata(&mut self, text: &str) -> fmt::Result {
        self.close_start_tag()?;
        // "]]>" cannot appear inside one section; split it across two
        write!(self.out, "<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
    }

    fn comment(&mut self, text: &str) -> fmt::Result {
        self.close_start_tag()?;
        write!(self.out, "<!--{}-->", text)
    }

    fn processing_instruction(&mut self, target: &str, data: &str) -> fmt::Result {
        self.close_start_tag()?;
        if data.is_empty() {
            write!(self.out, "<?{}?>", target)
        } else {
            write!(self.out, "<?{} {}?>", target, data)
        }
    }

    fn whitespace(&mut self, text: &str) -> fmt::Result {
        self.close_start_tag()?;
        self.out.write_str(text)
    }
}

/// Adapts an `io::Write` so `TextSink` can target byte streams
struct IoAdapter<'w, W: io::Write> {
    inner: &'w mut W,
    error: Option<io::Error>,
}

impl<W: io::Write> fmt::Write for IoAdapter<'_, W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.inner.write_all(s.as_bytes()).map_err(|e| {
            self.error = Some(e);
            fmt::Error
        })
    }
}

/// Pending work for the serializer walk
enum Visit<'a> {
    Open {
        id: NodeId,
        indent: Option<&'a str>,
        depth: usize,
    },
    Layout {
        step: &'a str,
        depth: usize,
    },
    Close {
        id: NodeId,
        empty: bool,
    },
}

impl Document {
    /// Walk a subtree, driving `sink` with its events.
    /// The document node writes its children in order.
    pub fn write_events(&self, node: NodeId, sink: &mut dyn XmlSink) -> fmt::Result {
        self.walk(node, sink, None)
    }

    /// Depth-first walk with an explicit stack, so nesting depth is bounded
    /// by memory rather than the call stack
    fn walk(&self, root: NodeId, sink: &mut dyn XmlSink, indent: Option<&str>) -> fmt::Result {
        let mut stack = vec![Visit::Open {
            id: root,
            indent,
            depth: 0,
        }];
        let mut pending = Vec::new();

        while let Some(visit) = stack.pop() {
            let (id, indent, depth) = match visit {
                Visit::Layout { step, depth } => {
                    sink.whitespace(&layout(step, depth))?;
                    continue;
                }
                Visit::Close { id, empty } => {
                    sink.end_element(self.name(id).unwrap_or_default(), empty)?;
                    continue;
                }
                Visit::Open { id, indent, depth } => (id, indent, depth),
            };
            let Some(kind) = self.kind(id) else {
                continue;
            };

            // Children are queued in document order, then pushed reversed
            match kind {
                NodeKind::Document => {
                    for (i, child) in self.children(id).enumerate() {
                        if indent.is_some() && i > 0 {
                            pending.push(Visit::Layout { step: "", depth: 0 });
                        }
                        pending.push(Visit::Open {
                            id: child,
                            indent,
                            depth,
                        });
                    }
                }
                NodeKind::Element => {
                    let name = self.name(id).unwrap_or_default();
                    sink.start_element(name, &self.attribute_pairs(id))?;

                    let empty = self.get_node(id).is_none_or(|n| !n.has_children());
                    // Mixed content is written inline so indentation never
                    // changes the text value.
                    let child_indent = indent.filter(|_| !self.holds_text(id));
                    for child in self.children(id) {
                        if let Some(step) = child_indent {
                            pending.push(Visit::Layout {
                                step,
                                depth: depth + 1,
                            });
                        }
                        pending.push(Visit::Open {
                            id: child,
                            indent: child_indent,
                            depth: depth + 1,
                        });
                    }
                    if let (Some(step), false) = (child_indent, empty) {
                        pending.push(Visit::Layout { step, depth });
                    }
                    pending.push(Visit::Close { id, empty });
                }
                NodeKind::Text => sink.text(self.content(id).unwrap_or_default())?,
                NodeKind::CData => sink.cdata(self.content(id).unwrap_or_default())?,
                NodeKind::Comment => sink.comment(self.content(id).unwrap_or_default())?,
                NodeKind::ProcessingInstruction => sink.processing_instruction(
                    self.name(id).unwrap_or_default(),
                    self.content(id).unwrap_or_default(),
                )?,
            }
            stack.extend(pending.drain(..).rev());
        }
        Ok(())
    }

    fn holds_text(&self, id: NodeId) -> bool {
        self.children(id)
            .any(|c| self.get_node(c).is_some_and(|n| n.is_text()))
    }

    /// Serialize a subtree into a character stream
    pub fn write_to_fmt<W: fmt::Write>(
        &self,
        node: NodeId,
        out: W,
        options: &SaveOptions,
    ) -> std::result::Result<W, fmt::Error> {
        let mut sink = TextSink::new(out);
        let indent = match options.formatting {
            Formatting::Preserve => None,
            Formatting::Indented => Some(options.indent.as_str()),
        };
        if options.declaration {
            sink.declaration(options.encoding)?;
            if indent.is_some() {
                sink.whitespace("\n")?;
            }
        }
        self.walk(node, &mut sink, indent)?;
        Ok(sink.into_inner())
    }

    /// Serialize a subtree to a `String` (the declaration, if requested,
    /// names the configured encoding but the result is a Rust string)
    pub fn to_xml_string(&self, node: NodeId, options: &SaveOptions) -> String {
        // Writing into a String cannot fail
        self.write_to_fmt(node, String::new(), options)
            .unwrap_or_default()
    }

    /// Serialize a subtree into a byte stream in the configured encoding
    pub fn write_to<W: io::Write>(
        &self,
        node: NodeId,
        out: &mut W,
        options: &SaveOptions,
    ) -> Result<()> {
        if options.encoding == TextEncoding::Utf8 {
            let mut adapter = IoAdapter {
                inner: out,
                error: None,
            };
            let written = self.write_to_fmt(node, &mut adapter, options).is_ok();
            if !written {
                return Err(adapter
                    .error
                    .unwrap_or_else(|| io::Error::other("formatter error"))
                    .into());
            }
        } else {
            let text = self.to_xml_string(node, options);
            out.write_all(&options.encoding.encode(&text))?;
        }
        out.flush()?;
        Ok(())
    }

    /// Serialize a subtree to a file, replacing any existing content
    pub fn save(&self, node: NodeId, path: impl AsRef<Path>, options: &SaveOptions) -> Result<()> {
        let path = path.as_ref();
        let mut file = io::BufWriter::new(std::fs::File::create(path)?);
        self.write_to(node, &mut file, options)?;
        tracing::debug!(
            path = %path.display(),
            root = self.name(node).unwrap_or_default(),
            "saved document"
        );
        Ok(())
    }
}

fn layout(step: &str, depth: usize) -> String {
    let mut s = String::with_capacity(1 + step.len() * depth);
    s.push('\n');
    for _ in 0..depth {
        s.push_str(step);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::LoadOptions;

    fn fragment(doc: &Document, options: SaveOptions) -> String {
        doc.to_xml_string(Document::DOCUMENT_NODE, &options.with_declaration(false))
    }

    #[test]
    fn test_preserve_round_trip() {
        let xml = "<r a=\"1 &amp; 2\"><x>t&lt;</x><e/><!--c--><?p d?><![CDATA[z]]></r>";
        let doc = Document::parse(xml).unwrap();
        assert_eq!(fragment(&doc, SaveOptions::new()), xml);
    }

    #[test]
    fn test_declaration_names_encoding() {
        let doc = Document::parse("<r/>").unwrap();
        let out = doc.to_xml_string(Document::DOCUMENT_NODE, &SaveOptions::new());
        assert_eq!(out, "<?xml version=\"1.0\" encoding=\"utf-8\"?><r/>");

        let options = SaveOptions::new().with_encoding(TextEncoding::Utf16Le);
        let out = doc.to_xml_string(Document::DOCUMENT_NODE, &options);
        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"utf-16\"?>"));
    }

    #[test]
    fn test_indented_output() {
        let doc = Document::parse("<r><a><b>text</b></a><c/></r>").unwrap();
        let out = fragment(&doc, SaveOptions::new().with_formatting(Formatting::Indented));
        assert_eq!(out, "<r>\n  <a>\n    <b>text</b>\n  </a>\n  <c/>\n</r>");
    }

    #[test]
    fn test_indented_keeps_mixed_content_inline() {
        let doc = Document::parse("<r>a<b>c</b>d</r>").unwrap();
        let out = fragment(&doc, SaveOptions::new().with_formatting(Formatting::Indented));
        assert_eq!(out, "<r>a<b>c</b>d</r>");
    }

    #[test]
    fn test_indented_reparses_to_same_text() {
        let doc = Document::parse("<r><a>1</a><a>2</a></r>").unwrap();
        let out = fragment(&doc, SaveOptions::new().with_formatting(Formatting::Indented));
        let again = Document::parse_with(&out, &LoadOptions::default()).unwrap();
        let root = again.root_element().unwrap();
        assert_eq!(again.text_value(root), "12");
    }

    #[test]
    fn test_attribute_escaping() {
        let mut doc = Document::new();
        let root = doc.append_element(Document::DOCUMENT_NODE, "r").unwrap();
        doc.set_attribute(root, "v", "a\"b\nc<").unwrap();
        let out = fragment(&doc, SaveOptions::new());
        assert_eq!(out, "<r v=\"a&quot;b&#xA;c&lt;\"/>");
        let again = Document::parse(&out).unwrap();
        let root = again.root_element().unwrap();
        assert_eq!(again.attribute(root, "v"), Some("a\"b\nc<"));
    }

    #[test]
    fn test_deep_tree_round_trip() {
        const DEPTH: usize = 100_000;
        let xml = format!("{}x{}", "<a>".repeat(DEPTH), "</a>".repeat(DEPTH));
        let doc = Document::parse(&xml).unwrap();
        let out = fragment(&doc, SaveOptions::new());
        assert_eq!(out, xml);

        let again = Document::parse(&out).unwrap();
        let root = again.root_element().unwrap();
        assert_eq!(again.descendants(root).count(), DEPTH);
        assert_eq!(again.text_value(root), "x");
    }

    #[test]
    fn test_deep_tree_events() {
        let xml = format!("{}{}", "<a>".repeat(50_000), "</a>".repeat(50_000));
        let doc = Document::parse(&xml).unwrap();
        let mut names = Names::default();
        doc.write_events(Document::DOCUMENT_NODE, &mut names).unwrap();
        assert_eq!(names.0.len(), 50_000);
    }

    #[test]
    fn test_subtree_only() {
        let doc = Document::parse("<r><a><b/></a><c/></r>").unwrap();
        let root = doc.root_element().unwrap();
        let a = doc.first_child_named(root, "a").unwrap();
        assert_eq!(doc.to_xml_string(a, &SaveOptions::fragment()), "<a><b/></a>");
    }

    #[test]
    fn test_write_utf16_stream() {
        let doc = Document::parse("<r>é</r>").unwrap();
        let mut bytes = Vec::new();
        let options = SaveOptions::new().with_encoding(TextEncoding::Utf16Be);
        doc.write_to(Document::DOCUMENT_NODE, &mut bytes, &options).unwrap();
        assert_eq!(&bytes[..2], &[0xFE, 0xFF]);
        let again = Document::parse_bytes(bytes, &LoadOptions::default()).unwrap();
        let root = again.root_element().unwrap();
        assert_eq!(again.text_value(root), "é");
    }

    #[derive(Default)]
    struct Names(Vec<String>);

    impl XmlSink for Names {
        fn start_element(&mut self, name: &str, _: &[(&str, &str)]) -> fmt::Result {
            self.0.push(name.to_string());
            Ok(())
        }
        fn end_element(&mut self, _: &str, _: bool) -> fmt::Result {
            Ok(())
        }
        fn text(&mut self, _: &str) -> fmt::Result {
            Ok(())
        }
        fn cdata(&mut self, _: &str) -> fmt::Result {
            Ok(())
        }
        fn comment(&mut self, _: &str) -> fmt::Result {
            Ok(())
        }
        fn processing_instruction(&mut self, _: &str, _: &str) -> fmt::Result {
            Ok(())
        }
    }

    #[test]
    fn test_custom_sink() {
        let doc = Document::parse("<r><a/><b><c/></b></r>").unwrap();
        let mut names = Names::default();
        doc.write_events(Document::DOCUMENT_NODE, &mut names).unwrap();
        assert_eq!(names.0, vec!["r", "a", "b", "c"]);
    }
}
