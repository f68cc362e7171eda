//! Saving and writing
//!
//! Thin passthroughs to the document serializer for the wrapped element.
//! Errors are never swallowed here.

use std::fmt;
use std::io;
use std::path::Path;

use super::Node;
use crate::dom::{SaveOptions, XmlSink};
use crate::error::{Result, XmlError};

impl Node {
    /// Write the element to a file with a declaration and no added layout
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.save_with(path, &SaveOptions::default())
    }

    pub fn save_with(&self, path: impl AsRef<Path>, options: &SaveOptions) -> Result<()> {
        self.doc.borrow().save(self.id, path, options)
    }

    /// Write the element to a byte stream in the configured encoding
    pub fn write_to<W: io::Write>(&self, out: &mut W, options: &SaveOptions) -> Result<()> {
        self.doc.borrow().write_to(self.id, out, options)
    }

    /// Write the element to a character stream
    pub fn write_to_fmt<W: fmt::Write>(&self, out: &mut W, options: &SaveOptions) -> Result<()> {
        self.doc
            .borrow()
            .write_to_fmt(self.id, out, options)
            .map(|_| ())
            .map_err(|_| XmlError::Io(io::Error::other("character stream rejected output")))
    }

    /// Drive a custom sink with the element's events
    pub fn write_events(&self, sink: &mut dyn XmlSink) -> Result<()> {
        self.doc
            .borrow()
            .write_events(self.id, sink)
            .map_err(|_| XmlError::Io(io::Error::other("sink rejected output")))
    }

    /// Markup of the element without a declaration
    pub fn to_xml_string(&self) -> String {
        self.to_xml_string_with(&SaveOptions::fragment())
    }

    pub fn to_xml_string_with(&self, options: &SaveOptions) -> String {
        self.doc.borrow().to_xml_string(self.id, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::encoding::TextEncoding;
    use crate::dom::Formatting;

    const PERSON: &str = "<person id=\"7\"><name>Ann</name><tag>a</tag><tag>b</tag></person>";

    #[test]
    fn test_save_and_load_round_trip() {
        let person = Node::parse(PERSON).unwrap();
        person.set("name", "Bob");
        person.set("_id", "8");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("person.xml");
        person.save(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));

        let loaded = Node::load(&path).unwrap();
        assert_eq!(loaded.value_by_name("name").as_deref(), Some("Bob"));
        assert_eq!(loaded.get("_id").as_attribute(), Some("8"));
        assert_eq!(loaded.to_xml_string(), person.to_xml_string());
    }

    #[test]
    fn test_save_indented_utf16() {
        let person = Node::parse(PERSON).unwrap();
        let options = SaveOptions::new()
            .with_formatting(Formatting::Indented)
            .with_encoding(TextEncoding::Utf16Le);

        let file = tempfile::NamedTempFile::new().unwrap();
        person.save_with(file.path(), &options).unwrap();

        let loaded = Node::load(file.path()).unwrap();
        assert_eq!(loaded.value(), "Annab");
        assert_eq!(loaded.get("tag").into_iter().count(), 2);
    }

    #[test]
    fn test_load_from_reader() {
        let person = Node::load_from_reader(PERSON.as_bytes()).unwrap();
        assert_eq!(person.get("_id").as_attribute(), Some("7"));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Node::load(dir.path().join("missing.xml"));
        assert!(matches!(result, Err(XmlError::Io(_))));
    }

    #[test]
    fn test_write_to_streams() {
        let person = Node::parse("<r><a>1</a></r>").unwrap();
        let child = person.get("a").as_node().cloned().unwrap();

        let mut bytes = Vec::new();
        child.write_to(&mut bytes, &SaveOptions::fragment()).unwrap();
        assert_eq!(bytes, b"<a>1</a>");

        let mut text = String::new();
        person.write_to_fmt(&mut text, &SaveOptions::fragment()).unwrap();
        assert_eq!(text, "<r><a>1</a></r>");
    }

    #[test]
    fn test_deep_nesting_round_trip() {
        let depth = 100_000;
        let xml = format!("{}{}", "<n>".repeat(depth), "</n>".repeat(depth));
        let node = Node::parse(&xml).unwrap();
        assert!(node.invoke("add", &[node.clone().into()]).is_some());
        let children = node.elements();
        assert_eq!(children.len(), 2);

        let out = children[1].to_xml_string();
        let expected = format!("{}<n/>{}", "<n>".repeat(depth - 1), "</n>".repeat(depth - 1));
        assert_eq!(out, expected);
        let again = Node::parse(&out).unwrap();
        assert_eq!(again.to_xml_string(), out);
    }

    #[derive(Default)]
    struct Names(Vec<String>);

    impl XmlSink for Names {
        fn start_element(&mut self, name: &str, _attributes: &[(&str, &str)]) -> fmt::Result {
            self.0.push(name.to_string());
            Ok(())
        }

        fn end_element(&mut self, _name: &str, _empty: bool) -> fmt::Result {
            Ok(())
        }

        fn text(&mut self, _text: &str) -> fmt::Result {
            Ok(())
        }

        fn cdata(&mut self, _text: &str) -> fmt::Result {
            Ok(())
        }

        fn comment(&mut self, _text: &str) -> fmt::Result {
            Ok(())
        }

        fn processing_instruction(&mut self, _target: &str, _data: &str) -> fmt::Result {
            Ok(())
        }
    }

    #[test]
    fn test_write_events_to_custom_sink() {
        let person = Node::parse(PERSON).unwrap();
        let mut names = Names::default();
        person.write_events(&mut names).unwrap();
        assert_eq!(names.0, vec!["person", "name", "tag", "tag"]);
    }
}
