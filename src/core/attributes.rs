//! XML Attribute Parsing
//!
//! Parses the attribute list of a start tag. Values must be quoted; literal
//! tabs and line breaks in a value are normalized to spaces before entity
//! references are decoded.

use super::entities::decode_text;
use super::scanner::{is_name_char, is_name_start_char, is_whitespace};
use memchr::memchr;
use std::borrow::Cow;

/// A parsed XML attribute
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute<'a> {
    /// Attribute name (may include namespace prefix)
    pub name: &'a str,
    /// Attribute value (entities decoded)
    pub value: Cow<'a, str>,
}

impl<'a> Attribute<'a> {
    pub fn new(name: &'a str, value: Cow<'a, str>) -> Self {
        Attribute { name, value }
    }
}

/// Attribute parse failure: message and byte offset into the attribute text
pub type AttributeError = (&'static str, usize);

/// Parse attributes from raw tag content (after the element name)
///
/// Input should be the content between element name and '>' or '/>'
pub fn parse_attributes(input: &str) -> Result<Vec<Attribute<'_>>, AttributeError> {
    let bytes = input.as_bytes();
    let mut attrs = Vec::new();
    let mut pos = 0;

    loop {
        let before_ws = pos;
        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }
        if pos == before_ws && !attrs.is_empty() {
            return Err(("Whitespace required between attributes", pos));
        }

        // Attribute name
        let name_start = pos;
        if !is_name_start_char(bytes[pos]) {
            return Err(("Attribute name must start with letter, underscore, or colon", pos));
        }
        while pos < bytes.len() && is_name_char(bytes[pos]) {
            pos += 1;
        }
        let name = &input[name_start..pos];

        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }
        if pos >= bytes.len() || bytes[pos] != b'=' {
            return Err(("Attribute value required", pos));
        }
        pos += 1;
        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }

        // Quoted value
        let quote = match bytes.get(pos) {
            Some(&q @ (b'"' | b'\'')) => q,
            _ => return Err(("Attribute value must be quoted", pos)),
        };
        pos += 1;
        let value_start = pos;
        let close = memchr(quote, &bytes[pos..]).ok_or(("Attribute value has mismatched quotes", value_start))?;
        pos += close;

        let raw = &input[value_start..pos];
        if memchr(b'<', raw.as_bytes()).is_some() {
            return Err(("Attribute value cannot contain '<'", value_start));
        }
        let value = normalize_value(raw).map_err(|msg| (msg, value_start))?;
        attrs.push(Attribute::new(name, value));

        pos += 1; // closing quote
    }

    Ok(attrs)
}

/// Attribute-value normalization for literal whitespace, then entity decoding
fn normalize_value(raw: &str) -> Result<Cow<'_, str>, &'static str> {
    if raw.bytes().any(|b| matches!(b, b'\t' | b'\n' | b'\r')) {
        let spaced: String = raw
            .replace("\r\n", " ")
            .chars()
            .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
            .collect();
        return decode_text(&spaced).map(|v| Cow::Owned(v.into_owned()));
    }
    decode_text(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_attributes() {
        let attrs = parse_attributes(" id=\"test\" class=\"foo\"").unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].name, "id");
        assert_eq!(attrs[0].value, "test");
        assert_eq!(attrs[1].name, "class");
        assert_eq!(attrs[1].value, "foo");
    }

    #[test]
    fn test_single_quoted() {
        let attrs = parse_attributes(" id='te\"st'").unwrap();
        assert_eq!(attrs[0].value, "te\"st");
    }

    #[test]
    fn test_namespaced_attribute() {
        let attrs = parse_attributes(" xmlns:xlink=\"http://www.w3.org/1999/xlink\"").unwrap();
        assert_eq!(attrs[0].name, "xmlns:xlink");
        assert_eq!(attrs[0].value, "http://www.w3.org/1999/xlink");
    }

    #[test]
    fn test_entity_in_value() {
        let attrs = parse_attributes(" title=\"&lt;hello&gt;&#xA;\"").unwrap();
        assert_eq!(attrs[0].value, "<hello>\n");
    }

    #[test]
    fn test_literal_newline_normalized() {
        let attrs = parse_attributes(" title=\"a\nb\"").unwrap();
        assert_eq!(attrs[0].value, "a b");
    }

    #[test]
    fn test_empty_attributes() {
        assert!(parse_attributes("").unwrap().is_empty());
        assert!(parse_attributes("   ").unwrap().is_empty());
    }

    #[test]
    fn test_whitespace_handling() {
        let attrs = parse_attributes("  id  =  \"test\"  ").unwrap();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].name, "id");
        assert_eq!(attrs[0].value, "test");
    }

    #[test]
    fn test_malformed_attributes() {
        assert!(parse_attributes(" id=test").is_err());
        assert!(parse_attributes(" id").is_err());
        assert!(parse_attributes(" id=\"open").is_err());
        assert!(parse_attributes(" a=\"1\"b=\"2\"").is_err());
        assert!(parse_attributes(" a=\"<\"").is_err());
    }
}
