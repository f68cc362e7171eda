//! dynaxml - Dynamic member access over a mutable XML tree
//!
//! Layers:
//! - core/reader: memchr-accelerated pull parser over UTF-8 text
//! - dom: arena document with mutation and serialization
//! - xpath: XPath 1.0 evaluator for path lookups
//! - facade: `Node`, the name-driven view over one element
//!
//! ```no_run
//! use dynaxml::Node;
//!
//! let person = Node::parse("<person><name>Ada</name></person>")?;
//! person.set("_id", 7i32);
//! assert_eq!(person.value_by_name("name").as_deref(), Some("Ada"));
//! # Ok::<(), dynaxml::XmlError>(())
//! ```

mod core;
mod reader;

pub mod dom;
pub mod error;
pub mod facade;
pub mod xpath;

pub use crate::core::encoding::TextEncoding;
pub use dom::{Document, Formatting, LoadOptions, NodeId, SaveOptions, XmlSink};
pub use error::{ConvertError, Result, XPathError, XmlError};
pub use facade::{ConversionTarget, FormatProvider, FromXmlText, Member, Node, Returned, Value};
pub use xpath::XPathValue;
