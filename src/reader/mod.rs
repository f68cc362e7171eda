//! XML Reader Module
//!
//! - SliceReader: pull parser over an in-memory UTF-8 string
//! - Events: XML event types for pull parsing

pub mod events;
pub mod slice;

pub use events::XmlEvent;
pub use slice::SliceReader;
