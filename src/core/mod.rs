//! Core XML parsing primitives
//!
//! This module contains the fundamental building blocks for XML parsing:
//! - Scanner: memchr-accelerated delimiter detection
//! - Entities: XML entity decoding and output escaping with Cow
//! - Attributes: Attribute parsing and extraction
//! - Encoding: UTF-16 detection on input, encoding selection on output

pub mod attributes;
pub mod encoding;
pub mod entities;
pub mod scanner;
