//! Typed value conversion
//!
//! Every conversion parses the node's flattened text with the target type's
//! textual rules, adjusted by a `FormatProvider`. Failures are hard errors.

use std::num::IntErrorKind;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use super::Node;
use crate::error::ConvertError;

/// Culture-like settings used when parsing text into typed values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatProvider {
    /// Separator between integral and fractional digits
    pub decimal_separator: char,
    /// Digit group separator accepted (and ignored) in floating point and
    /// decimal text. Never accepted for integers.
    pub group_separator: Option<char>,
    /// chrono format strings tried in order for date/time targets
    pub date_formats: Vec<String>,
}

impl Default for FormatProvider {
    fn default() -> Self {
        Self::invariant()
    }
}

impl FormatProvider {
    /// `.` decimal point, `,` groups, ISO 8601 style dates
    pub fn invariant() -> Self {
        FormatProvider {
            decimal_separator: '.',
            group_separator: Some(','),
            date_formats: vec![
                "%Y-%m-%dT%H:%M:%S%.f".to_string(),
                "%Y-%m-%d %H:%M:%S%.f".to_string(),
                "%Y-%m-%dT%H:%M".to_string(),
                "%Y-%m-%d".to_string(),
            ],
        }
    }

    pub fn with_decimal_separator(mut self, separator: char) -> Self {
        self.decimal_separator = separator;
        self
    }

    pub fn with_group_separator(mut self, separator: Option<char>) -> Self {
        self.group_separator = separator;
        self
    }

    pub fn with_date_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.date_formats = formats.into_iter().map(Into::into).collect();
        self
    }

    /// Rewrite number text into Rust's syntax: trimmed, groups dropped,
    /// `.` as decimal point
    fn normalize_number(&self, text: &str) -> String {
        text.trim()
            .chars()
            .filter(|&c| Some(c) != self.group_separator || c == self.decimal_separator)
            .map(|c| if c == self.decimal_separator { '.' } else { c })
            .collect()
    }
}

/// Types that can be parsed from a node's text
pub trait FromXmlText: Sized {
    /// Name used in error messages
    const TARGET: &'static str;

    fn from_xml_text(text: &str, provider: &FormatProvider) -> Result<Self, ConvertError>;
}

impl FromXmlText for bool {
    const TARGET: &'static str = "bool";

    fn from_xml_text(text: &str, _provider: &FormatProvider) -> Result<Self, ConvertError> {
        let t = text.trim();
        if t.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if t.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(ConvertError::format(Self::TARGET, text))
        }
    }
}

macro_rules! impl_integer {
    ($($ty:ty),*) => {
        $(
            impl FromXmlText for $ty {
                const TARGET: &'static str = stringify!($ty);

                fn from_xml_text(text: &str, _provider: &FormatProvider) -> Result<Self, ConvertError> {
                    text.trim().parse::<$ty>().map_err(|e| match e.kind() {
                        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                            ConvertError::overflow(Self::TARGET, text)
                        }
                        _ => ConvertError::format(Self::TARGET, text),
                    })
                }
            }
        )*
    };
}

impl_integer!(u8, i16, u16, i32, u32, i64, u64);

macro_rules! impl_float {
    ($($ty:ty),*) => {
        $(
            impl FromXmlText for $ty {
                const TARGET: &'static str = stringify!($ty);

                fn from_xml_text(text: &str, provider: &FormatProvider) -> Result<Self, ConvertError> {
                    provider
                        .normalize_number(text)
                        .parse::<$ty>()
                        .map_err(|_| ConvertError::format(Self::TARGET, text))
                }
            }
        )*
    };
}

impl_float!(f32, f64);

impl FromXmlText for Decimal {
    const TARGET: &'static str = "Decimal";

    fn from_xml_text(text: &str, provider: &FormatProvider) -> Result<Self, ConvertError> {
        let normalized = provider.normalize_number(text);
        let normalized = normalized.strip_prefix('+').unwrap_or(&normalized);
        Decimal::from_str(normalized).map_err(|_| ConvertError::format(Self::TARGET, text))
    }
}

impl FromXmlText for char {
    const TARGET: &'static str = "char";

    /// Exactly one character, no trimming
    fn from_xml_text(text: &str, _provider: &FormatProvider) -> Result<Self, ConvertError> {
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(ConvertError::format(Self::TARGET, text)),
        }
    }
}

impl FromXmlText for NaiveDateTime {
    const TARGET: &'static str = "NaiveDateTime";

    /// Tries each provider format; date-only formats yield midnight
    fn from_xml_text(text: &str, provider: &FormatProvider) -> Result<Self, ConvertError> {
        let t = text.trim();
        provider
            .date_formats
            .iter()
            .find_map(|format| {
                NaiveDateTime::parse_from_str(t, format).ok().or_else(|| {
                    NaiveDate::parse_from_str(t, format)
                        .ok()
                        .map(|d| d.and_time(NaiveTime::MIN))
                })
            })
            .ok_or_else(|| ConvertError::format(Self::TARGET, text))
    }
}

impl FromXmlText for DateTime<FixedOffset> {
    const TARGET: &'static str = "DateTime<FixedOffset>";

    /// RFC 3339 first, then provider formats carrying an offset, then
    /// offset-less formats read as UTC
    fn from_xml_text(text: &str, provider: &FormatProvider) -> Result<Self, ConvertError> {
        let t = text.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
            return Ok(dt);
        }
        if let Some(dt) = provider
            .date_formats
            .iter()
            .find_map(|format| DateTime::parse_from_str(t, format).ok())
        {
            return Ok(dt);
        }
        NaiveDateTime::from_xml_text(text, provider)
            .map(|naive| naive.and_utc().fixed_offset())
            .map_err(|_| ConvertError::format(Self::TARGET, text))
    }
}

/// Explicit conversion targets accepted by `Node::convert_to`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionTarget {
    String,
    Bool,
    Byte,
    Char,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
    Decimal,
    DateTime,
}

impl Node {
    /// Parse the flattened text as `T` with invariant formatting
    pub fn to<T: FromXmlText>(&self) -> Result<T, ConvertError> {
        self.to_with(&FormatProvider::invariant())
    }

    /// Parse the flattened text as `T` with the given format provider
    pub fn to_with<T: FromXmlText>(&self, provider: &FormatProvider) -> Result<T, ConvertError> {
        T::from_xml_text(&self.value(), provider)
    }

    /// Explicit conversion: only the string target is honoured, every other
    /// target must go through the typed surface (`to`, `TryFrom`)
    pub fn convert_to(&self, target: ConversionTarget) -> Option<String> {
        match target {
            ConversionTarget::String => Some(self.value()),
            other => {
                tracing::trace!(?other, "explicit conversion refused");
                None
            }
        }
    }
}

macro_rules! impl_try_from_node {
    ($($ty:ty),*) => {
        $(
            impl TryFrom<&Node> for $ty {
                type Error = ConvertError;

                fn try_from(node: &Node) -> Result<Self, Self::Error> {
                    node.to::<$ty>()
                }
            }
        )*
    };
}

impl_try_from_node!(
    bool,
    u8,
    i16,
    u16,
    i32,
    u32,
    i64,
    u64,
    char,
    f32,
    f64,
    Decimal,
    NaiveDateTime,
    DateTime<FixedOffset>
);

impl From<&Node> for String {
    fn from(node: &Node) -> Self {
        node.value()
    }
}
