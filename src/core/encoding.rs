//! XML Encoding Detection and Conversion
//!
//! Input: detects UTF-16 and UTF-8 from the BOM or the first bytes and
//! converts everything to a UTF-8 `String` before parsing.
//! Output: encodes serialized text into the encoding requested by the caller.

/// Text encodings understood on input and output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl TextEncoding {
    /// Detect encoding from byte order mark or initial bytes
    pub fn detect(input: &[u8]) -> Self {
        if input.len() < 2 {
            return TextEncoding::Utf8;
        }

        match (input[0], input[1]) {
            (0xFF, 0xFE) => TextEncoding::Utf16Le,
            (0xFE, 0xFF) => TextEncoding::Utf16Be,
            // No BOM - '<' next to a NUL byte means UTF-16
            (0x00, b'<') => TextEncoding::Utf16Be,
            (b'<', 0x00) => TextEncoding::Utf16Le,
            _ => TextEncoding::Utf8,
        }
    }

    /// Name written in the XML declaration
    pub fn label(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf16Le | TextEncoding::Utf16Be => "utf-16",
        }
    }

    /// Encode text, prefixing a byte order mark for UTF-16
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            TextEncoding::Utf8 => text.as_bytes().to_vec(),
            TextEncoding::Utf16Le => {
                let mut out = Vec::with_capacity(2 + text.len() * 2);
                out.extend_from_slice(&[0xFF, 0xFE]);
                for unit in text.encode_utf16() {
                    out.extend_from_slice(&unit.to_le_bytes());
                }
                out
            }
            TextEncoding::Utf16Be => {
                let mut out = Vec::with_capacity(2 + text.len() * 2);
                out.extend_from_slice(&[0xFE, 0xFF]);
                for unit in text.encode_utf16() {
                    out.extend_from_slice(&unit.to_be_bytes());
                }
                out
            }
        }
    }
}

/// Convert raw input bytes to a UTF-8 string
pub fn convert_to_utf8(input: Vec<u8>) -> Result<String, String> {
    match TextEncoding::detect(&input) {
        TextEncoding::Utf8 => {
            let bytes = match input.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
                Some(rest) => rest.to_vec(),
                None => input,
            };
            String::from_utf8(bytes).map_err(|e| format!("Invalid UTF-8: {}", e))
        }
        TextEncoding::Utf16Le => decode_utf16(&input, [0xFF, 0xFE], u16::from_le_bytes, "LE"),
        TextEncoding::Utf16Be => decode_utf16(&input, [0xFE, 0xFF], u16::from_be_bytes, "BE"),
    }
}

fn decode_utf16(
    input: &[u8],
    bom: [u8; 2],
    unit: fn([u8; 2]) -> u16,
    order: &str,
) -> Result<String, String> {
    let bytes = input.strip_prefix(&bom).unwrap_or(input);

    if bytes.len() % 2 != 0 {
        return Err(format!("Invalid UTF-16 {}: odd number of bytes", order));
    }

    let code_units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|chunk| unit([chunk[0], chunk[1]]))
        .collect();

    String::from_utf16(&code_units).map_err(|e| format!("Invalid UTF-16 {}: {}", order, e))
}
