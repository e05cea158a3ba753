//! Strict charset decoding with byte-order-mark sniffing.
//!
//! Only three encodings are accepted: `utf-8` (the default), `utf-16le` and
//! `utf-16be`. Decoding never substitutes replacement characters, any invalid
//! byte sequence fails the whole decode.
//!
//! A leading byte-order mark is always stripped. It picks the encoding only when
//! no charset was declared, a declared charset always wins.

use crate::error::DecodeError;
use std::fmt;
use std::str::FromStr;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];

/// A supported text encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Charset {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl Charset {
    /// Resolves a charset label, case-insensitively.
    pub fn from_label(label: &str) -> Result<Self, DecodeError> {
        let label = label.trim();
        if label.eq_ignore_ascii_case("utf-8") {
            Ok(Charset::Utf8)
        } else if label.eq_ignore_ascii_case("utf-16le") {
            Ok(Charset::Utf16Le)
        } else if label.eq_ignore_ascii_case("utf-16be") {
            Ok(Charset::Utf16Be)
        } else {
            Err(DecodeError::unsupported_charset(label))
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Charset::Utf8 => "utf-8",
            Charset::Utf16Le => "utf-16le",
            Charset::Utf16Be => "utf-16be",
        }
    }

    fn bom(self) -> &'static [u8] {
        match self {
            Charset::Utf8 => UTF8_BOM,
            Charset::Utf16Le => UTF16LE_BOM,
            Charset::Utf16Be => UTF16BE_BOM,
        }
    }

    /// Encodes text with this charset, without a byte-order mark.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Charset::Utf8 => text.as_bytes().to_vec(),
            Charset::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            Charset::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
        }
    }

    /// Encodes text with this charset, prefixed with its byte-order mark.
    pub fn encode_with_bom(self, text: &str) -> Vec<u8> {
        let mut bytes = self.bom().to_vec();
        bytes.extend(self.encode(text));
        bytes
    }

    fn decode_exact(self, bytes: &[u8]) -> Result<String, DecodeError> {
        match self {
            Charset::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_string)
                .map_err(|e| DecodeError::invalid_sequence(self.name(), e)),
            Charset::Utf16Le => decode_utf16(self, bytes, u16::from_le_bytes),
            Charset::Utf16Be => decode_utf16(self, bytes, u16::from_be_bytes),
        }
    }
}

impl FromStr for Charset {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Charset::from_label(s)
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Detects a leading byte-order mark, returning the implied charset and the bytes after it.
///
/// The UTF-8 mark is checked first: it is the only three byte mark, and no
/// two byte mark is a prefix of it.
pub fn sniff_bom(bytes: &[u8]) -> (Option<Charset>, &[u8]) {
    for charset in [Charset::Utf8, Charset::Utf16Le, Charset::Utf16Be] {
        if let Some(rest) = bytes.strip_prefix(charset.bom()) {
            return (Some(charset), rest);
        }
    }
    (None, bytes)
}

/// Decodes `bytes` into a string.
///
/// The byte-order mark, if any, is stripped first. The `declared` charset is used
/// when present, otherwise the charset implied by the mark, otherwise utf-8.
pub fn decode(bytes: &[u8], declared: Option<Charset>) -> Result<String, DecodeError> {
    let (sniffed, content) = sniff_bom(bytes);
    let charset = declared.or(sniffed).unwrap_or_default();
    charset.decode_exact(content)
}

/// Like [`decode`], but takes the raw charset label as found in a header.
pub fn decode_with_label(bytes: &[u8], label: Option<&str>) -> Result<String, DecodeError> {
    let declared = label.map(Charset::from_label).transpose()?;
    decode(bytes, declared)
}

fn decode_utf16(charset: Charset, bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> Result<String, DecodeError> {
    let (pairs, remainder) = bytes.as_chunks::<2>();
    if !remainder.is_empty() {
        return Err(DecodeError::invalid_sequence(charset.name(), format!("odd byte length {}", bytes.len())));
    }

    char::decode_utf16(pairs.iter().map(|pair| to_unit(*pair)))
        .collect::<Result<String, _>>()
        .map_err(|e| DecodeError::invalid_sequence(charset.name(), e))
}
