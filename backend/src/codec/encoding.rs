//! Byte-order-mark based encoding detection.
//!
//! Only BOMs are inspected. Anything without one is read as UTF-8; invalid
//! sequences decode to U+FFFD rather than failing the load.

use std::fmt;

use serde::Serialize;

pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
pub const UTF16LE_BOM: [u8; 2] = [0xFF, 0xFE];
pub const UTF16BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// Text encoding of a CSV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Encoding {
    /// UTF-8 with a byte-order-mark (what save writes).
    Utf8Bom,
    Utf16Le,
    Utf16Be,
    /// UTF-8 without a byte-order-mark (the fallback).
    Utf8,
}

impl Encoding {
    pub fn name(self) -> &'static str {
        match self {
            Self::Utf8Bom => "utf-8 (bom)",
            Self::Utf16Le => "utf-16le",
            Self::Utf16Be => "utf-16be",
            Self::Utf8 => "utf-8",
        }
    }

    /// Length of the BOM this encoding was detected from.
    pub fn bom_len(self) -> usize {
        match self {
            Self::Utf8Bom => UTF8_BOM.len(),
            Self::Utf16Le | Self::Utf16Be => UTF16LE_BOM.len(),
            Self::Utf8 => 0,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Detect the encoding from the leading bytes.
pub fn detect_encoding(bytes: &[u8]) -> Encoding {
    if bytes.starts_with(&UTF8_BOM) {
        Encoding::Utf8Bom
    } else if bytes.starts_with(&UTF16LE_BOM) {
        Encoding::Utf16Le
    } else if bytes.starts_with(&UTF16BE_BOM) {
        Encoding::Utf16Be
    } else {
        Encoding::Utf8
    }
}

/// Decode `bytes` (BOM included) as `encoding`, dropping the BOM.
pub fn decode_content(bytes: &[u8], encoding: Encoding) -> String {
    let body = bytes.get(encoding.bom_len()..).unwrap_or_default();
    match encoding {
        Encoding::Utf8Bom | Encoding::Utf8 => String::from_utf8_lossy(body).into_owned(),
        Encoding::Utf16Le => encoding_rs::UTF_16LE
            .decode_without_bom_handling(body)
            .0
            .into_owned(),
        Encoding::Utf16Be => encoding_rs::UTF_16BE
            .decode_without_bom_handling(body)
            .0
            .into_owned(),
    }
}

/// Detect and decode in one step.
pub fn decode_auto(bytes: &[u8]) -> (String, Encoding) {
    let encoding = detect_encoding(bytes);
    (decode_content(bytes, encoding), encoding)
}
