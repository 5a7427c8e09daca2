// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Charset resolution for byte-oriented captures.
//!
//! Names resolve through the WHATWG label table in `encoding_rs`, except
//! ISO-8859-1 which is decoded exactly (byte value == code point). WHATWG
//! maps that label to windows-1252, which is not what HTTP/1.1 means by
//! its default charset.

use std::fmt;

use encoding_rs::Encoding;

use crate::error::{CaptureError, Result};

const LATIN1_LABELS: &[&str] = &[
    "iso-8859-1",
    "iso8859-1",
    "iso_8859-1",
    "iso_8859-1:1987",
    "latin1",
    "l1",
    "cp819",
    "ibm819",
];

/// A concrete decoder for captured bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// ISO-8859-1, the HTTP/1.1 default.
    Latin1,
    Encoding(&'static Encoding),
}

impl Charset {
    /// The charset used when none is declared or the declared one is unknown.
    pub const DEFAULT: Charset = Charset::Latin1;

    /// Look up a charset by name or label, case-insensitively.
    pub fn for_name(name: &str) -> Result<Self> {
        let label = name.trim().trim_matches('"');
        if LATIN1_LABELS
            .iter()
            .any(|l| l.eq_ignore_ascii_case(label))
        {
            return Ok(Self::Latin1);
        }
        Encoding::for_label_no_replacement(label.as_bytes())
            .map(Self::Encoding)
            .ok_or_else(|| CaptureError::UnknownCharset(name.to_string()))
    }

    /// Canonical name of the charset.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Latin1 => "ISO-8859-1",
            Self::Encoding(e) => e.name(),
        }
    }

    /// Decode bytes into a string. Malformed sequences become U+FFFD.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
            Self::Encoding(e) => e.decode_with_bom_removal(bytes).0.into_owned(),
        }
    }

    /// Encode a string so that [`decode`](Self::decode) gives it back.
    /// Unmappable chars become `?` (Latin-1) or numeric character
    /// references (legacy `encoding_rs` encodings).
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match *self {
            Self::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect(),
            // encoding_rs only decodes UTF-16; its encoder emits UTF-8
            Self::Encoding(e) if e == encoding_rs::UTF_16LE => {
                text.encode_utf16().flat_map(u16::to_le_bytes).collect()
            }
            Self::Encoding(e) if e == encoding_rs::UTF_16BE => {
                text.encode_utf16().flat_map(u16::to_be_bytes).collect()
            }
            Self::Encoding(e) => e.encode(text).0.into_owned(),
        }
    }
}

impl Default for Charset {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolve an optional charset name, falling back to [`Charset::DEFAULT`].
///
/// Unknown names are logged, never returned as errors.
pub fn resolve_charset(name: Option<&str>) -> Charset {
    let Some(name) = name else {
        return Charset::DEFAULT;
    };
    match Charset::for_name(name) {
        Ok(charset) => charset,
        Err(err) => {
            err.log();
            Charset::DEFAULT
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_charsets() {
        assert_eq!(resolve_charset(Some("UTF-8")), Charset::Encoding(encoding_rs::UTF_8));
        assert_eq!(resolve_charset(Some("utf8")), Charset::Encoding(encoding_rs::UTF_8));
        assert_eq!(
            resolve_charset(Some("\"utf-16le\"")),
            Charset::Encoding(encoding_rs::UTF_16LE)
        );
        assert_eq!(resolve_charset(Some("ISO-8859-1")), Charset::Latin1);
        assert_eq!(resolve_charset(Some("Latin1")), Charset::Latin1);
    }

    #[test]
    fn test_resolve_falls_back() {
        assert_eq!(resolve_charset(None), Charset::DEFAULT);
        assert_eq!(resolve_charset(Some("x-no-such-charset")), Charset::DEFAULT);
        assert_eq!(resolve_charset(Some("")), Charset::DEFAULT);
    }

    #[test]
    fn test_for_name_unknown_is_error() {
        let err = Charset::for_name("klingon").unwrap_err();
        assert_eq!(err, CaptureError::UnknownCharset("klingon".to_string()));
    }

    #[test]
    fn test_latin1_decode_is_exact() {
        // 0x80..0x9F are C1 controls in ISO-8859-1, not windows-1252 glyphs
        let bytes = [0x63, 0x61, 0x66, 0xE9, 0x80];
        assert_eq!(Charset::Latin1.decode(&bytes), "caf\u{e9}\u{80}");
    }

    #[test]
    fn test_latin1_encode() {
        assert_eq!(Charset::Latin1.encode("caf\u{e9}\u{20ac}"), vec![0x63, 0x61, 0x66, 0xE9, b'?']);
    }

    #[test]
    fn test_utf16_encode_matches_decode() {
        let le = Charset::for_name("utf-16le").unwrap();
        assert_eq!(le.encode("{\"a\":1}")[..4], [b'{', 0, b'"', 0]);
        assert_eq!(le.decode(&le.encode("{\"a\":\"\u{e9}\u{1f980}\"}")), "{\"a\":\"\u{e9}\u{1f980}\"}");

        let be = Charset::for_name("UTF-16BE").unwrap();
        assert_eq!(be.encode("ok"), vec![0, b'o', 0, b'k']);
        assert_eq!(be.decode(&be.encode("caf\u{e9}")), "caf\u{e9}");
    }

    #[test]
    fn test_utf8_decode() {
        let charset = Charset::Encoding(encoding_rs::UTF_8);
        assert_eq!(charset.decode("caf\u{e9}".as_bytes()), "caf\u{e9}");
        assert_eq!(charset.name(), "UTF-8");
    }
}
