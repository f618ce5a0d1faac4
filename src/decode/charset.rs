//! Charset decoding that never fails.
//!
//! Archives often declare a charset that is right for almost the whole
//! payload and wrong only near a corrupted or truncated tail. Replacing the
//! whole document loses recoverable text, so only the undecodable byte runs
//! are substituted, each byte as a `\xNN` escape.

use std::fmt::Write;

use encoding_rs::{DecoderResult, Encoding, UTF_8};
use tracing::{debug, warn};

/// A resolved charset label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// Strict 7-bit ASCII (WHATWG maps `us-ascii` to windows-1252, which
    /// would silently accept every byte).
    Ascii,
    /// ISO-8859-1, each byte mapped to the code point of the same value.
    /// WHATWG maps this label to windows-1252 too, which turns 0x80-0x9F
    /// into punctuation.
    Latin1,
    Encoding(&'static Encoding),
}

impl Charset {
    /// Resolve a MIME charset label. Returns `None` for unknown labels.
    pub fn for_label(label: &str) -> Option<Self> {
        let label = label.trim().trim_matches(|c| c == '"' || c == '\'');
        let lower = label.to_ascii_lowercase();
        match lower.as_str() {
            "us-ascii" | "ascii" | "ansi_x3.4-1968" | "646" | "us" => Some(Self::Ascii),
            "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "iso_8859_1" | "iso-ir-100" | "latin-1"
            | "latin_1" | "latin1" | "latin" | "l1" | "cp819" | "ibm819" | "8859" => {
                Some(Self::Latin1)
            }
            "utf_8" | "utf-8-sig" => Some(Self::Encoding(UTF_8)),
            _ => Encoding::for_label(lower.as_bytes()).map(Self::Encoding),
        }
    }

    /// Decode strictly; `None` if any byte sequence is invalid.
    pub fn decode_strict(self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Ascii => bytes
                .is_ascii()
                .then(|| bytes.iter().map(|&b| b as char).collect()),
            Self::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
            Self::Encoding(encoding) => encoding
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|s| s.into_owned()),
        }
    }

    /// Decode, escaping each undecodable byte and keeping everything else.
    pub fn decode_escaping(self, bytes: &[u8]) -> String {
        match self {
            Self::Ascii => {
                let mut out = String::with_capacity(bytes.len());
                for &b in bytes {
                    if b.is_ascii() {
                        out.push(b as char);
                    } else {
                        push_escaped(&mut out, &[b]);
                    }
                }
                out
            }
            Self::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
            Self::Encoding(encoding) => decode_escaping_with(encoding, bytes),
        }
    }
}

/// Decode `bytes` under `charset`, falling back to per-byte escapes.
///
/// Unknown labels are decoded as UTF-8. The result is always a string.
pub fn decode_with_fallback(bytes: &[u8], charset: &str) -> String {
    let resolved = match Charset::for_label(charset) {
        Some(c) => c,
        None => {
            warn!(charset = charset, "Unknown charset, decoding as UTF-8");
            Charset::Encoding(UTF_8)
        }
    };

    match resolved.decode_strict(bytes) {
        Some(text) => text,
        None => {
            debug!(
                charset = charset,
                len = bytes.len(),
                "Strict decoding failed, escaping undecodable bytes"
            );
            resolved.decode_escaping(bytes)
        }
    }
}

fn decode_escaping_with(encoding: &'static Encoding, bytes: &[u8]) -> String {
    let mut decoder = encoding.new_decoder_without_bom_handling();
    let mut out = String::with_capacity(bytes.len() + bytes.len() / 2 + 16);
    let mut pos = 0usize;

    loop {
        let (result, read) =
            decoder.decode_to_string_without_replacement(&bytes[pos..], &mut out, true);
        pos += read;
        match result {
            DecoderResult::InputEmpty => return out,
            DecoderResult::OutputFull => {
                let remaining = bytes.len() - pos;
                let needed = decoder
                    .max_utf8_buffer_length_without_replacement(remaining)
                    .unwrap_or(remaining * 4);
                out.reserve(needed.max(16));
            }
            DecoderResult::Malformed(bad, extra) => {
                // Malformed bytes end `extra` bytes before the read position.
                let end = pos.saturating_sub(extra as usize);
                let start = end.saturating_sub(bad as usize);
                push_escaped(&mut out, &bytes[start..end]);
            }
        }
    }
}

fn push_escaped(out: &mut String, bytes: &[u8]) {
    for b in bytes {
        // Writing to a String cannot fail.
        let _ = write!(out, "\\x{b:02x}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_utf8() {
        assert_eq!(decode_with_fallback("héllo".as_bytes(), "utf-8"), "héllo");
    }

    #[test]
    fn test_truncated_utf8_tail_is_escaped() {
        // "añ" followed by the first byte of a two-byte sequence
        let bytes = [b'a', 0xC3, 0xB1, 0xC3];
        assert_eq!(decode_with_fallback(&bytes, "utf-8"), "añ\\xc3");
    }

    #[test]
    fn test_invalid_byte_in_middle_keeps_both_sides() {
        let bytes = b"good \xff text";
        assert_eq!(decode_with_fallback(bytes, "UTF-8"), "good \\xff text");
    }

    #[test]
    fn test_latin1() {
        assert_eq!(decode_with_fallback(b"caf\xe9", "iso-8859-1"), "café");
        assert_eq!(decode_with_fallback(b"caf\xe9", "latin-1"), "café");
    }

    #[test]
    fn test_latin1_keeps_c1_controls() {
        let bytes = [b'a', 0x80, b'b', 0x9f];
        for label in ["iso-8859-1", "ISO-8859-1", "latin1", "l1"] {
            assert_eq!(
                decode_with_fallback(&bytes, label),
                "a\u{80}b\u{9f}",
                "{label}"
            );
        }
    }

    #[test]
    fn test_latin1_roundtrip_over_every_byte() {
        let text: String = (0u8..=255).map(char::from).collect();
        let encoded: Vec<u8> = text.chars().map(|c| c as u8).collect();
        assert_eq!(encoded.len(), 256);
        assert_eq!(decode_with_fallback(&encoded, "iso-8859-1"), text);
    }

    #[test]
    fn test_windows_1252_label_is_not_latin1() {
        assert_eq!(decode_with_fallback(&[0x80], "windows-1252"), "\u{20ac}");
    }

    #[test]
    fn test_ascii_is_strict() {
        assert_eq!(decode_with_fallback(b"abc", "us-ascii"), "abc");
        assert_eq!(decode_with_fallback(b"a\xe9c", "us-ascii"), "a\\xe9c");
    }

    #[test]
    fn test_unknown_charset_falls_back_to_utf8() {
        assert_eq!(decode_with_fallback("ü".as_bytes(), "x-no-such-charset"), "ü");
    }

    #[test]
    fn test_quoted_label() {
        assert_eq!(
            Charset::for_label("\"UTF-8\""),
            Some(Charset::Encoding(UTF_8))
        );
    }

    #[test]
    fn test_roundtrip_through_encoder() {
        let text = "Grüße aus Köln, žluťoučký kůň";
        for label in ["utf-8", "windows-1250", "utf-16le"] {
            let Some(Charset::Encoding(enc)) = Charset::for_label(label) else {
                panic!("label {label} should resolve");
            };
            let encoded: Vec<u8> = if enc == encoding_rs::UTF_16LE {
                text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
            } else {
                enc.encode(text).0.into_owned()
            };
            assert_eq!(decode_with_fallback(&encoded, label), text, "{label}");
        }
    }

    #[test]
    fn test_total_on_arbitrary_bytes() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        for label in ["utf-8", "shift_jis", "euc-kr", "gb18030", "us-ascii", "utf-16be"] {
            let decoded = decode_with_fallback(&bytes, label);
            assert!(!decoded.is_empty(), "{label}");
        }
    }
}
