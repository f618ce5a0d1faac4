//! RFC 2047 encoded-word decoding for header values.
//!
//! A value is split into ordered segments, each either charset-tagged bytes
//! from an encoded-word or untagged literal text. Adjacent segments with the
//! same tag are merged, whitespace separating two encoded-words is dropped
//! (RFC 2047 §6.2), and the segments are decoded and concatenated.

use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::{alphabet, Engine};

use super::charset::decode_with_fallback;
use crate::error::{MboxError, Result};

/// Lenient base64: padding optional, trailing bits ignored.
pub(crate) const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// One piece of a header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// The whole value, when it contains no encoded-word at all.
    Text(String),
    /// Bytes with the charset they must be decoded with. Untagged literal
    /// runs between encoded-words have `charset = None`.
    Bytes {
        bytes: Vec<u8>,
        charset: Option<String>,
    },
}

/// Decode a header value that may contain encoded-words.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`
///
/// # Errors
///
/// [`MboxError::NonAsciiHeaderChunk`] if an untagged literal run next to an
/// encoded-word contains a non-ASCII byte. This never happens for
/// well-formed input; callers drop or keep the raw value and carry on.
pub fn decode_header_value(input: &str) -> Result<String> {
    let mut result = String::with_capacity(input.len());
    for segment in split_segments(input) {
        match segment {
            Segment::Text(text) => result.push_str(&text),
            Segment::Bytes {
                bytes,
                charset: Some(charset),
            } => result.push_str(&decode_with_fallback(&bytes, &charset)),
            Segment::Bytes {
                bytes,
                charset: None,
            } => {
                if !bytes.is_ascii() {
                    return Err(MboxError::NonAsciiHeaderChunk {
                        chunk: String::from_utf8_lossy(&bytes).into_owned(),
                        value: input.to_string(),
                    });
                }
                result.extend(bytes.iter().map(|&b| b as char));
            }
        }
    }
    Ok(result)
}

/// Split a header value into charset-tagged segments, merged and in order.
pub fn split_segments(input: &str) -> Vec<Segment> {
    if !input.lines().any(|line| find_encoded_word(line).is_some()) {
        return vec![Segment::Text(input.to_string())];
    }

    // (bytes, charset, came_from_encoded_word)
    let mut words: Vec<(Vec<u8>, Option<String>, bool)> = Vec::new();
    for line in input.lines() {
        let mut remaining = line;
        let mut first = true;
        loop {
            let found = find_encoded_word(remaining);
            let literal_end = found.as_ref().map_or(remaining.len(), |w| w.start);
            let mut literal = &remaining[..literal_end];
            if first {
                literal = literal.trim_start();
                first = false;
            }
            if !literal.is_empty() {
                words.push((literal.as_bytes().to_vec(), None, false));
            }
            match found {
                Some(word) => {
                    words.push((word.bytes, Some(word.charset), true));
                    remaining = &remaining[word.end..];
                }
                None => break,
            }
        }
    }

    // Drop whitespace-only literals sitting between two encoded-words.
    let mut i = 1;
    while i + 1 < words.len() {
        let is_gap = !words[i].2
            && words[i - 1].2
            && words[i + 1].2
            && words[i].0.iter().all(u8::is_ascii_whitespace);
        if is_gap {
            words.remove(i);
        } else {
            i += 1;
        }
    }

    // Merge neighbours sharing a charset; untagged literals join with a space.
    let mut segments: Vec<Segment> = Vec::new();
    for (bytes, charset, _) in words {
        if let Some(Segment::Bytes {
            bytes: last_bytes,
            charset: last_charset,
        }) = segments.last_mut()
        {
            if *last_charset == charset {
                if charset.is_none() {
                    last_bytes.push(b' ');
                }
                last_bytes.extend_from_slice(&bytes);
                continue;
            }
        }
        segments.push(Segment::Bytes { bytes, charset });
    }
    segments
}

struct EncodedWord {
    start: usize,
    end: usize,
    charset: String,
    bytes: Vec<u8>,
}

/// Find the first well-formed `=?charset?enc?text?=` in `s`.
fn find_encoded_word(s: &str) -> Option<EncodedWord> {
    let mut search_from = 0;
    while let Some(rel) = s[search_from..].find("=?") {
        let start = search_from + rel;
        if let Some(word) = parse_encoded_word_at(s, start) {
            return Some(word);
        }
        search_from = start + 2;
    }
    None
}

fn parse_encoded_word_at(s: &str, start: usize) -> Option<EncodedWord> {
    // Format: =?charset?encoding?encoded_text?=
    let after = &s[start + 2..];
    let first_q = after.find('?')?;
    let charset = &after[..first_q];

    let rest = &after[first_q + 1..];
    let encoding = rest.as_bytes().first()?.to_ascii_uppercase();
    if !matches!(encoding, b'B' | b'Q') || rest.as_bytes().get(1) != Some(&b'?') {
        return None;
    }

    let text_and_tail = &rest[2..];
    let text_end = text_and_tail.find("?=")?;
    let encoded_text = &text_and_tail[..text_end];

    let bytes = if encoding == b'B' {
        decode_b_encoding(encoded_text)?
    } else {
        decode_q_encoding(encoded_text)
    };

    // RFC 2231 language suffix: "utf-8*en"
    let charset = charset.split('*').next().unwrap_or(charset).to_lowercase();
    let end = start + 2 + first_q + 1 + 2 + text_end + 2;

    Some(EncodedWord {
        start,
        end,
        charset,
        bytes,
    })
}

fn decode_b_encoding(input: &str) -> Option<Vec<u8>> {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '+' || *c == '/')
        .collect();
    LENIENT_BASE64.decode(cleaned.as_bytes()).ok()
}

/// Decode Q-encoding (RFC 2047): underscores → spaces, `=XX` → byte.
fn decode_q_encoding(input: &str) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' if i + 2 < bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit() =>
            {
                result.push((hex_value(bytes[i + 1]) << 4) | hex_value(bytes[i + 2]));
                i += 3;
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    result
}

pub(crate) fn hex_value(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}
