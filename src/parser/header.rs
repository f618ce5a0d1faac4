//! RFC 5322 header parsing: header blocks, folding and date normalization.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use tracing::warn;

/// One header field as it appeared in the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHeader {
    /// Field name with its original case.
    pub name: String,
    /// Field value with folding preserved (continuation lines joined by `\n`).
    pub value: String,
}

impl RawHeader {
    pub fn lower_name(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Split a message (or MIME entity) into its header block and body.
///
/// The blank line between them belongs to neither. A message without a
/// blank line is all headers.
pub fn split_header_body(data: &[u8]) -> (&[u8], &[u8]) {
    if data.starts_with(b"\n") {
        return (&[], &data[1..]);
    }
    if data.starts_with(b"\r\n") {
        return (&[], &data[2..]);
    }
    for i in 0..data.len().saturating_sub(1) {
        if data[i] == b'\n' && data[i + 1] == b'\n' {
            return (&data[..i + 1], &data[i + 2..]);
        }
        if i + 3 < data.len()
            && data[i] == b'\r'
            && data[i + 1] == b'\n'
            && data[i + 2] == b'\r'
            && data[i + 3] == b'\n'
        {
            return (&data[..i + 2], &data[i + 4..]);
        }
    }
    (data, &[])
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to windows-1252 (which accepts every byte).
pub fn decode_header_bytes(bytes: &[u8]) -> String {
    // Strip BOM if present
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Parse a header block into fields, keeping name case and value folding.
///
/// Leading whitespace of the value is dropped. Lines that are neither a
/// field nor a continuation are skipped.
pub fn parse_header_block(text: &str) -> Vec<RawHeader> {
    let mut result: Vec<RawHeader> = Vec::new();

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                last.value.push('\n');
                last.value.push_str(line);
            }
        } else if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim_end();
            if name.is_empty() || name.contains(' ') {
                continue;
            }
            let value = line[colon_pos + 1..].trim_start_matches([' ', '\t']);
            result.push(RawHeader {
                name: name.to_string(),
                value: value.to_string(),
            });
        }
    }

    result
}

/// Collapse folding: every line break and the blanks around it become one space.
pub fn unfold_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut lines = value.split('\n').peekable();
    while let Some(line) = lines.next() {
        let line = line.trim_end_matches('\r');
        if out.is_empty() {
            out.push_str(line);
        } else {
            out.push_str(line.trim_start_matches([' ', '\t']));
        }
        if lines.peek().is_some() {
            let trimmed_len = out.trim_end_matches([' ', '\t']).len();
            out.truncate(trimmed_len);
            out.push(' ');
        }
    }
    out
}

/// Normalize a `Date:` value to an ISO 8601 timestamp.
///
/// `-0000` ("no zone information") is read as UTC. The original offset is
/// kept; a date without any zone renders without one.
pub fn normalize_date(raw: &str) -> Option<String> {
    let value = unfold_value(raw).replace(" -0000", " +0000");
    match parse_date(&value)? {
        ParsedDate::Zoned(dt) => Some(dt.to_rfc3339()),
        ParsedDate::Naive(ndt) => Some(ndt.format("%Y-%m-%dT%H:%M:%S").to_string()),
    }
}

/// A parsed date, with or without zone information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedDate {
    Zoned(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

/// Parse an email date string in various common formats.
///
/// Supports RFC 2822, ISO 8601, and many broken real-world variants.
pub fn parse_date(date_str: &str) -> Option<ParsedDate> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Try chrono's RFC 2822
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(ParsedDate::Zoned(dt));
    }

    // Try ISO 8601 / RFC 3339
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ParsedDate::Zoned(dt));
    }

    // Remove leading day-of-week: "Thu, " or "Thu "
    let no_dow = strip_day_of_week(trimmed);

    // IMAP-style: "16-JUL-2025 03:01:03" → normalize to "16 Jul 2025 03:01:03"
    let no_dow_normalized = normalize_imap_date(&no_dow);

    let formats = [
        "%d %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M:%S",
        "%d %b %Y %H:%M %z",
        "%b %d %H:%M:%S %Y",
        "%Y-%m-%dT%H:%M:%S%z",
        "%Y-%m-%d %H:%M:%S %z",
        "%Y-%m-%d %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
    ];

    // Try both the original (stripped DOW) and the IMAP-normalized variant
    for candidate in [&no_dow, &no_dow_normalized] {
        for fmt in &formats {
            if let Ok(dt) = DateTime::parse_from_str(candidate, fmt) {
                return Some(ParsedDate::Zoned(dt));
            }
            if let Ok(ndt) = NaiveDateTime::parse_from_str(candidate, fmt) {
                return Some(ParsedDate::Naive(ndt));
            }
        }
    }

    // Replace named timezones with offsets and try again
    for candidate in [&no_dow, &no_dow_normalized] {
        let replaced = replace_named_tz(candidate);
        for fmt in &formats {
            if let Ok(dt) = DateTime::parse_from_str(&replaced, fmt) {
                return Some(ParsedDate::Zoned(dt));
            }
        }
    }

    // Try using mail-parser's date parsing as last resort
    if let Some(dt) = mail_parser_date(trimmed) {
        return Some(ParsedDate::Zoned(dt));
    }

    warn!(date = trimmed, "Could not parse date");
    None
}

/// Attempt to parse a date using `mail-parser`'s built-in parser.
fn mail_parser_date(input: &str) -> Option<DateTime<FixedOffset>> {
    use mail_parser::MessageParser;

    // Wrap input in a minimal RFC 5322 message so mail-parser can parse it
    let fake_msg = format!("Date: {input}\n\n");
    let parser = MessageParser::default();
    let parsed = parser.parse(fake_msg.as_bytes())?;
    let dt = parsed.date()?.to_rfc3339();
    DateTime::parse_from_rfc3339(&dt).ok()
}

/// Normalize IMAP-style dates: `"16-JUL-2025 03:01:03"` → `"16 Jul 2025 03:01:03"`.
fn normalize_imap_date(s: &str) -> String {
    if !s.contains('-') {
        return s.to_string();
    }

    let months = [
        "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
    ];
    let title_months = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];

    let upper = s.to_uppercase();
    for (i, month) in months.iter().enumerate() {
        let pattern = format!("-{month}-");
        if let Some(pos) = upper.find(&pattern) {
            let mut result = s.to_string();
            result.replace_range(pos..pos + pattern.len(), &format!(" {} ", title_months[i]));
            return result;
        }
    }

    s.to_string()
}

/// Strip leading day-of-week prefix (e.g. "Thu, " or "Thu ").
fn strip_day_of_week(s: &str) -> String {
    let days = [
        "Mon,", "Tue,", "Wed,", "Thu,", "Fri,", "Sat,", "Sun,", "Mon ", "Tue ", "Wed ", "Thu ",
        "Fri ", "Sat ", "Sun ",
    ];
    for day in &days {
        if let Some(rest) = s.strip_prefix(day) {
            return rest.trim().to_string();
        }
    }
    s.to_string()
}

/// Replace well-known timezone abbreviations with numeric offsets.
fn replace_named_tz(s: &str) -> String {
    let tzs = [
        ("EST", "-0500"),
        ("EDT", "-0400"),
        ("CST", "-0600"),
        ("CDT", "-0500"),
        ("MST", "-0700"),
        ("MDT", "-0600"),
        ("PST", "-0800"),
        ("PDT", "-0700"),
        ("GMT", "+0000"),
        ("UTC", "+0000"),
        ("UT", "+0000"),
        ("CEST", "+0200"),
        ("CET", "+0100"),
        ("JST", "+0900"),
    ];
    let mut result = s.to_string();
    for (name, offset) in &tzs {
        if result.ends_with(name) {
            let pos = result.len() - name.len();
            result.replace_range(pos.., offset);
            return result;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_header_body() {
        let (h, b) = split_header_body(b"From: a@b.com\nSubject: Hi\n\nBody\n");
        assert_eq!(h, b"From: a@b.com\nSubject: Hi\n");
        assert_eq!(b, b"Body\n");
    }

    #[test]
    fn test_split_header_body_crlf() {
        let (h, b) = split_header_body(b"From: a@b.com\r\n\r\nBody\r\n");
        assert_eq!(h, b"From: a@b.com\r\n");
        assert_eq!(b, b"Body\r\n");
    }

    #[test]
    fn test_split_header_body_without_headers() {
        let (h, b) = split_header_body(b"\nBody");
        assert!(h.is_empty());
        assert_eq!(b, b"Body");
    }

    #[test]
    fn test_parse_header_block_keeps_case_and_folding() {
        let text = "Subject: This is a long\n\tsubject line\nX-Mailer:  Foo\nmessage-id: <a@b>\n";
        let headers = parse_header_block(text);
        assert_eq!(headers.len(), 3);
        assert_eq!(headers[0].name, "Subject");
        assert_eq!(headers[0].value, "This is a long\n\tsubject line");
        assert_eq!(headers[1].value, "Foo");
        assert_eq!(headers[2].name, "message-id");
        assert_eq!(headers[2].lower_name(), "message-id");
    }

    #[test]
    fn test_unfold_value() {
        assert_eq!(
            unfold_value("This is a long  \n\t subject line"),
            "This is a long subject line"
        );
        assert_eq!(unfold_value("single"), "single");
    }

    #[test]
    fn test_normalize_date_keeps_offset() {
        assert_eq!(
            normalize_date("Thu, 04 Jan 2024 10:00:00 +0100").as_deref(),
            Some("2024-01-04T10:00:00+01:00")
        );
    }

    #[test]
    fn test_normalize_date_minus_zero_is_utc() {
        assert_eq!(
            normalize_date("Thu, 04 Jan 2024 10:00:00 -0000").as_deref(),
            Some("2024-01-04T10:00:00+00:00")
        );
    }

    #[test]
    fn test_normalize_date_garbage() {
        assert_eq!(normalize_date("not a date at all"), None);
    }

    #[test]
    fn test_parse_date_named_tz() {
        assert!(parse_date("Thu, 04 Jan 2024 10:00:00 EST").is_some());
    }

    #[test]
    fn test_parse_date_imap_style() {
        let dt = parse_date("16-JUL-2025 03:01:03");
        assert_eq!(
            dt,
            Some(ParsedDate::Naive(
                NaiveDateTime::parse_from_str("2025-07-16 03:01:03", "%Y-%m-%d %H:%M:%S").unwrap()
            ))
        );
    }

    #[test]
    fn test_normalize_imap_date() {
        assert_eq!(
            normalize_imap_date("16-JUL-2025 03:01:03"),
            "16 Jul 2025 03:01:03"
        );
        assert_eq!(
            normalize_imap_date("04 Jan 2024 10:00:00"),
            "04 Jan 2024 10:00:00"
        );
    }
}
