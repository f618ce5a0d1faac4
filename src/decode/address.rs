//! Address-list splitting (RFC 5322 §3.4) with encoded-word decoding.

use super::words::decode_header_value;
use crate::error::Result;
use crate::model::address::EmailAddress;

/// Split raw address-list header values into decoded `(name, address)` pairs.
///
/// All values are parsed as one list, preserving order and duplicates.
/// Handles quoted names, `<angle>` addresses, `(comments)` and groups
/// (`team: a@b.com, c@d.com;`). An empty group yields one empty pair.
///
/// Both the display name and the address go through the encoded-word
/// decoder; some archives encode non-ASCII local parts.
pub fn decode_addresses<S: AsRef<str>>(values: &[S]) -> Result<Vec<EmailAddress>> {
    let joined = values
        .iter()
        .map(|v| v.as_ref())
        .collect::<Vec<_>>()
        .join(", ");

    split_address_list(&joined)
        .into_iter()
        .map(|(name, address)| {
            Ok(EmailAddress::new(
                decode_header_value(&name)?,
                decode_header_value(&address)?,
            ))
        })
        .collect()
}

/// Split an address list into raw `(name, address)` pairs.
///
/// Handles quoted commas: `"Last, First" <a@b.com>, other@c.com`
pub fn split_address_list(raw: &str) -> Vec<(String, String)> {
    let mut results = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut in_angle = false;
    let mut comment_depth = 0usize;
    let mut escaped = false;
    let mut group_members: Option<usize> = None;

    for ch in raw.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes || comment_depth > 0 => {
                current.push(ch);
                escaped = true;
            }
            '"' if comment_depth == 0 => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            '(' if !in_quotes => {
                comment_depth += 1;
                current.push(ch);
            }
            ')' if !in_quotes && comment_depth > 0 => {
                comment_depth -= 1;
                current.push(ch);
            }
            '<' if !in_quotes && comment_depth == 0 => {
                in_angle = true;
                current.push(ch);
            }
            '>' if !in_quotes && comment_depth == 0 => {
                in_angle = false;
                current.push(ch);
            }
            ':' if !in_quotes && !in_angle && comment_depth == 0 && group_members.is_none() => {
                // Group display name is not an address
                current.clear();
                group_members = Some(0);
            }
            ';' if !in_quotes && !in_angle && comment_depth == 0 => {
                if push_entry(&current, &mut results) {
                    group_members = group_members.map(|n| n + 1);
                }
                if group_members == Some(0) {
                    results.push((String::new(), String::new()));
                }
                current.clear();
                group_members = None;
            }
            ',' if !in_quotes && !in_angle && comment_depth == 0 => {
                if push_entry(&current, &mut results) {
                    group_members = group_members.map(|n| n + 1);
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    // Last segment
    push_entry(&current, &mut results);

    results
}

fn push_entry(raw: &str, results: &mut Vec<(String, String)>) -> bool {
    let entry = parse_entry(raw);
    if entry.0.is_empty() && entry.1.is_empty() {
        return false;
    }
    results.push(entry);
    true
}

/// Parse a single mailbox.
///
/// Supported formats:
/// - `"user@domain.com"`
/// - `"<user@domain.com>"`
/// - `"Display Name <user@domain.com>"`
/// - `"\"Display, Name\" <user@domain.com>"`
/// - `"user@domain.com (Display Name)"`
fn parse_entry(raw: &str) -> (String, String) {
    let (without_comments, comment) = strip_comments(raw);
    let trimmed = without_comments.trim();
    if trimmed.is_empty() {
        return (String::new(), String::new());
    }

    // Try "Display Name <address>" or "<address>"
    if let Some(angle_start) = trimmed.rfind('<') {
        if let Some(angle_end) = trimmed.rfind('>') {
            if angle_end > angle_start {
                let address = trimmed[angle_start + 1..angle_end].trim().to_string();
                let mut name = unquote(&trimmed[..angle_start]);
                if name.is_empty() {
                    name = comment.unwrap_or_default();
                }
                return (name, address);
            }
        }
    }

    // Bare address, with an optional comment as display name
    (comment.unwrap_or_default(), unquote(trimmed))
}

/// Remove `(comments)` outside quotes. Returns the rest and the last comment.
fn strip_comments(raw: &str) -> (String, Option<String>) {
    let mut rest = String::with_capacity(raw.len());
    let mut comment = String::new();
    let mut last_comment = None;
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut escaped = false;

    for ch in raw.chars() {
        if escaped {
            if depth > 0 {
                comment.push(ch);
            } else {
                rest.push(ch);
            }
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes || depth > 0 => {
                escaped = true;
                if depth == 0 {
                    rest.push(ch);
                }
            }
            '"' if depth == 0 => {
                in_quotes = !in_quotes;
                rest.push(ch);
            }
            '(' if !in_quotes => {
                if depth > 0 {
                    comment.push(ch);
                }
                depth += 1;
            }
            ')' if !in_quotes && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    let c = comment.trim().to_string();
                    if !c.is_empty() {
                        last_comment = Some(c);
                    }
                    comment.clear();
                    rest.push(' ');
                } else {
                    comment.push(ch);
                }
            }
            _ if depth > 0 => comment.push(ch),
            _ => rest.push(ch),
        }
    }

    (rest, last_comment)
}

/// Strip surrounding double-quotes, resolve backslash escapes, collapse whitespace.
fn unquote(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;
    let mut in_quotes = false;
    for ch in s.trim().chars() {
        if escaped {
            out.push(ch);
            escaped = false;
        } else if ch == '\\' && in_quotes {
            escaped = true;
        } else if ch == '"' {
            in_quotes = !in_quotes;
        } else {
            out.push(ch);
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
