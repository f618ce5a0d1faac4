//! MIME message parsing: raw RFC 5322 bytes to a [`MessagePart`] tree.
//!
//! Structure, parameters and transfer encodings come from `mailparse`. The
//! tree keeps the transfer-decoded payload bytes of every leaf, with no
//! charset applied, which is what the classifier needs for content sniffing
//! and charset decoding.

use mailparse::{DispositionType, MailHeaderMap, ParsedMail};
use tracing::{debug, warn};

use super::header::{decode_header_bytes, parse_header_block, split_header_body, RawHeader};
use crate::decode::words::decode_header_value;
use crate::model::part::{MessagePart, PartMeta};

/// Default content type of a part without (or with an unusable) `Content-Type`.
const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// A parsed message: its top-level header fields and its content tree.
#[derive(Debug, Clone)]
pub struct ParsedMessage {
    /// Top-level header fields in their original order.
    pub headers: Vec<RawHeader>,
    /// Root of the content tree.
    pub root: MessagePart,
}

/// Parse a complete raw message (headers + body) into headers and part tree.
///
/// Never fails: malformed structure degrades to leaves.
pub fn parse_message(raw_message: &[u8], max_depth: usize) -> ParsedMessage {
    // Strip the leading "From " separator line if present
    let message_bytes = skip_from_line(raw_message);
    let (header_bytes, _) = split_header_body(message_bytes);
    let headers = parse_header_block(&decode_header_bytes(header_bytes));
    let root = parse_entity(message_bytes, 0, max_depth, DEFAULT_CONTENT_TYPE);
    ParsedMessage { headers, root }
}

/// Parse one entity, degrading to a leaf over its raw body when `mailparse`
/// rejects it.
fn parse_entity(data: &[u8], depth: usize, max_depth: usize, default_type: &str) -> MessagePart {
    match mailparse::parse_mail(data) {
        Ok(mail) => build_part(&mail, depth, max_depth, default_type),
        Err(e) => {
            warn!(error = %e, "Unparseable MIME entity, keeping its body as a leaf");
            let meta = PartMeta {
                content_type: default_type.to_string(),
                ..PartMeta::default()
            };
            MessagePart::leaf(meta, split_header_body(data).1)
        }
    }
}

fn build_part(
    mail: &ParsedMail<'_>,
    depth: usize,
    max_depth: usize,
    default_type: &str,
) -> MessagePart {
    let meta = part_meta(mail, default_type);

    if depth < max_depth {
        if let Some(part) = build_composite(mail, &meta, depth, max_depth) {
            return part;
        }
    } else if meta.content_type.starts_with("multipart/") {
        warn!(depth, "MIME nesting too deep, keeping multipart as a leaf");
    }

    MessagePart::leaf(meta, body_bytes(mail))
}

/// Build a container for `multipart/*` and `message/*`, if the body allows one.
fn build_composite(
    mail: &ParsedMail<'_>,
    meta: &PartMeta,
    depth: usize,
    max_depth: usize,
) -> Option<MessagePart> {
    let content_type = meta.content_type.as_str();

    if content_type.starts_with("multipart/") {
        if mail.subparts.is_empty() {
            debug!(content_type, "No body part found, keeping multipart as a leaf");
            return None;
        }
        let child_default = if content_type == "multipart/digest" {
            "message/rfc822"
        } else {
            DEFAULT_CONTENT_TYPE
        };
        let children = mail
            .subparts
            .iter()
            .map(|sub| build_part(sub, depth + 1, max_depth, child_default))
            .collect();
        return Some(MessagePart::container(meta.clone(), children));
    }

    if content_type == "message/delivery-status" {
        // One header block per recipient
        let body = body_bytes(mail);
        let children = split_header_blocks(&body)
            .into_iter()
            .map(|block| parse_entity(block, depth + 1, max_depth, DEFAULT_CONTENT_TYPE))
            .collect::<Vec<_>>();
        if children.is_empty() {
            return None;
        }
        return Some(MessagePart::container(meta.clone(), children));
    }

    if content_type.starts_with("message/") {
        let body = body_bytes(mail);
        let embedded = parse_entity(&body, depth + 1, max_depth, DEFAULT_CONTENT_TYPE);
        return Some(MessagePart::container(meta.clone(), vec![embedded]));
    }

    None
}

/// Separate the declared metadata from a part's header fields.
fn part_meta(mail: &ParsedMail<'_>, default_type: &str) -> PartMeta {
    let declared = mail.headers.get_first_value("Content-Type").is_some();
    let mimetype = mail.ctype.mimetype.trim().to_lowercase();

    let content_type = if !declared {
        default_type.to_string()
    } else if mimetype.matches('/').count() == 1 {
        mimetype
    } else {
        DEFAULT_CONTENT_TYPE.to_string()
    };

    // `ctype.charset` defaults to us-ascii; only a declared parameter counts
    let charset = mail
        .ctype
        .params
        .get("charset")
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty());

    let disposition = mail
        .headers
        .get_first_value("Content-Disposition")
        .map(|_| mail.get_content_disposition());

    let raw_filename = disposition
        .as_ref()
        .and_then(|d| d.params.get("filename"))
        .or_else(|| mail.ctype.params.get("name"))
        .map(|f| f.trim())
        .filter(|f| !f.is_empty());

    // RFC 2231 values arrive decoded; only encoded-words are left to undo
    let filename = raw_filename.map(|raw| match decode_header_value(raw) {
        Ok(decoded) => decoded,
        Err(_) if !raw.contains("=?") => raw.to_string(),
        Err(e) => {
            warn!(filename = raw, error = %e, "Could not decode filename, keeping it raw");
            raw.to_string()
        }
    });

    PartMeta {
        content_type,
        charset,
        disposition: disposition
            .map(|d| disposition_name(&d.disposition))
            .filter(|d| !d.is_empty()),
        filename,
    }
}

fn disposition_name(disposition: &DispositionType) -> String {
    match disposition {
        DispositionType::Inline => "inline".to_string(),
        DispositionType::Attachment => "attachment".to_string(),
        DispositionType::FormData => "form-data".to_string(),
        DispositionType::Extension(other) => other.trim().to_lowercase(),
    }
}

/// Transfer-decoded body. A body that fails to decode is kept as it is.
fn body_bytes(mail: &ParsedMail<'_>) -> Vec<u8> {
    match mail.get_body_raw() {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "Undecodable transfer encoding, keeping raw body");
            split_header_body(mail.raw_bytes).1.to_vec()
        }
    }
}

/// Split a body into header blocks separated by blank lines.
fn split_header_blocks(body: &[u8]) -> Vec<&[u8]> {
    let mut blocks = Vec::new();
    let mut rest = body;
    while !rest.is_empty() {
        let (block, after) = split_header_body(rest);
        if !block.is_empty() {
            blocks.push(block);
        }
        if after.len() == rest.len() {
            break;
        }
        rest = after;
    }
    blocks
}

/// Skip the `From ` separator line at the start of MBOX messages.
fn skip_from_line(data: &[u8]) -> &[u8] {
    // Handle BOM
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);

    if data.starts_with(b"From ") {
        // Find end of line
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &[u8]) -> ParsedMessage {
        parse_message(raw, 32)
    }

    #[test]
    fn test_skip_from_line() {
        let data = b"From user@example.com Thu Jan 01 00:00:00 2024\nSubject: Test\n\nBody\n";
        let result = skip_from_line(data);
        assert!(result.starts_with(b"Subject:"));
    }

    #[test]
    fn test_skip_from_line_no_from() {
        let data = b"Subject: Test\n\nBody\n";
        assert_eq!(skip_from_line(data), data);
    }

    #[test]
    fn test_simple_message_defaults_to_text_plain() {
        let msg = parse(b"Subject: Hi\nFrom: a@b.com\n\nHello\n");
        assert_eq!(msg.headers.len(), 2);
        assert_eq!(msg.headers[0].name, "Subject");
        let meta = msg.root.meta();
        assert_eq!(meta.content_type, "text/plain");
        assert_eq!(meta.charset, None);
        assert_eq!(msg.root.payload(), Some(&b"Hello\n"[..]));
    }

    #[test]
    fn test_charset_lowercased() {
        let msg = parse(b"Content-Type: text/plain; charset=\"UTF-8\"\n\nx");
        assert_eq!(msg.root.meta().charset.as_deref(), Some("utf-8"));
    }

    #[test]
    fn test_malformed_content_type_falls_back() {
        let msg = parse(b"Content-Type: garbage\n\nx");
        assert_eq!(msg.root.meta().content_type, "text/plain");
    }

    #[test]
    fn test_multipart_alternative() {
        let raw = b"Content-Type: multipart/alternative; boundary=\"XX\"\n\
\n\
preamble\n\
--XX\n\
Content-Type: text/plain; charset=utf-8\n\
\n\
plain body\n\
--XX\n\
Content-Type: text/html; charset=utf-8\n\
\n\
<p>html</p>\n\
--XX--\n\
epilogue\n";
        let msg = parse(raw);
        assert!(msg.root.is_container());
        let children = msg.root.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].payload(), Some(&b"plain body"[..]));
        assert_eq!(children[1].meta().content_type, "text/html");
        assert_eq!(children[1].payload(), Some(&b"<p>html</p>"[..]));
    }

    #[test]
    fn test_multipart_without_delimiters_is_leaf() {
        let msg = parse(b"Content-Type: multipart/mixed; boundary=ZZ\n\nno parts here\n");
        assert!(!msg.root.is_container());
        assert_eq!(msg.root.meta().content_type, "multipart/mixed");
    }

    #[test]
    fn test_multipart_without_boundary_is_leaf() {
        let msg = parse(b"Content-Type: multipart/mixed\n\n--x\n\nbody\n");
        assert!(!msg.root.is_container());
    }

    #[test]
    fn test_unterminated_multipart_runs_to_end() {
        let raw = b"Content-Type: multipart/mixed; boundary=B\n\n--B\n\nfirst\n--B\n\nsecond\n";
        let msg = parse(raw);
        let children = msg.root.children();
        assert_eq!(children.len(), 2);
        let last = children[1].payload().unwrap();
        assert_eq!(last.trim_ascii_end(), b"second");
    }

    #[test]
    fn test_attachment_filename_and_base64() {
        let raw = b"Content-Type: multipart/mixed; boundary=B\n\
\n\
--B\n\
Content-Type: application/pdf; name=\"ignored.pdf\"\n\
Content-Disposition: attachment; filename=\"=?UTF-8?B?SsO2cmcucGRm?=\"\n\
Content-Transfer-Encoding: base64\n\
\n\
SGVs\n\
bG8=\n\
--B--\n";
        let msg = parse(raw);
        let part = &msg.root.children()[0];
        let meta = part.meta();
        assert_eq!(meta.disposition.as_deref(), Some("attachment"));
        assert_eq!(meta.filename.as_deref(), Some("Jörg.pdf"));
        assert_eq!(part.payload(), Some(&b"Hello"[..]));
    }

    #[test]
    fn test_name_parameter_used_without_disposition() {
        let msg = parse(b"Content-Type: image/png; name=logo.png\n\n...");
        assert_eq!(msg.root.meta().filename.as_deref(), Some("logo.png"));
        assert_eq!(msg.root.meta().disposition, None);
    }

    #[test]
    fn test_embedded_message_is_container_with_one_child() {
        let raw = b"Content-Type: message/rfc822\n\
\n\
Subject: inner\n\
Content-Type: text/plain; charset=us-ascii\n\
\n\
inner body\n";
        let msg = parse(raw);
        assert!(msg.root.is_container());
        let children = msg.root.children();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].meta().charset.as_deref(), Some("us-ascii"));
        assert_eq!(children[0].payload(), Some(&b"inner body\n"[..]));
    }

    #[test]
    fn test_delivery_status_blocks() {
        let raw = b"Content-Type: message/delivery-status\n\
\n\
Reporting-MTA: dns; mx.example.com\n\
\n\
Final-Recipient: rfc822; a@b.com\n\
Action: failed\n";
        let msg = parse(raw);
        assert_eq!(msg.root.children().len(), 2);
    }

    #[test]
    fn test_depth_limit_degrades_to_leaf() {
        let raw = b"Content-Type: multipart/mixed; boundary=A\n\n--A\nContent-Type: multipart/mixed; boundary=B\n\n--B\n\nx\n--B--\n--A--\n";
        let msg = parse_message(raw, 1);
        let child = &msg.root.children()[0];
        assert!(!child.is_container());
        assert_eq!(child.meta().content_type, "multipart/mixed");
    }

    #[test]
    fn test_quoted_printable_leaf_keeps_charset_bytes() {
        let raw = b"Content-Type: text/plain; charset=iso-8859-1\n\
Content-Transfer-Encoding: quoted-printable\n\
\n\
caf=E9 soft=\nbreak";
        let msg = parse(raw);
        assert_eq!(msg.root.payload(), Some(&b"caf\xe9 softbreak"[..]));
    }

    #[test]
    fn test_rfc2231_filename() {
        let raw = b"Content-Type: application/octet-stream\n\
Content-Disposition: attachment; filename*=UTF-8''J%C3%B6rg.pdf\n\
\n\
x";
        let msg = parse(raw);
        assert_eq!(msg.root.meta().filename.as_deref(), Some("J\u{f6}rg.pdf"));
    }

    #[test]
    fn test_missing_disposition_is_none() {
        let msg = parse(b"Content-Type: text/plain; charset=utf-8\n\nx");
        assert_eq!(msg.root.meta().disposition, None);
    }

    #[test]
    fn test_digest_children_default_to_embedded_messages() {
        let raw = b"Content-Type: multipart/digest; boundary=D\n\
\n\
--D\n\
\n\
Subject: first\n\
\n\
digest body\n\
--D--\n";
        let msg = parse(raw);
        let child = &msg.root.children()[0];
        assert_eq!(child.meta().content_type, "message/rfc822");
        assert!(child.is_container());
    }
}
