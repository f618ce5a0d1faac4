//! Streaming MBOX parser.
//!
//! Reads MBOX data line-by-line through a large buffer. Never loads the
//! entire archive into memory. Tolerant of malformed input.

use std::io::BufRead;

use tracing::{debug, warn};

use crate::config::MboxConfig;
use crate::error::{MboxError, Result};

/// Progress is reported every 4 MB.
const PROGRESS_INTERVAL: u64 = 4 * 1024 * 1024;

/// Streaming MBOX parser.
///
/// Reads through any buffered source sequentially, invoking a caller-supplied
/// callback for every message it finds. Each message is handed over without
/// its `From ` separator line and without the blank line that precedes the
/// next separator. The parser is tolerant of:
///
/// - Mixed `\n` and `\r\n` line endings
/// - `From ` lines not preceded by a blank line (logs a warning)
/// - Truncated messages at EOF
/// - NUL bytes and other binary content in the body
/// - UTF-8 BOM at the start of the file
/// - Leading garbage before the first separator (skipped)
pub struct MboxParser {
    read_buffer_size: usize,
    max_message_size: usize,
}

impl Default for MboxParser {
    fn default() -> Self {
        Self::new(&MboxConfig::default())
    }
}

impl MboxParser {
    pub fn new(config: &MboxConfig) -> Self {
        Self {
            read_buffer_size: config.read_buffer_size.max(4096),
            max_message_size: config.max_message_size,
        }
    }

    /// Buffer size callers should use when wrapping a raw reader.
    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    /// Parse the full MBOX, calling `message_callback` for each message found.
    ///
    /// The callback receives `(offset, raw_bytes)` and returns `true` to
    /// continue or `false` to abort early. `total_size`, when known, is
    /// passed through to `progress_callback` as `(bytes_read, total)`.
    ///
    /// `label` names the source in I/O errors.
    ///
    /// Returns the number of messages delivered.
    pub fn parse<R: BufRead>(
        &self,
        mut reader: R,
        label: &str,
        total_size: Option<u64>,
        message_callback: &mut dyn FnMut(u64, &[u8]) -> bool,
        progress_callback: Option<&dyn Fn(u64, Option<u64>)>,
    ) -> Result<u64> {
        let mut count: u64 = 0;
        let mut current_offset: u64 = 0;
        let mut message_buf: Vec<u8> = Vec::with_capacity(64 * 1024);
        let mut message_start: Option<u64> = None;
        let mut prev_line_was_empty = true;
        let mut first_line = true;
        let mut truncated = false;
        let mut skipped_preamble: u64 = 0;
        let mut last_progress: u64 = 0;

        // Reusable line buffer
        let mut line_buf: Vec<u8> = Vec::with_capacity(4096);

        loop {
            line_buf.clear();
            // A line longer than the buffer arrives in pieces.
            loop {
                let buf = reader
                    .fill_buf()
                    .map_err(|e| MboxError::io(label, e))?;
                if buf.is_empty() {
                    break;
                }
                let (consume_len, complete) = match memchr_newline(buf) {
                    Some(pos) => (pos + 1, true),
                    None => (buf.len(), false),
                };
                line_buf.extend_from_slice(&buf[..consume_len]);
                reader.consume(consume_len);
                if complete {
                    break;
                }
            }
            if line_buf.is_empty() {
                break; // EOF
            }
            let line_len = line_buf.len() as u64;

            if is_mbox_separator(&line_buf) {
                if !first_line && !prev_line_was_empty {
                    warn!(
                        offset = current_offset,
                        "Found 'From ' separator without preceding blank line"
                    );
                }
                if let Some(start) = message_start {
                    let body = strip_separator_gap(&message_buf, prev_line_was_empty);
                    if !message_callback(start, body) {
                        return Ok(count);
                    }
                    count += 1;
                }
                message_start = Some(current_offset);
                message_buf.clear();
                truncated = false;
            } else if message_start.is_none() {
                skipped_preamble += line_len;
            } else if message_buf.len() + line_buf.len() <= self.max_message_size {
                message_buf.extend_from_slice(&line_buf);
            } else if !truncated {
                // Log once per message
                warn!(
                    offset = message_start,
                    max_size = self.max_message_size,
                    "Message exceeds maximum size, truncating body"
                );
                truncated = true;
            }

            prev_line_was_empty = is_blank_line(&line_buf);
            first_line = false;
            current_offset += line_len;

            if let Some(cb) = progress_callback {
                if current_offset - last_progress >= PROGRESS_INTERVAL {
                    cb(current_offset, total_size);
                    last_progress = current_offset;
                }
            }
        }

        if skipped_preamble > 0 {
            debug!(
                source = label,
                bytes = skipped_preamble,
                "Skipped data before the first 'From ' separator"
            );
        }

        // Flush last message
        if let Some(start) = message_start {
            if message_callback(start, &message_buf) {
                count += 1;
            }
        }

        if let Some(cb) = progress_callback {
            cb(current_offset, total_size);
        }

        Ok(count)
    }
}

/// Drop the blank line that separates a message from the next `From ` line.
fn strip_separator_gap(message: &[u8], ends_with_blank: bool) -> &[u8] {
    if !ends_with_blank {
        return message;
    }
    if let Some(rest) = message.strip_suffix(b"\r\n") {
        rest
    } else if let Some(rest) = message.strip_suffix(b"\n") {
        rest
    } else {
        message
    }
}

/// Fast newline search (equivalent to memchr for `\n`).
#[inline]
fn memchr_newline(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n')
}

/// Check whether a line is an MBOX separator (`From ` at the start).
fn is_mbox_separator(line: &[u8]) -> bool {
    // Skip BOM if present at very start
    let line = line.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(line);
    line.starts_with(b"From ")
}

/// Check whether a line is blank (empty or only whitespace / CR / LF).
fn is_blank_line(line: &[u8]) -> bool {
    line.iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b' ' || b == b'\t')
}
