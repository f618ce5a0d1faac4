//! Classifier output: one record per text-bearing or attached leaf.

use serde::{Deserialize, Serialize};

/// Literal tag used as the kind of attachment records.
pub const ATTACHMENT_KIND: &str = "attachment";

/// What a [`ContentRecord`] carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    /// The content is an attachment's filename.
    Attachment,
    /// The content is decoded text of the given declared MIME type.
    Declared(String),
}

impl ContentKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Attachment => ATTACHMENT_KIND,
            Self::Declared(content_type) => content_type,
        }
    }
}

impl From<String> for ContentKind {
    fn from(s: String) -> Self {
        if s == ATTACHMENT_KIND {
            Self::Attachment
        } else {
            Self::Declared(s)
        }
    }
}

/// A `(content_kind, content)` pair, serialized as a two-element array.
///
/// # Examples
/// - `("text/plain", "hello")`
/// - `("attachment", "report.pdf")`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "(String, String)", from = "(String, String)")]
pub struct ContentRecord {
    pub kind: ContentKind,
    pub content: String,
}

impl ContentRecord {
    /// Record for a named part.
    pub fn attachment(filename: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::Attachment,
            content: filename.into(),
        }
    }

    /// Record for a decoded text part.
    pub fn text(content_type: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::Declared(content_type.into()),
            content: content.into(),
        }
    }
}

impl From<ContentRecord> for (String, String) {
    fn from(record: ContentRecord) -> Self {
        let kind = match record.kind {
            ContentKind::Attachment => ATTACHMENT_KIND.to_string(),
            ContentKind::Declared(content_type) => content_type,
        };
        (kind, record.content)
    }
}

impl From<(String, String)> for ContentRecord {
    fn from((kind, content): (String, String)) -> Self {
        Self {
            kind: kind.into(),
            content,
        }
    }
}
