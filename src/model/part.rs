//! The MIME part tree handed to the classifier.
//!
//! Trees are built once per message by [`crate::parser::mime`] and are
//! read-only afterwards.

/// Declared metadata of one part, already separated from its headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartMeta {
    /// Lowercase `type/subtype`. Defaults to `text/plain`.
    pub content_type: String,
    /// Lowercase `charset` parameter, if declared.
    pub charset: Option<String>,
    /// Lowercase disposition type (`inline`, `attachment`, ...).
    pub disposition: Option<String>,
    /// MIME-decoded filename from the disposition or content-type parameters.
    pub filename: Option<String>,
}

impl Default for PartMeta {
    fn default() -> Self {
        Self {
            content_type: "text/plain".to_string(),
            charset: None,
            disposition: None,
            filename: None,
        }
    }
}

/// A node of a message's content tree.
///
/// A container never carries a payload of its own, and a leaf never has
/// children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagePart {
    /// `multipart/*` or an embedded `message/rfc822`.
    Container {
        meta: PartMeta,
        children: Vec<MessagePart>,
    },
    /// A part carrying payload bytes (transfer encoding already undone).
    Leaf { meta: PartMeta, payload: Vec<u8> },
}

impl MessagePart {
    /// Build a leaf part.
    pub fn leaf(meta: PartMeta, payload: impl Into<Vec<u8>>) -> Self {
        Self::Leaf {
            meta,
            payload: payload.into(),
        }
    }

    /// Build a container part.
    pub fn container(meta: PartMeta, children: Vec<MessagePart>) -> Self {
        Self::Container { meta, children }
    }

    pub fn meta(&self) -> &PartMeta {
        match self {
            Self::Container { meta, .. } | Self::Leaf { meta, .. } => meta,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Self::Container { .. })
    }

    /// Payload bytes of a leaf; `None` for containers.
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Self::Leaf { payload, .. } => Some(payload),
            Self::Container { .. } => None,
        }
    }

    /// Sub-parts of a container; empty for leaves.
    pub fn children(&self) -> &[MessagePart] {
        match self {
            Self::Container { children, .. } => children,
            Self::Leaf { .. } => &[],
        }
    }

    /// Number of nodes in this subtree, the node itself included.
    pub fn count_parts(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(MessagePart::count_parts)
            .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_meta() -> PartMeta {
        PartMeta {
            charset: Some("utf-8".into()),
            ..PartMeta::default()
        }
    }

    #[test]
    fn test_default_meta_is_text_plain() {
        let meta = PartMeta::default();
        assert_eq!(meta.content_type, "text/plain");
        assert!(meta.charset.is_none());
    }

    #[test]
    fn test_leaf_accessors() {
        let leaf = MessagePart::leaf(text_meta(), b"hello".to_vec());
        assert!(!leaf.is_container());
        assert_eq!(leaf.payload(), Some(&b"hello"[..]));
        assert!(leaf.children().is_empty());
        assert_eq!(leaf.count_parts(), 1);
    }

    #[test]
    fn test_nested_count_parts() {
        let inner = MessagePart::container(
            PartMeta {
                content_type: "multipart/alternative".into(),
                ..PartMeta::default()
            },
            vec![
                MessagePart::leaf(text_meta(), b"a".to_vec()),
                MessagePart::leaf(text_meta(), b"b".to_vec()),
            ],
        );
        let outer = MessagePart::container(
            PartMeta {
                content_type: "multipart/mixed".into(),
                ..PartMeta::default()
            },
            vec![inner, MessagePart::leaf(text_meta(), b"c".to_vec())],
        );
        assert!(outer.is_container());
        assert!(outer.payload().is_none());
        assert_eq!(outer.count_parts(), 5);
    }
}
