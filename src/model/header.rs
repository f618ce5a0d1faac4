//! Decoded values of one header name within one message.

use serde::{Deserialize, Serialize};

use super::address::EmailAddress;
use crate::error::{MboxError, Result};

/// Lowercased header names whose values are address lists.
pub const ADDRESS_HEADERS: &[&str] = &[
    "to",
    "from",
    "cc",
    "bcc",
    "delivered-to",
    "reply-to",
    "sender",
];

/// Whether `lower_name` is decoded with the address decoder.
pub fn is_address_header(lower_name: &str) -> bool {
    ADDRESS_HEADERS.contains(&lower_name)
}

/// All values of a header in one message, in order of appearance.
///
/// Serialized as a JSON array: strings for [`HeaderValues::Text`],
/// `[name, address]` pairs for [`HeaderValues::Addresses`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValues {
    Text(Vec<String>),
    Addresses(Vec<EmailAddress>),
}

impl HeaderValues {
    /// Restore values serialized for the header `lower_name`.
    ///
    /// An empty list is ambiguous on its own; the header name picks the variant.
    pub fn from_key_string(lower_name: &str, key: &str) -> Result<Self> {
        let invalid = |e: serde_json::Error| MboxError::InvalidKey {
            key: key.to_string(),
            reason: e.to_string(),
        };
        if is_address_header(lower_name) {
            serde_json::from_str::<Vec<EmailAddress>>(key)
                .map(Self::Addresses)
                .map_err(invalid)
        } else {
            serde_json::from_str::<Vec<String>>(key)
                .map(Self::Text)
                .map_err(invalid)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Text(v) => v.len(),
            Self::Addresses(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_serialization() {
        let v = HeaderValues::Text(vec!["Hello".into(), "World".into()]);
        assert_eq!(serde_json::to_string(&v).unwrap(), r#"["Hello","World"]"#);
    }

    #[test]
    fn test_address_serialization() {
        let v = HeaderValues::Addresses(vec![EmailAddress::new("Ann", "ann@example.com")]);
        assert_eq!(
            serde_json::to_string(&v).unwrap(),
            r#"[["Ann","ann@example.com"]]"#
        );
    }

    #[test]
    fn test_from_key_string_uses_header_name() {
        let empty_to = HeaderValues::from_key_string("to", "[]").unwrap();
        assert_eq!(empty_to, HeaderValues::Addresses(vec![]));
        let empty_subject = HeaderValues::from_key_string("subject", "[]").unwrap();
        assert_eq!(empty_subject, HeaderValues::Text(vec![]));
        assert!(empty_subject.is_empty());
    }

    #[test]
    fn test_from_key_string_rejects_mismatch() {
        let err = HeaderValues::from_key_string("subject", r#"[["a","b"]]"#).unwrap_err();
        assert!(matches!(err, MboxError::InvalidKey { .. }));
    }
}
