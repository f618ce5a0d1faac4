//! Per-part observation record used for payload statistics.

use serde::{Deserialize, Serialize};

use super::part::MessagePart;

/// Positional form of a [`FeatureTuple`]. Field order is part of the dump format.
pub type FeatureArray = (
    bool,
    bool,
    bool,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
);

/// Fixed 8-field description of one visited part.
///
/// Serialized as an 8-element JSON array in declaration order, so dumps
/// written by different runs stay comparable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "FeatureArray", from = "FeatureArray")]
pub struct FeatureTuple {
    pub has_payload: bool,
    pub is_container: bool,
    pub has_sub_parts: bool,
    pub content_disposition: Option<String>,
    pub declared_charset: Option<String>,
    pub declared_content_type: String,
    pub sniffed_content_type: Option<String>,
    pub filename: Option<String>,
}

impl FeatureTuple {
    /// Describe `part`, given the sniffed type of its payload (if any).
    pub fn observe(part: &MessagePart, sniffed_content_type: Option<String>) -> Self {
        let meta = part.meta();
        Self {
            has_payload: part.payload().is_some(),
            is_container: part.is_container(),
            has_sub_parts: !part.children().is_empty(),
            content_disposition: meta.disposition.clone(),
            declared_charset: meta.charset.clone(),
            declared_content_type: meta.content_type.clone(),
            sniffed_content_type,
            filename: meta.filename.clone(),
        }
    }

    /// Collapse the charset and filename fields to "is present" flags.
    ///
    /// Used by the payload classification table, where the actual charset
    /// and filename values would only fragment the counts.
    pub fn simplified(&self) -> SimplifiedFeatures {
        SimplifiedFeatures {
            has_payload: self.has_payload,
            is_container: self.is_container,
            has_sub_parts: self.has_sub_parts,
            content_disposition: self.content_disposition.clone(),
            has_charset: self.declared_charset.is_some(),
            declared_content_type: self.declared_content_type.clone(),
            sniffed_content_type: self.sniffed_content_type.clone(),
            has_filename: self.filename.is_some(),
        }
    }
}

impl From<FeatureTuple> for FeatureArray {
    fn from(t: FeatureTuple) -> Self {
        (
            t.has_payload,
            t.is_container,
            t.has_sub_parts,
            t.content_disposition,
            t.declared_charset,
            t.declared_content_type,
            t.sniffed_content_type,
            t.filename,
        )
    }
}

impl From<FeatureArray> for FeatureTuple {
    fn from(a: FeatureArray) -> Self {
        Self {
            has_payload: a.0,
            is_container: a.1,
            has_sub_parts: a.2,
            content_disposition: a.3,
            declared_charset: a.4,
            declared_content_type: a.5,
            sniffed_content_type: a.6,
            filename: a.7,
        }
    }
}

/// [`FeatureTuple`] with charset and filename reduced to booleans.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimplifiedFeatures {
    pub has_payload: bool,
    pub is_container: bool,
    pub has_sub_parts: bool,
    pub content_disposition: Option<String>,
    pub has_charset: bool,
    pub declared_content_type: String,
    pub sniffed_content_type: Option<String>,
    pub has_filename: bool,
}

impl SimplifiedFeatures {
    /// Table cells in column order. Absent values print as `None`.
    pub fn cells(&self) -> [String; 8] {
        fn opt(v: &Option<String>) -> String {
            v.clone().unwrap_or_else(|| "None".to_string())
        }
        [
            title_bool(self.has_payload),
            title_bool(self.is_container),
            title_bool(self.has_sub_parts),
            opt(&self.content_disposition),
            title_bool(self.has_charset),
            self.declared_content_type.clone(),
            opt(&self.sniffed_content_type),
            title_bool(self.has_filename),
        ]
    }
}

fn title_bool(b: bool) -> String {
    let s = if b { "True" } else { "False" };
    s.to_string()
}
