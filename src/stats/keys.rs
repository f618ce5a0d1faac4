//! Composite keys as scalar strings.
//!
//! JSON objects only allow string keys, so tuple keys are stored as the JSON
//! text of the tuple itself. The text uses `", "` and `": "` separators,
//! so keys in existing dumps of this format match byte for byte.

use std::io;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::Formatter;

use crate::error::{MboxError, Result};

/// Compact JSON with a space after every `,` and `:`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

/// Serialize `value` to a single-line JSON string with spaced separators.
pub fn to_key_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buf = Vec::with_capacity(64);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    value.serialize(&mut serializer)?;
    // serde_json only ever writes UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Restore a key written by [`to_key_string`] (or any JSON text).
pub fn from_key_string<T: DeserializeOwned>(key: &str) -> Result<T> {
    serde_json::from_str(key).map_err(|e| MboxError::InvalidKey {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::feature::FeatureTuple;

    #[test]
    fn test_spaced_separators() {
        let key = (true, None::<String>, "text/plain".to_string(), 3u32);
        assert_eq!(
            to_key_string(&key).unwrap(),
            r#"[true, null, "text/plain", 3]"#
        );
    }

    #[test]
    fn test_feature_tuple_round_trip() {
        let tuple = FeatureTuple {
            has_payload: true,
            is_container: false,
            has_sub_parts: false,
            content_disposition: Some("inline".into()),
            declared_charset: None,
            declared_content_type: "image/png".into(),
            sniffed_content_type: Some("image/png".into()),
            filename: Some("Jörg \"x\".png".into()),
        };
        let key = to_key_string(&tuple).unwrap();
        assert!(key.contains("Jörg"));
        let restored: FeatureTuple = from_key_string(&key).unwrap();
        assert_eq!(restored, tuple);
    }

    #[test]
    fn test_strings_stay_strings() {
        let key = to_key_string(&("true".to_string(), true)).unwrap();
        let restored: (String, bool) = from_key_string(&key).unwrap();
        assert_eq!(restored, ("true".to_string(), true));
    }

    #[test]
    fn test_compact_input_accepted() {
        let restored: (bool, String) = from_key_string(r#"[false,"a"]"#).unwrap();
        assert_eq!(restored, (false, "a".to_string()));
    }

    #[test]
    fn test_invalid_key() {
        let err = from_key_string::<(bool, String)>("[1, 2").unwrap_err();
        assert!(matches!(err, MboxError::InvalidKey { .. }));
    }
}
