//! Decoded address pair (RFC 5322 §3.4).

use serde::{Deserialize, Serialize};

/// A decoded `(display-name, address)` pair.
///
/// # Examples
/// - `"Juan García <juan@ejemplo.com>"` → `display_name = "Juan García"`, `address = "juan@ejemplo.com"`
/// - `"user@example.com"` → `display_name = ""`, `address = "user@example.com"`
///
/// Serialized as a two-element array so address lists nest as `[[name, addr], ...]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "(String, String)", from = "(String, String)")]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare email address (`user@domain`, may be empty for bare groups).
    pub address: String,
}

impl EmailAddress {
    pub fn new(display_name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            address: address.into(),
        }
    }
}

impl From<EmailAddress> for (String, String) {
    fn from(a: EmailAddress) -> Self {
        (a.display_name, a.address)
    }
}

impl From<(String, String)> for EmailAddress {
    fn from((display_name, address): (String, String)) -> Self {
        Self {
            display_name,
            address,
        }
    }
}
