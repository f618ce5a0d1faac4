//! Content-type sniffing from payload bytes, independent of declared headers.

/// Guesses a MIME type from the leading bytes of a payload.
pub trait ContentSniffer {
    fn sniff(&self, prefix: &[u8]) -> String;
}

/// Any `Fn(&[u8]) -> String` is a sniffer; handy for deterministic tests.
impl<F> ContentSniffer for F
where
    F: Fn(&[u8]) -> String,
{
    fn sniff(&self, prefix: &[u8]) -> String {
        self(prefix)
    }
}

/// Type used for a zero-length payload.
pub const EMPTY_CONTENT_TYPE: &str = "application/x-empty";

/// Magic-number sniffer backed by the shared-mime-info database (`tree_magic`).
#[derive(Debug, Clone, Copy, Default)]
pub struct MagicSniffer;

impl ContentSniffer for MagicSniffer {
    fn sniff(&self, prefix: &[u8]) -> String {
        if prefix.is_empty() {
            return EMPTY_CONTENT_TYPE.to_string();
        }
        tree_magic::from_u8(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_payload() {
        assert_eq!(MagicSniffer.sniff(b""), "application/x-empty");
    }

    #[test]
    fn test_png_magic() {
        let png = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01\x08\x06\0\0\0";
        assert_eq!(MagicSniffer.sniff(png), "image/png");
    }

    #[test]
    fn test_plain_text_is_text() {
        assert!(MagicSniffer.sniff(b"hello, this is a plain text body\n").starts_with("text/"));
    }

    #[test]
    fn test_closure_sniffer() {
        let fixed = |_: &[u8]| "text/csv".to_string();
        assert_eq!(fixed.sniff(b"a,b"), "text/csv");
    }
}
