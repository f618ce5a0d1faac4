//! Decoding primitives: charset fallback, RFC 2047 encoded-words, and address lists.

pub mod address;
pub mod charset;
pub mod words;

pub use address::decode_addresses;
pub use charset::decode_with_fallback;
pub use words::decode_header_value;
