//! Email parsing: MBOX streaming, archive opening, header decoding, and MIME tree construction.

pub mod archive;
pub mod header;
pub mod mbox;
pub mod mime;
