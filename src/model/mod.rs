//! Core data model: the MIME part tree, classifier output, and aggregation keys.

pub mod address;
pub mod feature;
pub mod header;
pub mod part;
pub mod record;
