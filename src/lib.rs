//! `mboxstat`: statistical summaries of MBOX archives.
//!
//! This crate provides the core library for splitting MBOX files, building
//! MIME part trees, classifying parts into text and attachments, and
//! aggregating header and payload frequencies across a whole archive.

pub mod classify;
pub mod config;
pub mod decode;
pub mod error;
pub mod model;
pub mod parser;
pub mod report;
pub mod scan;
pub mod sniff;
pub mod stats;
