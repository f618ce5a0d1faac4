//! Frequency aggregation over a whole archive.

pub mod aggregator;
pub mod keys;
pub mod table;

pub use aggregator::{Aggregator, BadHeader};
pub use table::FrequencyTable;
