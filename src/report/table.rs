//! Payload classification table built from a payload-type dump.

use std::io::Write;

use crate::model::feature::{FeatureTuple, SimplifiedFeatures};
use crate::stats::keys::from_key_string;
use crate::stats::FrequencyTable;

use super::dump::PayloadDump;

/// Column titles, in [`SimplifiedFeatures::cells`] order plus the count.
pub const COLUMNS: [&str; 9] = [
    "Has payload?",
    "Is multipart",
    "Has parts",
    "Content disposition",
    "Has encoding?",
    "Content type (MIME)",
    "Detected Content type (MIME)",
    "Has filename?",
    "Freq",
];

/// Re-aggregate a payload dump with charset and filename reduced to flags.
pub fn payload_table(dump: &PayloadDump) -> crate::error::Result<FrequencyTable<SimplifiedFeatures>> {
    let mut table = FrequencyTable::new();
    for (key, &count) in dump {
        let tuple: FeatureTuple = from_key_string(key)?;
        table.add(tuple.simplified(), count);
    }
    Ok(table)
}

/// Tab-separated table, most frequent rows first.
pub fn write_payload_table(
    out: &mut dyn Write,
    table: &FrequencyTable<SimplifiedFeatures>,
) -> anyhow::Result<()> {
    writeln!(out, "{}", COLUMNS.join("\t"))?;
    for (features, count) in table.most_common() {
        writeln!(out, "{}\t{count}", features.cells().join("\t"))?;
    }
    Ok(())
}
