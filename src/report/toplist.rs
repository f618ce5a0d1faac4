//! Text toplists of header names and their case variants.

use std::io::Write;

use crate::stats::Aggregator;

/// `Metadata (lowercased) toplist:` followed by `name: total` lines.
pub fn write_header_toplist(out: &mut dyn Write, aggregator: &Aggregator) -> anyhow::Result<()> {
    writeln!(out, "Metadata (lowercased) toplist:")?;
    for (name, total) in aggregator.header_toplist() {
        writeln!(out, "{name}: {total}")?;
    }
    Ok(())
}

/// `Metadata (case variants) toplist:` followed by `lower\tvariant\tcount`
/// lines, grouped by lowercased name.
pub fn write_case_variants(out: &mut dyn Write, aggregator: &Aggregator) -> anyhow::Result<()> {
    writeln!(out, "Metadata (case variants) toplist:")?;
    for group in aggregator.variant_groups() {
        for (variant, count) in group.entries {
            writeln!(out, "{}\t{variant}\t{count}", group.name)?;
        }
    }
    Ok(())
}
