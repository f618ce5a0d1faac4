//! Looking up one header in a header dump, and the address → display-name
//! variants derived from it.

use std::collections::HashMap;
use std::io::Write;

use crate::error::MboxError;
use crate::model::header::HeaderValues;
use crate::stats::keys::to_key_string;
use crate::stats::FrequencyTable;

use super::dump::HeaderDump;

/// The values recorded for `header`, most frequent first.
///
/// Line breaks inside text values are collapsed to a single space.
///
/// # Errors
///
/// [`MboxError::NoSuchHeader`] if the dump has no entry for `header`, and
/// [`MboxError::InvalidKey`] for a value key that does not parse.
pub fn grep_header(dump: &HeaderDump, header: &str) -> crate::error::Result<Vec<(HeaderValues, u64)>> {
    let header = header_name(header);
    let values = dump
        .get(header)
        .ok_or_else(|| MboxError::NoSuchHeader(header.to_string()))?;

    let mut table = FrequencyTable::new();
    for (key, &count) in values {
        let parsed = match HeaderValues::from_key_string(header, key)? {
            HeaderValues::Text(texts) => {
                HeaderValues::Text(texts.iter().map(|t| remove_newlines(t)).collect())
            }
            addresses => addresses,
        };
        table.add(parsed, count);
    }

    Ok(table
        .most_common()
        .into_iter()
        .map(|(values, count)| (values.clone(), count))
        .collect())
}

/// A header name given on the command line, without surrounding quotes.
pub fn header_name(arg: &str) -> &str {
    arg.trim_matches('"').trim_matches('\'')
}

/// Header name, then one `\tcount\tvalues` line per distinct value list.
pub fn write_grep(out: &mut dyn Write, header: &str, rows: &[(HeaderValues, u64)]) -> anyhow::Result<()> {
    writeln!(out, "{}", header_name(header))?;
    for (values, count) in rows {
        writeln!(out, "\t{count}\t{}", to_key_string(values)?)?;
    }
    Ok(())
}

/// Replace every line break, with the blanks around it, by one space.
pub fn remove_newlines(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\r' && c != '\n' {
            out.push(c);
            continue;
        }
        if c == '\r' && chars.peek() == Some(&'\n') {
            chars.next();
        }
        let kept = out.trim_end_matches([' ', '\t']).len();
        out.truncate(kept);
        while matches!(chars.peek(), Some(' ' | '\t')) {
            chars.next();
        }
        out.push(' ');
    }
    out
}

/// Display names seen for one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameVariants {
    pub address: String,
    pub names: FrequencyTable<String>,
}

/// Fold address-list rows into address → display name → count, weighting
/// each pair by the frequency of the row it came from.
///
/// Addresses are ordered by total descending, ties by address ascending.
pub fn name_variants(rows: &[(HeaderValues, u64)]) -> Vec<NameVariants> {
    let mut by_address: HashMap<&str, FrequencyTable<String>> = HashMap::new();
    for (values, count) in rows {
        if let HeaderValues::Addresses(addresses) = values {
            for addr in addresses {
                by_address
                    .entry(addr.address.as_str())
                    .or_default()
                    .add(addr.display_name.clone(), *count);
            }
        }
    }

    let mut result: Vec<NameVariants> = by_address
        .into_iter()
        .map(|(address, names)| NameVariants {
            address: address.to_string(),
            names,
        })
        .collect();
    result.sort_by(|a, b| {
        b.names
            .total()
            .cmp(&a.names.total())
            .then_with(|| a.address.cmp(&b.address))
    });
    result
}

/// `address\ttotal`, then one `\tname\tcount` line per display name.
pub fn write_name_variants(out: &mut dyn Write, variants: &[NameVariants]) -> anyhow::Result<()> {
    for entry in variants {
        writeln!(out, "{}\t{}", entry.address, entry.names.total())?;
        for (name, count) in entry.names.most_common() {
            writeln!(out, "\t{name}\t{count}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::address::EmailAddress;

    fn dump() -> HeaderDump {
        serde_json::from_str(
            r#"{
                "subject": {"[\"Hello\\n\\tworld\"]": 2, "[\"Other\"]": 5},
                "to": {
                    "[[\"Ann\", \"ann@example.com\"]]": 3,
                    "[[\"Annie\", \"ann@example.com\"], [\"\", \"bob@example.com\"]]": 1
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_grep_orders_and_collapses_newlines() {
        let rows = grep_header(&dump(), "subject").unwrap();
        assert_eq!(
            rows,
            vec![
                (HeaderValues::Text(vec!["Other".into()]), 5),
                (HeaderValues::Text(vec!["Hello world".into()]), 2),
            ]
        );
    }

    #[test]
    fn test_grep_strips_quotes_around_name() {
        assert_eq!(grep_header(&dump(), "'subject'").unwrap().len(), 2);
    }

    #[test]
    fn test_grep_unknown_header() {
        let err = grep_header(&dump(), "x-nope").unwrap_err();
        assert!(matches!(err, MboxError::NoSuchHeader(_)));
        assert_eq!(err.to_string(), "There is no such header (x-nope)!");
    }

    #[test]
    fn test_write_grep() {
        let rows = grep_header(&dump(), "subject").unwrap();
        let mut out = Vec::new();
        write_grep(&mut out, "subject", &rows).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "subject\n\t5\t[\"Other\"]\n\t2\t[\"Hello world\"]\n"
        );
    }

    #[test]
    fn test_write_grep_prints_unquoted_name() {
        let rows = grep_header(&dump(), "\"subject\"").unwrap();
        let mut out = Vec::new();
        write_grep(&mut out, "\"subject\"", &rows).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().next(), Some("subject"));
        assert_eq!(header_name("'to'"), "to");
    }

    #[test]
    fn test_remove_newlines() {
        assert_eq!(remove_newlines("a  \r\n\t b\rc\nd"), "a b c d");
        assert_eq!(remove_newlines("plain"), "plain");
    }

    #[test]
    fn test_name_variants_weighted() {
        let rows = grep_header(&dump(), "to").unwrap();
        let variants = name_variants(&rows);
        assert_eq!(variants[0].address, "ann@example.com");
        assert_eq!(variants[0].names.total(), 4);
        assert_eq!(variants[0].names.get("Ann"), 3);
        assert_eq!(variants[1].address, "bob@example.com");

        let mut out = Vec::new();
        write_name_variants(&mut out, &variants).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "ann@example.com\t4\n\tAnn\t3\n\tAnnie\t1\nbob@example.com\t1\n\t\t1\n"
        );
    }

    #[test]
    fn test_name_variants_ignores_text_rows() {
        let rows = vec![
            (HeaderValues::Text(vec!["x".into()]), 1),
            (
                HeaderValues::Addresses(vec![EmailAddress::new("A", "a@b.com")]),
                2,
            ),
        ];
        assert_eq!(name_variants(&rows).len(), 1);
    }
}
