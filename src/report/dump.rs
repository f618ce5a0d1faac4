//! JSON dumps of the aggregated tables, the per-message data and the bad-header log.
//!
//! Tuple keys are stored as JSON-in-JSON strings (see [`crate::stats::keys`]);
//! both the outer and the inner maps follow the frequency-table order.

use std::collections::HashMap;
use std::io::{Read, Write};

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::ser::PrettyFormatter;

use crate::model::header::HeaderValues;
use crate::scan::MessageSummary;
use crate::stats::aggregator::Group;
use crate::stats::keys::{to_key_string, SpacedFormatter};
use crate::stats::{Aggregator, BadHeader};

/// `{header: {values_key: count}}` as read back from a header dump.
pub type HeaderDump = HashMap<String, HashMap<String, u64>>;

/// `{feature_tuple_key: count}` as read back from a payload-type dump.
pub type PayloadDump = HashMap<String, u64>;

struct HeaderValuesDump<'a>(Vec<Group<'a, HeaderValues>>);

struct GroupEntries<'a, 'g>(&'g Group<'a, HeaderValues>);

impl Serialize for HeaderValuesDump<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for group in &self.0 {
            map.serialize_entry(group.name, &GroupEntries(group))?;
        }
        map.end()
    }
}

impl Serialize for GroupEntries<'_, '_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.entries.len()))?;
        for (values, count) in &self.0.entries {
            let key = to_key_string(*values).map_err(serde::ser::Error::custom)?;
            map.serialize_entry(&key, count)?;
        }
        map.end()
    }
}

fn write_pretty<T: Serialize + ?Sized>(
    out: &mut dyn Write,
    value: &T,
    indent: usize,
) -> anyhow::Result<()> {
    let indent = " ".repeat(indent);
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut *out, PrettyFormatter::with_indent(indent.as_bytes()));
    value.serialize(&mut serializer)?;
    writeln!(out)?;
    Ok(())
}

/// Header-value frequencies: `{lower_name: {"[values...]": count}}`.
pub fn write_header_json(out: &mut dyn Write, aggregator: &Aggregator, indent: usize) -> anyhow::Result<()> {
    write_pretty(out, &HeaderValuesDump(aggregator.header_groups()), indent)
}

/// Payload feature frequencies: `{"[8 features]": count}`.
pub fn write_payload_json(out: &mut dyn Write, aggregator: &Aggregator, indent: usize) -> anyhow::Result<()> {
    write_pretty(out, &aggregator.feature_tuples.keyed(), indent)
}

/// One JSON Lines record per message.
pub fn write_summary_line(out: &mut dyn Write, summary: &MessageSummary) -> crate::error::Result<()> {
    let mut serializer = serde_json::Serializer::with_formatter(&mut *out, SpacedFormatter);
    summary.serialize(&mut serializer)?;
    writeln!(out)?;
    Ok(())
}

/// The bad-header log as a JSON array of `{header, value, error}`.
pub fn write_bad_headers(out: &mut dyn Write, bad_headers: &[BadHeader], indent: usize) -> anyhow::Result<()> {
    write_pretty(out, bad_headers, indent)
}

pub fn read_header_dump(input: &mut dyn Read) -> anyhow::Result<HeaderDump> {
    Ok(serde_json::from_reader(input)?)
}

pub fn read_payload_dump(input: &mut dyn Read) -> anyhow::Result<PayloadDump> {
    Ok(serde_json::from_reader(input)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::address::EmailAddress;
    use crate::model::feature::FeatureTuple;

    fn aggregator() -> Aggregator {
        let mut agg = Aggregator::new();
        agg.header_values.add(
            ("subject".into(), HeaderValues::Text(vec!["Hola".into()])),
            2,
        );
        agg.header_values.add(
            (
                "to".into(),
                HeaderValues::Addresses(vec![EmailAddress::new("Ann", "ann@example.com")]),
            ),
            3,
        );
        agg
    }

    #[test]
    fn test_header_json_layout() {
        let mut out = Vec::new();
        write_header_json(&mut out, &aggregator(), 4).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "{\n    \"to\": {\n        \"[[\\\"Ann\\\", \\\"ann@example.com\\\"]]\": 3\n    },\n    \"subject\": {\n        \"[\\\"Hola\\\"]\": 2\n    }\n}\n"
        );
    }

    #[test]
    fn test_header_json_reads_back() {
        let mut out = Vec::new();
        write_header_json(&mut out, &aggregator(), 2).unwrap();
        let dump = read_header_dump(&mut out.as_slice()).unwrap();
        assert_eq!(dump["subject"]["[\"Hola\"]"], 2);
        assert_eq!(dump["to"].len(), 1);
    }

    #[test]
    fn test_payload_json_reads_back() {
        let mut agg = Aggregator::new();
        let tuple = FeatureTuple {
            has_payload: true,
            is_container: false,
            has_sub_parts: false,
            content_disposition: None,
            declared_charset: Some("utf-8".into()),
            declared_content_type: "text/plain".into(),
            sniffed_content_type: Some("text/plain".into()),
            filename: None,
        };
        agg.feature_tuples.add(tuple, 7);

        let mut out = Vec::new();
        write_payload_json(&mut out, &agg, 4).unwrap();
        let dump = read_payload_dump(&mut out.as_slice()).unwrap();
        assert_eq!(
            dump[r#"[true, false, false, null, "utf-8", "text/plain", "text/plain", null]"#],
            7
        );
    }

    #[test]
    fn test_summary_line_uses_spaced_separators() {
        let summary = MessageSummary {
            headers: vec![("subject".into(), HeaderValues::Text(vec!["Hi".into()]))],
            payload: vec![],
        };
        let mut out = Vec::new();
        write_summary_line(&mut out, &summary).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\"headers\": {\"subject\": [\"Hi\"]}, \"payload\": []}\n"
        );
    }

    #[test]
    fn test_bad_headers_array() {
        let bad = vec![BadHeader {
            header: "date".into(),
            value: "garbage".into(),
            error: "unparseable date".into(),
        }];
        let mut out = Vec::new();
        write_bad_headers(&mut out, &bad, 2).unwrap();
        let restored: Vec<BadHeader> = serde_json::from_slice(&out).unwrap();
        assert_eq!(restored, bad);
    }
}
