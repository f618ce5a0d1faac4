//! Per-message pipeline: header normalization, payload classification and
//! aggregation, driven over a whole archive.

use std::collections::HashMap;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classify::Classifier;
use crate::config::Config;
use crate::decode::address::{decode_addresses, split_address_list};
use crate::decode::words::decode_header_value;
use crate::error::{MboxError, Result};
use crate::model::address::EmailAddress;
use crate::model::header::{is_address_header, HeaderValues};
use crate::model::record::ContentRecord;
use crate::parser::archive::ArchiveSource;
use crate::parser::header::{normalize_date, unfold_value, RawHeader};
use crate::parser::mbox::MboxParser;
use crate::parser::mime::parse_message;
use crate::sniff::ContentSniffer;
use crate::stats::Aggregator;

/// Normalized data of one message.
///
/// Serializes as `{"headers": {name: values, ...}, "payload": [[kind, content], ...]}`
/// with headers in first-appearance order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageSummary {
    #[serde(serialize_with = "ordered_map")]
    pub headers: Vec<(String, HeaderValues)>,
    pub payload: Vec<ContentRecord>,
}

fn ordered_map<S: Serializer>(
    entries: &[(String, HeaderValues)],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (name, values) in entries {
        map.serialize_entry(name, values)?;
    }
    map.end()
}

/// Runs the per-message pipeline with a fixed configuration.
pub struct Scanner<'a, S: ContentSniffer + ?Sized> {
    config: &'a Config,
    sniffer: &'a S,
    process_payload: bool,
}

impl<'a, S: ContentSniffer + ?Sized> Scanner<'a, S> {
    pub fn new(config: &'a Config, sniffer: &'a S, process_payload: bool) -> Self {
        Self {
            config,
            sniffer,
            process_payload,
        }
    }

    /// Normalize one raw message and fold it into `aggregator`.
    pub fn process_message(&self, raw: &[u8], aggregator: &mut Aggregator) -> MessageSummary {
        let parsed = parse_message(raw, self.config.mime.max_depth);
        let headers = process_headers(&parsed.headers, aggregator);

        let payload = if self.process_payload {
            Classifier::new(self.sniffer, &self.config.classifier)
                .classify(&parsed.root, &mut aggregator.feature_tuples)
        } else {
            Vec::new()
        };

        MessageSummary { headers, payload }
    }

    /// Process every message of `source`.
    ///
    /// `on_message` receives the 1-based message index and its summary; an
    /// error from it stops the scan and is returned. Returns the number of
    /// messages processed.
    pub fn scan(
        &self,
        source: &ArchiveSource,
        aggregator: &mut Aggregator,
        on_message: &mut dyn FnMut(u64, &MessageSummary) -> Result<()>,
        progress_callback: Option<&dyn Fn(u64, Option<u64>)>,
    ) -> Result<u64> {
        info!(source = %source, "Scanning archive");
        let parser = MboxParser::new(&self.config.mbox);
        let mut index: u64 = 0;
        let mut failure: Option<MboxError> = None;

        let count = source.for_each_message(
            &parser,
            &mut |offset, raw| {
                index += 1;
                let summary = self.process_message(raw, aggregator);
                debug!(
                    index,
                    offset,
                    headers = summary.headers.len(),
                    parts = summary.payload.len(),
                    "Processed message"
                );
                match on_message(index, &summary) {
                    Ok(()) => true,
                    Err(e) => {
                        failure = Some(e);
                        false
                    }
                }
            },
            progress_callback,
        )?;

        if let Some(e) = failure {
            return Err(e);
        }

        info!(
            messages = count,
            bad_headers = aggregator.bad_headers.len(),
            "Scan complete"
        );
        Ok(count)
    }
}

/// Count header case variants and decode the values of every header name.
///
/// Returns the decoded values per lowercased name, in first-appearance order.
pub fn process_headers(
    headers: &[RawHeader],
    aggregator: &mut Aggregator,
) -> Vec<(String, HeaderValues)> {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, Vec<&str>> = HashMap::new();

    for header in headers {
        let lower = header.lower_name();
        aggregator
            .header_variants
            .increment((lower.clone(), header.name.clone()));
        grouped
            .entry(lower)
            .or_insert_with_key(|key| {
                order.push(key.clone());
                Vec::new()
            })
            .push(header.value.as_str());
    }

    let mut result = Vec::with_capacity(order.len());
    for name in order {
        let raw_values = grouped.remove(&name).unwrap_or_default();
        let values = decode_values(&name, &raw_values, aggregator);
        aggregator
            .header_values
            .increment((name.clone(), values.clone()));
        result.push((name, values));
    }
    result
}

fn decode_values(lower_name: &str, raw_values: &[&str], aggregator: &mut Aggregator) -> HeaderValues {
    if is_address_header(lower_name) {
        return match decode_addresses(raw_values) {
            Ok(addresses) => HeaderValues::Addresses(addresses),
            Err(e) => {
                warn!(header = lower_name, error = %e, "Could not decode address list, keeping raw pairs");
                let joined = raw_values.join(", ");
                let pairs = split_address_list(&joined)
                    .into_iter()
                    .map(|(name, address)| EmailAddress::new(name, address))
                    .collect();
                aggregator.record_bad_header(lower_name, joined, e);
                HeaderValues::Addresses(pairs)
            }
        };
    }

    let values = raw_values
        .iter()
        .map(|raw| {
            if lower_name == "date" {
                normalize_date(raw).unwrap_or_else(|| {
                    aggregator.record_bad_header(lower_name, *raw, "unparseable date");
                    unfold_value(raw)
                })
            } else if raw.contains("=?") {
                decode_header_value(raw).unwrap_or_else(|e| {
                    warn!(header = lower_name, error = %e, "Could not decode header, keeping raw value");
                    aggregator.record_bad_header(lower_name, *raw, &e);
                    unfold_value(raw)
                })
            } else {
                unfold_value(raw)
            }
        })
        .collect();
    HeaderValues::Text(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::header::parse_header_block;

    fn text_sniffer(_: &[u8]) -> String {
        "text/plain".to_string()
    }

    fn scanner(config: &Config, payload: bool) -> Scanner<'_, fn(&[u8]) -> String> {
        const SNIFFER: fn(&[u8]) -> String = text_sniffer;
        Scanner::new(config, &SNIFFER, payload)
    }

    #[test]
    fn test_process_headers_groups_case_variants() {
        let headers = parse_header_block(
            "Received: one\nSubject: Hi\nreceived: two\nX-Mailer: m\n",
        );
        let mut agg = Aggregator::new();
        let result = process_headers(&headers, &mut agg);

        let names: Vec<&str> = result.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["received", "subject", "x-mailer"]);
        assert_eq!(
            result[0].1,
            HeaderValues::Text(vec!["one".into(), "two".into()])
        );
        assert_eq!(
            agg.header_variants
                .get(&("received".to_string(), "received".to_string())),
            1
        );
        assert_eq!(agg.header_values.total(), 3);
    }

    #[test]
    fn test_address_date_and_encoded_headers() {
        let headers = parse_header_block(
            "From: =?UTF-8?Q?J=C3=B6rg?= <j@example.com>\n\
Date: Thu, 04 Jan 2024 10:00:00 -0000\n\
Subject: =?UTF-8?B?SG9sYQ==?= there\n\
X-Folded: first\n\tsecond\n",
        );
        let mut agg = Aggregator::new();
        let result = process_headers(&headers, &mut agg);

        assert_eq!(
            result[0].1,
            HeaderValues::Addresses(vec![EmailAddress::new("Jörg", "j@example.com")])
        );
        assert_eq!(
            result[1].1,
            HeaderValues::Text(vec!["2024-01-04T10:00:00+00:00".into()])
        );
        assert_eq!(result[2].1, HeaderValues::Text(vec!["Hola there".into()]));
        assert_eq!(result[3].1, HeaderValues::Text(vec!["first second".into()]));
        assert!(agg.bad_headers.is_empty());
    }

    #[test]
    fn test_bad_headers_are_logged_and_kept() {
        let headers = parse_header_block(
            "Date: sometime last week\nSubject: Jörg =?utf-8?q?x?=\n",
        );
        let mut agg = Aggregator::new();
        let result = process_headers(&headers, &mut agg);

        assert_eq!(result[0].1, HeaderValues::Text(vec!["sometime last week".into()]));
        assert_eq!(result[1].1, HeaderValues::Text(vec!["Jörg =?utf-8?q?x?=".into()]));
        let names: Vec<&str> = agg.bad_headers.iter().map(|b| b.header.as_str()).collect();
        assert_eq!(names, vec!["date", "subject"]);
    }

    #[test]
    fn test_process_message_summary_json() {
        let config = Config::default();
        let raw = b"Subject: Hi\nContent-Type: text/plain; charset=utf-8\n\nhello";
        let mut agg = Aggregator::new();
        let summary = scanner(&config, true).process_message(raw, &mut agg);

        assert_eq!(summary.payload, vec![ContentRecord::text("text/plain", "hello")]);
        assert_eq!(agg.feature_tuples.total(), 1);
        let json = serde_json::to_string(&summary).unwrap();
        assert_eq!(
            json,
            r#"{"headers":{"subject":["Hi"],"content-type":["text/plain; charset=utf-8"]},"payload":[["text/plain","hello"]]}"#
        );
    }

    #[test]
    fn test_payload_skipped_when_disabled() {
        let config = Config::default();
        let raw = b"Subject: Hi\n\nhello";
        let mut agg = Aggregator::new();
        let summary = scanner(&config, false).process_message(raw, &mut agg);
        assert!(summary.payload.is_empty());
        assert!(agg.feature_tuples.is_empty());
    }
}
