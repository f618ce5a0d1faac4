//! Part classification: is a part text, an attachment, or noise?
//!
//! The decision is an ordered table over the observed [`FeatureTuple`]; the
//! first matching branch wins:
//!
//! | # | condition                                              | outcome                       |
//! |---|--------------------------------------------------------|-------------------------------|
//! | 1 | container                                              | recurse into children         |
//! | 2 | has filename                                           | `("attachment", filename)`    |
//! | 3 | no charset, type not renderable                        | discard                       |
//! | 4 | no charset, renderable type                            | strip, decode as UTF-8        |
//! | 5 | charset, sniffed type in the erroneous set             | strip, keep if long enough    |
//! | 6 | charset, anything else                                 | decode the full payload       |

use tracing::trace;

use crate::config::ClassifierConfig;
use crate::decode::charset::decode_with_fallback;
use crate::model::feature::FeatureTuple;
use crate::model::part::MessagePart;
use crate::model::record::ContentRecord;
use crate::sniff::ContentSniffer;
use crate::stats::table::FrequencyTable;

/// Outcome of the decision table for one part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Visit the sub-parts in order; no record for the container itself.
    Recurse,
    /// Named part: one attachment record with the filename.
    Attachment,
    /// Charset-less part of a non-renderable type (mostly inline images).
    Discard,
    /// Charset-less renderable text: stripped, decoded as UTF-8, dropped if empty.
    TextWithoutCharset,
    /// Declared charset but suspicious sniffed type: stripped, dropped if too short.
    SuspiciousText,
    /// Declared charset: the whole payload decoded as-is.
    Text,
}

/// Decide what to do with a part from its observed features alone.
pub fn decide(features: &FeatureTuple, config: &ClassifierConfig) -> Decision {
    if features.is_container {
        return Decision::Recurse;
    }
    if features.filename.is_some() {
        return Decision::Attachment;
    }

    let renderable = config
        .renderable_without_charset
        .iter()
        .any(|t| *t == features.declared_content_type);

    match &features.declared_charset {
        None if !renderable => Decision::Discard,
        None => Decision::TextWithoutCharset,
        Some(_) => {
            let suspicious = features
                .sniffed_content_type
                .as_ref()
                .is_some_and(|sniffed| config.erroneous_sniffed_types.contains(sniffed));
            if suspicious {
                Decision::SuspiciousText
            } else {
                Decision::Text
            }
        }
    }
}

/// Receives one feature observation per visited part, in visit order.
pub trait FeatureSink {
    fn record(&mut self, features: FeatureTuple);
}

impl FeatureSink for FrequencyTable<FeatureTuple> {
    fn record(&mut self, features: FeatureTuple) {
        self.increment(features);
    }
}

impl FeatureSink for Vec<FeatureTuple> {
    fn record(&mut self, features: FeatureTuple) {
        self.push(features);
    }
}

/// Walks message trees, recording one feature observation per visited part.
pub struct Classifier<'a, S: ContentSniffer + ?Sized> {
    sniffer: &'a S,
    config: &'a ClassifierConfig,
}

impl<'a, S: ContentSniffer + ?Sized> Classifier<'a, S> {
    pub fn new(sniffer: &'a S, config: &'a ClassifierConfig) -> Self {
        Self { sniffer, config }
    }

    /// Classify the whole tree under `part`.
    ///
    /// Returns the content records in document order. Every visited part
    /// (containers included) is counted in `features`, in pre-order, before
    /// any branching, so discarded parts still show up in the statistics.
    pub fn classify<F: FeatureSink + ?Sized>(
        &self,
        part: &MessagePart,
        features: &mut F,
    ) -> Vec<ContentRecord> {
        let mut records = Vec::new();
        self.walk(part, features, &mut records);
        records
    }

    fn walk<F: FeatureSink + ?Sized>(
        &self,
        part: &MessagePart,
        features: &mut F,
        records: &mut Vec<ContentRecord>,
    ) {
        let sniffed = part.payload().map(|payload| {
            let end = payload.len().min(self.config.sniff_prefix_len);
            self.sniffer.sniff(&payload[..end])
        });
        let observed = FeatureTuple::observe(part, sniffed);
        let decision = decide(&observed, self.config);
        features.record(observed);

        let meta = part.meta();
        trace!(content_type = meta.content_type.as_str(), ?decision, "Classified part");

        let payload = part.payload().unwrap_or_default();
        let record = match decision {
            Decision::Recurse => {
                for child in part.children() {
                    self.walk(child, features, records);
                }
                None
            }
            Decision::Attachment => meta.filename.clone().map(ContentRecord::attachment),
            Decision::Discard => None,
            Decision::TextWithoutCharset => {
                let stripped = strip_whitespace(payload);
                (!stripped.is_empty()).then(|| {
                    ContentRecord::text(&meta.content_type, decode_with_fallback(stripped, "utf-8"))
                })
            }
            Decision::SuspiciousText => {
                let stripped = strip_whitespace(payload);
                let charset = meta.charset.as_deref().unwrap_or("utf-8");
                (stripped.len() >= self.config.min_erroneous_payload_len).then(|| {
                    ContentRecord::text(&meta.content_type, decode_with_fallback(stripped, charset))
                })
            }
            Decision::Text => {
                let charset = meta.charset.as_deref().unwrap_or("utf-8");
                Some(ContentRecord::text(
                    &meta.content_type,
                    decode_with_fallback(payload, charset),
                ))
            }
        };
        records.extend(record);
    }
}

/// Strip leading and trailing ASCII whitespace (space, `\t`, `\n`, `\r`, `\x0b`, `\x0c`).
fn strip_whitespace(bytes: &[u8]) -> &[u8] {
    let is_space = |b: &u8| matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c);
    let start = bytes.iter().position(|b| !is_space(b)).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !is_space(b)).map_or(start, |i| i + 1);
    &bytes[start..end]
}
