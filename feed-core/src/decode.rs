//! Batch decoding for livefeed.
//!
//! Turns a delivered batch of untyped [`Record`]s into feed entries.
//! Invalid records never abort the batch under the default policy; they are
//! collected as [`Rejected`] so the caller can log them.

use feed_types::{DecodeError, FeedEntry, Record, RecordId};
use serde::Deserialize;

/// What to do when a record in a batch fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// Drop the bad record and keep decoding the rest.
    #[default]
    SkipInvalid,
    /// Stop at the first bad record, keeping only the records before it.
    ///
    /// Later records are neither decoded nor reported.
    StopAtFirstInvalid,
}

/// A record that was dropped from a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    /// Position of the record in the delivered batch.
    pub index: usize,
    /// Backend id of the record.
    pub record_id: RecordId,
    /// Why it was dropped.
    pub error: DecodeError,
}

/// Result of decoding one delivered batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedBatch {
    /// Valid entries, in delivery order.
    pub entries: Vec<FeedEntry>,
    /// Records that were dropped.
    pub rejected: Vec<Rejected>,
}

impl DecodedBatch {
    /// Whether no record was dropped.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Decode every record of a batch according to `policy`.
pub fn decode_batch(records: &[Record], policy: DecodePolicy) -> DecodedBatch {
    let mut batch = DecodedBatch {
        entries: Vec::with_capacity(records.len()),
        rejected: Vec::new(),
    };

    for (index, record) in records.iter().enumerate() {
        match FeedEntry::decode(record) {
            Ok(entry) => batch.entries.push(entry),
            Err(error) => {
                batch.rejected.push(Rejected {
                    index,
                    record_id: record.id,
                    error,
                });
                if policy == DecodePolicy::StopAtFirstInvalid {
                    break;
                }
            }
        }
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OrderedFeedStore;
    use serde_json::{json, Value};

    fn record(value: Value) -> Record {
        let Value::Object(map) = value else {
            panic!("fixture must be an object");
        };
        Record::new(RecordId::new(), map)
    }

    fn mixed_batch() -> Vec<Record> {
        vec![
            record(json!({ "authorID": "a1", "content": "first", "orderKey": 3 })),
            record(json!({ "content": "no author", "orderKey": 4 })),
            record(json!({ "authorID": "a2", "content": "second", "orderKey": 1 })),
            record(json!({ "authorID": "a3", "orderKey": 2 })),
            record(json!({ "authorID": "a4", "content": "no key" })),
        ]
    }

    #[test]
    fn skip_invalid_keeps_every_valid_record() {
        let batch = decode_batch(&mixed_batch(), DecodePolicy::SkipInvalid);

        let contents: Vec<&str> = batch.entries.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, ["first", "second"]);

        let indices: Vec<usize> = batch.rejected.iter().map(|r| r.index).collect();
        assert_eq!(indices, [1, 3, 4]);
        assert!(!batch.is_clean());
    }

    #[test]
    fn stop_at_first_invalid_truncates_batch() {
        let batch = decode_batch(&mixed_batch(), DecodePolicy::StopAtFirstInvalid);

        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.entries[0].content, "first");
        assert_eq!(batch.rejected.len(), 1);
        assert_eq!(batch.rejected[0].index, 1);
    }

    #[test]
    fn rejected_records_are_absent_from_store() {
        let records = mixed_batch();
        let batch = decode_batch(&records, DecodePolicy::default());

        let mut store = OrderedFeedStore::new();
        store.replace_all(batch.entries);

        assert_eq!(store.len(), 2);
        assert!(store
            .entries()
            .iter()
            .all(|e| e.content != "no author" && e.content != "no key"));
        assert_eq!(store.entries()[0].content, "second");
    }

    #[test]
    fn rejected_carries_record_id_and_reason() {
        let records = mixed_batch();
        let batch = decode_batch(&records, DecodePolicy::SkipInvalid);

        assert_eq!(batch.rejected[0].record_id, records[1].id);
        assert_eq!(
            batch.rejected[0].error,
            DecodeError::MissingField { field: "authorID" }
        );
    }

    #[test]
    fn empty_batch_is_clean() {
        let batch = decode_batch(&[], DecodePolicy::StopAtFirstInvalid);
        assert!(batch.entries.is_empty());
        assert!(batch.is_clean());
    }

    #[test]
    fn policy_deserializes_from_snake_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: DecodePolicy,
        }
        let parsed: Wrapper = serde_json::from_str(r#"{"policy":"stop_at_first_invalid"}"#).unwrap();
        assert_eq!(parsed.policy, DecodePolicy::StopAtFirstInvalid);
    }
}
