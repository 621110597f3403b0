//! Decode a file of raw records and print the resulting feed.
//!
//! Useful for checking how malformed or out-of-order data from a backend
//! export would be shown.

use anyhow::{Context, Result};
use feed_core::{decode_batch, DecodePolicy, DecodedBatch, OrderedFeedStore};
use feed_types::{AuthorId, Record, RecordId};
use serde_json::Value;
use std::path::Path;

use crate::presenter::{render_feed, DEFAULT_WIDTH};

/// Run the replay command.
pub async fn run(file: &Path, stop_at_first_invalid: bool, viewer: Option<&str>) -> Result<()> {
    let contents = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let viewer = viewer
        .map(|v| AuthorId::new(v).context("Viewer must not be empty"))
        .transpose()?;

    let policy = if stop_at_first_invalid {
        DecodePolicy::StopAtFirstInvalid
    } else {
        DecodePolicy::SkipInvalid
    };

    let records = parse_records(&contents)?;
    print!("{}", replay(&records, policy, viewer.as_ref()));
    Ok(())
}

/// Parse a JSON array of record objects, assigning each a fresh id.
fn parse_records(contents: &str) -> Result<Vec<Record>> {
    let values: Vec<Value> =
        serde_json::from_str(contents).context("Replay file must be a JSON array of records")?;

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| match value {
            Value::Object(fields) => Ok(Record::new(RecordId::new(), fields)),
            other => anyhow::bail!("Record {} is not an object: {}", index, other),
        })
        .collect()
}

/// Decode, order and render one batch.
fn replay(records: &[Record], policy: DecodePolicy, viewer: Option<&AuthorId>) -> String {
    let batch = decode_batch(records, policy);
    let clean = batch.is_clean();
    let DecodedBatch { entries, rejected } = batch;

    let mut store = OrderedFeedStore::new();
    store.replace_all(entries);

    let mut out = render_feed(store.entries(), viewer, DEFAULT_WIDTH);
    if !clean {
        out.push_str(&format!("--- {} rejected ---\n", rejected.len()));
        for r in &rejected {
            out.push_str(&format!("#{}: {}\n", r.index, r.error));
        }
    }
    out
}
