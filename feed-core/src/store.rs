//! Ordered feed store for livefeed.
//!
//! The store holds the current known feed, sorted ascending by
//! [`OrderKey`](feed_types::OrderKey). Every remote snapshot replaces the
//! whole contents; there is no incremental patching. Equal keys keep the
//! order in which the backend delivered them (stable sort).

use std::sync::Arc;

use feed_types::{FeedEntry, SnapshotVersion};

/// In-memory holder of the current feed, always sorted.
///
/// Owned by exactly one subscription. Readers get an immutable
/// [`snapshot`](Self::snapshot) rather than a reference into the store.
#[derive(Debug, Clone)]
pub struct OrderedFeedStore {
    entries: Arc<[FeedEntry]>,
    /// Version of the last snapshot applied via `replace_snapshot`.
    version: SnapshotVersion,
}

impl OrderedFeedStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: Arc::from(Vec::new()),
            version: SnapshotVersion::zero(),
        }
    }

    /// Replace the entire contents, then sort ascending by order key.
    ///
    /// Calling this twice with the same batch yields the same sequence.
    pub fn replace_all(&mut self, mut entries: Vec<FeedEntry>) {
        // slice::sort_by_key is stable
        entries.sort_by_key(|entry| entry.order_key);
        self.entries = Arc::from(entries);
    }

    /// Replace the contents with a versioned snapshot.
    ///
    /// Returns `false` and leaves the store untouched if `version` is not
    /// newer than the last applied snapshot.
    pub fn replace_snapshot(&mut self, version: SnapshotVersion, entries: Vec<FeedEntry>) -> bool {
        if version <= self.version {
            return false;
        }
        self.replace_all(entries);
        self.version = version;
        true
    }

    /// The current ordered entries.
    pub fn entries(&self) -> &[FeedEntry] {
        &self.entries
    }

    /// A cheap shared handle to the current ordered entries.
    pub fn snapshot(&self) -> Arc<[FeedEntry]> {
        Arc::clone(&self.entries)
    }

    /// Version of the last applied snapshot.
    pub fn version(&self) -> SnapshotVersion {
        self.version
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries and forget the applied version.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl Default for OrderedFeedStore {
    fn default() -> Self {
        Self::new()
    }
}
