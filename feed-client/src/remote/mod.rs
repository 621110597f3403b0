//! Backend abstraction for livefeed.
//!
//! This module provides a pluggable interface to the hosted document
//! collection that stores the feed (in-process memory backend, or any
//! realtime database SDK wrapped behind the trait).
//!
//! # Design
//!
//! The trait is async and mirrors the three operations the feed needs:
//! - `insert()` commits one document and returns its server-assigned key
//! - `query()` is a one-shot filtered read
//! - `subscribe()` opens a live listener that receives the **complete**
//!   current result set on every change, never a delta
//!
//! The handle is always passed explicitly; there is no global instance.
//!
//! # Example
//!
//! ```ignore
//! let remote = MemoryCollection::new();
//! let (id, key) = remote.insert("chats", NewRecord::new(author, "hi")).await?;
//! let mut stream = remote.subscribe("chats").await?;
//! let snapshot = stream.next().await;
//! ```

mod memory;

pub use memory::MemoryCollection;

use async_trait::async_trait;
use feed_types::{NewRecord, OrderKey, Record, RecordId, SnapshotVersion};
use thiserror::Error;
use tokio::sync::mpsc;

/// Backend errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Backend could not be reached.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Backend refused the operation.
    #[error("backend rejected operation: {0}")]
    Rejected(String),

    /// Live listener was closed by the backend.
    #[error("subscription closed: {0}")]
    SubscriptionClosed(String),
}

/// Filter for one-shot queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Every record in the collection.
    All,
    /// Records whose string field equals a value.
    FieldEquals {
        /// Wire name of the field.
        field: String,
        /// Value to match.
        value: String,
    },
}

impl Filter {
    /// Match records whose `field` is the string `value`.
    pub fn field_equals(field: &str, value: &str) -> Self {
        Self::FieldEquals {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Whether a record passes this filter.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::All => true,
            Self::FieldEquals { field, value } => record.field_equals(field, value),
        }
    }
}

/// One live delivery: the complete current contents of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Backend version of the collection at this delivery.
    pub version: SnapshotVersion,
    /// Every record in the collection, in backend delivery order.
    pub records: Vec<Record>,
}

/// Receiving half of a live subscription.
///
/// Deliveries arrive serially and in commit order. The stream ends (`None`)
/// when the backend drops the listener.
///
/// The channel is unbounded: a stream that is kept alive but never read
/// holds one full snapshot per commit until it is read or dropped. Dropping
/// the stream releases the backlog, and the backend forgets the listener on
/// its next commit.
#[derive(Debug)]
pub struct SnapshotStream {
    rx: mpsc::UnboundedReceiver<Result<Snapshot, RemoteError>>,
}

impl SnapshotStream {
    /// Wrap the receiving end of a delivery channel.
    pub fn new(rx: mpsc::UnboundedReceiver<Result<Snapshot, RemoteError>>) -> Self {
        Self { rx }
    }

    /// Create a connected sender/stream pair.
    pub fn channel() -> (
        mpsc::UnboundedSender<Result<Snapshot, RemoteError>>,
        Self,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::new(rx))
    }

    /// Wait for the next delivery.
    pub async fn next(&mut self) -> Option<Result<Snapshot, RemoteError>> {
        self.rx.recv().await
    }
}

/// Backend trait for the remote feed collection.
///
/// Implementations handle the underlying database (hosted realtime
/// document store, in-process memory, etc).
#[async_trait]
pub trait RemoteCollection: Send + Sync {
    /// Commit a new record. The backend stamps the ordering key.
    async fn insert(
        &self,
        collection: &str,
        record: NewRecord,
    ) -> Result<(RecordId, OrderKey), RemoteError>;

    /// One-shot read of the records matching `filter`.
    async fn query(&self, collection: &str, filter: Filter) -> Result<Vec<Record>, RemoteError>;

    /// Open a live listener on every record of `collection`.
    ///
    /// The first delivery is the current contents; each later commit
    /// produces another full delivery with a higher version.
    async fn subscribe(&self, collection: &str) -> Result<SnapshotStream, RemoteError>;
}
