//! In-process backend.
//!
//! Behaves like a hosted realtime collection: server-assigned ordering
//! keys, full-snapshot fan-out to every live listener on each commit.
//! Also used as the test double, so it allows injecting failures and
//! malformed records.

use super::{Filter, RemoteCollection, RemoteError, Snapshot, SnapshotStream};
use async_trait::async_trait;
use feed_types::{NewRecord, OrderKey, Record, RecordId, SnapshotVersion};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;

type Delivery = Result<Snapshot, RemoteError>;

/// In-process backend.
///
/// Clones share the same collections, like handles to one database.
///
/// Each commit queues a full snapshot for every listener still attached.
/// Listeners must keep reading their [`SnapshotStream`] or drop it; a live
/// but idle stream grows by one snapshot per commit.
#[derive(Debug, Default, Clone)]
pub struct MemoryCollection {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    collections: HashMap<String, CollectionState>,
    /// Last key handed out, across all collections.
    last_key: OrderKey,
    fail_next_insert: Option<String>,
    fail_next_query: Option<String>,
    fail_next_subscribe: Option<String>,
}

impl MemoryInner {
    fn collection(&mut self, name: &str) -> &mut CollectionState {
        self.collections
            .entry(name.to_string())
            .or_insert_with(CollectionState::new)
    }

    /// Commit-time key: wall clock, bumped past the previous key if needed.
    fn next_order_key(&mut self) -> OrderKey {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(micros)
            .unwrap_or(0);
        let key = OrderKey::new(now).max(self.last_key.next());
        self.last_key = key;
        key
    }
}

/// Whole microseconds in `d`, saturating instead of wrapping.
fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

#[derive(Debug)]
struct CollectionState {
    records: Vec<Record>,
    /// Starts at 1 so the very first delivery is always newer than "nothing".
    version: SnapshotVersion,
    subscribers: Vec<mpsc::UnboundedSender<Delivery>>,
}

impl CollectionState {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            version: SnapshotVersion::new(1),
            subscribers: Vec::new(),
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: self.version,
            records: self.records.clone(),
        }
    }

    fn commit(&mut self, record: Record) {
        self.records.push(record);
        self.version = self.version.next();
        self.broadcast();
    }

    fn broadcast(&mut self) {
        let snapshot = self.snapshot();
        self.subscribers
            .retain(|tx| tx.send(Ok(snapshot.clone())).is_ok());
    }
}

impl MemoryCollection {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Commit raw fields as-is, bypassing the ordering-key stamp.
    ///
    /// Lets tests and replays seed malformed or hand-keyed records.
    pub fn insert_raw(&self, collection: &str, fields: Map<String, Value>) -> RecordId {
        let id = RecordId::new();
        self.lock()
            .collection(collection)
            .commit(Record::new(id, fields));
        id
    }

    /// Every record currently stored in a collection.
    pub fn records(&self, collection: &str) -> Vec<Record> {
        self.lock()
            .collections
            .get(collection)
            .map(|c| c.records.clone())
            .unwrap_or_default()
    }

    /// Number of live listeners still attached to a collection.
    pub fn subscriber_count(&self, collection: &str) -> usize {
        let mut inner = self.lock();
        match inner.collections.get_mut(collection) {
            Some(state) => {
                state.subscribers.retain(|tx| !tx.is_closed());
                state.subscribers.len()
            }
            None => 0,
        }
    }

    /// Cause the next insert() to fail with the given error.
    pub fn fail_next_insert(&self, error: &str) {
        self.lock().fail_next_insert = Some(error.to_string());
    }

    /// Cause the next query() to fail with the given error.
    pub fn fail_next_query(&self, error: &str) {
        self.lock().fail_next_query = Some(error.to_string());
    }

    /// Cause the next subscribe() to fail with the given error.
    pub fn fail_next_subscribe(&self, error: &str) {
        self.lock().fail_next_subscribe = Some(error.to_string());
    }

    /// Send a terminal error to every listener of a collection and detach them.
    pub fn break_subscriptions(&self, collection: &str, reason: &str) {
        let mut inner = self.lock();
        if let Some(state) = inner.collections.get_mut(collection) {
            for tx in state.subscribers.drain(..) {
                let _ = tx.send(Err(RemoteError::SubscriptionClosed(reason.to_string())));
            }
        }
    }

    /// Detach every listener of a collection without an error.
    pub fn drop_subscriptions(&self, collection: &str) {
        let mut inner = self.lock();
        if let Some(state) = inner.collections.get_mut(collection) {
            state.subscribers.clear();
        }
    }
}

#[async_trait]
impl RemoteCollection for MemoryCollection {
    async fn insert(
        &self,
        collection: &str,
        record: NewRecord,
    ) -> Result<(RecordId, OrderKey), RemoteError> {
        let mut inner = self.lock();

        // Check for forced failure
        if let Some(error) = inner.fail_next_insert.take() {
            return Err(RemoteError::Unavailable(error));
        }

        let id = RecordId::new();
        let key = inner.next_order_key();
        inner
            .collection(collection)
            .commit(Record::new(id, record.into_fields(key)));
        Ok((id, key))
    }

    async fn query(&self, collection: &str, filter: Filter) -> Result<Vec<Record>, RemoteError> {
        let mut inner = self.lock();

        if let Some(error) = inner.fail_next_query.take() {
            return Err(RemoteError::Unavailable(error));
        }

        Ok(inner
            .collections
            .get(collection)
            .map(|c| {
                c.records
                    .iter()
                    .filter(|r| filter.matches(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn subscribe(&self, collection: &str) -> Result<SnapshotStream, RemoteError> {
        let mut inner = self.lock();

        if let Some(error) = inner.fail_next_subscribe.take() {
            return Err(RemoteError::Unavailable(error));
        }

        let state = inner.collection(collection);
        let (tx, stream) = SnapshotStream::channel();
        // Current contents first
        tx.send(Ok(state.snapshot()))
            .map_err(|_| RemoteError::SubscriptionClosed("listener dropped".into()))?;
        state.subscribers.push(tx);
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_types::{fields, AuthorId};
    use serde_json::json;

    fn new_record(author: &str, content: &str) -> NewRecord {
        NewRecord::new(AuthorId::new(author).unwrap(), content)
    }

    // ===========================================
    // Insert / Query Tests
    // ===========================================

    #[tokio::test]
    async fn insert_assigns_increasing_keys() {
        let remote = MemoryCollection::new();

        let (_, k1) = remote.insert("chats", new_record("u1", "a")).await.unwrap();
        let (_, k2) = remote.insert("chats", new_record("u1", "b")).await.unwrap();
        let (_, k3) = remote.insert("other", new_record("u1", "c")).await.unwrap();

        assert!(k1 < k2);
        assert!(k2 < k3);
    }

    #[tokio::test]
    async fn insert_stamps_order_key_field() {
        let remote = MemoryCollection::new();
        let (id, key) = remote.insert("chats", new_record("u1", "a")).await.unwrap();

        let records = remote.records("chats");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].get(fields::ORDER_KEY), Some(&json!(key.value())));
    }

    #[tokio::test]
    async fn query_applies_filter() {
        let remote = MemoryCollection::new();
        remote.insert("chats", NewRecord::welcome("hi")).await.unwrap();
        remote.insert("chats", new_record("u1", "a")).await.unwrap();

        let all = remote.query("chats", Filter::All).await.unwrap();
        let welcome = remote
            .query("chats", Filter::field_equals(fields::AUTHOR_ID, "welcome"))
            .await
            .unwrap();

        assert_eq!(all.len(), 2);
        assert_eq!(welcome.len(), 1);
    }

    #[tokio::test]
    async fn query_unknown_collection_is_empty() {
        let remote = MemoryCollection::new();
        assert!(remote.query("nope", Filter::All).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clones_share_state() {
        let remote1 = MemoryCollection::new();
        let remote2 = remote1.clone();

        remote1.insert("chats", new_record("u1", "a")).await.unwrap();
        assert_eq!(remote2.records("chats").len(), 1);
    }

    // ===========================================
    // Subscription Tests
    // ===========================================

    #[tokio::test]
    async fn subscribe_delivers_current_contents_first() {
        let remote = MemoryCollection::new();
        remote.insert("chats", new_record("u1", "a")).await.unwrap();

        let mut stream = remote.subscribe("chats").await.unwrap();
        let first = stream.next().await.unwrap().unwrap();

        assert_eq!(first.records.len(), 1);
    }

    #[tokio::test]
    async fn empty_collection_first_delivery_has_version_one() {
        let remote = MemoryCollection::new();
        let mut stream = remote.subscribe("chats").await.unwrap();
        let first = stream.next().await.unwrap().unwrap();

        assert_eq!(first.version, SnapshotVersion::new(1));
        assert!(first.records.is_empty());
    }

    #[tokio::test]
    async fn every_commit_delivers_full_snapshot() {
        let remote = MemoryCollection::new();
        let mut stream = remote.subscribe("chats").await.unwrap();
        let initial = stream.next().await.unwrap().unwrap();

        remote.insert("chats", new_record("u1", "a")).await.unwrap();
        remote.insert("chats", new_record("u2", "b")).await.unwrap();

        let second = stream.next().await.unwrap().unwrap();
        let third = stream.next().await.unwrap().unwrap();

        assert_eq!(second.records.len(), 1);
        assert_eq!(third.records.len(), 2);
        assert!(initial.version < second.version);
        assert!(second.version < third.version);
    }

    #[tokio::test]
    async fn insert_raw_is_delivered_unvalidated() {
        let remote = MemoryCollection::new();
        let mut stream = remote.subscribe("chats").await.unwrap();
        stream.next().await.unwrap().unwrap();

        let Value::Object(fields) = json!({ "content": "no author" }) else {
            unreachable!()
        };
        remote.insert_raw("chats", fields);

        let snapshot = stream.next().await.unwrap().unwrap();
        assert_eq!(snapshot.records.len(), 1);
        assert!(snapshot.records[0].get("authorID").is_none());
    }

    #[tokio::test]
    async fn dropped_streams_are_pruned() {
        let remote = MemoryCollection::new();
        let stream = remote.subscribe("chats").await.unwrap();
        let _kept = remote.subscribe("chats").await.unwrap();
        assert_eq!(remote.subscriber_count("chats"), 2);

        drop(stream);
        assert_eq!(remote.subscriber_count("chats"), 1);
    }

    #[tokio::test]
    async fn idle_stream_keeps_every_snapshot_until_read() {
        let remote = MemoryCollection::new();
        let mut stream = remote.subscribe("chats").await.unwrap();

        for i in 0..3 {
            remote
                .insert("chats", new_record("u1", &format!("m{}", i)))
                .await
                .unwrap();
        }

        let sizes: Vec<usize> = [
            stream.next().await.unwrap().unwrap(),
            stream.next().await.unwrap().unwrap(),
            stream.next().await.unwrap().unwrap(),
            stream.next().await.unwrap().unwrap(),
        ]
        .iter()
        .map(|s| s.records.len())
        .collect();
        assert_eq!(sizes, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn dropped_stream_is_forgotten_on_next_commit() {
        let remote = MemoryCollection::new();
        let stream = remote.subscribe("chats").await.unwrap();
        drop(stream);

        remote.insert("chats", new_record("u1", "a")).await.unwrap();

        let inner = remote.lock();
        assert!(inner.collections["chats"].subscribers.is_empty());
    }

    #[test]
    fn micros_saturates_instead_of_wrapping() {
        assert_eq!(micros(Duration::from_micros(42)), 42);
        assert_eq!(micros(Duration::MAX), u64::MAX);
    }

    // ===========================================
    // Error Condition Tests
    // ===========================================

    #[tokio::test]
    async fn forced_insert_failure() {
        let remote = MemoryCollection::new();
        remote.fail_next_insert("offline");

        let result = remote.insert("chats", new_record("u1", "a")).await;
        assert!(matches!(result, Err(RemoteError::Unavailable(_))));
        assert!(remote.records("chats").is_empty());

        // Next insert should work
        remote.insert("chats", new_record("u1", "a")).await.unwrap();
    }

    #[tokio::test]
    async fn forced_query_and_subscribe_failures() {
        let remote = MemoryCollection::new();
        remote.fail_next_query("offline");
        remote.fail_next_subscribe("offline");

        assert!(remote.query("chats", Filter::All).await.is_err());
        assert!(remote.subscribe("chats").await.is_err());
        assert!(remote.subscribe("chats").await.is_ok());
    }

    #[tokio::test]
    async fn break_subscriptions_sends_error_then_ends() {
        let remote = MemoryCollection::new();
        let mut stream = remote.subscribe("chats").await.unwrap();
        stream.next().await.unwrap().unwrap();

        remote.break_subscriptions("chats", "server restart");

        assert!(matches!(
            stream.next().await,
            Some(Err(RemoteError::SubscriptionClosed(_)))
        ));
        assert!(stream.next().await.is_none());
        assert_eq!(remote.subscriber_count("chats"), 0);
    }

    #[tokio::test]
    async fn drop_subscriptions_ends_stream_silently() {
        let remote = MemoryCollection::new();
        let mut stream = remote.subscribe("chats").await.unwrap();
        stream.next().await.unwrap().unwrap();

        remote.drop_subscriptions("chats");
        assert!(stream.next().await.is_none());
    }
}
