//! FeedPublisher - the write path.
//!
//! Submits new entries to the remote collection. The publisher never
//! touches the local feed: a new entry shows up only when the live
//! subscription echoes it back with its server-assigned key.

use std::sync::Arc;

use feed_types::{AuthorId, NewRecord, OrderKey, RecordId};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::remote::{RemoteCollection, RemoteError};

/// Publish errors.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Nothing to send after trimming whitespace.
    #[error("message is empty")]
    EmptyContent,

    /// Backend refused or could not take the record.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),
}

/// Submits entries to one collection.
pub struct FeedPublisher<R: RemoteCollection> {
    remote: Arc<R>,
    collection: String,
}

impl<R: RemoteCollection> Clone for FeedPublisher<R> {
    fn clone(&self) -> Self {
        Self {
            remote: Arc::clone(&self.remote),
            collection: self.collection.clone(),
        }
    }
}

impl<R: RemoteCollection + 'static> FeedPublisher<R> {
    /// Create a publisher for `collection`.
    pub fn new(remote: Arc<R>, collection: &str) -> Self {
        Self {
            remote,
            collection: collection.to_string(),
        }
    }

    /// Submit one entry and wait for the commit.
    ///
    /// Content is trimmed; blank content is rejected before any I/O.
    pub async fn submit(
        &self,
        author_id: &AuthorId,
        content: &str,
    ) -> Result<(RecordId, OrderKey), PublishError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(PublishError::EmptyContent);
        }

        let record = NewRecord::new(author_id.clone(), content);
        let (id, key) = self.remote.insert(&self.collection, record).await?;
        tracing::debug!("Published {} to {} at {}", id, self.collection, key);
        Ok((id, key))
    }

    /// Fire-and-forget submit.
    ///
    /// Returns immediately. Failures are logged, never retried or surfaced.
    /// The returned handle may be ignored.
    pub fn publish(&self, author_id: AuthorId, content: impl Into<String>) -> JoinHandle<()> {
        let publisher = self.clone();
        let content = content.into();
        tokio::spawn(async move {
            if let Err(e) = publisher.submit(&author_id, &content).await {
                tracing::warn!("Failed to publish to {}: {}", publisher.collection, e);
            }
        })
    }

    /// The target collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryCollection;
    use feed_types::{fields, FeedEntry};

    fn author(id: &str) -> AuthorId {
        AuthorId::new(id).unwrap()
    }

    fn publisher(remote: &MemoryCollection) -> FeedPublisher<MemoryCollection> {
        FeedPublisher::new(Arc::new(remote.clone()), "chats")
    }

    #[tokio::test]
    async fn submit_inserts_record_with_server_key() {
        let remote = MemoryCollection::new();
        let (id, key) = publisher(&remote)
            .submit(&author("u1"), "hello")
            .await
            .unwrap();

        let records = remote.records("chats");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);

        let entry = FeedEntry::decode(&records[0]).unwrap();
        assert_eq!(entry.author_id, author("u1"));
        assert_eq!(entry.content, "hello");
        assert_eq!(entry.order_key, key);
    }

    #[tokio::test]
    async fn submit_trims_content() {
        let remote = MemoryCollection::new();
        publisher(&remote)
            .submit(&author("u1"), "  padded \n")
            .await
            .unwrap();

        let records = remote.records("chats");
        assert!(records[0].field_equals(fields::CONTENT, "padded"));
    }

    #[tokio::test]
    async fn blank_content_is_rejected_without_io() {
        let remote = MemoryCollection::new();
        remote.fail_next_insert("should stay armed");

        let result = publisher(&remote).submit(&author("u1"), "   ").await;
        assert!(matches!(result, Err(PublishError::EmptyContent)));

        // The armed failure was not consumed
        let result = publisher(&remote).submit(&author("u1"), "real").await;
        assert!(matches!(result, Err(PublishError::Remote(_))));
    }

    #[tokio::test]
    async fn submit_surfaces_remote_error() {
        let remote = MemoryCollection::new();
        remote.fail_next_insert("offline");

        let result = publisher(&remote).submit(&author("u1"), "hi").await;
        assert!(matches!(
            result,
            Err(PublishError::Remote(RemoteError::Unavailable(_)))
        ));
        assert!(remote.records("chats").is_empty());
    }

    #[tokio::test]
    async fn publish_is_fire_and_forget() {
        let remote = MemoryCollection::new();
        publisher(&remote)
            .publish(author("u1"), "hello")
            .await
            .unwrap();

        assert_eq!(remote.records("chats").len(), 1);
    }

    #[tokio::test]
    async fn publish_failure_is_swallowed() {
        let remote = MemoryCollection::new();
        remote.fail_next_insert("offline");

        // The task completes normally; the failure is only logged
        publisher(&remote)
            .publish(author("u1"), "lost")
            .await
            .unwrap();

        assert!(remote.records("chats").is_empty());
    }
}
