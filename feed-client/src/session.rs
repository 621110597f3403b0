//! FeedSession - one device's view of the shared feed.
//!
//! Ties a stable [`AuthorId`] to a [`FeedSyncClient`] (read path) and a
//! [`FeedPublisher`] (write path) over the same backend handle.
//!
//! # Example
//!
//! ```ignore
//! use feed_client::{FeedSession, MemoryCollection, SessionConfig};
//!
//! let remote = Arc::new(MemoryCollection::new());
//! let session = FeedSession::new(remote, SessionConfig::default(), AuthorId::random());
//!
//! session.start(presenter).await?;
//! session.send("hello");
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use feed_core::{classify, Side};
use feed_types::{AuthorId, FeedEntry, OrderKey, RecordId};
use tokio::task::JoinHandle;

use crate::config::SessionConfig;
use crate::publisher::{FeedPublisher, PublishError};
use crate::remote::RemoteCollection;
use crate::sync::{FeedObserver, FeedSyncClient, SubscriptionHandle, SyncError};

/// A chat session bound to one identity.
pub struct FeedSession<R: RemoteCollection> {
    identity: AuthorId,
    client: FeedSyncClient<R>,
    publisher: FeedPublisher<R>,
    subscription: Mutex<Option<SubscriptionHandle>>,
}

impl<R: RemoteCollection + 'static> FeedSession<R> {
    /// Create a session. The identity never changes afterwards.
    pub fn new(remote: Arc<R>, config: SessionConfig, identity: AuthorId) -> Self {
        let publisher = FeedPublisher::new(Arc::clone(&remote), &config.collection);
        Self {
            identity,
            client: FeedSyncClient::new(remote, config),
            publisher,
            subscription: Mutex::new(None),
        }
    }

    /// Start the live feed, delivering updates to `observer`.
    pub async fn start<O: FeedObserver>(&self, observer: O) -> Result<(), SyncError> {
        let handle = self.client.subscribe(observer).await?;
        let previous = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        // Only reachable when the old one had already ended
        drop(previous);
        Ok(())
    }

    /// Stop the live feed. No observer call happens after this returns.
    pub fn stop(&self) {
        let handle = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.cancel();
        }
    }

    /// Whether the live feed is running.
    pub fn is_live(&self) -> bool {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(SubscriptionHandle::is_live)
    }

    /// Send a message as this session's identity, fire-and-forget.
    pub fn send(&self, content: impl Into<String>) -> JoinHandle<()> {
        self.publisher.publish(self.identity.clone(), content)
    }

    /// Send a message and wait for the commit.
    pub async fn send_and_wait(&self, content: &str) -> Result<(RecordId, OrderKey), PublishError> {
        self.publisher.submit(&self.identity, content).await
    }

    /// Whether this session wrote `entry`.
    pub fn is_mine(&self, entry: &FeedEntry) -> bool {
        self.classify(entry) == Side::Mine
    }

    /// Which side of the conversation `entry` renders on.
    pub fn classify(&self, entry: &FeedEntry) -> Side {
        classify(entry, &self.identity)
    }

    /// The current ordered feed.
    pub fn entries(&self) -> Arc<[FeedEntry]> {
        self.client.entries()
    }

    /// This session's identity.
    pub fn identity(&self) -> &AuthorId {
        &self.identity
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        self.client.config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryCollection;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct LastFeed {
        feed: Arc<Mutex<Option<Vec<FeedEntry>>>>,
        calls: Arc<Mutex<usize>>,
    }

    impl LastFeed {
        fn get(&self) -> Vec<FeedEntry> {
            self.feed.lock().unwrap().clone().unwrap_or_default()
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl FeedObserver for LastFeed {
        fn on_feed_changed(&self, entries: &[FeedEntry]) {
            *self.feed.lock().unwrap() = Some(entries.to_vec());
            *self.calls.lock().unwrap() += 1;
        }
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not met in time");
    }

    fn session(remote: &MemoryCollection, id: &str) -> FeedSession<MemoryCollection> {
        FeedSession::new(
            Arc::new(remote.clone()),
            SessionConfig::default(),
            AuthorId::new(id).unwrap(),
        )
    }

    #[tokio::test]
    async fn published_entry_round_trips_as_mine() {
        let remote = MemoryCollection::new();
        let session = session(&remote, "u1");
        let view = LastFeed::default();
        session.start(view.clone()).await.unwrap();

        session.send("hello");
        wait_until(|| view.get().iter().any(|e| e.content == "hello")).await;

        let feed = view.get();
        let mine = feed.iter().find(|e| e.content == "hello").unwrap();
        assert!(session.is_mine(mine));
        assert_eq!(session.classify(mine), Side::Mine);

        let welcome = feed.iter().find(|e| e.author_id.is_welcome()).unwrap();
        assert!(!session.is_mine(welcome));
    }

    #[tokio::test]
    async fn send_is_not_visible_until_echoed() {
        let remote = MemoryCollection::new();
        remote.fail_next_subscribe("offline");
        let session = session(&remote, "u1");
        assert!(session.start(LastFeed::default()).await.is_err());

        session.send_and_wait("hello").await.unwrap();

        // Committed remotely but never applied locally without a live feed
        assert_eq!(remote.records("chats").len(), 2);
        assert!(session.entries().is_empty());
    }

    #[tokio::test]
    async fn two_sessions_see_same_order_with_own_sides() {
        let remote = MemoryCollection::new();
        let alice = session(&remote, "alice");
        let bob = session(&remote, "bob");
        let alice_view = LastFeed::default();
        let bob_view = LastFeed::default();
        alice.start(alice_view.clone()).await.unwrap();
        bob.start(bob_view.clone()).await.unwrap();

        alice.send_and_wait("hi bob").await.unwrap();
        bob.send_and_wait("hi alice").await.unwrap();

        wait_until(|| alice_view.get().len() == 3 && bob_view.get().len() == 3).await;

        assert_eq!(alice_view.get(), bob_view.get());
        let feed = alice_view.get();
        assert_eq!(feed[1].content, "hi bob");
        assert_eq!(feed[2].content, "hi alice");
        assert!(alice.is_mine(&feed[1]) && !bob.is_mine(&feed[1]));
        assert!(bob.is_mine(&feed[2]) && !alice.is_mine(&feed[2]));

        // Only one sentinel even though both sessions bootstrapped
        assert_eq!(feed.iter().filter(|e| e.author_id.is_welcome()).count(), 1);
    }

    #[tokio::test]
    async fn stop_silences_observer() {
        let remote = MemoryCollection::new();
        let session = session(&remote, "u1");
        let view = LastFeed::default();
        session.start(view.clone()).await.unwrap();
        wait_until(|| view.calls() >= 1).await;
        assert!(session.is_live());

        session.stop();
        assert!(!session.is_live());

        session.send_and_wait("after stop").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(view.calls(), 1);
    }

    #[tokio::test]
    async fn blank_send_is_rejected() {
        let remote = MemoryCollection::new();
        let session = session(&remote, "u1");

        let result = session.send_and_wait("  ").await;
        assert!(matches!(result, Err(PublishError::EmptyContent)));
    }

    #[tokio::test]
    async fn entries_reflect_latest_feed() {
        let remote = MemoryCollection::new();
        let session = session(&remote, "u1");
        let view = LastFeed::default();
        session.start(view.clone()).await.unwrap();

        session.send_and_wait("one").await.unwrap();
        wait_until(|| view.get().len() == 2).await;

        assert_eq!(&*session.entries(), view.get().as_slice());
        assert_eq!(session.identity().as_str(), "u1");
        assert_eq!(session.config().collection, "chats");
    }
}
