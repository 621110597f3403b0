//! FeedSyncClient - the live read path.
//!
//! Subscribes to the remote collection, decodes every delivered snapshot,
//! replaces the [`OrderedFeedStore`] contents and notifies a
//! [`FeedObserver`].
//!
//! # Architecture
//!
//! The subscription lifecycle is the pure state machine from feed-core;
//! this module interprets its actions and performs the I/O.
//!
//! ```text
//! RemoteCollection → SnapshotStream → deliver task → OrderedFeedStore
//!                                          ↓
//!                        feed-core (SubscriptionState)  →  FeedObserver
//! ```
//!
//! The state lives behind a mutex that is also held for the duration of
//! every observer call. Cancelling takes the same mutex, so once
//! [`SubscriptionHandle::cancel`] returns, no observer call can start.

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use feed_core::{decode_batch, Action, DecodePolicy, Event, OrderedFeedStore, SubscriptionState};
use feed_types::{fields, FeedEntry, NewRecord, WELCOME_AUTHOR};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::SessionConfig;
use crate::remote::{Filter, RemoteCollection, RemoteError, Snapshot, SnapshotStream};

/// Subscription errors. All of them are terminal for the subscription.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The live listener could not be attached.
    #[error("failed to attach listener: {0}")]
    Attach(RemoteError),

    /// The backend reported an error on the live stream.
    #[error("live stream failed: {0}")]
    Stream(RemoteError),

    /// The backend closed the live stream.
    #[error("live stream ended")]
    StreamEnded,

    /// This client already has an active subscription.
    #[error("a subscription is already active")]
    AlreadySubscribed,
}

/// Presenter-side receiver of feed updates.
///
/// Calls for one subscription never overlap. Implementations must not
/// cancel the subscription from inside a callback.
pub trait FeedObserver: Send + Sync + 'static {
    /// Called after every applied snapshot with the full ordered feed.
    fn on_feed_changed(&self, entries: &[FeedEntry]);

    /// Called at most once, when the subscription fails.
    fn on_sync_failed(&self, error: &SyncError) {
        let _ = error;
    }
}

type Gate = Arc<Mutex<SubscriptionState>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn transition(state: &mut SubscriptionState, event: Event) -> Vec<Action> {
    let (next, actions) = std::mem::take(state).on_event(event);
    *state = next;
    actions
}

/// The live read path of a feed session.
///
/// Sole writer of the session's [`OrderedFeedStore`].
pub struct FeedSyncClient<R: RemoteCollection> {
    remote: Arc<R>,
    config: SessionConfig,
    store: Arc<Mutex<OrderedFeedStore>>,
    current: Mutex<Option<Gate>>,
}

impl<R: RemoteCollection + 'static> FeedSyncClient<R> {
    /// Create a new client over an explicitly passed backend handle.
    pub fn new(remote: Arc<R>, config: SessionConfig) -> Self {
        Self {
            remote,
            config,
            store: Arc::new(Mutex::new(OrderedFeedStore::new())),
            current: Mutex::new(None),
        }
    }

    /// Bootstrap the sentinel, attach the live listener, and start delivering.
    ///
    /// Attach failures are returned here; failures after that reach the
    /// observer through [`FeedObserver::on_sync_failed`].
    pub async fn subscribe<O: FeedObserver>(
        &self,
        observer: O,
    ) -> Result<SubscriptionHandle, SyncError> {
        let gate: Gate = Arc::new(Mutex::new(SubscriptionState::new()));
        {
            let mut current = lock(&self.current);
            if current.as_ref().is_some_and(|g| lock(g).is_active()) {
                return Err(SyncError::AlreadySubscribed);
            }
            *current = Some(Arc::clone(&gate));
        }
        lock(&self.store).clear();
        // Cancels the gate if this future is dropped before the listener is up
        let pending = PendingGuard::new(Arc::clone(&gate));

        let actions = transition(&mut lock(&gate), Event::SubscribeRequested);
        if actions.contains(&Action::CheckSentinel) && self.config.bootstrap_sentinel {
            self.bootstrap(&gate).await;
        }
        transition(&mut lock(&gate), Event::BootstrapFinished);

        let collection = self.config.collection.clone();
        let stream = match self.remote.subscribe(&collection).await {
            Ok(stream) => stream,
            Err(e) => {
                transition(
                    &mut lock(&gate),
                    Event::AttachFailed {
                        error: e.to_string(),
                    },
                );
                tracing::warn!("Failed to attach listener to {}: {}", collection, e);
                return Err(SyncError::Attach(e));
            }
        };
        transition(&mut lock(&gate), Event::Attached);
        tracing::debug!("Attached live listener to {}", collection);

        let task = tokio::spawn(deliver(
            stream,
            Arc::clone(&gate),
            Arc::clone(&self.store),
            observer,
            self.config.decode_policy,
            collection,
        ));
        pending.disarm();

        Ok(SubscriptionHandle { gate, task })
    }

    /// Make sure the collection holds a welcome sentinel.
    ///
    /// Check-then-create, not atomic: two sessions starting together on an
    /// empty collection can both create one. Failures are logged and skipped.
    async fn bootstrap(&self, gate: &Gate) {
        let collection = &self.config.collection;
        let filter = Filter::field_equals(fields::AUTHOR_ID, WELCOME_AUTHOR);

        match self.remote.query(collection, filter).await {
            Ok(found) if !found.is_empty() => {
                tracing::debug!(
                    "Welcome sentinel present in {} ({} record(s))",
                    collection,
                    found.len()
                );
            }
            Ok(_) => {
                let actions = transition(&mut lock(gate), Event::SentinelMissing);
                if !actions.contains(&Action::SubmitSentinel) {
                    return;
                }
                let sentinel = NewRecord::welcome(self.config.welcome_message.clone());
                match self.remote.insert(collection, sentinel).await {
                    Ok((id, key)) => {
                        tracing::info!("Created welcome sentinel {} in {} at {}", id, collection, key)
                    }
                    Err(e) => {
                        tracing::warn!("Failed to create welcome sentinel in {}: {}", collection, e)
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Welcome sentinel check failed for {}: {}", collection, e);
            }
        }
    }

    /// The current ordered feed.
    pub fn entries(&self) -> Arc<[FeedEntry]> {
        lock(&self.store).snapshot()
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

/// Moves an unfinished subscription to `Cancelled` when dropped.
///
/// Covers a `subscribe` future abandoned at one of its awaits (timeout,
/// `select!`, aborted task): its gate must not stay active in `current`.
struct PendingGuard {
    gate: Option<Gate>,
}

impl PendingGuard {
    fn new(gate: Gate) -> Self {
        Self { gate: Some(gate) }
    }

    fn disarm(mut self) {
        self.gate = None;
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if let Some(gate) = self.gate.take() {
            let actions = transition(&mut lock(&gate), Event::CancelRequested);
            if actions.contains(&Action::Detach) {
                tracing::debug!("Abandoned subscribe cancelled");
            }
        }
    }
}

/// Delivery loop: one iteration per backend delivery, strictly serial.
async fn deliver<O: FeedObserver>(
    mut stream: SnapshotStream,
    gate: Gate,
    store: Arc<Mutex<OrderedFeedStore>>,
    observer: O,
    policy: DecodePolicy,
    collection: String,
) {
    loop {
        let delivery = stream.next().await;
        let flow = handle_delivery(&gate, &store, &observer, policy, &collection, delivery);
        if flow.is_break() {
            break;
        }
    }
}

fn handle_delivery<O: FeedObserver>(
    gate: &Gate,
    store: &Mutex<OrderedFeedStore>,
    observer: &O,
    policy: DecodePolicy,
    collection: &str,
    delivery: Option<Result<Snapshot, RemoteError>>,
) -> ControlFlow<()> {
    // Held until the observer returns
    let mut state = lock(gate);

    let snapshot = match delivery {
        Some(Ok(snapshot)) => snapshot,
        Some(Err(e)) => {
            fail(&mut state, observer, collection, SyncError::Stream(e));
            return ControlFlow::Break(());
        }
        None => {
            fail(&mut state, observer, collection, SyncError::StreamEnded);
            return ControlFlow::Break(());
        }
    };

    let version = snapshot.version;
    let actions = transition(&mut state, Event::SnapshotReceived { version });
    if state.is_terminal() {
        return ControlFlow::Break(());
    }
    if !actions.contains(&Action::ApplySnapshot { version }) {
        tracing::debug!("Ignoring stale snapshot {} for {}", version, collection);
        return ControlFlow::Continue(());
    }

    let entries = apply_snapshot(store, snapshot, policy, collection);
    if actions.contains(&Action::EmitFeedChanged) {
        observer.on_feed_changed(&entries);
    }
    ControlFlow::Continue(())
}

fn apply_snapshot(
    store: &Mutex<OrderedFeedStore>,
    snapshot: Snapshot,
    policy: DecodePolicy,
    collection: &str,
) -> Arc<[FeedEntry]> {
    let decoded = decode_batch(&snapshot.records, policy);
    for rejected in &decoded.rejected {
        tracing::warn!(
            "Dropping malformed record {} (position {}) in {}: {}",
            rejected.record_id,
            rejected.index,
            collection,
            rejected.error
        );
    }

    let mut store = lock(store);
    store.replace_snapshot(snapshot.version, decoded.entries);
    tracing::debug!(
        "Applied snapshot {} for {}: {} entries",
        snapshot.version,
        collection,
        store.len()
    );
    store.snapshot()
}

fn fail<O: FeedObserver>(
    state: &mut SubscriptionState,
    observer: &O,
    collection: &str,
    error: SyncError,
) {
    let actions = transition(
        state,
        Event::StreamFailed {
            error: error.to_string(),
        },
    );
    if actions
        .iter()
        .any(|a| matches!(a, Action::EmitFailed { .. }))
    {
        tracing::warn!("Subscription to {} failed: {}", collection, error);
        observer.on_sync_failed(&error);
    }
}

/// Handle to a running subscription.
///
/// Dropping the handle cancels the subscription.
pub struct SubscriptionHandle {
    gate: Gate,
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    /// Detach the listener.
    ///
    /// Once this returns, the observer receives no further calls. Must not
    /// be called from inside an observer callback.
    pub fn cancel(&self) {
        let actions = transition(&mut lock(&self.gate), Event::CancelRequested);
        if actions.contains(&Action::Detach) {
            self.task.abort();
            tracing::debug!("Subscription cancelled");
        }
    }

    /// Whether the listener is attached and delivering.
    pub fn is_live(&self) -> bool {
        lock(&self.gate).is_live()
    }

    /// Whether the subscription can still deliver.
    pub fn is_active(&self) -> bool {
        lock(&self.gate).is_active()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SubscriptionState {
        lock(&self.gate).clone()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
