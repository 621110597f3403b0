//! # feed-client
//!
//! Client library for the livefeed live-ordered chat feed.
//!
//! This is the main library that applications use to show and post to a
//! shared feed.
//!
//! ## Features
//!
//! - **Live Snapshots**: every remote change delivers the full feed, re-sorted
//! - **Server Ordering**: entries are ordered by backend-assigned keys only
//! - **Backend Abstraction**: pluggable [`RemoteCollection`] (in-process memory, hosted stores)
//! - **Pure State Machine**: Uses feed-core for side-effect-free lifecycle logic
//!
//! ## Example
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

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod publisher;
pub mod remote;
pub mod session;
pub mod sync;

pub use config::{ConfigError, SessionConfig};
pub use publisher::{FeedPublisher, PublishError};
pub use remote::{Filter, MemoryCollection, RemoteCollection, RemoteError, Snapshot, SnapshotStream};
pub use session::FeedSession;
pub use sync::{FeedObserver, FeedSyncClient, SubscriptionHandle, SyncError};
