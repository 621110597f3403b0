//! # feed-core
//!
//! Pure logic for livefeed (no I/O, instant tests).
//!
//! This crate implements the ordered feed store, batch decoding, and the
//! subscription lifecycle without any network or timer I/O.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (subscribing, submitting) is performed by `feed-client`,
//! which interprets the actions produced by these state machines.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decode;
pub mod state;
pub mod store;
pub mod view;

pub use decode::{decode_batch, DecodePolicy, DecodedBatch, Rejected};
pub use state::{Action, Event, SubscriptionState};
pub use store::OrderedFeedStore;
pub use view::{classify, Side};
