//! # feed-types
//!
//! Data types for the livefeed ordered chat feed.
//!
//! This crate provides the foundational types used across all livefeed crates:
//! - [`AuthorId`], [`RecordId`], [`OrderKey`], [`SnapshotVersion`] - Identity and ordering types
//! - [`Record`], [`NewRecord`] - Untyped key/value documents as stored by the backend
//! - [`FeedEntry`] - A validated feed row
//! - [`DecodeError`] - Why a record could not become a [`FeedEntry`]

#![warn(missing_docs)]
#![warn(clippy::all)]

mod entry;
mod error;
mod ids;
mod record;

pub use entry::FeedEntry;
pub use error::DecodeError;
pub use ids::{AuthorId, OrderKey, RecordId, SnapshotVersion, WELCOME_AUTHOR};
pub use record::{fields, NewRecord, Record};
