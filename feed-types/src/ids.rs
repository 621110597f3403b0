//! Identity and ordering types for livefeed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Author id reserved for the sentinel welcome record.
pub const WELCOME_AUTHOR: &str = "welcome";

/// Opaque identity of whoever wrote an entry.
///
/// Devices use a UUID v4 string; the sentinel record uses [`WELCOME_AUTHOR`].
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorId(String);

impl AuthorId {
    /// Create an AuthorId from a string. Returns `None` when empty.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    /// Create a new random device-scoped AuthorId.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// The AuthorId of the sentinel welcome record.
    pub fn welcome() -> Self {
        Self(WELCOME_AUTHOR.to_string())
    }

    /// Whether this is the sentinel author.
    pub fn is_welcome(&self) -> bool {
        self.0 == WELCOME_AUTHOR
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuthorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for AuthorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthorId({})", self.0)
    }
}

/// Backend-assigned document id.
///
/// UUID v4 format (16 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(uuid::Uuid);

impl RecordId {
    /// Create a new random RecordId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

/// Server-assigned ordering key, in microseconds since the Unix epoch.
///
/// Stamped by the backend at commit time, never by clients, so device
/// clock drift cannot reorder the feed. Strictly increasing per commit.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct OrderKey(u64);

impl OrderKey {
    /// Create a new OrderKey with the given value.
    pub fn new(micros: u64) -> Self {
        Self(micros)
    }

    /// Get the numeric value of this OrderKey.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// The smallest key strictly greater than this one.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrderKey({})", self.0)
    }
}

/// Version of a delivered snapshot.
///
/// Bumped by the backend on every committed change to a collection.
/// Clients use it to refuse snapshots older than one already applied.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct SnapshotVersion(u64);

impl SnapshotVersion {
    /// Create a new SnapshotVersion with the given value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the numeric value of this version.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Version representing "nothing applied yet".
    pub fn zero() -> Self {
        Self(0)
    }

    /// Increment the version by one.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for SnapshotVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for SnapshotVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SnapshotVersion({})", self.0)
    }
}
