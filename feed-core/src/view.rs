//! Presenter-facing classification of feed entries.

use feed_types::{AuthorId, FeedEntry};

/// Which side of the conversation an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Written by this session's identity.
    Mine,
    /// Written by anyone else, including the welcome sentinel.
    Other,
}

/// Classify an entry against the session identity.
pub fn classify(entry: &FeedEntry, identity: &AuthorId) -> Side {
    if &entry.author_id == identity {
        Side::Mine
    } else {
        Side::Other
    }
}
