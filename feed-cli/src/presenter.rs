//! Terminal rendering of the feed.
//!
//! Own messages are right-aligned, everyone else's are left-aligned with the
//! author in front.

use feed_client::{FeedObserver, SyncError};
use feed_core::{classify, Side};
use feed_types::{AuthorId, FeedEntry};
use std::io::Write;

/// Column width used to right-align own messages.
pub const DEFAULT_WIDTH: usize = 60;

/// Render one entry as seen by `viewer`.
pub fn render_entry(entry: &FeedEntry, viewer: Option<&AuthorId>, width: usize) -> String {
    let side = viewer.map_or(Side::Other, |id| classify(entry, id));
    match side {
        Side::Mine => format!("{:>width$}", entry.content, width = width),
        Side::Other if entry.author_id.is_welcome() => format!("* {}", entry.content),
        Side::Other => format!("{}: {}", entry.author_id, entry.content),
    }
}

/// Render the whole feed, one line per entry, under a header.
pub fn render_feed(entries: &[FeedEntry], viewer: Option<&AuthorId>, width: usize) -> String {
    let mut out = format!("--- {} message(s) ---\n", entries.len());
    for entry in entries {
        out.push_str(&render_entry(entry, viewer, width));
        out.push('\n');
    }
    out
}

/// Redraws the feed on stdout after every change.
pub struct TerminalPresenter {
    identity: AuthorId,
    width: usize,
}

impl TerminalPresenter {
    /// Create a presenter rendering from `identity`'s point of view.
    pub fn new(identity: AuthorId) -> Self {
        Self {
            identity,
            width: DEFAULT_WIDTH,
        }
    }
}

impl FeedObserver for TerminalPresenter {
    fn on_feed_changed(&self, entries: &[FeedEntry]) {
        let frame = render_feed(entries, Some(&self.identity), self.width);
        let mut stdout = std::io::stdout().lock();
        // A closed stdout only loses the redraw
        let _ = stdout.write_all(frame.as_bytes());
        let _ = stdout.flush();
    }

    fn on_sync_failed(&self, error: &SyncError) {
        eprintln!("Live feed stopped: {}", error);
    }
}
