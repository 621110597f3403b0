//! Subscription state machine for livefeed.
//!
//! This module provides a pure, side-effect-free state machine for the
//! lifecycle of one live feed subscription. The state machine takes events
//! as input and produces a new state plus a list of actions to execute.
//!
//! The actual I/O (querying for the sentinel, attaching the listener,
//! notifying the presenter) is performed by feed-client, not by this module.

use feed_types::SnapshotVersion;

/// Subscription state machine - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Nothing requested yet.
    Idle,
    /// Checking for (and possibly creating) the welcome sentinel.
    Bootstrapping,
    /// Listener attached, receiving snapshots.
    Live {
        /// Version of the last applied snapshot.
        version: SnapshotVersion,
    },
    /// Detached by the caller. Terminal.
    Cancelled,
    /// Detached after a transport failure. Terminal; no reconnect.
    Failed {
        /// Error message describing the failure.
        error: String,
    },
}

impl SubscriptionState {
    /// Create a new state machine in the Idle state.
    pub fn new() -> Self {
        Self::Idle
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller (feed-client)
    /// is responsible for executing the returned actions.
    pub fn on_event(self, event: Event) -> (Self, Vec<Action>) {
        match (self, event) {
            // From Idle
            (Self::Idle, Event::SubscribeRequested) => {
                (Self::Bootstrapping, vec![Action::CheckSentinel])
            }

            // From Bootstrapping
            (Self::Bootstrapping, Event::SentinelMissing) => {
                (Self::Bootstrapping, vec![Action::SubmitSentinel])
            }
            (Self::Bootstrapping, Event::BootstrapFinished) => {
                (Self::Bootstrapping, vec![Action::Attach])
            }
            (Self::Bootstrapping, Event::Attached) => (
                Self::Live {
                    version: SnapshotVersion::zero(),
                },
                vec![],
            ),
            (Self::Bootstrapping, Event::AttachFailed { error }) => (
                Self::Failed {
                    error: error.clone(),
                },
                vec![Action::EmitFailed { error }],
            ),

            // From Live
            (Self::Live { version: current }, Event::SnapshotReceived { version }) => {
                if version > current {
                    (
                        Self::Live { version },
                        vec![Action::ApplySnapshot { version }, Action::EmitFeedChanged],
                    )
                } else {
                    // Never regress to an older view
                    (Self::Live { version: current }, vec![])
                }
            }
            (Self::Live { .. }, Event::StreamFailed { error }) => (
                Self::Failed {
                    error: error.clone(),
                },
                vec![Action::Detach, Action::EmitFailed { error }],
            ),

            // Cancellation
            (Self::Idle, Event::CancelRequested) => (Self::Cancelled, vec![]),
            (Self::Bootstrapping | Self::Live { .. }, Event::CancelRequested) => {
                (Self::Cancelled, vec![Action::Detach])
            }

            // Invalid transitions (including anything after Cancelled/Failed) - stay
            (state, _) => (state, vec![]),
        }
    }

    /// Check if the listener is attached.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live { .. })
    }

    /// Check if the subscription can still deliver (not cancelled or failed).
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Idle | Self::Bootstrapping | Self::Live { .. })
    }

    /// Check if the subscription has ended.
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

impl Default for SubscriptionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Events that can occur in the subscription lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Caller asked to subscribe.
    SubscribeRequested,
    /// The sentinel query came back empty.
    SentinelMissing,
    /// Sentinel check is over (found, created, or failed and skipped).
    BootstrapFinished,
    /// The live listener is attached.
    Attached,
    /// Attaching the live listener failed.
    AttachFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// The backend delivered a full snapshot.
    SnapshotReceived {
        /// Backend version of the snapshot.
        version: SnapshotVersion,
    },
    /// The live stream reported an error or closed.
    StreamFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// Caller asked to detach.
    CancelRequested,
}

/// Actions to be executed by feed-client.
///
/// These are instructions, not side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Query the collection for the welcome sentinel.
    CheckSentinel,
    /// Insert the welcome sentinel.
    SubmitSentinel,
    /// Attach the live listener.
    Attach,
    /// Decode the snapshot and replace the store contents.
    ApplySnapshot {
        /// Version being applied.
        version: SnapshotVersion,
    },
    /// Notify the presenter with the new ordered feed.
    EmitFeedChanged,
    /// Notify the presenter that the subscription ended with an error.
    EmitFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// Stop listening.
    Detach,
}
