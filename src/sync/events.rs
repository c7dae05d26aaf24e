//! Engine inputs and the event-to-view mapping.
//!
//! Everything that can change engine state is handled on the engine's own task: identity
//! changes arrive as `EngineInput`, fetch completions as `FetchOutcome` from spawned fetch
//! tasks, and channel notices from the active subscription.

use crate::api::{LedgerEntry, Notification, SnapshotError, View, WalletSnapshot};
use crate::feed::EventKind;
use crate::identity::Identity;
use crate::sync::pending::ViewSet;

/// Requests posted to the engine task
pub enum EngineInput {
    /// The active identity changed (possibly to the same value, which forces a full refresh)
    IdentityChanged(Identity),
    /// Stop the engine
    Shutdown,
}

/// A freshly fetched view
#[derive(Debug, Clone)]
pub enum Snapshot {
    Wallet(WalletSnapshot),
    Ledger(Vec<LedgerEntry>),
    Notifications(Vec<Notification>),
}

/// Result of one fetch, tagged with the context that requested it.
pub struct FetchOutcome {
    /// Engine generation at the time the fetch was issued
    pub generation: u64,
    pub identity: Identity,
    pub view: View,
    pub result: Result<Snapshot, SnapshotError>,
}

/// Views made stale by an event of the given kind.
///
/// Unknown kinds map to the empty set: they are ignored rather than treated as errors, so
/// new server-side events never break older clients.
pub fn affected_views(kind: &EventKind) -> ViewSet {
    match kind {
        EventKind::CreditsUpdate | EventKind::RewardGranted => {
            ViewSet::from_views(&[View::Wallet, View::Ledger])
        }
        EventKind::Notify => ViewSet::from_views(&[View::Notifications]),
        EventKind::Unknown(_) => ViewSet::empty(),
    }
}
