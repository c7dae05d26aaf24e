//! Live sync engine.
//!
//! The `SyncEngine` owns the current identity and decides, for every identity change, channel
//! notice and pushed event, which views are stale. It then fetches exactly those views. All of
//! its state lives on one tokio task; the outside world talks to it through a `SyncHandle`.
//!
//! The engine is responsible for:
//! - Filtering events down to the current identity
//! - Coalescing bursts of triggers into at most one fetch per view per window
//! - Keeping at most one fetch per view in flight, re-fetching once it lands if a trigger
//!   arrived meanwhile
//! - Discarding responses that were requested for an identity that is no longer current
//! - Running a full refresh after an identity change and every time the push channel opens

use crate::api::{SnapshotSource, View};
use crate::feed::{ChannelNotice, Event, EventSource, Subscription};
use crate::identity::Identity;
use crate::sync::{
    events::{EngineInput, FetchOutcome, Snapshot, affected_views},
    pending::ViewSet,
    sink::ViewSink,
    stats::RefreshStats,
};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Configuration for the sync engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long triggers are collected before pending views are fetched
    pub coalesce_window: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            coalesce_window: Duration::from_millis(25),
        }
    }
}

/// Cheap, cloneable handle for feeding the engine.
#[derive(Clone)]
pub struct SyncHandle {
    inputs: mpsc::UnboundedSender<EngineInput>,
}

impl SyncHandle {
    /// Tell the engine the active identity changed.
    ///
    /// Safe to call from synchronous code such as an `IdentityStore` listener.
    pub fn identity_changed(&self, identity: Identity) {
        if self.inputs.send(EngineInput::IdentityChanged(identity)).is_err() {
            debug!("Sync engine already stopped, ignoring identity change");
        }
    }

    /// Ask the engine to stop after the inputs already queued.
    pub fn shutdown(&self) {
        let _ = self.inputs.send(EngineInput::Shutdown);
    }
}

/// Main sync engine.
pub struct SyncEngine<S, E, V> {
    source: Arc<S>,
    events: Arc<E>,
    sink: V,
    config: EngineConfig,

    current: Identity,
    /// Bumped on every identity change; fetches carry the value they were issued under
    generation: u64,
    subscription: Option<Subscription>,

    /// Views waiting for the next drain
    pending: ViewSet,
    /// Views with a fetch outstanding for the current generation
    in_flight: ViewSet,
    /// When the pending views will be drained, if a drain is scheduled
    drain_at: Option<Instant>,

    inputs: mpsc::UnboundedReceiver<EngineInput>,
    completions_tx: mpsc::UnboundedSender<FetchOutcome>,
    completions: mpsc::UnboundedReceiver<FetchOutcome>,

    stats: RefreshStats,
}

impl<S, E, V> SyncEngine<S, E, V>
where
    S: SnapshotSource + 'static,
    E: EventSource + 'static,
    V: ViewSink,
{
    /// Create an engine and the handle that drives it.
    ///
    /// The engine starts with no identity; send one through the handle.
    pub fn new(source: Arc<S>, events: Arc<E>, sink: V, config: EngineConfig) -> (Self, SyncHandle) {
        let (inputs_tx, inputs) = mpsc::unbounded_channel();
        let (completions_tx, completions) = mpsc::unbounded_channel();

        let engine = Self {
            source,
            events,
            sink,
            config,
            current: Identity::empty(),
            generation: 0,
            subscription: None,
            pending: ViewSet::empty(),
            in_flight: ViewSet::empty(),
            drain_at: None,
            inputs,
            completions_tx,
            completions,
            stats: RefreshStats::new(),
        };

        (engine, SyncHandle { inputs: inputs_tx })
    }

    /// Run the engine on its own task.
    pub fn spawn(self) -> JoinHandle<RefreshStats> {
        tokio::spawn(self.run())
    }

    /// Process inputs until shutdown or until every handle is dropped.
    pub async fn run(mut self) -> RefreshStats {
        info!("Sync engine started");

        loop {
            let drain_at = self.drain_at;

            tokio::select! {
                biased;

                input = self.inputs.recv() => match input {
                    Some(EngineInput::IdentityChanged(identity)) => self.on_identity_changed(identity),
                    Some(EngineInput::Shutdown) | None => break,
                },
                Some(outcome) = self.completions.recv() => self.on_fetch_completed(outcome),
                notice = next_notice(&mut self.subscription) => self.on_notice(notice),
                _ = sleep_until(drain_at) => self.drain(),
            }
        }

        self.subscription = None;
        self.stats.log_summary("at shutdown");
        info!("Sync engine stopped");
        self.stats
    }

    /// Switch to a new identity.
    ///
    /// Anything in flight for the previous identity loses relevance: the old subscription is
    /// dropped with whatever events it still had queued, and responses issued under the old
    /// generation are discarded when they land.
    pub fn on_identity_changed(&mut self, identity: Identity) {
        self.subscription = None;
        self.generation += 1;
        self.pending.clear();
        self.in_flight.clear();
        self.drain_at = None;

        let previous = std::mem::replace(&mut self.current, identity);
        self.stats.log_summary(&format!("before switching away from {}", previous));
        info!(
            "Identity changed from {} to {} (generation {})",
            previous, self.current, self.generation
        );

        if self.current.is_empty() {
            self.sink.on_cleared();
            return;
        }

        self.stats.record_full_refresh();
        self.pending = ViewSet::all();
        self.drain();

        self.subscription = Some(self.events.subscribe());
    }

    /// Handle one pushed event.
    pub fn on_event(&mut self, event: Event) {
        self.stats.record_event();

        if self.current.is_empty() || event.user_id() != &self.current {
            self.stats.record_filtered();
            debug!(
                "Ignoring {} event for {} (current identity {})",
                event.kind,
                event.user_id(),
                self.current
            );
            return;
        }

        let views = affected_views(&event.kind);
        if views.is_empty() {
            self.stats.record_unknown();
            debug!("Ignoring event of unknown kind {}", event.kind);
            return;
        }

        let mut coalesced = 0;
        for view in views.iter() {
            if !self.pending.insert(view) {
                coalesced += 1;
            }
        }
        self.stats.record_coalesced(coalesced);
        debug!(
            "{} event for {} marks {:?} stale",
            event.kind,
            self.current,
            views.iter().collect::<Vec<_>>()
        );

        self.schedule_drain();
    }

    fn on_notice(&mut self, notice: Option<ChannelNotice>) {
        match notice {
            Some(ChannelNotice::Event(event)) => self.on_event(event),
            Some(ChannelNotice::Opened) => {
                // Events sent before this open were never delivered, including those racing
                // the initial fetches; resynchronize everything
                info!("Push channel open, refreshing all views for {}", self.current);
                self.stats.record_full_refresh();
                for view in View::ALL {
                    if !self.pending.insert(view) {
                        self.stats.record_coalesced(1);
                    }
                }
                self.schedule_drain();
                self.sink.on_live_status(true);
            }
            Some(ChannelNotice::Closed) => self.sink.on_live_status(false),
            None => {
                warn!("Push subscription ended; live updates stopped until the identity changes");
                self.subscription = None;
                self.sink.on_live_status(false);
            }
        }
    }

    fn schedule_drain(&mut self) {
        if self.drain_at.is_none() && !self.pending.is_empty() {
            self.drain_at = Some(Instant::now() + self.config.coalesce_window);
        }
    }

    /// Issue one fetch per pending view that has no fetch in flight.
    fn drain(&mut self) {
        self.drain_at = None;

        if self.current.is_empty() {
            self.pending.clear();
            return;
        }

        let ready = self.pending.difference(self.in_flight);
        for view in ready.iter() {
            self.pending.remove(view);
            self.in_flight.insert(view);
            self.spawn_fetch(view);
        }

        if !self.pending.is_empty() {
            debug!(
                "Deferring {:?} until in-flight fetches land",
                self.pending.iter().collect::<Vec<_>>()
            );
        }
    }

    fn spawn_fetch(&mut self, view: View) {
        self.stats.record_fetch();
        debug!("Fetching {} for {}", view, self.current);

        let source = self.source.clone();
        let identity = self.current.clone();
        let generation = self.generation;
        let completions = self.completions_tx.clone();

        tokio::spawn(async move {
            let result = match view {
                View::Wallet => source.fetch_wallet(&identity).await.map(Snapshot::Wallet),
                View::Ledger => source.fetch_ledger(&identity).await.map(Snapshot::Ledger),
                View::Notifications => source
                    .fetch_notifications(&identity)
                    .await
                    .map(Snapshot::Notifications),
            };

            // The engine may be gone; nothing to deliver to then
            let _ = completions.send(FetchOutcome {
                generation,
                identity,
                view,
                result,
            });
        });
    }

    fn on_fetch_completed(&mut self, outcome: FetchOutcome) {
        if outcome.generation != self.generation || outcome.identity != self.current {
            self.stats.record_stale();
            debug!(
                "Discarding stale {} response for {} (generation {}, current {})",
                outcome.view, outcome.identity, outcome.generation, self.generation
            );
            return;
        }

        self.in_flight.remove(outcome.view);

        match outcome.result {
            Ok(Snapshot::Wallet(wallet)) => self.sink.on_wallet(&outcome.identity, wallet),
            Ok(Snapshot::Ledger(entries)) => self.sink.on_ledger(&outcome.identity, entries),
            Ok(Snapshot::Notifications(notifications)) => {
                self.sink.on_notifications(&outcome.identity, notifications)
            }
            Err(e) => {
                self.stats.record_failure();
                warn!(
                    "Failed to refresh {} for {}: {}",
                    outcome.view, outcome.identity, e
                );
                self.sink.on_fetch_error(&outcome.identity, outcome.view, &e);
            }
        }

        if self.pending.contains(outcome.view) {
            self.schedule_drain();
        }
    }
}

async fn next_notice(subscription: &mut Option<Subscription>) -> Option<ChannelNotice> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
