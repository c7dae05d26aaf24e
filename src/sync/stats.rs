//! Refresh statistics for the sync engine.
//!
//! The engine records what it did with every trigger: how many events arrived, how many were
//! filtered out, how many triggers folded into an already-pending refresh, and how many fetches
//! actually went out. The counters make the coalescing and filtering behaviour observable in
//! logs and tests.

use tracing::info;

/// Counters for one engine lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshStats {
    /// Events received from the channel
    pub events_received: usize,
    /// Events dropped because they belong to another identity
    pub events_filtered: usize,
    /// Events of a kind that maps to no view
    pub events_unknown: usize,
    /// View triggers that merged into a refresh already pending
    pub triggers_coalesced: usize,
    /// Fetches sent to the snapshot service
    pub fetches_issued: usize,
    /// Responses dropped because the identity changed while they were in flight
    pub stale_responses: usize,
    /// Fetches that failed
    pub fetch_failures: usize,
    /// Full refreshes caused by identity changes or reconnects
    pub full_refreshes: usize,
}

impl RefreshStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event(&mut self) {
        self.events_received += 1;
    }

    pub fn record_filtered(&mut self) {
        self.events_filtered += 1;
    }

    pub fn record_unknown(&mut self) {
        self.events_unknown += 1;
    }

    pub fn record_coalesced(&mut self, count: usize) {
        self.triggers_coalesced += count;
    }

    pub fn record_fetch(&mut self) {
        self.fetches_issued += 1;
    }

    pub fn record_stale(&mut self) {
        self.stale_responses += 1;
    }

    pub fn record_failure(&mut self) {
        self.fetch_failures += 1;
    }

    pub fn record_full_refresh(&mut self) {
        self.full_refreshes += 1;
    }

    /// Get a human-readable summary of the counters
    pub fn summary(&self) -> String {
        format!(
            "{} events ({} for other users, {} unknown), {} fetches ({} coalesced triggers, {} full refreshes), {} stale responses, {} failures",
            self.events_received,
            self.events_filtered,
            self.events_unknown,
            self.fetches_issued,
            self.triggers_coalesced,
            self.full_refreshes,
            self.stale_responses,
            self.fetch_failures
        )
    }

    pub fn log_summary(&self, context: &str) {
        info!("Sync stats {}: {}", context, self.summary());
    }
}
