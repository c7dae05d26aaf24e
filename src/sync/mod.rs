//! Live Synchronization Module
//!
//! This module keeps the wallet, ledger and notification views of the active identity fresh.
//! It is composed of several submodules:
//!
//! - `engine`: The coordinator. It reacts to identity changes, channel notices and events, and
//!   decides which views to fetch and when.
//! - `events`: Engine inputs, fetch outcomes and the mapping from event kinds to stale views.
//! - `pending`: The small view set used for coalescing and in-flight bookkeeping.
//! - `sink`: The trait views are delivered through, plus a terminal renderer.
//! - `stats`: Counters describing what the engine did with its triggers.

/// Main coordinator for live synchronization
pub mod engine;
/// Engine inputs and event-to-view mapping
pub mod events;
/// View sets for coalescing
pub mod pending;
/// View delivery
pub mod sink;
/// Refresh statistics
pub mod stats;

pub use engine::{EngineConfig, SyncEngine, SyncHandle};
pub use sink::TerminalSink;
pub use stats::RefreshStats;
