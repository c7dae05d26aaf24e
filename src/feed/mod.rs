//! Server push feed
//!
//! This module provides the WebSocket event channel and the event types it delivers. The feed
//! is system-wide: every client sees every user's events, and filtering by identity is left to
//! the sync engine.

/// WebSocket connection, reconnect policy and subscriptions
mod channel;
/// Event and notice type definitions
mod types;

pub use channel::{BackoffPolicy, EventChannel, EventSource, Subscription};
pub use types::*;
