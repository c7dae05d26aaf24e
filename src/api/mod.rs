//! Wallet API integration module
//!
//! This module provides the client and types for the request/response side of the wallet
//! service: wallet, ledger and notification snapshots keyed by user, plus the two-step ticket
//! submission flow.

/// HTTP client for snapshot endpoints
mod client;
/// Ticket creation and submission
mod ticket;
/// Type definitions for API data structures
mod types;

pub use client::{SnapshotClient, SnapshotSource};
pub use ticket::{DEFAULT_TARGET_RANK, TicketClient, TicketDraft};
pub use types::*;
