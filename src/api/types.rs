//! Types for the wallet HTTP API: snapshots, tickets and their errors

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// One of the three views kept in sync with the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Wallet,
    Ledger,
    Notifications,
}

impl View {
    pub const ALL: [View; 3] = [View::Wallet, View::Ledger, View::Notifications];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Wallet => "wallet",
            View::Ledger => "ledger",
            View::Notifications => "notifications",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wallet summary for a user, read from the user document.
///
/// Fields of the user document other than these three are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    /// The user's rank name.
    pub rank: String,
    /// Credit count, never negative.
    #[serde(default)]
    pub credits: u64,
    /// Pay balance.
    #[serde(default)]
    pub balance: f64,
}

/// Kind of a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEntryType {
    /// Reward paid out on an approved ticket
    Payment,
    /// Manual adjustment by an operator
    ManualAdjustment,
    /// Any type this client does not know about
    Other(String),
}

impl LedgerEntryType {
    pub fn as_str(&self) -> &str {
        match self {
            LedgerEntryType::Payment => "payment",
            LedgerEntryType::ManualAdjustment => "manual_adj",
            LedgerEntryType::Other(name) => name,
        }
    }
}

impl From<&str> for LedgerEntryType {
    fn from(value: &str) -> Self {
        match value {
            "payment" => LedgerEntryType::Payment,
            "manual_adj" => LedgerEntryType::ManualAdjustment,
            other => LedgerEntryType::Other(other.to_string()),
        }
    }
}

impl Serialize for LedgerEntryType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LedgerEntryType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(LedgerEntryType::from(value.as_str()))
    }
}

/// One row of the transaction ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// When the transaction was recorded (server UTC).
    #[serde(rename = "ts", default)]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(rename = "type")]
    pub entry_type: LedgerEntryType,
    #[serde(rename = "amount_cr", default)]
    pub amount_credits: i64,
    #[serde(default)]
    pub amount_pay: f64,
}

/// A notification addressed to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "ts", default)]
    pub timestamp: Option<NaiveDateTime>,
    pub message: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub ticket_id: Option<String>,
}

/// Ticket fields sent on creation.
#[derive(Debug, Clone, Serialize)]
pub struct NewTicket {
    pub title: String,
    pub body_md: String,
    pub category: String,
    pub sub_category: String,
    pub author_id: String,
    pub assignee_id: String,
    pub target_rank: String,
}

/// Reward attached when a ticket is submitted for review.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TicketReward {
    pub reward_credits: i64,
    pub reward_pay: f64,
}

/// Ticket as returned by the API. Only the fields the client reads are kept.
#[derive(Debug, Clone, Deserialize)]
pub struct Ticket {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Error types for snapshot fetches
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    StatusError { status: u16, url: String },

    #[error("Invalid URL: {0}")]
    UrlError(String),

    /// A fetch was requested without an identity. This is a caller bug, no request is made.
    #[error("Snapshot requested without an identity")]
    EmptyIdentity,
}

/// Error types for the ticket flow
#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    #[error("Ticket creation failed: {0}")]
    CreateFailed(#[source] SnapshotError),

    #[error("Ticket {ticket_id} was created but submission failed: {source}")]
    SubmitFailed {
        ticket_id: String,
        #[source]
        source: SnapshotError,
    },

    #[error("Cannot file a ticket without an identity")]
    EmptyIdentity,
}
