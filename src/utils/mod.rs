//!
//! Utility module for the wallet client.
//!
//! Re-exports formatting helpers used when rendering views to the terminal.
/// Formatting of amounts and timestamps for display
pub mod format;

pub use format::{format_pay, format_timestamp};
