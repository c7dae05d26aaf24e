//! Active user identity.
//!
//! The identity is an opaque token selecting whose wallet, ledger and notifications are shown
//! and whose events are applied. It is only ever changed by explicit user action or by the
//! restore from the persisted slot at startup.

/// Persisted single-value identity slots
mod slot;
/// Observable holder of the current identity
mod store;

pub use slot::{FileIdentitySlot, IdentitySlot, MemoryIdentitySlot};
pub use store::IdentityStore;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque user identifier. The empty identity means "nobody is signed in".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Build an identity from free-form user input, ignoring surrounding whitespace.
	pub fn from_input(input: &str) -> Self {
		Self(input.trim().to_string())
	}

	pub fn empty() -> Self {
		Self(String::new())
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for Identity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.0.is_empty() {
			f.write_str("<none>")
		} else {
			f.write_str(&self.0)
		}
	}
}

impl From<&str> for Identity {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}

impl From<String> for Identity {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}
