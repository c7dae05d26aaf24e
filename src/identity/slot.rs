use super::Identity;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info};

const IDENTITY_FILENAME: &str = "identity.json";

/// Errors raised while reading or writing a persisted identity
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),

	#[error("JSON parse error: {0}")]
	JsonError(#[from] serde_json::Error),
}

/// A single persisted string slot holding the last active identity.
pub trait IdentitySlot: Send + Sync {
	/// Read the stored identity. A slot that was never written yields the empty identity.
	fn load(&self) -> Result<Identity, IdentityError>;

	fn store(&self, identity: &Identity) -> Result<(), IdentityError>;
}

/// On-disk layout of the identity file
#[derive(Debug, Serialize, Deserialize)]
struct StoredIdentity {
	user_id: Identity,
	#[serde(default)]
	saved_at: Option<String>,
}

/// File-based implementation of IdentitySlot
pub struct FileIdentitySlot {
	data_dir: PathBuf,
}

impl FileIdentitySlot {
	pub fn new(data_dir: PathBuf) -> Self {
		Self { data_dir }
	}

	fn get_identity_filename(&self) -> PathBuf {
		self.data_dir.join(IDENTITY_FILENAME)
	}
}

impl IdentitySlot for FileIdentitySlot {
	fn load(&self) -> Result<Identity, IdentityError> {
		let filename = self.get_identity_filename();
		if !filename.exists() {
			debug!("No identity file at {:?}", filename);
			return Ok(Identity::empty());
		}

		let contents = std::fs::read_to_string(&filename)?;
		let stored: StoredIdentity = serde_json::from_str(&contents)?;
		info!(
			"Restored identity {} from {:?} (saved at {})",
			stored.user_id,
			filename,
			stored.saved_at.as_deref().unwrap_or("unknown")
		);
		Ok(stored.user_id)
	}

	fn store(&self, identity: &Identity) -> Result<(), IdentityError> {
		std::fs::create_dir_all(&self.data_dir)?;

		let stored = StoredIdentity {
			user_id: identity.clone(),
			saved_at: Some(chrono::Utc::now().to_rfc3339()),
		};

		// Write to a sibling file first so a crash never leaves a truncated slot
		let filename = self.get_identity_filename();
		let tmp_filename = filename.with_extension("json.tmp");
		std::fs::write(&tmp_filename, serde_json::to_string_pretty(&stored)?)?;
		std::fs::rename(&tmp_filename, &filename)?;

		debug!("Saved identity {} to {:?}", identity, filename);
		Ok(())
	}
}

/// In-process slot, used for tests and sessions that should not touch the disk.
#[derive(Default)]
pub struct MemoryIdentitySlot {
	value: Mutex<Identity>,
}

impl MemoryIdentitySlot {
	#[cfg(test)]
	pub fn new(initial: Identity) -> Self {
		Self {
			value: Mutex::new(initial),
		}
	}
}

impl IdentitySlot for MemoryIdentitySlot {
	fn load(&self) -> Result<Identity, IdentityError> {
		Ok(self
			.value
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.clone())
	}

	fn store(&self, identity: &Identity) -> Result<(), IdentityError> {
		*self
			.value
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner()) = identity.clone();
		Ok(())
	}
}
