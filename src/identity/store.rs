use super::{Identity, IdentitySlot};

use std::sync::{Arc, Mutex, RwLock};
use tracing::{info, warn};

type Listener = Arc<dyn Fn(&Identity) + Send + Sync>;

/// Holder of the current identity with synchronous change notification.
///
/// Listeners are called on the thread that calls `set`, in registration order, after the new
/// value has been persisted. A listener must not call `set` on the same store.
pub struct IdentityStore {
	current: RwLock<Identity>,
	slot: Box<dyn IdentitySlot>,
	listeners: Mutex<Vec<Listener>>,
}

impl IdentityStore {
	/// Create a store starting from the empty identity.
	pub fn new(slot: Box<dyn IdentitySlot>) -> Self {
		Self {
			current: RwLock::new(Identity::empty()),
			slot,
			listeners: Mutex::new(Vec::new()),
		}
	}

	/// Create a store seeded from whatever the slot holds.
	///
	/// An unreadable slot is treated as "no identity".
	pub fn restore(slot: Box<dyn IdentitySlot>) -> Self {
		let initial = match slot.load() {
			Ok(identity) => identity,
			Err(e) => {
				warn!("Failed to restore identity, starting without one: {}", e);
				Identity::empty()
			}
		};

		Self {
			current: RwLock::new(initial),
			..Self::new(slot)
		}
	}

	pub fn get(&self) -> Identity {
		self.current
			.read()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.clone()
	}

	/// Replace the current identity, persist it and notify every listener.
	pub fn set(&self, identity: Identity) {
		*self
			.current
			.write()
			.unwrap_or_else(|poisoned| poisoned.into_inner()) = identity.clone();

		if let Err(e) = self.slot.store(&identity) {
			warn!("Failed to persist identity {}: {}", identity, e);
		}

		info!("Active identity is now {}", identity);

		// Snapshot the listener list so a listener may register another one
		let listeners: Vec<Listener> = self
			.listeners
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.clone();
		for listener in listeners {
			listener(&identity);
		}
	}

	/// Register a listener for future changes.
	pub fn on_change<F>(&self, listener: F)
	where
		F: Fn(&Identity) + Send + Sync + 'static,
	{
		self.listeners
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.push(Arc::new(listener));
	}
}
