use crate::api::{LedgerEntry, Notification, SnapshotError, View, WalletSnapshot};
use crate::identity::Identity;
use crate::utils::{format_pay, format_timestamp};

use tracing::{info, warn};

/// Consumer of fresh views.
///
/// The engine only calls a sink with data fetched for the identity that is current at delivery
/// time. Sinks are passive: they must not block and they cannot influence synchronization.
pub trait ViewSink: Send + 'static {
	fn on_wallet(&self, identity: &Identity, wallet: WalletSnapshot);

	fn on_ledger(&self, identity: &Identity, entries: Vec<LedgerEntry>);

	fn on_notifications(&self, identity: &Identity, notifications: Vec<Notification>);

	/// A fetch for `view` failed; whatever the sink shows for it is now stale.
	fn on_fetch_error(&self, identity: &Identity, view: View, error: &SnapshotError);

	/// The identity was cleared; every view should be emptied.
	fn on_cleared(&self);

	/// Live updates paused (`false`) or resumed (`true`).
	fn on_live_status(&self, _live: bool) {}
}

/// Renders views as log lines.
#[derive(Debug, Clone, Default)]
pub struct TerminalSink;

impl ViewSink for TerminalSink {
	fn on_wallet(&self, identity: &Identity, wallet: WalletSnapshot) {
		info!(
			"[{}] {} \u{25B2}  Credits: {}  Balance: {}",
			identity,
			wallet.rank,
			wallet.credits,
			format_pay(wallet.balance)
		);
	}

	fn on_ledger(&self, identity: &Identity, entries: Vec<LedgerEntry>) {
		info!("[{}] Ledger ({} entries)", identity, entries.len());
		for entry in &entries {
			info!(
				"   {}  {:<12} {:>8} cr  {:>10}",
				format_timestamp(entry.timestamp),
				entry.entry_type.as_str(),
				entry.amount_credits,
				format_pay(entry.amount_pay)
			);
		}
	}

	fn on_notifications(&self, identity: &Identity, notifications: Vec<Notification>) {
		let unread = notifications.iter().filter(|n| !n.read).count();
		info!(
			"[{}] Notifications ({} total, {} unread)",
			identity,
			notifications.len(),
			unread
		);
		for notification in &notifications {
			info!(
				"   {} {} {}",
				if notification.read { " " } else { "*" },
				format_timestamp(notification.timestamp),
				notification.message
			);
		}
	}

	fn on_fetch_error(&self, identity: &Identity, view: View, error: &SnapshotError) {
		warn!("[{}] Could not refresh {}: {}", identity, view, error);
	}

	fn on_cleared(&self) {
		info!("No active user; views cleared");
	}

	fn on_live_status(&self, live: bool) {
		if live {
			info!("Live updates active");
		} else {
			warn!("Live updates paused, reconnecting");
		}
	}
}
