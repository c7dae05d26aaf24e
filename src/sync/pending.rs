//! Small set of views, used for the coalescing buffer and in-flight bookkeeping.

use crate::api::View;

/// A set of views stored as a bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewSet(u8);

impl ViewSet {
	pub const fn empty() -> Self {
		Self(0)
	}

	pub fn all() -> Self {
		Self::from_views(&View::ALL)
	}

	pub fn from_views(views: &[View]) -> Self {
		let mut set = Self::empty();
		for view in views {
			set.insert(*view);
		}
		set
	}

	fn bit(view: View) -> u8 {
		match view {
			View::Wallet => 1,
			View::Ledger => 1 << 1,
			View::Notifications => 1 << 2,
		}
	}

	/// Add a view, returning whether it was newly added.
	pub fn insert(&mut self, view: View) -> bool {
		let added = !self.contains(view);
		self.0 |= Self::bit(view);
		added
	}

	pub fn remove(&mut self, view: View) {
		self.0 &= !Self::bit(view);
	}

	pub fn contains(&self, view: View) -> bool {
		self.0 & Self::bit(view) != 0
	}

	pub fn is_empty(&self) -> bool {
		self.0 == 0
	}

	pub fn clear(&mut self) {
		self.0 = 0;
	}

	/// Views in `self` that are not in `other`.
	pub fn difference(&self, other: ViewSet) -> ViewSet {
		ViewSet(self.0 & !other.0)
	}

	/// Views in a fixed order: wallet, ledger, notifications.
	pub fn iter(&self) -> impl Iterator<Item = View> + '_ {
		View::ALL.into_iter().filter(move |view| self.contains(*view))
	}
}
