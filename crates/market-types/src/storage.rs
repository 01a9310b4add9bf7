//! Storage-related types for the marketplace.

use std::str::FromStr;

/// Storage namespaces for the different document collections.
///
/// This enum provides type safety for storage operations by replacing
/// string literals with strongly typed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// User documents keyed by user id.
	Users,
	/// Maps a lowercased email to a user id.
	UserByEmail,
	/// Maps an API key to a user id.
	UserByToken,
	/// Project documents keyed by project id.
	Projects,
	/// Order documents keyed by order id.
	Orders,
	/// Maps a project id to the id of its single order.
	OrderByProject,
	/// Direct message documents keyed by message id.
	Messages,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Users => "users",
			StorageKey::UserByEmail => "user_by_email",
			StorageKey::UserByToken => "user_by_token",
			StorageKey::Projects => "projects",
			StorageKey::Orders => "orders",
			StorageKey::OrderByProject => "order_by_project",
			StorageKey::Messages => "messages",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Users,
			Self::UserByEmail,
			Self::UserByToken,
			Self::Projects,
			Self::Orders,
			Self::OrderByProject,
			Self::Messages,
		]
		.into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all().find(|key| key.as_str() == s).ok_or(())
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}
