//! Storage-related types.

use std::str::FromStr;

/// Storage namespaces for persisted collections.
///
/// Replaces string literals with strongly typed variants; each key maps to a
/// stable namespace used as the key prefix in every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Orders by id.
	Orders,
	/// Proposals by id.
	Proposals,
	/// Index of every order id known to the ledger.
	OrderIndex,
	/// Proposal ids per order id, in submission order.
	OrderProposals,
	/// The persisted login.
	Session,
	/// Users known to the in-process ledger, by email.
	Users,
	/// Ledger-issued credentials, mapping a token to its user id.
	Credentials,
	/// Monotonic id counters of the in-process ledger.
	Sequences,
}

impl StorageKey {
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Orders => "orders",
			StorageKey::Proposals => "proposals",
			StorageKey::OrderIndex => "order_index",
			StorageKey::OrderProposals => "order_proposals",
			StorageKey::Session => "session",
			StorageKey::Users => "users",
			StorageKey::Credentials => "credentials",
			StorageKey::Sequences => "sequences",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Orders,
			Self::Proposals,
			Self::OrderIndex,
			Self::OrderProposals,
			Self::Session,
			Self::Users,
			Self::Credentials,
			Self::Sequences,
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
