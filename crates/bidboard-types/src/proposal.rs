//! Proposal types for the marketplace.
//!
//! A proposal is one provider's bid against an order. This module also holds
//! the derived, never-persisted ranking rows and the aggregate insights shown
//! next to a ranking.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::utils::wire;
use crate::{OrderId, ProposalId, UserId};

/// One provider's bid against an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
	#[serde(deserialize_with = "wire::id")]
	pub id: ProposalId,
	#[serde(deserialize_with = "wire::id")]
	pub order_id: OrderId,
	#[serde(deserialize_with = "wire::id")]
	pub provider_id: UserId,
	#[serde(
		deserialize_with = "wire::amount",
		serialize_with = "wire::serialize_amount"
	)]
	pub price: Decimal,
	/// The provider's proposed completion time.
	pub deadline: ProposedDeadline,
	pub description: String,
	pub status: ProposalStatus,
	#[serde(default, deserialize_with = "wire::opt_timestamp")]
	pub created_at: Option<DateTime<Utc>>,
	#[serde(default, deserialize_with = "wire::opt_timestamp")]
	pub updated_at: Option<DateTime<Utc>>,
}

impl Proposal {
	/// Pending and accepted proposals are active; they count towards the
	/// one-per-provider rule and take part in the ranking.
	pub fn is_active(&self) -> bool {
		matches!(
			self.status,
			ProposalStatus::Pending | ProposalStatus::Accepted
		)
	}
}

/// Status of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
	Pending,
	Accepted,
	Rejected,
	Withdrawn,
}

impl ProposalStatus {
	/// Accepted, rejected and withdrawn proposals never change again.
	pub fn is_terminal(&self) -> bool {
		!matches!(self, ProposalStatus::Pending)
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			ProposalStatus::Pending => "pending",
			ProposalStatus::Accepted => "accepted",
			ProposalStatus::Rejected => "rejected",
			ProposalStatus::Withdrawn => "withdrawn",
		}
	}
}

impl fmt::Display for ProposalStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A provider's proposed completion time.
///
/// The backend stores this as free text ("12 dias") or as a bare day count.
/// The raw text is kept for display and resubmission; [`ProposedDeadline::days`]
/// applies the canonical parsing rule used for ranking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ProposedDeadline(String);

impl ProposedDeadline {
	pub fn new(text: impl Into<String>) -> Self {
		Self(text.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Day count: the first run of ASCII digits in the text, if any.
	pub fn days(&self) -> Option<u32> {
		wire::leading_day_count(&self.0)
	}

	pub fn is_blank(&self) -> bool {
		self.0.trim().is_empty()
	}
}

impl fmt::Display for ProposedDeadline {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for ProposedDeadline {
	fn from(text: &str) -> Self {
		Self::new(text)
	}
}

impl From<u32> for ProposedDeadline {
	fn from(days: u32) -> Self {
		Self(days.to_string())
	}
}

impl<'de> Deserialize<'de> for ProposedDeadline {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		// Numbers are accepted as-is and kept in their textual form.
		wire::id(deserializer).map(ProposedDeadline)
	}
}

/// Fields a provider supplies when submitting or updating a proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalFields {
	#[serde(
		deserialize_with = "wire::amount",
		serialize_with = "wire::serialize_amount"
	)]
	pub price: Decimal,
	pub deadline: ProposedDeadline,
	pub description: String,
}

/// A proposal together with its derived ranking facts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedProposal {
	/// 1-based position in the ranking.
	pub rank: usize,
	/// Price is at or below the order's budget.
	pub is_winning: bool,
	/// Proposal belongs to the viewing provider.
	pub is_mine: bool,
	pub proposal: Proposal,
}

/// Aggregates over the ranked proposals of an order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProposalInsights {
	pub count: usize,
	pub lowest_price: Option<Decimal>,
	pub average_price: Option<Decimal>,
	/// Average over the proposals whose deadline yields a day count.
	pub average_deadline_days: Option<Decimal>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_decode_backend_proposal() {
		let proposal: Proposal = serde_json::from_str(
			r#"{"id": 5, "order_id": 12, "provider_id": 40, "price": 2800,
			"deadline": "12 dias", "description": "Tinta premium", "status": "pending"}"#,
		)
		.unwrap();
		assert_eq!(proposal.id, "5");
		assert_eq!(proposal.deadline.days(), Some(12));
		assert!(proposal.is_active());

		let numeric: Proposal = serde_json::from_str(
			r#"{"id": "p2", "order_id": "12", "provider_id": "41", "price": "2900.00",
			"deadline": 10, "description": "Acabamento", "status": "withdrawn"}"#,
		)
		.unwrap();
		assert_eq!(numeric.deadline.as_str(), "10");
		assert_eq!(numeric.deadline.days(), Some(10));
		assert!(!numeric.is_active());
	}

	#[test]
	fn test_deadline_serializes_as_text() {
		let deadline = ProposedDeadline::from(8);
		assert_eq!(serde_json::to_string(&deadline).unwrap(), "\"8\"");
		assert!(ProposedDeadline::new("   ").is_blank());
		assert_eq!(ProposedDeadline::new("a combinar").days(), None);
	}

	#[test]
	fn test_terminal_statuses() {
		assert!(!ProposalStatus::Pending.is_terminal());
		assert!(ProposalStatus::Accepted.is_terminal());
		assert!(ProposalStatus::Rejected.is_terminal());
		assert!(ProposalStatus::Withdrawn.is_terminal());
	}
}
