//! Order types for the marketplace.
//!
//! An order is a client's request for a service and the root entity of the
//! bidding workflow. This module defines the order itself, its status enum,
//! the fields a client supplies on creation and the listing filters.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::wire;
use crate::{OrderId, ProposalId, UserId};

/// Smallest accepted order deadline, in days.
pub const MIN_DEADLINE_DAYS: u32 = 1;
/// Largest accepted order deadline, in days.
pub const MAX_DEADLINE_DAYS: u32 = 365;

/// A client's request for a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
	/// Server-assigned identifier.
	#[serde(deserialize_with = "wire::id")]
	pub id: OrderId,
	/// The client that owns this order.
	#[serde(deserialize_with = "wire::id")]
	pub client_id: UserId,
	pub title: String,
	/// Free-text category tag.
	pub category: String,
	pub description: String,
	/// Maximum amount the client is willing to pay.
	#[serde(
		deserialize_with = "wire::amount",
		serialize_with = "wire::serialize_amount"
	)]
	pub budget: Decimal,
	/// Expected completion time in days.
	#[serde(deserialize_with = "wire::days")]
	pub deadline: u32,
	/// Free-text service location.
	pub address: String,
	pub status: OrderStatus,
	/// Set once a proposal is accepted.
	#[serde(default, deserialize_with = "wire::opt_id")]
	pub accepted_proposal_id: Option<ProposalId>,
	#[serde(default, deserialize_with = "wire::opt_timestamp")]
	pub auction_started_at: Option<DateTime<Utc>>,
	#[serde(default, deserialize_with = "wire::opt_timestamp")]
	pub auction_ends_at: Option<DateTime<Utc>>,
	/// Opaque attachment references.
	#[serde(default)]
	pub attachments: Vec<String>,
	#[serde(default, deserialize_with = "wire::opt_timestamp")]
	pub created_at: Option<DateTime<Utc>>,
	#[serde(default, deserialize_with = "wire::opt_timestamp")]
	pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
	/// True iff both auction timestamps are present and `now` falls inside the window.
	pub fn has_active_auction(&self, now: DateTime<Utc>) -> bool {
		match (self.auction_started_at, self.auction_ends_at) {
			(Some(start), Some(end)) => start <= now && now <= end,
			_ => false,
		}
	}
}

/// Status of an order.
///
/// Transitions only move forward: `open -> in_progress -> completed`, or
/// `open | in_progress -> cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
	/// Accepting proposals.
	Open,
	/// A proposal has been accepted and work is underway.
	InProgress,
	/// Work is done.
	Completed,
	/// Closed by the client before completion.
	Cancelled,
}

impl OrderStatus {
	/// Completed and cancelled orders accept no further operation.
	pub fn is_terminal(&self) -> bool {
		matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
	}

	/// Wire representation.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Open => "open",
			OrderStatus::InProgress => "in_progress",
			OrderStatus::Completed => "completed",
			OrderStatus::Cancelled => "cancelled",
		}
	}

	/// Label shown to end users.
	pub fn label(&self) -> &'static str {
		match self {
			OrderStatus::Open => "Aguardando propostas",
			OrderStatus::InProgress => "Em andamento",
			OrderStatus::Completed => "Concluído",
			OrderStatus::Cancelled => "Cancelado",
		}
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for OrderStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"open" => Ok(Self::Open),
			"in_progress" => Ok(Self::InProgress),
			"completed" => Ok(Self::Completed),
			"cancelled" => Ok(Self::Cancelled),
			other => Err(format!("unknown order status '{}'", other)),
		}
	}
}

/// Fields a client supplies when creating an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFields {
	pub title: String,
	pub category: String,
	pub description: String,
	#[serde(
		deserialize_with = "wire::amount",
		serialize_with = "wire::serialize_amount"
	)]
	pub budget: Decimal,
	/// Days, in `MIN_DEADLINE_DAYS..=MAX_DEADLINE_DAYS`.
	pub deadline: u32,
	pub address: String,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub attachments: Vec<String>,
}

/// Filter for a client's own orders (`GET /orders`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrderFilter {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub status: Option<OrderStatus>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub category: Option<String>,
}

impl OrderFilter {
	pub fn matches(&self, order: &Order) -> bool {
		self.status.is_none_or(|status| order.status == status)
			&& self
				.category
				.as_deref()
				.is_none_or(|category| order.category.eq_ignore_ascii_case(category))
	}
}

/// Filter for open orders visible to providers (`GET /orders/available`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AvailableOrderFilter {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub category: Option<String>,
	/// Postal code used by the backend for proximity filtering.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cep: Option<String>,
}

/// Actions a client may take on an order in its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
	StartAuction,
	AcceptProposal,
	Complete,
	Close,
}
