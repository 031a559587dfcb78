//! Order lifecycle rules.
//!
//! Pure functions that validate and apply transitions on orders and
//! proposals. Each function takes the current values by reference and returns
//! the transitioned copies, so a failed transition leaves the caller's
//! snapshot untouched.
//!
//! ```text
//!       create          accept_proposal        complete_order
//! open ───────► open ─────────────────► in_progress ───────────► completed
//!   │                                         │
//!   │  close_order                            │  close_order
//!   ▼                                         ▼
//! cancelled ◄─────────────────────────────────
//! ```

use bidboard_types::{
	Entity, MarketError, Order, OrderAction, OrderFields, OrderId, OrderStatus, Proposal,
	ProposalStatus, UserId, MAX_DEADLINE_DAYS, MIN_DEADLINE_DAYS,
};
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

/// Allowed status changes. Terminal states map to the empty set.
static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
	HashMap::from([
		(
			OrderStatus::Open,
			HashSet::from([OrderStatus::InProgress, OrderStatus::Cancelled]),
		),
		(
			OrderStatus::InProgress,
			HashSet::from([OrderStatus::Completed, OrderStatus::Cancelled]),
		),
		(OrderStatus::Completed, HashSet::new()),
		(OrderStatus::Cancelled, HashSet::new()),
	])
});

pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
	TRANSITIONS
		.get(&from)
		.is_some_and(|allowed| allowed.contains(&to))
}

fn require_text(field: &str, value: &str) -> Result<(), MarketError> {
	if value.trim().is_empty() {
		return Err(MarketError::validation(field, "is required"));
	}
	Ok(())
}

/// Checks the fields of a new order, reporting the first offending field.
pub fn validate_order_fields(fields: &OrderFields) -> Result<(), MarketError> {
	require_text("title", &fields.title)?;
	require_text("category", &fields.category)?;
	require_text("description", &fields.description)?;
	if fields.budget <= Decimal::ZERO {
		return Err(MarketError::validation("budget", "must be greater than zero"));
	}
	if !(MIN_DEADLINE_DAYS..=MAX_DEADLINE_DAYS).contains(&fields.deadline) {
		return Err(MarketError::validation(
			"deadline",
			format!(
				"must be between {} and {} days",
				MIN_DEADLINE_DAYS, MAX_DEADLINE_DAYS
			),
		));
	}
	require_text("address", &fields.address)
}

/// Builds a new `open` order with no accepted proposal and no auction.
pub fn create_order(
	id: impl Into<OrderId>,
	client_id: impl Into<UserId>,
	fields: OrderFields,
	now: DateTime<Utc>,
) -> Result<Order, MarketError> {
	validate_order_fields(&fields)?;
	Ok(Order {
		id: id.into(),
		client_id: client_id.into(),
		title: fields.title.trim().to_string(),
		category: fields.category.trim().to_string(),
		description: fields.description.trim().to_string(),
		budget: fields.budget,
		deadline: fields.deadline,
		address: fields.address.trim().to_string(),
		status: OrderStatus::Open,
		accepted_proposal_id: None,
		auction_started_at: None,
		auction_ends_at: None,
		attachments: fields.attachments,
		created_at: Some(now),
		updated_at: Some(now),
	})
}

/// Opens (or reopens) the auction window `[now, now + duration]`.
pub fn start_auction(
	order: &Order,
	now: DateTime<Utc>,
	duration: Duration,
) -> Result<Order, MarketError> {
	if order.status != OrderStatus::Open {
		return Err(MarketError::invalid_state(
			Entity::Order,
			&order.id,
			OrderStatus::Open.as_str(),
			order.status,
		));
	}
	if duration <= Duration::zero() {
		return Err(MarketError::validation(
			"auction_duration",
			"must be positive",
		));
	}
	let mut next = order.clone();
	next.auction_started_at = Some(now);
	next.auction_ends_at = Some(now + duration);
	Ok(next)
}

pub fn is_auction_active(order: &Order, now: DateTime<Utc>) -> bool {
	order.has_active_auction(now)
}

fn ensure_not_terminal(order: &Order) -> Result<(), MarketError> {
	if order.status.is_terminal() {
		return Err(MarketError::invalid_state(
			Entity::Order,
			&order.id,
			"open or in_progress",
			order.status,
		));
	}
	Ok(())
}

fn ensure_belongs(order: &Order, proposal: &Proposal) -> Result<(), MarketError> {
	if proposal.order_id != order.id {
		return Err(MarketError::not_found(Entity::Proposal, &proposal.id));
	}
	Ok(())
}

/// A proposal that already left `pending` can no longer be decided.
fn ensure_pending(proposal: &Proposal) -> Result<(), MarketError> {
	match proposal.status {
		ProposalStatus::Pending => Ok(()),
		ProposalStatus::Accepted => Err(MarketError::conflict(
			Entity::Proposal,
			&proposal.id,
			"proposal has already been accepted",
		)),
		other => Err(MarketError::invalid_state(
			Entity::Proposal,
			&proposal.id,
			ProposalStatus::Pending.as_str(),
			other,
		)),
	}
}

/// Accepts a pending proposal, moving the order to `in_progress`.
///
/// Other pending proposals of the order are left untouched.
pub fn accept_proposal(
	order: &Order,
	proposal: &Proposal,
) -> Result<(Order, Proposal), MarketError> {
	ensure_not_terminal(order)?;
	ensure_belongs(order, proposal)?;
	if let Some(accepted) = order.accepted_proposal_id.as_deref() {
		return Err(MarketError::conflict(
			Entity::Order,
			&order.id,
			format!("proposal {} has already been accepted", accepted),
		));
	}
	ensure_pending(proposal)?;

	let mut next_order = order.clone();
	next_order.status = OrderStatus::InProgress;
	next_order.accepted_proposal_id = Some(proposal.id.clone());

	let mut next_proposal = proposal.clone();
	next_proposal.status = ProposalStatus::Accepted;
	Ok((next_order, next_proposal))
}

pub fn reject_proposal(order: &Order, proposal: &Proposal) -> Result<Proposal, MarketError> {
	ensure_not_terminal(order)?;
	ensure_belongs(order, proposal)?;
	ensure_pending(proposal)?;

	let mut next = proposal.clone();
	next.status = ProposalStatus::Rejected;
	Ok(next)
}

/// Withdraws the provider's own pending proposal.
pub fn withdraw_proposal(
	order: &Order,
	proposal: &Proposal,
	provider_id: &str,
) -> Result<Proposal, MarketError> {
	ensure_not_terminal(order)?;
	ensure_belongs(order, proposal)?;
	if proposal.provider_id != provider_id {
		return Err(MarketError::validation(
			"provider_id",
			"only the proposal's provider can withdraw it",
		));
	}
	ensure_pending(proposal)?;

	let mut next = proposal.clone();
	next.status = ProposalStatus::Withdrawn;
	Ok(next)
}

fn transition(order: &Order, to: OrderStatus, expected: &str) -> Result<Order, MarketError> {
	if !can_transition(order.status, to) {
		return Err(MarketError::invalid_state(
			Entity::Order,
			&order.id,
			expected,
			order.status,
		));
	}
	let mut next = order.clone();
	next.status = to;
	Ok(next)
}

/// Cancels an open or in-progress order.
pub fn close_order(order: &Order) -> Result<Order, MarketError> {
	transition(order, OrderStatus::Cancelled, "open or in_progress")
}

/// Marks an in-progress order as done.
pub fn complete_order(order: &Order) -> Result<Order, MarketError> {
	transition(order, OrderStatus::Completed, "in_progress")
}

/// Actions the order's owner may take right now.
pub fn available_actions(order: &Order, now: DateTime<Utc>) -> Vec<OrderAction> {
	match order.status {
		OrderStatus::Open => {
			let mut actions = Vec::with_capacity(3);
			if !is_auction_active(order, now) {
				actions.push(OrderAction::StartAuction);
			}
			actions.extend([OrderAction::AcceptProposal, OrderAction::Close]);
			actions
		},
		OrderStatus::InProgress => vec![OrderAction::Complete, OrderAction::Close],
		OrderStatus::Completed | OrderStatus::Cancelled => Vec::new(),
	}
}
