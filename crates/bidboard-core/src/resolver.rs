//! Resolution of a provider's proposal submission.
//!
//! A provider holds at most one active proposal per order. Submitting again
//! while a pending proposal exists revises it in place instead of creating a
//! second one; an accepted proposal is frozen.

use bidboard_types::{
	Entity, MarketError, Order, OrderId, Proposal, ProposalFields, ProposalId, ProposalStatus,
	UserId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// What a submission turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionPlan {
	/// No active proposal from this provider; create one.
	Create,
	/// Revise the provider's pending proposal.
	Update { proposal_id: ProposalId },
}

pub fn validate_proposal_fields(fields: &ProposalFields) -> Result<(), MarketError> {
	if fields.price <= Decimal::ZERO {
		return Err(MarketError::validation("price", "must be greater than zero"));
	}
	if fields.deadline.is_blank() {
		return Err(MarketError::validation("deadline", "is required"));
	}
	if fields.description.trim().is_empty() {
		return Err(MarketError::validation("description", "is required"));
	}
	Ok(())
}

/// Decides whether `provider_id`'s submission creates or updates.
///
/// `proposals` is the order's current proposal set; inactive entries are
/// ignored so a provider may bid again after withdrawing or being rejected.
pub fn plan_submission(
	order: &Order,
	proposals: &[Proposal],
	provider_id: &str,
	fields: &ProposalFields,
) -> Result<SubmissionPlan, MarketError> {
	validate_proposal_fields(fields)?;
	if order.status.is_terminal() {
		return Err(MarketError::validation(
			"order.status",
			format!("order {} is {} and takes no proposals", order.id, order.status),
		));
	}

	let existing = proposals
		.iter()
		.find(|p| p.order_id == order.id && p.provider_id == provider_id && p.is_active());

	match existing {
		None => Ok(SubmissionPlan::Create),
		Some(p) if p.status == ProposalStatus::Accepted => Err(MarketError::conflict(
			Entity::Proposal,
			&p.id,
			"cannot modify an accepted proposal",
		)),
		Some(p) => Ok(SubmissionPlan::Update {
			proposal_id: p.id.clone(),
		}),
	}
}

/// A new pending proposal.
pub fn draft_proposal(
	id: impl Into<ProposalId>,
	order_id: impl Into<OrderId>,
	provider_id: impl Into<UserId>,
	fields: ProposalFields,
	now: DateTime<Utc>,
) -> Result<Proposal, MarketError> {
	validate_proposal_fields(&fields)?;
	Ok(Proposal {
		id: id.into(),
		order_id: order_id.into(),
		provider_id: provider_id.into(),
		price: fields.price,
		deadline: fields.deadline,
		description: fields.description.trim().to_string(),
		status: ProposalStatus::Pending,
		created_at: Some(now),
		updated_at: Some(now),
	})
}

/// Applies new fields to a pending proposal, keeping its identity.
pub fn revise_proposal(
	proposal: &Proposal,
	fields: ProposalFields,
	now: DateTime<Utc>,
) -> Result<Proposal, MarketError> {
	validate_proposal_fields(&fields)?;
	if proposal.status != ProposalStatus::Pending {
		return Err(MarketError::invalid_state(
			Entity::Proposal,
			&proposal.id,
			ProposalStatus::Pending.as_str(),
			proposal.status,
		));
	}

	Ok(Proposal {
		price: fields.price,
		deadline: fields.deadline,
		description: fields.description.trim().to_string(),
		updated_at: Some(now),
		..proposal.clone()
	})
}
