//! Marketplace orchestrator.
//!
//! [`Marketplace`] is the entry point for every user-facing operation. Each
//! mutation reads the authoritative order and proposal set, checks the move
//! locally against the lifecycle and resolver rules, and only then calls the
//! backend. Local checks are advisory; the backend has the final word and a
//! `Conflict` from it means the caller should refetch and try again.
//!
//! Nothing is retried here.

use bidboard_api::MarketplaceInterface;
use bidboard_types::{
	truncate_id, AvailableOrderFilter, Entity, MarketError, Order, OrderAction, OrderFields,
	OrderFilter, OrderStatus, Proposal, ProposalFields, ProposalInsights, RankedProposal, Role,
	Session,
};
use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

use crate::resolver::{self, SubmissionPlan};
use crate::{lifecycle, ranking};

/// Result of [`Marketplace::submit_or_update_proposal`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "proposal", rename_all = "snake_case")]
pub enum SubmissionOutcome {
	Created(Proposal),
	Updated(Proposal),
}

impl SubmissionOutcome {
	pub fn proposal(&self) -> &Proposal {
		match self {
			SubmissionOutcome::Created(p) | SubmissionOutcome::Updated(p) => p,
		}
	}
}

/// Everything an order's ranking screen shows, computed from one fresh read.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRanking {
	pub order: Order,
	pub ranked: Vec<RankedProposal>,
	/// The viewing provider's rank, if they bid.
	pub my_position: Option<usize>,
	pub insights: ProposalInsights,
	pub auction_active: bool,
	/// Actions open to the viewer; empty unless they own the order.
	pub actions: Vec<OrderAction>,
}

fn require_role(session: &Session, role: Role) -> Result<(), MarketError> {
	if session.role() != role {
		return Err(MarketError::validation(
			"role",
			format!(
				"this action requires the {} profile, current profile is {}",
				role,
				session.role()
			),
		));
	}
	Ok(())
}

pub struct Marketplace {
	backend: Arc<dyn MarketplaceInterface>,
	auction_duration: Duration,
}

impl Marketplace {
	pub fn new(backend: Arc<dyn MarketplaceInterface>, auction_duration: Duration) -> Self {
		Self {
			backend,
			auction_duration,
		}
	}

	/// Fresh order plus its full proposal set.
	async fn snapshot(
		&self,
		session: &Session,
		order_id: &str,
	) -> Result<(Order, Vec<Proposal>), MarketError> {
		let order = self.backend.get_order(session, order_id).await?;
		let proposals = self.backend.list_proposals(session, order_id).await?;
		Ok((order, proposals))
	}

	async fn proposal_in(
		&self,
		session: &Session,
		order_id: &str,
		proposal_id: &str,
	) -> Result<(Order, Proposal), MarketError> {
		let (order, proposals) = self.snapshot(session, order_id).await?;
		let proposal = proposals
			.into_iter()
			.find(|p| p.id == proposal_id)
			.ok_or_else(|| MarketError::not_found(Entity::Proposal, proposal_id))?;
		Ok((order, proposal))
	}

	#[instrument(skip_all, fields(user_id = %truncate_id(session.user_id())))]
	pub async fn create_order(
		&self,
		session: &Session,
		fields: &OrderFields,
	) -> Result<Order, MarketError> {
		require_role(session, Role::Client)?;
		lifecycle::validate_order_fields(fields)
			.inspect_err(|e| tracing::warn!(error = %e, "Order rejected locally"))?;
		let order = self.backend.create_order(session, fields).await?;
		tracing::info!(order_id = %truncate_id(&order.id), "Order created");
		Ok(order)
	}

	pub async fn list_orders(
		&self,
		session: &Session,
		filter: &OrderFilter,
	) -> Result<Vec<Order>, MarketError> {
		self.backend.list_orders(session, filter).await
	}

	pub async fn list_available_orders(
		&self,
		session: &Session,
		filter: &AvailableOrderFilter,
	) -> Result<Vec<Order>, MarketError> {
		require_role(session, Role::Provider)?;
		self.backend.list_available_orders(session, filter).await
	}

	pub async fn get_order(&self, session: &Session, order_id: &str) -> Result<Order, MarketError> {
		self.backend.get_order(session, order_id).await
	}

	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn start_auction(&self, session: &Session, order_id: &str) -> Result<Order, MarketError> {
		require_role(session, Role::Client)?;
		let order = self.backend.get_order(session, order_id).await?;
		lifecycle::start_auction(&order, Utc::now(), self.auction_duration)
			.inspect_err(|e| tracing::warn!(error = %e, "Auction not started"))?;

		let order = self.backend.start_auction(session, order_id).await?;
		tracing::info!(ends_at = ?order.auction_ends_at, "Auction started");
		Ok(order)
	}

	/// Accepts a proposal and returns the order as the backend now sees it.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), proposal_id = %truncate_id(proposal_id)))]
	pub async fn accept_proposal(
		&self,
		session: &Session,
		order_id: &str,
		proposal_id: &str,
	) -> Result<Order, MarketError> {
		require_role(session, Role::Client)?;
		let (order, proposal) = self.proposal_in(session, order_id, proposal_id).await?;
		lifecycle::accept_proposal(&order, &proposal)
			.inspect_err(|e| tracing::warn!(error = %e, "Acceptance rejected locally"))?;

		self.backend.accept_proposal(session, proposal_id).await?;
		let order = self.backend.get_order(session, order_id).await?;
		tracing::info!(status = %order.status, "Proposal accepted");
		Ok(order)
	}

	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), proposal_id = %truncate_id(proposal_id)))]
	pub async fn reject_proposal(
		&self,
		session: &Session,
		order_id: &str,
		proposal_id: &str,
	) -> Result<Proposal, MarketError> {
		require_role(session, Role::Client)?;
		let (order, proposal) = self.proposal_in(session, order_id, proposal_id).await?;
		lifecycle::reject_proposal(&order, &proposal)
			.inspect_err(|e| tracing::warn!(error = %e, "Rejection refused locally"))?;

		let proposal = self.backend.reject_proposal(session, proposal_id).await?;
		tracing::info!("Proposal rejected");
		Ok(proposal)
	}

	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), proposal_id = %truncate_id(proposal_id)))]
	pub async fn withdraw_proposal(
		&self,
		session: &Session,
		order_id: &str,
		proposal_id: &str,
	) -> Result<Proposal, MarketError> {
		require_role(session, Role::Provider)?;
		let (order, proposal) = self.proposal_in(session, order_id, proposal_id).await?;
		lifecycle::withdraw_proposal(&order, &proposal, session.user_id())
			.inspect_err(|e| tracing::warn!(error = %e, "Withdrawal refused locally"))?;

		let proposal = self.backend.withdraw_proposal(session, proposal_id).await?;
		tracing::info!("Proposal withdrawn");
		Ok(proposal)
	}

	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn close_order(&self, session: &Session, order_id: &str) -> Result<Order, MarketError> {
		require_role(session, Role::Client)?;
		let order = self.backend.get_order(session, order_id).await?;
		lifecycle::close_order(&order)
			.inspect_err(|e| tracing::warn!(error = %e, "Close refused locally"))?;

		let order = self
			.backend
			.update_order_status(session, order_id, OrderStatus::Cancelled)
			.await?;
		tracing::info!("Order closed");
		Ok(order)
	}

	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn complete_order(
		&self,
		session: &Session,
		order_id: &str,
	) -> Result<Order, MarketError> {
		require_role(session, Role::Client)?;
		let order = self.backend.get_order(session, order_id).await?;
		lifecycle::complete_order(&order)
			.inspect_err(|e| tracing::warn!(error = %e, "Completion refused locally"))?;

		let order = self
			.backend
			.update_order_status(session, order_id, OrderStatus::Completed)
			.await?;
		tracing::info!("Order completed");
		Ok(order)
	}

	/// Creates the provider's proposal, or revises their pending one.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn submit_or_update_proposal(
		&self,
		session: &Session,
		order_id: &str,
		fields: &ProposalFields,
	) -> Result<SubmissionOutcome, MarketError> {
		require_role(session, Role::Provider)?;
		let (order, proposals) = self.snapshot(session, order_id).await?;
		let plan = resolver::plan_submission(&order, &proposals, session.user_id(), fields)
			.inspect_err(|e| tracing::warn!(error = %e, "Submission refused locally"))?;

		match plan {
			SubmissionPlan::Create => {
				let proposal = self.backend.create_proposal(session, order_id, fields).await?;
				tracing::info!(proposal_id = %truncate_id(&proposal.id), "Proposal submitted");
				Ok(SubmissionOutcome::Created(proposal))
			},
			SubmissionPlan::Update { proposal_id } => {
				let proposal = self
					.backend
					.update_proposal(session, &proposal_id, fields)
					.await?;
				tracing::info!(proposal_id = %truncate_id(&proposal.id), "Proposal updated");
				Ok(SubmissionOutcome::Updated(proposal))
			},
		}
	}

	/// Ranks the order's proposals from a fresh read.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn ranking(&self, session: &Session, order_id: &str) -> Result<OrderRanking, MarketError> {
		let (order, proposals) = self.snapshot(session, order_id).await?;
		let now = Utc::now();
		let viewer = (session.role() == Role::Provider).then(|| session.user_id().as_str());

		let ranked = ranking::rank_proposals(&order, &proposals, viewer);
		let my_position =
			viewer.and_then(|viewer| ranking::my_position(&order, &proposals, viewer));
		let insights = ranking::insights(&ranked);
		let actions = if order.client_id == *session.user_id() {
			lifecycle::available_actions(&order, now)
		} else {
			Vec::new()
		};
		tracing::debug!(count = ranked.len(), "Ranking computed");

		Ok(OrderRanking {
			auction_active: lifecycle::is_auction_active(&order, now),
			order,
			ranked,
			my_position,
			insights,
			actions,
		})
	}
}
