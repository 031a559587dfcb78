//! In-process marketplace backend on top of [`StorageService`].
//!
//! Every mutation runs under a single write lock and goes through the pure
//! transition functions in [`crate::lifecycle`] and [`crate::resolver`], so
//! the ledger enforces exactly the rules a well-behaved server would.
//!
//! Layout:
//! - `users:<email>` user record
//! - `credentials:<token>` email the token was issued to
//! - `sequences:<name>` last id handed out per entity
//! - `orders:<id>` / `order_index:all` orders and their ids
//! - `proposals:<id>` / `order_proposals:<order_id>` proposals per order

use async_trait::async_trait;
use bidboard_api::{AuthInterface, MarketplaceInterface};
use bidboard_storage::StorageService;
use bidboard_types::{
	AvailableOrderFilter, Entity, MarketError, Order, OrderFields, OrderFilter, OrderId,
	OrderStatus, Proposal, ProposalFields, ProposalId, ProposalStatus, Registration, Role,
	SecretString, Session, StorageKey, User,
};
use chrono::{Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::resolver::{self, SubmissionPlan};
use crate::{lifecycle, storage_error};

const ALL_ORDERS: &str = "all";

pub struct OrderLedger {
	storage: Arc<StorageService>,
	auction_duration: Duration,
	write_lock: Mutex<()>,
}

impl OrderLedger {
	pub fn new(storage: Arc<StorageService>, auction_duration: Duration) -> Self {
		Self {
			storage,
			auction_duration,
			write_lock: Mutex::new(()),
		}
	}

	async fn load<T: DeserializeOwned>(
		&self,
		namespace: StorageKey,
		id: &str,
	) -> Result<Option<T>, MarketError> {
		self.storage
			.retrieve_optional(namespace, id)
			.await
			.map_err(storage_error)
	}

	async fn save<T: Serialize>(
		&self,
		namespace: StorageKey,
		id: &str,
		value: &T,
	) -> Result<(), MarketError> {
		self.storage
			.store(namespace, id, value)
			.await
			.map_err(storage_error)
	}

	/// Hands out the next numeric id for `sequence`. Caller holds the write lock.
	async fn next_id(&self, sequence: &str) -> Result<String, MarketError> {
		let last: u64 = self
			.load(StorageKey::Sequences, sequence)
			.await?
			.unwrap_or(0);
		let next = last + 1;
		self.save(StorageKey::Sequences, sequence, &next).await?;
		Ok(next.to_string())
	}

	async fn ids(&self, namespace: StorageKey, id: &str) -> Result<Vec<String>, MarketError> {
		Ok(self.load(namespace, id).await?.unwrap_or_default())
	}

	async fn push_id(
		&self,
		namespace: StorageKey,
		id: &str,
		value: String,
	) -> Result<(), MarketError> {
		let mut ids = self.ids(namespace, id).await?;
		ids.push(value);
		self.save(namespace, id, &ids).await
	}

	async fn authenticate(&self, session: &Session) -> Result<User, MarketError> {
		let email: Option<String> = self
			.load(StorageKey::Credentials, session.credential.expose_secret())
			.await?;
		let email =
			email.ok_or_else(|| MarketError::Unauthorized("invalid or expired token".into()))?;
		self.load(StorageKey::Users, &email)
			.await?
			.ok_or_else(|| MarketError::Unauthorized("user no longer exists".into()))
	}

	async fn authenticate_as(&self, session: &Session, role: Role) -> Result<User, MarketError> {
		let user = self.authenticate(session).await?;
		if user.role != role {
			return Err(MarketError::Unauthorized(format!(
				"this action requires the {} profile",
				role
			)));
		}
		Ok(user)
	}

	async fn order(&self, order_id: &str) -> Result<Order, MarketError> {
		self.load(StorageKey::Orders, order_id)
			.await?
			.ok_or_else(|| MarketError::not_found(Entity::Order, order_id))
	}

	async fn owned_order(&self, user: &User, order_id: &str) -> Result<Order, MarketError> {
		let order = self.order(order_id).await?;
		if order.client_id != user.id {
			return Err(MarketError::Unauthorized(format!(
				"order {} belongs to another client",
				order_id
			)));
		}
		Ok(order)
	}

	async fn proposal(&self, proposal_id: &str) -> Result<Proposal, MarketError> {
		self.load(StorageKey::Proposals, proposal_id)
			.await?
			.ok_or_else(|| MarketError::not_found(Entity::Proposal, proposal_id))
	}

	async fn proposals_of(&self, order_id: &str) -> Result<Vec<Proposal>, MarketError> {
		let ids: Vec<ProposalId> = self.ids(StorageKey::OrderProposals, order_id).await?;
		let mut proposals = Vec::with_capacity(ids.len());
		for id in ids {
			proposals.push(self.proposal(&id).await?);
		}
		Ok(proposals)
	}

	async fn all_orders(&self) -> Result<Vec<Order>, MarketError> {
		let ids: Vec<OrderId> = self.ids(StorageKey::OrderIndex, ALL_ORDERS).await?;
		let mut orders = Vec::with_capacity(ids.len());
		for id in ids {
			orders.push(self.order(&id).await?);
		}
		Ok(orders)
	}

	async fn save_order(&self, order: &Order) -> Result<(), MarketError> {
		self.save(StorageKey::Orders, &order.id, order).await
	}

	async fn save_proposal(&self, proposal: &Proposal) -> Result<(), MarketError> {
		self.save(StorageKey::Proposals, &proposal.id, proposal).await
	}

	/// Creates a client account. Caller holds the write lock.
	async fn new_user(
		&self,
		name: String,
		email: String,
		phone: Option<String>,
	) -> Result<User, MarketError> {
		let user = User {
			id: self.next_id("users").await?,
			name,
			email,
			role: Role::Client,
			phone,
			address: None,
		};
		self.save(StorageKey::Users, &user.email, &user).await?;
		Ok(user)
	}

	async fn issue_session(&self, user: User) -> Result<Session, MarketError> {
		let token = Uuid::new_v4().to_string();
		self.save(StorageKey::Credentials, &token, &user.email).await?;
		Ok(Session::new(user, SecretString::new(token)))
	}

	/// Loads a proposal together with its order, which the caller must own.
	async fn proposal_for_owner(
		&self,
		session: &Session,
		proposal_id: &str,
	) -> Result<(Order, Proposal), MarketError> {
		let user = self.authenticate_as(session, Role::Client).await?;
		let proposal = self.proposal(proposal_id).await?;
		let order = self.owned_order(&user, &proposal.order_id).await?;
		Ok((order, proposal))
	}
}

#[async_trait]
impl MarketplaceInterface for OrderLedger {
	async fn create_order(
		&self,
		session: &Session,
		fields: &OrderFields,
	) -> Result<Order, MarketError> {
		let user = self.authenticate_as(session, Role::Client).await?;
		lifecycle::validate_order_fields(fields)?;

		let _guard = self.write_lock.lock().await;
		let id = self.next_id("orders").await?;
		let order = lifecycle::create_order(id, user.id, fields.clone(), Utc::now())?;
		self.save_order(&order).await?;
		self.push_id(StorageKey::OrderIndex, ALL_ORDERS, order.id.clone())
			.await?;
		Ok(order)
	}

	async fn list_orders(
		&self,
		session: &Session,
		filter: &OrderFilter,
	) -> Result<Vec<Order>, MarketError> {
		let user = self.authenticate(session).await?;
		Ok(self
			.all_orders()
			.await?
			.into_iter()
			.filter(|order| order.client_id == user.id && filter.matches(order))
			.collect())
	}

	/// The ledger has no geodata, so `cep` does not narrow the result.
	async fn list_available_orders(
		&self,
		session: &Session,
		filter: &AvailableOrderFilter,
	) -> Result<Vec<Order>, MarketError> {
		self.authenticate(session).await?;
		let category = OrderFilter {
			status: Some(OrderStatus::Open),
			category: filter.category.clone(),
		};
		Ok(self
			.all_orders()
			.await?
			.into_iter()
			.filter(|order| category.matches(order))
			.collect())
	}

	async fn get_order(&self, session: &Session, order_id: &str) -> Result<Order, MarketError> {
		self.authenticate(session).await?;
		self.order(order_id).await
	}

	async fn start_auction(&self, session: &Session, order_id: &str) -> Result<Order, MarketError> {
		let user = self.authenticate_as(session, Role::Client).await?;
		let _guard = self.write_lock.lock().await;
		let order = self.owned_order(&user, order_id).await?;
		let next = lifecycle::start_auction(&order, Utc::now(), self.auction_duration)?;
		self.save_order(&next).await?;
		Ok(next)
	}

	async fn update_order_status(
		&self,
		session: &Session,
		order_id: &str,
		status: OrderStatus,
	) -> Result<Order, MarketError> {
		let user = self.authenticate_as(session, Role::Client).await?;
		let _guard = self.write_lock.lock().await;
		let order = self.owned_order(&user, order_id).await?;
		let next = match status {
			OrderStatus::Completed => lifecycle::complete_order(&order)?,
			OrderStatus::Cancelled => lifecycle::close_order(&order)?,
			other => {
				return Err(MarketError::validation(
					"status",
					format!("cannot set status to {} directly", other),
				))
			},
		};
		self.save_order(&next).await?;
		Ok(next)
	}

	async fn list_proposals(
		&self,
		session: &Session,
		order_id: &str,
	) -> Result<Vec<Proposal>, MarketError> {
		self.authenticate(session).await?;
		self.order(order_id).await?;
		self.proposals_of(order_id).await
	}

	/// Never updates in place: a second active proposal from the same
	/// provider is a conflict, exactly like the REST backend.
	async fn create_proposal(
		&self,
		session: &Session,
		order_id: &str,
		fields: &ProposalFields,
	) -> Result<Proposal, MarketError> {
		let user = self.authenticate_as(session, Role::Provider).await?;
		let _guard = self.write_lock.lock().await;
		let order = self.order(order_id).await?;
		let existing = self.proposals_of(order_id).await?;

		match resolver::plan_submission(&order, &existing, &user.id, fields)? {
			SubmissionPlan::Create => {
				let id = self.next_id("proposals").await?;
				let proposal =
					resolver::draft_proposal(id, order_id, user.id, fields.clone(), Utc::now())?;
				self.save_proposal(&proposal).await?;
				self.push_id(StorageKey::OrderProposals, order_id, proposal.id.clone())
					.await?;
				Ok(proposal)
			},
			SubmissionPlan::Update { proposal_id } => Err(MarketError::conflict(
				Entity::Proposal,
				proposal_id,
				"provider already has a pending proposal on this order",
			)),
		}
	}

	async fn update_proposal(
		&self,
		session: &Session,
		proposal_id: &str,
		fields: &ProposalFields,
	) -> Result<Proposal, MarketError> {
		let user = self.authenticate_as(session, Role::Provider).await?;
		let _guard = self.write_lock.lock().await;
		let proposal = self.proposal(proposal_id).await?;
		if proposal.provider_id != user.id {
			return Err(MarketError::Unauthorized(format!(
				"proposal {} belongs to another provider",
				proposal_id
			)));
		}
		if proposal.status != ProposalStatus::Pending {
			return Err(MarketError::conflict(
				Entity::Proposal,
				proposal_id,
				format!("proposal is {} and can no longer change", proposal.status),
			));
		}
		let order = self.order(&proposal.order_id).await?;
		if order.status.is_terminal() {
			return Err(MarketError::invalid_state(
				Entity::Order,
				&order.id,
				"open or in_progress",
				order.status,
			));
		}

		let revised = resolver::revise_proposal(&proposal, fields.clone(), Utc::now())?;
		self.save_proposal(&revised).await?;
		Ok(revised)
	}

	async fn accept_proposal(
		&self,
		session: &Session,
		proposal_id: &str,
	) -> Result<Proposal, MarketError> {
		let _guard = self.write_lock.lock().await;
		let (order, proposal) = self.proposal_for_owner(session, proposal_id).await?;
		let (accepted_order, accepted) = lifecycle::accept_proposal(&order, &proposal)?;
		// Order first: a failed proposal write must not leave an accepted
		// proposal on an order that never moved.
		self.save_order(&accepted_order).await?;
		if let Err(e) = self.save_proposal(&accepted).await {
			if let Err(restore) = self.save_order(&order).await {
				tracing::warn!(order_id = %order.id, error = %restore, "Failed to restore order");
			}
			return Err(e);
		}
		Ok(accepted)
	}

	async fn reject_proposal(
		&self,
		session: &Session,
		proposal_id: &str,
	) -> Result<Proposal, MarketError> {
		let _guard = self.write_lock.lock().await;
		let (order, proposal) = self.proposal_for_owner(session, proposal_id).await?;
		let proposal = lifecycle::reject_proposal(&order, &proposal)?;
		self.save_proposal(&proposal).await?;
		Ok(proposal)
	}

	async fn withdraw_proposal(
		&self,
		session: &Session,
		proposal_id: &str,
	) -> Result<Proposal, MarketError> {
		let user = self.authenticate_as(session, Role::Provider).await?;
		let _guard = self.write_lock.lock().await;
		let proposal = self.proposal(proposal_id).await?;
		let order = self.order(&proposal.order_id).await?;
		let proposal = lifecycle::withdraw_proposal(&order, &proposal, &user.id)?;
		self.save_proposal(&proposal).await?;
		Ok(proposal)
	}
}

/// Offline identities: any non-empty password is accepted and unknown emails
/// are registered on first login as clients. Explicit registration also
/// records the name and phone.
#[async_trait]
impl AuthInterface for OrderLedger {
	async fn login(&self, email: &str, password: &SecretString) -> Result<Session, MarketError> {
		let email = email.trim().to_ascii_lowercase();
		if !email.contains('@') {
			return Err(MarketError::validation("email", "must be an email address"));
		}
		if password.is_empty() {
			return Err(MarketError::validation("password", "is required"));
		}

		let _guard = self.write_lock.lock().await;
		let user = match self.load::<User>(StorageKey::Users, &email).await? {
			Some(user) => user,
			None => {
				let name = email.split('@').next().unwrap_or_default().to_string();
				self.new_user(name, email, None).await?
			},
		};
		self.issue_session(user).await
	}

	async fn register(&self, registration: &Registration) -> Result<Session, MarketError> {
		registration.validate()?;
		let email = registration.email.trim().to_ascii_lowercase();

		let _guard = self.write_lock.lock().await;
		if self.load::<User>(StorageKey::Users, &email).await?.is_some() {
			return Err(MarketError::validation("email", "is already registered"));
		}
		let user = self
			.new_user(
				registration.name.trim().to_string(),
				email,
				Some(registration.phone.trim().to_string()),
			)
			.await?;
		self.issue_session(user).await
	}

	async fn logout(&self, session: &Session) -> Result<(), MarketError> {
		self.authenticate(session).await?;
		self.storage
			.remove(StorageKey::Credentials, session.credential.expose_secret())
			.await
			.map_err(storage_error)
	}

	async fn current_user(&self, session: &Session) -> Result<User, MarketError> {
		self.authenticate(session).await
	}

	async fn update_role(&self, session: &Session, role: Role) -> Result<User, MarketError> {
		let _guard = self.write_lock.lock().await;
		let mut user = self.authenticate(session).await?;
		user.role = role;
		self.save(StorageKey::Users, &user.email, &user).await?;
		Ok(user)
	}
}
