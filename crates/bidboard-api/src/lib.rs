//! Backend boundary for the bidboard marketplace.
//!
//! The marketplace core talks to the backend only through the two traits
//! defined here. [`implementations::http::HttpMarketplace`] speaks the REST
//! contract; the in-process ledger in `bidboard-core` implements the same
//! traits for offline use and tests.
//!
//! Every call takes the caller's [`Session`] explicitly. Implementations map
//! all failures onto [`MarketError`] before returning.

use async_trait::async_trait;
use bidboard_types::{
	AvailableOrderFilter, MarketError, Order, OrderFields, OrderFilter, OrderStatus, Proposal,
	ProposalFields, Registration, Role, SecretString, Session, User,
};

pub mod implementations {
	pub mod http;
}

/// Order and proposal endpoints of the marketplace backend.
#[async_trait]
pub trait MarketplaceInterface: Send + Sync {
	async fn create_order(&self, session: &Session, fields: &OrderFields)
		-> Result<Order, MarketError>;

	/// The caller's own orders.
	async fn list_orders(
		&self,
		session: &Session,
		filter: &OrderFilter,
	) -> Result<Vec<Order>, MarketError>;

	/// Open orders that providers may bid on.
	async fn list_available_orders(
		&self,
		session: &Session,
		filter: &AvailableOrderFilter,
	) -> Result<Vec<Order>, MarketError>;

	async fn get_order(&self, session: &Session, order_id: &str) -> Result<Order, MarketError>;

	/// Opens the auction window. The backend decides the window length.
	async fn start_auction(&self, session: &Session, order_id: &str) -> Result<Order, MarketError>;

	/// Moves an order to `completed` or `cancelled`.
	async fn update_order_status(
		&self,
		session: &Session,
		order_id: &str,
		status: OrderStatus,
	) -> Result<Order, MarketError>;

	/// Every proposal of the order, whatever its status.
	async fn list_proposals(
		&self,
		session: &Session,
		order_id: &str,
	) -> Result<Vec<Proposal>, MarketError>;

	async fn create_proposal(
		&self,
		session: &Session,
		order_id: &str,
		fields: &ProposalFields,
	) -> Result<Proposal, MarketError>;

	async fn update_proposal(
		&self,
		session: &Session,
		proposal_id: &str,
		fields: &ProposalFields,
	) -> Result<Proposal, MarketError>;

	async fn accept_proposal(
		&self,
		session: &Session,
		proposal_id: &str,
	) -> Result<Proposal, MarketError>;

	async fn reject_proposal(
		&self,
		session: &Session,
		proposal_id: &str,
	) -> Result<Proposal, MarketError>;

	async fn withdraw_proposal(
		&self,
		session: &Session,
		proposal_id: &str,
	) -> Result<Proposal, MarketError>;
}

/// Authentication endpoints.
#[async_trait]
pub trait AuthInterface: Send + Sync {
	async fn login(&self, email: &str, password: &SecretString) -> Result<Session, MarketError>;

	/// Creates a client account and returns its first session.
	async fn register(&self, registration: &Registration) -> Result<Session, MarketError>;

	async fn logout(&self, session: &Session) -> Result<(), MarketError>;

	/// Resolves the user behind a session; `Unauthorized` if it was revoked.
	async fn current_user(&self, session: &Session) -> Result<User, MarketError>;

	async fn update_role(&self, session: &Session, role: Role) -> Result<User, MarketError>;
}
