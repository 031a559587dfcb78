//! Core marketplace logic for bidboard.
//!
//! The pure rules live in [`lifecycle`] (order and proposal transitions),
//! [`ranking`] (proposal ordering and insights) and [`resolver`] (one active
//! proposal per provider). [`Marketplace`] drives them against any backend
//! implementing [`bidboard_api::MarketplaceInterface`], [`SessionManager`]
//! owns the login lifecycle and [`state::OrderLedger`] is a storage-backed
//! backend for offline use.

use bidboard_storage::StorageError;
use bidboard_types::MarketError;

pub mod builder;
pub mod lifecycle;
pub mod marketplace;
pub mod ranking;
pub mod resolver;
pub mod session;
pub mod state;

pub use builder::{BuilderError, BuiltMarketplace, MarketplaceBuilder};
pub use marketplace::{Marketplace, OrderRanking, SubmissionOutcome};
pub use resolver::SubmissionPlan;
pub use session::SessionManager;

pub(crate) fn storage_error(err: StorageError) -> MarketError {
	MarketError::Storage(err.to_string())
}
