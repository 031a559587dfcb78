//! Domain error kinds for marketplace operations.
//!
//! Every operation either succeeds or fails with exactly one of these kinds.
//! Each variant carries enough context (entity, id, field, expected vs. actual
//! status) for the caller to pick a remediation: fix input, refetch and
//! reconcile, retry with backoff, or give up.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
	Order,
	Proposal,
	Session,
}

impl fmt::Display for Entity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Entity::Order => write!(f, "order"),
			Entity::Proposal => write!(f, "proposal"),
			Entity::Session => write!(f, "session"),
		}
	}
}

/// Errors surfaced by the marketplace core.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MarketError {
	/// Caller-supplied fields fail a local invariant. Never retried.
	#[error("Validation error on '{field}': {message}")]
	Validation { field: String, message: String },
	/// The requested transition is not legal from the current status.
	#[error("Invalid state for {entity} {id}: expected {expected}, found {actual}")]
	InvalidState {
		entity: Entity,
		id: String,
		expected: String,
		actual: String,
	},
	/// The operation collided with a concurrent or terminal state change.
	#[error("Conflict on {entity} {id}: {message}")]
	Conflict {
		entity: Entity,
		id: String,
		message: String,
	},
	/// The referenced entity no longer resolves upstream.
	#[error("{entity} not found: {id}")]
	NotFound { entity: Entity, id: String },
	/// Transport-level failure.
	#[error("Network error: {0}")]
	Network(String),
	/// The request exceeded its time budget.
	#[error("Request timed out: {0}")]
	Timeout(String),
	/// The backend rejected the session credential.
	#[error("Unauthorized: {0}")]
	Unauthorized(String),
	/// The backend answered with a body that does not match the envelope contract.
	#[error("Protocol error: {0}")]
	Protocol(String),
	/// Local storage failure in the in-process ledger or session store.
	#[error("Storage error: {0}")]
	Storage(String),
}

impl MarketError {
	pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
		MarketError::Validation {
			field: field.into(),
			message: message.into(),
		}
	}

	pub fn invalid_state(
		entity: Entity,
		id: impl Into<String>,
		expected: impl Into<String>,
		actual: impl fmt::Display,
	) -> Self {
		MarketError::InvalidState {
			entity,
			id: id.into(),
			expected: expected.into(),
			actual: actual.to_string(),
		}
	}

	pub fn conflict(entity: Entity, id: impl Into<String>, message: impl Into<String>) -> Self {
		MarketError::Conflict {
			entity,
			id: id.into(),
			message: message.into(),
		}
	}

	pub fn not_found(entity: Entity, id: impl Into<String>) -> Self {
		MarketError::NotFound {
			entity,
			id: id.into(),
		}
	}

	/// Short, stable name of the error kind, for logs and CLI output.
	pub fn kind(&self) -> &'static str {
		match self {
			MarketError::Validation { .. } => "validation",
			MarketError::InvalidState { .. } => "invalid_state",
			MarketError::Conflict { .. } => "conflict",
			MarketError::NotFound { .. } => "not_found",
			MarketError::Network(_) => "network",
			MarketError::Timeout(_) => "timeout",
			MarketError::Unauthorized(_) => "unauthorized",
			MarketError::Protocol(_) => "protocol",
			MarketError::Storage(_) => "storage",
		}
	}

	/// Transport failures are safe to retry with backoff; nothing else is.
	pub fn is_retryable(&self) -> bool {
		matches!(self, MarketError::Network(_) | MarketError::Timeout(_))
	}

	/// The caller's snapshot is stale and must be refetched before deciding again.
	pub fn requires_refetch(&self) -> bool {
		matches!(
			self,
			MarketError::InvalidState { .. } | MarketError::Conflict { .. }
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_error_classification() {
		assert!(MarketError::Timeout("GET /orders".into()).is_retryable());
		assert!(MarketError::Network("connection refused".into()).is_retryable());
		assert!(!MarketError::validation("budget", "must be positive").is_retryable());

		let conflict = MarketError::conflict(Entity::Proposal, "7", "already accepted");
		assert!(conflict.requires_refetch());
		assert!(!conflict.is_retryable());
		assert_eq!(conflict.kind(), "conflict");

		let missing = MarketError::not_found(Entity::Order, "42");
		assert!(!missing.requires_refetch());
		assert_eq!(missing.to_string(), "order not found: 42");
	}

	#[test]
	fn test_invalid_state_message() {
		let err = MarketError::invalid_state(Entity::Order, "9", "open", "cancelled");
		assert_eq!(
			err.to_string(),
			"Invalid state for order 9: expected open, found cancelled"
		);
	}
}
