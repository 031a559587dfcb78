//! Explicit session value.
//!
//! A session is created by logging in (or restoring a persisted login) and is
//! passed by reference into every backend call. There is no process-wide
//! authentication state.

use crate::{Role, SecretString, User, UserId};

/// An authenticated user together with the opaque bearer credential.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
	pub user: User,
	pub credential: SecretString,
}

impl Session {
	pub fn new(user: User, credential: SecretString) -> Self {
		Self { user, credential }
	}

	pub fn user_id(&self) -> &UserId {
		&self.user.id
	}

	pub fn role(&self) -> Role {
		self.user.role
	}
}
