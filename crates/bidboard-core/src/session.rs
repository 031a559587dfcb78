//! Session lifecycle: login, restore, role switch and logout.
//!
//! The current session is persisted through the storage service so a CLI
//! invocation can pick up where the previous one left off. Nothing here is
//! global; callers receive a [`Session`] value and pass it on explicitly.

use bidboard_api::AuthInterface;
use bidboard_storage::StorageService;
use bidboard_types::{MarketError, Registration, Role, SecretString, Session, StorageKey, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

use crate::storage_error;

const CURRENT: &str = "current";

/// On-disk shape of the persisted session.
#[derive(Serialize, Deserialize)]
struct StoredSession {
	user: User,
	token: String,
}

impl From<&Session> for StoredSession {
	fn from(session: &Session) -> Self {
		Self {
			user: session.user.clone(),
			token: session.credential.expose_secret().to_string(),
		}
	}
}

impl From<StoredSession> for Session {
	fn from(stored: StoredSession) -> Self {
		Session::new(stored.user, SecretString::new(stored.token))
	}
}

pub struct SessionManager {
	auth: Arc<dyn AuthInterface>,
	storage: Arc<StorageService>,
}

impl SessionManager {
	pub fn new(auth: Arc<dyn AuthInterface>, storage: Arc<StorageService>) -> Self {
		Self { auth, storage }
	}

	async fn persist(&self, session: &Session) -> Result<(), MarketError> {
		self.storage
			.store(StorageKey::Session, CURRENT, &StoredSession::from(session))
			.await
			.map_err(storage_error)
	}

	async fn clear(&self) -> Result<(), MarketError> {
		self.storage
			.remove(StorageKey::Session, CURRENT)
			.await
			.map_err(storage_error)
	}

	/// Restores the persisted session and revalidates it with the backend.
	///
	/// A credential the backend no longer honours is discarded and `None`
	/// returned. Transport failures are surfaced so an offline start does not
	/// silently log the user out.
	#[instrument(skip_all)]
	pub async fn initialize(&self) -> Result<Option<Session>, MarketError> {
		let stored: Option<StoredSession> = self
			.storage
			.retrieve_optional(StorageKey::Session, CURRENT)
			.await
			.map_err(storage_error)?;
		let Some(stored) = stored else {
			return Ok(None);
		};

		let session = Session::from(stored);
		let verified = self.auth.current_user(&session).await;
		match verified {
			Ok(user) => {
				let refreshed = Session::new(user, session.credential);
				self.persist(&refreshed).await?;
				tracing::debug!(user_id = %refreshed.user_id(), "Session restored");
				Ok(Some(refreshed))
			},
			Err(MarketError::Unauthorized(reason)) => {
				tracing::info!(%reason, "Stored session rejected, clearing");
				self.clear().await?;
				Ok(None)
			},
			Err(e) => Err(e),
		}
	}

	#[instrument(skip_all, fields(email = %email))]
	pub async fn login(&self, email: &str, password: &SecretString) -> Result<Session, MarketError> {
		let session = self.auth.login(email, password).await?;
		self.persist(&session).await?;
		tracing::info!(user_id = %session.user_id(), role = %session.role(), "Logged in");
		Ok(session)
	}

	/// Creates an account and keeps the new session, like [`login`](Self::login).
	#[instrument(skip_all, fields(email = %registration.email))]
	pub async fn register(&self, registration: &Registration) -> Result<Session, MarketError> {
		let session = self.auth.register(registration).await?;
		self.persist(&session).await?;
		tracing::info!(user_id = %session.user_id(), "Registered");
		Ok(session)
	}

	/// Ends the session. Local state is cleared even when the backend call
	/// fails; that failure is still returned.
	#[instrument(skip_all, fields(user_id = %session.user_id()))]
	pub async fn logout(&self, session: &Session) -> Result<(), MarketError> {
		let remote = self.auth.logout(session).await;
		if let Err(e) = &remote {
			tracing::warn!(error = %e, "Backend logout failed");
		}
		self.clear().await?;
		remote
	}

	/// Switches the user between client and provider and persists the result.
	#[instrument(skip_all, fields(user_id = %session.user_id(), role = %role))]
	pub async fn switch_role(&self, session: &Session, role: Role) -> Result<Session, MarketError> {
		let user = self.auth.update_role(session, role).await?;
		let next = Session::new(user, session.credential.clone());
		self.persist(&next).await?;
		Ok(next)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use bidboard_storage::implementations::memory::MemoryStorage;
	use std::sync::Mutex;

	/// Auth double with a scripted `current_user` answer.
	struct ScriptedAuth {
		current: Mutex<Result<User, MarketError>>,
		logout: Result<(), MarketError>,
	}

	fn user(role: Role) -> User {
		User {
			id: "1".into(),
			name: "Ana".into(),
			email: "ana@example.com".into(),
			role,
			phone: None,
			address: None,
		}
	}

	#[async_trait]
	impl AuthInterface for ScriptedAuth {
		async fn login(&self, _email: &str, _password: &SecretString) -> Result<Session, MarketError> {
			Ok(Session::new(user(Role::Client), SecretString::from("tok-1")))
		}

		async fn register(&self, registration: &Registration) -> Result<Session, MarketError> {
			registration.validate()?;
			let mut user = user(Role::Client);
			user.phone = Some(registration.phone.clone());
			Ok(Session::new(user, SecretString::from("tok-reg")))
		}

		async fn logout(&self, _session: &Session) -> Result<(), MarketError> {
			self.logout.clone()
		}

		async fn current_user(&self, _session: &Session) -> Result<User, MarketError> {
			self.current.lock().unwrap().clone()
		}

		async fn update_role(&self, _session: &Session, role: Role) -> Result<User, MarketError> {
			Ok(user(role))
		}
	}

	fn manager(current: Result<User, MarketError>, logout: Result<(), MarketError>) -> SessionManager {
		SessionManager::new(
			Arc::new(ScriptedAuth {
				current: Mutex::new(current),
				logout,
			}),
			Arc::new(StorageService::new(Box::new(MemoryStorage::new()))),
		)
	}

	#[tokio::test]
	async fn test_initialize_without_stored_session() {
		let sessions = manager(Ok(user(Role::Client)), Ok(()));
		assert_eq!(sessions.initialize().await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_login_then_restore() {
		let sessions = manager(Ok(user(Role::Provider)), Ok(()));
		let session = sessions
			.login("ana@example.com", &SecretString::from("pw"))
			.await
			.unwrap();
		assert_eq!(session.role(), Role::Client);

		// The backend now reports the user as a provider; the refresh wins.
		let restored = sessions.initialize().await.unwrap().unwrap();
		assert_eq!(restored.role(), Role::Provider);
		assert_eq!(restored.credential.expose_secret(), "tok-1");
	}

	#[tokio::test]
	async fn test_revoked_session_is_cleared() {
		let sessions = manager(Err(MarketError::Unauthorized("expired".into())), Ok(()));
		sessions
			.login("ana@example.com", &SecretString::from("pw"))
			.await
			.unwrap();

		assert_eq!(sessions.initialize().await.unwrap(), None);
		let stored: Option<StoredSession> = sessions
			.storage
			.retrieve_optional(StorageKey::Session, CURRENT)
			.await
			.unwrap();
		assert!(stored.is_none());
	}

	#[tokio::test]
	async fn test_network_failure_keeps_session() {
		let sessions = manager(Err(MarketError::Network("down".into())), Ok(()));
		sessions
			.login("ana@example.com", &SecretString::from("pw"))
			.await
			.unwrap();

		assert!(matches!(
			sessions.initialize().await,
			Err(MarketError::Network(_))
		));
		assert!(sessions.storage.exists(StorageKey::Session, CURRENT).await.unwrap());
	}

	#[tokio::test]
	async fn test_logout_clears_even_on_failure() {
		let sessions = manager(
			Ok(user(Role::Client)),
			Err(MarketError::Timeout("POST /logout".into())),
		);
		let session = sessions
			.login("ana@example.com", &SecretString::from("pw"))
			.await
			.unwrap();

		assert!(matches!(
			sessions.logout(&session).await,
			Err(MarketError::Timeout(_))
		));
		assert!(!sessions.storage.exists(StorageKey::Session, CURRENT).await.unwrap());
	}

	#[tokio::test]
	async fn test_register_persists_session() {
		let sessions = manager(Ok(user(Role::Client)), Ok(()));
		let mut registration = Registration {
			name: "Ana".into(),
			email: "ana@example.com".into(),
			phone: "11 99999-0000".into(),
			password: SecretString::from("pw"),
			password_confirmation: SecretString::from("other"),
		};
		assert!(matches!(
			sessions.register(&registration).await,
			Err(MarketError::Validation { .. })
		));
		assert!(!sessions.storage.exists(StorageKey::Session, CURRENT).await.unwrap());

		registration.password_confirmation = SecretString::from("pw");
		let session = sessions.register(&registration).await.unwrap();
		assert_eq!(session.user.phone.as_deref(), Some("11 99999-0000"));
		let stored: StoredSession = sessions
			.storage
			.retrieve(StorageKey::Session, CURRENT)
			.await
			.unwrap();
		assert_eq!(stored.token, "tok-reg");
	}

	#[tokio::test]
	async fn test_switch_role_persists() {
		let sessions = manager(Ok(user(Role::Provider)), Ok(()));
		let session = sessions
			.login("ana@example.com", &SecretString::from("pw"))
			.await
			.unwrap();
		let switched = sessions.switch_role(&session, Role::Provider).await.unwrap();
		assert_eq!(switched.role(), Role::Provider);

		let stored: StoredSession = sessions
			.storage
			.retrieve(StorageKey::Session, CURRENT)
			.await
			.unwrap();
		assert_eq!(stored.user.role, Role::Provider);
	}
}
