//! API types for the marketplace REST backend.
//!
//! Every backend response is wrapped in `{ success, message?, data?, errors? }`.
//! The backend sometimes answers HTTP 200 with `success: false`, so the
//! envelope is decoded into an explicit [`ApiResponse`] sum type at the
//! boundary and nothing downstream ever inspects a half-shaped payload.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::utils::wire;
use crate::{MarketError, SecretString, UserId};

/// Raw response envelope as sent by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
	pub success: bool,
	pub message: Option<String>,
	pub data: Option<T>,
	/// Field-level validation messages, keyed by field name.
	pub errors: Option<BTreeMap<String, Vec<String>>>,
}

/// Decoded response: either a payload or a failure with its reason.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
	Success(T),
	Failure {
		message: String,
		errors: BTreeMap<String, Vec<String>>,
	},
}

impl<T> ApiResponse<T> {
	/// Splits an envelope on its `success` flag.
	///
	/// A successful envelope without `data` yields `None` so the caller can
	/// decide whether an empty payload is acceptable for the endpoint.
	pub fn from_envelope(envelope: ApiEnvelope<T>) -> Option<Self> {
		if envelope.success {
			envelope.data.map(ApiResponse::Success)
		} else {
			Some(ApiResponse::Failure {
				message: envelope
					.message
					.unwrap_or_else(|| "request was not successful".to_string()),
				errors: envelope.errors.unwrap_or_default(),
			})
		}
	}

	/// The first field-level error, if the backend sent any.
	pub fn first_field_error(&self) -> Option<(&str, &str)> {
		match self {
			ApiResponse::Success(_) => None,
			ApiResponse::Failure { errors, .. } => errors.iter().find_map(|(field, messages)| {
				messages
					.first()
					.map(|message| (field.as_str(), message.as_str()))
			}),
		}
	}
}

/// List payloads come either as a bare array or paginated as `{ data: [...] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
	Plain(Vec<T>),
	Paginated { data: Vec<T> },
}

impl<T> Listing<T> {
	pub fn into_items(self) -> Vec<T> {
		match self {
			Listing::Plain(items) => items,
			Listing::Paginated { data } => data,
		}
	}
}

/// The two marketplace roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	/// Owns orders.
	Client,
	/// Submits proposals.
	Provider,
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Role::Client => f.write_str("client"),
			Role::Provider => f.write_str("provider"),
		}
	}
}

impl std::str::FromStr for Role {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"client" => Ok(Role::Client),
			"provider" => Ok(Role::Provider),
			other => Err(format!("unknown role '{}'", other)),
		}
	}
}

/// An authenticated marketplace user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
	#[serde(deserialize_with = "wire::id")]
	pub id: UserId,
	pub name: String,
	pub email: String,
	#[serde(rename = "profile_type")]
	pub role: Role,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub phone: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub address: Option<String>,
}

/// Sign-up details. New accounts start with the client profile.
#[derive(Debug, Clone)]
pub struct Registration {
	pub name: String,
	pub email: String,
	pub phone: String,
	pub password: SecretString,
	pub password_confirmation: SecretString,
}

impl Registration {
	/// Local checks run before anything is sent to a backend.
	pub fn validate(&self) -> Result<(), MarketError> {
		let required = [
			("name", &self.name),
			("email", &self.email),
			("phone", &self.phone),
		];
		for (field, value) in required {
			if value.trim().is_empty() {
				return Err(MarketError::validation(field, "is required"));
			}
		}
		if !self.email.contains('@') {
			return Err(MarketError::validation("email", "must be an email address"));
		}
		if self.password.is_empty() {
			return Err(MarketError::validation("password", "is required"));
		}
		if self.password != self.password_confirmation {
			return Err(MarketError::validation("password", "confirmation does not match"));
		}
		Ok(())
	}
}

/// `data` of a successful login or registration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
	pub user: User,
	pub token: String,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_success_envelope() {
		let envelope: ApiEnvelope<Listing<u32>> =
			serde_json::from_str(r#"{"success": true, "data": {"data": [1, 2, 3], "total": 3}}"#)
				.unwrap();
		match ApiResponse::from_envelope(envelope) {
			Some(ApiResponse::Success(listing)) => assert_eq!(listing.into_items(), vec![1, 2, 3]),
			other => panic!("unexpected response: {:?}", other.is_some()),
		}

		let plain: ApiEnvelope<Listing<u32>> =
			serde_json::from_str(r#"{"success": true, "data": [4]}"#).unwrap();
		assert!(matches!(
			ApiResponse::from_envelope(plain),
			Some(ApiResponse::Success(listing)) if listing.clone().into_items() == vec![4]
		));
	}

	#[test]
	fn test_failure_envelope() {
		let envelope: ApiEnvelope<serde_json::Value> = serde_json::from_str(
			r#"{"success": false, "message": "Dados inválidos", "errors": {"price": ["must be positive"]}}"#,
		)
		.unwrap();
		let response = ApiResponse::from_envelope(envelope).unwrap();
		assert_eq!(response.first_field_error(), Some(("price", "must be positive")));
		assert!(matches!(response, ApiResponse::Failure { ref message, .. } if message == "Dados inválidos"));
	}

	#[test]
	fn test_success_without_data() {
		let envelope: ApiEnvelope<serde_json::Value> =
			serde_json::from_str(r#"{"success": true, "message": "ok"}"#).unwrap();
		assert!(ApiResponse::from_envelope(envelope).is_none());
	}

	fn registration(confirmation: &str) -> Registration {
		Registration {
			name: "Ana".into(),
			email: "ana@example.com".into(),
			phone: "11 99999-0000".into(),
			password: SecretString::from("segredo"),
			password_confirmation: SecretString::from(confirmation),
		}
	}

	#[test]
	fn test_registration_checks() {
		assert!(registration("segredo").validate().is_ok());
		assert_eq!(
			registration("outro").validate(),
			Err(MarketError::validation("password", "confirmation does not match"))
		);

		let mut missing_phone = registration("segredo");
		missing_phone.phone = "  ".into();
		assert!(matches!(
			missing_phone.validate(),
			Err(MarketError::Validation { ref field, .. }) if field == "phone"
		));
	}

	#[test]
	fn test_decode_user() {
		let user: User = serde_json::from_str(
			r#"{"id": 7, "name": "Ana", "email": "ana@example.com", "profile_type": "provider"}"#,
		)
		.unwrap();
		assert_eq!(user.id, "7");
		assert_eq!(user.role, Role::Provider);
	}
}
