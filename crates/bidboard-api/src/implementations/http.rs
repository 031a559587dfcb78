//! REST implementation of the marketplace backend.
//!
//! Requests carry `Authorization: Bearer <credential>` (except login and register) and
//! every response body is the `{ success, message?, data?, errors? }`
//! envelope. The envelope is decoded into [`ApiResponse`] and each failure is
//! classified into a single [`MarketError`] kind:
//!
//! | Response | Error |
//! |---|---|
//! | 400, 422 | `Validation` (first field in `errors`, else `request`) |
//! | 401, 403 | `Unauthorized` |
//! | 404 | `NotFound` |
//! | 409 | `Conflict` |
//! | 408, 504, client timeout | `Timeout` |
//! | other 5xx, connection failure | `Network` |
//! | 2xx with `success: false` | `Conflict` |
//! | unreadable body | `Protocol` |

use crate::{AuthInterface, MarketplaceInterface};
use async_trait::async_trait;
use bidboard_types::{
	truncate_id, ApiEnvelope, ApiResponse, AuthPayload, AvailableOrderFilter, Entity, Listing,
	MarketError, Order, OrderFields, OrderFilter, OrderStatus, Proposal, ProposalFields,
	Registration, Role, SecretString, Session, User,
};
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// What a request is about, used to fill in `NotFound`/`Conflict`.
#[derive(Debug, Clone, Copy)]
struct Target<'a> {
	entity: Entity,
	id: &'a str,
}

impl<'a> Target<'a> {
	fn order(id: &'a str) -> Self {
		Self {
			entity: Entity::Order,
			id,
		}
	}

	fn proposal(id: &'a str) -> Self {
		Self {
			entity: Entity::Proposal,
			id,
		}
	}

	fn session() -> Self {
		Self {
			entity: Entity::Session,
			id: "current",
		}
	}
}

#[derive(Serialize)]
struct LoginRequest<'a> {
	email: &'a str,
	password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
	name: &'a str,
	email: &'a str,
	phone: &'a str,
	password: &'a str,
	password_confirmation: &'a str,
}

#[derive(Serialize)]
struct CreateProposalRequest<'a> {
	order_id: &'a str,
	#[serde(flatten)]
	fields: &'a ProposalFields,
}

#[derive(Serialize)]
struct StatusUpdate {
	status: OrderStatus,
}

#[derive(Serialize)]
struct ProfileTypeUpdate {
	profile_type: Role,
}

#[derive(Serialize)]
struct ProposalQuery<'a> {
	order_id: &'a str,
}

/// reqwest client bound to one backend base URL.
#[derive(Clone)]
pub struct HttpMarketplace {
	client: Client,
	base_url: Url,
}

impl HttpMarketplace {
	pub fn new(
		base_url: &str,
		timeout: Duration,
		pool_idle_timeout: Duration,
	) -> Result<Self, MarketError> {
		let base_url = Url::parse(base_url)
			.map_err(|e| MarketError::validation("api.base_url", e.to_string()))?;
		if base_url.cannot_be_a_base() {
			return Err(MarketError::validation(
				"api.base_url",
				"must be a hierarchical http(s) URL",
			));
		}
		let client = Client::builder()
			.pool_idle_timeout(pool_idle_timeout)
			.pool_max_idle_per_host(10)
			.timeout(timeout)
			.build()
			.map_err(|e| MarketError::Network(e.to_string()))?;
		Ok(Self { client, base_url })
	}

	/// Appends path segments to the base URL, percent-encoding each one.
	fn endpoint(&self, segments: &[&str]) -> Result<Url, MarketError> {
		let mut url = self.base_url.clone();
		url.path_segments_mut()
			.map_err(|_| MarketError::Protocol("base URL cannot carry a path".into()))?
			.pop_if_empty()
			.extend(segments);
		Ok(url)
	}

	fn request(
		&self,
		method: Method,
		segments: &[&str],
		session: Option<&Session>,
	) -> Result<RequestBuilder, MarketError> {
		let mut builder = self
			.client
			.request(method, self.endpoint(segments)?)
			.header(ACCEPT, HeaderValue::from_static("application/json"));
		if let Some(session) = session {
			builder = builder.header(AUTHORIZATION, session.credential.bearer().as_str());
		}
		Ok(builder)
	}

	/// Sends the request and returns the envelope's `data`, if any.
	async fn call(
		&self,
		builder: RequestBuilder,
		target: Target<'_>,
	) -> Result<Option<Value>, MarketError> {
		let response = builder.send().await.map_err(transport_error)?;
		let status = response.status().as_u16();
		let url = response.url().path().to_string();
		let body = response.bytes().await.map_err(transport_error)?;
		tracing::debug!(
			status,
			path = %url,
			bytes = body.len(),
			"Marketplace response"
		);
		decode_envelope(status, &body, target)
	}

	async fn fetch<T: DeserializeOwned>(
		&self,
		builder: RequestBuilder,
		target: Target<'_>,
		key: &str,
	) -> Result<T, MarketError> {
		let data = self
			.call(builder, target)
			.await?
			.ok_or_else(|| MarketError::Protocol("successful response without data".into()))?;
		decode_payload(data, key)
	}

	async fn fetch_list<T: DeserializeOwned>(
		&self,
		builder: RequestBuilder,
		target: Target<'_>,
		key: &str,
	) -> Result<Vec<T>, MarketError> {
		match self.call(builder, target).await? {
			Some(data) => decode_payload::<Listing<T>>(data, key).map(Listing::into_items),
			None => Ok(Vec::new()),
		}
	}
}

fn session_from(payload: AuthPayload) -> Result<Session, MarketError> {
	if payload.token.trim().is_empty() {
		return Err(MarketError::Protocol("auth response without a token".into()));
	}
	Ok(Session::new(payload.user, SecretString::new(payload.token)))
}

fn transport_error(e: reqwest::Error) -> MarketError {
	if e.is_timeout() {
		MarketError::Timeout(e.to_string())
	} else {
		MarketError::Network(e.to_string())
	}
}

/// Payloads are either the entity itself or wrapped as `{ "<key>": entity }`.
fn decode_payload<T: DeserializeOwned>(data: Value, key: &str) -> Result<T, MarketError> {
	let data = match data {
		Value::Object(mut map) if map.len() == 1 && map.contains_key(key) => {
			map.remove(key).unwrap_or(Value::Null)
		},
		other => other,
	};
	serde_json::from_value(data)
		.map_err(|e| MarketError::Protocol(format!("unexpected payload shape: {}", e)))
}

fn decode_envelope(
	status: u16,
	body: &[u8],
	target: Target<'_>,
) -> Result<Option<Value>, MarketError> {
	let envelope = serde_json::from_slice::<ApiEnvelope<Value>>(body).ok();

	if !(200..300).contains(&status) {
		let failure = envelope.and_then(ApiResponse::from_envelope);
		return Err(classify_failure(status, failure.as_ref(), target));
	}

	let envelope = envelope.ok_or_else(|| {
		MarketError::Protocol(format!("HTTP {} with a body that is not an envelope", status))
	})?;
	match ApiResponse::from_envelope(envelope) {
		Some(ApiResponse::Success(data)) => Ok(Some(data)),
		None => Ok(None),
		// The backend refused the operation without an error status. The
		// caller's snapshot is most likely stale.
		Some(ApiResponse::Failure { message, .. }) => {
			Err(MarketError::conflict(target.entity, target.id, message))
		},
	}
}

fn classify_failure(
	status: u16,
	failure: Option<&ApiResponse<Value>>,
	target: Target<'_>,
) -> MarketError {
	let message = match failure {
		Some(ApiResponse::Failure { message, .. }) => message.clone(),
		_ => format!("HTTP {}", status),
	};

	match status {
		400 | 422 => {
			let (field, detail) = failure
				.and_then(ApiResponse::first_field_error)
				.map(|(field, detail)| (field.to_string(), detail.to_string()))
				.unwrap_or_else(|| ("request".to_string(), message));
			MarketError::Validation {
				field,
				message: detail,
			}
		},
		401 | 403 => MarketError::Unauthorized(message),
		404 => MarketError::not_found(target.entity, target.id),
		409 => MarketError::conflict(target.entity, target.id, message),
		408 | 504 => MarketError::Timeout(message),
		500..=599 => MarketError::Network(format!("HTTP {}: {}", status, message)),
		_ => MarketError::Protocol(format!("unexpected HTTP {}: {}", status, message)),
	}
}

#[async_trait]
impl MarketplaceInterface for HttpMarketplace {
	async fn create_order(
		&self,
		session: &Session,
		fields: &OrderFields,
	) -> Result<Order, MarketError> {
		let request = self.request(Method::POST, &["orders"], Some(session))?.json(fields);
		let order: Order = self.fetch(request, Target::order("new"), "order").await?;
		tracing::info!(order_id = %truncate_id(&order.id), "Order created");
		Ok(order)
	}

	async fn list_orders(
		&self,
		session: &Session,
		filter: &OrderFilter,
	) -> Result<Vec<Order>, MarketError> {
		let request = self
			.request(Method::GET, &["orders"], Some(session))?
			.query(filter);
		self.fetch_list(request, Target::order("*"), "orders").await
	}

	async fn list_available_orders(
		&self,
		session: &Session,
		filter: &AvailableOrderFilter,
	) -> Result<Vec<Order>, MarketError> {
		let request = self
			.request(Method::GET, &["orders", "available"], Some(session))?
			.query(filter);
		self.fetch_list(request, Target::order("*"), "orders").await
	}

	async fn get_order(&self, session: &Session, order_id: &str) -> Result<Order, MarketError> {
		let request = self.request(Method::GET, &["orders", order_id], Some(session))?;
		self.fetch(request, Target::order(order_id), "order").await
	}

	async fn start_auction(&self, session: &Session, order_id: &str) -> Result<Order, MarketError> {
		let request =
			self.request(Method::POST, &["orders", order_id, "start-auction"], Some(session))?;
		self.fetch(request, Target::order(order_id), "order").await
	}

	async fn update_order_status(
		&self,
		session: &Session,
		order_id: &str,
		status: OrderStatus,
	) -> Result<Order, MarketError> {
		let request = self
			.request(Method::PUT, &["orders", order_id], Some(session))?
			.json(&StatusUpdate { status });
		self.fetch(request, Target::order(order_id), "order").await
	}

	async fn list_proposals(
		&self,
		session: &Session,
		order_id: &str,
	) -> Result<Vec<Proposal>, MarketError> {
		let request = self
			.request(Method::GET, &["proposals"], Some(session))?
			.query(&ProposalQuery { order_id });
		self.fetch_list(request, Target::order(order_id), "proposals")
			.await
	}

	async fn create_proposal(
		&self,
		session: &Session,
		order_id: &str,
		fields: &ProposalFields,
	) -> Result<Proposal, MarketError> {
		let request = self
			.request(Method::POST, &["proposals"], Some(session))?
			.json(&CreateProposalRequest { order_id, fields });
		self.fetch(request, Target::order(order_id), "proposal")
			.await
	}

	async fn update_proposal(
		&self,
		session: &Session,
		proposal_id: &str,
		fields: &ProposalFields,
	) -> Result<Proposal, MarketError> {
		let request = self
			.request(Method::PUT, &["proposals", proposal_id], Some(session))?
			.json(fields);
		self.fetch(request, Target::proposal(proposal_id), "proposal")
			.await
	}

	async fn accept_proposal(
		&self,
		session: &Session,
		proposal_id: &str,
	) -> Result<Proposal, MarketError> {
		let request =
			self.request(Method::POST, &["proposals", proposal_id, "accept"], Some(session))?;
		self.fetch(request, Target::proposal(proposal_id), "proposal")
			.await
	}

	async fn reject_proposal(
		&self,
		session: &Session,
		proposal_id: &str,
	) -> Result<Proposal, MarketError> {
		let request =
			self.request(Method::POST, &["proposals", proposal_id, "reject"], Some(session))?;
		self.fetch(request, Target::proposal(proposal_id), "proposal")
			.await
	}

	async fn withdraw_proposal(
		&self,
		session: &Session,
		proposal_id: &str,
	) -> Result<Proposal, MarketError> {
		let request =
			self.request(Method::POST, &["proposals", proposal_id, "withdraw"], Some(session))?;
		self.fetch(request, Target::proposal(proposal_id), "proposal")
			.await
	}
}

#[async_trait]
impl AuthInterface for HttpMarketplace {
	async fn login(&self, email: &str, password: &SecretString) -> Result<Session, MarketError> {
		let request = self.request(Method::POST, &["login"], None)?.json(&LoginRequest {
			email,
			password: password.expose_secret(),
		});
		// Wrong credentials come back as a refused 2xx.
		let payload: AuthPayload = self
			.fetch(request, Target::session(), "auth")
			.await
			.map_err(|e| match e {
				MarketError::Conflict { message, .. } => MarketError::Unauthorized(message),
				other => other,
			})?;
		tracing::info!(user_id = %payload.user.id, role = %payload.user.role, "Logged in");
		session_from(payload)
	}

	async fn register(&self, registration: &Registration) -> Result<Session, MarketError> {
		registration.validate()?;
		let request = self.request(Method::POST, &["register"], None)?.json(&RegisterRequest {
			name: &registration.name,
			email: &registration.email,
			phone: &registration.phone,
			password: registration.password.expose_secret(),
			password_confirmation: registration.password_confirmation.expose_secret(),
		});
		let payload: AuthPayload = self.fetch(request, Target::session(), "auth").await?;
		tracing::info!(user_id = %payload.user.id, "Registered");
		session_from(payload)
	}

	async fn logout(&self, session: &Session) -> Result<(), MarketError> {
		let request = self.request(Method::POST, &["logout"], Some(session))?;
		self.call(request, Target::session()).await.map(|_| ())
	}

	async fn current_user(&self, session: &Session) -> Result<User, MarketError> {
		let request = self.request(Method::GET, &["me"], Some(session))?;
		self.fetch(request, Target::session(), "user").await
	}

	async fn update_role(&self, session: &Session, role: Role) -> Result<User, MarketError> {
		let request = self
			.request(Method::PUT, &["profile-type"], Some(session))?
			.json(&ProfileTypeUpdate { profile_type: role });
		self.fetch(request, Target::session(), "user").await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::extract::{Path, Query};
	use axum::http::{HeaderMap, StatusCode};
	use axum::routing::{get, post, put};
	use axum::{Json, Router};
	use bidboard_types::{ProposedDeadline, User};
	use rust_decimal::Decimal;
	use serde_json::json;
	use std::collections::HashMap;

	fn session() -> Session {
		Session::new(
			User {
				id: "3".into(),
				name: "Ana".into(),
				email: "ana@example.com".into(),
				role: Role::Client,
				phone: None,
				address: None,
			},
			SecretString::from("tok-123"),
		)
	}

	fn order_json(id: u32, status: &str) -> Value {
		json!({
			"id": id, "client_id": 3, "title": "Pintura", "category": "pintura",
			"description": "Sala", "budget": "3000.00", "deadline": 15,
			"address": "Rua A", "status": status
		})
	}

	fn authorized(headers: &HeaderMap) -> bool {
		headers
			.get("authorization")
			.and_then(|v| v.to_str().ok())
			== Some("Bearer tok-123")
	}

	async fn list_orders(
		headers: HeaderMap,
		Query(query): Query<HashMap<String, String>>,
	) -> (StatusCode, Json<Value>) {
		if !authorized(&headers) {
			return (
				StatusCode::UNAUTHORIZED,
				Json(json!({"success": false, "message": "Unauthenticated."})),
			);
		}
		let status = query.get("status").cloned().unwrap_or_else(|| "open".into());
		(
			StatusCode::OK,
			Json(json!({"success": true, "data": {"data": [order_json(1, &status), order_json(2, &status)], "total": 2}})),
		)
	}

	async fn get_order(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
		match id.as_str() {
			"1" => (
				StatusCode::OK,
				Json(json!({"success": true, "data": {"order": order_json(1, "open")}})),
			),
			"slow" => {
				tokio::time::sleep(Duration::from_secs(2)).await;
				(StatusCode::OK, Json(json!({"success": true, "data": order_json(9, "open")})))
			},
			"broken" => (StatusCode::OK, Json(json!({"unexpected": true}))),
			"down" => (
				StatusCode::SERVICE_UNAVAILABLE,
				Json(json!({"success": false, "message": "maintenance"})),
			),
			_ => (
				StatusCode::NOT_FOUND,
				Json(json!({"success": false, "message": "Pedido não encontrado"})),
			),
		}
	}

	async fn create_proposal(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
		let price = body["price"]
			.as_str()
			.and_then(|price| price.parse::<f64>().ok())
			.unwrap_or_default();
		if price <= 0.0 {
			return (
				StatusCode::UNPROCESSABLE_ENTITY,
				Json(json!({"success": false, "message": "Dados inválidos",
					"errors": {"price": ["O preço deve ser positivo"]}})),
			);
		}
		if body["order_id"] == "closed" {
			return (
				StatusCode::OK,
				Json(json!({"success": false, "message": "Pedido não aceita propostas"})),
			);
		}
		(
			StatusCode::CREATED,
			Json(json!({"success": true, "data": {
				"id": 77, "order_id": body["order_id"], "provider_id": 40,
				"price": body["price"], "deadline": body["deadline"],
				"description": body["description"], "status": "pending"
			}})),
		)
	}

	async fn accept(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
		(
			StatusCode::CONFLICT,
			Json(json!({"success": false, "message": format!("proposal {} already decided", id)})),
		)
	}

	async fn login(Json(body): Json<Value>) -> Json<Value> {
		if body["password"] == "secret" {
			Json(json!({"success": true, "message": "ok", "data": {
				"user": {"id": 3, "name": "Ana", "email": body["email"], "profile_type": "client"},
				"token": "tok-123"
			}}))
		} else {
			Json(json!({"success": false, "message": "Credenciais inválidas"}))
		}
	}

	async fn register(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
		if body["email"] == "taken@example.com" {
			return (
				StatusCode::UNPROCESSABLE_ENTITY,
				Json(json!({"success": false, "message": "Dados inválidos",
					"errors": {"email": ["O e-mail já está em uso"]}})),
			);
		}
		(
			StatusCode::CREATED,
			Json(json!({"success": true, "data": {
				"user": {"id": 8, "name": body["name"], "email": body["email"],
					"phone": body["phone"], "profile_type": "client"},
				"token": "tok-new"
			}})),
		)
	}

	async fn logout() -> Json<Value> {
		Json(json!({"success": true, "message": "Logout realizado"}))
	}

	async fn profile_type(Json(body): Json<Value>) -> Json<Value> {
		Json(json!({"success": true, "data": {"user": {
			"id": 3, "name": "Ana", "email": "ana@example.com", "profile_type": body["profile_type"]
		}}}))
	}

	async fn stub_server() -> String {
		let app = Router::new().nest(
			"/api",
			Router::new()
				.route("/orders", get(list_orders))
				.route("/orders/{id}", get(get_order))
				.route("/proposals", post(create_proposal))
				.route("/proposals/{id}/accept", post(accept))
				.route("/login", post(login))
				.route("/register", post(register))
				.route("/logout", post(logout))
				.route("/profile-type", put(profile_type)),
		);
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});
		format!("http://{}/api", addr)
	}

	async fn client() -> HttpMarketplace {
		let base = stub_server().await;
		HttpMarketplace::new(&base, Duration::from_millis(500), Duration::from_secs(90)).unwrap()
	}

	#[tokio::test]
	async fn test_paginated_listing_with_bearer() {
		let api = client().await;
		let filter = OrderFilter {
			status: Some(OrderStatus::InProgress),
			category: None,
		};
		let orders = api.list_orders(&session(), &filter).await.unwrap();
		assert_eq!(orders.len(), 2);
		assert_eq!(orders[0].id, "1");
		assert_eq!(orders[0].status, OrderStatus::InProgress);
		assert_eq!(orders[0].budget, Decimal::new(3000, 0));
	}

	#[tokio::test]
	async fn test_unauthorized() {
		let api = client().await;
		let stale = Session::new(session().user, SecretString::from("expired"));
		let result = api.list_orders(&stale, &OrderFilter::default()).await;
		assert!(matches!(result, Err(MarketError::Unauthorized(_))));
	}

	#[tokio::test]
	async fn test_wrapped_entity_and_not_found() {
		let api = client().await;
		let order = api.get_order(&session(), "1").await.unwrap();
		assert_eq!(order.title, "Pintura");

		let missing = api.get_order(&session(), "404").await;
		assert_eq!(
			missing,
			Err(MarketError::not_found(Entity::Order, "404"))
		);
	}

	#[tokio::test]
	async fn test_timeout_is_distinct() {
		let api = client().await;
		let result = api.get_order(&session(), "slow").await;
		assert!(matches!(result, Err(MarketError::Timeout(_))), "{:?}", result);
	}

	#[tokio::test]
	async fn test_malformed_and_server_errors() {
		let api = client().await;
		assert!(matches!(
			api.get_order(&session(), "broken").await,
			Err(MarketError::Protocol(_))
		));
		assert!(matches!(
			api.get_order(&session(), "down").await,
			Err(MarketError::Network(_))
		));
	}

	#[tokio::test]
	async fn test_validation_conflict_and_success() {
		let api = client().await;
		let mut fields = ProposalFields {
			price: Decimal::ZERO,
			deadline: ProposedDeadline::from("12 dias"),
			description: "Tinta premium".into(),
		};

		match api.create_proposal(&session(), "12", &fields).await {
			Err(MarketError::Validation { field, message }) => {
				assert_eq!(field, "price");
				assert_eq!(message, "O preço deve ser positivo");
			},
			other => panic!("expected validation error, got {:?}", other),
		}

		fields.price = Decimal::new(2800, 0);
		let refused = api.create_proposal(&session(), "closed", &fields).await;
		assert!(matches!(refused, Err(MarketError::Conflict { .. })));

		let created = api.create_proposal(&session(), "12", &fields).await.unwrap();
		assert_eq!(created.id, "77");
		assert_eq!(created.order_id, "12");
		assert_eq!(created.deadline.days(), Some(12));

		let accepted = api.accept_proposal(&session(), "77").await;
		assert!(matches!(
			accepted,
			Err(MarketError::Conflict { entity: Entity::Proposal, ref id, .. }) if id == "77"
		));
	}

	#[tokio::test]
	async fn test_auth_round_trip() {
		let api = client().await;
		let session = api
			.login("ana@example.com", &SecretString::from("secret"))
			.await
			.unwrap();
		assert_eq!(session.user_id(), "3");
		assert_eq!(session.credential.expose_secret(), "tok-123");

		let denied = api
			.login("ana@example.com", &SecretString::from("wrong"))
			.await;
		assert!(matches!(denied, Err(MarketError::Unauthorized(ref m)) if m == "Credenciais inválidas"));

		let user = api.update_role(&session, Role::Provider).await.unwrap();
		assert_eq!(user.role, Role::Provider);
		api.logout(&session).await.unwrap();
	}

	fn registration(email: &str) -> Registration {
		Registration {
			name: "Bruno".into(),
			email: email.into(),
			phone: "11 98888-7777".into(),
			password: SecretString::from("segredo"),
			password_confirmation: SecretString::from("segredo"),
		}
	}

	#[tokio::test]
	async fn test_register() {
		let api = client().await;
		let session = api.register(&registration("bruno@example.com")).await.unwrap();
		assert_eq!(session.user_id(), "8");
		assert_eq!(session.role(), Role::Client);
		assert_eq!(session.user.phone.as_deref(), Some("11 98888-7777"));
		assert_eq!(session.credential.expose_secret(), "tok-new");

		match api.register(&registration("taken@example.com")).await {
			Err(MarketError::Validation { field, message }) => {
				assert_eq!(field, "email");
				assert_eq!(message, "O e-mail já está em uso");
			},
			other => panic!("expected validation error, got {:?}", other),
		}

		// Mismatched confirmation never reaches the server.
		let mut mismatched = registration("bruno@example.com");
		mismatched.password_confirmation = SecretString::from("outro");
		assert!(matches!(
			api.register(&mismatched).await,
			Err(MarketError::Validation { ref field, .. }) if field == "password"
		));
	}

	#[tokio::test]
	async fn test_connection_refused_is_network() {
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		drop(listener);
		let api = HttpMarketplace::new(
			&format!("http://{}/api", addr),
			Duration::from_secs(1),
			Duration::from_secs(1),
		)
		.unwrap();
		let result = api.get_order(&session(), "1").await;
		assert!(matches!(result, Err(MarketError::Network(_))), "{:?}", result);
	}

	#[test]
	fn test_endpoint_encodes_segments() {
		let api = HttpMarketplace::new(
			"http://localhost:8000/api/",
			Duration::from_secs(1),
			Duration::from_secs(1),
		)
		.unwrap();
		let url = api.endpoint(&["orders", "a b/c", "start-auction"]).unwrap();
		assert_eq!(url.as_str(), "http://localhost:8000/api/orders/a%20b%2Fc/start-auction");
	}

	#[test]
	fn test_rejects_unusable_base_url() {
		assert!(matches!(
			HttpMarketplace::new("not a url", Duration::from_secs(1), Duration::from_secs(1)),
			Err(MarketError::Validation { .. })
		));
	}
}
