//! Builder for a ready-to-use marketplace.
//!
//! Wires the configured storage backend, the marketplace backend (REST
//! client, or the in-process ledger when offline) and the session manager
//! from a single [`Config`].

use bidboard_api::implementations::http::HttpMarketplace;
use bidboard_api::{AuthInterface, MarketplaceInterface};
use bidboard_config::Config;
use bidboard_storage::{create_backend, StorageService};
use std::sync::Arc;
use thiserror::Error;

use crate::marketplace::Marketplace;
use crate::session::SessionManager;
use crate::state::OrderLedger;

/// Errors that can occur while assembling the marketplace.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Everything a caller needs to drive the marketplace.
pub struct BuiltMarketplace {
	pub marketplace: Marketplace,
	pub sessions: SessionManager,
	pub storage: Arc<StorageService>,
}

pub struct MarketplaceBuilder {
	config: Config,
	offline: bool,
}

impl MarketplaceBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			offline: false,
		}
	}

	/// Serve every call from the local ledger instead of the REST backend.
	pub fn offline(mut self, offline: bool) -> Self {
		self.offline = offline;
		self
	}

	pub fn build(self) -> Result<BuiltMarketplace, BuilderError> {
		let primary = &self.config.storage.primary;
		let storage_config = self.config.storage.primary_config().ok_or_else(|| {
			BuilderError::MissingComponent(format!("storage implementation '{}'", primary))
		})?;
		let backend = create_backend(primary, storage_config).map_err(|e| {
			tracing::error!(component = "storage", implementation = %primary, error = %e, "Failed to create storage implementation");
			BuilderError::Config(format!(
				"Failed to create storage implementation '{}': {}",
				primary, e
			))
		})?;
		tracing::info!(component = "storage", implementation = %primary, "Loaded");
		let storage = Arc::new(StorageService::new(backend));

		let auction_duration = chrono::Duration::from_std(self.config.auction_duration())
			.map_err(|e| BuilderError::Config(format!("auction duration: {}", e)))?;

		let (market, auth): (Arc<dyn MarketplaceInterface>, Arc<dyn AuthInterface>) =
			if self.offline {
				let ledger = Arc::new(OrderLedger::new(storage.clone(), auction_duration));
				tracing::info!(component = "backend", implementation = "ledger", "Loaded");
				(ledger.clone(), ledger)
			} else {
				let http = Arc::new(
					HttpMarketplace::new(
						&self.config.api.base_url,
						self.config.request_timeout(),
						self.config.pool_idle_timeout(),
					)
					.map_err(|e| BuilderError::Config(e.to_string()))?,
				);
				tracing::info!(component = "backend", implementation = "http", base_url = %self.config.api.base_url, "Loaded");
				(http.clone(), http)
			};

		Ok(BuiltMarketplace {
			marketplace: Marketplace::new(market, auction_duration),
			sessions: SessionManager::new(auth, storage.clone()),
			storage,
		})
	}
}
