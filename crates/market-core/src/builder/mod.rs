//! Builder pattern for constructing marketplace engines.
//!
//! Composes a [`MarketEngine`] from the configured storage implementations
//! using factory functions, so backends can be added without touching the
//! engine itself.

use crate::engine::{event_bus::EventBus, MarketEngine};
use market_config::Config;
use market_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Capacity of the domain event channel.
const EVENT_BUS_CAPACITY: usize = 1000;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
}

/// Factory functions needed to build a [`MarketEngine`], keyed by
/// implementation name.
pub struct MarketFactories<SF> {
	pub storage_factories: HashMap<String, SF>,
}

/// Builder for constructing a MarketEngine with pluggable storage.
pub struct MarketBuilder {
	config: Config,
}

impl MarketBuilder {
	/// Creates a new MarketBuilder with the given configuration.
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the MarketEngine on the primary storage implementation.
	///
	/// Every configured implementation with a known factory is constructed,
	/// so a broken secondary table is reported at startup rather than when
	/// someone switches to it.
	pub fn build<SF>(self, factories: MarketFactories<SF>) -> Result<MarketEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
	{
		let mut storage_impls = HashMap::new();
		for (name, config) in &self.config.storage.implementations {
			let Some(factory) = factories.storage_factories.get(name) else {
				tracing::warn!(
					component = "storage",
					implementation = %name,
					"No factory registered for storage implementation"
				);
				continue;
			};
			match factory(config) {
				Ok(implementation) => {
					storage_impls.insert(name.clone(), implementation);
					let is_primary = &self.config.storage.primary == name;
					tracing::info!(component = "storage", implementation = %name, enabled = %is_primary, "Loaded");
				},
				Err(e) => {
					tracing::error!(
						component = "storage",
						implementation = %name,
						error = %e,
						"Failed to create storage implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create storage implementation '{}': {}",
						name, e
					)));
				},
			}
		}

		if storage_impls.is_empty() {
			return Err(BuilderError::Config(
				"No valid storage implementations available".into(),
			));
		}

		let primary_storage = &self.config.storage.primary;
		let storage_backend = storage_impls.remove(primary_storage).ok_or_else(|| {
			BuilderError::Config(format!(
				"Primary storage '{}' failed to load or has invalid configuration",
				primary_storage
			))
		})?;

		let storage = Arc::new(StorageService::new(storage_backend));

		Ok(MarketEngine::new(
			self.config,
			storage,
			EventBus::new(EVENT_BUS_CAPACITY),
		))
	}
}
