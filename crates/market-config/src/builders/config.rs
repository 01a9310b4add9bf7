//! Configuration builder for tests and local development.

use crate::{ApiConfig, Config, MarketConfig, MarketplaceConfig, StorageConfig};
use std::collections::HashMap;

/// Builder for creating `Config` instances with a fluent API.
///
/// Defaults to in-memory storage and no API section.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	market_id: String,
	storage_primary: String,
	storage_config: toml::Value,
	marketplace: MarketplaceConfig,
	api: Option<ApiConfig>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self {
			market_id: "test-market".to_string(),
			storage_primary: "memory".to_string(),
			storage_config: toml::Value::Table(toml::Table::new()),
			marketplace: MarketplaceConfig::default(),
			api: None,
		}
	}

	pub fn market_id(mut self, id: impl Into<String>) -> Self {
		self.market_id = id.into();
		self
	}

	/// Selects the storage implementation and its table.
	pub fn storage(mut self, primary: impl Into<String>, config: toml::Value) -> Self {
		self.storage_primary = primary.into();
		self.storage_config = config;
		self
	}

	pub fn page_sizes(mut self, default_page_size: usize, max_page_size: usize) -> Self {
		self.marketplace.default_page_size = default_page_size;
		self.marketplace.max_page_size = max_page_size;
		self
	}

	pub fn api(mut self, api: Option<ApiConfig>) -> Self {
		self.api = api;
		self
	}

	pub fn build(self) -> Config {
		let mut implementations = HashMap::new();
		implementations.insert(self.storage_primary.clone(), self.storage_config);

		Config {
			market: MarketConfig { id: self.market_id },
			storage: StorageConfig {
				primary: self.storage_primary,
				implementations,
			},
			marketplace: self.marketplace,
			api: self.api,
		}
	}
}
