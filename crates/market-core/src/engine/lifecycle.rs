//! Lifecycle management for the marketplace engine.
//!
//! Handles startup checks and shutdown logging for the engine.

use super::{EngineError, MarketEngine};
use market_types::StorageKey;

impl MarketEngine {
	/// Verifies storage is reachable and reports what it already holds.
	pub async fn initialize(&self) -> Result<(), EngineError> {
		tracing::info!(market_id = %self.config.market.id, "Initializing marketplace engine");

		for key in [StorageKey::Users, StorageKey::Projects, StorageKey::Orders] {
			let count = self
				.storage
				.count(key.as_str())
				.await
				.map_err(|e| EngineError::Service(e.to_string()))?;
			tracing::info!(namespace = key.as_str(), count, "Loaded documents");
		}

		Ok(())
	}

	/// Performs cleanup operations
	pub async fn shutdown(&self) -> Result<(), EngineError> {
		tracing::info!("Shutting down marketplace engine");
		Ok(())
	}
}
