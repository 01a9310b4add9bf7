//! Persisted state transitions for projects and orders.
//!
//! A [`StateMachine`] loads a document, runs a lifecycle gate against it and
//! persists the result only when the gate succeeds. Read-modify-write cycles
//! on the same machine are serialized, so two concurrent gates on a document
//! never both see the pre-update state.

pub mod order;
pub mod project;

pub use order::OrderStateMachine;
pub use project::ProjectStateMachine;

use crate::lifecycle::LifecycleError;
use market_storage::{StorageError, StorageService};
use market_types::{current_timestamp, StorageKey};
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors that can occur during state management.
#[derive(Debug, Error)]
pub enum StateError {
	#[error("Storage error: {0}")]
	Storage(String),
	#[error(transparent)]
	Lifecycle(#[from] LifecycleError),
}

impl From<StorageError> for StateError {
	fn from(err: StorageError) -> Self {
		StateError::Storage(err.to_string())
	}
}

/// A top-level document managed by a [`StateMachine`].
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
	/// Storage namespace holding documents of this kind.
	const NAMESPACE: StorageKey;
	/// Name used in not-found messages.
	const KIND: &'static str;

	fn id(&self) -> &str;

	/// Records the time of the last successful update.
	fn touch(&mut self, now: u64);
}

/// Loads, gates and persists documents of one kind.
pub struct StateMachine<D> {
	storage: Arc<StorageService>,
	write_lock: Mutex<()>,
	_document: PhantomData<fn() -> D>,
}

impl<D: Document> StateMachine<D> {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self {
			storage,
			write_lock: Mutex::new(()),
			_document: PhantomData,
		}
	}

	/// Gets a document by ID.
	pub async fn get(&self, id: &str) -> Result<D, StateError> {
		self.storage
			.find(D::NAMESPACE.as_str(), id)
			.await?
			.ok_or_else(|| LifecycleError::NotFound(format!("{} not found", D::KIND)).into())
	}

	/// Stores a new document.
	pub async fn store(&self, document: &D) -> Result<(), StateError> {
		let _guard = self.write_lock.lock().await;
		self.storage
			.store(D::NAMESPACE.as_str(), document.id(), document)
			.await?;
		Ok(())
	}

	/// Loads every document of this kind.
	pub async fn all(&self) -> Result<Vec<D>, StateError> {
		Ok(self.storage.retrieve_all(D::NAMESPACE.as_str()).await?)
	}

	/// Runs `gate` against the stored document and persists the result.
	///
	/// On a gate error the stored document is left unchanged. `updated_at`
	/// is stamped only when the gate succeeds.
	pub async fn update_with<F, R>(&self, id: &str, gate: F) -> Result<(D, R), StateError>
	where
		F: FnOnce(&mut D) -> Result<R, LifecycleError>,
	{
		let _guard = self.write_lock.lock().await;
		let mut document = self.get(id).await?;

		let outcome = gate(&mut document)?;
		document.touch(current_timestamp());

		self.storage
			.update(D::NAMESPACE.as_str(), id, &document)
			.await?;

		Ok((document, outcome))
	}

	/// Removes the document if `gate` allows it.
	pub async fn remove_with<F>(&self, id: &str, gate: F) -> Result<D, StateError>
	where
		F: FnOnce(&D) -> Result<(), LifecycleError>,
	{
		let _guard = self.write_lock.lock().await;
		let document = self.get(id).await?;
		gate(&document)?;
		self.storage.remove(D::NAMESPACE.as_str(), id).await?;
		Ok(document)
	}
}
