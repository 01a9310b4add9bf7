//! Request handlers for the marketplace operations.
//!
//! Each handler owns one resource (users, projects, orders, messages). A
//! handler resolves the documents an operation needs, runs the lifecycle
//! gate through a state machine, and publishes an event once the change is
//! persisted. Authorization always works on an explicit [`Actor`].
//!
//! [`Actor`]: market_types::Actor

pub mod message;
pub mod order;
pub mod project;
pub mod user;

pub use message::MessageHandler;
pub use order::OrderHandler;
pub use project::ProjectHandler;
pub use user::UserHandler;

use crate::lifecycle::LifecycleError;
use crate::state::StateError;
use market_storage::StorageError;
use market_types::APIError;
use thiserror::Error;

/// Errors returned by the handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
	/// A lifecycle gate or lookup refused the operation.
	#[error(transparent)]
	Lifecycle(#[from] LifecycleError),
	/// No valid bearer token was presented.
	#[error("Authentication required")]
	Unauthenticated,
	#[error("Storage error: {0}")]
	Storage(String),
}

impl From<StateError> for HandlerError {
	fn from(err: StateError) -> Self {
		match err {
			StateError::Lifecycle(e) => HandlerError::Lifecycle(e),
			StateError::Storage(e) => HandlerError::Storage(e),
		}
	}
}

impl From<StorageError> for HandlerError {
	fn from(err: StorageError) -> Self {
		HandlerError::Storage(err.to_string())
	}
}

impl From<HandlerError> for APIError {
	fn from(err: HandlerError) -> Self {
		match err {
			HandlerError::Lifecycle(e) => {
				let message = e.message().to_string();
				match e {
					LifecycleError::Forbidden(_) => APIError::Forbidden { message },
					LifecycleError::NotFound(_) => APIError::NotFound { message },
					LifecycleError::Conflict(_) => APIError::Conflict { message },
					LifecycleError::Invalid(_) => APIError::bad_request(message),
				}
			},
			HandlerError::Unauthenticated => APIError::Unauthorized {
				message: "Authentication required".into(),
			},
			HandlerError::Storage(e) => {
				tracing::error!(error = %e, "Storage failure");
				APIError::InternalServerError {
					message: "Internal storage error".into(),
				}
			},
		}
	}
}

/// Splits a comma-separated skills filter into lowercase values.
pub(crate) fn skill_filter(skills: Option<&str>) -> Vec<String> {
	skills
		.map(market_types::split_csv)
		.unwrap_or_default()
		.into_iter()
		.map(|s| s.to_lowercase())
		.collect()
}

/// Whether `skills` contains any of `wanted`, ignoring case. An empty
/// filter matches everything.
pub(crate) fn matches_any_skill(skills: &[String], wanted: &[String]) -> bool {
	wanted.is_empty()
		|| skills
			.iter()
			.any(|skill| wanted.contains(&skill.to_lowercase()))
}
