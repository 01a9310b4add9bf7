//! Lifecycle gates for projects and orders.
//!
//! Gates are pure functions over an in-memory document and the acting user.
//! They either mutate the document into its next valid state or return a
//! [`LifecycleError`] and leave it untouched. Persistence happens around
//! them in the state machines.

pub mod order;
pub mod project;

use thiserror::Error;
use validator::Validate;

/// Why a gate refused an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
	/// The actor lacks the role or ownership the operation requires.
	#[error("Forbidden: {0}")]
	Forbidden(String),
	/// A referenced document or sub-document does not exist.
	#[error("Not found: {0}")]
	NotFound(String),
	/// The operation is illegal in the document's current state.
	#[error("Conflict: {0}")]
	Conflict(String),
	/// Input is missing or out of range.
	#[error("Invalid: {0}")]
	Invalid(String),
}

impl LifecycleError {
	/// The human-readable part without the kind prefix.
	pub fn message(&self) -> &str {
		match self {
			LifecycleError::Forbidden(m)
			| LifecycleError::NotFound(m)
			| LifecycleError::Conflict(m)
			| LifecycleError::Invalid(m) => m,
		}
	}
}

/// Status before and after an update. Equal when only progress changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange<S> {
	pub from: S,
	pub to: S,
}

impl<S: PartialEq> StatusChange<S> {
	pub fn changed(&self) -> bool {
		self.from != self.to
	}
}

/// Clamps a requested progress value into `0..=100`.
pub fn clamp_progress(progress: i64) -> u8 {
	progress.clamp(0, 100) as u8
}

/// Runs derive-based request validation, reporting the offending fields.
pub fn validate_request<T: Validate>(request: &T) -> Result<(), LifecycleError> {
	request.validate().map_err(|errors| {
		let mut fields: Vec<String> = errors
			.field_errors()
			.keys()
			.map(|field| field.to_string())
			.collect();
		fields.sort();
		LifecycleError::Invalid(if fields.is_empty() {
			"Request validation failed".to_string()
		} else {
			format!("Invalid or missing fields: {}", fields.join(", "))
		})
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_clamp_progress() {
		assert_eq!(clamp_progress(-5), 0);
		assert_eq!(clamp_progress(150), 100);
		assert_eq!(clamp_progress(42), 42);
	}

	#[test]
	fn test_message_strips_kind() {
		let err = LifecycleError::Conflict("Project is not open".into());
		assert_eq!(err.message(), "Project is not open");
		assert_eq!(err.to_string(), "Conflict: Project is not open");
	}
}
