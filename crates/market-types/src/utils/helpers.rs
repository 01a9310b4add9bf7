//! Helper utilities for timestamps and identifiers.

/// Returns the current Unix timestamp in seconds, or 0 if the system clock
/// is set before the epoch.
pub fn current_timestamp() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0)
}

/// Generates a new random document identifier.
///
/// Used for top-level documents as well as for records appended to a
/// document's sub-collections (proposals, deliverables, order messages).
pub fn new_id() -> String {
	uuid::Uuid::new_v4().to_string()
}
