//! Project state machine.
//!
//! Projects leave `open` only through proposal acceptance (or order creation
//! on an open project). Afterwards the status update path allows
//! `in-progress -> completed | cancelled`; both end states are terminal.

use super::{Document, StateMachine};
use market_types::{Project, ProjectStatus, StorageKey};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

pub type ProjectStateMachine = StateMachine<Project>;

impl Document for Project {
	const NAMESPACE: StorageKey = StorageKey::Projects;
	const KIND: &'static str = "Project";

	fn id(&self) -> &str {
		&self.id
	}

	fn touch(&mut self, now: u64) {
		self.updated_at = now;
	}
}

/// Static transition table for status updates requested by participants.
static TRANSITIONS: Lazy<HashMap<ProjectStatus, HashSet<ProjectStatus>>> = Lazy::new(|| {
	let mut m = HashMap::new();
	m.insert(ProjectStatus::Open, HashSet::new());
	m.insert(
		ProjectStatus::InProgress,
		HashSet::from([ProjectStatus::Completed, ProjectStatus::Cancelled]),
	);
	m.insert(ProjectStatus::Completed, HashSet::new()); // terminal
	m.insert(ProjectStatus::Cancelled, HashSet::new()); // terminal
	m
});

/// Checks whether a participant may move a project from `from` to `to`.
///
/// Staying in the same status is always allowed.
pub fn is_valid_transition(from: ProjectStatus, to: ProjectStatus) -> bool {
	from == to
		|| TRANSITIONS
			.get(&from)
			.is_some_and(|allowed| allowed.contains(&to))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_transition_table() {
		use ProjectStatus::*;

		assert!(is_valid_transition(InProgress, Completed));
		assert!(is_valid_transition(InProgress, Cancelled));
		assert!(is_valid_transition(Completed, Completed));

		assert!(!is_valid_transition(Open, InProgress));
		assert!(!is_valid_transition(InProgress, Open));
		assert!(!is_valid_transition(Completed, InProgress));
		assert!(!is_valid_transition(Cancelled, Completed));
	}
}
